use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Serialize;

use crate::{
    error::Error,
    parse::{records, Record},
    utils::{archive_name, non_empty, relative_name},
    ARCHIVE_HEADER, DECLARATION_FILE,
};

/// Where and how to fetch a vendored dependency, as declared by the host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Descriptor {
    /// Network location of the source archive.
    pub fetch_url: String,
    /// File name of the archive, the last path segment of `fetch_url`.
    pub archive_name: String,
    /// Top level directory the archive expands into (`strip_prefix`).
    pub extracted_folder_name: String,
    /// Checksum of the archive, when the host declares one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl Descriptor {
    /// Builds a descriptor from a declaration block. Returns `None` unless the url,
    /// the archive name and the extracted folder are all non-empty, and the two
    /// names stay inside the directory they are later joined to.
    ///
    /// `url` wins over `urls`; without it the first mirror in `urls` is used.
    pub fn from_record(record: &Record) -> Option<Self> {
        let fetch_url = non_empty(record.string("url"))
            .or_else(|| non_empty(record.strings("urls").first().copied()))?;
        let archive_name = relative_name(Some(archive_name(fetch_url)))?;
        let extracted_folder_name = relative_name(record.string("strip_prefix"))?;

        Some(Self {
            fetch_url: fetch_url.into(),
            archive_name: archive_name.into(),
            extracted_folder_name: extracted_folder_name.into(),
            sha256: non_empty(record.string("sha256")).map(String::from),
        })
    }
}

/// Finds declaration blocks inside a host source tree.
#[derive(Clone, Debug)]
pub struct Locator {
    /// Declaration file, relative to the host source root.
    declaration: PathBuf,
    /// Callee that opens a declaration block.
    header: String,
}

impl Default for Locator {
    fn default() -> Self {
        Self::new(DECLARATION_FILE, ARCHIVE_HEADER)
    }
}

impl Locator {
    pub fn new(declaration: impl Into<PathBuf>, header: impl Into<String>) -> Self {
        Self {
            declaration: declaration.into(),
            header: header.into(),
        }
    }

    pub fn declaration_path(&self, host_root: &Path) -> PathBuf {
        host_root.join(&self.declaration)
    }

    /// Reads the declaration file of `host_root` and extracts the descriptor of
    /// `dependency` from it.
    pub fn locate(&self, host_root: &Path, dependency: &str) -> Result<Descriptor, Error> {
        let path = self.declaration_path(host_root);
        let text = fs::read_to_string(&path)
            .map_err(|e| Error::HostSourceNotFound(path.display().to_string(), e))?;

        self.find(&text, dependency)?
            .ok_or_else(|| Error::MetadataMissing(host_root.display().to_string()))
    }

    /// Looks for the first block opened by the header whose own `name` is exactly
    /// `dependency`. A block that matches but lacks a required field counts as
    /// not found.
    pub fn find(&self, text: &str, dependency: &str) -> Result<Option<Descriptor>, Error> {
        let Some(record) = records(text)?
            .into_iter()
            .find(|r| r.callee == self.header && r.string("name") == Some(dependency))
        else {
            tracing::debug!(dependency, header = %self.header, "no declaration block");
            return Ok(None);
        };

        tracing::debug!(dependency, line = record.line, "found declaration block");
        let descriptor = Descriptor::from_record(&record);
        if descriptor.is_none() {
            tracing::debug!(dependency, line = record.line, "declaration block is incomplete");
        }
        Ok(descriptor)
    }
}

/// [`Locator::locate`] with the default declaration file and header.
pub fn locate(host_root: &Path, dependency: &str) -> Result<Descriptor, Error> {
    Locator::default().locate(host_root, dependency)
}
