use std::path::{Path, PathBuf};

use heck::ToUpperCamelCase;
use hostdeps_meta::{
    error::Error,
    locate::{Descriptor, Locator},
    ARCHIVE_HEADER, DECLARATION_FILE,
};

use crate::generate::Mode;

/// Prefix used by `install` and `generate installed` when none is given.
pub const DEFAULT_INSTALL_DIR: &str = "/usr/local";

/// A CMake file shipped with `hostdeps`.
#[derive(Debug)]
pub struct Template {
    pub file_name: &'static str,
    pub contents: &'static str,
}

/// What `hostdeps` knows about the one dependency it provisions.
#[derive(Debug)]
pub struct Profile {
    /// Value of the `name` field of the declaration block.
    pub name: &'static str,
    /// Path below an install prefix that only exists once the dependency is installed.
    pub header_dir: &'static str,
    pub external: Template,
    pub installed: Template,
}

pub static PROTOBUF: Profile = Profile {
    name: "protobuf",
    header_dir: "include/google/protobuf",
    external: Template {
        file_name: "Protobuf_EXTERNAL.cmake",
        contents: include_str!("../cmake/Protobuf_EXTERNAL.cmake"),
    },
    installed: Template {
        file_name: "Protobuf_INSTALLED.cmake",
        contents: include_str!("../cmake/Protobuf_INSTALLED.cmake"),
    },
};

impl Profile {
    /// Prefix of the generated CMake variables, e.g. `Protobuf`.
    pub fn cmake_name(&self) -> String {
        self.name.to_upper_camel_case()
    }

    /// Name of the generated metadata file, e.g. `Protobuf_VERSION.cmake`.
    pub fn version_file(&self) -> String {
        format!("{}_VERSION.cmake", self.cmake_name())
    }

    pub fn template(&self, mode: Mode) -> &Template {
        match mode {
            Mode::External => &self.external,
            Mode::Installed => &self.installed,
        }
    }
}

/// Everything a workflow needs, resolved up front. Relative paths are joined to
/// `cwd` so that nothing depends on the process working directory afterwards.
#[derive(Clone, Debug)]
pub struct Config {
    pub cwd: PathBuf,
    /// Root of the host source checkout.
    pub host_root: PathBuf,
    /// Where `generate` writes its files.
    pub output_dir: PathBuf,
    /// Install prefix given by the user. `None` means [`DEFAULT_INSTALL_DIR`].
    pub install_dir: Option<PathBuf>,
    /// Where `install` downloads and unpacks the archive.
    pub download_dir: PathBuf,
    /// Declaration file, relative to `host_root`.
    pub declaration: PathBuf,
    /// Callee that opens a declaration block.
    pub header: String,
    /// Parallel `make` jobs.
    pub jobs: usize,
    /// Refresh the dynamic linker cache after installing.
    pub ldconfig: bool,
    /// Directory with replacements for the bundled templates.
    pub template_dir: Option<PathBuf>,
    pub profile: &'static Profile,
}

impl Config {
    pub fn new(cwd: impl Into<PathBuf>, host_root: impl AsRef<Path>) -> Self {
        let cwd = cwd.into();
        Self {
            host_root: cwd.join(host_root),
            output_dir: cwd.clone(),
            install_dir: None,
            download_dir: cwd.clone(),
            declaration: DECLARATION_FILE.into(),
            header: ARCHIVE_HEADER.into(),
            jobs: std::thread::available_parallelism().map_or(1, |n| n.get()),
            ldconfig: true,
            template_dir: None,
            profile: &PROTOBUF,
            cwd,
        }
    }

    /// Resolves `path` against the captured working directory.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.cwd.join(path)
    }

    pub fn with_output_dir(mut self, dir: Option<PathBuf>) -> Self {
        if let Some(dir) = dir {
            self.output_dir = self.resolve(dir);
        }
        self
    }

    pub fn with_install_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.install_dir = dir.map(|d| self.resolve(d));
        self
    }

    pub fn with_download_dir(mut self, dir: Option<PathBuf>) -> Self {
        if let Some(dir) = dir {
            self.download_dir = self.resolve(dir);
        }
        self
    }

    pub fn with_template_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.template_dir = dir.map(|d| self.resolve(d));
        self
    }

    /// The install prefix, explicit or default.
    pub fn install_prefix(&self) -> &Path {
        self.install_dir
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_INSTALL_DIR))
    }

    pub fn locator(&self) -> Locator {
        Locator::new(&self.declaration, &self.header)
    }

    /// Extracts the descriptor of the profile's dependency from the host tree.
    pub fn locate(&self) -> Result<Descriptor, Error> {
        self.locator().locate(&self.host_root, self.profile.name)
    }
}
