use std::{
    convert::{TryFrom, TryInto},
    fs,
    io::Read,
    path::Path,
};

use crate::{error::ArchiveError, utils::strip_query};

/// The format of a source archive.
/// Support for each format is enabled using features.
#[derive(Debug, PartialEq, Eq)]
pub enum Extension {
    /// A `.tar.gz` or `.tgz` archive.
    #[cfg(feature = "gz")]
    TarGz,
    /// A `.tar.xz` archive.
    #[cfg(feature = "xz")]
    TarXz,
    /// A `.zip` archive.
    #[cfg(feature = "zip")]
    Zip,
}

impl Extension {
    /// Guess the format from the leading bytes of an archive, for urls whose last
    /// segment carries no extension.
    pub fn sniff(head: &[u8]) -> Option<Self> {
        match head {
            #[cfg(feature = "gz")]
            [0x1f, 0x8b, ..] => Some(Extension::TarGz),
            #[cfg(feature = "xz")]
            [0xfd, b'7', b'z', b'X', b'Z', 0x00, ..] => Some(Extension::TarXz),
            #[cfg(feature = "zip")]
            [b'P', b'K', 0x03, 0x04, ..] => Some(Extension::Zip),
            _ => None,
        }
    }
}

impl TryFrom<&str> for Extension {
    type Error = ArchiveError;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Path::new(strip_query(value)).try_into()
    }
}

impl TryFrom<&Path> for Extension {
    type Error = ArchiveError;
    fn try_from(path: &Path) -> Result<Self, Self::Error> {
        let Some(ext) = path.extension() else {
            return Err(ArchiveError::UnsupportedExtension(
                path.display().to_string(),
            ));
        };
        match ext {
            #[cfg(feature = "gz")]
            e if e == "gz" || e == "tgz" => Ok(Extension::TarGz),
            #[cfg(feature = "xz")]
            e if e == "xz" => Ok(Extension::TarXz),
            #[cfg(feature = "zip")]
            e if e == "zip" => Ok(Extension::Zip),
            _ => Err(ArchiveError::UnsupportedExtension(
                path.display().to_string(),
            )),
        }
    }
}

/// Retrieve an archive from `url` and write it to `dst`.
/// "Download" is used as an umbrella term, since `file://` urls are read from disk.
///
/// When `checksum` is set the archive is only written if its sha256 matches.
pub fn download(url: &str, dst: &Path, checksum: Option<&str>) -> Result<(), ArchiveError> {
    let file = match url.strip_prefix("file://") {
        Some(local) => {
            fs::read(local).map_err(|e| ArchiveError::LocalFileError(local.into(), e))?
        }
        None => attohttpc::get(url)
            .send()
            .and_then(|res| res.error_for_status())
            .and_then(|res| res.bytes())
            .map_err(|e| ArchiveError::DownloadError(url.into(), e))?,
    };
    tracing::info!(url, bytes = file.len(), "downloaded archive");

    if let Some(expected) = checksum {
        verify(url, &file, expected)?;
    }

    fs::write(dst, &file)
        .map_err(|e| ArchiveError::InvalidDirectory(dst.display().to_string(), e))
}

/// Check that `file` hashes to the `expected` sha256.
pub fn verify(url: &str, file: &[u8], expected: &str) -> Result<(), ArchiveError> {
    let calculated = sha256::digest(file);
    if calculated.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(ArchiveError::InvalidChecksum(
            url.into(),
            expected.into(),
            calculated,
        ))
    }
}

/// Unpack the archive at `archive` inside `dst`. The methods for unpacking are
/// different depending on the extension. Each format is gated behind a feature to
/// avoid having too many dependencies.
pub fn extract(archive: &Path, dst: &Path) -> Result<(), ArchiveError> {
    let name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let decompress_error = |e| ArchiveError::DecompressError(archive.display().to_string(), e);

    let ext = match Extension::try_from(name.as_str()) {
        Ok(ext) => ext,
        Err(err) => {
            let mut head = Vec::with_capacity(6);
            fs::File::open(archive)
                .and_then(|f| f.take(6).read_to_end(&mut head))
                .map_err(decompress_error)?;
            let ext = Extension::sniff(&head).ok_or(err)?;
            tracing::debug!(archive = %archive.display(), ?ext, "guessed format from contents");
            ext
        }
    };
    let _file = fs::File::open(archive).map_err(decompress_error)?;
    fs::create_dir_all(dst).map_err(decompress_error)?;
    tracing::info!(archive = %archive.display(), dst = %dst.display(), "extracting");

    match ext {
        #[cfg(feature = "gz")]
        Extension::TarGz => {
            let reader = flate2::read::GzDecoder::new(_file);
            let mut archive = tar::Archive::new(reader);
            archive.unpack(dst).map_err(decompress_error)
        }
        #[cfg(feature = "xz")]
        Extension::TarXz => {
            let reader = liblzma::read::XzDecoder::new(_file);
            let mut archive = tar::Archive::new(reader);
            archive.unpack(dst).map_err(decompress_error)
        }
        #[cfg(feature = "zip")]
        Extension::Zip => {
            let mut archive =
                zip::ZipArchive::new(_file).map_err(|e| decompress_error(e.into()))?;
            archive
                .extract(dst)
                .map_err(|e| decompress_error(e.into()))
        }
    }
}
