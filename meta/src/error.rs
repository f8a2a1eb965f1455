use std::io;

pub use archive::ArchiveError;

/// Declaration lookup errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Nested error for archive fetching and unpacking.
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    /// The host source tree or its declaration file can't be read.
    #[error("host source not found: {0}")]
    HostSourceNotFound(String, #[source] io::Error),
    /// No block declares the dependency, or one of its required fields is empty.
    #[error("could not find all required strings in the given host directory: {0}")]
    MetadataMissing(String),
    /// The declaration file is not well formed.
    #[error("failed to read declarations at line {line}: {message}")]
    Parse { line: usize, message: String },
}

mod archive {
    use std::io;

    /// Archive related errors.
    #[derive(Debug, thiserror::Error)]
    pub enum ArchiveError {
        /// Error while unpacking the downloaded archive.
        #[error("failed to decompress {0}")]
        DecompressError(String, #[source] io::Error),
        /// Error while downloading from the declared url.
        #[error("failed to download {0}")]
        DownloadError(String, #[source] attohttpc::Error),
        /// The checksum of the archive doesn't match the declared one.
        #[error(
            "mismatch in the checksum of {0}:\n\
            - Declared: {1}\n\
            - Calculated: {2}"
        )]
        InvalidChecksum(String, String, String),
        /// Error writing the archive to its destination.
        #[error("the archive destination is not valid: {0}")]
        InvalidDirectory(String, #[source] io::Error),
        /// Error when the url points at a local file that can't be read.
        #[error("the requested local file could not be read: {0}")]
        LocalFileError(String, #[source] io::Error),
        /// The archive extension is not currently supported.
        #[error("unsupported archive extension for {0}")]
        UnsupportedExtension(String),
    }
}
