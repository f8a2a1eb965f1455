use std::{io, path::PathBuf};

use hostdeps_meta::error::ArchiveError;

use crate::runner::CommandError;

/// Errors of the `generate` and `install` workflows. Every one of them ends the run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The dependency could not be located in the host tree.
    #[error(transparent)]
    Locate(#[from] hostdeps_meta::error::Error),
    /// Downloading or unpacking the archive failed.
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    /// An external build tool failed.
    #[error(transparent)]
    Command(#[from] CommandError),
    /// A filesystem step failed.
    #[error("failed to {0} {path}", path = .1.display())]
    Io(&'static str, PathBuf, #[source] io::Error),
    /// The unpacked archive doesn't contain the declared top level folder.
    #[error("the archive did not extract to {dir}", dir = .0.display())]
    MissingFolder(PathBuf),
    /// The install prefix has no installed headers.
    #[error(
        "no installation found in {dir}: {missing} is missing",
        dir = .0.display(),
        missing = .1
    )]
    NotInstalled(PathBuf, &'static str),
}
