//#![warn(missing_docs)]

pub mod archive;
pub mod error;
pub mod locate;
pub mod parse;
pub mod utils;


/// Path of the host's archive declarations, relative to the host source root.
pub const DECLARATION_FILE: &str = "tensorflow/workspace.bzl";

/// Call that opens an archive declaration block.
pub const ARCHIVE_HEADER: &str = "native.http_archive";
