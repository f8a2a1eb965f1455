//! `hostdeps` finds the protobuf archive that a TensorFlow source tree vendors in
//! `tensorflow/workspace.bzl`, then either builds and installs it or writes CMake
//! files telling another build where to get it.
//!
//! The declaration lookup lives in [`hostdeps_meta`]; this crate adds the
//! [`generate`](generate::generate) and [`install`](install::install) workflows
//! and the `hostdeps` binary.

pub mod cli;
pub mod config;
pub mod error;
pub mod generate;
pub mod install;
pub mod logging;
pub mod runner;

pub use hostdeps_meta as meta;

#[cfg(test)]
mod test_workflows;
