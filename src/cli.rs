//! Command line interface of `hostdeps`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};

use crate::{
    config::Config,
    generate::{generate, Mode},
    install::install,
    runner::SystemRunner,
};

/// Locate the protobuf archive vendored by a TensorFlow checkout, then install it
/// or describe it to CMake.
#[derive(Debug, Parser)]
#[command(name = "hostdeps", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,

    #[command(flatten)]
    pub options: Options,

    /// More output: `-v` for progress, `-vv` for details. `RUST_LOG` overrides it.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

/// Settings shared by every command.
#[derive(Debug, Args)]
pub struct Options {
    /// Declaration file, relative to the host source directory.
    #[arg(long, global = true, env = "HOSTDEPS_DECLARATION", value_name = "PATH")]
    pub declaration: Option<PathBuf>,

    /// Call that opens a declaration block.
    #[arg(long, global = true, value_name = "CALL")]
    pub header: Option<String>,

    /// Directory with replacements for the bundled CMake templates.
    #[arg(long, global = true, env = "HOSTDEPS_TEMPLATE_DIR", value_name = "DIR")]
    pub template_dir: Option<PathBuf>,

    /// Parallel make jobs (default: number of CPUs).
    #[arg(short, long, global = true, env = "HOSTDEPS_JOBS", value_name = "N")]
    pub jobs: Option<usize>,

    /// Don't refresh the dynamic linker cache after installing.
    #[arg(long, global = true)]
    pub no_ldconfig: bool,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Write CMake files describing where to find protobuf.
    Generate {
        #[command(subcommand)]
        mode: GenerateCommand,
    },

    /// Download, build and install protobuf.
    Install {
        /// Root of the TensorFlow source checkout.
        host_source_dir: PathBuf,
        /// Install prefix.
        #[arg(env = "HOSTDEPS_INSTALL_DIR")]
        install_dir: Option<PathBuf>,
        /// Where the archive is downloaded and unpacked (default: current directory).
        #[arg(env = "HOSTDEPS_DOWNLOAD_DIR")]
        download_dir: Option<PathBuf>,
    },

    /// Print what the host declares for protobuf.
    Locate {
        /// Root of the TensorFlow source checkout.
        host_source_dir: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
pub enum GenerateCommand {
    /// Point CMake at an existing installation.
    Installed {
        /// Root of the TensorFlow source checkout.
        host_source_dir: PathBuf,
        /// Where to write the CMake files (default: current directory).
        output_dir: Option<PathBuf>,
        /// Install prefix of the existing installation.
        #[arg(env = "HOSTDEPS_INSTALL_DIR")]
        install_dir: Option<PathBuf>,
    },

    /// Let CMake download and build a fresh copy.
    External {
        /// Root of the TensorFlow source checkout.
        host_source_dir: PathBuf,
        /// Where to write the CMake files (default: current directory).
        output_dir: Option<PathBuf>,
    },
}

impl Options {
    fn config(&self, cwd: &Path, host_source_dir: &Path) -> Config {
        let mut config =
            Config::new(cwd, host_source_dir).with_template_dir(self.template_dir.clone());
        if let Some(declaration) = &self.declaration {
            config.declaration = declaration.clone();
        }
        if let Some(header) = &self.header {
            config.header = header.clone();
        }
        if let Some(jobs) = self.jobs {
            config.jobs = jobs;
        }
        config.ldconfig = !self.no_ldconfig;
        config
    }
}

impl Cli {
    /// Runs the parsed command. `cwd` is what relative paths and defaults resolve against.
    pub fn run(self, cwd: &Path) -> Result<()> {
        let Self {
            command, options, ..
        } = self;

        match command {
            CliCommand::Generate { mode } => {
                let (mode, config) = match mode {
                    GenerateCommand::Installed {
                        host_source_dir,
                        output_dir,
                        install_dir,
                    } => (
                        Mode::Installed,
                        options
                            .config(cwd, &host_source_dir)
                            .with_output_dir(output_dir)
                            .with_install_dir(install_dir),
                    ),
                    GenerateCommand::External {
                        host_source_dir,
                        output_dir,
                    } => (
                        Mode::External,
                        options
                            .config(cwd, &host_source_dir)
                            .with_output_dir(output_dir),
                    ),
                };
                let generated = generate(&config, mode).with_context(|| {
                    format!("generate failed for {}", config.host_root.display())
                })?;
                tracing::info!(
                    version_file = %generated.version_file.display(),
                    template = %generated.template.display(),
                    "generated"
                );
            }
            CliCommand::Install {
                host_source_dir,
                install_dir,
                download_dir,
            } => {
                let config = options
                    .config(cwd, &host_source_dir)
                    .with_install_dir(install_dir)
                    .with_download_dir(download_dir);
                install(&config, &mut SystemRunner).with_context(|| {
                    format!("install failed for {}", config.host_root.display())
                })?;
            }
            CliCommand::Locate { host_source_dir } => {
                let config = options.config(cwd, &host_source_dir);
                let descriptor = config.locate()?;
                print!("{}", toml::to_string(&descriptor)?);
            }
        }

        Ok(())
    }
}
