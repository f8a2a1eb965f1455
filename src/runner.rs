//! External build tools, run one at a time.

use std::{
    fmt, io,
    path::{Path, PathBuf},
    process::Command,
};

/// One external command: a program, its arguments and where to run it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Step {
    pub program: String,
    pub args: Vec<String>,
    pub dir: Option<PathBuf>,
}

impl Step {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    /// Whether the program is a path rather than a name to look up in `PATH`.
    fn is_path(&self) -> bool {
        self.program.contains('/')
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The program is not installed.
    #[error("command not found: {0}")]
    NotFound(String),
    /// The program could not be started.
    #[error("command failed: {0}")]
    Spawn(String, #[source] io::Error),
    /// The program exited unsuccessfully, with its exit code when it has one.
    #[error("command failed: {0}")]
    Failed(String, Option<i32>),
}

/// Runs external commands. Implementations must not return before the command exits.
pub trait Runner {
    fn run(&mut self, step: &Step) -> Result<(), CommandError>;
}

/// Runs commands as child processes with inherited stdio.
#[derive(Debug, Default)]
pub struct SystemRunner;

impl SystemRunner {
    fn program(step: &Step) -> Result<PathBuf, CommandError> {
        if step.is_path() {
            let path = Path::new(&step.program);
            return Ok(match &step.dir {
                Some(dir) => dir.join(path),
                None => path.to_path_buf(),
            });
        }
        which::which(&step.program).map_err(|_| CommandError::NotFound(step.program.clone()))
    }
}

impl Runner for SystemRunner {
    fn run(&mut self, step: &Step) -> Result<(), CommandError> {
        let program = Self::program(step)?;
        tracing::info!(command = %step, dir = ?step.dir, "running");

        let mut cmd = Command::new(&program);
        cmd.args(&step.args);
        if let Some(dir) = &step.dir {
            cmd.current_dir(dir);
        }

        let status = cmd.status().map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => CommandError::NotFound(program.display().to_string()),
            _ => CommandError::Spawn(step.to_string(), e),
        })?;
        if !status.success() {
            tracing::debug!(command = %step, %status, "command failed");
            return Err(CommandError::Failed(step.to_string(), status.code()));
        }
        Ok(())
    }
}
