//! The external build invocation.
//!
//! The toolchain takes no arguments from the pipeline: it reads the resource
//! document and the staged payload from their fixed locations and reports
//! success through its exit status only.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum BuildError {
  #[error("build command is empty")]
  EmptyCommand,

  #[error("failed to start {command}: {source}")]
  Spawn {
    command: String,
    #[source]
    source: io::Error,
  },

  #[error("build failed with exit code {code:?}: {command}")]
  Failed { command: String, code: Option<i32> },
}

/// Something that builds the project in its current state.
///
/// Blocks until the build finishes; there is no timeout.
pub trait Toolchain {
  fn build(&mut self, project_dir: &Path) -> Result<(), BuildError>;
}

impl<F> Toolchain for F
where
  F: FnMut(&Path) -> Result<(), BuildError>,
{
  fn build(&mut self, project_dir: &Path) -> Result<(), BuildError> {
    self(project_dir)
  }
}

/// Gradle wrapper invocation producing the release packages.
#[cfg(windows)]
pub fn default_build_command() -> Vec<String> {
  vec!["gradlew.bat".to_string(), "assembleRelease".to_string()]
}

/// Gradle wrapper invocation producing the release packages.
#[cfg(not(windows))]
pub fn default_build_command() -> Vec<String> {
  vec!["./gradlew".to_string(), "assembleRelease".to_string()]
}

/// Runs an external command with the project root as working directory.
///
/// Output is inherited so the operator sees the build log as it happens.
#[derive(Debug, Clone)]
pub struct CommandToolchain {
  program: String,
  args: Vec<String>,
}

impl CommandToolchain {
  pub fn new(argv: Vec<String>) -> Result<Self, BuildError> {
    let mut argv = argv.into_iter();
    let program = argv.next().filter(|p| !p.is_empty()).ok_or(BuildError::EmptyCommand)?;
    Ok(Self {
      program,
      args: argv.collect(),
    })
  }

  /// Program path as it will be spawned from `project_dir`.
  ///
  /// Programs written relative to the current directory (`./gradlew`) are
  /// anchored at the project root rather than the caller's working directory.
  fn resolve_program(&self, project_dir: &Path) -> PathBuf {
    let program = Path::new(&self.program);
    if self.program.starts_with("./") || self.program.starts_with(".\\") {
      project_dir.join(program)
    } else {
      program.to_path_buf()
    }
  }
}

impl fmt::Display for CommandToolchain {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.program)?;
    for arg in &self.args {
      write!(f, " {}", arg)?;
    }
    Ok(())
  }
}

impl Toolchain for CommandToolchain {
  fn build(&mut self, project_dir: &Path) -> Result<(), BuildError> {
    let command = self.to_string();
    let program = self.resolve_program(project_dir);
    info!(cmd = %command, "running build");
    debug!(program = ?program, working_dir = ?project_dir, "spawning process");

    let status = Command::new(&program)
      .args(&self.args)
      .current_dir(project_dir)
      .status()
      .map_err(|source| BuildError::Spawn {
        command: command.clone(),
        source,
      })?;

    if !status.success() {
      return Err(BuildError::Failed {
        command,
        code: status.code(),
      });
    }

    Ok(())
  }
}
