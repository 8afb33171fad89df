mod build;
mod cores;
mod list;
mod restore;

use std::path::PathBuf;

use anyhow::{Context, Result};

use romgen_lib::settings::{Overrides, Settings, default_project_dir};

pub use build::cmd_build;
pub use cores::cmd_cores;
pub use list::cmd_list;
pub use restore::cmd_restore;

/// Resolve settings for `project`, falling back to `$ROMGEN_PROJECT` or the current directory.
fn load_settings(project: Option<PathBuf>, overrides: &Overrides) -> Result<Settings> {
  let project = match project {
    Some(dir) => dir,
    None => default_project_dir().context("Failed to determine the project directory")?,
  };
  Settings::load(&project, overrides).with_context(|| format!("Failed to load settings for {}", project.display()))
}
