use std::path::PathBuf;

use anyhow::{Context, Result};

use romgen_lib::resource::recover_backup;
use romgen_lib::settings::Overrides;

use super::load_settings;
use crate::output::{Tone, emit};

/// Copy the backup left by an interrupted run over the live resource document.
pub fn cmd_restore(project: Option<PathBuf>) -> Result<()> {
  let settings = load_settings(project, &Overrides::default())?;

  recover_backup(&settings.config_path, &settings.backup_path).context("Restore failed")?;

  emit(Tone::Done, &format!("Restored {}", settings.config_path.display()));
  Ok(())
}
