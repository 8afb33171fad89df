use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};

use romgen_lib::consts::ABIS;
use romgen_lib::cores::fetch_core;
use romgen_lib::settings::Overrides;

use super::load_settings;
use crate::output::{Tone, emit, format_duration, stat};

pub fn cmd_cores(core: &str, project: Option<PathBuf>, base_url: &str) -> Result<()> {
  let start = Instant::now();
  let settings = load_settings(project, &Overrides::default())?;
  let jni_libs = settings.jni_libs_dir();

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let files = rt
    .block_on(fetch_core(core, base_url, &jni_libs, &ABIS))
    .with_context(|| format!("Failed to fetch core '{}'", core))?;

  emit(Tone::Done, &format!("Installed {} for {} ABI(s)", core, ABIS.len()));
  stat("Libraries", &jni_libs.display().to_string());
  stat("Files", &files.len().to_string());
  stat("Duration", &format_duration(start.elapsed()));
  Ok(())
}
