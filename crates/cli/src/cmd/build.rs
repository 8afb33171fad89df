//! Implementation of the `romgen build` command.
//!
//! The pipeline runs on a blocking task while the async side waits for an
//! interrupt (Ctrl-C, or SIGTERM on unix). An interrupt only raises the cancel
//! flag: the variant in progress finishes, the rest are skipped, and the
//! resource document is still restored.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use tokio::task::JoinHandle;
use tracing::warn;

use romgen_lib::pipeline::{FailurePolicy, Pipeline, RunReport};
use romgen_lib::settings::{Overrides, Profile};
use romgen_lib::toolchain::CommandToolchain;
use romgen_lib::variant::Discovery;

use super::load_settings;
use crate::output::{OutputFormat, Tone, emit, json, print_report};

pub fn cmd_build(
  project: Option<PathBuf>,
  profile: Option<Profile>,
  fail_fast: bool,
  only: &[String],
  output: OutputFormat,
) -> Result<()> {
  let start = Instant::now();

  let overrides = Overrides {
    profile,
    failure_policy: fail_fast.then_some(FailurePolicy::FailFast),
  };
  let settings = load_settings(project, &overrides)?;
  let toolchain = CommandToolchain::new(settings.build_command.clone()).context("Invalid build command")?;
  let pipeline = Pipeline::new(settings, toolchain);

  let mut discovery = pipeline.discover().context("Failed to discover variants")?;
  if !only.is_empty() {
    discovery.variants.retain(|v| only.iter().any(|sel| v.matches(sel)));
    if discovery.variants.is_empty() {
      bail!("No variant matches --only {}", only.join(", "));
    }
  }

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let report = rt.block_on(run_interruptible(pipeline, discovery))?;

  if output.is_json() {
    json(&report)?;
  } else {
    print_report(&report, start.elapsed());
  }

  if let Some(e) = &report.restore_error {
    emit(
      Tone::Failed,
      &format!(
        "Resource document was NOT restored ({}). Run `romgen restore` before the next build.",
        e
      ),
    );
    bail!("Restore failed");
  }
  if report.cancelled {
    bail!("Build cancelled");
  }
  if !report.is_success() {
    bail!("{} variant(s) failed, {} skipped", report.failed(), report.skipped());
  }
  Ok(())
}

async fn run_interruptible(mut pipeline: Pipeline<CommandToolchain>, discovery: Discovery) -> Result<RunReport> {
  let cancel = Arc::new(AtomicBool::new(false));

  // Handlers are installed before the first build starts, so an early
  // interrupt cancels the run instead of killing the process.
  let listener = listen_for_interrupt(cancel.clone()).context("Failed to install signal handlers")?;

  let result = tokio::task::spawn_blocking(move || pipeline.run(discovery, &cancel))
    .await
    .context("Build task panicked")?;
  listener.abort();

  result.context("Build failed")
}

#[cfg(unix)]
fn listen_for_interrupt(cancel: Arc<AtomicBool>) -> io::Result<JoinHandle<()>> {
  use tokio::signal::unix::{SignalKind, signal};

  let mut interrupt = signal(SignalKind::interrupt())?;
  let mut terminate = signal(SignalKind::terminate())?;

  Ok(tokio::spawn(async move {
    tokio::select! {
      _ = interrupt.recv() => warn!("interrupt received, finishing the current variant"),
      _ = terminate.recv() => warn!("termination requested, finishing the current variant"),
    }
    cancel.store(true, Ordering::SeqCst);
  }))
}

#[cfg(windows)]
fn listen_for_interrupt(cancel: Arc<AtomicBool>) -> io::Result<JoinHandle<()>> {
  let mut ctrl_c = tokio::signal::windows::ctrl_c()?;

  Ok(tokio::spawn(async move {
    if ctrl_c.recv().await.is_some() {
      warn!("interrupt received, finishing the current variant");
      cancel.store(true, Ordering::SeqCst);
    }
  }))
}
