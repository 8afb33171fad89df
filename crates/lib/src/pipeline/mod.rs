//! The variant build pipeline.
//!
//! Variants are processed strictly one after another because the resource
//! document and the payload slot are shared by every build:
//!
//! 1. Back up the resource document ([`ConfigGuard`])
//! 2. For each variant:
//!    - patch a fresh copy of the original document with the variant's identity
//!    - stage the payload
//!    - run the toolchain
//!    - archive the artifact(s)
//! 3. Restore the resource document, whatever happened above

pub mod report;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::archive::{ArchiveError, Archiver};
use crate::consts::KEY_NAME;
use crate::resource::{ConfigGuard, DocumentError, GuardError, ResourceDocument};
use crate::settings::Settings;
use crate::stage::{PayloadSlot, StageError};
use crate::toolchain::{BuildError, Toolchain};
use crate::variant::{Discovery, DiscoveryError, VariantDefinition, discover};

pub use report::{FailureKind, RunReport, VariantOutcome, VariantStatus};

/// What to do with the remaining variants once one fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
  /// Record the failure and move on to the next variant.
  #[default]
  FailSoft,
  /// Skip every remaining variant.
  FailFast,
}

/// Why a single variant did not produce its artifacts.
#[derive(Debug, Error)]
pub enum VariantError {
  #[error(transparent)]
  Config(#[from] DocumentError),

  #[error(transparent)]
  Stage(#[from] StageError),

  /// The previous build's artifact could not be removed before building.
  #[error(transparent)]
  Clear(ArchiveError),

  #[error(transparent)]
  Build(#[from] BuildError),

  #[error(transparent)]
  Archive(#[from] ArchiveError),
}

impl VariantError {
  pub fn kind(&self) -> FailureKind {
    match self {
      Self::Config(_) => FailureKind::Config,
      Self::Stage(_) | Self::Clear(_) => FailureKind::Stage,
      Self::Build(_) => FailureKind::Build,
      Self::Archive(_) => FailureKind::Archive,
    }
  }
}

/// Errors that stop a run before any variant is attempted.
#[derive(Debug, Error)]
pub enum PipelineError {
  #[error("variant discovery failed: {0}")]
  Discovery(#[from] DiscoveryError),

  #[error("failed to back up the resource document: {0}")]
  Backup(#[from] GuardError),
}

/// Sequential build loop over discovered variants.
pub struct Pipeline<T> {
  settings: Settings,
  toolchain: T,
  archiver: Archiver,
  slot: PayloadSlot,
}

impl<T: Toolchain> Pipeline<T> {
  pub fn new(settings: Settings, toolchain: T) -> Self {
    let archiver = Archiver::new(
      settings.project_dir.clone(),
      settings.output_dir.clone(),
      settings.artifact.clone(),
      settings.output,
      settings.architectures.clone(),
    );
    let slot = PayloadSlot::new(settings.staging_path.clone());
    Self {
      settings,
      toolchain,
      archiver,
      slot,
    }
  }

  /// Scan the configured input directory with the configured layout.
  pub fn discover(&self) -> Result<Discovery, PipelineError> {
    Ok(discover(
      &self.settings.input_dir,
      self.settings.layout,
      self.settings.core_key(),
    )?)
  }

  /// Build every discovered variant.
  ///
  /// Per-variant failures land in the report; only a failed backup aborts the
  /// run. Setting `cancel` skips every variant not yet started. The resource
  /// document is restored before returning, and a failed restore is recorded in
  /// [`RunReport::restore_error`].
  pub fn run(&mut self, discovery: Discovery, cancel: &AtomicBool) -> Result<RunReport, PipelineError> {
    let mut report = RunReport {
      diagnostics: discovery.diagnostics.iter().map(|d| d.to_string()).collect(),
      ..Default::default()
    };

    if discovery.variants.is_empty() {
      info!("no variants to build");
      return Ok(report);
    }

    let mut guard = ConfigGuard::acquire(&self.settings.config_path, &self.settings.backup_path)?;
    let original = String::from_utf8_lossy(guard.original()).into_owned();
    let total = discovery.variants.len();
    let mut halted: Option<String> = None;

    for (index, variant) in discovery.variants.iter().enumerate() {
      if halted.is_none() && cancel.load(Ordering::SeqCst) {
        warn!("run cancelled, skipping remaining variants");
        report.cancelled = true;
        halted = Some("run cancelled".to_string());
      }
      if let Some(reason) = &halted {
        report.outcomes.push(VariantOutcome::new(
          variant,
          VariantStatus::Skipped { reason: reason.clone() },
        ));
        continue;
      }

      info!(variant = %variant, progress = %format!("{}/{}", index + 1, total), "building variant");

      let status = match self.build_variant(&original, variant) {
        Ok(artifacts) => VariantStatus::Succeeded { artifacts },
        Err(e) => {
          let kind = e.kind();
          error!(variant = %variant.output_key(), kind = kind.as_str(), error = %e, "variant failed");
          if self.settings.failure_policy == FailurePolicy::FailFast {
            halted = Some(format!("stopped after {} failed", variant.output_key()));
          }
          VariantStatus::Failed {
            kind,
            message: e.to_string(),
          }
        }
      };
      report.outcomes.push(VariantOutcome::new(variant, status));
    }

    if let Err(e) = guard.restore() {
      error!(error = %e, "failed to restore the resource document");
      report.restore_error = Some(e.to_string());
    }

    info!(
      succeeded = report.succeeded(),
      failed = report.failed(),
      skipped = report.skipped(),
      "run complete"
    );
    Ok(report)
  }

  fn build_variant(&mut self, original: &str, variant: &VariantDefinition) -> Result<Vec<PathBuf>, VariantError> {
    let document = self.patched_document(original, variant)?;

    self.archiver.clear_stale().map_err(VariantError::Clear)?;
    let lease = self.slot.lease(&variant.source_path)?;
    document.save(&self.settings.config_path)?;
    self.toolchain.build(&self.settings.project_dir)?;
    drop(lease);

    Ok(self.archiver.archive(variant)?)
  }

  /// The original document with the group's control entries overlaid and the
  /// variant's identifier and display name set.
  fn patched_document(&self, original: &str, variant: &VariantDefinition) -> Result<ResourceDocument, DocumentError> {
    let mut document = ResourceDocument::parse(original)?;

    if let Some(group) = &variant.group {
      for (key, value) in &group.entries {
        document.upsert(key, value)?;
      }
    }

    document.set(self.settings.id_key.key(), &variant.normalized_id)?;
    document.set(KEY_NAME, &variant.display_name)?;
    Ok(document)
  }
}
