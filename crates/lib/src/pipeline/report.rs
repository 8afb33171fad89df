//! Per-run summary of what happened to every variant.

use std::path::PathBuf;

use serde::Serialize;

use crate::variant::VariantDefinition;

/// Which step a failed variant stopped at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
  /// The resource document could not be parsed or lacked a required key.
  Config,
  /// The payload could not be staged, or the previous artifact could not be cleared.
  Stage,
  /// The toolchain exited non-zero or could not be started.
  Build,
  /// The build succeeded but its artifact was missing or could not be copied.
  Archive,
}

impl FailureKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Config => "config",
      Self::Stage => "stage",
      Self::Build => "build",
      Self::Archive => "archive",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum VariantStatus {
  Succeeded { artifacts: Vec<PathBuf> },
  Failed { kind: FailureKind, message: String },
  Skipped { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct VariantOutcome {
  pub id: String,
  pub display_name: String,
  pub group: Option<String>,
  pub source: PathBuf,
  #[serde(flatten)]
  pub status: VariantStatus,
}

impl VariantOutcome {
  pub fn new(variant: &VariantDefinition, status: VariantStatus) -> Self {
    Self {
      id: variant.normalized_id.clone(),
      display_name: variant.display_name.clone(),
      group: variant.group_tag().map(str::to_string),
      source: variant.source_path.clone(),
      status,
    }
  }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
  pub outcomes: Vec<VariantOutcome>,
  /// Discovery problems that kept groups or payloads out of the run.
  pub diagnostics: Vec<String>,
  /// Set when the resource document could not be put back.
  pub restore_error: Option<String>,
  pub cancelled: bool,
}

impl RunReport {
  pub fn succeeded(&self) -> usize {
    self.count(|s| matches!(s, VariantStatus::Succeeded { .. }))
  }

  pub fn failed(&self) -> usize {
    self.count(|s| matches!(s, VariantStatus::Failed { .. }))
  }

  pub fn skipped(&self) -> usize {
    self.count(|s| matches!(s, VariantStatus::Skipped { .. }))
  }

  /// Outcome recorded for the variant with the given id, first match wins.
  pub fn outcome(&self, id: &str) -> Option<&VariantOutcome> {
    self.outcomes.iter().find(|o| o.id == id)
  }

  /// No variant failed or was skipped, and the document was restored.
  pub fn is_success(&self) -> bool {
    self.failed() == 0 && self.skipped() == 0 && self.restore_error.is_none()
  }

  fn count(&self, pred: impl Fn(&VariantStatus) -> bool) -> usize {
    self.outcomes.iter().filter(|o| pred(&o.status)).count()
  }
}
