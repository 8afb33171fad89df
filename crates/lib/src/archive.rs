//! Archival of build outputs under collision-free names.
//!
//! ```text
//! output (flat)             output (per-arch)
//! ├── tetris.apk            ├── arm64-v8a/
//! └── gambatte_zelda.apk    │   └── gambatte_tetris.apk
//!                           └── x86_64/
//!                               └── gambatte_tetris.apk
//! ```

use std::io;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::consts::ARCH_PLACEHOLDER;
use crate::util::fs::copy_creating_parents;
use crate::variant::VariantDefinition;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputShape {
  /// One artifact per variant, directly under the output root.
  #[default]
  Flat,
  /// One artifact per variant and architecture, nested by architecture.
  PerArch,
}

#[derive(Debug, Error)]
pub enum ArchiveError {
  #[error("failed to remove stale artifact {path}: {error}")]
  Clear {
    path: PathBuf,
    #[source]
    error: io::Error,
  },

  #[error("artifact not found after a successful build: {0}")]
  NotFound(PathBuf),

  #[error("failed to archive {source_path} to {dest}: {error}")]
  Copy {
    source_path: PathBuf,
    dest: PathBuf,
    #[source]
    error: io::Error,
  },
}

/// Copies the toolchain's fixed output(s) to per-variant destinations.
#[derive(Debug, Clone)]
pub struct Archiver {
  project_dir: PathBuf,
  output_dir: PathBuf,
  artifact_template: String,
  shape: OutputShape,
  architectures: Vec<String>,
}

impl Archiver {
  /// `artifact_template` is relative to `project_dir` and may contain `{arch}`
  /// when `shape` is [`OutputShape::PerArch`].
  pub fn new(
    project_dir: PathBuf,
    output_dir: PathBuf,
    artifact_template: String,
    shape: OutputShape,
    architectures: Vec<String>,
  ) -> Self {
    Self {
      project_dir,
      output_dir,
      artifact_template,
      shape,
      architectures,
    }
  }

  /// Architectures archived per variant; `None` stands for the single flat artifact.
  fn targets(&self) -> Vec<Option<&str>> {
    match self.shape {
      OutputShape::Flat => vec![None],
      OutputShape::PerArch => self.architectures.iter().map(|a| Some(a.as_str())).collect(),
    }
  }

  /// Where the toolchain leaves its output for `arch`.
  pub fn artifact_path(&self, arch: Option<&str>) -> PathBuf {
    let relative = match arch {
      Some(arch) => self.artifact_template.replace(ARCH_PLACEHOLDER, arch),
      None => self.artifact_template.clone(),
    };
    self.project_dir.join(relative)
  }

  /// Archive path for `variant`: `{tag}_{id}.{ext}` or `{id}.{ext}`, under `{arch}/` when nested.
  pub fn destination(&self, variant: &VariantDefinition, arch: Option<&str>, extension: Option<&str>) -> PathBuf {
    let mut name = variant.output_key();
    if let Some(ext) = extension {
      name.push('.');
      name.push_str(ext);
    }
    match arch {
      Some(arch) => self.output_dir.join(arch).join(name),
      None => self.output_dir.join(name),
    }
  }

  /// Remove artifacts left by an earlier build so a build that reports success
  /// without producing output is caught instead of archiving the old file.
  pub fn clear_stale(&self) -> Result<(), ArchiveError> {
    for arch in self.targets() {
      let path = self.artifact_path(arch);
      match std::fs::remove_file(&path) {
        Ok(()) => debug!(path = ?path, "removed stale artifact"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(error) => return Err(ArchiveError::Clear { path, error }),
      }
    }
    Ok(())
  }

  /// Copy every expected artifact for `variant` into the output tree.
  ///
  /// All artifacts are checked before any is copied, so a missing one leaves
  /// no partial set behind.
  pub fn archive(&self, variant: &VariantDefinition) -> Result<Vec<PathBuf>, ArchiveError> {
    let mut plan = Vec::new();
    for arch in self.targets() {
      let source = self.artifact_path(arch);
      if !source.is_file() {
        return Err(ArchiveError::NotFound(source));
      }
      let extension = source.extension().map(|e| e.to_string_lossy().into_owned());
      let dest = self.destination(variant, arch, extension.as_deref());
      plan.push((source, dest));
    }

    let mut archived = Vec::with_capacity(plan.len());
    for (source, dest) in plan {
      let bytes = copy_creating_parents(&source, &dest).map_err(|error| ArchiveError::Copy {
        source_path: source.clone(),
        dest: dest.clone(),
        error,
      })?;
      debug!(from = ?source, to = ?dest, bytes, "artifact copied");
      archived.push(dest);
    }

    info!(variant = %variant.normalized_id, count = archived.len(), "artifacts archived");
    Ok(archived)
  }
}
