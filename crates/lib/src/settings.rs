//! Project settings.
//!
//! Settings start from a named [`Profile`], are overridden by the optional
//! `romgen.json` at the project root, and finally by command-line flags.
//! Relative paths resolve against the project root.
//!
//! ```json
//! {
//!   "profile": "grouped",
//!   "architectures": ["arm64-v8a", "x86_64"],
//!   "failure_policy": "fail-fast"
//! }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::archive::OutputShape;
use crate::consts::{
  ABIS, ARCH_PLACEHOLDER, DEFAULT_BACKUP_PATH, DEFAULT_CONFIG_PATH, DEFAULT_INPUT_DIR, DEFAULT_JNI_LIBS_DIR,
  DEFAULT_OUTPUT_DIR, DEFAULT_STAGING_PATH, KEY_CORE, KEY_ID, KEY_ROM_ID, LEGACY_ARTIFACT, PER_ARCH_ARTIFACT,
  PROJECT_ENV, SETTINGS_FILENAME,
};
use crate::pipeline::FailurePolicy;
use crate::toolchain::default_build_command;
use crate::variant::Layout;

#[derive(Debug, Error)]
pub enum SettingsError {
  #[error("project directory not found: {path}: {source}")]
  ProjectNotFound {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("invalid settings in {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("invalid settings: {0}")]
  Invalid(String),
}

/// Named bundles of strategy choices matching the two generations of input trees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Profile {
  /// Flat input, `config_rom_id` key, one artifact per variant.
  Legacy,
  /// Grouped input, `config_id` key, one artifact per variant and architecture.
  #[default]
  Grouped,
}

impl Profile {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Legacy => "legacy",
      Self::Grouped => "grouped",
    }
  }
}

/// Which resource key carries the variant identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdKey {
  /// `config_rom_id`
  RomId,
  /// `config_id`
  Id,
}

impl IdKey {
  pub fn key(&self) -> &'static str {
    match self {
      Self::RomId => KEY_ROM_ID,
      Self::Id => KEY_ID,
    }
  }
}

/// Contents of `romgen.json`. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsFile {
  pub profile: Option<Profile>,
  pub layout: Option<Layout>,
  pub id_key: Option<IdKey>,
  pub output: Option<OutputShape>,
  pub input_dir: Option<PathBuf>,
  pub output_dir: Option<PathBuf>,
  pub config_path: Option<PathBuf>,
  pub staging_path: Option<PathBuf>,
  pub backup_path: Option<PathBuf>,
  pub artifact: Option<String>,
  pub architectures: Option<Vec<String>>,
  pub build_command: Option<Vec<String>>,
  pub failure_policy: Option<FailurePolicy>,
}

/// Values taken from the command line; they win over the settings file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
  pub profile: Option<Profile>,
  pub failure_policy: Option<FailurePolicy>,
}

/// Fully resolved settings for one project.
#[derive(Debug, Clone)]
pub struct Settings {
  pub project_dir: PathBuf,
  pub profile: Profile,
  pub layout: Layout,
  pub id_key: IdKey,
  pub output: OutputShape,
  pub input_dir: PathBuf,
  pub output_dir: PathBuf,
  pub config_path: PathBuf,
  pub staging_path: PathBuf,
  pub backup_path: PathBuf,
  /// Toolchain output relative to the project root; may contain `{arch}`.
  pub artifact: String,
  pub architectures: Vec<String>,
  pub build_command: Vec<String>,
  pub failure_policy: FailurePolicy,
}

impl Settings {
  /// Defaults of `profile` for a project rooted at `project_dir`.
  pub fn for_profile(project_dir: PathBuf, profile: Profile) -> Self {
    let (layout, id_key, output, artifact) = match profile {
      Profile::Legacy => (Layout::Flat, IdKey::RomId, OutputShape::Flat, LEGACY_ARTIFACT),
      Profile::Grouped => (Layout::Grouped, IdKey::Id, OutputShape::PerArch, PER_ARCH_ARTIFACT),
    };

    Self {
      input_dir: project_dir.join(DEFAULT_INPUT_DIR),
      output_dir: project_dir.join(DEFAULT_OUTPUT_DIR),
      config_path: project_dir.join(DEFAULT_CONFIG_PATH),
      staging_path: project_dir.join(DEFAULT_STAGING_PATH),
      backup_path: project_dir.join(DEFAULT_BACKUP_PATH),
      project_dir,
      profile,
      layout,
      id_key,
      output,
      artifact: artifact.to_string(),
      architectures: ABIS.iter().map(|a| a.to_string()).collect(),
      build_command: default_build_command(),
      failure_policy: FailurePolicy::default(),
    }
  }

  /// Resolve settings for the project at `project_dir`.
  pub fn load(project_dir: &Path, overrides: &Overrides) -> Result<Self, SettingsError> {
    let project_dir = dunce::canonicalize(project_dir).map_err(|source| SettingsError::ProjectNotFound {
      path: project_dir.to_path_buf(),
      source,
    })?;

    let file = read_settings_file(&project_dir.join(SETTINGS_FILENAME))?;
    let profile = overrides.profile.or(file.profile).unwrap_or_default();

    let mut settings = Self::for_profile(project_dir, profile);
    settings.apply(file);
    if let Some(policy) = overrides.failure_policy {
      settings.failure_policy = policy;
    }

    settings.validate()?;
    debug!(project = ?settings.project_dir, profile = profile.as_str(), "settings resolved");
    Ok(settings)
  }

  /// Overlay the fields present in `file`.
  pub fn apply(&mut self, file: SettingsFile) {
    let root = self.project_dir.clone();
    let resolve = |p: PathBuf| if p.is_absolute() { p } else { root.join(p) };

    if let Some(v) = file.layout {
      self.layout = v;
    }
    if let Some(v) = file.id_key {
      self.id_key = v;
    }
    if let Some(v) = file.output {
      self.output = v;
    }
    if let Some(v) = file.input_dir {
      self.input_dir = resolve(v);
    }
    if let Some(v) = file.output_dir {
      self.output_dir = resolve(v);
    }
    if let Some(v) = file.config_path {
      self.config_path = resolve(v);
    }
    if let Some(v) = file.staging_path {
      self.staging_path = resolve(v);
    }
    if let Some(v) = file.backup_path {
      self.backup_path = resolve(v);
    }
    if let Some(v) = file.artifact {
      self.artifact = v;
    }
    if let Some(v) = file.architectures {
      self.architectures = v;
    }
    if let Some(v) = file.build_command {
      self.build_command = v;
    }
    if let Some(v) = file.failure_policy {
      self.failure_policy = v;
    }
  }

  pub fn validate(&self) -> Result<(), SettingsError> {
    if self.build_command.first().is_none_or(|p| p.is_empty()) {
      return Err(SettingsError::Invalid("build_command must name a program".to_string()));
    }

    let templated = self.artifact.contains(ARCH_PLACEHOLDER);
    match self.output {
      OutputShape::Flat if templated => Err(SettingsError::Invalid(format!(
        "artifact '{}' contains {} but output is flat",
        self.artifact, ARCH_PLACEHOLDER
      ))),
      OutputShape::PerArch if self.architectures.is_empty() => Err(SettingsError::Invalid(
        "per-arch output needs at least one architecture".to_string(),
      )),
      OutputShape::PerArch if !templated => Err(SettingsError::Invalid(format!(
        "artifact '{}' must contain {} for per-arch output",
        self.artifact, ARCH_PLACEHOLDER
      ))),
      _ => Ok(()),
    }
  }

  /// Control file entry that tags a variant group.
  pub fn core_key(&self) -> &'static str {
    KEY_CORE
  }

  /// Native library root the core downloader writes into.
  pub fn jni_libs_dir(&self) -> PathBuf {
    self.project_dir.join(DEFAULT_JNI_LIBS_DIR)
  }
}

fn read_settings_file(path: &Path) -> Result<SettingsFile, SettingsError> {
  if !path.exists() {
    return Ok(SettingsFile::default());
  }
  let content = fs::read_to_string(path).map_err(|source| SettingsError::Read {
    path: path.to_path_buf(),
    source,
  })?;
  serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
    path: path.to_path_buf(),
    source,
  })
}

/// `$ROMGEN_PROJECT` when set, otherwise the current directory.
pub fn default_project_dir() -> io::Result<PathBuf> {
  match std::env::var_os(PROJECT_ENV) {
    Some(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)),
    _ => std::env::current_dir(),
  }
}
