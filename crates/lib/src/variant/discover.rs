//! Variant discovery from an input directory.
//!
//! Two layouts are understood:
//!
//! ```text
//! flat/                     grouped/
//! ├── Tetris.gb             ├── gb/
//! └── Metroid II.gb         │   ├── config.xml   # control file, carries the core key
//!                           │   ├── Tetris.gb
//!                           │   └── Metroid II.gb
//!                           └── gba/
//!                               ├── config.xml
//!                               └── Advance Wars.gba
//! ```
//!
//! Listing order is sorted by file name so repeated runs see the same sequence.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use super::types::{VariantDefinition, VariantGroup};
use crate::consts::{CONTROL_FILENAME, IGNORE_FILENAME};
use crate::resource::{DocumentError, ResourceDocument};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Layout {
  /// Every regular file under the root is a variant.
  Flat,
  /// Every subdirectory holding a control file is a group of variants.
  #[default]
  Grouped,
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
  #[error("input directory not found: {0}")]
  MissingRoot(PathBuf),

  #[error("failed to scan {path}: {message}")]
  Scan { path: PathBuf, message: String },

  #[error("malformed control file {path}: {source}")]
  MalformedControl {
    path: PathBuf,
    #[source]
    source: DocumentError,
  },

  #[error("group {dir} is unconfigured: control file has no '{key}' entry")]
  UnconfiguredGroup { dir: PathBuf, key: String },

  #[error("{second} collides with {first} on output key '{key}'")]
  DuplicateId {
    key: String,
    first: PathBuf,
    second: PathBuf,
  },

  #[error("{0} has no alphanumeric characters to derive an id from")]
  EmptyId(PathBuf),
}

/// Variants found under an input root, plus the problems that excluded others.
#[derive(Debug, Default)]
pub struct Discovery {
  pub variants: Vec<VariantDefinition>,
  pub diagnostics: Vec<DiscoveryError>,
}

impl Discovery {
  fn accept(&mut self, candidates: Vec<VariantDefinition>, seen: &mut HashMap<String, PathBuf>) {
    for variant in candidates {
      if variant.normalized_id.is_empty() {
        warn!(path = ?variant.source_path, "skipping payload with empty id");
        self.diagnostics.push(DiscoveryError::EmptyId(variant.source_path));
        continue;
      }

      let key = variant.output_key();
      if let Some(first) = seen.get(&key) {
        warn!(key = %key, path = ?variant.source_path, "duplicate variant id");
        self.diagnostics.push(DiscoveryError::DuplicateId {
          key,
          first: first.clone(),
          second: variant.source_path,
        });
        continue;
      }

      seen.insert(key, variant.source_path.clone());
      self.variants.push(variant);
    }
  }

  fn reject(&mut self, error: DiscoveryError) {
    warn!(error = %error, "skipping input entry");
    self.diagnostics.push(error);
  }
}

/// Scan `root` for variants.
///
/// Only a missing or unreadable root is an error; problems with individual groups
/// or payloads are collected in [`Discovery::diagnostics`] and the scan continues.
/// `core_key` names the control file entry that tags a group.
pub fn discover(root: &Path, layout: Layout, core_key: &str) -> Result<Discovery, DiscoveryError> {
  if !root.is_dir() {
    return Err(DiscoveryError::MissingRoot(root.to_path_buf()));
  }

  let mut discovery = Discovery::default();
  let mut seen = HashMap::new();

  match layout {
    Layout::Flat => {
      let (payloads, problems) = payload_files(root, false)?;
      problems.into_iter().for_each(|e| discovery.reject(e));
      discovery.accept(
        payloads
          .into_iter()
          .map(|p| VariantDefinition::from_payload(p, None))
          .collect(),
        &mut seen,
      );
    }
    Layout::Grouped => {
      let (entries, problems) = list_dir(root)?;
      problems.into_iter().for_each(|e| discovery.reject(e));

      for entry in entries {
        let dir = entry.path();
        if !entry.file_type().is_dir() {
          debug!(path = ?dir, "ignoring loose file in grouped layout");
          continue;
        }

        let control = dir.join(CONTROL_FILENAME);
        if !control.is_file() {
          debug!(path = ?dir, "ignoring directory without control file");
          continue;
        }

        let group = match load_group(dir, &control, core_key) {
          Ok(group) => Arc::new(group),
          Err(e) => {
            discovery.reject(e);
            continue;
          }
        };

        let payloads = match payload_files(dir, true) {
          Ok((payloads, problems)) => {
            problems.into_iter().for_each(|e| discovery.reject(e));
            payloads
          }
          Err(e) => {
            discovery.reject(e);
            continue;
          }
        };

        debug!(group = %group.tag, count = payloads.len(), "found variant group");
        discovery.accept(
          payloads
            .into_iter()
            .map(|p| VariantDefinition::from_payload(p, Some(group.clone())))
            .collect(),
          &mut seen,
        );
      }
    }
  }

  info!(
    root = ?root,
    variants = discovery.variants.len(),
    problems = discovery.diagnostics.len(),
    "discovery complete"
  );
  Ok(discovery)
}

fn load_group(dir: &Path, control: &Path, core_key: &str) -> Result<VariantGroup, DiscoveryError> {
  let doc = ResourceDocument::load(control).map_err(|source| DiscoveryError::MalformedControl {
    path: control.to_path_buf(),
    source,
  })?;

  let tag = doc
    .get(core_key)
    .map(|t| t.trim().to_string())
    .filter(|t| !t.is_empty())
    .ok_or_else(|| DiscoveryError::UnconfiguredGroup {
      dir: dir.to_path_buf(),
      key: core_key.to_string(),
    })?;

  Ok(VariantGroup {
    dir: dir.to_path_buf(),
    tag,
    entries: doc.entries(),
  })
}

/// Regular files directly under `dir`, minus the ignore file and, inside a group,
/// the control file, plus the entries that could not be read.
fn payload_files(dir: &Path, in_group: bool) -> Result<(Vec<PathBuf>, Vec<DiscoveryError>), DiscoveryError> {
  let (entries, problems) = list_dir(dir)?;
  let payloads = entries
    .into_iter()
    .filter(|e| e.file_type().is_file())
    .filter(|e| {
      let name = e.file_name();
      name != IGNORE_FILENAME && !(in_group && name == CONTROL_FILENAME)
    })
    .map(DirEntry::into_path)
    .collect();
  Ok((payloads, problems))
}

/// Entries directly under `dir`, sorted by name.
///
/// Failing to read `dir` itself is an error. A child that cannot be stat'ed
/// (a dangling symlink, a permission problem) is returned as a diagnostic.
fn list_dir(dir: &Path) -> Result<(Vec<DirEntry>, Vec<DiscoveryError>), DiscoveryError> {
  let mut entries = Vec::new();
  let mut problems = Vec::new();

  let walker = WalkDir::new(dir)
    .min_depth(1)
    .max_depth(1)
    .follow_links(true)
    .sort_by_file_name();

  for item in walker {
    match item {
      Ok(entry) => entries.push(entry),
      Err(e) if e.depth() == 0 => {
        return Err(DiscoveryError::Scan {
          path: dir.to_path_buf(),
          message: e.to_string(),
        });
      }
      Err(e) => problems.push(DiscoveryError::Scan {
        path: e.path().map_or_else(|| dir.to_path_buf(), Path::to_path_buf),
        message: e.to_string(),
      }),
    }
  }

  Ok((entries, problems))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::consts::KEY_CORE;
  use crate::util::testutil::{control_xml, write_file};
  use tempfile::TempDir;

  fn ids(discovery: &Discovery) -> Vec<String> {
    discovery.variants.iter().map(|v| v.output_key()).collect()
  }

  #[test]
  fn flat_layout_lists_files_in_name_order() {
    let temp = TempDir::new().unwrap();
    write_file(&temp.path().join("Zelda.gb"), "z");
    write_file(&temp.path().join("Metroid II.gb"), "m");
    write_file(&temp.path().join(".gitignore"), "*");
    std::fs::create_dir(temp.path().join("nested")).unwrap();

    let discovery = discover(temp.path(), Layout::Flat, KEY_CORE).unwrap();

    assert_eq!(ids(&discovery), vec!["metroidii", "zelda"]);
    assert!(discovery.diagnostics.is_empty());
  }

  #[test]
  fn empty_root_yields_nothing() {
    let temp = TempDir::new().unwrap();
    let discovery = discover(temp.path(), Layout::Grouped, KEY_CORE).unwrap();
    assert!(discovery.variants.is_empty());
    assert!(discovery.diagnostics.is_empty());
  }

  #[test]
  fn missing_root_is_an_error() {
    let temp = TempDir::new().unwrap();
    let err = discover(&temp.path().join("absent"), Layout::Flat, KEY_CORE).unwrap_err();
    assert!(matches!(err, DiscoveryError::MissingRoot(_)));
  }

  #[test]
  fn grouped_layout_tags_variants() {
    let temp = TempDir::new().unwrap();
    write_file(&temp.path().join("gb/config.xml"), &control_xml(&[("config_core", "gambatte")]));
    write_file(&temp.path().join("gb/Tetris.gb"), "t");
    write_file(&temp.path().join("gb/.gitignore"), "*");
    write_file(&temp.path().join("gba/config.xml"), &control_xml(&[("config_core", "mgba")]));
    write_file(&temp.path().join("gba/Advance Wars.gba"), "a");
    write_file(&temp.path().join("loose.bin"), "x");
    write_file(&temp.path().join("notes/readme.txt"), "no control file here");

    let discovery = discover(temp.path(), Layout::Grouped, KEY_CORE).unwrap();

    assert_eq!(ids(&discovery), vec!["gambatte_tetris", "mgba_advancewars"]);
    assert_eq!(discovery.variants[0].group_tag(), Some("gambatte"));
    assert!(discovery.diagnostics.is_empty());
  }

  #[test]
  fn grouped_layout_skips_bad_groups_and_continues() {
    let temp = TempDir::new().unwrap();
    write_file(&temp.path().join("a/config.xml"), "<resources><string name=\"config_core\">x");
    write_file(&temp.path().join("a/One.bin"), "1");
    write_file(&temp.path().join("b/config.xml"), &control_xml(&[("config_name", "no core")]));
    write_file(&temp.path().join("b/Two.bin"), "2");
    write_file(&temp.path().join("c/config.xml"), &control_xml(&[("config_core", "fceumm")]));
    write_file(&temp.path().join("c/Three.nes"), "3");

    let discovery = discover(temp.path(), Layout::Grouped, KEY_CORE).unwrap();

    assert_eq!(ids(&discovery), vec!["fceumm_three"]);
    assert_eq!(discovery.diagnostics.len(), 2);
    assert!(matches!(discovery.diagnostics[0], DiscoveryError::MalformedControl { .. }));
    assert!(matches!(discovery.diagnostics[1], DiscoveryError::UnconfiguredGroup { .. }));
  }

  #[test]
  fn duplicate_ids_are_reported_not_merged() {
    let temp = TempDir::new().unwrap();
    write_file(&temp.path().join("gb/config.xml"), &control_xml(&[("config_core", "gambatte")]));
    write_file(&temp.path().join("gb/Mega Man.gb"), "1");
    write_file(&temp.path().join("gb/MegaMan.gbc"), "2");

    let discovery = discover(temp.path(), Layout::Grouped, KEY_CORE).unwrap();

    assert_eq!(discovery.variants.len(), 1);
    assert_eq!(discovery.variants[0].display_name, "Mega Man");
    match &discovery.diagnostics[..] {
      [DiscoveryError::DuplicateId { key, .. }] => assert_eq!(key, "gambatte_megaman"),
      other => panic!("expected one duplicate diagnostic, got {:?}", other),
    }
  }

  #[test]
  fn same_id_in_different_groups_is_allowed() {
    let temp = TempDir::new().unwrap();
    write_file(&temp.path().join("a/config.xml"), &control_xml(&[("config_core", "gambatte")]));
    write_file(&temp.path().join("a/Tetris.gb"), "1");
    write_file(&temp.path().join("b/config.xml"), &control_xml(&[("config_core", "mgba")]));
    write_file(&temp.path().join("b/Tetris.gba"), "2");

    let discovery = discover(temp.path(), Layout::Grouped, KEY_CORE).unwrap();
    assert_eq!(ids(&discovery), vec!["gambatte_tetris", "mgba_tetris"]);
  }

  #[cfg(unix)]
  #[test]
  fn dangling_symlink_is_reported_and_scan_continues() {
    let temp = TempDir::new().unwrap();
    write_file(&temp.path().join("gb/config.xml"), &control_xml(&[("config_core", "gambatte")]));
    write_file(&temp.path().join("gb/Tetris.gb"), "t");
    std::os::unix::fs::symlink(temp.path().join("gone"), temp.path().join("stale-link")).unwrap();
    std::os::unix::fs::symlink(temp.path().join("gone"), temp.path().join("gb/Lost.gb")).unwrap();

    let discovery = discover(temp.path(), Layout::Grouped, KEY_CORE).unwrap();

    assert_eq!(ids(&discovery), vec!["gambatte_tetris"]);
    assert_eq!(discovery.diagnostics.len(), 2);
    for diagnostic in &discovery.diagnostics {
      assert!(matches!(diagnostic, DiscoveryError::Scan { .. }), "got {:?}", diagnostic);
    }
  }

  #[cfg(unix)]
  #[test]
  fn dangling_symlink_in_flat_root_is_skipped() {
    let temp = TempDir::new().unwrap();
    write_file(&temp.path().join("Zelda.gb"), "z");
    std::os::unix::fs::symlink(temp.path().join("gone"), temp.path().join("Broken.gb")).unwrap();

    let discovery = discover(temp.path(), Layout::Flat, KEY_CORE).unwrap();

    assert_eq!(ids(&discovery), vec!["zelda"]);
    match &discovery.diagnostics[..] {
      [DiscoveryError::Scan { path, .. }] => assert_eq!(path, &temp.path().join("Broken.gb")),
      other => panic!("expected one scan diagnostic, got {:?}", other),
    }
  }

  #[test]
  fn payload_without_alphanumerics_is_rejected() {
    let temp = TempDir::new().unwrap();
    write_file(&temp.path().join("!!!.bin"), "x");

    let discovery = discover(temp.path(), Layout::Flat, KEY_CORE).unwrap();
    assert!(discovery.variants.is_empty());
    assert!(matches!(discovery.diagnostics[0], DiscoveryError::EmptyId(_)));
  }
}
