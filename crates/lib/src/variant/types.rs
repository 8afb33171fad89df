use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Reduce a display name to a filesystem- and identifier-safe key.
///
/// Every character outside `[A-Za-z0-9]` is dropped and the rest is lowercased.
/// Applying it twice yields the same result as applying it once.
pub fn normalize(name: &str) -> String {
  name
    .chars()
    .filter(|c| c.is_ascii_alphanumeric())
    .map(|c| c.to_ascii_lowercase())
    .collect()
}

/// Display name of a payload file: its stem with apostrophes removed.
pub fn display_name(path: &Path) -> String {
  path
    .file_stem()
    .map(|s| s.to_string_lossy().replace('\'', ""))
    .unwrap_or_default()
}

/// Shared metadata of a variant group, read from its control file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantGroup {
  /// Group directory inside the input root.
  pub dir: PathBuf,
  /// Value of the core key, used to namespace archived artifacts.
  pub tag: String,
  /// Every `<string>` entry of the control file, overlaid onto the project
  /// document before each of the group's variants is built.
  pub entries: Vec<(String, String)>,
}

/// One buildable variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantDefinition {
  pub source_path: PathBuf,
  pub display_name: String,
  pub normalized_id: String,
  pub group: Option<Arc<VariantGroup>>,
}

impl VariantDefinition {
  /// Build a definition from a payload file, optionally belonging to a group.
  pub fn from_payload(source_path: PathBuf, group: Option<Arc<VariantGroup>>) -> Self {
    let display_name = display_name(&source_path);
    let normalized_id = normalize(&display_name);
    Self {
      source_path,
      display_name,
      normalized_id,
      group,
    }
  }

  pub fn group_tag(&self) -> Option<&str> {
    self.group.as_deref().map(|g| g.tag.as_str())
  }

  /// Key that must be unique across a run: `{tag}_{id}` when grouped, `{id}` otherwise.
  pub fn output_key(&self) -> String {
    match self.group_tag() {
      Some(tag) => format!("{}_{}", tag, self.normalized_id),
      None => self.normalized_id.clone(),
    }
  }

  /// Whether a user-supplied selector names this variant.
  ///
  /// `Tetris` and `tetris` select every variant with id `tetris`;
  /// `gambatte_tetris` selects only the one in the `gambatte` group.
  pub fn matches(&self, selector: &str) -> bool {
    let selector = selector.trim();
    normalize(selector) == self.normalized_id || selector.eq_ignore_ascii_case(&self.output_key())
  }
}

impl fmt::Display for VariantDefinition {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.group_tag() {
      Some(tag) => write!(f, "{} ({}/{})", self.display_name, tag, self.normalized_id),
      None => write!(f, "{} ({})", self.display_name, self.normalized_id),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn normalize_strips_and_lowercases() {
    assert_eq!(normalize("My ROM!"), "myrom");
    assert_eq!(normalize("Super Mario Bros. 3 (USA)"), "supermariobros3usa");
    assert_eq!(normalize("Pokémon"), "pokmon");
    assert_eq!(normalize("---"), "");
  }

  #[test]
  fn normalize_is_idempotent() {
    for input in ["My ROM!", "Zelda: Link's Awakening DX", "  ", "ÄBC-12_x", "already"] {
      let once = normalize(input);
      assert_eq!(normalize(&once), once, "input: {:?}", input);
    }
  }

  #[test]
  fn display_name_drops_extension_and_apostrophes() {
    assert_eq!(display_name(Path::new("in/Link's Awakening.gbc")), "Links Awakening");
    assert_eq!(display_name(Path::new("in/archive.tar.gz")), "archive.tar");
    assert_eq!(display_name(Path::new("in/noext")), "noext");
  }

  #[test]
  fn from_payload_derives_identity() {
    let v = VariantDefinition::from_payload(PathBuf::from("input/My ROM!.gba"), None);
    assert_eq!(v.display_name, "My ROM!");
    assert_eq!(v.normalized_id, "myrom");
    assert_eq!(v.group_tag(), None);
    assert_eq!(v.output_key(), "myrom");
  }

  #[test]
  fn output_key_includes_group_tag() {
    let group = Arc::new(VariantGroup {
      dir: PathBuf::from("input/gb"),
      tag: "gambatte".to_string(),
      entries: vec![],
    });
    let v = VariantDefinition::from_payload(PathBuf::from("input/gb/Tetris.gb"), Some(group));
    assert_eq!(v.output_key(), "gambatte_tetris");
    assert_eq!(v.to_string(), "Tetris (gambatte/tetris)");
  }

  #[test]
  fn matches_by_id_or_output_key() {
    let gambatte = Arc::new(VariantGroup {
      dir: PathBuf::from("input/gb"),
      tag: "gambatte".to_string(),
      entries: vec![],
    });
    let mgba = Arc::new(VariantGroup {
      dir: PathBuf::from("input/gba"),
      tag: "mgba".to_string(),
      entries: vec![],
    });
    let gb = VariantDefinition::from_payload(PathBuf::from("input/gb/Tetris.gb"), Some(gambatte));
    let gba = VariantDefinition::from_payload(PathBuf::from("input/gba/Tetris.gba"), Some(mgba));

    assert!(gb.matches("Tetris") && gba.matches("tetris"));
    assert!(gba.matches("mgba_tetris"));
    assert!(!gb.matches("mgba_tetris"));
    assert!(gb.matches("GAMBATTE_TETRIS"));
    assert!(!gb.matches("zelda"));
  }
}
