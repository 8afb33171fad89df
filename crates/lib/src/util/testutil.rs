//! Test utilities for romgen-lib.
//!
//! Helpers for building scratch project trees and cross-platform build commands.

use std::path::Path;

/// Write `content` to `path`, creating parent directories.
pub fn write_file(path: &Path, content: &str) {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).unwrap();
  }
  std::fs::write(path, content).unwrap();
}

/// A resource document holding the given `<string>` entries.
pub fn control_xml(entries: &[(&str, &str)]) -> String {
  let mut xml = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<resources>\n");
  for (key, value) in entries {
    xml.push_str(&format!("    <string name=\"{}\">{}</string>\n", key, value));
  }
  xml.push_str("</resources>\n");
  xml
}

/// Returns the argv to run a shell script.
#[cfg(unix)]
pub fn shell_cmd(script: &str) -> Vec<String> {
  vec!["/bin/sh".to_string(), "-c".to_string(), script.to_string()]
}

#[cfg(windows)]
pub fn shell_cmd(script: &str) -> Vec<String> {
  vec!["cmd.exe".to_string(), "/C".to_string(), script.to_string()]
}
