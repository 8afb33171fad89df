//! Scoped backup of the shared resource document.
//!
//! [`ConfigGuard`] snapshots the live document before any variant touches it and
//! writes the snapshot back when restored or dropped. The snapshot is also kept on
//! disk so that a run killed without unwinding can be recovered with
//! [`recover_backup`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum GuardError {
  #[error(
    "a backup from an interrupted run already exists: {backup_path}\n\
     Run 'romgen restore' to put it back over {live_path}, or remove it if the live file is correct."
  )]
  StaleBackup { live_path: PathBuf, backup_path: PathBuf },

  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write backup {path}: {source}")]
  Backup {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to restore {path}: {source}")]
  Restore {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("no backup found at {0}")]
  NoBackup(PathBuf),
}

/// Holds the original bytes of the live document until they are written back.
#[derive(Debug)]
pub struct ConfigGuard {
  live_path: PathBuf,
  backup_path: PathBuf,
  original: Vec<u8>,
  restored: bool,
}

impl ConfigGuard {
  /// Snapshot `live_path` into memory and into `backup_path`.
  ///
  /// Refuses to start when `backup_path` already exists, since that file is the
  /// only copy of the original left behind by an interrupted run.
  pub fn acquire(live_path: &Path, backup_path: &Path) -> Result<Self, GuardError> {
    if backup_path.exists() {
      return Err(GuardError::StaleBackup {
        live_path: live_path.to_path_buf(),
        backup_path: backup_path.to_path_buf(),
      });
    }

    let original = fs::read(live_path).map_err(|source| GuardError::Read {
      path: live_path.to_path_buf(),
      source,
    })?;

    let backup_err = |source| GuardError::Backup {
      path: backup_path.to_path_buf(),
      source,
    };
    if let Some(parent) = backup_path.parent() {
      fs::create_dir_all(parent).map_err(backup_err)?;
    }
    fs::write(backup_path, &original).map_err(backup_err)?;

    debug!(live = ?live_path, backup = ?backup_path, bytes = original.len(), "config backed up");

    Ok(Self {
      live_path: live_path.to_path_buf(),
      backup_path: backup_path.to_path_buf(),
      original,
      restored: false,
    })
  }

  /// The document content as it was when the guard was acquired.
  pub fn original(&self) -> &[u8] {
    &self.original
  }

  /// Write the original content back and drop the on-disk backup.
  ///
  /// Safe to call repeatedly; later calls rewrite the same bytes.
  pub fn restore(&mut self) -> Result<(), GuardError> {
    fs::write(&self.live_path, &self.original).map_err(|source| GuardError::Restore {
      path: self.live_path.clone(),
      source,
    })?;
    self.restored = true;

    if let Err(e) = fs::remove_file(&self.backup_path)
      && e.kind() != io::ErrorKind::NotFound
    {
      // The live file is already correct; a leftover backup only blocks the next run.
      error!(path = ?self.backup_path, error = %e, "failed to remove config backup");
    }

    info!(path = ?self.live_path, "config restored");
    Ok(())
  }
}

impl Drop for ConfigGuard {
  fn drop(&mut self) {
    if self.restored {
      return;
    }
    if let Err(e) = self.restore() {
      error!(error = %e, backup = ?self.backup_path, "config not restored, project tree left modified");
    }
  }
}

/// Put a backup left by an interrupted run back over the live document.
pub fn recover_backup(live_path: &Path, backup_path: &Path) -> Result<(), GuardError> {
  if !backup_path.exists() {
    return Err(GuardError::NoBackup(backup_path.to_path_buf()));
  }

  let original = fs::read(backup_path).map_err(|source| GuardError::Read {
    path: backup_path.to_path_buf(),
    source,
  })?;
  fs::write(live_path, &original).map_err(|source| GuardError::Restore {
    path: live_path.to_path_buf(),
    source,
  })?;
  fs::remove_file(backup_path).map_err(|source| GuardError::Backup {
    path: backup_path.to_path_buf(),
    source,
  })?;

  info!(path = ?live_path, "config recovered from backup");
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;
  use tracing_test::traced_test;

  fn setup(content: &str) -> (TempDir, PathBuf, PathBuf) {
    let temp = TempDir::new().unwrap();
    let live = temp.path().join("config.xml");
    let backup = temp.path().join(".romgen").join("config.xml.bak");
    fs::write(&live, content).unwrap();
    (temp, live, backup)
  }

  #[test]
  fn acquire_writes_backup() {
    let (_temp, live, backup) = setup("<resources/>");

    let guard = ConfigGuard::acquire(&live, &backup).unwrap();

    assert_eq!(fs::read(&backup).unwrap(), b"<resources/>");
    assert_eq!(guard.original(), b"<resources/>");
  }

  #[test]
  fn restore_is_idempotent() {
    let (_temp, live, backup) = setup("original");
    let mut guard = ConfigGuard::acquire(&live, &backup).unwrap();

    fs::write(&live, "mutated").unwrap();
    guard.restore().unwrap();
    guard.restore().unwrap();

    assert_eq!(fs::read_to_string(&live).unwrap(), "original");
    assert!(!backup.exists());
  }

  #[test]
  #[traced_test]
  fn drop_restores_live_document() {
    let (_temp, live, backup) = setup("original");
    {
      let _guard = ConfigGuard::acquire(&live, &backup).unwrap();
      fs::write(&live, "mutated").unwrap();
    }

    assert_eq!(fs::read_to_string(&live).unwrap(), "original");
    assert!(!backup.exists());
    assert!(logs_contain("config restored"));
  }

  #[test]
  fn stale_backup_blocks_acquire() {
    let (_temp, live, backup) = setup("original");
    fs::create_dir_all(backup.parent().unwrap()).unwrap();
    fs::write(&backup, "from interrupted run").unwrap();

    let err = ConfigGuard::acquire(&live, &backup).unwrap_err();
    assert!(matches!(err, GuardError::StaleBackup { .. }));
    assert_eq!(fs::read_to_string(&live).unwrap(), "original");
  }

  #[test]
  fn recover_backup_restores_and_removes() {
    let (_temp, live, backup) = setup("mutated");
    fs::create_dir_all(backup.parent().unwrap()).unwrap();
    fs::write(&backup, "original").unwrap();

    recover_backup(&live, &backup).unwrap();

    assert_eq!(fs::read_to_string(&live).unwrap(), "original");
    assert!(!backup.exists());
  }

  #[test]
  fn recover_without_backup_fails() {
    let (_temp, live, backup) = setup("original");
    assert!(matches!(recover_backup(&live, &backup), Err(GuardError::NoBackup(_))));
  }

  #[test]
  fn acquire_missing_live_document_fails() {
    let temp = TempDir::new().unwrap();
    let err = ConfigGuard::acquire(&temp.path().join("absent.xml"), &temp.path().join("b.bak")).unwrap_err();
    assert!(matches!(err, GuardError::Read { .. }));
    assert!(!temp.path().join("b.bak").exists());
  }
}
