//! The fixed payload slot read by the build toolchain.
//!
//! The toolchain embeds whatever file sits at the staging path, so only one
//! variant can occupy it at a time. [`PayloadSlot::lease`] borrows the slot
//! mutably for the lifetime of the returned [`PayloadLease`], which makes
//! overlapping leases a compile error.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::util::fs::copy_creating_parents;

#[derive(Debug, Error)]
pub enum StageError {
  #[error("payload not found: {0}")]
  MissingPayload(PathBuf),

  #[error("failed to stage {source_path} at {slot}: {error}")]
  Copy {
    source_path: PathBuf,
    slot: PathBuf,
    #[source]
    error: io::Error,
  },
}

/// The single location the toolchain reads the active payload from.
#[derive(Debug)]
pub struct PayloadSlot {
  path: PathBuf,
}

impl PayloadSlot {
  pub fn new(path: PathBuf) -> Self {
    Self { path }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Copy `payload` into the slot, replacing whatever was staged before.
  pub fn lease(&mut self, payload: &Path) -> Result<PayloadLease<'_>, StageError> {
    if !payload.is_file() {
      return Err(StageError::MissingPayload(payload.to_path_buf()));
    }

    let bytes = copy_creating_parents(payload, &self.path).map_err(|error| StageError::Copy {
      source_path: payload.to_path_buf(),
      slot: self.path.clone(),
      error,
    })?;

    debug!(payload = ?payload, slot = ?self.path, bytes, "payload staged");
    Ok(PayloadLease {
      slot: self,
      payload: payload.to_path_buf(),
    })
  }
}

/// Exclusive use of the slot while one variant is built.
#[derive(Debug)]
pub struct PayloadLease<'a> {
  slot: &'a mut PayloadSlot,
  payload: PathBuf,
}

impl PayloadLease<'_> {
  pub fn staged_path(&self) -> &Path {
    &self.slot.path
  }

  pub fn payload(&self) -> &Path {
    &self.payload
  }
}

impl Drop for PayloadLease<'_> {
  fn drop(&mut self) {
    // The staged file stays in place until the next lease overwrites it.
    debug!(slot = ?self.slot.path, "payload slot released");
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::util::testutil::write_file;
  use std::fs;
  use tempfile::TempDir;

  #[test]
  fn lease_copies_payload_into_slot() {
    let temp = TempDir::new().unwrap();
    let payload = temp.path().join("input").join("Tetris.gb");
    write_file(&payload, "tetris");

    let mut slot = PayloadSlot::new(temp.path().join("system").join("rom"));
    let lease = slot.lease(&payload).unwrap();

    assert_eq!(fs::read_to_string(lease.staged_path()).unwrap(), "tetris");
    assert_eq!(lease.payload(), payload.as_path());
    assert!(payload.exists());
  }

  #[test]
  fn next_lease_overwrites_previous_payload() {
    let temp = TempDir::new().unwrap();
    let first = temp.path().join("a.gb");
    let second = temp.path().join("b.gb");
    write_file(&first, "first payload, longer");
    write_file(&second, "second");

    let mut slot = PayloadSlot::new(temp.path().join("rom"));
    drop(slot.lease(&first).unwrap());
    drop(slot.lease(&second).unwrap());

    assert_eq!(fs::read_to_string(slot.path()).unwrap(), "second");
  }

  #[test]
  fn missing_payload_is_rejected() {
    let temp = TempDir::new().unwrap();
    let mut slot = PayloadSlot::new(temp.path().join("rom"));

    let err = slot.lease(&temp.path().join("absent.gb")).unwrap_err();
    assert!(matches!(err, StageError::MissingPayload(_)));
    assert!(!slot.path().exists());
  }
}
