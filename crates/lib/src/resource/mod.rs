//! The shared resource document and its backup guard.

pub mod document;
pub mod guard;

pub use document::{DocumentError, ResourceDocument};
pub use guard::{ConfigGuard, GuardError, recover_backup};
