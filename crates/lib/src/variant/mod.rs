//! Variant definitions and their discovery.

pub mod discover;
pub mod types;

pub use discover::{Discovery, DiscoveryError, Layout, discover};
pub use types::{VariantDefinition, VariantGroup, display_name, normalize};
