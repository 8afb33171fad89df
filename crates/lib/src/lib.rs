//! romgen-lib: variant build pipeline for branded Android packages
//!
//! This crate provides the pieces that turn a directory of payload files into
//! one archived package per variant:
//! - `variant`: discovery of variant definitions from an input tree
//! - `resource`: the shared resource document and its scoped backup guard
//! - `stage`: exclusive lease over the fixed payload slot
//! - `toolchain`: the opaque external build invocation
//! - `archive`: collision-free naming and copying of build outputs
//! - `pipeline`: the sequential per-variant loop and its run report
//! - `cores`: prebuilt emulator core download for each ABI

pub mod archive;
pub mod consts;
pub mod cores;
pub mod pipeline;
pub mod resource;
pub mod settings;
pub mod stage;
pub mod toolchain;
pub mod util;
pub mod variant;
