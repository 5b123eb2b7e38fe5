//! pinforge-lib: pinned-dependency build orchestration.
//!
//! Builds a fixed, ordered list of upstream components from exact revisions,
//! collects their binaries and renders a package manifest with stable source
//! slots:
//! - `pipeline`: the ordered configuration of one package build
//! - `fetch` / `build`: pinned working copies and idempotent component builds
//! - `collect` / `manifest`: artifact aggregation and slot assignment
//! - `link` / `package`: the flat source directory and the packaging tool
//! - `orchestrate`: the sequential end-to-end run

pub mod bootstrap;
pub mod build;
pub mod cache;
pub mod cache_lock;
pub mod collect;
pub mod consts;
mod error;
pub mod execute;
pub mod fetch;
pub mod link;
pub mod manifest;
pub mod orchestrate;
pub mod package;
pub mod pipeline;
pub mod placeholder;
pub mod platform;
pub mod toolchain;
pub mod util;

pub use error::Error;
