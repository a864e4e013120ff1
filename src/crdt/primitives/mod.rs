// model = "claude-opus-4-5"
// created = 2026-10-19
// modified = 2026-10-19
// driver = "Isaac Clayton"

//! Shared primitives for the causal tree.
//!
//! # Primitives
//!
//! ## Clocks
//! - `LamportClock`: monotonic counter stamping every atom
//!
//! ## IDs
//! - `SiteId`: compact replica-local site identifier
//! - `YarnIndex`: per-site sequence number
//! - `AtomId`: atom identifier (site, index)
//!
//! ## Frontiers
//! - `Weft`: per-site highest known index
//!
//! ## Tables
//! - `SiteIndex`: sorted uuid to `SiteId` mapping with remap support

pub mod clock;
pub mod id;
pub mod site_index;
pub mod weft;

// Re-exports for convenience
pub use clock::LamportClock;
pub use id::AtomId;
pub use id::CONTROL_SITE;
pub use id::Clock;
pub use id::NULL_INDEX;
pub use id::NULL_SITE;
pub use id::SiteId;
pub use id::SiteRemap;
pub use id::YarnIndex;
pub use site_index::SiteIndex;
pub use site_index::SiteIndexKey;
pub use weft::Weft;
