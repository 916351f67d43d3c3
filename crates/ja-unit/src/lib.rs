//! ja-unit: Unit file parsing for jobagent.
//!
//! This crate turns unit file text into sections of multi-valued options
//! and splits multi-valued option lines. It knows nothing about scheduling.

pub mod multivalue;
pub mod unit;

pub use multivalue::parse_multivalue_line;
pub use unit::{parse, Contents, LegacyContents, Options, UnitFile};
