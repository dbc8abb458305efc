//! API implementation submodules.
//!
//! Each submodule contains `impl LiteTie` blocks; the struct itself lives in
//! `lib.rs`.

mod builder;
mod links;
mod types;

pub use builder::LiteTieBuilder;
pub use types::{AddOutcome, RemoveReport, RemoveStatus};
