//! Registry persistence.
//!
//! This module provides:
//! - Atomic JSON file operations
//! - The [`Entry`] row type
//! - [`RegistryStore`], the locked, fully-rewritten alias → entry document

mod atomic;
mod entry;
mod store;

pub use atomic::{atomic_read_json, atomic_write_json};
pub use entry::Entry;
pub use store::{ReconcileReport, RegistryStore};
