//! Persistence layer contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide the namespaced record store the board depends on for
//!   durability.
//! - Translate the board layout to and from config records.
//!
//! # Invariants
//! - Every store operation is one atomic unit.
//! - Repopulating after a clear requires the clear's completion token.

pub mod layout_repo;
pub mod record_store;
