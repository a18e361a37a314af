//! Board domain model.
//!
//! # Responsibility
//! - Define the identifiers, containers and collection value shared by the
//!   drag engine, persistence and snapshot layers.
//!
//! # Invariants
//! - Every live item id sits in exactly one persisted container.
//! - Trash is a sink, never a stored container.

pub mod collection;
pub mod container;
pub mod ids;
