//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate the drag engine, the record store and the handle cache
//!   into board-level operations.
//! - Keep presentation layers decoupled from storage details.

pub mod board_service;
pub mod handles;
pub mod view;
