//! Cross-container drag-and-drop engine.
//!
//! Data flow: pointer events -> [`session::DragSession`] ->
//! [`resolver`] -> (on release) [`executor::MoveExecutor`].

pub mod executor;
pub mod resolver;
pub mod session;
