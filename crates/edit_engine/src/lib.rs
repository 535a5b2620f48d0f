//! Edit Engine - editor state machine for the canvas document model
//!
//! Actions are reduced over a copy of the model; the previous model is kept
//! as a full snapshot so undo and redo are plain swaps.

mod action;
mod error;
mod executor;
mod undo;

pub use action::*;
pub use error::*;
pub use executor::*;
pub use undo::*;
