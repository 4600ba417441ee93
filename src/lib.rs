//! Dashboard builder session manager: an editing session over a remote
//! dashboard record store, with optimistic concurrency, batched layout
//! writes, auto-save, undo/redo and a creation wizard.
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

pub use application::error::SessionError;
pub use application::session::{SessionStore, SharedSession};
