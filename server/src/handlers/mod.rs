//! Request handlers for event maintenance and merge sessions.

mod events;
mod merge;

pub use events::*;
pub use merge::*;
