//! Merge session bookkeeping.
//!
//! A merge spans several requests: begin (reconcile), one or more resolve
//! calls, then complete (apply). The merge states live here in between.
//! Only one session may be open per event, and writes to an event are
//! serialized through a per-event lock.

mod manager;

pub use manager::{EventGuard, MergeSession, SessionError, SessionManager};
