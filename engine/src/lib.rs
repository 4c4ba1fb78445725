//! # FRC Stats Engine
//!
//! Merge engine for FRC scouting data.
//!
//! Scouting devices each keep their own store of team-match records. This
//! crate reconciles the records a store holds for an event with an imported
//! snapshot of the same event (from a file or another device), lets a person
//! resolve the conflicts, and commits the result back to the store.
//!
//! ## Design Principles
//!
//! - **Pure core**: reconciliation and classification are synchronous and
//!   side-effect free
//! - **Deterministic**: the same two record sets always produce the same
//!   merge states in the same order
//! - **All-or-nothing checks**: no write happens while any state is
//!   unresolved or contradictory
//! - **Storage agnostic**: persistence sits behind the [`RecordStore`] trait
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! A [`TeamMatch`] is one team's performance in one match. It is identified by
//! its business key ([`MatchKey`]: event, match number, team number), never
//! by its surrogate id. Scored fields live in a per-game [`GameScores`]
//! variant.
//!
//! ### Merge states
//!
//! The [`Reconciler`] produces one [`MergeState`] per business key seen on
//! either side, sorted in natural match order (`"2"` before `"10"` before
//! `"qf1"`). Identical pairs are marked `same`, one-sided keys resolve by
//! default, and real conflicts wait for a [`Resolution`].
//!
//! ### Applying
//!
//! The [`Applier`] turns resolved states into one upsert batch and one delete
//! batch and submits both to the store concurrently.
//!
//! ## Quick Start
//!
//! ```rust
//! use frcstats_engine::{
//!     EventDescriptor, EventSnapshot, GameRegistry, GameScores, MemoryStore,
//!     PowerUpScores, TeamMatch,
//! };
//!
//! # tokio_test_block(async {
//! let registry = GameRegistry::standard();
//! let engine = registry.get("2018").unwrap();
//!
//! // Local store already knows match 1
//! let store = MemoryStore::with_records(vec![TeamMatch::new(
//!     "casj",
//!     "1",
//!     "254",
//!     GameScores::PowerUp(PowerUpScores::default()),
//! )]);
//!
//! // Imported snapshot has a different score for match 1
//! let mut snapshot = EventSnapshot::new(EventDescriptor::new("2018", "casj"));
//! snapshot.add_match(TeamMatch::new(
//!     "casj",
//!     "1",
//!     "254",
//!     GameScores::PowerUp(PowerUpScores {
//!         tele_scale_cubes: 4,
//!         ..Default::default()
//!     }),
//! ));
//!
//! let mut states = engine.begin_merge(&store, snapshot).await.unwrap();
//! assert!(states[0].is_conflict());
//!
//! states[0].take_from_file().unwrap();
//! let summary = engine.complete_merge(&store, &states).await.unwrap();
//! assert_eq!(summary.updated, 1);
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

pub mod apply;
pub mod error;
pub mod game;
pub mod identity;
pub mod natsort;
pub mod reconcile;
pub mod record;
pub mod resolution;
pub mod snapshot;
pub mod store;

// Re-export main types at crate root
pub use apply::{Applier, ApplyPlan, ApplySummary};
pub use error::{BatchKind, Error, Result, StoreError};
pub use game::{GameInfo, GameRegistry, MergeEngine};
pub use identity::{key_of, same_record, MatchKey};
pub use natsort::natural_cmp;
pub use reconcile::{reconcile, MergeState, MergeStats, Reconciler};
pub use record::{
    DeepSpaceScores, GameScores, PowerUpEndgame, PowerUpScores, TeamMatch,
};
pub use resolution::{all_resolved, final_outcome, unresolved_keys, Outcome, Resolution};
pub use snapshot::{EventDescriptor, EventSnapshot};
pub use store::{MatchFilter, MemoryStore, RecordStore, StoreResult};

/// Type aliases for clarity
pub type RecordId = i64;
pub type EventCode = String;
pub type MatchNumber = String;
pub type TeamNumber = String;
pub type GameCode = String;
