//! Episode ingestion and curation for offline DQN training.
//!
//! This crate turns a directory of logged transition files into the flat,
//! index-aligned arrays the trainer consumes. The pipeline has three stages:
//!
//! ```text
//! Transition Store Reader (store)
//!     ↓ one episode per file
//! Episode Curator (curate)
//!     ↓ quality-filtered transitions + inferred schema
//! Tensor Flattener (flatten)
//!     ↓ validated, index-aligned arrays
//! TransitionBatch
//! ```
//!
//! # Input format
//!
//! Each `transitions_*.json` file in the log directory holds one rollout,
//! either as an object wrapping a `transitions` array or as a bare array of
//! transition objects:
//!
//! ```json
//! {"s": [0.1, 0.0], "a": 2, "r": -0.5, "ns": [0.2, 0.1], "d": false}
//! ```
//!
//! Actions are 1-indexed at this boundary (the simulation side counts from 1)
//! and converted to 0-indexed during flattening.
//!
//! # Curation
//!
//! Not every logged rollout is worth training on. The curator keeps episodes
//! whose best progress passes a threshold, and falls back to keeping the
//! highest-return fraction of all episodes when that gate would leave too
//! little data. See [`curate`] for details.
//!
//! # Schema inference
//!
//! The state dimensionality and action count are inferred from the curated
//! data, not configured. The inferred [`schema::Schema`] is threaded
//! explicitly through flattening into network construction; callers with an
//! expected schema should compare and warn rather than override.

pub mod curate;
pub mod episode;
pub mod flatten;
pub mod schema;
pub mod store;
pub mod transition;
