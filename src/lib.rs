//! Promptback client core.
//!
//! The non-visual heart of the Promptback web client: guest identity,
//! session synchronization, score reconciliation at login/registration, and
//! the XP-to-level curve. Everything here is UI-free; the frontend renders
//! what these modules produce.

pub mod config;
pub mod error;
pub mod identity;
pub mod level;
pub mod reconcile;
pub mod scoring;
pub mod sync;

pub use config::{ClientConfig, IdentityDriver};
pub use error::{ClientError, Result};
pub use identity::{IdentityStore, SessionId};
pub use level::{level_from_total_xp, rank_from_level, xp_required_for_level, LevelInfo, RankInfo};
pub use reconcile::{AuthClient, AuthSession, Credentials, ReconcileOutcome, Registration};
pub use scoring::{Challenge, ScoreResult, ScoringClient};
pub use sync::{GuestSessionSync, SyncState};
