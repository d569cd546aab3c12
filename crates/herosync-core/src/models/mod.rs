//! Data models for herosync

mod change;
mod document;
mod sync_conflict;

pub use change::{ChangeId, Operation, QueuedChange};
pub use document::{
    AbilityScores, CharacterSheet, Collection, DocumentData, HitPoints, Preferences, ThemeMode,
};
pub use sync_conflict::{ConflictId, Resolution, SyncConflict};
