//! Picks the payload a conflict resolution writes back

use crate::models::{DocumentData, Resolution, SyncConflict};

/// Data to re-enqueue for `resolution`, or `None` when a merge was requested
/// without merged data.
///
/// No merging happens here; merge policy belongs to the caller.
#[must_use]
pub fn resolved_data(
    conflict: &SyncConflict,
    resolution: Resolution,
    merged_data: Option<DocumentData>,
) -> Option<DocumentData> {
    match resolution {
        Resolution::KeepLocal => Some(conflict.local_data.clone()),
        Resolution::KeepRemote => Some(conflict.remote_data.clone()),
        Resolution::Merge => merged_data,
    }
}
