use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use super::storage::entities::{IdentityRecord, LastCountedMarker, VisitorIdentity};

/// Repeat activations inside this window are not recounted.
pub const DEDUP_WINDOW: Duration = Duration::hours(24);

/// How long a visitor identity stays valid before a fresh one is minted.
pub const IDENTITY_TTL: Duration = Duration::days(365);

/// Decides whether the current view is countable, updating the identity
/// record in place. The first view from a fresh (or expired) profile always
/// counts.
///
/// The elapsed-time checks are signed, so a skewed clock where `now` sits
/// before the marker produces a negative difference and stays inside the
/// window instead of recounting.
pub fn should_count(record: &mut IdentityRecord, now: DateTime<Utc>) -> bool {
    let identity_live = record
        .identity
        .as_ref()
        .is_some_and(|identity| now - identity.created_at < IDENTITY_TTL);

    if !identity_live {
        let identity = VisitorIdentity::generate(now);
        debug!("Minted identity {}", identity.id);
        *record = IdentityRecord {
            identity: Some(identity),
            marker: Some(LastCountedMarker { counted_at: now }),
        };
        return true;
    }

    if let Some(marker) = record.marker {
        if now - marker.counted_at < DEDUP_WINDOW {
            return false;
        }
    }

    record.marker = Some(LastCountedMarker { counted_at: now });
    true
}
