//! Touch sequence resolution.

use std::sync::Arc;

use engine_core::{EventStore, Result, Track};

/// Sorts touches into touch order (send time, receipt time, id).
pub fn sort_touches(touches: &mut [Track]) {
    touches.sort_by(Track::touch_order);
}

/// Looks up the touches that preceded an event for the same visitor.
pub struct TouchResolver {
    events: Arc<dyn EventStore>,
}

impl TouchResolver {
    pub fn new(events: Arc<dyn EventStore>) -> Self {
        Self { events }
    }

    /// Same owner, same visitor, sent strictly before `track`, earliest first.
    ///
    /// The store's ordering is not trusted; results are re-sorted so the
    /// first element is stable across backends.
    pub async fn prior_touches(&self, track: &Track) -> Result<Vec<Track>> {
        let mut touches = self
            .events
            .find_all_by_visitor_before(track.owner_id, &track.anonymous_id, track.sent_at)
            .await?;

        touches.retain(|t| {
            t.id != track.id
                && t.owner_id == track.owner_id
                && t.anonymous_id == track.anonymous_id
                && t.sent_at < track.sent_at
        });
        sort_touches(&mut touches);

        Ok(touches)
    }
}
