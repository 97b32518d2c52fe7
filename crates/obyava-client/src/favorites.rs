//! Favorites synchronization.
//!
//! The server is authoritative for the favorite relation; this engine
//! projects its pushes into every cached view holding listing rows and
//! drives the optimistic toggle. A toggle only chooses the verb to send:
//! the displayed flag flips when the server confirms with `added` or
//! `removed`, and the full `list` snapshot corrects any drift from missed
//! events.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tracing::{debug, warn};

use obyava_net::{EventRouter, FrameSink};
use obyava_shared::constants::COUNT_REFRESH_DELAY_MS;
use obyava_shared::protocol::{FavoritesAction, FavoritesEvent, FavoritesEventKind};
use obyava_shared::types::{ListingId, PageEntry};

use crate::keys;
use crate::state::SharedState;

/// Maintains the favorite flags across every cached view and the
/// new-favorites counter.
pub struct FavoritesEngine {
    state: SharedState,
    sink: Arc<dyn FrameSink>,
}

impl FavoritesEngine {
    pub fn new(state: SharedState, sink: Arc<dyn FrameSink>) -> Self {
        Self { state, sink }
    }

    /// Wire this engine's handlers into the favorites-channel router.
    pub fn register(&self, router: &mut EventRouter<FavoritesEvent>) {
        let state = self.state.clone();
        router.on(FavoritesEventKind::List, move |ev| {
            if let FavoritesEvent::List { favorites } = ev {
                apply_snapshot(&state, favorites)?;
            }
            Ok(())
        });

        let state = self.state.clone();
        router.on(FavoritesEventKind::Added, move |ev| {
            if let FavoritesEvent::Added { listing_id } = ev {
                apply_flag(&state, listing_id, true)?;
            }
            Ok(())
        });

        let state = self.state.clone();
        router.on(FavoritesEventKind::Removed, move |ev| {
            if let FavoritesEvent::Removed { listing_id } = ev {
                apply_flag(&state, listing_id, false)?;
            }
            Ok(())
        });

        let state = self.state.clone();
        router.on(FavoritesEventKind::CountNew, move |ev| {
            if let FavoritesEvent::CountNew { count } = ev {
                let mut st = state
                    .lock()
                    .map_err(|_| anyhow!("state lock poisoned"))?;
                st.new_favorites = *count;
            }
            Ok(())
        });

        router.on(FavoritesEventKind::MarkedViewed, |_| {
            // The counter only moves on count_new pushes.
            debug!("mark-viewed acknowledged");
            Ok(())
        });

        router.on(FavoritesEventKind::AlreadyExists, |_| {
            debug!("toggle raced with server state, already favorited");
            Ok(())
        });

        router.on(FavoritesEventKind::NotFound, |_| {
            warn!("toggle raced with server state, favorite not found");
            Ok(())
        });
    }

    /// Optimistic toggle: sends the verb that inverts the caller's cached
    /// flag, without waiting for confirmation and without flipping any
    /// local state. Returns whether the action was actually transmitted;
    /// `false` means the channel is down and the caller should surface
    /// "not connected".
    pub fn toggle_favorite(&self, listing_id: &ListingId, currently_favorite: bool) -> bool {
        if !self.sink.can_send() {
            warn!(listing = %listing_id, "favorites channel not open, toggle dropped");
            return false;
        }

        let action = FavoritesAction::toggle(listing_id.clone(), currently_favorite);
        send_action(self.sink.as_ref(), &action);

        // The server does not push the count on every toggle; re-query it
        // shortly after.
        let sink = self.sink.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(COUNT_REFRESH_DELAY_MS)).await;
            if sink.can_send() {
                send_action(sink.as_ref(), &FavoritesAction::CountNew);
            }
        });

        true
    }

    /// Request the current new-favorites count.
    pub fn request_new_count(&self) {
        if self.sink.can_send() {
            send_action(self.sink.as_ref(), &FavoritesAction::CountNew);
        }
    }

    /// Acknowledge the new favorites as seen. The local counter is left
    /// untouched; the authoritative zero arrives as a later `count_new`
    /// push.
    pub fn mark_viewed(&self) {
        if self.sink.can_send() {
            send_action(self.sink.as_ref(), &FavoritesAction::MarkViewed);
        }
    }

    /// Sent on every (re)open: request the snapshot and the counter so a
    /// reconnect re-synchronizes without a full reload.
    pub fn hydrate(&self) {
        send_action(self.sink.as_ref(), &FavoritesAction::List);
        send_action(self.sink.as_ref(), &FavoritesAction::CountNew);
    }
}

fn send_action(sink: &dyn FrameSink, action: &FavoritesAction) {
    match action.to_frame() {
        Ok(frame) => sink.send_text(frame),
        Err(e) => warn!(error = %e, "failed to encode favorites action"),
    }
}

/// Full reconciliation: every cached row's flag becomes "id is in the
/// snapshot", true and false alike, correcting drift from missed events.
fn apply_snapshot(state: &SharedState, favorites: &[ListingId]) -> anyhow::Result<()> {
    let ids: HashSet<ListingId> = favorites.iter().cloned().collect();

    let mut st = state.lock().map_err(|_| anyhow!("state lock poisoned"))?;
    st.favorite_ids = ids.clone();

    let reconcile = |entry: &PageEntry| {
        let mut next = entry.clone();
        for item in &mut next.items {
            item.is_favorite = ids.contains(&item.id);
        }
        for ad in &mut next.ads {
            ad.is_favorite = ids.contains(&ad.id);
        }
        Some(next)
    };
    st.cache.update_all_matching(&keys::listings_root(), reconcile);
    st.cache.update_all_matching(&keys::favorites_root(), reconcile);

    debug!(favorites = favorites.len(), "favorites snapshot applied");
    Ok(())
}

/// Project a single confirmed flag into every entry holding the listing,
/// then invalidate the favorites views: their membership changed, not
/// just a row's presentation.
fn apply_flag(state: &SharedState, listing_id: &ListingId, favorite: bool) -> anyhow::Result<()> {
    let mut st = state.lock().map_err(|_| anyhow!("state lock poisoned"))?;

    if favorite {
        st.favorite_ids.insert(listing_id.clone());
    } else {
        st.favorite_ids.remove(listing_id);
    }

    let project = |entry: &PageEntry| {
        let holds_row = entry.items.iter().any(|i| &i.id == listing_id)
            || entry.ads.iter().any(|a| &a.id == listing_id);
        if !holds_row {
            return None;
        }
        let mut next = entry.clone();
        for item in &mut next.items {
            if &item.id == listing_id {
                item.is_favorite = favorite;
            }
        }
        for ad in &mut next.ads {
            if &ad.id == listing_id {
                ad.is_favorite = favorite;
            }
        }
        Some(next)
    };
    st.cache.update_all_matching(&keys::listings_root(), project);
    st.cache.update_all_matching(&keys::favorites_root(), project);

    st.cache.invalidate(&keys::favorites_root());

    debug!(listing = %listing_id, favorite, "favorite flag projected");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use crate::state::{shared_state, SharedState};
    use crate::testutil::{listing, page};

    #[derive(Default)]
    struct RecordingSink {
        open: AtomicBool,
        frames: Mutex<Vec<String>>,
    }

    impl RecordingSink {
        fn new(open: bool) -> Arc<Self> {
            Arc::new(Self {
                open: AtomicBool::new(open),
                frames: Mutex::new(Vec::new()),
            })
        }

        fn frames(&self) -> Vec<String> {
            self.frames.lock().unwrap().clone()
        }
    }

    impl FrameSink for RecordingSink {
        fn can_send(&self) -> bool {
            self.open.load(Ordering::SeqCst)
        }

        fn send_text(&self, frame: String) {
            self.frames.lock().unwrap().push(frame);
        }
    }

    /// Three views holding overlapping rows: unfiltered page 1 (a, b),
    /// a filtered page 2 (b, c) and the favorites page (a).
    fn seed(state: &SharedState) {
        let mut st = state.lock().unwrap();
        st.cache.put(
            keys::listings_page(1),
            page(vec![listing("a", false), listing("b", false)], 2),
        );
        st.cache.put(
            keys::listings_filtered(2, "deal_type=sale"),
            page(vec![listing("b", false), listing("c", false)], 12),
        );
        st.cache
            .put(keys::favorites_page(1), page(vec![listing("a", true)], 1));
    }

    /// The favorite flag of `id` in every entry (items and rows) holding it.
    fn flags_of(state: &SharedState, id: &str) -> Vec<bool> {
        let target = ListingId::from(id);
        let st = state.lock().unwrap();
        let mut flags = Vec::new();
        for key in [
            keys::listings_page(1),
            keys::listings_filtered(2, "deal_type=sale"),
            keys::favorites_page(1),
        ] {
            if let Some(entry) = st.cache.get(&key) {
                flags.extend(
                    entry
                        .items
                        .iter()
                        .filter(|i| i.id == target)
                        .map(|i| i.is_favorite),
                );
                flags.extend(
                    entry
                        .ads
                        .iter()
                        .filter(|a| a.id == target)
                        .map(|a| a.is_favorite),
                );
            }
        }
        flags
    }

    fn engine(state: &SharedState, sink: Arc<RecordingSink>) -> FavoritesEngine {
        FavoritesEngine::new(state.clone(), sink)
    }

    fn wired(
        state: &SharedState,
        sink: Arc<RecordingSink>,
    ) -> (FavoritesEngine, EventRouter<FavoritesEvent>) {
        let engine = engine(state, sink);
        let mut router = EventRouter::new();
        engine.register(&mut router);
        (engine, router)
    }

    #[test]
    fn snapshot_reconciles_every_cached_view_and_is_idempotent() {
        let state = shared_state();
        seed(&state);
        let (_engine, router) = wired(&state, RecordingSink::new(true));

        let snapshot = FavoritesEvent::List {
            favorites: vec![ListingId::from("a"), ListingId::from("c")],
        };
        router.dispatch(&snapshot);

        assert!(flags_of(&state, "a").iter().all(|f| *f));
        assert!(flags_of(&state, "b").iter().all(|f| !*f));
        assert!(flags_of(&state, "c").iter().all(|f| *f));
        assert!(state.lock().unwrap().is_favorite(&ListingId::from("a")));

        // A second identical snapshot changes nothing.
        router.dispatch(&snapshot);
        assert!(flags_of(&state, "a").iter().all(|f| *f));
        assert!(flags_of(&state, "b").iter().all(|f| !*f));
        assert!(flags_of(&state, "c").iter().all(|f| *f));
    }

    #[test]
    fn snapshot_unsets_stale_flags() {
        let state = shared_state();
        seed(&state);
        let (_engine, router) = wired(&state, RecordingSink::new(true));

        // The favorites page was seeded believing `a` is favorited; an
        // empty snapshot overrides that belief everywhere.
        router.dispatch(&FavoritesEvent::List { favorites: vec![] });
        assert!(flags_of(&state, "a").iter().all(|f| !*f));
        assert!(!state.lock().unwrap().is_favorite(&ListingId::from("a")));
    }

    #[test]
    fn added_projects_into_every_holding_entry_and_invalidates_favorites() {
        let state = shared_state();
        seed(&state);
        let (_engine, router) = wired(&state, RecordingSink::new(true));

        router.dispatch(&FavoritesEvent::Added {
            listing_id: ListingId::from("b"),
        });

        // `b` sits in two independently keyed entries; both must agree.
        let flags = flags_of(&state, "b");
        assert_eq!(flags.len(), 4);
        assert!(flags.iter().all(|f| *f));

        let st = state.lock().unwrap();
        assert!(st.cache.is_stale(&keys::favorites_page(1)));
        assert!(!st.cache.is_stale(&keys::listings_page(1)));
    }

    #[test]
    fn event_sequence_settles_consistent_across_caches() {
        let state = shared_state();
        seed(&state);
        let (_engine, router) = wired(&state, RecordingSink::new(true));

        router.dispatch(&FavoritesEvent::Added {
            listing_id: ListingId::from("b"),
        });
        router.dispatch(&FavoritesEvent::Removed {
            listing_id: ListingId::from("b"),
        });
        router.dispatch(&FavoritesEvent::Added {
            listing_id: ListingId::from("c"),
        });
        router.dispatch(&FavoritesEvent::List {
            favorites: vec![ListingId::from("b")],
        });

        for id in ["a", "b", "c"] {
            let flags = flags_of(&state, id);
            assert!(
                flags.windows(2).all(|w| w[0] == w[1]),
                "flags for {id} diverged: {flags:?}"
            );
        }
        assert!(flags_of(&state, "b").iter().all(|f| *f));
        assert!(flags_of(&state, "c").iter().all(|f| !*f));
    }

    #[test]
    fn counter_moves_only_on_count_new_pushes() {
        let state = shared_state();
        let sink = RecordingSink::new(true);
        let (engine, router) = wired(&state, sink.clone());

        router.dispatch(&FavoritesEvent::CountNew { count: 3 });
        assert_eq!(state.lock().unwrap().new_favorites, 3);

        // The ack does not zero the counter; a favorite added between the
        // ack and its processing would otherwise be lost.
        engine.mark_viewed();
        router.dispatch(&FavoritesEvent::MarkedViewed);
        assert_eq!(state.lock().unwrap().new_favorites, 3);
        assert_eq!(sink.frames(), vec![r#"{"action":"mark_viewed"}"#]);

        router.dispatch(&FavoritesEvent::CountNew { count: 0 });
        assert_eq!(state.lock().unwrap().new_favorites, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn toggle_sends_the_inverse_of_the_callers_belief() {
        let state = shared_state();
        let sink = RecordingSink::new(true);
        let (engine, _router) = wired(&state, sink.clone());

        assert!(engine.toggle_favorite(&ListingId::from("lst-1"), false));
        assert_eq!(
            sink.frames(),
            vec![r#"{"action":"add","listing_id":"lst-1"}"#]
        );

        // The deferred count re-query goes out after the toggle settles.
        tokio::time::sleep(Duration::from_millis(COUNT_REFRESH_DELAY_MS + 50)).await;
        assert_eq!(
            sink.frames(),
            vec![
                r#"{"action":"add","listing_id":"lst-1"}"#,
                r#"{"action":"count_new"}"#,
            ]
        );

        assert!(engine.toggle_favorite(&ListingId::from("lst-1"), true));
        assert_eq!(
            sink.frames()[2],
            r#"{"action":"remove","listing_id":"lst-1"}"#
        );
    }

    #[tokio::test(start_paused = true)]
    async fn toggle_neither_sends_nor_mutates_while_disconnected() {
        let state = shared_state();
        seed(&state);
        let sink = RecordingSink::new(false);
        let (engine, _router) = wired(&state, sink.clone());

        assert!(!engine.toggle_favorite(&ListingId::from("a"), false));
        assert!(sink.frames().is_empty());
        // Local belief is untouched: optimism is only in the verb sent.
        assert!(flags_of(&state, "a")[..2].iter().all(|f| !*f));
    }

    #[test]
    fn benign_race_outcomes_change_nothing() {
        let state = shared_state();
        seed(&state);
        let (_engine, router) = wired(&state, RecordingSink::new(true));

        router.dispatch(&FavoritesEvent::AlreadyExists);
        router.dispatch(&FavoritesEvent::NotFound);

        assert!(flags_of(&state, "b").iter().all(|f| !*f));
        assert!(!state.lock().unwrap().cache.is_stale(&keys::favorites_page(1)));
    }

    #[test]
    fn hydrate_requests_snapshot_then_count() {
        let state = shared_state();
        let sink = RecordingSink::new(true);
        let (engine, _router) = wired(&state, sink.clone());

        engine.hydrate();
        assert_eq!(
            sink.frames(),
            vec![r#"{"action":"list"}"#, r#"{"action":"count_new"}"#]
        );
    }
}
