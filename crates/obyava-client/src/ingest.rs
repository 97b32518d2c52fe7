//! New-listing ingestion.
//!
//! Server pushes of freshly scraped listings land at the head of the
//! unfiltered first page only; every other view keeps its own
//! invalidation/refetch cycle. Pushed rows already present on the page
//! are discarded so an id never appears twice in one entry, and the page
//! window stays at its configured size with the oldest rows falling off
//! the tail.

use std::collections::HashSet;

use anyhow::anyhow;
use tracing::debug;

use obyava_net::EventRouter;
use obyava_shared::protocol::{GeneralEvent, GeneralEventKind};
use obyava_shared::types::{AdRow, Listing, PageEntry};

use crate::keys;
use crate::state::SharedState;

/// Merges pushed listing batches into the head of the default view.
pub struct IngestEngine {
    state: SharedState,
    page_size: usize,
}

impl IngestEngine {
    pub fn new(state: SharedState, page_size: usize) -> Self {
        Self { state, page_size }
    }

    pub fn register(self, router: &mut EventRouter<GeneralEvent>) {
        let state = self.state;
        let page_size = self.page_size;
        router.on(GeneralEventKind::NewListings, move |ev| {
            if let GeneralEvent::NewListings { data } = ev {
                ingest(&state, page_size, data)?;
            }
            Ok(())
        });
    }
}

fn ingest(state: &SharedState, page_size: usize, batch: &[Listing]) -> anyhow::Result<()> {
    let mut st = state.lock().map_err(|_| anyhow!("state lock poisoned"))?;

    let merged = st.cache.update(&keys::listings_page(1), |entry| {
        let mut seen: HashSet<_> = entry.items.iter().map(|i| i.id.clone()).collect();
        let fresh: Vec<Listing> = batch
            .iter()
            .filter(|l| seen.insert(l.id.clone()))
            .cloned()
            .collect();
        if fresh.is_empty() {
            return None;
        }

        let keep = page_size.saturating_sub(fresh.len());
        let mut items: Vec<Listing> = fresh.clone();
        items.extend(entry.items.iter().take(keep).cloned());
        items.truncate(page_size);

        let mut ads: Vec<AdRow> = fresh
            .iter()
            .map(|l| AdRow::from_listing(l, true, None))
            .collect();
        ads.extend(entry.ads.iter().take(keep).cloned());
        ads.truncate(page_size);

        Some(PageEntry {
            total: entry.total + fresh.len() as u64,
            items,
            ads,
            ..entry.clone()
        })
    });

    debug!(batch = batch.len(), merged, "new listings batch");
    Ok(())
}
