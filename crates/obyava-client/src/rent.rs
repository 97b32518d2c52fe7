//! Rent-state projection.
//!
//! Moving a listing in or out of the rented state is a REST mutation; on
//! success the mutation layer calls into this projection so every cached
//! view flips `is_in_rent` in lockstep and the rent views refetch.

use anyhow::anyhow;
use tracing::debug;

use obyava_shared::types::{ListingId, PageEntry};

use crate::keys;
use crate::state::SharedState;

/// Applies confirmed rent transitions to the cached views.
pub struct RentEngine {
    state: SharedState,
}

impl RentEngine {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// A rent record was created for the listing.
    pub fn rent_added(&self, listing_id: &ListingId) -> anyhow::Result<()> {
        self.project(listing_id, true)
    }

    /// The listing's rent record was removed.
    pub fn rent_removed(&self, listing_id: &ListingId) -> anyhow::Result<()> {
        self.project(listing_id, false)
    }

    /// The listing's rent record changed without a state transition; only
    /// the rent views need a refetch.
    pub fn rent_updated(&self, listing_id: &ListingId) -> anyhow::Result<()> {
        let mut st = self
            .state
            .lock()
            .map_err(|_| anyhow!("state lock poisoned"))?;
        st.cache.invalidate(&keys::rent_root());
        st.cache.invalidate(&keys::rent_listing(listing_id));
        Ok(())
    }

    fn project(&self, listing_id: &ListingId, in_rent: bool) -> anyhow::Result<()> {
        let mut st = self
            .state
            .lock()
            .map_err(|_| anyhow!("state lock poisoned"))?;

        let flip = |entry: &PageEntry| {
            let holds_row = entry.items.iter().any(|i| &i.id == listing_id)
                || entry.ads.iter().any(|a| &a.id == listing_id);
            if !holds_row {
                return None;
            }
            let mut next = entry.clone();
            for item in &mut next.items {
                if &item.id == listing_id {
                    item.is_in_rent = in_rent;
                }
            }
            for ad in &mut next.ads {
                if &ad.id == listing_id {
                    ad.is_in_rent = in_rent;
                }
            }
            Some(next)
        };
        st.cache.update_all_matching(&keys::listings_root(), flip);
        st.cache.update_all_matching(&keys::favorites_root(), flip);

        st.cache.invalidate(&keys::rent_root());

        debug!(listing = %listing_id, in_rent, "rent state projected");
        Ok(())
    }
}
