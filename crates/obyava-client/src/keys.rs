//! Query key layout of the dashboard views.
//!
//! Keys form a hierarchy so engines can address a whole family of cached
//! pages by prefix: `listings` covers every listings page under any
//! filter, `listings/list/1` is exactly the unfiltered first page the
//! push ingestion writes into.

use obyava_cache::QueryKey;
use obyava_shared::types::ListingId;

/// Every cached listings view, any page, any filter.
pub fn listings_root() -> QueryKey {
    QueryKey::root("listings")
}

/// Every paginated listings list.
pub fn listings_lists() -> QueryKey {
    listings_root().child("list")
}

/// One unfiltered listings page.
pub fn listings_page(page: u32) -> QueryKey {
    listings_lists().child(page)
}

/// One listings page under a canonicalized filter description.
pub fn listings_filtered(page: u32, filter: &str) -> QueryKey {
    listings_page(page).child(filter.to_owned())
}

/// Every cached favorites view.
pub fn favorites_root() -> QueryKey {
    QueryKey::root("favorites")
}

/// One page of the favorites list.
pub fn favorites_page(page: u32) -> QueryKey {
    favorites_root().child("list").child(page)
}

/// Every cached rent view.
pub fn rent_root() -> QueryKey {
    QueryKey::root("rent")
}

/// The rent record of a single listing.
pub fn rent_listing(id: &ListingId) -> QueryKey {
    QueryKey::root("rent-listing").child(id.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filtered_pages_sit_under_the_lists_prefix() {
        assert!(listings_filtered(2, "deal_type=sale").starts_with(&listings_lists()));
        assert!(listings_page(1).starts_with(&listings_root()));
        assert!(!favorites_page(1).starts_with(&listings_root()));
    }

    #[test]
    fn rent_listing_keys_are_outside_the_rent_prefix() {
        // Invalidation of `rent` must not clobber per-listing rent records.
        assert!(!rent_listing(&ListingId::from("x")).starts_with(&rent_root()));
    }
}
