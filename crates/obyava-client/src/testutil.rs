//! Builders shared by the engine tests.

use chrono::{TimeZone, Utc};

use obyava_shared::types::{DealType, Listing, ListingId, PageEntry, Source};

pub fn listing(id: &str, is_favorite: bool) -> Listing {
    Listing {
        id: ListingId::from(id),
        created_at: Utc.with_ymd_and_hms(2025, 5, 12, 9, 30, 0).unwrap(),
        deal_type: DealType::Sale,
        price: 10_000_000.0,
        total_meters: 45.0,
        floor: "3/9".to_string(),
        location: "Москва, Тверская 1".to_string(),
        source: Source::Cian,
        url: format!("https://cian.ru/{id}"),
        phone_number: "+79990000000".to_string(),
        rooms_count: Some(2),
        is_favorite,
        responsible: None,
        status: None,
        is_in_rent: false,
    }
}

pub fn page(listings: Vec<Listing>, total: u64) -> PageEntry {
    PageEntry::from_items(listings, total, 1, 10, None)
}
