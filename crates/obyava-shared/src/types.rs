//! Domain model for the listings dashboard.
//!
//! `Listing` is the raw scraped record as the backend serves it. `AdRow` is
//! the flattened per-row view model the UI tables render; paginated cache
//! entries carry both so projections can update them in lockstep.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable identifier of a scraped listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ListingId(pub String);

impl ListingId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ListingId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl std::fmt::Display for ListingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a dashboard employee account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct EmployeeId(pub String);

impl EmployeeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EmployeeId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl std::fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DealType {
    Sale,
    Rent,
}

/// Scraper the listing was imported from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Cian,
    Avito,
}

/// Workflow state an employee assigns to a listing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    New,
    InProgress,
}

/// Online/offline state of an employee.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OnlineStatus {
    Online,
    Offline,
}

/// Lifecycle state of the background scraper run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParserRunStatus {
    Idle,
    Running,
    Completed,
    Error,
}

/// A scraped property listing as served by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Listing {
    pub id: ListingId,
    #[serde(with = "crate::types::time::lenient")]
    pub created_at: DateTime<Utc>,
    pub deal_type: DealType,
    pub price: f64,
    pub total_meters: f64,
    pub floor: String,
    pub location: String,
    pub source: Source,
    pub url: String,
    pub phone_number: String,
    pub rooms_count: Option<u32>,
    pub is_favorite: bool,
    #[serde(default)]
    pub responsible: Option<EmployeeId>,
    #[serde(default)]
    pub status: Option<ListingStatus>,
    #[serde(default)]
    pub is_in_rent: bool,
}

/// Flattened table row derived from a [`Listing`].
///
/// `is_new` is a transient highlight flag set only on rows that arrived over
/// the push channel; it is never persisted server-side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdRow {
    pub id: ListingId,
    pub address: String,
    pub price: f64,
    pub area: f64,
    pub rooms: u32,
    pub deal_type: DealType,
    pub source: Source,
    pub status: ListingStatus,
    pub responsible: Option<EmployeeId>,
    pub created_at: DateTime<Utc>,
    pub is_favorite: bool,
    pub phone_number: String,
    pub url: String,
    pub is_new: bool,
    pub is_in_rent: bool,
}

impl AdRow {
    /// Derive a table row from a raw listing.
    ///
    /// `is_favorite` overrides the listing's own flag when `Some` (the
    /// favorites view knows every row it holds is favorited).
    pub fn from_listing(listing: &Listing, is_new: bool, is_favorite: Option<bool>) -> Self {
        Self {
            id: listing.id.clone(),
            address: listing.location.clone(),
            price: listing.price,
            area: listing.total_meters,
            rooms: listing.rooms_count.unwrap_or(0),
            deal_type: listing.deal_type,
            source: listing.source,
            status: listing.status.unwrap_or(ListingStatus::New),
            responsible: listing.responsible.clone(),
            created_at: listing.created_at,
            is_favorite: is_favorite.unwrap_or(listing.is_favorite),
            phone_number: listing.phone_number.clone(),
            url: listing.url.clone(),
            is_new,
            is_in_rent: listing.is_in_rent,
        }
    }
}

/// One page of a paginated listing query, as held in the projection cache.
///
/// `items` and `ads` describe the same rows; every projection must update
/// both or the table and the detail pane drift apart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageEntry {
    pub items: Vec<Listing>,
    pub ads: Vec<AdRow>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

impl PageEntry {
    /// Build a page entry from raw listings, deriving the row models.
    ///
    /// `favorite_override` is threaded through to [`AdRow::from_listing`];
    /// the favorites view passes `Some(true)`.
    pub fn from_items(
        items: Vec<Listing>,
        total: u64,
        page: u32,
        per_page: u32,
        favorite_override: Option<bool>,
    ) -> Self {
        let ads = items
            .iter()
            .map(|l| AdRow::from_listing(l, false, favorite_override))
            .collect();
        let total_pages = if per_page == 0 {
            0
        } else {
            ((total + per_page as u64 - 1) / per_page as u64) as u32
        };
        Self {
            items,
            ads,
            total,
            page,
            per_page,
            total_pages,
        }
    }
}

/// Presence of a single employee as last reported by the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PresenceRecord {
    pub status: OnlineStatus,
    /// Meaningful only while offline; an online user has no last-seen.
    pub last_seen: Option<DateTime<Utc>>,
}

/// Lease record created when a listing is moved into the rented state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RentListing {
    pub listing_id: ListingId,
    pub tenant_first_name: String,
    pub tenant_last_name: String,
    pub tenant_phone: String,
    pub rent_price: f64,
    pub rent_start_date: chrono::NaiveDate,
    pub rent_end_date: chrono::NaiveDate,
    #[serde(default)]
    pub responsible_user_id: Option<EmployeeId>,
}

pub mod time {
    //! Serde helpers for backend timestamps.
    //!
    //! The backend emits both RFC 3339 and zone-less ISO 8601 strings
    //! (zone-less values are UTC).

    use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

    pub(crate) fn parse(s: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(Utc.from_utc_datetime(&naive));
        }
        None
    }

    pub mod lenient {
        use chrono::{DateTime, Utc};
        use serde::{de, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
            s.serialize_str(&dt.to_rfc3339())
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
            let raw = String::deserialize(d)?;
            super::parse(&raw)
                .ok_or_else(|| de::Error::custom(format!("unparseable timestamp: {raw}")))
        }
    }

    pub mod lenient_opt {
        use chrono::{DateTime, Utc};
        use serde::{de, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            dt: &Option<DateTime<Utc>>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match dt {
                Some(dt) => s.serialize_some(&dt.to_rfc3339()),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            let raw = Option::<String>::deserialize(d)?;
            match raw {
                None => Ok(None),
                Some(raw) => super::parse(&raw)
                    .map(Some)
                    .ok_or_else(|| de::Error::custom(format!("unparseable timestamp: {raw}"))),
            }
        }
    }
}
