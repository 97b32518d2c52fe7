//! Wire protocol of the two dashboard WebSocket channels.
//!
//! The general channel broadcasts scraper output and employee presence to
//! every connected client; frames are discriminated by a `type` field. The
//! favorites channel is per-user request/response plus push; inbound frames
//! are discriminated by `status`, outbound by `action`. All frames are JSON
//! text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::types::{EmployeeId, Listing, ListingId, OnlineStatus, ParserRunStatus};

/// Inbound frames on the general channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeneralEvent {
    /// Freshly scraped listings, pushed as a batch.
    NewListings { data: Vec<Listing> },

    /// Scraper lifecycle transition.
    ParserStatus {
        status: ParserRunStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        new_count: Option<u64>,
    },

    /// Presence change for a single employee.
    UserStatus {
        user_id: EmployeeId,
        status: OnlineStatus,
        #[serde(
            default,
            with = "crate::types::time::lenient_opt",
            skip_serializing_if = "Option::is_none"
        )]
        last_seen: Option<DateTime<Utc>>,
    },

    /// Bulk snapshot of who is online right now, sent once after connect.
    /// Partial: an id absent from the list carries no information.
    OnlineUsersList { user_ids: Vec<EmployeeId> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeneralEventKind {
    NewListings,
    ParserStatus,
    UserStatus,
    OnlineUsersList,
}

impl GeneralEvent {
    pub fn kind(&self) -> GeneralEventKind {
        match self {
            Self::NewListings { .. } => GeneralEventKind::NewListings,
            Self::ParserStatus { .. } => GeneralEventKind::ParserStatus,
            Self::UserStatus { .. } => GeneralEventKind::UserStatus,
            Self::OnlineUsersList { .. } => GeneralEventKind::OnlineUsersList,
        }
    }

    pub fn from_frame(frame: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(frame).map_err(ProtocolError::Decode)
    }
}

/// Inbound frames on the favorites channel.
///
/// `AlreadyExists` and `NotFound` are benign outcomes of a toggle that raced
/// with server state, not errors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FavoritesEvent {
    /// Authoritative full snapshot of the user's favorited listing ids.
    List { favorites: Vec<ListingId> },

    Added { listing_id: ListingId },

    Removed { listing_id: ListingId },

    /// Server-maintained count of favorites added since the last viewed ack.
    CountNew { count: u64 },

    /// The mark-viewed ack round-tripped. Carries no state change; the
    /// authoritative zero arrives as a later `count_new`.
    MarkedViewed,

    AlreadyExists,

    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FavoritesEventKind {
    List,
    Added,
    Removed,
    CountNew,
    MarkedViewed,
    AlreadyExists,
    NotFound,
}

impl FavoritesEvent {
    pub fn kind(&self) -> FavoritesEventKind {
        match self {
            Self::List { .. } => FavoritesEventKind::List,
            Self::Added { .. } => FavoritesEventKind::Added,
            Self::Removed { .. } => FavoritesEventKind::Removed,
            Self::CountNew { .. } => FavoritesEventKind::CountNew,
            Self::MarkedViewed => FavoritesEventKind::MarkedViewed,
            Self::AlreadyExists => FavoritesEventKind::AlreadyExists,
            Self::NotFound => FavoritesEventKind::NotFound,
        }
    }

    pub fn from_frame(frame: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(frame).map_err(ProtocolError::Decode)
    }
}

/// Outbound frames on the favorites channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FavoritesAction {
    /// Request the full favorites snapshot.
    List,

    /// Request the current new-favorites count.
    CountNew,

    Add { listing_id: ListingId },

    Remove { listing_id: ListingId },

    /// Acknowledge that the new favorites were seen.
    MarkViewed,
}

impl FavoritesAction {
    /// The toggle verb for a listing the caller believes is currently
    /// `currently_favorite`. The intent is the inverse of the belief; the
    /// local flag is only flipped once the server confirms.
    pub fn toggle(listing_id: ListingId, currently_favorite: bool) -> Self {
        if currently_favorite {
            Self::Remove { listing_id }
        } else {
            Self::Add { listing_id }
        }
    }

    pub fn to_frame(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }
}
