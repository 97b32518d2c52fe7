//! Client-held synchronized state.
//!
//! One lock guards everything the engines project into, so each inbound
//! event applies atomically with respect to readers and to the other
//! engines.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use obyava_cache::QueryCache;
use obyava_shared::types::{ListingId, PageEntry};

use crate::parser::ParserState;
use crate::presence::PresenceMap;

/// Central state of the sync layer.
#[derive(Debug)]
pub struct ClientState {
    /// Paginated query results, keyed per view/page/filter. Seeded by the
    /// REST layer, projected into by the engines.
    pub cache: QueryCache<PageEntry>,

    /// Ids the server currently reports as favorited for this user.
    pub favorite_ids: HashSet<ListingId>,

    /// Server-authoritative count of favorites not yet acknowledged as
    /// viewed. Only ever set from `count_new` pushes.
    pub new_favorites: u64,

    /// Presence of every employee seen so far.
    pub presence: PresenceMap,

    /// Latest scraper run status.
    pub parser: ParserState,
}

impl ClientState {
    pub fn new() -> Self {
        Self {
            cache: QueryCache::new(),
            favorite_ids: HashSet::new(),
            new_favorites: 0,
            presence: PresenceMap::new(),
            parser: ParserState::default(),
        }
    }

    pub fn is_favorite(&self, id: &ListingId) -> bool {
        self.favorite_ids.contains(id)
    }
}

impl Default for ClientState {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared handle the engines and the embedding application both hold.
pub type SharedState = Arc<Mutex<ClientState>>;

pub fn shared_state() -> SharedState {
    Arc::new(Mutex::new(ClientState::new()))
}
