//! Service wiring and lifecycle.
//!
//! Two independent channels run concurrently: the general channel carries
//! listings, presence and scraper status to every client; the favorites
//! channel is per-user. Each gets its own socket task, router and
//! dispatcher; the engines meet in the shared state.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use obyava_net::{spawn_socket, EventRouter, SocketConfig, SocketHandle, SocketNotification};
use obyava_shared::protocol::{FavoritesEvent, GeneralEvent};

use crate::config::SyncConfig;
use crate::favorites::FavoritesEngine;
use crate::ingest::IngestEngine;
use crate::parser::ParserStatusEngine;
use crate::presence::PresenceEngine;
use crate::rent::RentEngine;
use crate::state::{shared_state, SharedState};

/// Owns the two channels, their routers and every engine.
///
/// Constructed explicitly by the embedding application context; nothing
/// here is a process-wide singleton, so tests and multiple instances can
/// coexist.
pub struct SyncService {
    state: SharedState,
    general: SocketHandle,
    favorites_channel: SocketHandle,
    favorites: Arc<FavoritesEngine>,
    rent: RentEngine,
    dispatchers: Vec<JoinHandle<()>>,
}

impl SyncService {
    /// Spawn both channel tasks, wire the engines and dial.
    ///
    /// Without a credential in `config` the channels stay closed until a
    /// later [`SyncService::connect`] after the token is provisioned.
    pub fn start(config: SyncConfig) -> Self {
        let state = shared_state();

        let (general, general_rx) = spawn_socket(SocketConfig::new(
            config.general_endpoint.clone(),
            config.token.clone(),
        ));
        let (favorites_channel, favorites_rx) = spawn_socket(SocketConfig::new(
            config.favorites_endpoint.clone(),
            config.token.clone(),
        ));

        let mut general_router = EventRouter::new();
        IngestEngine::new(state.clone(), config.page_size).register(&mut general_router);
        PresenceEngine::new(state.clone()).register(&mut general_router);
        ParserStatusEngine::new(state.clone()).register(&mut general_router);

        let favorites = Arc::new(FavoritesEngine::new(
            state.clone(),
            Arc::new(favorites_channel.clone()),
        ));
        let mut favorites_router = EventRouter::new();
        favorites.register(&mut favorites_router);

        let dispatchers = vec![
            tokio::spawn(dispatch_general(general_rx, general_router)),
            tokio::spawn(dispatch_favorites(
                favorites_rx,
                favorites_router,
                favorites.clone(),
            )),
        ];

        general.connect();
        favorites_channel.connect();

        info!("sync service started");

        Self {
            rent: RentEngine::new(state.clone()),
            state,
            general,
            favorites_channel,
            favorites,
            dispatchers,
        }
    }

    /// Ensure both channels are dialing. No-op where already connected; a
    /// channel that exhausted its retries is re-armed.
    pub fn connect(&self) {
        self.general.connect();
        self.favorites_channel.connect();
    }

    /// Tear both channels down. The service stays usable; `connect()`
    /// dials again.
    pub fn disconnect(&self) {
        self.general.disconnect();
        self.favorites_channel.disconnect();
    }

    /// Full teardown: channels closed, dispatcher tasks stopped.
    pub fn shutdown(self) {
        self.general.disconnect();
        self.favorites_channel.disconnect();
        for task in &self.dispatchers {
            task.abort();
        }
        info!("sync service stopped");
    }

    pub fn state(&self) -> SharedState {
        self.state.clone()
    }

    pub fn favorites(&self) -> &FavoritesEngine {
        &self.favorites
    }

    pub fn rent(&self) -> &RentEngine {
        &self.rent
    }

    pub fn general_channel(&self) -> &SocketHandle {
        &self.general
    }

    pub fn favorites_channel(&self) -> &SocketHandle {
        &self.favorites_channel
    }
}

async fn dispatch_general(
    mut rx: mpsc::UnboundedReceiver<SocketNotification>,
    router: EventRouter<GeneralEvent>,
) {
    while let Some(notification) = rx.recv().await {
        match notification {
            SocketNotification::Frame(frame) => router.dispatch_frame(&frame),
            SocketNotification::Opened => debug!("general channel open"),
            SocketNotification::Closed => debug!("general channel closed"),
            SocketNotification::RetriesExhausted => {
                warn!("general channel gave up reconnecting")
            }
        }
    }
}

async fn dispatch_favorites(
    mut rx: mpsc::UnboundedReceiver<SocketNotification>,
    router: EventRouter<FavoritesEvent>,
    engine: Arc<FavoritesEngine>,
) {
    while let Some(notification) = rx.recv().await {
        match notification {
            SocketNotification::Frame(frame) => router.dispatch_frame(&frame),
            SocketNotification::Opened => {
                debug!("favorites channel open");
                engine.hydrate();
            }
            SocketNotification::Closed => debug!("favorites channel closed"),
            SocketNotification::RetriesExhausted => {
                warn!("favorites channel gave up reconnecting")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use obyava_net::ConnectionState;
    use obyava_shared::types::ListingId;

    #[tokio::test(start_paused = true)]
    async fn without_a_token_the_channels_stay_closed() {
        let service = SyncService::start(SyncConfig::default());

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(service.general_channel().state(), ConnectionState::Closed);
        assert_eq!(
            service.favorites_channel().state(),
            ConnectionState::Closed
        );
        assert!(!service
            .favorites()
            .toggle_favorite(&ListingId::from("lst-1"), false));

        service.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn lifecycle_calls_are_safe_to_repeat() {
        let service = SyncService::start(SyncConfig::default());

        service.connect();
        service.disconnect();
        service.connect();
        tokio::time::sleep(Duration::from_millis(20)).await;

        service.shutdown();
    }
}
