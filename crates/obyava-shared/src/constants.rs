/// Keepalive interval for the general channel, in seconds.
pub const KEEPALIVE_INTERVAL_SECS: u64 = 30;

/// Keepalive frame body. The server treats any text frame with this payload
/// as a liveness signal; no pong is expected back.
pub const KEEPALIVE_FRAME: &str = "ping";

/// Maximum number of automatic reconnect attempts before the manager
/// surfaces a terminal disconnected state.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Base reconnect delay in milliseconds (doubled per attempt).
pub const RECONNECT_BASE_DELAY_MS: u64 = 1_000;

/// Upper bound on the reconnect delay in milliseconds.
pub const RECONNECT_MAX_DELAY_MS: u64 = 30_000;

/// Delay before re-querying the new-favorites count after a toggle,
/// in milliseconds. The server does not push the count on every toggle.
pub const COUNT_REFRESH_DELAY_MS: u64 = 100;

/// Page size of the paginated listing views.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Path of the general (listings / presence / parser) channel.
pub const GENERAL_WS_PATH: &str = "/ws";

/// Path of the per-user favorites channel.
pub const FAVORITES_WS_PATH: &str = "/ws/favorites";
