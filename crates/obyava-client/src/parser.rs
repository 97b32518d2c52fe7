//! Scraper run status.

use anyhow::anyhow;

use obyava_net::EventRouter;
use obyava_shared::protocol::{GeneralEvent, GeneralEventKind};
use obyava_shared::types::ParserRunStatus;

use crate::state::SharedState;

/// Latest scraper lifecycle state as pushed over the general channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ParserState {
    pub status: ParserRunStatus,
    /// How many listings the finished run produced, when the server says.
    pub new_count: Option<u64>,
}

impl Default for ParserState {
    fn default() -> Self {
        Self {
            status: ParserRunStatus::Idle,
            new_count: None,
        }
    }
}

/// Routes `parser_status` events into the shared state.
pub struct ParserStatusEngine {
    state: SharedState,
}

impl ParserStatusEngine {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    pub fn register(self, router: &mut EventRouter<GeneralEvent>) {
        let state = self.state;
        router.on(GeneralEventKind::ParserStatus, move |ev| {
            if let GeneralEvent::ParserStatus { status, new_count } = ev {
                let mut st = state
                    .lock()
                    .map_err(|_| anyhow!("state lock poisoned"))?;
                st.parser = ParserState {
                    status: *status,
                    new_count: *new_count,
                };
            }
            Ok(())
        });
    }
}
