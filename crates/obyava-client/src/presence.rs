//! Employee presence tracking.
//!
//! Maintains an in-memory map of employee ids to online/offline state and
//! last-seen timestamps, fed by individual status pushes and the bulk
//! online snapshot sent once after connect.

use std::collections::HashMap;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use tracing::debug;

use obyava_net::EventRouter;
use obyava_shared::protocol::{GeneralEvent, GeneralEventKind};
use obyava_shared::types::{EmployeeId, OnlineStatus, PresenceRecord};

use crate::state::SharedState;

/// Tracks the presence of every employee seen so far.
///
/// An id that was never mentioned is treated as offline. The bulk
/// snapshot is partial: it announces who is online now and says nothing
/// about anyone else, so absent ids keep their previous state.
#[derive(Debug, Default)]
pub struct PresenceMap {
    records: HashMap<EmployeeId, PresenceRecord>,
}

impl PresenceMap {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
        }
    }

    /// Upsert the record for a single employee.
    pub fn apply_status(
        &mut self,
        user_id: EmployeeId,
        status: OnlineStatus,
        last_seen: Option<DateTime<Utc>>,
    ) {
        debug!(user = %user_id, status = ?status, "presence update");
        self.records
            .insert(user_id, PresenceRecord { status, last_seen });
    }

    /// Apply the bulk online snapshot: every listed id becomes online with
    /// no last-seen. Ids not listed are left untouched.
    pub fn apply_online_snapshot(&mut self, user_ids: &[EmployeeId]) {
        debug!(count = user_ids.len(), "online users snapshot");
        for user_id in user_ids {
            self.records.insert(
                user_id.clone(),
                PresenceRecord {
                    status: OnlineStatus::Online,
                    last_seen: None,
                },
            );
        }
    }

    pub fn record(&self, id: &EmployeeId) -> Option<&PresenceRecord> {
        self.records.get(id)
    }

    /// Unknown employees read as offline.
    pub fn status_of(&self, id: &EmployeeId) -> OnlineStatus {
        self.records
            .get(id)
            .map(|r| r.status)
            .unwrap_or(OnlineStatus::Offline)
    }

    pub fn online_count(&self) -> usize {
        self.records
            .values()
            .filter(|r| r.status == OnlineStatus::Online)
            .count()
    }

    pub fn all(&self) -> impl Iterator<Item = (&EmployeeId, &PresenceRecord)> {
        self.records.iter()
    }
}

/// Routes presence events into the shared [`PresenceMap`].
pub struct PresenceEngine {
    state: SharedState,
}

impl PresenceEngine {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    pub fn register(self, router: &mut EventRouter<GeneralEvent>) {
        let state = self.state.clone();
        router.on(GeneralEventKind::UserStatus, move |ev| {
            if let GeneralEvent::UserStatus {
                user_id,
                status,
                last_seen,
            } = ev
            {
                let mut st = state
                    .lock()
                    .map_err(|_| anyhow!("state lock poisoned"))?;
                st.presence
                    .apply_status(user_id.clone(), *status, *last_seen);
            }
            Ok(())
        });

        let state = self.state;
        router.on(GeneralEventKind::OnlineUsersList, move |ev| {
            if let GeneralEvent::OnlineUsersList { user_ids } = ev {
                let mut st = state
                    .lock()
                    .map_err(|_| anyhow!("state lock poisoned"))?;
                st.presence.apply_online_snapshot(user_ids);
            }
            Ok(())
        });
    }
}
