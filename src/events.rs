use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;
use utoipa::ToSchema;

use crate::progress::record::{ItemType, ProgressStatus};

/// Broadcast payload for realtime subscribers. Emitted exactly once per
/// accepted update at each level of the cascade.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProgressEvent {
    pub item_type: ItemType,
    pub item_id: i64,
    pub progress_percentage: i64,
    pub status: ProgressStatus,
}

/// Fire-and-forget fan-out over a tokio broadcast channel. Sending with no
/// live subscriber is fine; the event is simply dropped.
#[derive(Debug, Clone)]
pub struct ProgressNotifier {
    sender: broadcast::Sender<ProgressEvent>,
}

impl ProgressNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.sender.subscribe()
    }

    pub fn emit(
        &self,
        item_type: ItemType,
        item_id: i64,
        progress_percentage: i64,
        status: ProgressStatus,
    ) {
        let event = ProgressEvent {
            item_type,
            item_id,
            progress_percentage,
            status,
        };
        debug!(?event, "progress update");
        let _ = self.sender.send(event);
    }
}

impl Default for ProgressNotifier {
    fn default() -> Self {
        Self::new(256)
    }
}
