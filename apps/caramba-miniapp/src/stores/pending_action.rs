use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::deep_link::DeepLinkAction;

/// Child modals need a moment to finish mounting before the action fires.
pub const SETTLE_DELAY: Duration = Duration::from_millis(400);

#[derive(Debug, Clone, PartialEq)]
pub struct PendingAction {
    pub action: DeepLinkAction,
    /// Extra parameters carried over from legacy links
    /// (`subscription_id`, `service_id`, ...).
    pub params: HashMap<String, String>,
}

impl PendingAction {
    pub fn new(action: DeepLinkAction) -> Self {
        Self {
            action,
            params: HashMap::new(),
        }
    }
}

/// Single-slot holder for one action awaiting whichever screen mounts
/// next. The read is destructive, so the action is consumed at most once.
#[derive(Clone, Default)]
pub struct PendingActionStore {
    slot: Arc<Mutex<Option<PendingAction>>>,
}

impl PendingActionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, action: PendingAction) {
        *self.slot.lock().unwrap() = Some(action);
    }

    pub fn take(&self) -> Option<PendingAction> {
        self.slot.lock().unwrap().take()
    }

    pub fn is_empty(&self) -> bool {
        self.slot.lock().unwrap().is_none()
    }

    /// Screen-mount consumption: waits out the settle delay, then takes.
    pub async fn consume(&self) -> Option<PendingAction> {
        tokio::time::sleep(SETTLE_DELAY).await;
        self.take()
    }
}
