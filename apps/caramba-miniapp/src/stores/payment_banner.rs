use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::watch;

use crate::models::payment::PendingPayment;

/// The banner tracks a payment for at most one hour after `created_at`;
/// past that it is cleared locally, with no backend confirmation.
pub const BANNER_TTL_MINUTES: i64 = 60;

/// Single-slot holder for the one pending payment the user is tracking.
/// Mutation is replacement-only; the poller subscribes for transitions.
#[derive(Clone)]
pub struct PaymentBannerStore {
    tx: Arc<watch::Sender<Option<PendingPayment>>>,
}

impl PaymentBannerStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Replaces the tracked payment wholesale. A payment already past its
    /// window is dropped instead of published.
    pub fn set(&self, payment: PendingPayment) {
        if Self::expired(&payment) {
            self.tx.send_replace(None);
            return;
        }
        self.tx.send_replace(Some(payment));
    }

    pub fn clear(&self) {
        self.tx.send_replace(None);
    }

    /// Currently tracked payment; an expired one is cleared on read.
    pub fn current(&self) -> Option<PendingPayment> {
        let current = self.tx.borrow().clone();
        match current {
            Some(payment) if Self::expired(&payment) => {
                self.tx.send_replace(None);
                None
            }
            other => other,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<PendingPayment>> {
        self.tx.subscribe()
    }

    /// Seconds left on the countdown, recomputed from wall clock for the
    /// 1-second display timer.
    pub fn time_left_secs(&self) -> Option<i64> {
        let payment = self.current()?;
        let deadline = payment.created_at + Duration::minutes(BANNER_TTL_MINUTES);
        Some((deadline - Utc::now()).num_seconds().max(0))
    }

    fn expired(payment: &PendingPayment) -> bool {
        Utc::now() - payment.created_at > Duration::minutes(BANNER_TTL_MINUTES)
    }
}

impl Default for PaymentBannerStore {
    fn default() -> Self {
        Self::new()
    }
}
