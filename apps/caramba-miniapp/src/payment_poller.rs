use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{Duration as ChronoDuration, Utc};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::api_client::ApiClient;
use crate::models::payment::{PaymentRecord, PendingPayment, SuccessfulPayment, STATUS_PENDING};
use crate::services::catalog_service::CatalogService;
use crate::services::pay_service::{self, PayService};
use crate::services::user_service::UserService;
use crate::state::AppState;
use crate::stores::payment_banner::PaymentBannerStore;
use crate::stores::session::{SessionStore, PENDING_PAYMENTS_KEY};

pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

const HISTORY_LOOKUP_LIMIT: u32 = 10;
/// A history entry with no id match only counts as ours while it is this
/// fresh; anything older is some earlier payment.
const HISTORY_MATCH_WINDOW_MINUTES: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Tracked payment is still in the backend's pending list.
    StillPending,
    /// Cycle did not run: backgrounded, another cycle in flight, or the
    /// user id could not be resolved.
    Skipped,
    /// Tracked payment left the pending state and was reconciled; the
    /// current timer must stop.
    LeftPending,
}

/// Reconciliation state machine: idle while the banner is empty, polling
/// while it tracks a payment with pending status.
#[derive(Clone)]
pub struct PaymentPoller {
    api: ApiClient,
    users: UserService,
    payments: PayService,
    catalog: CatalogService,
    banner: PaymentBannerStore,
    session: SessionStore,
    foreground: Arc<AtomicBool>,
    results: mpsc::UnboundedSender<SuccessfulPayment>,
    in_flight: Arc<AtomicBool>,
}

impl PaymentPoller {
    pub fn new(state: &AppState, results: mpsc::UnboundedSender<SuccessfulPayment>) -> Self {
        Self {
            api: state.api.clone(),
            users: state.users.clone(),
            payments: state.payments.clone(),
            catalog: state.catalog.clone(),
            banner: state.banner.clone(),
            session: state.session.clone(),
            foreground: state.foreground.clone(),
            results,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Runs until every result receiver is dropped or the task is aborted.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    pub async fn run(&self) {
        let mut rx = self.banner.subscribe();
        loop {
            if self.results.is_closed() {
                return;
            }
            let tracked = rx.borrow_and_update().clone();
            match tracked {
                Some(payment) if payment.status == STATUS_PENDING => {
                    self.poll_while_pending(&mut rx).await;
                }
                _ => {
                    // Idle until the store receives a trackable payment.
                    if rx.changed().await.is_err() {
                        return;
                    }
                }
            }
        }
    }

    /// One timer per tracked payment. Returns when the payment leaves the
    /// pending state or the slot changes; a fresh timer starts if another
    /// payment gets promoted.
    async fn poll_while_pending(&self, rx: &mut watch::Receiver<Option<PendingPayment>>) {
        let mut tick = tokio::time::interval(POLL_INTERVAL);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The interval's first tick fires immediately; the payment was
        // published moments ago, so wait a full period instead.
        tick.tick().await;

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    match self.poll_once().await {
                        Ok(CycleOutcome::LeftPending) => return,
                        Ok(_) => {}
                        // Transient failures never kill the loop.
                        Err(err) => tracing::debug!("payment poll cycle failed: {:#}", err),
                    }
                }
                changed = rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    // Replaced or cleared; this timer is stale either way.
                    return;
                }
            }
        }
    }

    /// One reconciliation cycle. Public so screens can force a check when
    /// the user returns from the checkout page.
    pub async fn poll_once(&self) -> Result<CycleOutcome> {
        // The 1-hour countdown is purely local; `current` clears an
        // expired banner without any network confirmation.
        let Some(tracked) = self.banner.current() else {
            return Ok(CycleOutcome::LeftPending);
        };
        if tracked.status != STATUS_PENDING {
            return Ok(CycleOutcome::LeftPending);
        }
        if !self.foreground.load(Ordering::Relaxed) {
            return Ok(CycleOutcome::Skipped);
        }
        // Cycles never overlap.
        if self.in_flight.swap(true, Ordering::SeqCst) {
            return Ok(CycleOutcome::Skipped);
        }
        let result = self.reconcile(&tracked).await;
        self.in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn reconcile(&self, tracked: &PendingPayment) -> Result<CycleOutcome> {
        self.api.clear_cache(Some("/payments"));

        let Some(user_id) = self.users.current_user_id().await? else {
            return Ok(CycleOutcome::Skipped);
        };

        let pending = self.payments.pending_payments(user_id).await?;
        let still_pending = pending
            .iter()
            .filter(|record| record.is_pending())
            .any(|record| record.payment_id().as_deref() == Some(tracked.id.as_str()));
        if still_pending {
            return Ok(CycleOutcome::StillPending);
        }

        // The payment left pending: something changed server-side whatever
        // the outcome was.
        self.api.clear_cache(Some("/subscription"));
        self.api.clear_cache(Some("/user"));

        if let Some(success) = self.lookup_outcome(user_id, tracked).await? {
            tracing::debug!("payment {} succeeded", success.id);
            let _ = self.results.send(success);
        }

        self.promote_next(&pending).await;
        Ok(CycleOutcome::LeftPending)
    }

    async fn lookup_outcome(
        &self,
        user_id: i64,
        tracked: &PendingPayment,
    ) -> Result<Option<SuccessfulPayment>> {
        let history = self
            .payments
            .payment_history(user_id, HISTORY_LOOKUP_LIMIT, 0)
            .await?;

        if let Some(entry) = history
            .iter()
            .find(|record| record.payment_id().as_deref() == Some(tracked.id.as_str()))
        {
            if !entry.is_success() {
                return Ok(None);
            }
            return Ok(Some(success_from(entry, tracked)));
        }

        // No id match happens with client-generated temporary ids. Fall
        // back to the freshest entry, inside a tight window so a stale
        // success is never claimed.
        let newest = history
            .iter()
            .filter(|record| record.created_at.is_some())
            .max_by_key(|record| record.created_at);
        if let Some(entry) = newest {
            let fresh = entry
                .created_at
                .map(|t| Utc::now() - t <= ChronoDuration::minutes(HISTORY_MATCH_WINDOW_MINUTES))
                .unwrap_or(false);
            if entry.is_success() && fresh {
                return Ok(Some(success_from(entry, tracked)));
            }
        }
        Ok(None)
    }

    /// Next-oldest pending payment takes over the banner, with the same
    /// enrichment the bootstrapper applies; none left clears it.
    async fn promote_next(&self, pending: &[PaymentRecord]) {
        let remaining: Vec<&PaymentRecord> =
            pending.iter().filter(|record| record.is_pending()).collect();
        if remaining.is_empty() {
            self.session.remove(PENDING_PAYMENTS_KEY);
            self.banner.clear();
            return;
        }

        let catalog = match self.catalog.get_services().await {
            Ok(catalog) => catalog,
            Err(err) => {
                tracing::debug!("service catalog unavailable: {:#}", err);
                Vec::new()
            }
        };

        let mut entries: Vec<PendingPayment> = remaining
            .into_iter()
            .map(|record| pay_service::enrich_pending(record, &catalog))
            .collect();
        entries.sort_by_key(|payment| payment.created_at);

        if let Ok(json) = serde_json::to_string(&entries) {
            self.session.set(PENDING_PAYMENTS_KEY, json);
        }

        let next = entries.remove(0);
        if next.payment_url.is_some() {
            self.banner.set(next);
        } else {
            self.banner.clear();
        }
    }
}

fn success_from(entry: &PaymentRecord, tracked: &PendingPayment) -> SuccessfulPayment {
    SuccessfulPayment {
        id: entry.payment_id().unwrap_or_else(|| tracked.id.clone()),
        price: if entry.amount() != 0.0 {
            entry.amount()
        } else {
            tracked.price
        },
        service_name: entry
            .service_name
            .clone()
            .or_else(|| tracked.service_name.clone()),
        mode: match entry.payment_type {
            Some(_) => entry.mode(),
            None => tracked.mode,
        },
    }
}
