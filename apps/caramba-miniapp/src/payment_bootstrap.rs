use anyhow::Result;

use crate::models::payment::PendingPayment;
use crate::services::catalog_service::CatalogService;
use crate::services::pay_service::{self, PayService};
use crate::services::user_service::UserService;
use crate::state::AppState;
use crate::stores::payment_banner::PaymentBannerStore;
use crate::stores::session::{SessionStore, PENDING_PAYMENTS_KEY};

/// Once-per-launch seeding of the payment banner from the backend's
/// pending-payments list. Best effort: every failure degrades to "no
/// banner shown", never to a visible error.
pub struct PaymentBootstrapper {
    users: UserService,
    payments: PayService,
    catalog: CatalogService,
    banner: PaymentBannerStore,
    session: SessionStore,
}

impl PaymentBootstrapper {
    pub fn new(state: &AppState) -> Self {
        Self {
            users: state.users.clone(),
            payments: state.payments.clone(),
            catalog: state.catalog.clone(),
            banner: state.banner.clone(),
            session: state.session.clone(),
        }
    }

    pub async fn run(&self) {
        if let Err(err) = self.try_run().await {
            tracing::debug!("pending payment bootstrap skipped: {:#}", err);
            self.session.remove(PENDING_PAYMENTS_KEY);
        }
    }

    async fn try_run(&self) -> Result<()> {
        self.session.remove(PENDING_PAYMENTS_KEY);

        let Some(user_id) = self.users.current_user_id().await? else {
            return Ok(());
        };

        let (pending, catalog) = tokio::join!(
            self.payments.pending_payments(user_id),
            self.catalog.get_services(),
        );
        let pending = pending?;
        // The catalog only feeds enrichment; live without it.
        let catalog = catalog.unwrap_or_else(|err| {
            tracing::debug!("service catalog unavailable: {:#}", err);
            Vec::new()
        });

        let mut entries: Vec<PendingPayment> = pending
            .iter()
            .filter(|record| record.is_pending())
            .map(|record| pay_service::enrich_pending(record, &catalog))
            .collect();
        entries.sort_by_key(|payment| payment.created_at);

        self.session
            .set(PENDING_PAYMENTS_KEY, serde_json::to_string(&entries)?);

        if let Some(oldest) = entries.into_iter().next() {
            if oldest.payment_url.is_some() {
                tracing::debug!("tracking pending payment {}", oldest.id);
                self.banner.set(oldest);
            }
        }
        Ok(())
    }
}
