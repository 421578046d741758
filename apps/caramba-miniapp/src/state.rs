use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::api_client::ApiClient;
use crate::config::MiniAppConfig;
use crate::deep_link::{LaunchContext, Screen};
use crate::models::payment::SuccessfulPayment;
use crate::navigation::{NavigationDispatcher, UiBridge};
use crate::payment_bootstrap::PaymentBootstrapper;
use crate::payment_poller::PaymentPoller;
use crate::services::catalog_service::CatalogService;
use crate::services::pay_service::PayService;
use crate::services::user_service::UserService;
use crate::stores::payment_banner::PaymentBannerStore;
use crate::stores::pending_action::PendingActionStore;
use crate::stores::session::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub config: MiniAppConfig,
    pub api: ApiClient,
    pub users: UserService,
    pub catalog: CatalogService,
    pub payments: PayService,
    pub actions: PendingActionStore,
    pub banner: PaymentBannerStore,
    pub session: SessionStore,
    pub foreground: Arc<AtomicBool>,
}

impl AppState {
    /// `init_data` comes from the Telegram host and authenticates every
    /// backend call.
    pub fn new(config: MiniAppConfig, init_data: String) -> Self {
        let api = ApiClient::new(config.api_base_url.clone(), init_data);
        Self {
            users: UserService::new(api.clone()),
            catalog: CatalogService::new(api.clone()),
            payments: PayService::new(api.clone()),
            actions: PendingActionStore::new(),
            banner: PaymentBannerStore::new(),
            session: SessionStore::new(),
            foreground: Arc::new(AtomicBool::new(true)),
            api,
            config,
        }
    }

    /// Host visibility signal; the poller skips cycles while backgrounded.
    pub fn set_foreground(&self, visible: bool) {
        self.foreground.store(visible, Ordering::Relaxed);
    }

    /// Launch-time routing; returns the initial screen.
    pub fn dispatch_launch(&self, ctx: &LaunchContext, ui: Arc<dyn UiBridge>) -> Screen {
        NavigationDispatcher::new(
            self.actions.clone(),
            ui,
            self.config.news_channel_url.clone(),
        )
        .dispatch(ctx)
    }

    /// Spawns the bootstrap and reconciliation tasks and hands back the
    /// channel the success overlay listens on. Aborting the handle (or
    /// dropping the receiver) tears the polling down.
    pub fn start_payment_tracking(
        &self,
    ) -> (mpsc::UnboundedReceiver<SuccessfulPayment>, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = PaymentPoller::new(self, tx).spawn();

        let bootstrapper = PaymentBootstrapper::new(self);
        tokio::spawn(async move { bootstrapper.run().await });

        (rx, handle)
    }
}
