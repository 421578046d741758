//! Client core for the Caramba Telegram Mini App: deep-link decoding and
//! dispatch, the panel API gateway, and pending-payment tracking. Screens
//! and rendering live in the web layer and consume this crate through
//! [`state::AppState`].

pub mod api_client;
pub mod config;
pub mod deep_link;
pub mod legacy_link;
pub mod models;
pub mod navigation;
pub mod payment_bootstrap;
pub mod payment_poller;
pub mod services;
pub mod state;
pub mod stores;

/// Log setup for hosting binaries and tests. Safe to call more than once.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "caramba_miniapp=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
