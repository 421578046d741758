use std::sync::Arc;

use crate::deep_link::{self, DeepLinkAction, LaunchContext, Screen, ServiceMode};
use crate::legacy_link::{self, LegacyAction, LegacyRoute};
use crate::stores::pending_action::{PendingAction, PendingActionStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalModal {
    Instructions,
    Support,
}

/// Host-side effects the dispatcher can trigger. The Telegram WebApp
/// bridge implements this; tests use a recording stub.
pub trait UiBridge: Send + Sync {
    fn open_modal(&self, modal: GlobalModal);
    /// Opens via the host when available, else a new browser tab.
    fn open_external(&self, url: &str);
}

/// Launch-time routing: runs once, before the first screen body paints.
pub struct NavigationDispatcher {
    actions: PendingActionStore,
    ui: Arc<dyn UiBridge>,
    news_channel_url: String,
}

impl NavigationDispatcher {
    pub fn new(
        actions: PendingActionStore,
        ui: Arc<dyn UiBridge>,
        news_channel_url: String,
    ) -> Self {
        Self {
            actions,
            ui,
            news_channel_url,
        }
    }

    /// Resolves the initial screen. A new-format deep link wins outright;
    /// legacy parsing only runs when none is present.
    pub fn dispatch(&self, ctx: &LaunchContext) -> Screen {
        let start_param = deep_link::extract_start_param(ctx);
        if !start_param.is_empty() && !deep_link::is_referral_param(&start_param) {
            if let Some(action) = deep_link::decode(&start_param) {
                return self.dispatch_action(action);
            }
        }

        if let Some(route) = legacy_link::parse_legacy(&ctx.query, &ctx.hash) {
            return self.dispatch_legacy(route);
        }

        Screen::Subscription
    }

    fn dispatch_action(&self, action: DeepLinkAction) -> Screen {
        match action {
            DeepLinkAction::Navigate(screen) => screen,
            // App-shell-level modals open immediately, not via the store.
            DeepLinkAction::Instructions => {
                self.ui.open_modal(GlobalModal::Instructions);
                Screen::Subscription
            }
            DeepLinkAction::Support => {
                self.ui.open_modal(GlobalModal::Support);
                Screen::Subscription
            }
            DeepLinkAction::News => {
                self.ui.open_external(&self.news_channel_url);
                Screen::Subscription
            }
            // Everything else is a modal/flow on the subscription screen,
            // consumed once it mounts.
            other => {
                self.actions.set(PendingAction::new(other));
                Screen::Subscription
            }
        }
    }

    fn dispatch_legacy(&self, route: LegacyRoute) -> Screen {
        let LegacyRoute {
            screen,
            action,
            params,
        } = route;

        let action = match action {
            Some(LegacyAction::ActivateCode) => {
                let code = params
                    .get("activate-code")
                    .or_else(|| params.get("activate_code"))
                    .filter(|code| !code.is_empty())
                    .cloned();
                Some(DeepLinkAction::ActivateCode { code })
            }
            Some(LegacyAction::Services) => {
                let mode = params
                    .get("mode")
                    .and_then(|mode| ServiceMode::from_param(mode))
                    .unwrap_or_default();
                Some(DeepLinkAction::Services { mode })
            }
            Some(LegacyAction::Gift) => Some(DeepLinkAction::Gift),
            Some(LegacyAction::DailyBonus) => Some(DeepLinkAction::DailyBonus),
            Some(LegacyAction::News) => {
                self.ui.open_external(&self.news_channel_url);
                None
            }
            None => None,
        };

        if let Some(action) = action {
            self.actions.set(PendingAction { action, params });
        }
        screen
    }
}
