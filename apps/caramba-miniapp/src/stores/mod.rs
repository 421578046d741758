pub mod payment_banner;
pub mod pending_action;
pub mod session;
