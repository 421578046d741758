use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::deep_link::ServiceMode;

pub const STATUS_PENDING: &str = "pending";

const SUCCESS_STATUSES: [&str; 3] = ["succeeded", "success", "paid"];

/// Raw payment shape shared by the pending-list and history endpoints.
/// Everything is optional; the backend has shipped several spellings of
/// the id and payment-URL fields over time.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PaymentRecord {
    pub id: Option<Value>,
    pub payment_id: Option<Value>,
    pub payment_type: Option<String>,
    pub status: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub confirmation_url: Option<String>,
    pub payment_url: Option<String>,
    pub url: Option<String>,
    pub receipt_link: Option<String>,
    pub service_id: Option<i64>,
    pub service_name: Option<String>,
    pub service_duration: Option<i64>,
    pub price: Option<f64>,
    pub amount: Option<f64>,
    pub description: Option<String>,
}

impl PaymentRecord {
    /// Backend id as a string, whichever field and JSON type it arrived in.
    pub fn payment_id(&self) -> Option<String> {
        id_to_string(self.id.as_ref()).or_else(|| id_to_string(self.payment_id.as_ref()))
    }

    /// Canonical payment URL, normalized across the source field variants.
    pub fn payment_url(&self) -> Option<&str> {
        [
            self.confirmation_url.as_deref(),
            self.payment_url.as_deref(),
            self.url.as_deref(),
            self.receipt_link.as_deref(),
        ]
        .into_iter()
        .flatten()
        .find(|url| !url.is_empty())
    }

    pub fn amount(&self) -> f64 {
        self.price.or(self.amount).unwrap_or(0.0)
    }

    pub fn is_pending(&self) -> bool {
        self.status.as_deref() == Some(STATUS_PENDING)
    }

    pub fn is_success(&self) -> bool {
        self.status
            .as_deref()
            .map(|status| SUCCESS_STATUSES.contains(&status))
            .unwrap_or(false)
    }

    pub fn mode(&self) -> ServiceMode {
        match self.payment_type.as_deref() {
            Some("renew") | Some("extend") => ServiceMode::Renew,
            Some("gift") => ServiceMode::Gift,
            _ => ServiceMode::Buy,
        }
    }
}

fn id_to_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// The one payment the banner is currently tracking. Mutated only by
/// whole-object replacement, never field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingPayment {
    /// Backend id stringified, or a client-generated temporary id.
    pub id: String,
    pub status: String,
    /// Anchors the fixed 1-hour banner window.
    pub created_at: DateTime<Utc>,
    /// Canonical checkout URL; the banner is only shown when present.
    pub payment_url: Option<String>,
    pub mode: ServiceMode,
    pub service_id: Option<i64>,
    pub service_name: Option<String>,
    pub service_duration: Option<i64>,
    pub price: f64,
}

/// One-shot poller output driving the success overlay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuccessfulPayment {
    pub id: String,
    pub price: f64,
    pub service_name: Option<String>,
    pub mode: ServiceMode,
}

/// Catalog item from `/subscription/services`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServicePlan {
    pub id: Option<i64>,
    pub service_id: Option<i64>,
    pub name: Option<String>,
    pub price: Option<f64>,
    pub duration_days: Option<i64>,
}

impl ServicePlan {
    pub fn plan_id(&self) -> Option<i64> {
        self.id.or(self.service_id)
    }
}
