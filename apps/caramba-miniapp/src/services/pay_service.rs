use anyhow::Result;
use chrono::Utc;

use crate::api_client::ApiClient;
use crate::deep_link::ServiceMode;
use crate::models::payment::{PaymentRecord, PendingPayment, ServicePlan, STATUS_PENDING};

#[derive(Clone)]
pub struct PayService {
    api: ApiClient,
}

impl PayService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn pending_payments(&self, user_id: i64) -> Result<Vec<PaymentRecord>> {
        Ok(self
            .api
            .get::<Vec<PaymentRecord>>(&format!("/payments/user/{}/pending", user_id))
            .await?)
    }

    pub async fn payment_history(
        &self,
        user_id: i64,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<PaymentRecord>> {
        #[derive(serde::Deserialize)]
        struct HistoryResp {
            #[serde(default)]
            payments: Vec<PaymentRecord>,
        }
        let resp: HistoryResp = self
            .api
            .get(&format!(
                "/payments/user/{}/history?limit={}&offset={}",
                user_id, limit, offset
            ))
            .await?;
        Ok(resp.payments)
    }

    /// Creates a payment server-side and returns the banner entry for it.
    /// Checkout finishes on an external page, so the purchase flow seeds
    /// the tracking banner with the result right away.
    pub async fn start_checkout(
        &self,
        user_id: i64,
        service_id: i64,
        mode: ServiceMode,
    ) -> Result<PendingPayment> {
        #[derive(serde::Serialize)]
        struct CheckoutReq {
            service_id: i64,
            mode: ServiceMode,
        }
        let record: PaymentRecord = self
            .api
            .post(
                &format!("/payments/user/{}/create", user_id),
                &CheckoutReq { service_id, mode },
            )
            .await?;

        Ok(PendingPayment {
            id: record.payment_id().unwrap_or_else(temp_payment_id),
            status: STATUS_PENDING.to_string(),
            created_at: record.created_at.unwrap_or_else(Utc::now),
            payment_url: record.payment_url().map(str::to_string),
            mode,
            service_id: record.service_id,
            service_name: record.service_name.clone(),
            service_duration: record.service_duration,
            price: record.amount(),
        })
    }
}

/// Client-side id for payments the backend has not numbered yet.
fn temp_payment_id() -> String {
    format!("tmp-{}", uuid::Uuid::new_v4())
}

/// Builds the banner entry for a raw pending payment: status forced to
/// pending, payment URL normalized, missing service fields filled from the
/// catalog, and as a last resort a price pulled out of the description.
pub fn enrich_pending(record: &PaymentRecord, catalog: &[ServicePlan]) -> PendingPayment {
    let plan = record
        .service_id
        .and_then(|sid| catalog.iter().find(|p| p.plan_id() == Some(sid)));

    let service_name = record
        .service_name
        .clone()
        .filter(|name| !name.is_empty())
        .or_else(|| plan.and_then(|p| p.name.clone()));
    let service_duration = record
        .service_duration
        .or_else(|| plan.and_then(|p| p.duration_days));

    let mut price = record.amount();
    if price == 0.0 {
        if let Some(plan_price) = plan.and_then(|p| p.price) {
            price = plan_price;
        }
    }
    if price == 0.0 {
        if let Some(description) = &record.description {
            if let Some(parsed) = first_number(description) {
                price = parsed;
            }
        }
    }

    PendingPayment {
        id: record.payment_id().unwrap_or_else(temp_payment_id),
        status: STATUS_PENDING.to_string(),
        created_at: record.created_at.unwrap_or_else(Utc::now),
        payment_url: record.payment_url().map(str::to_string),
        mode: record.mode(),
        service_id: record.service_id,
        service_name,
        service_duration,
        price,
    }
}

/// First decimal number in a free-text description, e.g. "VPN 500 RUB".
fn first_number(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    let start = bytes.iter().position(|b| b.is_ascii_digit())?;
    let mut end = start;
    let mut seen_dot = false;
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => end += 1,
            b'.' if !seen_dot => {
                seen_dot = true;
                end += 1;
            }
            _ => break,
        }
    }
    text[start..end].trim_end_matches('.').parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plan(id: i64, name: &str, price: f64, days: i64) -> ServicePlan {
        ServicePlan {
            id: Some(id),
            service_id: None,
            name: Some(name.to_string()),
            price: Some(price),
            duration_days: Some(days),
        }
    }

    #[test]
    fn enrichment_fills_missing_fields_from_catalog() {
        let record: PaymentRecord = serde_json::from_value(json!({
            "id": 5,
            "status": "pending",
            "service_id": 2,
            "payment_url": "https://pay/5",
            "price": 0,
        }))
        .unwrap();
        let catalog = [plan(1, "Basic", 200.0, 30), plan(2, "Pro", 900.0, 90)];

        let enriched = enrich_pending(&record, &catalog);
        assert_eq!(enriched.id, "5");
        assert_eq!(enriched.status, STATUS_PENDING);
        assert_eq!(enriched.service_name.as_deref(), Some("Pro"));
        assert_eq!(enriched.service_duration, Some(90));
        assert_eq!(enriched.price, 900.0);
        assert_eq!(enriched.payment_url.as_deref(), Some("https://pay/5"));
    }

    #[test]
    fn enrichment_keeps_existing_fields() {
        let record: PaymentRecord = serde_json::from_value(json!({
            "id": 6,
            "service_id": 2,
            "service_name": "Custom",
            "price": 123.0,
        }))
        .unwrap();
        let catalog = [plan(2, "Pro", 900.0, 90)];

        let enriched = enrich_pending(&record, &catalog);
        assert_eq!(enriched.service_name.as_deref(), Some("Custom"));
        assert_eq!(enriched.price, 123.0);
    }

    #[test]
    fn price_falls_back_to_description_number() {
        let record: PaymentRecord = serde_json::from_value(json!({
            "id": 7,
            "description": "Subscription renewal for 499.50 RUB",
        }))
        .unwrap();
        let enriched = enrich_pending(&record, &[]);
        assert_eq!(enriched.price, 499.5);
    }

    #[test]
    fn record_without_id_gets_a_temporary_one() {
        let enriched = enrich_pending(&PaymentRecord::default(), &[]);
        assert!(enriched.id.starts_with("tmp-"));
    }

    #[test]
    fn first_number_scanning() {
        assert_eq!(first_number("500"), Some(500.0));
        assert_eq!(first_number("pay 12.5 now"), Some(12.5));
        assert_eq!(first_number("v1.2.3"), Some(1.2));
        assert_eq!(first_number("ends with 7."), Some(7.0));
        assert_eq!(first_number("no digits"), None);
    }
}
