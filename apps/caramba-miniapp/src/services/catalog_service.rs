use anyhow::Result;

use crate::api_client::ApiClient;
use crate::models::payment::ServicePlan;

#[derive(Clone)]
pub struct CatalogService {
    api: ApiClient,
}

impl CatalogService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn get_services(&self) -> Result<Vec<ServicePlan>> {
        Ok(self.api.get::<Vec<ServicePlan>>("/subscription/services").await?)
    }
}
