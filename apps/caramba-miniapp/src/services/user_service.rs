use anyhow::Result;

use crate::api_client::{ApiClient, CURRENT_USER_ENDPOINT, REGISTER_ENDPOINT};
use crate::models::user::User;

#[derive(Clone)]
pub struct UserService {
    api: ApiClient,
}

impl UserService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Registers (or upserts) the current user. With no explicit body the
    /// gateway attaches the referral source, when one is known.
    pub async fn register(&self) -> Result<User> {
        Ok(self.api.post_empty::<User>(REGISTER_ENDPOINT, None).await?)
    }

    /// Current user; cached for 30 s by the gateway.
    pub async fn current_user(&self) -> Result<User> {
        Ok(self
            .api
            .post_empty::<User>(CURRENT_USER_ENDPOINT, Some(true))
            .await?)
    }

    pub async fn current_user_id(&self) -> Result<Option<i64>> {
        Ok(self.current_user().await?.id())
    }
}
