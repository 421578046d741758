use serde::{Deserialize, Serialize};

/// Current-user shape from `/user/user`. Older panel builds expose
/// `user_id` instead of `telegram_id`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct User {
    pub telegram_id: Option<i64>,
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub balance: Option<f64>,
    pub referral_code: Option<String>,
}

impl User {
    pub fn id(&self) -> Option<i64> {
        self.telegram_id.or(self.user_id)
    }
}
