// agro_market/src/models/profile.rs

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

pub const DEFAULT_PHONE_NUMBER: &str = "N/A";
pub const DEFAULT_AVATAR: &str = "profile_pics/default.jpg";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Profile {
  pub id: Uuid,
  pub user_id: Uuid,
  pub phone_number: String,
  pub address: Option<String>,
  pub profile_picture: Option<String>,
}

impl Profile {
  pub fn new_for(user_id: Uuid) -> Self {
    Self {
      id: Uuid::new_v4(),
      user_id,
      phone_number: DEFAULT_PHONE_NUMBER.to_string(),
      address: None,
      profile_picture: None,
    }
  }

  /// Public URL of the picture, falling back to the default avatar.
  pub fn picture_url(&self, media_url: &str) -> String {
    let path = self.profile_picture.as_deref().unwrap_or(DEFAULT_AVATAR);
    format!("{}/{}", media_url.trim_end_matches('/'), path.trim_start_matches('/'))
  }
}
