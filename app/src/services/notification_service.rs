// agro_market/src/services/notification_service.rs

use crate::models::Notification;
use crate::store::Store;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Records a notification in its own transaction.
///
/// Called after a flow has committed its business writes, so a failure here is
/// logged and reported as `false` instead of undoing them.
#[instrument(name = "notification_service::notify", skip(store, message), fields(user_id = %user_id))]
pub async fn notify(store: &dyn Store, user_id: Uuid, message: String) -> bool {
  let notification = Notification::new(user_id, message);
  let result = async {
    let mut tx = store.begin().await?;
    tx.insert_notification(&notification).await?;
    tx.commit().await
  }
  .await;

  match result {
    Ok(()) => {
      info!(notification_id = %notification.id, "Notification recorded.");
      true
    }
    Err(e) => {
      warn!(error = %e, "Failed to record notification.");
      false
    }
  }
}
