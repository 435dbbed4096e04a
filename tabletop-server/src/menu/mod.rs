//! Catalog price / availability changes
//!
//! 唯一的菜单写操作。改价只影响之后的下单，已有订单的总额和行快照保持冻结。

use std::sync::Arc;

use shared::error::{AppError, ErrorCode};
use shared::message::MenuUpdatedPayload;
use shared::models::{MenuItem, MenuItemUpdate};
use shared::util::now_millis;
use shared::{BusMessage, Publisher, Topics};
use sqlx::SqlitePool;
use thiserror::Error;

use crate::db::repository::{RepoError, menu};

#[derive(Debug, Error)]
pub enum MenuError {
    #[error("Menu item not found: {0}")]
    ItemNotFound(i64),

    #[error("Price must not be negative: {0}")]
    NegativePrice(i64),

    #[error("Nothing to update")]
    EmptyUpdate,

    #[error("Storage error: {0}")]
    Storage(#[from] RepoError),
}

impl From<MenuError> for AppError {
    fn from(err: MenuError) -> Self {
        let message = err.to_string();
        match err {
            MenuError::ItemNotFound(id) => {
                AppError::with_message(ErrorCode::MenuItemNotFound, message).with_detail("itemId", id)
            }
            MenuError::NegativePrice(price) => {
                AppError::with_message(ErrorCode::ValueOutOfRange, message)
                    .with_detail("priceCents", price)
            }
            MenuError::EmptyUpdate => AppError::validation(message),
            MenuError::Storage(e) => e.into(),
        }
    }
}

#[derive(Clone)]
pub struct MenuService {
    pool: SqlitePool,
    publisher: Arc<dyn Publisher>,
    topics: Topics,
}

impl MenuService {
    pub fn new(pool: SqlitePool, publisher: Arc<dyn Publisher>, topics: Topics) -> Self {
        Self {
            pool,
            publisher,
            topics,
        }
    }

    pub async fn update_item(&self, item_id: i64, update: &MenuItemUpdate) -> Result<MenuItem, MenuError> {
        if update.price_cents.is_none() && update.is_available.is_none() {
            return Err(MenuError::EmptyUpdate);
        }
        if let Some(price) = update.price_cents
            && price < 0
        {
            return Err(MenuError::NegativePrice(price));
        }

        let item = menu::update_item(&self.pool, item_id, update)
            .await
            .map_err(|e| match e {
                RepoError::NotFound(_) => MenuError::ItemNotFound(item_id),
                other => MenuError::Storage(other),
            })?;

        tracing::info!(
            item_id,
            price_cents = item.price_cents,
            is_available = item.is_available,
            "Menu item updated"
        );

        let topic = self.topics.menu_updated();
        let payload = MenuUpdatedPayload {
            item_id,
            ts: now_millis(),
        };
        match BusMessage::new(topic.as_str(), &payload) {
            Ok(msg) => {
                if let Err(e) = self.publisher.publish(msg).await {
                    tracing::warn!(topic = %topic, error = %e, "Failed to publish menu update");
                }
            }
            Err(e) => tracing::warn!(topic = %topic, error = %e, "Failed to build menu update"),
        }

        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    async fn setup() -> (MenuService, Arc<RecordingPublisher>, SqlitePool) {
        let pool = memory_pool().await;
        seed_item(&pool, 100, "Latte", 250, true).await;
        let recorder = Arc::new(RecordingPublisher::default());
        let service = MenuService::new(pool.clone(), recorder.clone(), topics());
        (service, recorder, pool)
    }

    #[tokio::test]
    async fn test_update_price_publishes() {
        let (service, recorder, _pool) = setup().await;
        let item = service
            .update_item(
                100,
                &MenuItemUpdate {
                    price_cents: Some(300),
                    is_available: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(item.price_cents, 300);
        assert!(item.is_available);

        let sent = recorder.on("stores/s1/menu/updated");
        assert_eq!(sent.len(), 1);
        let payload: MenuUpdatedPayload = sent[0].parse_payload().unwrap();
        assert_eq!(payload.item_id, 100);
    }

    #[tokio::test]
    async fn test_update_validation() {
        let (service, recorder, _pool) = setup().await;
        assert!(matches!(
            service
                .update_item(
                    100,
                    &MenuItemUpdate {
                        price_cents: Some(-1),
                        is_available: None
                    }
                )
                .await,
            Err(MenuError::NegativePrice(-1))
        ));
        assert!(matches!(
            service.update_item(100, &MenuItemUpdate::default()).await,
            Err(MenuError::EmptyUpdate)
        ));
        assert!(matches!(
            service
                .update_item(
                    404,
                    &MenuItemUpdate {
                        price_cents: None,
                        is_available: Some(false)
                    }
                )
                .await,
            Err(MenuError::ItemNotFound(404))
        ));
        assert!(recorder.messages().is_empty());
    }
}
