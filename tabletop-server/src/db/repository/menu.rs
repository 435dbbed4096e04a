//! Menu Repository
//!
//! 订单核心只读菜单；唯一写入是价格/可售状态调整。

use super::{RepoError, RepoResult};
use shared::models::{MenuItem, MenuItemUpdate, Modifier, ModifierOption};
use sqlx::SqlitePool;

pub async fn find_item(pool: &SqlitePool, id: i64) -> RepoResult<Option<MenuItem>> {
    let item = sqlx::query_as::<_, MenuItem>(
        "SELECT id, name, price_cents, is_available FROM menu_item WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(item)
}

pub async fn find_all_items(pool: &SqlitePool) -> RepoResult<Vec<MenuItem>> {
    let items = sqlx::query_as::<_, MenuItem>(
        "SELECT id, name, price_cents, is_available FROM menu_item ORDER BY name",
    )
    .fetch_all(pool)
    .await?;
    Ok(items)
}

/// Modifier axes attached to one item
pub async fn modifiers_for_item(pool: &SqlitePool, item_id: i64) -> RepoResult<Vec<Modifier>> {
    let modifiers = sqlx::query_as::<_, Modifier>(
        "SELECT id, item_id, name FROM modifier WHERE item_id = ? ORDER BY id",
    )
    .bind(item_id)
    .fetch_all(pool)
    .await?;
    Ok(modifiers)
}

/// Every option of every modifier attached to one item
pub async fn options_for_item(pool: &SqlitePool, item_id: i64) -> RepoResult<Vec<ModifierOption>> {
    let options = sqlx::query_as::<_, ModifierOption>(
        "SELECT o.id, o.modifier_id, o.name, o.price_delta_cents \
         FROM modifier_option o JOIN modifier m ON m.id = o.modifier_id \
         WHERE m.item_id = ? ORDER BY o.id",
    )
    .bind(item_id)
    .fetch_all(pool)
    .await?;
    Ok(options)
}

pub async fn update_item(pool: &SqlitePool, id: i64, data: &MenuItemUpdate) -> RepoResult<MenuItem> {
    if let Some(price) = data.price_cents
        && price < 0
    {
        return Err(RepoError::Validation("price_cents must not be negative".into()));
    }

    let rows = sqlx::query(
        "UPDATE menu_item SET price_cents = COALESCE(?1, price_cents), is_available = COALESCE(?2, is_available) WHERE id = ?3",
    )
    .bind(data.price_cents)
    .bind(data.is_available)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Menu item {id} not found")));
    }
    find_item(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Menu item {id} not found")))
}
