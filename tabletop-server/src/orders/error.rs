//! Order engine errors

use shared::error::{AppError, ErrorCode};
use shared::order::OrderStatus;
use thiserror::Error;

use crate::db::repository::RepoError;

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Order must contain at least one item")]
    EmptyOrder,

    #[error("Line {line}: quantity must be a positive integer")]
    InvalidQuantity { line: usize },

    #[error("Table not found: {0}")]
    TableNotFound(i64),

    #[error("Table is inactive: {0}")]
    TableInactive(i64),

    #[error("Line {line}: menu item not found: {item_id}")]
    ItemNotFound { line: usize, item_id: i64 },

    #[error("Line {line}: menu item is not available: {item_id}")]
    ItemUnavailable { line: usize, item_id: i64 },

    #[error("Line {line}: {reason}")]
    ModifierInvalid { line: usize, reason: String },

    #[error("Price mismatch: declared {declared}, computed {computed}")]
    PriceMismatch {
        declared: i64,
        computed: i64,
        /// `None` 表示订单总价不符，`Some(i)` 表示第 i 行单价过期
        line: Option<usize>,
    },

    #[error("Order not found: {0}")]
    NotFound(i64),

    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Concurrent update conflict on order {0}")]
    Conflict(i64),

    #[error("Storage error: {0}")]
    Storage(#[from] RepoError),
}

pub type OrderResult<T> = Result<T, OrderError>;

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        let message = err.to_string();
        match err {
            OrderError::Validation(_) => AppError::with_message(ErrorCode::ValidationFailed, message),
            OrderError::EmptyOrder => AppError::with_message(ErrorCode::OrderEmpty, message),
            OrderError::InvalidQuantity { line } => {
                AppError::with_message(ErrorCode::InvalidQuantity, message).with_detail("line", line)
            }
            OrderError::TableNotFound(id) => {
                AppError::with_message(ErrorCode::TableNotFound, message).with_detail("tableId", id)
            }
            OrderError::TableInactive(id) => {
                AppError::with_message(ErrorCode::TableInactive, message).with_detail("tableId", id)
            }
            OrderError::ItemNotFound { line, item_id } => {
                AppError::with_message(ErrorCode::MenuItemNotFound, message)
                    .with_detail("line", line)
                    .with_detail("itemId", item_id)
            }
            OrderError::ItemUnavailable { line, item_id } => {
                AppError::with_message(ErrorCode::MenuItemUnavailable, message)
                    .with_detail("line", line)
                    .with_detail("itemId", item_id)
            }
            OrderError::ModifierInvalid { line, .. } => {
                AppError::with_message(ErrorCode::ModifierInvalid, message).with_detail("line", line)
            }
            OrderError::PriceMismatch {
                declared,
                computed,
                line,
            } => {
                let err = AppError::with_message(ErrorCode::PriceMismatch, message)
                    .with_detail("declaredCents", declared)
                    .with_detail("computedCents", computed);
                match line {
                    Some(line) => err.with_detail("line", line),
                    None => err,
                }
            }
            OrderError::NotFound(id) => {
                AppError::with_message(ErrorCode::OrderNotFound, message).with_detail("orderId", id)
            }
            OrderError::InvalidTransition { from, to } => {
                AppError::with_message(ErrorCode::InvalidTransition, message)
                    .with_detail("from", from.as_str())
                    .with_detail("to", to.as_str())
            }
            OrderError::Conflict(id) => {
                AppError::with_message(ErrorCode::Conflict, message).with_detail("orderId", id)
            }
            OrderError::Storage(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn test_price_mismatch_details() {
        let err: AppError = OrderError::PriceMismatch {
            declared: 500,
            computed: 560,
            line: None,
        }
        .into();
        assert_eq!(err.code, ErrorCode::PriceMismatch);
        assert_eq!(err.http_status(), StatusCode::BAD_REQUEST);
        let details = err.details.unwrap();
        assert_eq!(details["declaredCents"], 500);
        assert_eq!(details["computedCents"], 560);
        assert!(!details.contains_key("line"));
    }

    #[test]
    fn test_transition_and_conflict_mapping() {
        let err: AppError = OrderError::InvalidTransition {
            from: OrderStatus::Served,
            to: OrderStatus::Preparing,
        }
        .into();
        assert_eq!(err.http_status(), StatusCode::BAD_REQUEST);
        let details = err.details.unwrap();
        assert_eq!(details["from"], "SERVED");
        assert_eq!(details["to"], "PREPARING");

        let err: AppError = OrderError::Conflict(1).into();
        assert_eq!(err.http_status(), StatusCode::CONFLICT);

        let err: AppError = OrderError::Storage(RepoError::Database("boom".into())).into();
        assert_eq!(err.http_status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
