//! HTTP client for the Tabletop REST API

use std::collections::BTreeSet;

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shared::models::{MenuItem, MenuItemUpdate, WaiterAssignment};
use shared::order::{
    CreateOrderRequest, Order, OrderCreated, OrderStatus, QueuePosition, TransitionRequest,
};
use shared::projection::{QueueLength, SeriesPoint, SeriesQuery, StatusCount, TableActivity};

use crate::{ClientConfig, ClientError, ClientResult};

/// Order list filter (`GET /api/orders`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderQuery {
    pub statuses: Vec<OrderStatus>,
    pub table_id: Option<i64>,
    pub limit: Option<i64>,
}

impl OrderQuery {
    /// 队列视图常用：PLACED + PREPARING
    pub fn queued() -> Self {
        Self {
            statuses: OrderStatus::QUEUED.to_vec(),
            ..Default::default()
        }
    }

    fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if !self.statuses.is_empty() {
            let joined = self
                .statuses
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(",");
            params.push(("status", joined));
        }
        if let Some(table_id) = self.table_id {
            params.push(("tableId", table_id.to_string()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        params
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CallRequest {
    table_id: i64,
}

/// `GET /health` (subset used by clients)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub store_id: String,
    pub uptime_seconds: u64,
    pub bus_clients: usize,
}

/// HTTP client for making requests to the Tabletop server
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpClient {
    /// Create a new HTTP client from configuration
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    /// Set the authentication token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Get the current token
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.client.request(method, self.url(path));
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> ClientResult<T> {
        let response = Self::check(request.send().await?).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            ClientError::InvalidResponse(format!("{}: {}", e, String::from_utf8_lossy(&bytes)))
        })
    }

    async fn send_empty(request: RequestBuilder) -> ClientResult<()> {
        Self::check(request.send().await?).await?;
        Ok(())
    }

    /// Map a non-success response to a [`ClientError`]
    async fn check(response: Response) -> ClientResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(status = status.as_u16(), body = %body, "API request failed");
        Err(ClientError::from_status(status.as_u16(), &body))
    }

    // ========== Health ==========

    pub async fn health(&self) -> ClientResult<HealthStatus> {
        Self::send_json(self.request(Method::GET, "/health")).await
    }

    // ========== Orders ==========

    /// POST /api/orders
    pub async fn create_order(&self, request: &CreateOrderRequest) -> ClientResult<OrderCreated> {
        Self::send_json(self.request(Method::POST, "/api/orders").json(request)).await
    }

    /// GET /api/orders
    pub async fn list_orders(&self, query: &OrderQuery) -> ClientResult<Vec<Order>> {
        Self::send_json(
            self.request(Method::GET, "/api/orders")
                .query(&query.to_params()),
        )
        .await
    }

    /// GET /api/orders/{id}
    pub async fn get_order(&self, order_id: i64) -> ClientResult<Order> {
        Self::send_json(self.request(Method::GET, &format!("/api/orders/{}", order_id))).await
    }

    /// PUT /api/orders/{id}/status
    pub async fn transition(&self, order_id: i64, status: OrderStatus) -> ClientResult<Order> {
        Self::send_json(
            self.request(Method::PUT, &format!("/api/orders/{}/status", order_id))
                .json(&TransitionRequest { status }),
        )
        .await
    }

    /// DELETE /api/orders/{id}
    pub async fn delete_order(&self, order_id: i64) -> ClientResult<()> {
        Self::send_empty(self.request(Method::DELETE, &format!("/api/orders/{}", order_id))).await
    }

    /// GET /api/orders/{id}/queue
    pub async fn queue_position(&self, order_id: i64) -> ClientResult<QueuePosition> {
        Self::send_json(self.request(Method::GET, &format!("/api/orders/{}/queue", order_id)))
            .await
    }

    // ========== Projections ==========

    pub async fn status_counts(&self) -> ClientResult<Vec<StatusCount>> {
        Self::send_json(self.request(Method::GET, "/api/projections/status-counts")).await
    }

    pub async fn table_activity(&self) -> ClientResult<Vec<TableActivity>> {
        Self::send_json(self.request(Method::GET, "/api/projections/tables")).await
    }

    pub async fn queue_length(&self) -> ClientResult<QueueLength> {
        Self::send_json(self.request(Method::GET, "/api/projections/queue")).await
    }

    pub async fn series(&self, query: &SeriesQuery) -> ClientResult<Vec<SeriesPoint>> {
        Self::send_json(
            self.request(Method::GET, "/api/projections/series")
                .query(query),
        )
        .await
    }

    // ========== Routing ==========

    pub async fn waiter_tables(&self, waiter_id: i64) -> ClientResult<BTreeSet<i64>> {
        Self::send_json(self.request(Method::GET, &format!("/api/waiters/{}/tables", waiter_id)))
            .await
    }

    pub async fn table_waiters(&self, table_id: i64) -> ClientResult<BTreeSet<i64>> {
        Self::send_json(self.request(Method::GET, &format!("/api/tables/{}/waiters", table_id)))
            .await
    }

    pub async fn assign(&self, waiter_id: i64, table_id: i64) -> ClientResult<WaiterAssignment> {
        Self::send_json(self.request(
            Method::PUT,
            &format!("/api/waiters/{}/tables/{}", waiter_id, table_id),
        ))
        .await
    }

    pub async fn unassign(&self, waiter_id: i64, table_id: i64) -> ClientResult<()> {
        Self::send_empty(self.request(
            Method::DELETE,
            &format!("/api/waiters/{}/tables/{}", waiter_id, table_id),
        ))
        .await
    }

    // ========== Call waiter ==========

    pub async fn call_waiter(&self, table_id: i64) -> ClientResult<()> {
        Self::send_empty(
            self.request(Method::POST, "/api/calls")
                .json(&CallRequest { table_id }),
        )
        .await
    }

    pub async fn accept_call(&self, table_id: i64) -> ClientResult<()> {
        Self::send_empty(self.request(Method::POST, &format!("/api/calls/{}/accept", table_id)))
            .await
    }

    pub async fn clear_call(&self, table_id: i64) -> ClientResult<()> {
        Self::send_empty(self.request(Method::POST, &format!("/api/calls/{}/clear", table_id)))
            .await
    }

    // ========== Menu ==========

    pub async fn update_menu_item(
        &self,
        item_id: i64,
        update: &MenuItemUpdate,
    ) -> ClientResult<MenuItem> {
        Self::send_json(
            self.request(Method::PATCH, &format!("/api/menu/items/{}", item_id))
                .json(update),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_query_params() {
        let query = OrderQuery {
            statuses: vec![OrderStatus::Placed, OrderStatus::Preparing],
            table_id: Some(4),
            limit: Some(20),
        };
        assert_eq!(
            query.to_params(),
            vec![
                ("status", "PLACED,PREPARING".to_string()),
                ("tableId", "4".to_string()),
                ("limit", "20".to_string()),
            ]
        );
        assert!(OrderQuery::default().to_params().is_empty());
        assert_eq!(OrderQuery::queued().statuses, OrderStatus::QUEUED.to_vec());
    }

    #[test]
    fn test_url_strips_trailing_slash() {
        let client = HttpClient::new(&ClientConfig::new("http://edge.local:9625/")).unwrap();
        assert_eq!(client.url("/api/orders"), "http://edge.local:9625/api/orders");
        assert_eq!(client.token(), None);
        assert_eq!(client.with_token("t").token(), Some("t"));
    }
}
