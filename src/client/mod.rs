use reqwest::header::HeaderMap;
use reqwest::{Client, Response};
use serde_json::Value;
use std::time::Duration;

use crate::config::Endpoints;
use crate::domain::{Activity, OrderBook, Position, TickSizeResponse};
use crate::execution::errors::EngineError;
use crate::rounding::TickSize;

/// Thin REST client for the CLOB and data endpoint families. Owns no
/// credentials — auth headers are computed by the caller and passed in.
#[derive(Clone)]
pub struct ClobHttp {
    client: Client,
    endpoints: Endpoints,
}

impl ClobHttp {
    pub fn new(endpoints: Endpoints) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("HTTP client");

        Self { client, endpoints }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    // ==================================================
    // MARKET DATA
    // ==================================================

    pub async fn get_order_book(&self, token_id: &str) -> Result<OrderBook, EngineError> {
        let url = format!("{}/book?token_id={}", self.endpoints.clob_url, token_id);
        let resp = self.client.get(&url).send().await?;
        let resp = check(resp).await?;
        Ok(resp.json::<OrderBook>().await?)
    }

    pub async fn get_tick_size(&self, token_id: &str) -> Result<TickSize, EngineError> {
        let url = format!("{}/tick-size?token_id={}", self.endpoints.clob_url, token_id);
        let resp = self.client.get(&url).send().await?;
        let resp = check(resp).await?;
        let parsed = resp.json::<TickSizeResponse>().await?;
        TickSize::try_from(parsed.minimum_tick_size)
    }

    // ==================================================
    // DATA API
    // ==================================================

    pub async fn get_positions(
        &self,
        user: &str,
        limit: u32,
    ) -> Result<Vec<Position>, EngineError> {
        let url = format!(
            "{}/positions?limit={}&user={}",
            self.endpoints.data_api_url, limit, user
        );
        let resp = self.client.get(&url).send().await?;
        let resp = check(resp).await?;
        Ok(resp.json::<Vec<Position>>().await?)
    }

    pub async fn get_activity(
        &self,
        user: &str,
        limit: u32,
    ) -> Result<Vec<Activity>, EngineError> {
        let url = format!(
            "{}/activity?limit={}&user={}",
            self.endpoints.data_api_url, limit, user
        );
        let resp = self.client.get(&url).send().await?;
        let resp = check(resp).await?;
        Ok(resp.json::<Vec<Activity>>().await?)
    }

    // ==================================================
    // AUTH ENDPOINTS (L1 headers supplied by AuthManager)
    // ==================================================

    /// POST /auth/api-key. Status handling (the 400 → derive fallback)
    /// belongs to the caller.
    pub async fn post_create_api_key(&self, headers: HeaderMap) -> Result<Response, EngineError> {
        let url = format!("{}/auth/api-key", self.endpoints.clob_url);
        Ok(self
            .client
            .post(&url)
            .headers(headers)
            .body("")
            .send()
            .await?)
    }

    pub async fn get_derive_api_key(&self, headers: HeaderMap) -> Result<Response, EngineError> {
        let url = format!("{}/auth/derive-api-key", self.endpoints.clob_url);
        Ok(self.client.get(&url).headers(headers).send().await?)
    }

    // ==================================================
    // ORDER ENDPOINTS (L2 headers supplied by AuthManager)
    // ==================================================

    /// The body must be the exact string the L2 signature was computed over.
    pub async fn post_order(
        &self,
        body: String,
        headers: HeaderMap,
    ) -> Result<Value, EngineError> {
        let url = format!("{}/order", self.endpoints.clob_url);
        let resp = self
            .client
            .post(&url)
            .headers(headers)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await?;
        let resp = check(resp).await?;
        Ok(resp.json::<Value>().await?)
    }

    pub async fn delete_order(
        &self,
        body: String,
        headers: HeaderMap,
    ) -> Result<Value, EngineError> {
        let url = format!("{}/order", self.endpoints.clob_url);
        let resp = self
            .client
            .delete(&url)
            .headers(headers)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await?;
        let resp = check(resp).await?;
        Ok(resp.json::<Value>().await?)
    }
}

/// Non-success statuses surface as Api errors with the response body.
async fn check(resp: Response) -> Result<Response, EngineError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(EngineError::Api {
        status: status.as_u16(),
        body,
    })
}
