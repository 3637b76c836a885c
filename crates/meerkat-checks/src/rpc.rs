//! # Remote Check-Service Client
//!
//! Thin wrapper around [`reqwest::Client`] shared by all check adapters.
//! Every call carries an independent timeout, a bounded retry budget with
//! exponential backoff, and a per-service concurrency cap so one request
//! cannot saturate outbound connections to a single remote check service.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Semaphore;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const RETRY_BACKOFFS: &[Duration] = &[Duration::from_millis(200), Duration::from_millis(400)];
const MAX_CONCURRENT_PER_SERVICE: usize = 8;

/// A remote call failed after exhausting its retry budget. Callers treat
/// this uniformly as "fall back to the heuristic" — the distinction between
/// transport error and non-OK status does not matter past this point.
#[derive(Debug)]
pub struct RpcUnavailable(pub String);

impl std::fmt::Display for RpcUnavailable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "remote check service unavailable: {}", self.0)
    }
}

impl std::error::Error for RpcUnavailable {}

#[derive(Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    semaphore: Arc<Semaphore>,
    timeout: Duration,
}

impl RpcClient {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            semaphore: Arc::new(Semaphore::new(MAX_CONCURRENT_PER_SERVICE)),
            timeout,
        }
    }

    /// POST `body` as JSON to `url` and decode the JSON response, retrying
    /// transport and non-2xx failures per the backoff schedule. Bounds
    /// concurrency to this service via an internal semaphore permit.
    pub async fn post_json<Req, Res>(&self, url: &str, body: &Req) -> Result<Res, RpcUnavailable>
    where
        Req: Serialize + Sync,
        Res: DeserializeOwned,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| RpcUnavailable(e.to_string()))?;

        let mut last_err = String::new();
        let attempts = RETRY_BACKOFFS.len() + 1;
        for attempt in 0..attempts {
            match self.try_once(url, body).await {
                Ok(res) => return Ok(res),
                Err(e) => last_err = e,
            }
            if let Some(backoff) = RETRY_BACKOFFS.get(attempt) {
                tokio::time::sleep(*backoff).await;
            }
        }
        Err(RpcUnavailable(last_err))
    }

    async fn try_once<Req, Res>(&self, url: &str, body: &Req) -> Result<Res, String>
    where
        Req: Serialize + Sync,
        Res: DeserializeOwned,
    {
        let send = self.http.post(url).json(body).send();
        let response = tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| "request timed out".to_string())?
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("non-OK status: {}", response.status()));
        }

        response.json::<Res>().await.map_err(|e| e.to_string())
    }
}

impl Default for RpcClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_display_names_the_cause() {
        let err = RpcUnavailable("connection refused".to_string());
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn post_json_falls_back_on_unreachable_host() {
        let client = RpcClient::with_timeout(Duration::from_millis(200));
        let result: Result<serde_json::Value, _> = client
            .post_json("http://127.0.0.1:1/predict", &serde_json::json!({}))
            .await;
        assert!(result.is_err());
    }
}
