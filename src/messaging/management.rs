//! # Broker Management Client
//!
//! Read-only client for the broker's HTTP management interface. Exchange and
//! queue listings come from `GET /api/exchanges` and `GET /api/queues` with
//! basic-auth credentials; any non-success response is a query failure, never
//! silently treated as an empty topology.

use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::config::BrokerSettings;

use super::broker::{ExchangeInfo, QueueInfo};
use super::errors::{BrokerError, BrokerResult};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the broker management API
#[derive(Debug, Clone)]
pub struct ManagementClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl ManagementClient {
    /// Build a client from broker settings
    pub fn new(settings: &BrokerSettings) -> BrokerResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                BrokerError::unavailable(format!("Management HTTP client build failed: {e}"))
            })?;

        Ok(Self {
            http,
            base_url: settings.management_url.trim_end_matches('/').to_string(),
            username: settings.management_username.clone(),
            password: settings.management_password.clone(),
        })
    }

    /// List all exchanges known to the broker
    pub async fn list_exchanges(&self) -> BrokerResult<Vec<ExchangeInfo>> {
        self.get_json("/api/exchanges").await
    }

    /// List all queues known to the broker
    pub async fn list_queues(&self) -> BrokerResult<Vec<QueueInfo>> {
        self.get_json("/api/queues").await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> BrokerResult<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "Querying broker management API");

        let response = self
            .http
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BrokerError::timeout(path, REQUEST_TIMEOUT.as_millis() as u64)
                } else {
                    BrokerError::unavailable(format!("Management request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BrokerError::query(path, status.as_u16(), body));
        }

        response.json::<T>().await.map_err(|e| {
            BrokerError::query(path, status.as_u16(), format!("Invalid response body: {e}"))
        })
    }
}
