//! Short-lived upload credentials from the STS broker.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};

/// Envelope code the broker uses for success.
const BROKER_OK: i64 = 200;

/// Configuration for the credential broker.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Broker endpoint returning temporary credentials
    pub url: String,
    /// Request timeout
    pub timeout: Duration,
}

impl BrokerConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            url: std::env::var("STS_BROKER_URL")
                .map_err(|_| StorageError::config_error("STS_BROKER_URL not set"))?,
            timeout: Duration::from_secs(
                std::env::var("STS_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
        })
    }
}

/// Temporary credentials scoped to one bucket.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StsCredentials {
    pub tmp_id: String,
    pub tmp_secret: String,
    pub session_token: String,
    #[serde(default)]
    pub start_time: i64,
    pub expired_time: i64,
    pub bucket: String,
    pub region: String,
}

impl StsCredentials {
    /// Expiry as a system time.
    pub fn expires_at(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(self.expired_time.max(0) as u64)
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at() <= SystemTime::now()
    }
}

impl std::fmt::Debug for StsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StsCredentials")
            .field("tmp_id", &self.tmp_id)
            .field("tmp_secret", &"***")
            .field("session_token", &"***")
            .field("expired_time", &self.expired_time)
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .finish()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BrokerResponse {
    Enveloped {
        code: i64,
        #[serde(default, alias = "msg")]
        message: Option<String>,
        #[serde(default)]
        data: Option<StsCredentials>,
    },
    Bare(StsCredentials),
}

/// Client for the credential broker.
#[derive(Clone)]
pub struct CredentialBroker {
    http: Client,
    config: BrokerConfig,
}

impl CredentialBroker {
    pub fn new(config: BrokerConfig) -> StorageResult<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Self::new(BrokerConfig::from_env()?)
    }

    /// Fetch a fresh set of temporary credentials.
    pub async fn fetch(&self) -> StorageResult<StsCredentials> {
        debug!(url = %self.config.url, "Requesting temporary credentials");

        let response = self
            .http
            .get(&self.config.url)
            .send()
            .await
            .map_err(|e| StorageError::credentials_failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::credentials_failed(format!(
                "broker returned {}: {}",
                status, body
            )));
        }

        let body = response.text().await?;
        let credentials = parse_broker_response(&body)?;

        info!(
            bucket = %credentials.bucket,
            region = %credentials.region,
            expired_time = credentials.expired_time,
            "Obtained temporary credentials"
        );
        Ok(credentials)
    }
}

/// Accepts both the `{code, data}` envelope and a bare credential object.
pub(crate) fn parse_broker_response(body: &str) -> StorageResult<StsCredentials> {
    match serde_json::from_str::<BrokerResponse>(body) {
        Ok(BrokerResponse::Enveloped { code, message, data }) => {
            if code != BROKER_OK {
                return Err(StorageError::BrokerRejected {
                    code,
                    message: message.unwrap_or_else(|| "no message".to_string()),
                });
            }
            data.ok_or_else(|| StorageError::credentials_failed("broker envelope has no data"))
        }
        Ok(BrokerResponse::Bare(credentials)) => Ok(credentials),
        Err(e) => Err(StorageError::credentials_failed(format!(
            "unrecognized broker response: {}",
            e
        ))),
    }
}
