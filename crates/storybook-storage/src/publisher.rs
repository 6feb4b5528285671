//! Publishes still images and returns their public URL.

use storybook_models::StillImage;
use tracing::{info, instrument};

use crate::client::CosClient;
use crate::credentials::CredentialBroker;
use crate::error::StorageResult;
use crate::key::{generate_key, public_url, region_host, DEFAULT_KEY_PREFIX};

/// Publisher settings.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Key prefix for uploaded stills
    pub key_prefix: String,
    /// Public host override; defaults to `cos.{region}.myqcloud.com`
    pub region_host: Option<String>,
    /// Upload endpoint override (path-style)
    pub endpoint_url: Option<String>,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            region_host: None,
            endpoint_url: None,
        }
    }
}

impl PublisherConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            key_prefix: std::env::var("STORAGE_KEY_PREFIX")
                .unwrap_or_else(|_| DEFAULT_KEY_PREFIX.to_string()),
            region_host: std::env::var("STORAGE_REGION_HOST").ok(),
            endpoint_url: std::env::var("STORAGE_ENDPOINT_URL").ok(),
        }
    }
}

/// Credentials → upload → URL.
#[derive(Clone)]
pub struct CosPublisher {
    broker: CredentialBroker,
    config: PublisherConfig,
}

impl CosPublisher {
    pub fn new(broker: CredentialBroker, config: PublisherConfig) -> Self {
        Self { broker, config }
    }

    /// Create from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self::new(CredentialBroker::from_env()?, PublisherConfig::from_env()))
    }

    /// Upload one still image and return its public URL. The image is consumed.
    #[instrument(skip(self, image), fields(size = image.data.len()))]
    pub async fn publish(&self, image: StillImage) -> StorageResult<String> {
        let credentials = self.broker.fetch().await?;

        let key = generate_key(&self.config.key_prefix, image.extension());
        let client = CosClient::from_credentials(&credentials, self.config.endpoint_url.as_deref());
        client.upload_bytes(image.data, &key, &image.mime_type).await?;

        let host = region_host(&credentials.region, self.config.region_host.as_deref());
        let url = public_url(&credentials.bucket, &host, &key);
        info!(url = %url, "Published still image");
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::BrokerConfig;
    use crate::error::StorageError;
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn far_future() -> i64 {
        chrono::Utc::now().timestamp() + 3600
    }

    async fn mount_broker(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/sts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 200,
                "data": {
                    "tmpId": "AKIDTEMP",
                    "tmpSecret": "secret",
                    "sessionToken": "token",
                    "startTime": 0,
                    "expiredTime": far_future(),
                    "bucket": "stories-1250000000",
                    "region": "ap-guangzhou"
                }
            })))
            .mount(server)
            .await;
    }

    fn publisher(server: &MockServer) -> CosPublisher {
        let broker = CredentialBroker::new(BrokerConfig::new(format!("{}/sts", server.uri()))).unwrap();
        CosPublisher::new(
            broker,
            PublisherConfig {
                endpoint_url: Some(server.uri()),
                ..PublisherConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn test_publish_uploads_and_returns_public_url() {
        let server = MockServer::start().await;
        mount_broker(&server).await;
        Mock::given(method("PUT"))
            .and(path_regex(r"^/stories-1250000000/storybook/subjects/\d{8}/\d+-[0-9a-f]{8}\.jpg$"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let url = publisher(&server)
            .publish(StillImage::jpeg(vec![0xff, 0xd8, 0xff]))
            .await
            .unwrap();

        assert!(url.starts_with(
            "https://stories-1250000000.cos.ap-guangzhou.myqcloud.com/storybook/subjects/"
        ));
        assert!(url.ends_with(".jpg"));
    }

    #[tokio::test]
    async fn test_publish_fails_when_broker_rejects() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "code": 403, "message": "denied" })),
            )
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = publisher(&server)
            .publish(StillImage::jpeg(vec![1, 2, 3]))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::BrokerRejected { code: 403, .. }));
    }
}
