//! COS client over the S3-compatible API.

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::credentials::StsCredentials;
use crate::error::{StorageError, StorageResult};
use crate::key::region_host;

/// Storage client bound to one bucket and one set of temporary credentials.
#[derive(Clone)]
pub struct CosClient {
    client: Client,
    bucket: String,
}

impl CosClient {
    /// Build a client from broker credentials.
    ///
    /// `endpoint_url` overrides the regional endpoint and switches to
    /// path-style addressing (used for local S3 emulators).
    pub fn from_credentials(credentials: &StsCredentials, endpoint_url: Option<&str>) -> Self {
        let provider = Credentials::new(
            &credentials.tmp_id,
            &credentials.tmp_secret,
            Some(credentials.session_token.clone()),
            Some(credentials.expires_at()),
            "cos-sts",
        );

        let (endpoint, path_style) = match endpoint_url {
            Some(url) => (url.trim_end_matches('/').to_string(), true),
            None => (format!("https://{}", region_host(&credentials.region, None)), false),
        };

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(endpoint)
            .region(Region::new(credentials.region.clone()))
            .credentials_provider(provider)
            .force_path_style(path_style)
            .build();

        Self {
            client: Client::from_conf(sdk_config),
            bucket: credentials.bucket.clone(),
        }
    }

    /// Upload bytes under `key`.
    pub async fn upload_bytes(
        &self,
        data: Vec<u8>,
        key: &str,
        content_type: &str,
    ) -> StorageResult<()> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey("empty key".to_string()));
        }
        let size = data.len();
        debug!(bucket = %self.bucket, key, size, "Uploading object");

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(format!("{:?}", e)))?;

        info!(bucket = %self.bucket, key, size, "Uploaded object");
        Ok(())
    }
}
