use async_trait::async_trait;
use aws_config::Region;
use aws_config::{meta::region::RegionProviderChain, BehaviorVersion};
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

use super::{MediaError, MediaStore};
use crate::config::MediaConfig;

pub struct S3MediaStore {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl S3MediaStore {
    pub async fn connect(config: &MediaConfig) -> Self {
        let region_provider = RegionProviderChain::first_try(Region::new(config.region.clone()));

        let mut loader = aws_config::defaults(BehaviorVersion::v2025_01_17()).region(region_provider);
        if let Some((access_key, secret_key)) = &config.credentials {
            let credentials =
                Credentials::new(access_key, secret_key, None, None, "from-env");
            loader = loader.credentials_provider(credentials);
        }
        let sdk_config = loader.load().await;

        let public_base_url = config.public_base_url.clone().unwrap_or_else(|| {
            format!(
                "https://{}.s3.{}.amazonaws.com",
                config.bucket, config.region
            )
        });

        Self {
            client: Client::new(&sdk_config),
            bucket: config.bucket.clone(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl MediaStore for S3MediaStore {
    #[tracing::instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, MediaError> {
        tracing::info!(bucket = %self.bucket, key, "uploading to s3");

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| MediaError::Upload(e.to_string()))?;

        Ok(format!("{}/{}", self.public_base_url, key))
    }
}
