use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;

use crate::config::Config;
use crate::error::AppError;

/// S3-backed blob storage. Constructed once at startup from configuration and
/// cloned into handlers; the underlying client is cheaply cloneable.
#[derive(Clone)]
pub struct S3Blob {
    client: Client,
    pub bucket_name: String,
}

impl S3Blob {
    pub fn new(config: &Config) -> Self {
        let credentials = aws_sdk_s3::config::Credentials::new(
            config.aws_access_key_id.clone(),
            config.aws_secret_access_key.clone(),
            None,
            None,
            "manual_config",
        );

        let region = aws_sdk_s3::config::Region::new(config.aws_region.clone());

        let mut s3_config_builder = aws_sdk_s3::config::Builder::new()
            .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
            .region(region)
            .credentials_provider(credentials);

        if let Some(endpoint) = &config.s3_endpoint {
            s3_config_builder = s3_config_builder
                .endpoint_url(endpoint)
                .force_path_style(true);
        }

        let client = Client::from_conf(s3_config_builder.build());

        Self {
            client,
            bucket_name: config.s3_bucket_name.clone(),
        }
    }

    pub async fn put_object(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), AppError> {
        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("S3 upload error: {:?}", e);
                AppError::Storage(format!("Failed to upload object to S3: {}", e))
            })?;

        Ok(())
    }

    pub async fn get_object(&self, key: &str) -> Result<Vec<u8>, AppError> {
        let resp = self.client
            .get_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("S3 download error: {:?}", e);
                AppError::Storage(format!("Failed to download object from S3: {}", e))
            })?;

        let data = resp.body.collect().await.map_err(|e| {
            tracing::error!("S3 body error: {:?}", e);
            AppError::Storage("Failed to read S3 body".to_string())
        })?;

        Ok(data.into_bytes().to_vec())
    }

    pub async fn ensure_bucket_exists(&self) -> Result<(), AppError> {
        let resp = self.client.head_bucket().bucket(&self.bucket_name).send().await;

        match resp {
            Ok(_) => Ok(()),
            Err(_) => {
                // Bucket doesn't exist or no access, try to create it
                tracing::info!("Bucket {} does not exist, attempting to create...", self.bucket_name);
                self.client
                    .create_bucket()
                    .bucket(&self.bucket_name)
                    .send()
                    .await
                    .map_err(|e| {
                        tracing::error!("Failed to create bucket: {:?}", e);
                        AppError::Storage(format!("Failed to create S3 bucket: {}", e))
                    })?;
                Ok(())
            }
        }
    }

    pub async fn health(&self) -> Result<(), AppError> {
        self.client
            .head_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("S3 health check failed: {}", e)))?;
        Ok(())
    }
}
