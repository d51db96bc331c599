use anyhow::Result;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::path::Path;
use tracing::info;

use crate::error::ReportError;

/// Fixed object key the report is published under; each run overwrites
/// the previous report.
pub const REPORT_OBJECT_KEY: &str = "/ec2/ec2-instance-details.csv";

pub struct UploadClient {
    client: Client,
}

impl UploadClient {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }

    /// Upload the report file to the bucket. Returns the S3 location on
    /// success; the caller removes the local file only after that.
    pub async fn upload_report(&self, bucket: &str, path: &Path) -> Result<String> {
        let body = ByteStream::from_path(path).await.map_err(|e| {
            ReportError::Upload(format!("Could not read {}: {}", path.display(), e))
        })?;

        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string();

        self.client
            .put_object()
            .bucket(bucket)
            .key(REPORT_OBJECT_KEY)
            .content_type(&content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| ReportError::Upload(DisplayErrorContext(&e).to_string()))?;

        let location = format!("s3://{}{}", bucket, REPORT_OBJECT_KEY);

        info!(
            bucket = %bucket,
            key = REPORT_OBJECT_KEY,
            content_type = %content_type,
            location = %location,
            "Report uploaded"
        );

        Ok(location)
    }
}
