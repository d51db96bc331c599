use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Instance inventory fetch failed: {0}")]
    Inventory(String),

    #[error("Report write failed: {0}")]
    Report(String),

    #[error("S3 upload failed: {0}")]
    Upload(String),
}
