use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("PDF rendering failed: {0}")]
    Pdf(String),

    #[error("failed to write report: {0}")]
    Store(#[from] beslist_store::StoreError),
}
