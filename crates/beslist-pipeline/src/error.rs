use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("affiliate API error: {0}")]
    Client(#[from] beslist_client::ClientError),

    #[error("snapshot store error: {0}")]
    Store(#[from] beslist_store::StoreError),
}
