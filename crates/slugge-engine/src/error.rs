use slugge_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("project not found: {0}")]
    ProjectNotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
