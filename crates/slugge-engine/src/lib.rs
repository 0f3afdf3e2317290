pub mod assistant;
pub mod error;
pub mod processing;
pub mod retrieval;

pub use assistant::{AssistantConfig, AssistantService, SessionClosed};
pub use error::EngineError;
pub use processing::{start_eviction_task, ProcessingConfig, ProcessingTracker};
