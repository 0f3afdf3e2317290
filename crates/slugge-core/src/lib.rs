pub mod ids;
pub mod processing;
pub mod protocol;

pub use ids::{ClientId, DocumentId, ProjectId, SnapshotId};
pub use processing::{ProcessingStatus, Stage};
pub use protocol::{OutboundMessage, UserMessage, UserQuery};
