pub mod engine;
pub mod events;
pub mod in_memory;
pub mod queue;
pub mod store;
pub mod types;

pub use engine::JobWorker;
pub use events::{EventPublisher, JobEvent, JobEventData, JobEventType, LoggingEventPublisher, Stage};
pub use in_memory::InMemoryJobStore;
pub use queue::InMemoryJobQueue;
pub use store::{JobStore, JobStoreError};
pub use types::{AsyncJob, JobId, JobStatus};
