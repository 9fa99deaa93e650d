pub mod catalog;
pub mod config;
pub mod executor;
pub mod logging;
pub mod manager;
pub mod models;
pub mod queue;
pub mod server;

/// Convenient type alias exposing common structs.
pub mod prelude {
    pub use crate::catalog::CatalogClient;
    pub use crate::config::ServerConfig;
    pub use crate::executor::{ExecutorError, ExecutorOutput, JobExecutor, SpotdlExecutor};
    pub use crate::manager::{DownloadManager, ManagerError};
    pub use crate::models::{Category, DownloadRequest, Job, QueueStatus, TrackDescriptor};
    pub use crate::queue::{DownloadQueue, JobHandle};
}
