// Client library for the Orkut server: HTTP API access plus SmartSave,
// the local-first write queue
pub mod api;
pub mod config;
pub mod logging;
pub mod smart_save;
pub mod store;

pub use api::{ApiClient, ApiError, ApiResult};
pub use smart_save::{PendingOp, PendingWrite, SaveOutcome, SmartSave, SyncReport, SyncTransport};
pub use store::{LocalState, LocalStore};
