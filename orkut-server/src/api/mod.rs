pub mod auth;
pub mod comments;
pub mod communities;
pub mod error;
pub mod extract;
pub mod friends;
pub mod messages;
pub mod posts;
pub mod profile;
pub mod scraps;
pub mod search;
pub mod upload;

pub use error::{ApiError, ApiResult};
