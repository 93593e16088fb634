// Library exports for orkut-server
// The admin CLI and the integration tests build on these modules

pub mod api;
pub mod app;
pub mod avatar;
pub mod config;
pub mod db;
pub mod password;
pub mod rate_limit;
pub mod session;
pub mod state;
pub mod validation;
