pub mod api_docs;
pub mod auth;
pub mod config;
pub mod error;
pub mod provision;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use provision::ProvisionLauncher;
pub use routes::create_app;
pub use state::AppState;
