pub mod app;
pub mod auth;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod state;

pub use app::build_app;
pub use state::AppState;
