pub mod auth;
pub mod routes;
pub mod state;

pub use auth::{Authenticated, TokenSigner};
pub use routes::build_router;
pub use state::AppState;
