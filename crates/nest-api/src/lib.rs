pub mod auth;
pub mod convert;
pub mod drafts;
pub mod error;
pub mod extract;
pub mod interactions;
pub mod messages;
pub mod middleware;
pub mod posts;
pub mod profiles;
pub mod resolver;
pub mod routes;
pub mod search;
pub mod session;
pub mod state;
pub mod wallet;

pub use error::ApiError;
pub use routes::router;
pub use state::{AppState, AppStateInner};
