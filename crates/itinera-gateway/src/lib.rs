//! HTTP gateway for the itinerary service.
//!
//! [`App::router`] builds the axum router over an [`AppState`]; the
//! `itinera-gateway` binary wires the state from command line flags.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod model;
pub mod state;

pub use app::App;
pub use auth::{AuthError, AuthUser, Claims, JwtAuthority};
pub use config::{Environment, GatewayConfig};
pub use error::ApiError;
pub use state::AppState;
