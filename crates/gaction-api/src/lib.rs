//! HTTP host for the bridge: axum router, webhook handler, connector registry.
//!
//! Each configured bot is reachable at `/recast?botToken=<token>`; the token
//! selects the connector that runs the turn.

pub mod error;
pub mod handlers;
pub mod registry;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use registry::{ConnectorRegistry, ConnectorStore, FileConnectorStore, StaticConnectorStore};
pub use routes::create_router;
pub use state::AppState;
