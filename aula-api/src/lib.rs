//! AULA API: gateway with a multi-tenant authorization gate.
//!
//! Every non-exempt request is authenticated, resolved to an
//! organization, and membership-checked before any handler runs. The
//! gate lives in [`middleware::gate`]; route handlers receive a
//! [`middleware::VerifiedContext`] and can trust its organization id.
//!
//! Cache access goes through `aula-cache`, which scopes every key to
//! the verified organization.

pub mod audit;
pub mod config;
pub mod error;
pub mod identity;
pub mod membership;
pub mod middleware;
pub mod org_resolver;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod token;

pub use config::{AuthConfig, GatewayConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use middleware::{GateState, VerifiedContext, VerifiedOrg};
pub use state::AppState;
