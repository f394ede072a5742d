//! Axum middleware for the AULA gateway.

pub mod gate;

pub use gate::{
    authorization_gate, verified_context, GateState, VerifiedContext, VerifiedOrg,
    DEFAULT_EXEMPT_PATHS,
};
