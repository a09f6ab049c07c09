mod auth;
mod common;

pub use auth::{AuthLoginRequest, AuthLoginResponse, UserIdentityResponse};
pub use common::{HealthDependencyStatus, HealthResponse};
