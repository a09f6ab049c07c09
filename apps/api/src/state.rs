use gatehouse_application::{AuthEventService, LoginService};
use sqlx::PgPool;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub login_service: LoginService,
    pub auth_event_service: AuthEventService,
    pub postgres_pool: PgPool,
    pub redis_client: Option<redis::Client>,
    pub redis_required: bool,
    pub frontend_url: String,
    pub trust_forwarded_for: bool,
}
