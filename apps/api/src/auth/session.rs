use axum::Json;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use gatehouse_application::{AuthEvent, AuthEventKind};
use gatehouse_core::{AppError, UserIdentity};
use tower_sessions::Session;

use crate::dto::UserIdentityResponse;
use crate::error::ApiResult;
use crate::state::AppState;

use super::SESSION_USER_KEY;
use super::request_context::RequestContext;

/// POST /auth/logout - End the current session.
pub async fn logout_handler(
    State(state): State<AppState>,
    context: RequestContext,
    session: Session,
) -> ApiResult<StatusCode> {
    let subject = session
        .get::<UserIdentity>(SESSION_USER_KEY)
        .await
        .map_err(|error| AppError::Internal(format!("failed to read session identity: {error}")))?
        .map(|identity| identity.subject().to_owned());

    session
        .delete()
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete session: {error}")))?;

    if subject.is_some() {
        state
            .auth_event_service
            .record_event_best_effort(AuthEvent {
                subject,
                kind: AuthEventKind::Logout,
                ip_address: Some(context.origin),
                user_agent: context.user_agent,
                attempt_count: None,
            })
            .await;
    }

    Ok(StatusCode::NO_CONTENT)
}

/// GET /auth/me - Identity stored in the current session.
pub async fn me_handler(
    Extension(identity): Extension<UserIdentity>,
) -> ApiResult<Json<UserIdentityResponse>> {
    Ok(Json(UserIdentityResponse::from(identity)))
}
