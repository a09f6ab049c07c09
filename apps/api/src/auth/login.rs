use axum::Json;
use axum::extract::State;
use gatehouse_application::{LoginAttempt, LoginOutcome};
use gatehouse_core::{AppError, UserIdentity};
use gatehouse_domain::{FailureStanding, lockout_notice};
use tower_sessions::Session;

use crate::dto::{AuthLoginRequest, AuthLoginResponse};
use crate::error::ApiResult;
use crate::state::AppState;

use super::request_context::RequestContext;
use super::{SESSION_CREATED_AT_KEY, SESSION_USER_KEY};

const GENERIC_LOGIN_FAILURE: &str = "invalid email or password";

/// POST /auth/login - Authenticate with email+password.
pub async fn login_handler(
    State(state): State<AppState>,
    context: RequestContext,
    session: Session,
    Json(payload): Json<AuthLoginRequest>,
) -> ApiResult<Json<AuthLoginResponse>> {
    let outcome = state
        .login_service
        .login(LoginAttempt {
            email: payload.email,
            password: payload.password,
            origin: context.origin,
            user_agent: context.user_agent,
        })
        .await?;

    match outcome {
        LoginOutcome::Authenticated {
            user,
            attempts_remaining,
        } => {
            let identity = UserIdentity::new(user.id.to_string(), user.email);

            // OWASP Session Management: regenerate session ID on privilege change.
            session.cycle_id().await.map_err(|error| {
                AppError::Internal(format!("failed to cycle session id: {error}"))
            })?;

            session
                .insert(SESSION_USER_KEY, &identity)
                .await
                .map_err(|error| {
                    AppError::Internal(format!("failed to persist session identity: {error}"))
                })?;

            session
                .insert(SESSION_CREATED_AT_KEY, chrono::Utc::now().timestamp())
                .await
                .map_err(|error| {
                    AppError::Internal(format!("failed to persist session creation time: {error}"))
                })?;

            Ok(Json(AuthLoginResponse {
                status: "authenticated".to_owned(),
                attempts_remaining,
            }))
        }
        LoginOutcome::Failed { standing } => {
            Err(AppError::Unauthorized(failure_message(&standing)).into())
        }
        LoginOutcome::Blocked { window_minutes } => {
            Err(AppError::RateLimited(lockout_notice(window_minutes)).into())
        }
    }
}

fn failure_message(standing: &FailureStanding) -> String {
    match standing.notice() {
        Some(notice) => format!("{GENERIC_LOGIN_FAILURE}; {notice}"),
        None => GENERIC_LOGIN_FAILURE.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use gatehouse_domain::FailureStanding;

    use super::failure_message;

    #[test]
    fn normal_failures_stay_generic() {
        assert_eq!(
            failure_message(&FailureStanding::Normal),
            "invalid email or password"
        );
    }

    #[test]
    fn warning_and_lockout_are_appended() {
        let warning = failure_message(&FailureStanding::Warning { remaining: 1 });
        assert!(warning.starts_with("invalid email or password; 1 login attempt"));

        let locked = failure_message(&FailureStanding::Locked { window_minutes: 15 });
        assert!(locked.contains("15 minute window"));
    }
}
