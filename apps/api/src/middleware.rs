use axum::extract::{Request, State};
use axum::http::{HeaderValue, Method, header};
use axum::middleware::Next;
use axum::response::Response;
use gatehouse_core::{AppError, UserIdentity};
use tower_sessions::Session;

use crate::auth::SESSION_USER_KEY;
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn require_auth(
    session: Session,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let identity = session
        .get::<UserIdentity>(SESSION_USER_KEY)
        .await
        .map_err(|error| AppError::Internal(format!("failed to read session identity: {error}")))?
        .ok_or_else(|| AppError::Unauthorized("authentication required".to_owned()))?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

pub async fn require_same_origin_for_mutations(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    if is_state_changing_method(request.method()) {
        let headers = request.headers();

        if headers
            .get("sec-fetch-site")
            .is_some_and(|fetch_site| fetch_site == HeaderValue::from_static("cross-site"))
        {
            return Err(AppError::Forbidden("cross-site request blocked".to_owned()).into());
        }

        let origin = headers
            .get(header::ORIGIN)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        let referer = headers
            .get(header::REFERER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();

        if !is_allowed_origin(&state.frontend_url, origin, referer) {
            return Err(AppError::Forbidden("origin validation failed".to_owned()).into());
        }
    }

    Ok(next.run(request).await)
}

fn is_state_changing_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

fn is_allowed_origin(frontend_url: &str, origin: &str, referer: &str) -> bool {
    let frontend_url = frontend_url.trim_end_matches('/');

    origin == frontend_url
        || referer == frontend_url
        || referer
            .strip_prefix(frontend_url)
            .is_some_and(|rest| rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use axum::http::Method;

    use super::{is_allowed_origin, is_state_changing_method};

    #[test]
    fn only_mutations_are_checked() {
        assert!(is_state_changing_method(&Method::POST));
        assert!(is_state_changing_method(&Method::DELETE));
        assert!(!is_state_changing_method(&Method::GET));
        assert!(!is_state_changing_method(&Method::OPTIONS));
    }

    #[test]
    fn origin_or_referer_must_match_frontend() {
        let frontend = "http://localhost:3000";

        assert!(is_allowed_origin(frontend, "http://localhost:3000", ""));
        assert!(is_allowed_origin(frontend, "", "http://localhost:3000/login"));
        assert!(!is_allowed_origin(frontend, "http://evil.test", ""));
        assert!(!is_allowed_origin(frontend, "", ""));
    }

    #[test]
    fn referer_prefix_must_end_at_a_path_boundary() {
        assert!(!is_allowed_origin(
            "http://localhost:3000",
            "",
            "http://localhost:30001/login"
        ));
    }
}
