use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::HeaderMap;
use axum::http::request::Parts;

use crate::state::AppState;

/// Origin used when neither a trusted header nor a peer address is available.
const UNKNOWN_ORIGIN: &str = "unknown";

/// Caller network origin and user agent for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub origin: String,
    pub user_agent: Option<String>,
}

impl FromRequestParts<AppState> for RequestContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(address)| address.ip());

        Ok(extract_request_context(
            &parts.headers,
            peer,
            state.trust_forwarded_for,
        ))
    }
}

pub(super) fn extract_request_context(
    headers: &HeaderMap,
    peer: Option<IpAddr>,
    trust_forwarded_for: bool,
) -> RequestContext {
    let forwarded_for = trust_forwarded_for
        .then(|| nearest_forwarded_hop(headers))
        .flatten();

    let origin = forwarded_for
        .or(peer)
        .map(|address| address.to_string())
        .unwrap_or_else(|| UNKNOWN_ORIGIN.to_owned());

    let user_agent = headers
        .get("user-agent")
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned);

    RequestContext { origin, user_agent }
}

/// Right-most `X-Forwarded-For` entry, the one appended by the trusted proxy.
/// Earlier entries are client-controlled and never key a counter.
fn nearest_forwarded_hop(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.rsplit(',').next())
        .and_then(|hop| hop.trim().parse::<IpAddr>().ok())
}
