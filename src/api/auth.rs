use axum::{
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{HeaderMap, request::Parts},
    middleware::Next,
    response::Response,
};
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use super::{ApiError, AppState};
use crate::domain::ClientInfo;
use crate::services::Account;

/// The authenticated caller, inserted into request extensions by
/// [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub account: Account,
    pub api_key: String,
}

/// Caller address and user agent as recorded against sessions.
pub struct Client(pub ClientInfo);

impl FromRequestParts<Arc<AppState>> for Client {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(client_info(
            &parts.headers,
            parts.extensions.get::<ConnectInfo<SocketAddr>>(),
            &state.config().server.trusted_proxy_ips,
        )))
    }
}

/// Resolves the presented API key (`X-Api-Key`, then `Authorization: Bearer`)
/// and refreshes the session. Anything that does not resolve is a 401.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let api_key = extract_api_key(&headers).ok_or(ApiError::Unauthenticated)?;

    let client = client_info(
        &headers,
        request.extensions().get::<ConnectInfo<SocketAddr>>(),
        &state.config().server.trusted_proxy_ips,
    );

    let account = state
        .accounts()
        .authenticate(&api_key, &client)
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    tracing::Span::current().record("user_id", account.id.value());
    request
        .extensions_mut()
        .insert(Authenticated { account, api_key });

    Ok(next.run(request).await)
}

fn extract_api_key(headers: &HeaderMap) -> Option<String> {
    if let Some(api_key) = headers.get("X-Api-Key")
        && let Ok(key_str) = api_key.to_str()
    {
        return Some(key_str.trim().to_string());
    }

    if let Some(auth_header) = headers.get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        return Some(token.trim().to_string());
    }

    None
}

/// `X-Forwarded-For` is honoured only when the socket peer is one of
/// `trusted_proxies`; otherwise the peer address itself is recorded.
fn client_info(
    headers: &HeaderMap,
    peer: Option<&ConnectInfo<SocketAddr>>,
    trusted_proxies: &[String],
) -> ClientInfo {
    let peer_ip = peer.map(|ConnectInfo(addr)| addr.ip());
    let from_trusted_proxy = peer_ip.is_some_and(|ip| {
        trusted_proxies
            .iter()
            .any(|proxy| proxy.parse::<IpAddr>().is_ok_and(|proxy| proxy == ip))
    });

    let forwarded = if from_trusted_proxy {
        headers
            .get("X-Forwarded-For")
            .and_then(|h| h.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .map(str::to_string)
    } else {
        None
    };

    let ip_address = forwarded
        .or_else(|| peer_ip.map(|ip| ip.to_string()))
        .unwrap_or_else(|| "unknown".to_string());

    let user_agent = headers
        .get("user-agent")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    ClientInfo::new(ip_address, user_agent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn api_key_header_wins_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Bearer campus_bearer"));
        assert_eq!(extract_api_key(&headers).as_deref(), Some("campus_bearer"));

        headers.insert("X-Api-Key", HeaderValue::from_static("campus_header"));
        assert_eq!(extract_api_key(&headers).as_deref(), Some("campus_header"));
    }

    #[test]
    fn basic_auth_is_not_an_api_key() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Basic abc"));
        assert!(extract_api_key(&headers).is_none());
    }

    #[test]
    fn forwarded_address_only_trusted_from_configured_proxies() {
        let mut headers = HeaderMap::new();
        headers.insert("user-agent", HeaderValue::from_static("curl/8"));
        headers.insert("X-Forwarded-For", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));

        let proxy = ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000)));
        let trusted = vec!["127.0.0.1".to_string()];

        let info = client_info(&headers, Some(&proxy), &trusted);
        assert_eq!(info.ip_address, "203.0.113.7");
        assert_eq!(info.user_agent, "curl/8");

        let info = client_info(&headers, Some(&proxy), &[]);
        assert_eq!(info.ip_address, "127.0.0.1");

        let stranger = ConnectInfo(SocketAddr::from(([198, 51, 100, 4], 5000)));
        let info = client_info(&headers, Some(&stranger), &trusted);
        assert_eq!(info.ip_address, "198.51.100.4");

        assert_eq!(client_info(&headers, None, &trusted).ip_address, "unknown");
    }

    #[test]
    fn peer_address_used_without_forwarding() {
        let peer = ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000)));
        let info = client_info(&HeaderMap::new(), Some(&peer), &[]);
        assert_eq!(info, ClientInfo::new("127.0.0.1", "unknown"));

        assert_eq!(client_info(&HeaderMap::new(), None, &[]), ClientInfo::default());
    }
}
