//! Client identity resolution for rate limiting.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::connect_info::ConnectInfo;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

/// Header carrying the original client address when a trusted proxy
/// fronts the service.
pub const FORWARDED_IP_HEADER: &str = "cf-connecting-ip";

/// Identity used when neither the forwarding header nor the peer
/// address is available. All such callers share one rate budget.
const UNKNOWN_IDENTITY: &str = "unknown";

/// Best-effort client identity: the forwarding header if present,
/// otherwise the TCP peer address, otherwise a shared sentinel.
///
/// This extractor never rejects a request; a caller we cannot identify
/// is still served, it just draws from the shared "unknown" budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get(FORWARDED_IP_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(ip) = forwarded {
            return Ok(ClientIp(ip.to_string()));
        }

        let identity = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| UNKNOWN_IDENTITY.to_string());
        Ok(ClientIp(identity))
    }
}
