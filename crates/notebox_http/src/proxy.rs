//! Single-upstream reverse proxy.
//!
//! # Responsibility
//! - Forward every method and path, query included, to one upstream.
//! - Inject `Host`, `X-Real-IP` and `X-Forwarded-For` on the way in.
//!
//! `Host` follows nginx `$host`: the client's host name, lowercased, with
//! any port removed.
//!
//! # Invariants
//! - No retries and no redirect following; upstream responses pass through.
//! - A dead upstream yields a gateway status within the configured timeouts.
//! - Hop-by-hop headers never cross the proxy in either direction.

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Uri},
    response::Response,
    Router,
};
use log::info;
use notebox_core::config::ProxyConfig;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::{DefaultMakeSpan, TraceLayer};
use tracing::Level;
use url::Url;

use crate::error::ProxyError;

/// Same default as nginx `client_max_body_size`.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

pub const X_REAL_IP: &str = "x-real-ip";
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

fn hop_by_hop() -> [HeaderName; 8] {
    [
        header::CONNECTION,
        HeaderName::from_static("keep-alive"),
        header::PROXY_AUTHENTICATE,
        header::PROXY_AUTHORIZATION,
        header::TE,
        header::TRAILER,
        header::TRANSFER_ENCODING,
        header::UPGRADE,
    ]
}

#[derive(Clone)]
pub struct ProxyState {
    client: reqwest::Client,
    upstream: Arc<Url>,
}

impl ProxyState {
    /// Builds the upstream client from proxy settings.
    pub fn new(config: &ProxyConfig) -> Result<Self, ProxyError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(config.connect_timeout())
            .timeout(config.timeout())
            .build()
            .map_err(|err| ProxyError::InvalidUpstream(err.to_string()))?;

        let upstream = config
            .upstream_url()
            .map_err(|err| ProxyError::InvalidUpstream(err.to_string()))?;

        Ok(Self {
            client,
            upstream: Arc::new(upstream),
        })
    }

    pub fn upstream(&self) -> &str {
        self.upstream.as_str()
    }

    /// Upstream URL for an incoming request target; path and query are kept
    /// as the client sent them.
    pub fn upstream_url_for(&self, uri: &Uri) -> Url {
        let mut url = Url::clone(&self.upstream);
        url.set_path(uri.path());
        url.set_query(uri.query());
        url
    }
}

/// Creates the proxy router. Every request goes to the fallback.
///
/// Serve it with `into_make_service_with_connect_info::<SocketAddr>()` so the
/// client address is known; without it `X-Real-IP` is omitted.
pub fn create_proxy_router(state: ProxyState) -> Router {
    Router::new()
        .fallback(forward)
        .layer(
            TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::new().level(Level::DEBUG)),
        )
        .with_state(state)
}

async fn forward(
    State(state): State<ProxyState>,
    request: Request,
) -> Result<Response, ProxyError> {
    let started_at = Instant::now();
    let client_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let (parts, body) = request.into_parts();

    if declared_length(&parts.headers).is_some_and(|len| len > MAX_BODY_BYTES) {
        return Err(ProxyError::BodyTooLarge {
            limit: MAX_BODY_BYTES,
        });
    }
    let body = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|_| ProxyError::BodyTooLarge {
            limit: MAX_BODY_BYTES,
        })?;

    let url = state.upstream_url_for(&parts.uri);

    let upstream_response = state
        .client
        .request(parts.method.clone(), url)
        .headers(upstream_request_headers(&parts.headers, client_ip))
        .body(body)
        .send()
        .await?;

    let status = upstream_response.status();
    let mut headers = upstream_response.headers().clone();
    strip_hop_by_hop(&mut headers);
    let bytes = upstream_response.bytes().await?;

    info!(
        "event=proxy_forward module=proxy status=ok method={} path={} upstream_status={} duration_ms={}",
        parts.method,
        parts.uri.path(),
        status.as_u16(),
        started_at.elapsed().as_millis()
    );

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}

/// Copies client headers for the upstream request.
///
/// `Host` keeps the client's host name without its port; when absent the
/// HTTP client fills in the upstream authority.
pub fn upstream_request_headers(incoming: &HeaderMap, client_ip: Option<IpAddr>) -> HeaderMap {
    let mut headers = incoming.clone();
    strip_hop_by_hop(&mut headers);
    headers.remove(header::CONTENT_LENGTH);

    let host = incoming
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .map(|value| host_without_port(value.trim()).to_ascii_lowercase());
    if let Some(value) = host.and_then(|host| HeaderValue::from_str(&host).ok()) {
        headers.insert(header::HOST, value);
    }

    if let Some(ip) = client_ip {
        let ip_text = ip.to_string();
        if let Ok(value) = HeaderValue::from_str(&ip_text) {
            headers.insert(HeaderName::from_static(X_REAL_IP), value);
        }

        let forwarded_for = match incoming
            .get(X_FORWARDED_FOR)
            .and_then(|value| value.to_str().ok())
        {
            Some(chain) if !chain.trim().is_empty() => format!("{chain}, {ip_text}"),
            _ => ip_text,
        };
        if let Ok(value) = HeaderValue::from_str(&forwarded_for) {
            headers.insert(HeaderName::from_static(X_FORWARDED_FOR), value);
        }
    }

    headers
}

fn host_without_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        return rest.find(']').map_or(host, |end| &host[..end + 2]);
    }
    host.rsplit_once(':').map_or(host, |(name, _)| name)
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Headers named in `Connection` are hop-by-hop too.
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed.into_iter().chain(hop_by_hop()) {
        headers.remove(&name);
    }
}

fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}
