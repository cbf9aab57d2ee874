//! Per-client request ceiling for the `/api` routes.

use std::collections::{HashMap, VecDeque};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use parking_lot::Mutex;
use tracing::debug;

use super::error::ApiError;
use super::state::AppState;
use crate::clock::Clock;

/// Sweep idle clients once the table grows past this.
const SWEEP_THRESHOLD: usize = 4096;

/// Outcome of one admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed { remaining: u32 },
    Limited,
}

/// Sliding-window log: at most `max` requests per client in any `window_ms`.
pub struct RateLimiter {
    max: u32,
    window_ms: i64,
    clients: Mutex<HashMap<IpAddr, VecDeque<i64>>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(max: u32, window_ms: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            max,
            window_ms,
            clients: Mutex::new(HashMap::new()),
            clock,
        }
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    /// Count a request from `client` if it fits in the window.
    pub fn check(&self, client: IpAddr) -> Admission {
        let now = self.clock.now_millis();
        let cutoff = now - self.window_ms;
        let mut clients = self.clients.lock();

        if clients.len() > SWEEP_THRESHOLD {
            clients.retain(|_, log| log.back().is_some_and(|&t| t > cutoff));
        }

        let log = clients.entry(client).or_default();
        while log.front().is_some_and(|&t| t <= cutoff) {
            log.pop_front();
        }

        let used = u32::try_from(log.len()).unwrap_or(u32::MAX);
        if used >= self.max {
            return Admission::Limited;
        }
        log.push_back(now);
        Admission::Allowed {
            remaining: self.max - used - 1,
        }
    }
}

/// Socket peer if known, else the first `X-Forwarded-For` hop.
fn client_ip(connect_info: Option<&ConnectInfo<SocketAddr>>, headers: &HeaderMap) -> IpAddr {
    if let Some(ConnectInfo(addr)) = connect_info {
        return addr.ip();
    }
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|ip| ip.trim().parse().ok())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// Middleware rejecting clients over their budget with 429.
pub async fn enforce(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let ip = client_ip(
        request.extensions().get::<ConnectInfo<SocketAddr>>(),
        request.headers(),
    );

    match state.limiter.check(ip) {
        Admission::Limited => {
            debug!(target: "server::rate_limit", %ip, "Rejected over-limit request");
            ApiError::RateLimited.into_response()
        }
        Admission::Allowed { remaining } => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert("x-ratelimit-limit", HeaderValue::from(state.limiter.max()));
            headers.insert("x-ratelimit-remaining", HeaderValue::from(remaining));
            response
        }
    }
}
