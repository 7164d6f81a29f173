//! Per-address request admission using a sliding window.
//!
//! Counters live behind the [`CounterStore`] trait so a multi-instance
//! deployment can swap in a shared store later without touching the
//! handlers. The bundled implementation keeps in-process counters keyed
//! by `(IpAddr, Tier)`; they do not survive a restart.

use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use serde_json::json;

use crate::config::RateLimitConfig;
use crate::state::AppState;

/// Admission tier. Auth endpoints get a much tighter budget to blunt
/// credential stuffing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Api,
    Auth,
}

/// Outcome of a successful admission check.
#[derive(Debug, Clone)]
pub struct Admission {
    pub remaining: u32,
    pub limit: u32,
}

/// Counter storage for the sliding window. `hit` consumes one slot for the
/// client and returns either the admission info or the seconds to wait.
pub trait CounterStore: Send + Sync {
    fn hit(&self, client: IpAddr, tier: Tier) -> Result<Admission, u64>;
}

#[derive(Debug, Clone)]
struct WindowEntry {
    tokens: u32,
    window_start: Instant,
    last_request: Instant,
}

impl WindowEntry {
    fn new(max_tokens: u32) -> Self {
        let now = Instant::now();
        Self {
            tokens: max_tokens,
            window_start: now,
            last_request: now,
        }
    }
}

/// In-process counter store. Tokens replenish gradually over the window so
/// a client that backs off regains budget before the hard reset.
pub struct InMemoryCounterStore {
    entries: DashMap<(IpAddr, Tier), WindowEntry>,
    config: RateLimitConfig,
    window: Duration,
}

impl InMemoryCounterStore {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            entries: DashMap::new(),
            window: Duration::from_secs(config.window_seconds),
            config,
        }
    }

    fn max_tokens(&self, tier: Tier) -> u32 {
        match tier {
            Tier::Api => self.config.api_max,
            Tier::Auth => self.config.auth_max,
        }
    }
}

impl CounterStore for InMemoryCounterStore {
    fn hit(&self, client: IpAddr, tier: Tier) -> Result<Admission, u64> {
        if !self.config.enabled {
            return Ok(Admission {
                remaining: u32::MAX,
                limit: u32::MAX,
            });
        }

        let max_tokens = self.max_tokens(tier);
        let now = Instant::now();
        let mut entry = self
            .entries
            .entry((client, tier))
            .or_insert_with(|| WindowEntry::new(max_tokens));

        let elapsed = now.duration_since(entry.window_start);
        if elapsed >= self.window {
            entry.tokens = max_tokens;
            entry.window_start = now;
        } else {
            let since_last = now.duration_since(entry.last_request);
            let rate = max_tokens as f64 / self.window.as_secs_f64();
            let replenished = (since_last.as_secs_f64() * rate) as u32;
            entry.tokens = (entry.tokens + replenished).min(max_tokens);
        }
        entry.last_request = now;

        if entry.tokens > 0 {
            entry.tokens -= 1;
            Ok(Admission {
                remaining: entry.tokens,
                limit: max_tokens,
            })
        } else {
            Err(self.window.saturating_sub(elapsed).as_secs().max(1))
        }
    }
}

fn client_ip(req: &Request) -> IpAddr {
    if let Some(forwarded) = req.headers().get("x-forwarded-for") {
        if let Ok(value) = forwarded.to_str() {
            if let Some(first) = value.split(',').next() {
                if let Ok(ip) = first.trim().parse::<IpAddr>() {
                    return ip;
                }
            }
        }
    }
    if let Some(real_ip) = req.headers().get("x-real-ip") {
        if let Ok(value) = real_ip.to_str() {
            if let Ok(ip) = value.trim().parse::<IpAddr>() {
                return ip;
            }
        }
    }
    // Un-proxied clients: the peer address recorded at accept time.
    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip();
    }
    IpAddr::from([127, 0, 0, 1])
}

/// Middleware for the general API tier (100 requests / 15 min by default).
pub async fn api_tier(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, Response> {
    admit(
        state,
        req,
        next,
        Tier::Api,
        "Too many requests from this IP, please try again later.",
    )
    .await
}

/// Middleware for signup/login (5 requests / 15 min by default).
pub async fn auth_tier(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, Response> {
    admit(
        state,
        req,
        next,
        Tier::Auth,
        "Too many authentication attempts, please try again later.",
    )
    .await
}

async fn admit(
    state: AppState,
    req: Request,
    next: Next,
    tier: Tier,
    message: &'static str,
) -> Result<Response, Response> {
    let ip = client_ip(&req);
    match state.limiter.hit(ip, tier) {
        Ok(_) => Ok(next.run(req).await),
        Err(retry_after) => {
            tracing::warn!(client = %ip, ?tier, retry_after, "rate limited");
            Err((
                StatusCode::TOO_MANY_REQUESTS,
                [("Retry-After", retry_after.to_string())],
                Json(json!({ "error": message })),
            )
                .into_response())
        }
    }
}
