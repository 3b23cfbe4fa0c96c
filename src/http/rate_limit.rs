//! Per-client token bucket in front of every route.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};

use crate::config::AppConfig;
use crate::EcommerceError;

type KeyedLimiter = RateLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, DefaultClock>;

#[derive(Clone)]
pub struct ClientRateLimiter {
    limiter: Arc<KeyedLimiter>,
    trust_proxy_headers: bool,
}

impl ClientRateLimiter {
    pub fn from_config(config: &AppConfig) -> Self {
        let quota = Quota::per_second(config.rate_limit_per_second).allow_burst(config.rate_limit_burst);
        Self { limiter: Arc::new(RateLimiter::keyed(quota)), trust_proxy_headers: config.trust_proxy_headers }
    }

    /// Takes one token from `client`'s bucket.
    pub fn check(&self, client: IpAddr) -> bool { self.limiter.check_key(&client).is_ok() }

    /// Forgets clients whose buckets have refilled.
    pub fn prune(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    /// The first `X-Forwarded-For` hop when proxies are trusted, else the peer address.
    fn client_ip(&self, req: &Request) -> IpAddr {
        if self.trust_proxy_headers {
            let forwarded = req
                .headers()
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .and_then(|ip| ip.trim().parse().ok());
            if let Some(ip) = forwarded {
                return ip;
            }
        }
        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
    }
}

pub async fn limit_requests(State(limiter): State<ClientRateLimiter>, req: Request, next: Next) -> Response {
    let client = limiter.client_ip(&req);
    if !limiter.check(client) {
        tracing::warn!(%client, path = %req.uri().path(), "rate limit exceeded");
        return EcommerceError::RateLimited.into_response();
    }
    next.run(req).await
}
