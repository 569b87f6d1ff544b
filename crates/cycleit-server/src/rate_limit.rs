//! Per-IP token bucket rate limiting.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, State},
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tokio::sync::Mutex;
use tracing::warn;

use cycleit_shared::protocol::ErrorBody;

use crate::config::ServerConfig;

/// Sustained rate and burst size shared by every client.
#[derive(Debug, Clone, Copy)]
pub struct Quota {
    pub per_sec: f64,
    pub burst: f64,
}

impl Quota {
    /// Time until one token is available when `available` are left.
    fn wait_for_token(&self, available: f64) -> Duration {
        if self.per_sec <= 0.0 {
            return Duration::MAX;
        }
        Duration::from_secs_f64((1.0 - available).max(0.0) / self.per_sec)
    }
}

/// Remaining allowance of one client, refilled lazily on each request.
#[derive(Debug, Clone)]
struct Allowance {
    available: f64,
    seen_at: Instant,
}

impl Allowance {
    fn full(quota: &Quota, now: Instant) -> Self {
        Self {
            available: quota.burst,
            seen_at: now,
        }
    }

    /// Spend one token, or report how long the client has to back off.
    fn spend(&mut self, quota: &Quota, now: Instant) -> Result<(), Duration> {
        let idle = now.saturating_duration_since(self.seen_at).as_secs_f64();
        self.available = (self.available + idle * quota.per_sec).min(quota.burst);
        self.seen_at = now;

        if self.available < 1.0 {
            return Err(quota.wait_for_token(self.available));
        }
        self.available -= 1.0;
        Ok(())
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    clients: Arc<Mutex<HashMap<IpAddr, Allowance>>>,
    quota: Quota,
}

impl RateLimiter {
    pub fn new(quota: Quota) -> Self {
        Self {
            clients: Arc::new(Mutex::new(HashMap::new())),
            quota,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(Quota {
            per_sec: config.rate_limit_per_sec,
            burst: config.rate_limit_burst,
        })
    }

    /// Admit one request from `ip`. `Err` carries the suggested retry delay.
    pub async fn admit(&self, ip: IpAddr) -> Result<(), Duration> {
        self.admit_at(ip, Instant::now()).await
    }

    async fn admit_at(&self, ip: IpAddr, now: Instant) -> Result<(), Duration> {
        let mut clients = self.clients.lock().await;
        clients
            .entry(ip)
            .or_insert_with(|| Allowance::full(&self.quota, now))
            .spend(&self.quota, now)
    }

    /// Forget clients idle for longer than `max_idle`. Returns how many went.
    pub async fn purge_stale(&self, max_idle: Duration) -> usize {
        let mut clients = self.clients.lock().await;
        let before = clients.len();
        let now = Instant::now();
        clients.retain(|_, allowance| now.saturating_duration_since(allowance.seen_at) < max_idle);
        before - clients.len()
    }
}

pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let Some(ip) = extract_client_ip(&req) else {
        return next.run(req).await;
    };

    match limiter.admit(ip).await {
        Ok(()) => next.run(req).await,
        Err(wait) => {
            let retry_after = wait.as_secs().saturating_add(1).min(3600);
            warn!(ip = %ip, retry_after, "rate limit exceeded");
            (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, retry_after.to_string())],
                Json(ErrorBody {
                    error: "Too many requests".into(),
                }),
            )
                .into_response()
        }
    }
}

/// Try ConnectInfo first, then X-Forwarded-For, then X-Real-IP.
fn extract_client_ip<B>(req: &Request<B>) -> Option<IpAddr> {
    if let Some(connect_info) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return Some(connect_info.0.ip());
    }

    let header = |name: &str| req.headers().get(name).and_then(|v| v.to_str().ok());

    if let Some(first) = header("x-forwarded-for").and_then(|v| v.split(',').next()) {
        if let Ok(ip) = first.trim().parse::<IpAddr>() {
            return Some(ip);
        }
    }

    header("x-real-ip").and_then(|v| v.trim().parse::<IpAddr>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(per_sec: f64, burst: f64) -> RateLimiter {
        RateLimiter::new(Quota { per_sec, burst })
    }

    #[tokio::test]
    async fn burst_then_refusal_with_retry_delay() {
        let limiter = limiter(2.0, 3.0);
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        let t0 = Instant::now();

        for _ in 0..3 {
            assert!(limiter.admit_at(ip, t0).await.is_ok());
        }
        let wait = limiter.admit_at(ip, t0).await.unwrap_err();
        assert_eq!(wait, Duration::from_millis(500));
    }

    #[tokio::test]
    async fn allowance_refills_over_time() {
        let limiter = limiter(2.0, 1.0);
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        let t0 = Instant::now();

        assert!(limiter.admit_at(ip, t0).await.is_ok());
        assert!(limiter.admit_at(ip, t0).await.is_err());
        assert!(limiter
            .admit_at(ip, t0 + Duration::from_millis(600))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn clients_are_limited_separately() {
        let limiter = limiter(10.0, 2.0);
        let ip1: IpAddr = "10.0.0.1".parse().unwrap();
        let ip2: IpAddr = "10.0.0.2".parse().unwrap();

        assert!(limiter.admit(ip1).await.is_ok());
        assert!(limiter.admit(ip1).await.is_ok());
        assert!(limiter.admit(ip1).await.is_err());

        assert!(limiter.admit(ip2).await.is_ok());
    }

    #[tokio::test]
    async fn zero_rate_never_refills() {
        let limiter = limiter(0.0, 1.0);
        let ip: IpAddr = "10.0.0.3".parse().unwrap();
        assert!(limiter.admit(ip).await.is_ok());
        assert_eq!(limiter.admit(ip).await, Err(Duration::MAX));
    }

    #[tokio::test]
    async fn idle_clients_are_purged() {
        let limiter = limiter(10.0, 5.0);
        let ip: IpAddr = "192.168.1.1".parse().unwrap();
        assert!(limiter.admit(ip).await.is_ok());

        assert_eq!(limiter.purge_stale(Duration::ZERO).await, 1);
        assert!(limiter.clients.lock().await.is_empty());
    }

    #[test]
    fn client_ip_from_proxy_headers() {
        let req = Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(())
            .unwrap();
        assert_eq!(extract_client_ip(&req), "203.0.113.7".parse().ok());

        let req = Request::builder().header("x-real-ip", " 198.51.100.2 ").body(()).unwrap();
        assert_eq!(extract_client_ip(&req), "198.51.100.2".parse().ok());

        let req = Request::builder().body(()).unwrap();
        assert_eq!(extract_client_ip(&req), None);
    }
}
