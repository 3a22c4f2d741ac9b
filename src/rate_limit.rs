/// Request rate limiting shared by every role
use crate::{
    config::RateLimitConfig,
    context::AppContext,
    error::{NameError, NameResult},
};
use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorLimiter,
};
use std::{num::NonZeroU32, sync::Arc};

const FALLBACK_RPS: NonZeroU32 = match NonZeroU32::new(500) {
    Some(n) => n,
    None => unreachable!(),
};

const FALLBACK_BURST: NonZeroU32 = match NonZeroU32::new(100) {
    Some(n) => n,
    None => unreachable!(),
};

/// Process-wide token bucket
#[derive(Clone)]
pub struct RateLimiter {
    enabled: bool,
    limit: u32,
    limiter: Arc<GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let quota = Quota::per_second(
            NonZeroU32::new(config.requests_per_second).unwrap_or(FALLBACK_RPS),
        )
        .allow_burst(NonZeroU32::new(config.burst_size).unwrap_or(FALLBACK_BURST));

        Self {
            enabled: config.enabled,
            limit: config.requests_per_second,
            limiter: Arc::new(GovernorLimiter::direct(quota)),
        }
    }

    /// Take one token
    pub fn check(&self) -> NameResult<()> {
        if !self.enabled {
            return Ok(());
        }
        self.limiter
            .check()
            .map_err(|_| NameError::RateLimitExceeded)
    }
}

/// Rate limiting middleware. Health probes are never limited.
pub async fn rate_limit_middleware(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Response {
    if request.uri().path().starts_with("/health") {
        return next.run(request).await;
    }

    if let Err(e) = ctx.rate_limiter.check() {
        tracing::warn!(path = %request.uri().path(), "Rate limit exceeded");
        return e.into_response();
    }

    let mut response = next.run(request).await;
    if ctx.rate_limiter.enabled {
        response
            .headers_mut()
            .insert("X-RateLimit-Limit", HeaderValue::from(ctx.rate_limiter.limit));
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(enabled: bool, rps: u32, burst: u32) -> RateLimitConfig {
        RateLimitConfig {
            enabled,
            requests_per_second: rps,
            burst_size: burst,
        }
    }

    #[test]
    fn test_rate_limiter_creation() {
        let limiter = RateLimiter::new(&config(true, 500, 100));
        assert!(limiter.check().is_ok());
    }

    #[test]
    fn test_burst_limit() {
        let limiter = RateLimiter::new(&config(true, 1, 5));

        for _ in 0..5 {
            assert!(limiter.check().is_ok());
        }
        assert_eq!(limiter.check(), Err(NameError::RateLimitExceeded));
    }

    #[test]
    fn test_disabled_never_limits() {
        let limiter = RateLimiter::new(&config(false, 1, 1));
        for _ in 0..50 {
            assert!(limiter.check().is_ok());
        }
    }

    #[test]
    fn test_zero_values_fall_back() {
        let limiter = RateLimiter::new(&config(true, 0, 0));
        assert!(limiter.check().is_ok());
    }
}
