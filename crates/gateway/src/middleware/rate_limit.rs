//! Rate limiting middleware using token bucket algorithm

use aqar_common::errors::AppError;
use axum::{extract::Request, middleware::Next, response::Response};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Process-wide limiter shared by every route it guards
pub struct SearchRateLimiter {
    limiter: DefaultDirectRateLimiter,
    requests_per_second: u32,
}

impl SearchRateLimiter {
    /// Zero values are raised to one
    pub fn new(requests_per_second: u32, burst: u32) -> Arc<Self> {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(burst).unwrap_or(rps);
        let quota = Quota::per_second(rps).allow_burst(burst);

        Arc::new(Self {
            limiter: RateLimiter::direct(quota),
            requests_per_second: rps.get(),
        })
    }

    fn check(&self) -> Result<(), AppError> {
        self.limiter.check().map_err(|_| AppError::RateLimited {
            limit: self.requests_per_second,
        })
    }
}

/// Reject with 429 once the bucket is empty
pub async fn rate_limit_middleware(
    request: Request,
    next: Next,
    limiter: Arc<SearchRateLimiter>,
) -> Result<Response, AppError> {
    if let Err(e) = limiter.check() {
        tracing::warn!(path = %request.uri().path(), "Rate limit exceeded");
        return Err(e);
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_then_reject() {
        let limiter = SearchRateLimiter::new(1, 2);
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_ok());
        assert!(matches!(limiter.check(), Err(AppError::RateLimited { limit: 1 })));
    }

    #[test]
    fn test_zero_settings_do_not_panic() {
        let limiter = SearchRateLimiter::new(0, 0);
        assert!(limiter.check().is_ok());
    }
}
