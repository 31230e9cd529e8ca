use crate::resilience::RateLimiterSnapshot;

/// Point-in-time view of the processor's shared gates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalsSnapshot {
    pub inflight: InflightSnapshot,
    pub rate_limiter: RateLimiterSnapshot,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InflightSnapshot {
    pub max: usize,
    pub available: usize,
    pub in_use: usize,
}

impl InflightSnapshot {
    pub fn new(max: usize, available: usize) -> Self {
        Self {
            max,
            available,
            in_use: max.saturating_sub(available),
        }
    }
}
