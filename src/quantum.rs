/// A rational sample-rate, `numerator / denominator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RateFraction {
    pub num: u32,
    pub denom: u32,
}

/// The timing stamp a driver node writes once per cycle and every node in
/// its driver-graph reads for that cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Quantum {
    pub nsec: u64,
    pub rate: RateFraction,
    pub position: u64,
    pub delay: i64,
    pub size: u32,
}

/// An external wall clock a node may be attached to, read instead of the
/// monotonic fallback when present.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Clock {
    pub nsec: u64,
    pub rate: RateFraction,
    pub position: u64,
    pub delay: i64,
}

/// Shared scratch read by the graph executor to decide whether a driver
/// still has work pending this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Activation {
    pub status: u32,
    pub pending: u32,
}
