//! Upstream health probing and the distributed cache over it.

pub mod cache;
pub mod probe;

pub use cache::HealthCache;
pub use probe::HealthProbe;
