//! gshare-metrics — observability for the share engine.
//!
//! Renders the current usage distribution, share weights, and engine
//! counters in the Prometheus text exposition format.

pub mod prometheus;

pub use prometheus::render_prometheus;
