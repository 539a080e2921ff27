//! Fixed-Capacity Ring Buffers
//!
//! Bounded per-tick histories: a generic FIFO ring with oldest-eviction and a
//! rolling average that keeps a running sum over its resident samples.

mod buffer;
mod rolling;

pub use buffer::{Iter, RingBuffer};
pub use rolling::RollingAverage;
