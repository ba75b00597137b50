//! Per-mode decisions on whether a tick should commit.
//!
//! Both policies are stateless: everything they know about today comes from
//! the persisted [`store::DailyState`], and every commit goes through the
//! scheduler's guard. Neither retries on `Busy`.

pub mod fixed;
pub mod random;

pub use random::{RandomSource, ThreadRandom};
