//! Small shared helpers.

pub mod atomic;
pub mod retry;

pub use atomic::{atomic_write, atomic_write_async};
pub use retry::retry_fixed;
