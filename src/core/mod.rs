//! Pure, deterministic logic: no I/O, fully testable in isolation.

pub mod sanitize;
pub mod session;
pub mod types;
