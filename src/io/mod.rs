//! Side-effecting operations: process execution, configuration, transcript
//! persistence. Isolated from [`crate::core`] to enable mocking in tests.

pub mod config;
pub mod invoker;
pub mod process;
pub mod transcript;
