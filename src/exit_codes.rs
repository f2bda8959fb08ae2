//! Stable exit codes for the triad CLI.

/// Run completed all planned cycles.
pub const OK: i32 = 0;
/// Invalid arguments/config, or an agent step failed and the run aborted.
pub const INVALID: i32 = 1;
