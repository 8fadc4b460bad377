// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// Attach sources.
pub mod foreground_terminal;
pub mod job_driver;
pub mod job_status;
pub mod job_table;
pub mod redirect;
pub mod signals;

// Re-export.
pub use foreground_terminal::*;
pub use job_driver::*;
pub use job_status::*;
pub use job_table::*;
pub use redirect::*;
pub use signals::*;

/// Flip this to `false` to silence the `tracing::debug!` calls in this module.
pub const DEBUG_JOB_MOD: bool = true;
