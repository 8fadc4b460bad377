// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Logging is off unless asked for. The shell owns the terminal, so the usual setup is a
//! log file (`--log-file`), which can be watched with `tail -f` from another terminal.

// Attach sources.
pub mod rolling_file_appender_impl;
pub mod tracing_config;
pub mod tracing_init;

// Re-export.
pub use tracing_config::*;
pub use tracing_init::*;
