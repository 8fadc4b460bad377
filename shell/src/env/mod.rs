// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// Attach sources.
pub mod environment;

// Re-export.
pub use environment::*;

/// Flip this to `false` to silence the `tracing::debug!` calls in this module.
pub const DEBUG_ENV_MOD: bool = true;
