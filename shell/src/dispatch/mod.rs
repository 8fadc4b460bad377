// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// Attach sources.
pub mod builtins;
pub mod prompt;
pub mod shell;

// Re-export.
pub use builtins::*;
pub use prompt::*;
pub use shell::*;

/// Flip this to `false` to silence the `tracing::debug!` calls in this module.
pub const DEBUG_DISPATCH_MOD: bool = true;
