// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// Attach sources.
pub mod history_navigator;
pub mod history_ring;

// Re-export.
pub use history_navigator::*;
pub use history_ring::*;
