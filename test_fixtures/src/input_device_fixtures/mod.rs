// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// Attach sources.
pub mod byte_stream_mock;

// Re-export.
pub use byte_stream_mock::*;
