// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// Attach sources.
pub mod expand;
pub mod tokenizer;

// Re-export.
pub use expand::*;
pub use tokenizer::*;
