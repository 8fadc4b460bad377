// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

/// Short for `Ok(())` or `Ok($value)`.
#[macro_export]
macro_rules! ok {
    // No args.
    () => {
        Ok(())
    };
    // With arg.
    ($value:expr) => {
        Ok($value)
    };
}
