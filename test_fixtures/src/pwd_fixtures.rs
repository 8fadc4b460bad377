// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Tests that change the process working directory must not run at the same time, and
//! must put the working directory back when they are done. The crate using
//! [`serial_preserve_pwd_test!`] needs `serial_test` as a dev-dependency.

/// Declare a `#[test]` that runs serially with all other such tests, and restores the
/// current working directory afterwards. See [`with_saved_pwd!`].
#[macro_export]
macro_rules! serial_preserve_pwd_test {
    ($name:ident, $block:block) => {
        #[serial_test::serial]
        #[test]
        fn $name() {
            $crate::with_saved_pwd!($block);
        }
    };
}

/// This macro is used to wrap a block with code that saves the current working directory,
/// runs the block of code for the test, and then restores the original working directory.
///
/// Use this in conjunction with
/// [serial_test::serial](https://docs.rs/serial_test/latest/serial_test/) in order to
/// make sure that multiple threads are not changing the current working directory at the
/// same time. In other words, use [`serial_preserve_pwd_test!`] for tests.
#[macro_export]
macro_rules! with_saved_pwd {
    ($block:block) => {{
        let og_pwd = std::env::current_dir().unwrap();
        let result = { $block };
        std::env::set_current_dir(og_pwd).unwrap();
        result
    }};
}
