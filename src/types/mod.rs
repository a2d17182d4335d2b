pub mod errors;

#[cfg(test)]
#[path = "tests/errors_tests.rs"]
mod errors_tests;
