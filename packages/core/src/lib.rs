// Library root. Exposes internal modules for integration tests in `tests/`.
// Production entry point remains `src/main.rs`.

pub mod cache;
pub mod error;
pub mod insights;
pub mod metrics;
pub mod store;

// Modules used by the binary. Declared pub so main.rs and the
// integration tests can reach them through the library.
pub mod cli;
pub mod config;
pub mod logging;
