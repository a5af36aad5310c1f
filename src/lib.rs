// Library target shared by the binary, the integration tests in tests/ and
// the criterion benchmarks.

pub mod app;
pub mod backend;
pub mod config;
pub mod event;
pub mod session;
pub mod store;
