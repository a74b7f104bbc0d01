//! Integration tests
//!
//! Crawl tests run the coordinator against a wiremock stand-in for the
//! remote API; read API tests drive the axum router directly.

mod crawl_tests;
