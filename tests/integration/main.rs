//! End-to-end tests against a mock catalog server

mod common;
mod crawl_tests;
mod query_tests;
