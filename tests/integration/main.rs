//! Integration tests for the fetch service
//!
//! These tests use wiremock to stand in for remote resources and drive both the
//! fetch engine and the HTTP router end-to-end.

mod api_tests;
