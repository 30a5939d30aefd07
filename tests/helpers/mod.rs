// ABOUTME: Shared test helper modules
// ABOUTME: Re-exports the axum test utilities for integration tests

pub mod axum_test;
