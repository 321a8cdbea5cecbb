//! Integration tests for the build and run pipelines.

mod common;

mod run_tests;
