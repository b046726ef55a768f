//! Integration test modules

mod facade_tests;
mod session_tests;
mod support;
