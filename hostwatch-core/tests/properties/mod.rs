//! Property test modules

mod history_tests;
mod profile_store_tests;
