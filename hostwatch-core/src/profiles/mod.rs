//! Server profile storage

mod store;

pub use store::{PROFILE_STORE_FILENAME, PROFILE_STORE_VERSION, ProfileStore};
