//! Infrastructure shared by the restaurant backend crates: configuration,
//! YAML composition for the build scripts, and test helpers.

pub mod config;
pub mod yaml_include;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

#[cfg(any(test, feature = "test-helpers"))]
pub use test_helpers::{
    create_test_pool, generate_unique_id, get_test_database_url, setup_test_environment,
    truncate_ordering_tables,
};
