//! Relational bridge: schema-driven tables, bulk loads, checksums, export.

pub mod checksum_repo;
pub mod connection;
pub mod dbc_repo;
pub mod ddl;

#[cfg(test)]
#[path = "tests/dbc_repo_tests.rs"]
mod dbc_repo_tests;
