//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that accept
//! `&PgPool` as the first argument.

pub mod grouped_row_repo;

pub use grouped_row_repo::GroupedRowRepo;
