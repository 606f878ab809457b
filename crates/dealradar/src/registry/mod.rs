//! The persisted set of known companies and the parsing of submissions into it.

pub mod company;
pub mod parse;
pub mod store;

pub use company::{missing_fields, CompanyRecord, RawRecord, COLUMNS, REQUIRED_FIELDS};
pub use parse::parse_batch;
pub use store::CompanyRegistry;
