//! SQL generation
//!
//! Identifier quoting, value coercion, criteria compilation, and statement
//! assembly for the SQL Server dialect.

pub mod criteria;
pub mod ident;
pub mod statement;
pub mod value;

pub use ident::{TableRef, escape_like, quote_ident, validate_column};
pub use statement::Statement;
pub use value::{CoercedValue, Coercion, SqlParam, prepare_value};
