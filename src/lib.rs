pub mod convert;
pub mod error;
pub mod parser;
pub mod types;

pub use convert::{ConvertOptions, ConvertSummary, convert};
pub use error::{HeaderError, SyntaxError};
