//! This module handles conversion between iCal files and a line model that can be edited in place
//!
//! Unlike a full iCal parser, this keeps every line that is not modified exactly as it was on the server
//! (custom `X-` properties, folding, unknown components...)

mod document;
pub use document::{ParsedDocument, PropertyRecord};
mod parser;
pub use parser::parse;
mod builder;
pub use builder::{build_line, serialize};
mod date;
pub use date::{format_ics_date, format_ics_date_only, is_ics_date, parse_ics_date};
