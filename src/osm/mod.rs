pub mod parser;

pub use parser::{MalformedEntity, ParsedFacility, collapse_repeats, parse_facility};
