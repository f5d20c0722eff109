//! Structural filename parsing (§4.F) and its AI-assisted escalation path
//! (§4.G) for filenames the regex parser is not confident about.

pub mod ai;
pub mod regex_parser;

pub use ai::{AiClient, AiParseError, AiParseJob};
pub use regex_parser::RegexParser;
