//! `usda` implements the text file parser.
//!
//! ```no_run
//! # fn main() -> anyhow::Result<()> {
//! let layer = openusd_usda::usda::read_layer("scene.usda")?;
//! for prim in &layer.prims {
//!     println!("{} {}", prim.type_name, prim.name);
//! }
//! # Ok(())
//! # }
//! ```

use std::{fs, path::Path, str::FromStr};

use anyhow::{Context, Result};
use thiserror::Error;

mod assemble;
mod basic;
pub mod cursor;
pub mod diag;
mod meta;
pub mod parser;
mod props;

pub use basic::Scalar;
pub use parser::Parser;

use crate::sdf::Layer;

/// Parser options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserConfig {
    /// Fail on an unknown `upAxis` instead of falling back to `Y`.
    pub strict_up_axis: bool,
    /// Drop unknown `apiSchemas` entries with a warning instead of failing.
    pub allow_unknown_api_schema: bool,
    /// Treat `;` as a statement separator.
    pub allow_semicolon: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            strict_up_axis: false,
            allow_unknown_api_schema: true,
            allow_semicolon: true,
        }
    }
}

impl ParserConfig {
    pub fn strict_up_axis(mut self, value: bool) -> Self {
        self.strict_up_axis = value;
        self
    }

    pub fn allow_unknown_api_schema(mut self, value: bool) -> Self {
        self.allow_unknown_api_schema = value;
        self
    }

    pub fn allow_semicolon(mut self, value: bool) -> Self {
        self.allow_semicolon = value;
        self
    }
}

/// Parse failure with every positioned diagnostic, newest first.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ParseError {
    message: String,
    warnings: String,
}

impl ParseError {
    pub(crate) fn new(message: String, warnings: String) -> Self {
        Self { message, warnings }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Warnings collected before the failure.
    pub fn warnings(&self) -> &str {
        &self.warnings
    }
}

/// Parse a document held in memory.
pub fn parse_layer(data: &str, config: ParserConfig) -> Result<Layer, ParseError> {
    Parser::new(data, config).parse()
}

/// Read and parse a `.usda` file with default options.
pub fn read_layer(path: impl AsRef<Path>) -> Result<Layer> {
    let path = path.as_ref();
    let data = fs::read_to_string(path).with_context(|| format!("Unable to read file: {}", path.display()))?;

    let layer = parse_layer(&data, ParserConfig::default())
        .with_context(|| format!("Unable to parse text file: {}", path.display()))?;

    Ok(layer)
}

impl FromStr for Layer {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_layer(s, ParserConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdf::{self, Value};

    #[test]
    fn read_fixture() -> Result<()> {
        let layer = read_layer("fixtures/end_to_end.usda")?;
        assert_eq!(layer.prims.len(), 1);

        assert!(read_layer("fixtures/missing.usda").is_err());

        Ok(())
    }

    #[test]
    fn layer_from_str() -> Result<()> {
        let layer: Layer = "#usda 1.0\ndef \"a\" { int x = 1; int y = 2 }\n".parse()?;
        let a = layer.root("a").context("a")?;
        assert_eq!(a.property("y").and_then(|p| p.value()), Some(&Value::Int(2)));

        Ok(())
    }

    #[test]
    fn semicolons_can_be_disabled() {
        let text = "#usda 1.0\ndef \"a\" { int x = 1; int y = 2 }\n";
        let config = ParserConfig::default().allow_semicolon(false);
        assert!(parse_layer(text, config).is_err());
    }

    #[test]
    fn warnings_are_reported() -> Result<()> {
        let text = "#usda 1.0\n( upAxis = \"Q\" )\ndef \"a\" ( apiSchemas = [\"NopeAPI\"] ) {}\n";

        let mut parser = Parser::new(text, ParserConfig::default());
        let layer = parser.parse()?;

        assert_eq!(layer.metas.up_axis, Some(sdf::UpAxis::Y));
        let warnings = parser.warnings().lines().collect::<Vec<_>>();
        assert_eq!(warnings.len(), 2);
        // Newest first.
        assert!(warnings[0].starts_with("USDA source near line 3"), "{}", warnings[0]);
        assert!(warnings[1].starts_with("USDA source near line 2"), "{}", warnings[1]);

        Ok(())
    }

    #[test]
    fn error_carries_warnings() {
        let text = "#usda 1.0\n( upAxis = \"Q\" )\ndef \"a\" { bogus }\n";

        let err = parse_layer(text, ParserConfig::default()).err();
        assert!(err.as_ref().is_some_and(|e| e.message().contains("near line 3")));
        assert!(err.is_some_and(|e| e.warnings().contains("upAxis")));
    }
}
