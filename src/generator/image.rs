//! Serialized form of a generator
//!
//! An image carries the source rather than the normalized lines. Loading
//! re-normalizes it and checks the fingerprint, so an image can only be
//! resumed against the program it was taken from.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::Generator;
use crate::errors::EngineError;
use crate::interpreter::Val;
use crate::rewrite::normalize_with_width;
use crate::state::Cursor;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorImage {
    pub name: String,
    pub source: String,
    /// SHA-256 of the normalized lines
    pub fingerprint: String,
    pub indent_width: usize,
    pub cursor: Cursor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Val>,
    pub closed: bool,
}

impl From<Generator> for GeneratorImage {
    fn from(generator: Generator) -> Self {
        Self {
            name: generator.program.signature.name.clone(),
            source: generator.program.source.clone(),
            fingerprint: generator.program.fingerprint(),
            indent_width: generator.program.indent_width,
            cursor: generator.cursor,
            payload: generator.returned,
            closed: generator.closed,
        }
    }
}

impl TryFrom<GeneratorImage> for Generator {
    type Error = EngineError;

    fn try_from(image: GeneratorImage) -> Result<Self, Self::Error> {
        let program = normalize_with_width(&image.source, image.indent_width)?;

        let fingerprint = program.fingerprint();
        if fingerprint != image.fingerprint {
            warn!(name = %image.name, "generator image does not match its source");
            return Err(EngineError::ImageMismatch {
                expected: image.fingerprint,
                found: fingerprint,
            });
        }

        let cursor = image.cursor;
        if cursor.line_index > program.len() {
            return Err(EngineError::ImageMismatch {
                expected: format!("line index at most {}", program.len()),
                found: cursor.line_index.to_string(),
            });
        }
        if let Some(span) = cursor.active_loops.iter().find(|span| !program.loop_spans.contains(span)) {
            return Err(EngineError::ImageMismatch {
                expected: "a loop of the program".to_string(),
                found: format!("{:?}", span),
            });
        }
        if cursor.running {
            return Err(EngineError::ProgrammerMisuse("image taken while the generator was running".to_string()));
        }

        let mut generator = Generator::with_cursor(Arc::new(program), cursor);
        generator.closed = image.closed;
        generator.returned = image.payload;
        Ok(generator)
    }
}
