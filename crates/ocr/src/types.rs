use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::engine::OcrError;

/// Recognized text keyed by 1-based line number, blank lines excluded.
pub type LineMap = BTreeMap<usize, String>;

/// Result of an orientation/script detection pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    /// Counter-clockwise correction in degrees (`360 - reported rotation`).
    pub angle: f32,
    /// Dominant script, lowercased (`latin`, `cyrillic`, ...). Not acted on.
    pub script: String,
}

/// One row of the engine's word table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordBox {
    pub level: u32,
    pub page_num: u32,
    pub block_num: u32,
    pub par_num: u32,
    pub line_num: u32,
    pub word_num: u32,
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
    /// 0–100 for words, -1 for structural rows.
    pub conf: f32,
    #[serde(default)]
    pub text: String,
}

/// Word-level confidence and bounding boxes, as reported by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WordMetadata {
    pub rows: Vec<WordBox>,
}

impl WordMetadata {
    /// Parse tab-separated engine output (header row + one row per element).
    pub fn from_tsv(tsv: &str) -> Result<Self, OcrError> {
        if tsv.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .quoting(false)
            .flexible(true)
            .from_reader(tsv.as_bytes());

        let rows = reader
            .deserialize::<WordBox>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| OcrError::Parse(format!("word table: {e}")))?;
        Ok(Self { rows })
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Word-level rows that carry text.
    pub fn words(&self) -> impl Iterator<Item = &WordBox> {
        self.rows
            .iter()
            .filter(|r| r.level == 5 && !r.text.trim().is_empty())
    }

    /// Mean confidence over words, if there are any.
    pub fn mean_confidence(&self) -> Option<f32> {
        let (sum, n) = self
            .words()
            .fold((0.0f32, 0usize), |(s, n), w| (s + w.conf, n + 1));
        (n > 0).then(|| sum / n as f32)
    }
}
