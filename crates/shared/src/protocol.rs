use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::Question;

/// Body of `{surveys_base}/{name}/program.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramDocument {
    pub questions: Vec<Question>,
}

/// Body of a color-scheme or cartogramui resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorDocument {
    pub color_data: Value,
    pub tooltip: TooltipDocument,
}

/// Tooltip payload carried by a color document: the column label plus
/// whatever per-region entries the renderer consumes opaquely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TooltipDocument {
    pub label: String,
    #[serde(flatten)]
    pub entries: serde_json::Map<String, Value>,
}
