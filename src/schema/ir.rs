/// Compiled intermediate representation consumed by the runtime.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use super::value::{Value, Variables};

/// Format tag written into every compiled document.
pub const IR_FORMAT: &str = "ink-json/v3";

#[derive(Debug, Error)]
pub enum IrError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A single-use or repeatable choice attached to a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub id: String,
    pub text: String,
    /// Resolved step id or sentinel. Absent when the choice had no arrow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default)]
    pub repeatable: bool,
}

/// Side effect run when a step is entered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Action {
    /// `~ var = expr`
    Set { var: String, expr: String },
    /// `~ name(args)`; the host decides what it means.
    Call {
        #[serde(rename = "fn")]
        name: String,
        args: String,
    },
}

/// One IR unit: a knot (`id`) or a stitch (`knot.stitch`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_raw: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ChoiceOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub divert: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub end: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Action>,
}

impl Step {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// True when the step carries nothing at all: no text, speaker, options,
    /// divert, terminal flag or actions.
    pub fn is_empty(&self) -> bool {
        self.text.is_none()
            && self.text_raw.is_none()
            && self.speaker.is_none()
            && self.options.is_empty()
            && self.divert.is_none()
            && !self.end
            && self.actions.is_empty()
    }

    /// True for a bare knot whose only content is the synthetic divert into
    /// one of its own stitches.
    pub fn is_fallthrough(&self) -> bool {
        let Some(divert) = &self.divert else {
            return false;
        };
        !self.is_stitch()
            && divert
                .strip_prefix(self.id.as_str())
                .is_some_and(|rest| rest.starts_with('.'))
            && Step {
                divert: None,
                ..self.clone()
            }
            .is_empty()
    }

    pub fn is_stitch(&self) -> bool {
        self.id.contains('.')
    }

    /// The knot this step belongs to.
    pub fn knot(&self) -> &str {
        knot_of(&self.id)
    }
}

/// Knot segment of a step id (`knot` for `knot.stitch`).
pub fn knot_of(id: &str) -> &str {
    id.split_once('.').map_or(id, |(knot, _)| knot)
}

/// The compiled document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptIr {
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub vars: Variables,
    #[serde(default)]
    pub lists: BTreeMap<String, Vec<String>>,
    /// External declarations as `name/arity`.
    #[serde(default)]
    pub externals: Vec<String>,
    /// Step ids in declaration order.
    #[serde(default)]
    pub order: Vec<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl ScriptIr {
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn has_step(&self, id: &str) -> bool {
        self.step(id).is_some()
    }

    pub fn initial_value(&self, var: &str) -> Option<&Value> {
        self.vars.get(var)
    }

    pub fn to_json(&self) -> Result<String, IrError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(input: &str) -> Result<ScriptIr, IrError> {
        Ok(serde_json::from_str(input)?)
    }

    /// Load a compiled document from a JSON file.
    pub fn load(path: &Path) -> Result<ScriptIr, IrError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn save(&self, path: &Path) -> Result<(), IrError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
