use crate::error::{Result, TddaError};
use crate::types::{FieldConstraints, LogicalType, MultiFieldConstraint};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::Path;

/// The canonical on-disk form of a dataset's constraint set. Field order
/// mirrors the dataset's own declared order; unknown top-level keys survive
/// a load/save round trip untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConstraintDocument {
    pub fields: IndexMap<String, FieldConstraints>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub multi_field: Vec<MultiFieldConstraint>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ConstraintDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let doc: ConstraintDocument = serde_json::from_str(text)?;
        doc.validate()?;
        Ok(doc)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }

    /// Checks the structural invariants a constraint document must satisfy:
    /// kind/type compatibility, `min <= max`, and `allowed_values` being a
    /// subset of what `rex` accepts.
    pub fn validate(&self) -> Result<()> {
        for (name, fc) in &self.fields {
            if let Some(t) = fc.logical_type {
                if (fc.min_length.is_some() || fc.max_length.is_some())
                    && t != LogicalType::String
                {
                    return Err(TddaError::invalid_document(format!(
                        "field '{name}': min_length/max_length only apply to string fields, found {t}"
                    )));
                }
                if fc.sign.is_some() && !matches!(t, LogicalType::Int | LogicalType::Real) {
                    return Err(TddaError::invalid_document(format!(
                        "field '{name}': sign only applies to numeric fields, found {t}"
                    )));
                }
            }

            if let (Some(min), Some(max)) = (&fc.min, &fc.max) {
                if min.value.partial_cmp(&max.value) == Some(Ordering::Greater) {
                    return Err(TddaError::invalid_document(format!(
                        "field '{name}': min ({}) is greater than max ({})",
                        min.value, max.value
                    )));
                }
            }

            if let (Some(values), Some(patterns)) = (&fc.allowed_values, &fc.rex) {
                let compiled: Vec<regex::Regex> = patterns
                    .iter()
                    .filter_map(|p| regex::Regex::new(p).ok())
                    .collect();
                for v in values {
                    if let Some(s) = v.as_str() {
                        if !compiled.iter().any(|r| r.is_match(s)) {
                            return Err(TddaError::invalid_document(format!(
                                "field '{name}': allowed value '{s}' matches no rex pattern"
                            )));
                        }
                    }
                }
            }
        }

        for mf in &self.multi_field {
            if !self.fields.contains_key(&mf.left) {
                return Err(TddaError::invalid_document(format!(
                    "multi-field constraint references unknown field '{}'",
                    mf.left
                )));
            }
            if !self.fields.contains_key(&mf.right) {
                return Err(TddaError::invalid_document(format!(
                    "multi-field constraint references unknown field '{}'",
                    mf.right
                )));
            }
        }

        Ok(())
    }
}
