use serde::{Deserialize, Serialize};

/// Directional call extracted from oracle text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Long,
    Short,
    Hold,
}

/// A parsed oracle answer. Levels are `None` when the text names none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: Action,
    pub support: Option<f64>,
    pub resistance: Option<f64>,
    pub rationale: String,
}

impl Decision {
    pub fn hold(rationale: impl Into<String>) -> Self {
        Self {
            action: Action::Hold,
            support: None,
            resistance: None,
            rationale: rationale.into(),
        }
    }
}
