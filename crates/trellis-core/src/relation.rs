//! Relation (edge) types and operations

use serde::{Deserialize, Serialize};

/// A directed, typed relation (edge) between two entities
///
/// Multi-edges between the same pair with different `relation_type` are
/// distinct relations; cycles are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    /// Source entity name
    pub from: String,

    /// Target entity name
    pub to: String,

    /// Type of relationship (e.g., "inherits", "calls", "imports")
    pub relation_type: String,
}

impl Relation {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        relation_type: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            relation_type: relation_type.into(),
        }
    }

    /// Whether either endpoint is `name`
    pub fn touches(&self, name: &str) -> bool {
        self.from == name || self.to == name
    }

    /// Whether this relation has the given type
    pub fn is_type(&self, relation_type: &str) -> bool {
        self.relation_type == relation_type
    }
}
