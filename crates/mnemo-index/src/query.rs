use mnemo_types::Value;

/// A conjunction of field equalities. The empty query matches every
/// indexed entry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query {
    terms: Vec<(String, Value)>,
}

impl Query {
    /// The query matching everything.
    pub fn all() -> Self {
        Self::default()
    }

    /// Require `field` to equal `value`.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.terms.push((field.into(), value.into()));
        self
    }

    pub fn terms(&self) -> &[(String, Value)] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}
