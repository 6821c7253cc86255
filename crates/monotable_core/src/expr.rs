//! Attribute registry for expression placeholders.

use std::collections::BTreeMap;

use monotable_codec::Value;
use monotable_store::Expression;

/// Interns attribute names and values as collision-free placeholders.
///
/// Physical attribute names are always aliased as `#n…` (never spliced
/// into expression text), which sidesteps the store's reserved-word
/// list; values are interned as `:v…`. Repeated names and equal values
/// share one placeholder.
#[derive(Debug, Default)]
pub struct AttributeRegistry {
    names: Vec<(String, String)>,
    values: Vec<(String, Value)>,
}

impl AttributeRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern an attribute name, returning its placeholder.
    pub fn name(&mut self, attribute: &str) -> String {
        if let Some((placeholder, _)) = self.names.iter().find(|(_, a)| a == attribute) {
            return placeholder.clone();
        }
        let placeholder = format!("#n{}", self.names.len());
        self.names
            .push((placeholder.clone(), attribute.to_string()));
        placeholder
    }

    /// Intern a value, returning its placeholder.
    pub fn value(&mut self, value: Value) -> String {
        if let Some((placeholder, _)) = self.values.iter().find(|(_, v)| *v == value) {
            return placeholder.clone();
        }
        let placeholder = format!(":v{}", self.values.len());
        self.values.push((placeholder.clone(), value));
        placeholder
    }

    /// Consume the registry into an immutable expression.
    pub fn into_expression(self, expression: impl Into<String>) -> Expression {
        let names: BTreeMap<String, String> = self.names.into_iter().collect();
        let values: BTreeMap<String, Value> = self.values.into_iter().collect();
        Expression::new(expression, names, values)
    }
}
