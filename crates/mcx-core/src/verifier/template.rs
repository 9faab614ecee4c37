use mcx_model::CheckableUnit;

use crate::verifier::{ModelBuilder, PrepareError, PreparedInput};

const INVARIANT: &str = "{{invariant}}";
const FIRST: &str = "{{first}}";
const SECOND: &str = "{{second}}";
const CONNECTOR: &str = "{{connector}}";

/// Model builder that treats the unit's model as a text template.
///
/// Recognised placeholders: `{{invariant}}`, `{{first}}`, `{{second}}`, `{{connector}}`.
/// A model without any placeholder is rejected, since checking it would ignore the invariant.
#[derive(Debug, Clone, Default)]
pub struct TemplateBuilder {
    prefix: Option<String>,
}

impl TemplateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix for generated input names (default `checking`).
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    fn input_name(&self, unit: &CheckableUnit) -> String {
        let inv = unit.invariant();
        format!(
            "{}_{}_{}_{}",
            self.prefix.as_deref().unwrap_or("checking"),
            inv.first(),
            inv.connector(),
            inv.second()
        )
    }
}

impl ModelBuilder for TemplateBuilder {
    fn prepare(&self, unit: &CheckableUnit) -> Result<PreparedInput, PrepareError> {
        let model = unit.model().as_str();
        if ![INVARIANT, FIRST, SECOND, CONNECTOR]
            .iter()
            .any(|p| model.contains(p))
        {
            return Err(PrepareError::Invalid(format!(
                "model for '{}' has no invariant placeholder",
                unit.invariant()
            )));
        }

        let inv = unit.invariant();
        let text = model
            .replace(INVARIANT, &inv.to_string())
            .replace(FIRST, inv.first())
            .replace(SECOND, inv.second())
            .replace(CONNECTOR, inv.connector());

        Ok(PreparedInput::new(self.input_name(unit), text))
    }
}
