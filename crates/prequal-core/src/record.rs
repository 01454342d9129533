use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::form::{FieldValue, FormValues};
use crate::registry::StepRegistry;

/// Flat map of every declared field name to its value. Empty fields are
/// present as `null` or an empty array, never missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldRecord(BTreeMap<String, Value>);

impl FieldRecord {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("please fill in all required fields: {}", .fields.join(", "))]
pub struct MissingRequiredFields {
    pub fields: Vec<String>,
}

pub fn collect_record(registry: &StepRegistry, values: &FormValues) -> FieldRecord {
    let entries = registry
        .fields()
        .map(|field| {
            let value = values
                .get(&field.name)
                .map(to_json)
                .unwrap_or(Value::Null);
            (field.name.clone(), value)
        })
        .collect();
    FieldRecord(entries)
}

/// Required fields left empty, in registry order.
pub fn validate_required(
    registry: &StepRegistry,
    values: &FormValues,
) -> Result<(), MissingRequiredFields> {
    let fields = registry
        .fields()
        .filter(|field| field.required)
        .filter(|field| values.get(&field.name).is_none_or(FieldValue::is_empty))
        .map(|field| field.name.clone())
        .collect::<Vec<_>>();

    if fields.is_empty() {
        Ok(())
    } else {
        Err(MissingRequiredFields { fields })
    }
}

fn to_json(value: &FieldValue) -> Value {
    match value {
        FieldValue::Text(text) if text.is_empty() => Value::Null,
        FieldValue::Text(text) => Value::String(text.clone()),
        FieldValue::Choice(choice) => choice.clone().map_or(Value::Null, Value::String),
        FieldValue::Multi(selected) => {
            Value::Array(selected.iter().cloned().map(Value::String).collect())
        }
        FieldValue::Consent(checked) => Value::Bool(*checked),
        FieldValue::Slider(amount) => Value::String(amount.to_string()),
    }
}
