use std::collections::BTreeMap;

use thiserror::Error;

use crate::formatters::{digits_only, format_identifier, format_phone, group_thousands};
use crate::registry::{FieldKind, SliderRange, StepRegistry};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("unknown field '{name}'")]
    UnknownField { name: String },
    #[error("field '{name}' is a {kind} field and does not support {operation}")]
    KindMismatch {
        name: String,
        kind: &'static str,
        operation: &'static str,
    },
    #[error("'{value}' is not an option of field '{name}'")]
    UnknownOption { name: String, value: String },
}

/// Current value of one field. Text-like fields hold their canonical form:
/// digits for currency and identifiers, the masked text for phone numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Choice(Option<String>),
    Multi(Vec<String>),
    Consent(bool),
    Slider(u64),
}

impl FieldValue {
    fn default_for(kind: &FieldKind) -> Self {
        match kind {
            FieldKind::Text
            | FieldKind::Email
            | FieldKind::Phone
            | FieldKind::Identifier
            | FieldKind::Currency => Self::Text(String::new()),
            FieldKind::Choice { .. } => Self::Choice(None),
            FieldKind::MultiChoice { .. } => Self::Multi(Vec::new()),
            FieldKind::Slider(range) => Self::Slider(range.min),
            FieldKind::Consent => Self::Consent(false),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::Choice(choice) => choice.is_none(),
            Self::Multi(selected) => selected.is_empty(),
            Self::Consent(checked) => !checked,
            Self::Slider(_) => false,
        }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    kind: FieldKind,
    value: FieldValue,
}

#[derive(Debug, Clone)]
pub struct FormValues {
    slots: BTreeMap<String, Slot>,
}

impl FormValues {
    pub fn for_registry(registry: &StepRegistry) -> Self {
        let slots = registry
            .fields()
            .map(|field| {
                (
                    field.name.clone(),
                    Slot {
                        kind: field.kind.clone(),
                        value: FieldValue::default_for(&field.kind),
                    },
                )
            })
            .collect();
        Self { slots }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.slots.get(name).map(|slot| &slot.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.slots
            .iter()
            .map(|(name, slot)| (name.as_str(), &slot.value))
    }

    /// Applies the field's formatter to `raw` and returns the text to show in
    /// the input box.
    pub fn input(&mut self, name: &str, raw: &str) -> Result<String, FormError> {
        let slot = self.slot_mut(name)?;
        let stored = match &slot.kind {
            FieldKind::Text | FieldKind::Email => raw.to_string(),
            FieldKind::Phone => format_phone(raw),
            FieldKind::Identifier => format_identifier(raw),
            FieldKind::Currency => canonical_amount(raw),
            other => return Err(mismatch(name, other, "text input")),
        };
        slot.value = FieldValue::Text(stored);
        self.display_value(name)
    }

    /// Text shown in a text-like field's input box.
    pub fn display_value(&self, name: &str) -> Result<String, FormError> {
        let slot = self.slot(name)?;
        match (&slot.kind, &slot.value) {
            (FieldKind::Currency, FieldValue::Text(digits)) => Ok(group_thousands(digits)),
            (kind, FieldValue::Text(text)) if kind.is_text_input() => Ok(text.clone()),
            (kind, _) => Err(mismatch(name, kind, "text input")),
        }
    }

    pub fn choose(&mut self, name: &str, value: &str) -> Result<(), FormError> {
        let slot = self.slot_mut(name)?;
        let FieldKind::Choice { options } = &slot.kind else {
            return Err(mismatch(name, &slot.kind, "single choice"));
        };
        if !options.iter().any(|option| option.value == value) {
            return Err(unknown_option(name, value));
        }
        slot.value = FieldValue::Choice(Some(value.to_string()));
        Ok(())
    }

    /// Flips one multi-choice option and returns whether it is now selected.
    /// Selections are kept in option order.
    pub fn toggle(&mut self, name: &str, value: &str) -> Result<bool, FormError> {
        let slot = self.slot_mut(name)?;
        let FieldKind::MultiChoice { options } = &slot.kind else {
            return Err(mismatch(name, &slot.kind, "multiple choice"));
        };
        if !options.iter().any(|option| option.value == value) {
            return Err(unknown_option(name, value));
        }

        let mut selected = match &slot.value {
            FieldValue::Multi(selected) => selected.clone(),
            _ => Vec::new(),
        };
        let now_selected = if let Some(position) = selected.iter().position(|item| item == value) {
            selected.remove(position);
            false
        } else {
            selected.push(value.to_string());
            true
        };

        let ordered = options
            .iter()
            .filter(|option| selected.contains(&option.value))
            .map(|option| option.value.clone())
            .collect();
        slot.value = FieldValue::Multi(ordered);
        Ok(now_selected)
    }

    pub fn set_consent(&mut self, name: &str, checked: bool) -> Result<(), FormError> {
        let slot = self.slot_mut(name)?;
        if slot.kind != FieldKind::Consent {
            return Err(mismatch(name, &slot.kind, "consent"));
        }
        slot.value = FieldValue::Consent(checked);
        Ok(())
    }

    /// Sets a slider, clamped to its range. Returns the stored value.
    pub fn set_slider(&mut self, name: &str, value: u64) -> Result<u64, FormError> {
        let slot = self.slot_mut(name)?;
        let FieldKind::Slider(range) = slot.kind else {
            return Err(mismatch(name, &slot.kind, "slider"));
        };
        let clamped = value.clamp(range.min, range.max);
        slot.value = FieldValue::Slider(clamped);
        Ok(clamped)
    }

    /// Moves a slider by `steps` increments of its configured step.
    pub fn nudge_slider(&mut self, name: &str, steps: i64) -> Result<u64, FormError> {
        let range = self.slider_range(name)?;
        let current = match self.get(name) {
            Some(FieldValue::Slider(value)) => *value,
            _ => range.min,
        };
        let delta = range.step.saturating_mul(steps.unsigned_abs());
        let target = if steps < 0 {
            current.saturating_sub(delta)
        } else {
            current.saturating_add(delta)
        };
        self.set_slider(name, target)
    }

    pub fn slider_range(&self, name: &str) -> Result<SliderRange, FormError> {
        let slot = self.slot(name)?;
        match slot.kind {
            FieldKind::Slider(range) => Ok(range),
            ref other => Err(mismatch(name, other, "slider")),
        }
    }

    fn slot(&self, name: &str) -> Result<&Slot, FormError> {
        self.slots.get(name).ok_or_else(|| FormError::UnknownField {
            name: name.to_string(),
        })
    }

    fn slot_mut(&mut self, name: &str) -> Result<&mut Slot, FormError> {
        self.slots
            .get_mut(name)
            .ok_or_else(|| FormError::UnknownField {
                name: name.to_string(),
            })
    }
}

fn canonical_amount(raw: &str) -> String {
    group_thousands(&digits_only(raw)).replace(',', "")
}

fn mismatch(name: &str, kind: &FieldKind, operation: &'static str) -> FormError {
    FormError::KindMismatch {
        name: name.to_string(),
        kind: kind.label(),
        operation,
    }
}

fn unknown_option(name: &str, value: &str) -> FormError {
    FormError::UnknownOption {
        name: name.to_string(),
        value: value.to_string(),
    }
}
