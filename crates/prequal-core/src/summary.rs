use crate::form::{FieldValue, FormValues};
use crate::formatters::{format_capped_currency, format_currency};
use crate::registry::{FieldKind, StepRegistry};

pub const EMPTY_SUMMARY: &str = "—";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryLine {
    pub label: String,
    pub value: String,
}

pub fn summarize(registry: &StepRegistry, values: &FormValues) -> Vec<SummaryLine> {
    registry
        .summary_sources()
        .iter()
        .map(|source| {
            let value = registry
                .field(&source.field)
                .zip(values.get(&source.field))
                .map(|(field, value)| render(&field.kind, value))
                .filter(|rendered| !rendered.is_empty())
                .unwrap_or_else(|| EMPTY_SUMMARY.to_string());
            SummaryLine {
                label: source.label.clone(),
                value,
            }
        })
        .collect()
}

fn render(kind: &FieldKind, value: &FieldValue) -> String {
    match (kind, value) {
        (FieldKind::Currency, FieldValue::Text(digits)) => format_currency(digits),
        (FieldKind::Slider(range), FieldValue::Slider(amount)) => {
            format_capped_currency(*amount, range.cap)
        }
        (_, FieldValue::Text(text)) => text.trim().to_string(),
        (_, FieldValue::Choice(choice)) => choice.clone().unwrap_or_default(),
        (_, FieldValue::Multi(selected)) => selected.join(", "),
        (_, FieldValue::Consent(true)) => "Yes".to_string(),
        (_, FieldValue::Consent(false)) => "No".to_string(),
        (_, FieldValue::Slider(amount)) => amount.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(values: &FormValues, registry: &StepRegistry) -> Vec<(String, String)> {
        summarize(registry, values)
            .into_iter()
            .map(|line| (line.label, line.value))
            .collect()
    }

    #[test]
    fn fresh_form_shows_placeholders_and_slider_minimums() {
        let registry = StepRegistry::builtin().expect("builtin registry");
        let values = FormValues::for_registry(&registry);

        let rendered = lines(&values, &registry);
        assert_eq!(rendered[0], ("Loan amount".to_string(), "—".to_string()));
        assert_eq!(rendered[3], ("Income".to_string(), "$0".to_string()));
        assert_eq!(rendered[4], ("Insurance".to_string(), "—".to_string()));
    }

    #[test]
    fn filled_values_are_mirrored() {
        let registry = StepRegistry::builtin().expect("builtin registry");
        let mut values = FormValues::for_registry(&registry);
        values.input("loan-amount-input", "350000").expect("amount");
        values.choose("employment-structure", "Employed").expect("choice");
        values.set_slider("income-input", 100_000).expect("slider");
        values.set_slider("debt-input", 2_000).expect("slider");
        values.toggle("insurance", "HMO").expect("toggle");
        values.toggle("insurance", "PPO").expect("toggle");

        let rendered = lines(&values, &registry)
            .into_iter()
            .map(|(_, value)| value)
            .collect::<Vec<_>>();
        assert_eq!(
            rendered,
            vec![
                "$350,000",
                "—",
                "Employed",
                "$100K+",
                "PPO, HMO",
                "—",
                "$2,000"
            ]
        );
    }
}
