use prequal_core::form::{FormError, FormValues};
use prequal_core::record::{FieldRecord, MissingRequiredFields, collect_record, validate_required};
use prequal_core::registry::{FieldKind, Step, StepRegistry};
use prequal_core::summary::{SummaryLine, summarize};
use prequal_core::wizard::{Advance, BranchChange, Navigation, WizardController, WizardView};
use tracing::{debug, warn};

/// What a single-choice selection did besides storing the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceEffect {
    Stored,
    Branch(BranchChange),
}

/// One run of the wizard: the navigation controller plus every field value.
#[derive(Debug, Clone)]
pub struct Session {
    controller: WizardController,
    values: FormValues,
}

impl Session {
    pub fn new(registry: StepRegistry) -> Self {
        let values = FormValues::for_registry(&registry);
        Self {
            controller: WizardController::new(registry),
            values,
        }
    }

    pub fn registry(&self) -> &StepRegistry {
        self.controller.registry()
    }

    pub fn controller(&self) -> &WizardController {
        &self.controller
    }

    pub fn values(&self) -> &FormValues {
        &self.values
    }

    pub fn current_step(&self) -> &Step {
        self.controller.current_step()
    }

    pub fn view(&self) -> WizardView {
        self.controller.view()
    }

    pub fn go_to_step(&mut self, id: &str) -> Navigation {
        self.controller.go_to_step(id)
    }

    pub fn advance(&mut self) -> Advance {
        self.controller.advance()
    }

    pub fn retreat(&mut self) -> Navigation {
        self.controller.retreat()
    }

    pub fn pick_section(&mut self, section: &str) -> Navigation {
        self.controller.pick_section(section)
    }

    pub fn input(&mut self, field: &str, raw: &str) -> Result<String, FormError> {
        self.values.input(field, raw)
    }

    /// Stores a single-choice value. Choosing an option of the branching field
    /// also changes the branch selection.
    pub fn choose(&mut self, field: &str, value: &str) -> Result<ChoiceEffect, FormError> {
        self.values.choose(field, value)?;

        let Some(declared) = self.registry().field(field) else {
            return Ok(ChoiceEffect::Stored);
        };
        if !declared.is_branching() {
            return Ok(ChoiceEffect::Stored);
        }

        let branch = declared
            .option(value)
            .and_then(|option| option.branch.clone());
        let change = self.controller.select_branch(branch.as_ref());
        Ok(ChoiceEffect::Branch(change))
    }

    pub fn toggle(&mut self, field: &str, value: &str) -> Result<bool, FormError> {
        self.values.toggle(field, value)
    }

    pub fn set_consent(&mut self, field: &str, checked: bool) -> Result<(), FormError> {
        self.values.set_consent(field, checked)
    }

    pub fn set_slider(&mut self, field: &str, value: u64) -> Result<u64, FormError> {
        self.values.set_slider(field, value)
    }

    pub fn nudge_slider(&mut self, field: &str, steps: i64) -> Result<u64, FormError> {
        self.values.nudge_slider(field, steps)
    }

    /// Prefills fields whose `param` matches a key. Unknown keys are ignored.
    /// Returns the names of the fields that were filled.
    pub fn apply_params(&mut self, params: &[(String, String)]) -> Vec<String> {
        let mut applied = Vec::new();

        for (key, value) in params {
            let Some(field) = self
                .registry()
                .fields()
                .find(|field| field.param.as_deref() == Some(key.as_str()))
                .cloned()
            else {
                debug!(param = key.as_str(), "ignoring unknown prefill parameter");
                continue;
            };

            let result = match &field.kind {
                FieldKind::Choice { .. } => self.choose(&field.name, value).map(|_| ()),
                FieldKind::MultiChoice { .. } => self.toggle(&field.name, value).map(|_| ()),
                FieldKind::Consent => {
                    let checked = matches!(value.as_str(), "1" | "true" | "yes");
                    self.set_consent(&field.name, checked)
                }
                FieldKind::Slider(_) => match value.trim().parse::<u64>() {
                    Ok(amount) => self.set_slider(&field.name, amount).map(|_| ()),
                    Err(_) => {
                        warn!(
                            param = key.as_str(),
                            value = value.as_str(),
                            "ignoring non-numeric slider prefill"
                        );
                        continue;
                    }
                },
                _ => self.input(&field.name, value).map(|_| ()),
            };

            match result {
                Ok(()) => applied.push(field.name.clone()),
                Err(error) => warn!(param = key.as_str(), %error, "ignoring prefill parameter"),
            }
        }

        applied
    }

    pub fn summary(&self) -> Vec<SummaryLine> {
        summarize(self.registry(), &self.values)
    }

    pub fn record(&self) -> FieldRecord {
        collect_record(self.registry(), &self.values)
    }

    pub fn validate(&self) -> Result<(), MissingRequiredFields> {
        validate_required(self.registry(), &self.values)
    }
}
