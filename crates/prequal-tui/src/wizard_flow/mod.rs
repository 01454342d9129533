mod keys;
mod render;

use std::collections::BTreeMap;

use anyhow::Result;
use crossterm::event::KeyEvent;
use prequal_app::{App, Session, SubmissionReceipt, SubmitOutcome};
use prequal_core::form::FieldValue;
use prequal_core::record::MissingRequiredFields;
use prequal_core::registry::{Field, FieldKind};
use prequal_core::wizard::NavigationRejection;
use tui_input::Input;

use crate::WizardOutcome;

pub(crate) trait WizardOps {
    fn submit(&self, session: &Session) -> Result<SubmitOutcome>;
}

impl<'a> WizardOps for App<'a> {
    fn submit(&self, session: &Session) -> Result<SubmitOutcome> {
        App::submit(self, session)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Fields,
    Sidebar,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Stage {
    Editing,
    Blocked(MissingRequiredFields),
    Submitted(SubmissionReceipt),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FlowSignal {
    Continue,
    Exit(WizardOutcome),
}

struct WizardFlow {
    session: Session,
    stage: Stage,
    focus: Focus,
    field_index: usize,
    sidebar_index: usize,
    editors: BTreeMap<String, Input>,
    option_cursor: BTreeMap<String, usize>,
    status: Option<String>,
}

pub(crate) struct WizardScreen {
    flow: WizardFlow,
}

impl WizardScreen {
    pub(crate) fn new(session: Session) -> Self {
        Self {
            flow: WizardFlow::new(session),
        }
    }

    pub(crate) fn render(&self, frame: &mut ratatui::Frame<'_>) {
        self.flow.render(frame);
    }

    pub(crate) fn on_key(&mut self, key: KeyEvent, app: &App<'_>) -> Result<Option<WizardOutcome>> {
        match self.flow.on_key(key, app)? {
            FlowSignal::Continue => Ok(None),
            FlowSignal::Exit(outcome) => Ok(Some(outcome)),
        }
    }
}

impl WizardFlow {
    fn new(session: Session) -> Self {
        let mut flow = Self {
            session,
            stage: Stage::Editing,
            focus: Focus::Fields,
            field_index: 0,
            sidebar_index: 0,
            editors: BTreeMap::new(),
            option_cursor: BTreeMap::new(),
            status: None,
        };
        flow.sync_step_state();
        flow
    }

    /// Rebuilds per-field widget state after the current step changed.
    fn sync_step_state(&mut self) {
        self.field_index = 0;
        self.editors.clear();
        self.option_cursor.clear();

        let fields = self.session.current_step().fields.clone();
        for field in fields {
            if field.kind.is_text_input() {
                let display = self
                    .session
                    .values()
                    .display_value(&field.name)
                    .unwrap_or_default();
                self.editors.insert(field.name.clone(), Input::new(display));
            }

            let selected = match self.session.values().get(&field.name) {
                Some(FieldValue::Choice(Some(value))) => field
                    .options()
                    .iter()
                    .position(|option| &option.value == value)
                    .unwrap_or(0),
                _ => 0,
            };
            if !field.options().is_empty() {
                self.option_cursor.insert(field.name.clone(), selected);
            }
        }
    }

    fn fields(&self) -> &[Field] {
        &self.session.current_step().fields
    }

    fn focused_field(&self) -> Option<&Field> {
        self.fields().get(self.field_index)
    }

    fn focused_kind(&self) -> Option<FieldKind> {
        self.focused_field().map(|field| field.kind.clone())
    }

    fn option_cursor(&self, field: &str) -> usize {
        self.option_cursor.get(field).copied().unwrap_or(0)
    }

    fn active_section_index(&self) -> usize {
        let active = &self.session.current_step().section;
        self.session
            .registry()
            .sections()
            .iter()
            .position(|section| &section.id == active)
            .unwrap_or(0)
    }

    fn missing_labels(&self, missing: &MissingRequiredFields) -> Vec<String> {
        missing
            .fields
            .iter()
            .map(|name| {
                self.session
                    .registry()
                    .field(name)
                    .map(|field| field.label.clone())
                    .unwrap_or_else(|| name.clone())
            })
            .collect()
    }
}

fn rejection_message(reason: NavigationRejection) -> &'static str {
    match reason {
        NavigationRejection::UnknownStep => "That step does not exist.",
        NavigationRejection::HiddenByBranch => "That step is not part of your current path.",
        NavigationRejection::NoTarget => "Answer this step to continue.",
        NavigationRejection::UnknownSection => "That section does not exist.",
        NavigationRejection::SectionNotComplete => {
            "Only completed sections can be revisited from the sidebar."
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use anyhow::Result;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use prequal_app::{Session, SubmissionReceipt, SubmitOutcome};
    use prequal_core::form::FieldValue;
    use prequal_core::registry::{BranchId, StepRegistry};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    use super::{FlowSignal, Focus, Stage, WizardFlow, WizardOps};
    use crate::WizardOutcome;

    #[derive(Default)]
    struct FakeOps {
        handed_off: RefCell<usize>,
    }

    impl WizardOps for FakeOps {
        fn submit(&self, session: &Session) -> Result<SubmitOutcome> {
            if let Err(missing) = session.validate() {
                return Ok(SubmitOutcome::Blocked(missing));
            }
            *self.handed_off.borrow_mut() += 1;
            Ok(SubmitOutcome::Submitted(SubmissionReceipt { path: None }))
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn flow() -> WizardFlow {
        WizardFlow::new(Session::new(
            StepRegistry::builtin().expect("builtin registry"),
        ))
    }

    fn press(flow: &mut WizardFlow, ops: &FakeOps, code: KeyCode) -> FlowSignal {
        flow.on_key(key(code), ops).expect("key handled")
    }

    fn type_text(flow: &mut WizardFlow, ops: &FakeOps, text: &str) {
        for character in text.chars() {
            press(flow, ops, KeyCode::Char(character));
        }
    }

    fn current_step(flow: &WizardFlow) -> String {
        flow.session.current_step().id.to_string()
    }

    fn jump_to(flow: &mut WizardFlow, step: &str) {
        flow.session.go_to_step(step);
        flow.sync_step_state();
    }

    fn render_output(flow: &WizardFlow, width: u16, height: u16) -> String {
        let backend = TestBackend::new(width, height);
        let mut terminal = Terminal::new(backend).expect("terminal");
        terminal
            .draw(|frame| flow.render(frame))
            .expect("render wizard flow");
        format!("{}", terminal.backend())
    }

    #[test]
    fn typing_amount_groups_digits_and_stores_canonical_value() {
        let ops = FakeOps::default();
        let mut flow = flow();

        type_text(&mut flow, &ops, "250000");

        assert_eq!(
            flow.editors
                .get("loan-amount-input")
                .map(|input| input.value().to_string()),
            Some("250,000".to_string())
        );
        assert_eq!(
            flow.session.values().get("loan-amount-input"),
            Some(&FieldValue::Text("250000".to_string()))
        );
    }

    #[test]
    fn enter_advances_and_esc_retreats() {
        let ops = FakeOps::default();
        let mut flow = flow();

        assert_eq!(press(&mut flow, &ops, KeyCode::Enter), FlowSignal::Continue);
        assert_eq!(current_step(&flow), "step-loan-purpose");

        press(&mut flow, &ops, KeyCode::Esc);
        assert_eq!(current_step(&flow), "step-loan-amount");

        press(&mut flow, &ops, KeyCode::Esc);
        assert_eq!(current_step(&flow), "step-loan-amount");
        assert!(flow.status.is_some());
    }

    #[test]
    fn branch_step_requires_a_choice_before_continuing() {
        let ops = FakeOps::default();
        let mut flow = flow();
        press(&mut flow, &ops, KeyCode::Enter);
        press(&mut flow, &ops, KeyCode::Enter);
        assert_eq!(current_step(&flow), "step-employment-structure");

        press(&mut flow, &ops, KeyCode::Enter);
        assert_eq!(current_step(&flow), "step-employment-structure");
        assert_eq!(
            flow.status.as_deref(),
            Some("Answer this step to continue.")
        );

        press(&mut flow, &ops, KeyCode::Down);
        press(&mut flow, &ops, KeyCode::Char(' '));
        assert_eq!(
            flow.session.controller().branch(),
            Some(&BranchId::from("owner"))
        );

        press(&mut flow, &ops, KeyCode::Enter);
        assert_eq!(current_step(&flow), "step-practice-basics");
        assert_eq!(flow.status, None);
    }

    #[test]
    fn multi_choice_space_toggles_option_under_cursor() {
        let ops = FakeOps::default();
        let mut flow = flow();
        flow.session
            .choose("employment-structure", "Practice owner")
            .expect("branch");
        jump_to(&mut flow, "step-practice-finances");

        press(&mut flow, &ops, KeyCode::Char(' '));
        press(&mut flow, &ops, KeyCode::Down);
        press(&mut flow, &ops, KeyCode::Down);
        press(&mut flow, &ops, KeyCode::Char(' '));

        assert_eq!(
            flow.session.values().get("insurance"),
            Some(&FieldValue::Multi(vec![
                "PPO".to_string(),
                "Medicaid".to_string()
            ]))
        );
    }

    #[test]
    fn slider_keys_move_by_configured_step() {
        let ops = FakeOps::default();
        let mut flow = flow();
        flow.session
            .choose("employment-structure", "Employed")
            .expect("branch");
        jump_to(&mut flow, "step-compensation-employed");

        press(&mut flow, &ops, KeyCode::Right);
        press(&mut flow, &ops, KeyCode::Right);
        press(&mut flow, &ops, KeyCode::Left);

        assert_eq!(
            flow.session.values().get("income-input"),
            Some(&FieldValue::Slider(5_000))
        );
    }

    #[test]
    fn submit_with_missing_email_shows_notice_without_handing_off() {
        let ops = FakeOps::default();
        let mut flow = flow();
        jump_to(&mut flow, "step-contact");

        press(&mut flow, &ops, KeyCode::Enter);

        assert!(matches!(flow.stage, Stage::Blocked(_)));
        assert_eq!(*ops.handed_off.borrow(), 0);
        assert_eq!(current_step(&flow), "step-contact");

        let output = render_output(&flow, 120, 40);
        assert!(output.contains("Please fill in all required fields."));

        press(&mut flow, &ops, KeyCode::Enter);
        assert_eq!(flow.stage, Stage::Editing);
    }

    #[test]
    fn backspace_over_phone_mask_removes_a_digit() {
        let ops = FakeOps::default();
        let mut flow = flow();
        jump_to(&mut flow, "step-contact");
        for _ in 0..3 {
            press(&mut flow, &ops, KeyCode::Tab);
        }

        let phone = |flow: &WizardFlow| {
            flow.editors
                .get("phone-input")
                .map(|input| input.value().to_string())
        };

        type_text(&mut flow, &ops, "555");
        assert_eq!(phone(&flow), Some("(555) ".to_string()));

        press(&mut flow, &ops, KeyCode::Backspace);
        assert_eq!(phone(&flow), Some("55".to_string()));

        type_text(&mut flow, &ops, "51234");
        assert_eq!(phone(&flow), Some("(555) 123-4".to_string()));
        press(&mut flow, &ops, KeyCode::Backspace);
        assert_eq!(phone(&flow), Some("(555) 123-".to_string()));
        press(&mut flow, &ops, KeyCode::Backspace);
        assert_eq!(phone(&flow), Some("(555) 12".to_string()));
    }

    #[test]
    fn completed_contact_step_submits_and_exits() {
        let ops = FakeOps::default();
        let mut flow = flow();
        jump_to(&mut flow, "step-contact");

        press(&mut flow, &ops, KeyCode::Tab);
        press(&mut flow, &ops, KeyCode::Tab);
        type_text(&mut flow, &ops, "dr@example.com");
        press(&mut flow, &ops, KeyCode::Tab);
        type_text(&mut flow, &ops, "5551234567");
        assert_eq!(
            flow.editors
                .get("phone-input")
                .map(|input| input.value().to_string()),
            Some("(555) 123-4567".to_string())
        );

        press(&mut flow, &ops, KeyCode::Enter);
        assert_eq!(
            flow.stage,
            Stage::Submitted(SubmissionReceipt { path: None })
        );
        assert_eq!(*ops.handed_off.borrow(), 1);

        let signal = press(&mut flow, &ops, KeyCode::Enter);
        assert_eq!(
            signal,
            FlowSignal::Exit(WizardOutcome::Submitted(SubmissionReceipt { path: None }))
        );
    }

    #[test]
    fn sidebar_only_jumps_to_completed_sections() {
        let ops = FakeOps::default();
        let mut flow = flow();
        press(&mut flow, &ops, KeyCode::Enter);
        press(&mut flow, &ops, KeyCode::Enter);

        press(&mut flow, &ops, KeyCode::F(2));
        assert_eq!(flow.focus, Focus::Sidebar);
        assert_eq!(flow.sidebar_index, 1);

        press(&mut flow, &ops, KeyCode::Down);
        press(&mut flow, &ops, KeyCode::Down);
        press(&mut flow, &ops, KeyCode::Enter);
        assert_eq!(current_step(&flow), "step-employment-structure");
        assert!(flow.status.is_some());

        press(&mut flow, &ops, KeyCode::Up);
        press(&mut flow, &ops, KeyCode::Up);
        press(&mut flow, &ops, KeyCode::Up);
        press(&mut flow, &ops, KeyCode::Enter);
        assert_eq!(current_step(&flow), "step-loan-amount");
        assert_eq!(flow.focus, Focus::Fields);
    }

    #[test]
    fn render_shows_step_sections_and_summary() {
        let flow = flow();
        let output = render_output(&flow, 120, 36);

        assert!(output.contains("How much would you like to borrow?"));
        assert!(output.contains("Sections"));
        assert!(output.contains("Summary"));
        assert!(output.contains("Loan amount"));
    }
}
