use anyhow::Result;
use crossterm::event::{Event, KeyEvent};
use prequal_app::SubmitOutcome;
use prequal_core::form::FieldValue;
use prequal_core::formatters::digits_only;
use prequal_core::registry::FieldKind;
use prequal_core::wizard::{Advance, Navigation, NavigationRejection};
use tui_input::Input;
use tui_input::backend::crossterm::EventHandler;

use super::{FlowSignal, Focus, Stage, WizardFlow, WizardOps, rejection_message};
use crate::WizardOutcome;
use crate::keymap;

impl WizardFlow {
    pub(super) fn on_key(&mut self, key: KeyEvent, ops: &dyn WizardOps) -> Result<FlowSignal> {
        match self.stage {
            Stage::Blocked(_) => Ok(self.on_key_blocked(key)),
            Stage::Submitted(_) => Ok(self.on_key_submitted(key)),
            Stage::Editing => match self.focus {
                Focus::Sidebar => Ok(self.on_key_sidebar(key)),
                Focus::Fields => self.on_key_fields(key, ops),
            },
        }
    }

    fn on_key_blocked(&mut self, key: KeyEvent) -> FlowSignal {
        if keymap::is_confirm(key) || keymap::is_back(key) {
            self.stage = Stage::Editing;
        }
        FlowSignal::Continue
    }

    fn on_key_submitted(&mut self, key: KeyEvent) -> FlowSignal {
        if !(keymap::is_confirm(key) || keymap::is_back(key)) {
            return FlowSignal::Continue;
        }
        match &self.stage {
            Stage::Submitted(receipt) => {
                FlowSignal::Exit(WizardOutcome::Submitted(receipt.clone()))
            }
            _ => FlowSignal::Continue,
        }
    }

    fn on_key_sidebar(&mut self, key: KeyEvent) -> FlowSignal {
        if keymap::is_back(key) || keymap::is_sidebar(key) {
            self.focus = Focus::Fields;
            return FlowSignal::Continue;
        }

        if keymap::is_up(key) {
            self.sidebar_index = self.sidebar_index.saturating_sub(1);
            return FlowSignal::Continue;
        }

        if keymap::is_down(key) {
            let last = self.session.registry().sections().len().saturating_sub(1);
            self.sidebar_index = (self.sidebar_index + 1).min(last);
            return FlowSignal::Continue;
        }

        if keymap::is_confirm(key) {
            let Some(section) = self
                .session
                .registry()
                .sections()
                .get(self.sidebar_index)
                .map(|section| section.id.to_string())
            else {
                return FlowSignal::Continue;
            };

            match self.session.pick_section(&section) {
                Navigation::Moved { .. } => {
                    self.status = None;
                    self.focus = Focus::Fields;
                    self.sync_step_state();
                }
                Navigation::Rejected(reason) => {
                    self.status = Some(rejection_message(reason).to_string());
                }
            }
        }

        FlowSignal::Continue
    }

    fn on_key_fields(&mut self, key: KeyEvent, ops: &dyn WizardOps) -> Result<FlowSignal> {
        if keymap::is_confirm(key) {
            return self.advance(ops);
        }

        if keymap::is_back(key) {
            self.retreat();
            return Ok(FlowSignal::Continue);
        }

        if keymap::is_sidebar(key) {
            self.focus = Focus::Sidebar;
            self.sidebar_index = self.active_section_index();
            return Ok(FlowSignal::Continue);
        }

        let field_count = self.fields().len();
        if keymap::is_next_field(key) {
            if field_count > 0 {
                self.field_index = (self.field_index + 1) % field_count;
            }
            return Ok(FlowSignal::Continue);
        }

        if keymap::is_prev_field(key) {
            if field_count > 0 {
                self.field_index = (self.field_index + field_count - 1) % field_count;
            }
            return Ok(FlowSignal::Continue);
        }

        match self.focused_kind() {
            Some(kind) if kind.is_text_input() => self.on_key_text(key),
            Some(FieldKind::Choice { .. }) => self.on_key_options(key, false),
            Some(FieldKind::MultiChoice { .. }) => self.on_key_options(key, true),
            Some(FieldKind::Slider(_)) => self.on_key_slider(key),
            Some(FieldKind::Consent) => self.on_key_consent(key),
            _ => Ok(FlowSignal::Continue),
        }
    }

    fn advance(&mut self, ops: &dyn WizardOps) -> Result<FlowSignal> {
        match self.session.advance() {
            Advance::Moved { .. } => {
                self.status = None;
                self.sync_step_state();
            }
            Advance::Rejected(reason) => {
                self.status = Some(rejection_message(reason).to_string());
            }
            Advance::Complete => match ops.submit(&self.session)? {
                SubmitOutcome::Submitted(receipt) => {
                    self.status = None;
                    self.stage = Stage::Submitted(receipt);
                }
                SubmitOutcome::Blocked(missing) => {
                    self.stage = Stage::Blocked(missing);
                }
            },
        }
        Ok(FlowSignal::Continue)
    }

    fn retreat(&mut self) {
        match self.session.retreat() {
            Navigation::Moved { .. } => {
                self.status = None;
                self.sync_step_state();
            }
            Navigation::Rejected(NavigationRejection::NoTarget) => {
                self.status = Some("You are on the first step.".to_string());
            }
            Navigation::Rejected(reason) => {
                self.status = Some(rejection_message(reason).to_string());
            }
        }
    }

    fn on_key_text(&mut self, key: KeyEvent) -> Result<FlowSignal> {
        let Some((name, masked)) = self
            .focused_field()
            .map(|field| (field.name.clone(), matches!(field.kind, FieldKind::Phone)))
        else {
            return Ok(FlowSignal::Continue);
        };
        let Some(editor) = self.editors.get_mut(&name) else {
            return Ok(FlowSignal::Continue);
        };

        let before = editor.value().to_string();
        if editor.handle_event(&Event::Key(key)).is_none() {
            return Ok(FlowSignal::Continue);
        }

        let edited = editor.value().to_string();
        let raw = if masked
            && edited.len() < before.len()
            && digits_only(&edited).len() == digits_only(&before).len()
        {
            drop_digit_before(&edited, editor.cursor())
        } else {
            edited.clone()
        };
        let display = self.session.input(&name, &raw)?;
        if display != edited {
            self.editors.insert(name, Input::new(display));
        }
        Ok(FlowSignal::Continue)
    }

    fn on_key_options(&mut self, key: KeyEvent, multi: bool) -> Result<FlowSignal> {
        let Some(field) = self.focused_field().cloned() else {
            return Ok(FlowSignal::Continue);
        };
        let options = field.options();
        if options.is_empty() {
            return Ok(FlowSignal::Continue);
        }

        let cursor = self.option_cursor(&field.name);
        if keymap::is_up(key) {
            self.option_cursor
                .insert(field.name.clone(), cursor.saturating_sub(1));
            return Ok(FlowSignal::Continue);
        }

        if keymap::is_down(key) {
            let next = (cursor + 1).min(options.len() - 1);
            self.option_cursor.insert(field.name.clone(), next);
            return Ok(FlowSignal::Continue);
        }

        if keymap::is_toggle(key)
            && let Some(option) = options.get(cursor)
        {
            if multi {
                self.session.toggle(&field.name, &option.value)?;
            } else {
                self.session.choose(&field.name, &option.value)?;
                self.status = None;
            }
        }

        Ok(FlowSignal::Continue)
    }

    fn on_key_slider(&mut self, key: KeyEvent) -> Result<FlowSignal> {
        let Some(name) = self.focused_field().map(|field| field.name.clone()) else {
            return Ok(FlowSignal::Continue);
        };

        if keymap::is_left(key) {
            self.session.nudge_slider(&name, -1)?;
        } else if keymap::is_right(key) {
            self.session.nudge_slider(&name, 1)?;
        }
        Ok(FlowSignal::Continue)
    }

    fn on_key_consent(&mut self, key: KeyEvent) -> Result<FlowSignal> {
        let Some(name) = self.focused_field().map(|field| field.name.clone()) else {
            return Ok(FlowSignal::Continue);
        };

        if keymap::is_toggle(key) {
            let checked = matches!(
                self.session.values().get(&name),
                Some(FieldValue::Consent(true))
            );
            self.session.set_consent(&name, !checked)?;
        }
        Ok(FlowSignal::Continue)
    }
}

/// Removes the digit in front of `cursor`, for edits that only deleted mask
/// punctuation.
fn drop_digit_before(raw: &str, cursor: usize) -> String {
    let preceding = raw
        .chars()
        .take(cursor)
        .filter(char::is_ascii_digit)
        .count();
    let mut digits = digits_only(raw);
    if preceding > 0 {
        digits.remove(preceding - 1);
    }
    digits
}
