use prequal_core::form::FieldValue;
use prequal_core::formatters::format_capped_currency;
use prequal_core::registry::{Field, FieldKind};
use prequal_core::wizard::{SectionState, SectionStatus};
use ratatui::layout::{Constraint, Direction, Layout, Margin, Rect};
use ratatui::style::{Color, Modifier};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Gauge, Paragraph};

use super::{Focus, Stage, WizardFlow};
use crate::theme;
use crate::ui::modal::{ModalTone, render_message_modal};
use crate::ui::text::{
    compact_hint, focus_line, key_hint_height, key_hint_paragraph, label_value_line,
    result_footer, wrapped_paragraph,
};

const SIDEBAR_WIDTH: u16 = 26;
const SUMMARY_WIDTH: u16 = 34;

impl WizardFlow {
    pub(super) fn render(&self, frame: &mut ratatui::Frame<'_>) {
        let key_text = self.key_text(frame.area().width);
        let [header_area, body_area, key_area] = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(key_hint_height(frame.area().width, key_text)),
            ])
            .areas(frame.area());

        self.render_header(frame, header_area);

        let [sidebar_area, step_area, summary_area] = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(SIDEBAR_WIDTH),
                Constraint::Min(30),
                Constraint::Length(SUMMARY_WIDTH),
            ])
            .areas(body_area);

        self.render_sidebar(frame, sidebar_area);
        self.render_step(frame, step_area);
        self.render_summary(frame, summary_area);

        frame.render_widget(
            key_hint_paragraph(key_text).block(theme::key_block()),
            key_area,
        );

        match &self.stage {
            Stage::Editing => {}
            Stage::Blocked(missing) => {
                let message = format!(
                    "Please fill in all required fields.\n\nMissing: {}",
                    self.missing_labels(missing).join(", ")
                );
                render_message_modal(
                    frame,
                    ModalTone::Notice,
                    "Missing information",
                    &message,
                    "Enter/Esc: back to the form",
                );
            }
            Stage::Submitted(receipt) => {
                let mut message = "Your pre-qualification request was submitted.".to_string();
                if let Some(path) = &receipt.path {
                    message.push_str(&format!("\n\nSaved to: {}", path.display()));
                }
                render_message_modal(
                    frame,
                    ModalTone::Success,
                    "Submitted",
                    &message,
                    result_footer(frame.area().width),
                );
            }
        }
    }

    fn key_text(&self, width: u16) -> &'static str {
        if self.focus == Focus::Sidebar {
            return compact_hint(
                width,
                "Up/Down or j/k: move    Enter: open section    Esc/F2: back to the form",
                "j/k: move    Enter: open    Esc/F2: back",
                "j/k move | Enter open | Esc back",
            );
        }

        match self.focused_field().map(|field| &field.kind) {
            Some(FieldKind::Choice { .. }) | Some(FieldKind::MultiChoice { .. }) => compact_hint(
                width,
                "Up/Down or j/k: move    Space: select    Tab: next field    Enter: continue    Esc: back    F2: sections",
                "j/k: move    Space: select    Tab: field    Enter: continue    Esc: back",
                "j/k | Space select | Enter next | Esc back",
            ),
            Some(FieldKind::Slider(_)) => compact_hint(
                width,
                "Left/Right or h/l: adjust    Tab: next field    Enter: continue    Esc: back    F2: sections",
                "h/l: adjust    Tab: field    Enter: continue    Esc: back",
                "h/l adjust | Enter next | Esc back",
            ),
            Some(FieldKind::Consent) => compact_hint(
                width,
                "Space: toggle    Tab: next field    Enter: continue    Esc: back    F2: sections",
                "Space: toggle    Tab: field    Enter: continue    Esc: back",
                "Space toggle | Enter next | Esc back",
            ),
            _ => compact_hint(
                width,
                "Type to edit    Tab: next field    Enter: continue    Esc: back    F2: sections",
                "Type    Tab: field    Enter: continue    Esc: back",
                "Type | Enter next | Esc back",
            ),
        }
    }

    fn render_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let controller = self.session.controller();
        let header = Line::from(vec![
            Span::styled("Pre-qualification", theme::focus_prompt()),
            Span::styled(
                format!(
                    "    Step {} of {}",
                    controller.current_index() + 1,
                    controller.visible().len()
                ),
                theme::secondary_text(),
            ),
        ]);
        frame.render_widget(Paragraph::new(header).block(theme::chrome("")), area);
    }

    fn render_sidebar(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let [list_area, gauge_area] = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(3)])
            .areas(area);

        let view = self.session.view();
        let lines = view
            .sections
            .iter()
            .enumerate()
            .map(|(index, status)| self.section_line(index, status))
            .collect::<Vec<_>>();
        frame.render_widget(
            Paragraph::new(Text::from(lines)).block(theme::chrome("Sections")),
            list_area,
        );

        let gauge = Gauge::default()
            .block(theme::chrome("Progress"))
            .gauge_style(theme::progress_gauge())
            .percent(u16::from(view.progress_percent))
            .label(format!("{}%", view.progress_percent));
        frame.render_widget(gauge, gauge_area);
    }

    fn section_line(&self, index: usize, status: &SectionStatus) -> Line<'static> {
        let marker = match status.state {
            _ if !status.is_visible() => "-",
            SectionState::Active => ">",
            SectionState::Complete => "✓",
            SectionState::Inactive => " ",
        };
        let text = format!("{marker} {}", status.title);

        if self.focus == Focus::Sidebar && index == self.sidebar_index {
            return Line::from(Span::styled(text, theme::table_highlight(Color::Yellow)));
        }
        Line::from(Span::styled(
            text,
            theme::section_state(status.state, status.is_visible()),
        ))
    }

    fn render_step(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let step = self.session.current_step();
        let title = Line::from(Span::styled(step.title.clone(), theme::focus_prompt()));
        frame.render_widget(theme::chrome(title), area);

        let inner = area.inner(Margin {
            vertical: 1,
            horizontal: 1,
        });
        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let mut lines = Vec::new();
        let mut cursor = None;
        for (index, field) in step.fields.iter().enumerate() {
            let focused = self.focus == Focus::Fields && index == self.field_index;
            if index > 0 {
                lines.push(Line::from(""));
            }
            lines.push(field_label(field, focused));

            if field.kind.is_text_input() {
                if focused {
                    cursor = Some(lines.len());
                }
                lines.push(self.text_line(field));
            } else {
                lines.extend(self.widget_lines(field, focused));
            }
        }

        if let Some(status) = &self.status {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                status.clone(),
                theme::error_prompt(),
            )));
        }

        frame.render_widget(Paragraph::new(Text::from(lines)), inner);

        if let Some(row) = cursor
            && let Some(editor) = self
                .focused_field()
                .and_then(|field| self.editors.get(&field.name))
            && row < inner.height as usize
            && self.stage == Stage::Editing
        {
            let width = inner.width.saturating_sub(2) as usize;
            let visual = editor.visual_cursor().min(width.saturating_sub(1));
            frame.set_cursor_position((inner.x + 2 + visual as u16, inner.y + row as u16));
        }
    }

    fn text_line(&self, field: &Field) -> Line<'static> {
        let value = self
            .editors
            .get(&field.name)
            .map(|editor| editor.value().to_string())
            .unwrap_or_default();
        let prefix = if matches!(field.kind, FieldKind::Currency) {
            "$ "
        } else {
            "  "
        };
        Line::from(format!("{prefix}{value}"))
    }

    fn widget_lines(&self, field: &Field, focused: bool) -> Vec<Line<'static>> {
        let value = self.session.values().get(&field.name);
        match &field.kind {
            FieldKind::Choice { options } | FieldKind::MultiChoice { options } => {
                let cursor = self.option_cursor(&field.name);
                options
                    .iter()
                    .enumerate()
                    .map(|(index, option)| {
                        let selected = match value {
                            Some(FieldValue::Choice(Some(chosen))) => chosen == &option.value,
                            Some(FieldValue::Multi(chosen)) => chosen.contains(&option.value),
                            _ => false,
                        };
                        let mark = match (&field.kind, selected) {
                            (FieldKind::MultiChoice { .. }, true) => "[x]",
                            (FieldKind::MultiChoice { .. }, false) => "[ ]",
                            (_, true) => "(*)",
                            (_, false) => "( )",
                        };
                        let pointer = if focused && index == cursor { ">" } else { " " };
                        let text = format!("{pointer} {mark} {}", option.value);
                        if focused && index == cursor {
                            Line::from(Span::styled(text, theme::table_highlight(Color::Green)))
                        } else {
                            Line::from(text)
                        }
                    })
                    .collect()
            }
            FieldKind::Slider(range) => {
                let amount = match value {
                    Some(FieldValue::Slider(amount)) => *amount,
                    _ => range.min,
                };
                vec![
                    Line::from(format!(
                        "  < {} >",
                        format_capped_currency(amount, range.cap)
                    )),
                    Line::from(Span::styled(
                        format!(
                            "  {} to {}",
                            format_capped_currency(range.min, None),
                            format_capped_currency(range.max, range.cap)
                        ),
                        theme::secondary_text(),
                    )),
                ]
            }
            FieldKind::Consent => {
                let checked = matches!(value, Some(FieldValue::Consent(true)));
                let mark = if checked { "[x]" } else { "[ ]" };
                vec![Line::from(format!("  {mark} {}", field.label))]
            }
            _ => Vec::new(),
        }
    }

    fn render_summary(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut lines = vec![focus_line("Your answers"), Line::from("")];
        lines.extend(
            self.session
                .summary()
                .into_iter()
                .map(|line| label_value_line(line.label, line.value)),
        );
        frame.render_widget(
            wrapped_paragraph(Text::from(lines)).block(theme::chrome("Summary")),
            area,
        );
    }
}

fn field_label(field: &Field, focused: bool) -> Line<'static> {
    let mut spans = vec![Span::raw(field.label.clone())];
    if field.required {
        spans.push(Span::styled(" *", theme::error_prompt()));
    }
    let line = Line::from(spans);
    if focused {
        line.style(theme::focus_prompt().add_modifier(Modifier::UNDERLINED))
    } else {
        line
    }
}
