//! The single screen of an interactive session.
//!
//! [`ScreenView`] is assembled from the stepper and the content resolver
//! without touching the terminal; [`render`] only draws it.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Wrap},
    Frame,
};

use super::keybindings::SHORTCUTS;
use crate::content::ContentResolver;
use crate::progress::{self, Progress, StepContext};
use crate::sequence::{Selector, StepKind};
use crate::session::{Phase, Stepper};

const BEAD_DONE: char = '●';
const BEAD_CURRENT: char = '◉';
const BEAD_PENDING: char = '○';
const CROSS: char = '✚';

/// Resolved text and progress for one frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScreenView {
    pub heading: String,
    /// e.g. "Mystery 3 of 5"; only on group steps
    pub caption: Option<String>,
    pub step_label: String,
    pub title: String,
    pub text: String,
    pub response: Option<String>,
    pub beads: String,
    pub percentage: u8,
    /// Bell toggle; `None` when no bell is installed
    pub haptics: Option<bool>,
    /// Digits typed after `g`
    pub jump_input: Option<String>,
    pub status: Option<String>,
}

impl ScreenView {
    pub fn build<S: Selector>(stepper: &Stepper<S>, content: &dyn ContentResolver) -> Self {
        let mut view = ScreenView {
            haptics: stepper
                .haptics_available()
                .then(|| stepper.haptics_enabled()),
            ..ScreenView::default()
        };
        let empty = StepContext::default();

        match stepper.phase() {
            Phase::Idle => {
                view.text = content.resolve("messages.idle", &empty);
            }
            Phase::Completed => {
                view.title = content.resolve("titles.completed", &empty);
                view.text = content.resolve("messages.completed", &empty);
                if let Some(progress) = stepper.progress() {
                    view.step_label = format!("{} of {}", progress.total, progress.total);
                    view.beads = bead_line(&progress, stepper.shape().group_size);
                    view.percentage = progress.percentage;
                }
            }
            Phase::Active => {
                let (Some(sequence), Some(visible), Some(progress)) =
                    (stepper.sequence(), stepper.visible_step(), stepper.progress())
                else {
                    return view;
                };
                let step = visible.step;
                let context = progress::step_context(sequence, visible.index).unwrap_or_default();

                let heading_key = match (step.selector(), step.kind()) {
                    (Some(selector), _) => format!("sets.{}", selector.key()),
                    (None, StepKind::ClosingFixed) => "sets.closing".to_string(),
                    (None, _) => "sets.opening".to_string(),
                };
                view.heading = content.resolve(&heading_key, &context);
                view.caption = step
                    .group_position()
                    .map(|_| content.resolve("captions.group", &context));
                view.step_label = format!("Step {} of {}", visible.index + 1, visible.total);
                view.title = content.resolve(step.title_key(), &context);
                view.text = content.resolve(step.content_key(), &context);
                view.response = step
                    .alternate_content_key()
                    .map(|key| content.resolve(key, &context));
                view.beads = bead_line(&progress, sequence.shape().group_size);
                view.percentage = progress.percentage;
            }
        }

        view
    }
}

/// One glyph per group, crosses for the opening and closing blocks, and a
/// gap between selectors
pub fn bead_line(progress: &Progress, group_size: usize) -> String {
    let layout = &progress.layout;
    let mut line = String::new();

    if layout.leading.is_some() {
        line.push(CROSS);
        line.push(' ');
    }

    for (i, group) in layout.groups.iter().enumerate() {
        if i > 0 && group_size > 0 && i % group_size == 0 {
            line.push(' ');
        }
        let glyph = if progress.completed || group.span.end < progress.current_index {
            BEAD_DONE
        } else if group.span.contains(progress.current_index) {
            BEAD_CURRENT
        } else {
            BEAD_PENDING
        };
        line.push(glyph);
    }

    if layout.trailing.is_some() {
        line.push(' ');
        line.push(CROSS);
    }

    line
}

pub fn render(frame: &mut Frame, view: &ScreenView, show_help: bool) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_header(frame, view, chunks[0]);
    render_body(frame, view, chunks[1]);

    frame.render_widget(
        Paragraph::new(view.beads.as_str())
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Yellow)),
        chunks[2],
    );

    frame.render_widget(
        Gauge::default()
            .gauge_style(Style::default().fg(Color::Cyan))
            .percent(u16::from(view.percentage.min(100)))
            .label(format!("{}%", view.percentage)),
        chunks[3],
    );

    render_footer(frame, view, chunks[4]);

    if show_help {
        render_help(frame);
    }
}

fn render_header(frame: &mut Frame, view: &ScreenView, area: Rect) {
    let block = Block::default().borders(Borders::BOTTOM);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut spans = vec![Span::styled(
        view.heading.clone(),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if let Some(caption) = &view.caption {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            caption.clone(),
            Style::default().fg(Color::Gray),
        ));
    }

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(view.step_label.chars().count() as u16),
        ])
        .split(inner);

    frame.render_widget(Paragraph::new(Line::from(spans)), columns[0]);
    frame.render_widget(
        Paragraph::new(view.step_label.as_str())
            .alignment(Alignment::Right)
            .style(Style::default().fg(Color::DarkGray)),
        columns[1],
    );
}

fn render_body(frame: &mut Frame, view: &ScreenView, area: Rect) {
    let mut lines = vec![
        Line::from(Span::styled(
            view.title.clone(),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(view.text.clone()),
    ];

    if let Some(response) = &view.response {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            response.clone(),
            Style::default().add_modifier(Modifier::ITALIC),
        )));
    }

    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::NONE)),
        area,
    );
}

fn render_footer(frame: &mut Frame, view: &ScreenView, area: Rect) {
    let line = if let Some(digits) = &view.jump_input {
        Line::from(vec![
            Span::styled("Go to step: ", Style::default().fg(Color::Yellow)),
            Span::raw(digits.clone()),
            Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
        ])
    } else if let Some(status) = &view.status {
        Line::from(Span::styled(
            status.clone(),
            Style::default().fg(Color::Yellow),
        ))
    } else {
        let bell = match view.haptics {
            Some(true) => "  h bell (on)",
            Some(false) => "  h bell (off)",
            None => "",
        };
        Line::from(Span::styled(
            format!("→ next  ← back  g go to{bell}  ? help  q quit"),
            Style::default().fg(Color::DarkGray),
        ))
    };

    frame.render_widget(Paragraph::new(line), area);
}

fn render_help(frame: &mut Frame) {
    let area = centered_rect(60, 60, frame.area());
    frame.render_widget(Clear, area);

    let lines: Vec<Line> = SHORTCUTS
        .iter()
        .map(|shortcut| {
            Line::from(vec![
                Span::styled(
                    format!("{:<22}", shortcut.key_display()),
                    Style::default().fg(Color::Yellow),
                ),
                Span::raw(shortcut.description),
            ])
        })
        .collect();

    frame.render_widget(
        Paragraph::new(lines).block(Block::default().title(" Keys ").borders(Borders::ALL)),
        area,
    );
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Catalog;
    use crate::effects::SideEffects;
    use crate::persistence::{ManualClock, MemoryStore, SessionGateway};
    use crate::sequence::{Mystery, SequenceShape};
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::Arc;
    use std::time::Duration;

    fn stepper() -> Stepper<Mystery> {
        let gateway = SessionGateway::new(
            Arc::new(MemoryStore::new()),
            Arc::new(ManualClock::at(1_000_000)),
            "session",
            Duration::from_secs(12 * 3600),
        );
        Stepper::new(SequenceShape::default(), gateway, SideEffects::noop())
    }

    #[test]
    fn test_idle_view() {
        let view = ScreenView::build(&stepper(), &Catalog::default());
        assert!(view.text.contains("Press Enter to begin"));
        assert!(view.beads.is_empty());
    }

    #[test]
    fn test_opening_view() {
        let mut stepper = stepper();
        stepper.start(&[Mystery::Joyful]).unwrap();

        let view = ScreenView::build(&stepper, &Catalog::default());
        assert_eq!(view.heading, "Opening Prayers");
        assert_eq!(view.title, "Intention");
        assert_eq!(view.step_label, "Step 1 of 82");
        assert!(view.caption.is_none());
        assert_eq!(view.beads, "✚ ○○○○○ ✚");
    }

    #[test]
    fn test_group_view() {
        let mut stepper = stepper();
        stepper.start(&[Mystery::Sorrowful]).unwrap();
        // Second group announcement: 8 opening + one group width of 14
        stepper.jump_to(22);

        let view = ScreenView::build(&stepper, &Catalog::default());
        assert_eq!(view.heading, "Sorrowful Mysteries");
        assert_eq!(view.caption.as_deref(), Some("Mystery 2 of 5"));
        assert_eq!(view.title, "The Scourging at the Pillar");
        assert_eq!(view.text, "Mark 15:6-15");
        assert_eq!(view.beads, "✚ ●◉○○○ ✚");
        assert_eq!(view.percentage, 26);
    }

    #[test]
    fn test_repeated_prayer_title_has_ordinal() {
        let mut stepper = stepper();
        stepper.start(&[Mystery::Joyful]).unwrap();
        stepper.jump_to(8 + 3 + 4);

        let view = ScreenView::build(&stepper, &Catalog::default());
        assert_eq!(view.title, "Hail Mary 5 of 10");
        assert!(view.response.unwrap().starts_with("Holy Mary"));
    }

    #[test]
    fn test_completed_view() {
        let mut stepper = stepper();
        stepper.start(&[Mystery::Glorious]).unwrap();
        stepper.jump_to(81);
        stepper.advance();

        let view = ScreenView::build(&stepper, &Catalog::default());
        assert_eq!(view.title, "Rosary Complete");
        assert_eq!(view.percentage, 100);
        assert_eq!(view.beads, "✚ ●●●●● ✚");
    }

    #[test]
    fn test_complete_form_beads_are_grouped() {
        let mut stepper = stepper();
        stepper.start(&Mystery::complete()).unwrap();

        let view = ScreenView::build(&stepper, &Catalog::default());
        assert_eq!(view.beads, "✚ ○○○○○ ○○○○○ ○○○○○ ○○○○○ ✚");
    }

    #[test]
    fn test_render_draws_title() {
        let mut stepper = stepper();
        stepper.start(&[Mystery::Luminous]).unwrap();
        let view = ScreenView::build(&stepper, &Catalog::default());

        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|f| render(f, &view, true)).unwrap();

        let buffer = terminal.backend().buffer();
        let content: String = buffer.content().iter().map(|c| c.symbol()).collect();
        assert!(content.contains("Intention"));
        assert!(content.contains("Keys"));
    }
}
