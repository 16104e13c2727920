//! End-of-quiz screen for the player.

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Padding, Paragraph};

use crate::client::state::{Indicator, SessionState};

const QUESTION_PREVIEW_LENGTH: usize = 45;

/// Render the results screen.
pub fn render(frame: &mut Frame, area: Rect, state: &SessionState) {
    let chunks = Layout::vertical([
        Constraint::Length(6), // Summary
        Constraint::Min(5),    // Per-question breakdown
        Constraint::Length(2), // Controls
    ])
    .margin(1)
    .split(area);

    render_summary(frame, chunks[0], state);
    render_answers(frame, chunks[1], state);
    render_controls(frame, chunks[2], state);
}

fn render_summary(frame: &mut Frame, area: Rect, state: &SessionState) {
    let correct = state
        .questions
        .iter()
        .filter(|q| Indicator::of(q) == Indicator::Correct)
        .count();
    let total = state.total_questions();

    let percentage = if total > 0 {
        (correct as f64 / total as f64) * 100.0
    } else {
        0.0
    };

    let grade_color = match percentage as u32 {
        90..=100 => Color::Green,
        70..=89 => Color::Cyan,
        50..=69 => Color::Yellow,
        _ => Color::Red,
    };

    let finished = state
        .last_feedback
        .as_ref()
        .map(|f| f.text.clone())
        .unwrap_or_else(|| state.config.text("quiz_finished"));

    let content = vec![
        Line::from(""),
        Line::from(Span::styled(
            finished,
            Style::default().fg(Color::Cyan).bold(),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!("{} / {}  ({:.0}%)", correct, total, percentage),
            Style::default().fg(grade_color).bold(),
        )),
        Line::from(""),
    ];

    let widget = Paragraph::new(content).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Color::DarkGray),
    );

    frame.render_widget(widget, area);
}

fn render_answers(frame: &mut Frame, area: Rect, state: &SessionState) {
    let lines: Vec<Line> = state
        .questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let indicator = Indicator::of(question);
            let color = match indicator {
                Indicator::Correct => Color::Green,
                Indicator::Incorrect => Color::Red,
                Indicator::Skipped => Color::Yellow,
                Indicator::Unanswered => Color::DarkGray,
            };

            Line::from(vec![
                Span::styled(
                    format!(" {} ", state.config.text(indicator.icon_key())),
                    Style::default().fg(color),
                ),
                Span::styled(
                    format!("{:2}. ", index + 1),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(
                    truncate_question(&question.title),
                    Style::default().fg(Color::Gray),
                ),
            ])
        })
        .collect();

    let widget = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(" Your Answers ")
            .title_style(Style::default().fg(Color::Cyan))
            .padding(Padding::horizontal(1)),
    );

    frame.render_widget(widget, area);
}

fn render_controls(frame: &mut Frame, area: Rect, state: &SessionState) {
    let widget = Paragraph::new(state.config.text("back_to_home"))
        .alignment(Alignment::Center)
        .fg(Color::DarkGray);

    frame.render_widget(widget, area);
}

fn truncate_question(text: &str) -> String {
    let char_count = text.chars().count();
    if char_count > QUESTION_PREVIEW_LENGTH {
        let truncated: String = text.chars().take(QUESTION_PREVIEW_LENGTH).collect();
        format!("{}...", truncated)
    } else {
        text.to_string()
    }
}
