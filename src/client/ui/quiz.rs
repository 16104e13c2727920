//! Question screen for the player.

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Gauge, Padding, Paragraph, Wrap};

use crate::client::player::PlayerApp;
use crate::client::state::{FeedbackKind, ProgressClass, SessionState};
use crate::models::Question;

/// Render the question screen.
pub fn render(frame: &mut Frame, area: Rect, app: &PlayerApp) {
    let state = &app.snapshot;
    let Some(question) = state.current_question() else {
        return;
    };

    let chunks = Layout::vertical([
        Constraint::Length(1), // Answers + progress
        Constraint::Length(1), // Progress segments
        Constraint::Length(1), // Timer
        Constraint::Length(5), // Question title
        Constraint::Min(5),    // Options
        Constraint::Length(4), // Feedback
        Constraint::Length(1), // Controls
    ])
    .margin(1)
    .split(area);

    render_header(frame, chunks[0], state);
    render_segments(frame, chunks[1], state);
    render_timer(frame, chunks[2], state);
    render_title(frame, chunks[3], &question.title);
    render_options(frame, chunks[4], state, question, app.cursor());
    render_feedback(frame, chunks[5], state);
    render_controls(frame, chunks[6]);
}

fn render_header(frame: &mut Frame, area: Rect, state: &SessionState) {
    let answers = state
        .config
        .format("answers_count", &[&state.answered_count()]);
    let progress = state.config.format(
        "question_progress",
        &[&(state.current_index + 1), &state.total_questions()],
    );

    let line = Line::from(vec![
        Span::styled(answers, Style::default().fg(Color::Gray)),
        Span::styled("  ·  ", Style::default().fg(Color::DarkGray)),
        Span::styled(progress, Style::default().fg(Color::Cyan).bold()),
    ]);

    frame.render_widget(Paragraph::new(line).alignment(Alignment::Center), area);
}

fn render_segments(frame: &mut Frame, area: Rect, state: &SessionState) {
    let spans: Vec<Span> = (0..state.total_questions())
        .map(|index| {
            let icon = state.indicator_icon(index).unwrap_or_default();
            let style = match state.progress_class(index) {
                ProgressClass::Past => Style::default().fg(Color::DarkGray),
                ProgressClass::Current => Style::default().fg(Color::Cyan).bold().underlined(),
                ProgressClass::Future => Style::default().fg(Color::Gray),
            };
            Span::styled(format!(" {} ", icon), style)
        })
        .collect();

    frame.render_widget(
        Paragraph::new(Line::from(spans)).alignment(Alignment::Center),
        area,
    );
}

fn render_timer(frame: &mut Frame, area: Rect, state: &SessionState) {
    let color = match state.time_left {
        0..=3 => Color::Red,
        4..=7 => Color::Yellow,
        _ => Color::Cyan,
    };

    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(color).bg(Color::Black))
        .ratio(state.timer_fraction().clamp(0.0, 1.0))
        .label(state.config.format("timer_format", &[&state.time_left]));

    frame.render_widget(gauge, area);
}

fn render_title(frame: &mut Frame, area: Rect, title: &str) {
    let widget = Paragraph::new(title)
        .wrap(Wrap { trim: true })
        .style(Style::default().fg(Color::White))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .padding(Padding::horizontal(1)),
        );

    frame.render_widget(widget, area);
}

fn render_options(
    frame: &mut Frame,
    area: Rect,
    state: &SessionState,
    question: &Question,
    cursor: usize,
) {
    let disabled = state.is_option_disabled();

    let lines: Vec<Line> = question
        .options
        .iter()
        .enumerate()
        .map(|(i, option)| {
            let under_cursor = i == cursor && !disabled;
            let chosen = state.selected_option == Some(option.id);
            let prefix = if under_cursor { "> " } else { "  " };

            let style = if chosen {
                Style::default().fg(Color::Yellow).bold()
            } else if disabled {
                Style::default().fg(Color::DarkGray)
            } else if under_cursor {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::White)
            };

            Line::from(vec![
                Span::styled(prefix, style),
                Span::styled(option.text.clone(), style),
            ])
        })
        .collect();

    let widget = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(" Options ")
            .title_style(Style::default().fg(Color::Cyan))
            .padding(Padding::horizontal(1)),
    );

    frame.render_widget(widget, area);
}

fn render_feedback(frame: &mut Frame, area: Rect, state: &SessionState) {
    let Some(feedback) = &state.last_feedback else {
        return;
    };

    let color = match feedback.kind {
        FeedbackKind::Correct => Color::Green,
        FeedbackKind::Incorrect | FeedbackKind::SubmitError | FeedbackKind::Error => Color::Red,
        FeedbackKind::TimedOut | FeedbackKind::Info => Color::Yellow,
    };

    let mut lines = vec![Line::from(Span::styled(
        feedback.text.clone(),
        Style::default().fg(color).bold(),
    ))];
    if let Some(explanation) = state.visible_explanation() {
        lines.push(Line::from(Span::styled(
            explanation.to_string(),
            Style::default().fg(Color::Gray).italic(),
        )));
    }

    let widget = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(widget, area);
}

fn render_controls(frame: &mut Frame, area: Rect) {
    let widget = Paragraph::new("j/k or arrows to move  ·  Enter/Space to answer  ·  q quit")
        .alignment(Alignment::Center)
        .fg(Color::DarkGray);

    frame.render_widget(widget, area);
}
