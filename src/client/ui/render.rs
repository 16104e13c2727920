//! Main player UI renderer.

use ratatui::prelude::*;
use ratatui::widgets::{Block, Paragraph, Wrap};

use crate::client::player::PlayerApp;
use crate::client::state::{Phase, SessionState};

use super::{quiz, results};

/// Render the player UI for the current phase.
pub fn render(frame: &mut Frame, app: &PlayerApp) {
    let area = frame.area();
    frame.render_widget(Block::default().bg(Color::Reset), area);

    let state = &app.snapshot;
    match state.phase {
        Phase::Bootstrapping => render_loading(frame, area, state),
        Phase::InQuestion | Phase::AwaitingAdvance => quiz::render(frame, area, app),
        Phase::Finished => results::render(frame, area, state),
        Phase::NoQuestions => render_message(frame, area, state, Color::Yellow),
        Phase::ConfigFailed | Phase::SurveyMissing | Phase::TokenInvalid | Phase::LoadFailed => {
            render_message(frame, area, state, Color::Red)
        }
    }
}

fn render_loading(frame: &mut Frame, area: Rect, state: &SessionState) {
    let chunks = Layout::vertical([
        Constraint::Percentage(40),
        Constraint::Length(5),
        Constraint::Percentage(40),
    ])
    .split(area);

    let key = if state.config_loaded {
        "loading_questions"
    } else {
        "loading_config"
    };

    let content = vec![
        Line::from(""),
        Line::from(Span::styled(
            "RUST QUIZ",
            Style::default().fg(Color::Cyan).bold(),
        )),
        Line::from(""),
        Line::from(Span::styled(
            state.config.text(key),
            Style::default().fg(Color::Yellow),
        )),
    ];

    let widget = Paragraph::new(content).alignment(Alignment::Center);
    frame.render_widget(widget, chunks[1]);
}

/// Full-screen message for phases the quiz cannot continue from.
fn render_message(frame: &mut Frame, area: Rect, state: &SessionState, color: Color) {
    let chunks = Layout::vertical([
        Constraint::Percentage(40),
        Constraint::Length(9),
        Constraint::Percentage(40),
    ])
    .split(area);

    let message = state
        .last_feedback
        .as_ref()
        .map(|f| f.text.clone())
        .unwrap_or_default();

    let content = vec![
        Line::from(""),
        Line::from(Span::styled(
            "RUST QUIZ",
            Style::default().fg(Color::Cyan).bold(),
        )),
        Line::from(""),
        Line::from(Span::styled(message, Style::default().fg(color).bold())),
        Line::from(""),
        Line::from(""),
        Line::from(Span::styled(
            state.config.text("back_to_home"),
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(""),
    ];

    let widget = Paragraph::new(content)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(widget, chunks[1]);
}
