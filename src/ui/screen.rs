use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};
use taboo::engine::{Phase, Scheduler};

use crate::{
    ui::{
        render_legend, render_podium, render_scores, render_word_card, status_line,
        timer::TimerGauge, turn_line,
    },
    App,
};

/// A UI Screen boundary: one per group of phases
pub trait Screen<S: Scheduler> {
    fn render(&self, app: &App<S>, area: Rect, buf: &mut Buffer);
}

/// Before the first round: who is playing and who goes first
pub struct LobbyScreen;

impl<S: Scheduler> Screen<S> for LobbyScreen {
    fn render(&self, app: &App<S>, area: Rect, buf: &mut Buffer) {
        let session = app.engine.session();
        let phase = app.engine.phase();

        let [status, _, cards, intro, _, legend] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(area);

        status_line(session).render(status, buf);
        render_scores(session, cards, buf);

        let first = session.players.first().map(String::as_str).unwrap_or("-");
        Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                format!("{first} goes first"),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(format!(
                "{} seconds per turn, {} skips each",
                session.total_time, session.skips_per_round
            )),
        ])
        .alignment(Alignment::Center)
        .render(intro, buf);

        render_legend(session, phase, legend, buf);
    }
}

/// A round in progress, including pauses, pending words and the round break
pub struct GameScreen;

impl<S: Scheduler> Screen<S> for GameScreen {
    fn render(&self, app: &App<S>, area: Rect, buf: &mut Buffer) {
        let session = app.engine.session();
        let phase = app.engine.phase();

        let [status, turn, cards, word, timer, legend] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .areas(area);

        status_line(session).render(status, buf);
        if !session.round_ended {
            turn_line(session).render(turn, buf);
        }
        render_scores(session, cards, buf);
        render_word_card(session, phase, word, buf);
        TimerGauge {
            time_left: session.time_left,
            total_time: session.total_time,
            frozen: phase != Phase::Active,
        }
        .render(timer, buf);
        render_legend(session, phase, legend, buf);
    }
}

pub struct ResultsScreen;

impl<S: Scheduler> Screen<S> for ResultsScreen {
    fn render(&self, app: &App<S>, area: Rect, buf: &mut Buffer) {
        let session = app.engine.session();

        let [podium, legend] =
            Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).areas(area);

        render_podium(session, podium, buf);
        render_legend(session, Phase::GameEnded, legend, buf);
    }
}

/// Helper to construct the appropriate screen for the current phase
pub fn current_screen<S: Scheduler>(phase: Phase) -> Box<dyn Screen<S>> {
    match phase {
        Phase::Idle | Phase::Ready => Box::new(LobbyScreen),
        Phase::GameEnded => Box::new(ResultsScreen),
        Phase::AwaitingWord
        | Phase::Active
        | Phase::Paused
        | Phase::WordUnavailable
        | Phase::RoundEnded => Box::new(GameScreen),
    }
}
