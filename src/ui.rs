pub mod screen;
pub mod timer;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Layout, Margin, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};
use taboo::{
    engine::{FeedbackKind, Phase, Scheduler},
    session::Session,
};

use crate::{App, Toast};

const HORIZONTAL_MARGIN: u16 = 2;
const VERTICAL_MARGIN: u16 = 1;

impl<S: Scheduler> Widget for &App<S> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = area.inner(Margin::new(HORIZONTAL_MARGIN, VERTICAL_MARGIN));
        screen::current_screen::<S>(self.engine.phase()).render(self, inner, buf);

        if let Some(toast) = &self.toast {
            render_toast(toast, area, buf);
        }
    }
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

/// Round counter shown at the top of every in-game screen. Before the first
/// round it announces the round about to start.
pub fn status_line(session: &Session) -> Paragraph<'static> {
    let round = session.current_round.max(1);
    let mut spans = vec![Span::styled(
        format!("Round {} of {}", round, session.total_rounds),
        bold(),
    )];
    if session.current_round > 0 && session.is_last_round() {
        spans.push(Span::styled(
            "  final round",
            Style::default().fg(Color::Magenta),
        ));
    }
    spans.push(Span::styled(
        format!(
            "   {} · {} · {}",
            session.category, session.difficulty, session.language
        ),
        dim(),
    ));

    Paragraph::new(Line::from(spans)).alignment(Alignment::Center)
}

pub fn turn_line(session: &Session) -> Paragraph<'static> {
    let Some(player) = session.current_player() else {
        return Paragraph::new("");
    };

    let skips = if session.current_skips.is_exhausted() {
        Span::styled("   no skips left", Style::default().fg(Color::Red))
    } else {
        Span::raw(format!("   skips left {}", session.current_skips))
    };

    Paragraph::new(Line::from(vec![
        Span::styled(format!("{player}'s turn"), bold().fg(Color::Cyan)),
        Span::raw(format!(
            "   score {}",
            session.current_score().unwrap_or(0)
        )),
        skips,
    ]))
    .alignment(Alignment::Center)
}

pub fn render_scores(session: &Session, area: Rect, buf: &mut Buffer) {
    if session.players.is_empty() {
        return;
    }

    let count = session.players.len() as u32;
    let cards = Layout::horizontal((0..count).map(|_| Constraint::Ratio(1, count))).split(area);

    for (idx, (name, card)) in session.players.iter().zip(cards.iter()).enumerate() {
        let score = session.scores.get(idx).copied().unwrap_or(0);
        let border = if session.current_player_index == Some(idx) && !session.round_ended {
            Style::default().fg(Color::Yellow)
        } else {
            dim()
        };

        Paragraph::new(Span::styled(score.to_string(), bold()))
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border)
                    .title(name.as_str())
                    .title_alignment(Alignment::Center),
            )
            .render(*card, buf);
    }
}

/// The card in the middle of the game screen: the word and its forbidden
/// words, or whatever stands in for them in the current phase
pub fn render_word_card(session: &Session, phase: Phase, area: Rect, buf: &mut Buffer) {
    let warning = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);

    let lines = match phase {
        Phase::AwaitingWord => vec![Line::from(Span::styled(
            "Generating word...",
            dim().add_modifier(Modifier::ITALIC),
        ))],
        Phase::Paused => vec![
            Line::from(Span::styled("PAUSED", warning)),
            Line::from(""),
            Line::from(Span::styled("the clock is stopped", dim())),
        ],
        Phase::WordUnavailable => vec![
            Line::from(Span::styled(
                "Could not get a word",
                bold().fg(Color::Red),
            )),
            Line::from(""),
            Line::from(Span::styled(
                session.word_error.clone().unwrap_or_default(),
                dim(),
            )),
        ],
        Phase::RoundEnded => {
            let next = if session.is_last_round() {
                "press (n) for the results"
            } else {
                "press (n) for the next round"
            };
            vec![
                Line::from(Span::styled(
                    format!("Round {} complete!", session.current_round),
                    warning,
                )),
                Line::from(""),
                Line::from(Span::styled(next, dim())),
            ]
        }
        _ => {
            let mut lines = vec![
                Line::from(Span::styled(
                    session.current_word.clone().unwrap_or_default(),
                    bold().fg(Color::Green),
                )),
                Line::from(""),
                Line::from(Span::styled("don't say", dim())),
            ];
            lines.extend(session.taboo_words.iter().map(|word| {
                Line::from(Span::styled(
                    word.clone(),
                    Style::default().fg(Color::Red),
                ))
            }));
            lines
        }
    };

    let height = lines.len() as u16;
    let block = Block::default().borders(Borders::ALL).title("Word");
    let inner = block.inner(area);
    block.render(area, buf);

    let top = inner.height.saturating_sub(height) / 2;
    let body = Rect {
        y: inner.y + top,
        height: inner.height.saturating_sub(top),
        ..inner
    };
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(body, buf);
}

/// Final standings, best first
pub fn render_podium(session: &Session, area: Rect, buf: &mut Buffer) {
    let standings = session.standings();
    let tie = matches!(standings.as_slice(), [(_, a), (_, b), ..] if a == b);

    let mut lines = vec![
        Line::from(Span::styled("Game Over", bold().fg(Color::Magenta))),
        Line::from(""),
    ];
    if tie {
        lines.push(Line::from(Span::styled(
            "It's a tie!",
            Style::default().fg(Color::Yellow),
        )));
        lines.push(Line::from(""));
    }

    for (place, (name, score)) in standings.iter().enumerate() {
        let style = match place {
            0 => bold().fg(Color::Yellow),
            1 | 2 => bold(),
            _ => Style::default(),
        };
        let unit = if *score == 1 { "point" } else { "points" };
        lines.push(Line::from(Span::styled(
            format!("{}. {name}  {score} {unit}", place + 1),
            style,
        )));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!(
            "{} words played over {} rounds",
            session.words_used.len(),
            session.total_rounds
        ),
        dim(),
    )));

    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .render(area, buf);
}

pub fn legend(session: &Session, phase: Phase) -> &'static str {
    match phase {
        Phase::Idle => "(esc) quit",
        Phase::Ready => "(n) start round   (e) end game   (esc) quit",
        Phase::AwaitingWord => "(space) pause   (esc) quit",
        Phase::Active => "(c) correct   (s) pass   (space) pause   (esc) quit",
        Phase::Paused => "(space) resume   (e) end game   (esc) quit",
        Phase::WordUnavailable => "(r) retry   (space) pause   (e) end game   (esc) quit",
        Phase::RoundEnded if session.is_last_round() => "(n) results   (e) end game   (esc) quit",
        Phase::RoundEnded => "(n) next round   (e) end game   (esc) quit",
        Phase::GameEnded => "(r) play again   (n) new game   (q) quit",
    }
}

pub fn render_legend(session: &Session, phase: Phase, area: Rect, buf: &mut Buffer) {
    Paragraph::new(Span::styled(
        legend(session, phase),
        Style::default().add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center)
    .render(area, buf);
}

fn render_toast(toast: &Toast, area: Rect, buf: &mut Buffer) {
    let color = match toast.feedback.kind {
        FeedbackKind::Success => Color::Green,
        FeedbackKind::Warning => Color::Yellow,
        FeedbackKind::Error => Color::Red,
    };

    let width = (toast.feedback.message.chars().count() as u16 + 4).min(area.width);
    let height = area.height.min(3);
    let rect = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height).min(1),
        width,
        height,
    };

    Clear.render(rect, buf);
    Paragraph::new(Span::styled(
        toast.feedback.message.as_str(),
        bold().fg(color),
    ))
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color)),
    )
    .render(rect, buf);
}
