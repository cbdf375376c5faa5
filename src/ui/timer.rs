use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Gauge, Widget},
};

/// Gauge colour for the seconds left in a turn: calm, hurry, panic
pub fn timer_color(time_left: u32) -> Color {
    match time_left {
        0..=10 => Color::Red,
        11..=30 => Color::Yellow,
        _ => Color::Blue,
    }
}

/// Countdown bar for the current turn
pub struct TimerGauge {
    pub time_left: u32,
    pub total_time: u32,
    pub frozen: bool,
}

impl TimerGauge {
    pub fn ratio(&self) -> f64 {
        if self.total_time == 0 {
            return 0.0;
        }
        (self.time_left as f64 / self.total_time as f64).clamp(0.0, 1.0)
    }
}

impl Widget for TimerGauge {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut style = Style::default().fg(timer_color(self.time_left));
        if self.frozen {
            style = style.add_modifier(Modifier::DIM);
        }

        Gauge::default()
            .block(Block::default().borders(Borders::ALL).title("Time"))
            .gauge_style(style)
            .ratio(self.ratio())
            .label(format!("{} sec", self.time_left))
            .render(area, buf);
    }
}
