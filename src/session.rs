use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::words::WordHistory;

pub const DEFAULT_TOTAL_ROUNDS: u32 = 3;
pub const DEFAULT_SECONDS_PER_TURN: u32 = 60;
pub const DEFAULT_SKIPS_PER_TURN: u32 = 3;

/// How many words a player may pass on during one turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Skips {
    Limited(u32),
    Unlimited,
}

impl Skips {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Skips::Limited(0))
    }

    /// Spend one skip. Returns None when nothing is left to spend.
    pub fn consume(self) -> Option<Skips> {
        match self {
            Skips::Limited(0) => None,
            Skips::Limited(n) => Some(Skips::Limited(n - 1)),
            Skips::Unlimited => Some(Skips::Unlimited),
        }
    }

    /// True when `self` is within the allowance `limit`
    pub fn fits_within(&self, limit: &Skips) -> bool {
        match (self, limit) {
            (_, Skips::Unlimited) => true,
            (Skips::Limited(n), Skips::Limited(max)) => n <= max,
            (Skips::Unlimited, Skips::Limited(_)) => false,
        }
    }
}

impl Default for Skips {
    fn default() -> Self {
        Skips::Limited(DEFAULT_SKIPS_PER_TURN)
    }
}

impl fmt::Display for Skips {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Skips::Limited(n) => write!(f, "{n}"),
            Skips::Unlimited => write!(f, "∞"),
        }
    }
}

impl FromStr for Skips {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "unlimited" | "inf" | "∞" => Ok(Skips::Unlimited),
            other => other
                .parse::<u32>()
                .map(Skips::Limited)
                .map_err(|_| format!("expected a number or 'unlimited', got '{s}'")),
        }
    }
}

/// The whole game as seen by every screen. One instance lives for one game.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub players: Vec<String>,
    pub scores: Vec<u32>,
    pub current_round: u32,
    pub total_rounds: u32,
    pub current_player_index: Option<usize>,
    pub current_turn: usize,
    pub current_word: Option<String>,
    pub taboo_words: Vec<String>,
    pub words_used: WordHistory,
    pub is_generating_word: bool,
    pub is_paused: bool,
    pub round_ended: bool,
    pub time_left: u32,
    pub total_time: u32,
    pub skips_per_round: Skips,
    pub current_skips: Skips,
    pub category: String,
    pub difficulty: String,
    pub language: String,
    pub game_active: bool,
    // Set once the game has been ended (last round played or quit)
    pub finished: bool,
    // Set when word generation gave up after the retry ceiling
    pub word_error: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            players: Vec::new(),
            scores: Vec::new(),
            current_round: 0,
            total_rounds: DEFAULT_TOTAL_ROUNDS,
            current_player_index: None,
            current_turn: 0,
            current_word: None,
            taboo_words: Vec::new(),
            words_used: WordHistory::default(),
            is_generating_word: false,
            is_paused: false,
            round_ended: false,
            time_left: DEFAULT_SECONDS_PER_TURN,
            total_time: DEFAULT_SECONDS_PER_TURN,
            skips_per_round: Skips::default(),
            current_skips: Skips::default(),
            category: "general".to_string(),
            difficulty: "medium".to_string(),
            language: "english".to_string(),
            game_active: false,
            finished: false,
            word_error: None,
        }
    }
}

impl Session {
    pub fn current_player(&self) -> Option<&str> {
        self.current_player_index
            .and_then(|idx| self.players.get(idx))
            .map(String::as_str)
    }

    pub fn current_score(&self) -> Option<u32> {
        self.current_player_index
            .and_then(|idx| self.scores.get(idx))
            .copied()
    }

    /// Players paired with their scores, best first. Ties keep seating order.
    pub fn standings(&self) -> Vec<(&str, u32)> {
        use itertools::Itertools;

        self.players
            .iter()
            .map(String::as_str)
            .zip(self.scores.iter().copied())
            .sorted_by(|a, b| b.1.cmp(&a.1))
            .collect()
    }

    pub fn is_last_round(&self) -> bool {
        self.current_round >= self.total_rounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skips_consume_counts_down_to_none() {
        let skips = Skips::Limited(1);
        let skips = skips.consume().unwrap();
        assert_eq!(skips, Skips::Limited(0));
        assert!(skips.is_exhausted());
        assert_eq!(skips.consume(), None);
    }

    #[test]
    fn test_unlimited_skips_never_run_out() {
        let mut skips = Skips::Unlimited;
        for _ in 0..100 {
            skips = skips.consume().unwrap();
        }
        assert_eq!(skips, Skips::Unlimited);
        assert!(!skips.is_exhausted());
    }

    #[test]
    fn test_skips_from_str() {
        assert_eq!("5".parse::<Skips>(), Ok(Skips::Limited(5)));
        assert_eq!(" unlimited ".parse::<Skips>(), Ok(Skips::Unlimited));
        assert_eq!("INF".parse::<Skips>(), Ok(Skips::Unlimited));
        assert!("lots".parse::<Skips>().is_err());
        assert!("-1".parse::<Skips>().is_err());
    }

    #[test]
    fn test_skips_display() {
        assert_eq!(Skips::Limited(2).to_string(), "2");
        assert_eq!(Skips::Unlimited.to_string(), "∞");
    }

    #[test]
    fn test_skips_fits_within() {
        assert!(Skips::Limited(2).fits_within(&Skips::Limited(3)));
        assert!(!Skips::Limited(4).fits_within(&Skips::Limited(3)));
        assert!(Skips::Unlimited.fits_within(&Skips::Unlimited));
        assert!(!Skips::Unlimited.fits_within(&Skips::Limited(3)));
    }

    #[test]
    fn test_skips_serde_shape() {
        let json = serde_json::to_string(&Skips::Limited(3)).unwrap();
        assert_eq!(json, r#"{"limited":3}"#);
        let json = serde_json::to_string(&Skips::Unlimited).unwrap();
        assert_eq!(json, r#""unlimited""#);
    }

    #[test]
    fn test_default_session_is_idle() {
        let session = Session::default();
        assert!(!session.game_active);
        assert_eq!(session.current_player_index, None);
        assert_eq!(session.current_round, 0);
        assert_eq!(session.total_rounds, 3);
        assert_eq!(session.time_left, 60);
        assert_eq!(session.current_skips, Skips::Limited(3));
        assert!(session.words_used.is_empty());
    }

    #[test]
    fn test_standings_sorted_by_score() {
        let session = Session {
            players: vec!["Ana".into(), "Ben".into(), "Cy".into()],
            scores: vec![2, 5, 2],
            ..Default::default()
        };
        assert_eq!(session.standings(), vec![("Ben", 5), ("Ana", 2), ("Cy", 2)]);
    }

    #[test]
    fn test_current_player_lookup() {
        let mut session = Session {
            players: vec!["Ana".into(), "Ben".into()],
            scores: vec![0, 4],
            ..Default::default()
        };
        assert_eq!(session.current_player(), None);
        session.current_player_index = Some(1);
        assert_eq!(session.current_player(), Some("Ben"));
        assert_eq!(session.current_score(), Some(4));
    }
}
