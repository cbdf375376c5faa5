use crate::session::{Session, Skips};
use crate::words::WordHistory;

/// A partial session: every `Some` field replaces the current value when
/// applied, every `None` field is left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionUpdate {
    pub players: Option<Vec<String>>,
    pub scores: Option<Vec<u32>>,
    pub current_round: Option<u32>,
    pub total_rounds: Option<u32>,
    pub current_player_index: Option<Option<usize>>,
    pub current_turn: Option<usize>,
    pub current_word: Option<Option<String>>,
    pub taboo_words: Option<Vec<String>>,
    pub words_used: Option<WordHistory>,
    pub is_generating_word: Option<bool>,
    pub is_paused: Option<bool>,
    pub round_ended: Option<bool>,
    pub time_left: Option<u32>,
    pub total_time: Option<u32>,
    pub skips_per_round: Option<Skips>,
    pub current_skips: Option<Skips>,
    pub category: Option<String>,
    pub difficulty: Option<String>,
    pub language: Option<String>,
    pub game_active: Option<bool>,
    pub finished: Option<bool>,
    pub word_error: Option<Option<String>>,
}

impl SessionUpdate {
    pub fn is_empty(&self) -> bool {
        *self == SessionUpdate::default()
    }

    fn merge_into(self, session: &mut Session) {
        fn set<T>(slot: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *slot = value;
            }
        }

        set(&mut session.players, self.players);
        set(&mut session.scores, self.scores);
        set(&mut session.current_round, self.current_round);
        set(&mut session.total_rounds, self.total_rounds);
        set(&mut session.current_player_index, self.current_player_index);
        set(&mut session.current_turn, self.current_turn);
        set(&mut session.current_word, self.current_word);
        set(&mut session.taboo_words, self.taboo_words);
        set(&mut session.words_used, self.words_used);
        set(&mut session.is_generating_word, self.is_generating_word);
        set(&mut session.is_paused, self.is_paused);
        set(&mut session.round_ended, self.round_ended);
        set(&mut session.time_left, self.time_left);
        set(&mut session.total_time, self.total_time);
        set(&mut session.skips_per_round, self.skips_per_round);
        set(&mut session.current_skips, self.current_skips);
        set(&mut session.category, self.category);
        set(&mut session.difficulty, self.difficulty);
        set(&mut session.language, self.language);
        set(&mut session.game_active, self.game_active);
        set(&mut session.finished, self.finished);
        set(&mut session.word_error, self.word_error);
    }
}

/// Anything that wants to hear about session changes (usually a screen)
pub trait SessionObserver {
    fn session_changed(&mut self, session: &Session, revision: u64);
}

impl<F> SessionObserver for F
where
    F: FnMut(&Session, u64),
{
    fn session_changed(&mut self, session: &Session, revision: u64) {
        self(session, revision)
    }
}

/// Single source of truth for the running game.
///
/// The only way to change the session is [`SessionStore::apply`] (or a full
/// [`SessionStore::reset`]); each call bumps the revision and notifies every
/// observer once.
pub struct SessionStore {
    session: Session,
    revision: u64,
    observers: Vec<Box<dyn SessionObserver>>,
}

impl SessionStore {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            revision: 0,
            observers: Vec::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn subscribe(&mut self, observer: Box<dyn SessionObserver>) {
        self.observers.push(observer);
    }

    pub fn apply(&mut self, update: SessionUpdate) {
        if update.is_empty() {
            return;
        }
        update.merge_into(&mut self.session);
        self.notify();
    }

    pub fn reset(&mut self, session: Session) {
        self.session = session;
        self.notify();
    }

    fn notify(&mut self) {
        self.revision += 1;
        for observer in self.observers.iter_mut() {
            observer.session_changed(&self.session, self.revision);
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(Session::default())
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("session", &self.session)
            .field("revision", &self.revision)
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_apply_merges_only_given_fields() {
        let mut store = SessionStore::default();
        store.apply(SessionUpdate {
            time_left: Some(12),
            is_paused: Some(true),
            ..Default::default()
        });

        let session = store.session();
        assert_eq!(session.time_left, 12);
        assert!(session.is_paused);
        assert_eq!(session.total_time, 60);
        assert_eq!(session.category, "general");
    }

    #[test]
    fn test_nested_options_can_clear_values() {
        let mut store = SessionStore::default();
        store.apply(SessionUpdate {
            current_word: Some(Some("CAT".into())),
            current_player_index: Some(Some(1)),
            ..Default::default()
        });
        assert_eq!(store.session().current_word.as_deref(), Some("CAT"));

        store.apply(SessionUpdate {
            current_word: Some(None),
            ..Default::default()
        });
        assert_eq!(store.session().current_word, None);
        assert_eq!(store.session().current_player_index, Some(1));
    }

    #[test]
    fn test_revision_bumps_per_apply() {
        let mut store = SessionStore::default();
        assert_eq!(store.revision(), 0);
        store.apply(SessionUpdate {
            round_ended: Some(true),
            ..Default::default()
        });
        store.reset(Session::default());
        assert_eq!(store.revision(), 2);
    }

    #[test]
    fn test_empty_update_is_silent() {
        let mut store = SessionStore::default();
        store.apply(SessionUpdate::default());
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn test_observers_see_merged_session() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);

        let mut store = SessionStore::default();
        store.subscribe(Box::new(move |session: &Session, revision: u64| {
            sink.borrow_mut().push((revision, session.time_left));
        }));

        store.apply(SessionUpdate {
            time_left: Some(59),
            ..Default::default()
        });
        store.apply(SessionUpdate {
            time_left: Some(58),
            ..Default::default()
        });

        assert_eq!(*seen.borrow(), vec![(1, 59), (2, 58)]);
    }
}
