//! Property-based tests: random command and event sequences must never break
//! the session invariants.

use std::time::Duration;

use proptest::prelude::*;
use taboo::{
    engine::{EngineEvent, GameSettings, Phase, RetryPolicy, TurnEngine},
    provider::ProviderError,
    runtime::ManualScheduler,
    session::{Session, Skips},
    words::WordSet,
};

#[derive(Debug, Clone, Copy)]
enum Op {
    Correct,
    Pass,
    TogglePause,
    Advance,
    EndGame,
    PlayAgain,
    RetryWord,
    Tick,
    StaleTick,
    DeliverWord,
    DeliverFailure,
    DeliverStale,
    RetryDue,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Correct),
        2 => Just(Op::Pass),
        1 => Just(Op::TogglePause),
        2 => Just(Op::Advance),
        1 => Just(Op::EndGame),
        1 => Just(Op::PlayAgain),
        1 => Just(Op::RetryWord),
        6 => Just(Op::Tick),
        1 => Just(Op::StaleTick),
        4 => Just(Op::DeliverWord),
        2 => Just(Op::DeliverFailure),
        1 => Just(Op::DeliverStale),
        1 => Just(Op::RetryDue),
    ]
}

fn skips() -> impl Strategy<Value = Skips> {
    prop_oneof![
        (0u32..4).prop_map(Skips::Limited),
        Just(Skips::Unlimited),
    ]
}

fn settings() -> impl Strategy<Value = GameSettings> {
    (1u32..4, 1u32..5, skips()).prop_map(|(total_rounds, seconds_per_turn, skips_per_turn)| {
        GameSettings {
            total_rounds,
            seconds_per_turn,
            skips_per_turn,
            ..Default::default()
        }
    })
}

fn word(n: usize) -> WordSet {
    WordSet::new(format!("word{n}"), ["a", "b", "c", "d", "e"]).unwrap()
}

fn apply(engine: &mut TurnEngine<ManualScheduler>, op: Op, n: usize) {
    let ticket = engine.fetch_ticket();
    // Rejections are fine here; the invariants are what is under test
    let _ = match op {
        Op::Correct => engine.correct_guess(),
        Op::Pass => engine.pass_word(),
        Op::TogglePause => engine.toggle_pause(),
        Op::Advance => engine.advance_round(),
        Op::EndGame => engine.end_game(),
        Op::PlayAgain => engine.play_again(),
        Op::RetryWord => engine.retry_word(),
        Op::Tick => {
            let generation = engine.timer_generation();
            engine.on_event(EngineEvent::TimerTick { generation });
            Ok(())
        }
        Op::StaleTick => {
            let generation = engine.timer_generation().saturating_sub(1);
            engine.on_event(EngineEvent::TimerTick { generation });
            Ok(())
        }
        Op::DeliverWord => {
            engine.on_event(EngineEvent::WordFetched {
                ticket,
                result: Ok(word(n)),
            });
            Ok(())
        }
        Op::DeliverFailure => {
            engine.on_event(EngineEvent::WordFetched {
                ticket,
                result: Err(ProviderError::Unavailable("flaky".into())),
            });
            Ok(())
        }
        Op::DeliverStale => {
            engine.on_event(EngineEvent::WordFetched {
                ticket: ticket.saturating_sub(1),
                result: Ok(word(n)),
            });
            Ok(())
        }
        Op::RetryDue => {
            engine.on_event(EngineEvent::RetryDue { ticket });
            Ok(())
        }
    };
}

fn check_invariants(engine: &TurnEngine<ManualScheduler>) -> Result<(), TestCaseError> {
    let session = engine.session();
    let phase = engine.phase();

    prop_assert_eq!(session.scores.len(), session.players.len());
    prop_assert!(session.current_skips.fits_within(&session.skips_per_round));
    prop_assert!(session.current_turn <= session.players.len());
    prop_assert!(session.current_round <= session.total_rounds);
    prop_assert!(session.time_left <= session.total_time);
    if let Some(idx) = session.current_player_index {
        prop_assert!(idx < session.players.len());
    }
    if phase == Phase::GameEnded {
        prop_assert!(!session.game_active);
    }
    if engine.is_timer_running() {
        prop_assert_eq!(phase, Phase::Active, "timer running outside Active");
    }
    if session.current_word.is_some() && !session.is_generating_word {
        let current = session.current_word.as_deref().unwrap_or_default();
        prop_assert!(session.words_used.contains(current));
    }
    Ok(())
}

fn frozen(before: &Session) -> bool {
    before.is_paused || before.round_ended || before.is_generating_word
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Property: invariants survive any sequence of commands and events
    #[test]
    fn prop_invariants_hold(
        settings in settings(),
        players in 1usize..5,
        ops in prop::collection::vec(op(), 1..120),
    ) {
        let retry = RetryPolicy {
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            max_attempts: Some(3),
        };
        let mut engine = TurnEngine::new(ManualScheduler::default(), retry);
        engine.apply_settings(settings).unwrap();
        engine
            .start_game((0..players).map(|p| format!("P{p}")))
            .unwrap();

        for (n, op) in ops.into_iter().enumerate() {
            let before = engine.session().clone();
            let was_generating = engine.phase() == Phase::AwaitingWord;

            apply(&mut engine, op, n);
            check_invariants(&engine)?;

            // nothing a player does lands while a word is on its way
            if was_generating && matches!(op, Op::Correct | Op::Pass) {
                prop_assert_eq!(engine.session(), &before);
            }
            // a frozen clock stays frozen
            if matches!(op, Op::Tick | Op::StaleTick) && frozen(&before) {
                prop_assert_eq!(engine.session().time_left, before.time_left);
            }
            // stale answers never touch the word
            if matches!(op, Op::DeliverStale | Op::StaleTick) {
                prop_assert_eq!(&engine.session().current_word, &before.current_word);
                prop_assert_eq!(&engine.session().words_used, &before.words_used);
            }
        }
    }

    /// Property: a round ends exactly once, after one turn per player
    #[test]
    fn prop_round_ends_after_every_player_had_a_turn(players in 1usize..6) {
        let settings = GameSettings {
            total_rounds: 1,
            seconds_per_turn: 1,
            ..Default::default()
        };
        let mut engine = TurnEngine::new(ManualScheduler::default(), RetryPolicy::default());
        engine.apply_settings(settings).unwrap();
        engine
            .start_game((0..players).map(|p| format!("P{p}")))
            .unwrap();
        engine.advance_round().unwrap();

        for turn in 0..players {
            prop_assert!(!engine.session().round_ended);
            prop_assert_eq!(engine.session().current_player_index, Some(turn));
            let ticket = engine.fetch_ticket();
            engine.on_event(EngineEvent::WordFetched { ticket, result: Ok(word(turn)) });
            let generation = engine.timer_generation();
            engine.on_event(EngineEvent::TimerTick { generation });
        }

        prop_assert!(engine.session().round_ended);
        prop_assert_eq!(engine.session().current_turn, players);
        let ends = engine
            .drain_feedback()
            .iter()
            .filter(|f| f.message == "Round complete!")
            .count();
        prop_assert_eq!(ends, 1);
    }
}
