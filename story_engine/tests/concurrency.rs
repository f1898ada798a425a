use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use story_engine::{GameState, Hook, SaveFormat, StoryEngine, StoryGraph, StoryNode};

fn single_room() -> StoryGraph {
    StoryGraph::new(
        StoryNode::builder("A waiting room.")
            .answer("Leave", StoryNode::ending("Outside."))
            .build()
            .unwrap(),
    )
}

#[test]
fn tick_and_choice_mutations_are_never_lost() {
    let engine = Arc::new(StoryEngine::new(single_room(), GameState::new(1_000)));
    let barrier = Arc::new(Barrier::new(2));

    let ticker = {
        let engine = Arc::clone(&engine);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            for _ in 0..200 {
                engine.with_state(|s| {
                    s.modify_hp(-1);
                });
            }
        })
    };

    barrier.wait();
    for n in 0..200 {
        engine.add_achievement(&format!("badge-{n}"), "earned");
    }
    ticker.join().unwrap();

    assert_eq!(engine.health(), 800);
    assert_eq!(engine.achievements().len(), 200);
    // 400 messages went in; the sink keeps the newest 256
    assert_eq!(engine.drain_messages().len(), 256);
}

#[test]
fn ticker_runs_alongside_choices() {
    let mut engine = StoryEngine::new(single_room(), GameState::new(50));
    engine.begin().unwrap();
    engine
        .start_ticker(
            Hook::new("drip", |s: &mut GameState| {
                s.modify_hp(-1);
            }),
            Duration::from_millis(2),
            None,
        )
        .unwrap();
    assert!(engine.is_ticking());

    let deadline = Instant::now() + Duration::from_secs(5);
    let mut seen = engine.revision();
    while engine.snapshot().ticks() < 3 && Instant::now() < deadline {
        seen = engine.wait_for_change(seen, Duration::from_millis(50));
    }
    engine.add_achievement("Patient", "Waited a while");
    engine.select_answer("Leave").unwrap();
    engine.stop_ticker();
    assert!(!engine.is_ticking());

    let state = engine.snapshot();
    assert!(state.ticks() >= 3);
    assert_eq!(state.health(), 50 - state.ticks() as i64);
    assert_eq!(state.achievement_list().len(), 1);
    assert_eq!(state.path(), ["Leave".to_string()]);
}

#[test]
fn save_while_ticking_sees_whole_ticks() {
    let mut engine = StoryEngine::new(single_room(), GameState::new(100));
    engine
        .start_ticker(
            Hook::new("pair", |s: &mut GameState| {
                s.modify_hp(-1);
                let n = s.value("count").and_then(serde_json::Value::as_i64).unwrap_or(0);
                s.set_value("count", n + 1);
            }),
            Duration::from_millis(1),
            None,
        )
        .unwrap();

    for _ in 0..20 {
        let raw = engine.save(SaveFormat::Json).unwrap();
        let state = story_engine::save_files::load(&raw, SaveFormat::Json).unwrap();
        let count = state.value("count").and_then(serde_json::Value::as_i64).unwrap_or(0);
        assert_eq!(state.health(), 100 - count);
        thread::sleep(Duration::from_millis(1));
    }
    engine.shutdown();
}
