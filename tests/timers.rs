mod common;

use loopwork::{TaskError, Worker};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn one_shot_timer_fires_once_after_its_delay() {
    common::init_tracing();

    let mut worker = Worker::new();
    let fired = Arc::new(AtomicUsize::new(0));

    let started = Instant::now();
    let delay = Duration::from_millis(50);

    let counter = fired.clone();
    let handle = worker.submit_delayed(delay, move || {
        counter.fetch_add(1, Ordering::SeqCst);
        started.elapsed()
    });

    let elapsed = handle.wait().expect("one-shot timer must resolve");
    assert!(
        elapsed >= delay,
        "fired after {elapsed:?}, before the {delay:?} delay"
    );

    // Leave room for a bogus second fire to show up before counting.
    thread::sleep(Duration::from_millis(150));
    assert_eq!(fired.load(Ordering::SeqCst), 1, "one-shot fired more than once");

    worker.join();
}

#[test]
fn repeating_timer_keeps_its_interval() {
    common::init_tracing();

    let mut worker = Worker::new();
    let stamps = Arc::new(Mutex::new(Vec::new()));

    let sink = stamps.clone();
    let _handle = worker.submit_repeating(
        Duration::from_millis(20),
        Duration::from_millis(20),
        move || sink.lock().unwrap().push(Instant::now()),
    );

    thread::sleep(Duration::from_millis(300));
    worker.join();

    let stamps = stamps.lock().unwrap();
    assert!(
        stamps.len() >= 3,
        "expected several fires in 300ms, got {}",
        stamps.len()
    );

    // Dispatch overhead can shave microseconds off a gap; allow a little.
    let floor = Duration::from_millis(18);
    for pair in stamps.windows(2) {
        let gap = pair[1] - pair[0];
        assert!(gap >= floor, "consecutive fires only {gap:?} apart");
    }
}

#[test]
fn repeating_handle_resolves_with_the_first_fire() {
    common::init_tracing();

    let mut worker = Worker::new();
    let counter = Arc::new(AtomicUsize::new(0));

    let fires = counter.clone();
    let handle = worker.submit_repeating(
        Duration::from_millis(10),
        Duration::from_millis(10),
        move || fires.fetch_add(1, Ordering::SeqCst),
    );

    assert_eq!(
        handle.wait().expect("first fire must resolve the handle"),
        0,
        "handle must carry the first fire's value"
    );

    worker.join();
}

#[test]
fn repeating_timer_survives_a_panicking_fire() {
    common::init_tracing();

    let mut worker = Worker::new();
    let counter = Arc::new(AtomicUsize::new(0));

    let fires = counter.clone();
    let handle = worker.submit_repeating(
        Duration::from_millis(10),
        Duration::from_millis(10),
        move || {
            if fires.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("first fire fails");
            }
        },
    );

    match handle.wait() {
        Err(TaskError::Panicked(text)) => {
            assert!(text.contains("first fire fails"), "payload lost: {text}")
        }
        other => panic!("expected the first fire's panic, got {other:?}"),
    }

    thread::sleep(Duration::from_millis(100));
    worker.join();

    assert!(
        counter.load(Ordering::SeqCst) >= 2,
        "timer must keep firing after a panicked fire"
    );
}

#[test]
fn staggered_repeating_timers_do_not_starve_tasks() {
    common::init_tracing();

    let mut worker = Worker::new();
    let timer_fires = Arc::new(AtomicUsize::new(0));
    let task_runs = Arc::new(AtomicUsize::new(0));

    for i in 0..10u64 {
        let fires = timer_fires.clone();
        worker.submit_repeating(
            Duration::from_millis(i * 10),
            Duration::from_millis(10),
            move || {
                fires.fetch_add(1, Ordering::SeqCst);
            },
        );
    }

    thread::sleep(Duration::from_millis(1));

    for _ in 0..100 {
        let runs = task_runs.clone();
        worker.submit(move || {
            runs.fetch_add(1, Ordering::SeqCst);
        });
    }

    thread::sleep(Duration::from_secs(1));
    worker.join();
    let fires_at_join = timer_fires.load(Ordering::SeqCst);

    assert_eq!(
        task_runs.load(Ordering::SeqCst),
        100,
        "all plain tasks must run despite timer traffic"
    );

    thread::sleep(Duration::from_millis(100));
    assert_eq!(
        timer_fires.load(Ordering::SeqCst),
        fires_at_join,
        "no repeating fire may be observed after join returned"
    );
}

#[test]
#[should_panic(expected = "repeat interval must be non-zero")]
fn zero_repeat_interval_is_rejected() {
    let worker = Worker::new();
    worker.submit_repeating(Duration::from_millis(10), Duration::ZERO, || ());
}
