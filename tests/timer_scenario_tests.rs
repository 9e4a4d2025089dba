//! Integration tests for the interval timer driven by a manual clock

use chrono::{Local, TimeDelta, TimeZone};
use export_solution::clock::ManualClock;
use export_solution::timer::{ElapsedTimer, RunState, TimerConfig, TimerError};

fn ms(n: i64) -> TimeDelta {
    TimeDelta::milliseconds(n)
}

fn timer_at_noon() -> (ManualClock, ElapsedTimer<ManualClock>) {
    let noon = Local.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
    let clock = ManualClock::at(noon);
    let timer = ElapsedTimer::with_clock(clock.clone(), TimerConfig::default());
    (clock, timer)
}

// ============================================================================
// Two samples separated by an idle gap
// ============================================================================

#[test]
fn test_two_samples_with_gap() {
    let (clock, mut timer) = timer_at_noon();

    timer.start();
    clock.advance(ms(100));
    timer.stop();
    assert_eq!(timer.value(), ms(100));
    assert_eq!(timer.count(), 1);
    assert_eq!(timer.average(), ms(100));

    clock.advance(ms(50));
    timer.start();
    clock.advance(ms(100));
    timer.stop();

    let snap = timer.snapshot();
    assert_eq!(snap.value, ms(200));
    assert_eq!(snap.count, 2);
    assert_eq!(snap.average, ms(100));
    assert_eq!(snap.all, ms(250));
    assert_eq!(snap.percent_all, 80);
    assert_eq!(snap.current, ms(100));
    assert_eq!(snap.state, RunState::Stopped);
}

#[test]
fn test_idle_time_after_stop_not_counted() {
    let (clock, mut timer) = timer_at_noon();
    timer.start();
    clock.advance(ms(20));
    timer.stop();
    clock.advance(TimeDelta::hours(1));

    assert_eq!(timer.value(), ms(20));
    assert_eq!(timer.all(), ms(20));
    assert_eq!(timer.percent_all(), 100);
}

#[test]
fn test_running_values_track_clock() {
    let (clock, mut timer) = timer_at_noon();
    timer.start();
    clock.advance(ms(10));
    timer.stop();
    clock.advance(ms(10));
    timer.start();
    clock.advance(ms(5));

    assert_eq!(timer.value(), ms(15));
    assert_eq!(timer.current(), ms(5));
    assert_eq!(timer.all(), ms(25));
    assert_eq!(timer.percent_all(), 60);
    assert_eq!(timer.end_time(), Local.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap() + ms(25));
}

// ============================================================================
// Timestamps and formatting
// ============================================================================

#[test]
fn test_format_b_times_of_day() {
    let (clock, mut timer) = timer_at_noon();
    clock.advance(ms(1_500));
    timer.start();
    clock.advance(ms(2_000));
    timer.stop();

    assert_eq!(
        timer.format("b").unwrap(),
        "12:00:01.500 | 12:00:01.500 | 12:00:03.500"
    );
}

#[test]
fn test_format_c_pads_percentage() {
    let (clock, mut timer) = timer_at_noon();
    timer.start();
    clock.advance(ms(5));
    timer.stop();
    clock.advance(ms(5));
    timer.start();
    clock.advance(ms(90));
    timer.stop();

    assert_eq!(timer.format("c").unwrap(), "95% - 95 of 100");

    let (clock, mut timer) = timer_at_noon();
    timer.start();
    clock.advance(ms(5));
    timer.stop();
    let _ = timer.add_sample();
    clock.advance(ms(95));
    assert_eq!(timer.format("c").unwrap(), "100% - 100 of 100");
}

#[test]
fn test_format_single_digit_percentage() {
    let clock = ManualClock::new();
    let mut timer = ElapsedTimer::with_clock(
        clock.clone(),
        TimerConfig {
            all_from_now: true,
            ..Default::default()
        },
    );
    timer.start();
    clock.advance(ms(5));
    timer.stop();
    clock.advance(ms(95));

    assert_eq!(timer.format("c").unwrap(), "05% - 5 of 100");
}

#[test]
fn test_unknown_format_fails_in_every_state() {
    let (clock, mut timer) = timer_at_noon();
    let check = |timer: &ElapsedTimer<ManualClock>| {
        assert_eq!(
            timer.format("x"),
            Err(TimerError::InvalidFormat("x".to_string()))
        );
    };

    check(&timer);
    timer.start();
    check(&timer);
    clock.advance(ms(3));
    timer.stop();
    check(&timer);
    timer.reset(false);
    check(&timer);
}

#[test]
fn test_invalid_format_message() {
    let err = TimerError::InvalidFormat("zz".into());
    assert!(err.to_string().contains("\"zz\""));
}

// ============================================================================
// Summary line
// ============================================================================

#[test]
fn test_summary_line_layout() {
    let clock = ManualClock::new();
    let mut timer = ElapsedTimer::with_clock(clock.clone(), TimerConfig::labelled("ExportSolution Core"));
    clock.advance(ms(1_234));
    timer.stop();

    assert_eq!(
        timer.summary(),
        "ExportSolution Core => All: 01234 , Value: 01234 , Current: 01234, Stats: 100%, Average: 01234 [1 samples]"
    );
}

#[test]
fn test_summary_reflects_relabel() {
    let (_, mut timer) = timer_at_noon();
    timer.set_label("renamed");
    assert_eq!(timer.label(), Some("renamed"));
    assert!(timer.summary().starts_with("renamed => "));
}

// ============================================================================
// Clock reads
// ============================================================================

#[test]
fn test_each_operation_reads_clock_once() {
    let (clock, mut timer) = timer_at_noon();

    clock.reset_reads();
    timer.start();
    assert_eq!(clock.reads(), 1);

    clock.reset_reads();
    timer.stop();
    assert_eq!(clock.reads(), 1);

    clock.reset_reads();
    timer.reset(true);
    assert_eq!(clock.reads(), 1);

    clock.reset_reads();
    timer.add_sample();
    assert_eq!(clock.reads(), 1);

    clock.reset_reads();
    let _ = timer.summary();
    assert_eq!(clock.reads(), 1);
}

#[test]
fn test_add_sample_same_state_as_stop_then_start() {
    let (clock_a, mut a) = timer_at_noon();
    let (clock_b, mut b) = timer_at_noon();

    a.start();
    b.start();
    clock_a.advance(ms(70));
    clock_b.advance(ms(70));

    a.add_sample();
    b.stop();
    b.start();

    let (sa, sb) = (a.snapshot(), b.snapshot());
    assert_eq!(sa, sb);
    assert_eq!(a.start_time(), b.start_time());
    assert_eq!(a.first_time(), b.first_time());
}

#[test]
fn test_system_clock_timer_measures() {
    let mut timer = ElapsedTimer::started();
    std::thread::sleep(std::time::Duration::from_millis(10));
    let total = timer.stop();

    assert!(total >= ms(10));
    assert_eq!(timer.count(), 1);
    assert!(ElapsedTimer::new().value().is_zero());
}
