use super::*;

#[test]
fn fake_clock_starts_at_given_instant() {
    let clock = FakeClock::new(1000);
    assert_eq!(clock.now_ms(), 1000);
}

#[test]
fn fake_clock_advances_on_demand() {
    let clock = FakeClock::new(0);
    clock.advance(50);
    clock.advance(25);
    assert_eq!(clock.now_ms(), 75);
}

#[test]
fn system_clock_reports_a_plausible_epoch_timestamp() {
    let clock = SystemClock;
    // Any time after 2020-01-01 in ms since epoch.
    assert!(clock.now_ms() > 1_577_836_800_000);
}
