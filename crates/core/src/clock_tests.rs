// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn fake_clock_advances_both_clocks() {
    let clock = FakeClock::new();
    let start = clock.now();
    let start_ms = clock.epoch_ms();

    clock.advance(Duration::from_secs(3));

    assert_eq!(clock.now() - start, Duration::from_secs(3));
    assert_eq!(clock.epoch_ms() - start_ms, 3_000);
}

#[test]
fn fake_clock_clones_share_time() {
    let clock = FakeClock::new();
    let other = clock.clone();
    clock.set_epoch_ms(42);
    assert_eq!(other.epoch_ms(), 42);
}

#[test]
fn system_clock_reports_wall_time() {
    assert!(SystemClock.epoch_ms() > 1_600_000_000_000);
}
