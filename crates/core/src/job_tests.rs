// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn running_bean() -> JobBean {
    let mut bean = JobBean::with_id("job-1", "scan");
    bean.set_status(Status::Queued).unwrap();
    bean.set_status(Status::Running).unwrap();
    bean
}

#[test]
fn new_bean_is_submitted_with_fresh_id() {
    let a = JobBean::new("a");
    let b = JobBean::new("a");
    assert_eq!(a.status(), Status::Submitted);
    assert_eq!(a.previous_status(), None);
    assert_ne!(a.unique_id, b.unique_id);
}

#[test]
fn set_status_tracks_previous() {
    let bean = running_bean();
    assert_eq!(bean.status(), Status::Running);
    assert_eq!(bean.previous_status(), Some(Status::Queued));
}

#[test]
fn final_bean_rejects_further_transitions() {
    let mut bean = running_bean();
    bean.set_status(Status::Complete).unwrap();

    let err = bean.set_status(Status::Running).unwrap_err();
    assert_eq!(
        err,
        TransitionError::FromFinal {
            from: Status::Complete,
            to: Status::Running
        }
    );
    assert_eq!(bean.status(), Status::Complete);
    assert_eq!(bean.previous_status(), Some(Status::Running));
}

#[test]
fn reasserting_final_status_keeps_previous() {
    let mut bean = running_bean();
    bean.set_status(Status::Terminated).unwrap();
    bean.set_status(Status::Terminated).unwrap();
    assert_eq!(bean.previous_status(), Some(Status::Running));
}

#[test]
fn progress_is_monotonic_while_running() {
    let mut bean = running_bean();
    assert!(bean.set_percent_complete(40.0));
    assert!(!bean.set_percent_complete(10.0));
    assert_eq!(bean.percent_complete(), 40.0);

    bean.reset_progress();
    assert!(bean.set_percent_complete(10.0));
    assert_eq!(bean.percent_complete(), 10.0);
}

#[yare::parameterized(
    above_range = { 150.0,         100.0 },
    below_range = { -5.0,          0.0 },
    in_range    = { 55.5,          55.5 },
)]
fn progress_is_clamped(input: f64, expected: f64) {
    let mut bean = JobBean::with_id("p", "p");
    bean.set_percent_complete(input);
    assert_eq!(bean.percent_complete(), expected);
}

#[test]
fn progress_ignores_nan() {
    let mut bean = JobBean::with_id("p", "p");
    assert!(!bean.set_percent_complete(f64::NAN));
    assert_eq!(bean.percent_complete(), 0.0);
}

#[test]
fn fail_sets_message() {
    let mut bean = running_bean();
    bean.fail("detector offline").unwrap();
    assert_eq!(bean.status(), Status::Failed);
    assert_eq!(bean.message.as_deref(), Some("detector offline"));
}

#[test]
fn run_time_derives_from_start() {
    let mut bean = running_bean();
    bean.mark_finished(5_000);
    assert_eq!(bean.run_time, None);

    bean.mark_started(1_000);
    bean.mark_finished(3_500);
    assert_eq!(bean.run_time, Some(2_500));
}

#[test]
fn wire_form_uses_camel_case_and_keeps_provenance() {
    let mut bean = JobBean::with_id("abc", "scan");
    bean.beamline = Some("i15".to_string());
    bean.user_name = Some("ops".to_string());
    bean.set_percent_complete(12.0);

    let json = serde_json::to_value(&bean).unwrap();
    assert_eq!(json["uniqueId"], "abc");
    assert_eq!(json["percentComplete"], 12.0);
    assert_eq!(json["status"], "SUBMITTED");
    assert_eq!(json["beamline"], "i15");

    let back: JobBean = serde_json::from_value(json).unwrap();
    assert_eq!(back, bean);
}

#[test]
fn missing_unique_id_is_rejected() {
    let result: Result<JobBean, _> = serde_json::from_str(r#"{"name":"x"}"#);
    assert!(result.is_err());
}
