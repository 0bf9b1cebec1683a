mod common;

use common::{line, shared, RecordingAlerts, Script, ScriptedSource};
use quake_rs::{
    save_wave_data, AlertConfig, AlertId, AlertLifecycle, Detector, DetectorConfig, Phase, QuakeError,
    Termination,
};
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn scenario_config() -> DetectorConfig {
    DetectorConfig {
        calibration_index: 3,
        threshold: 0.3,
        capture_duration_secs: 1.5,
        buffer_time_secs: 1.0,
        read_timeout_secs: 1.0,
        alert: Some(AlertConfig::new("http://alerts.invalid/api/earthquake-alerts")),
        ..DetectorConfig::default()
    }
}

/// Baseline (0,0,0) at sample 3, onset at t=1.6s, 0.6 peak inside the
/// 1.5s window, S-wave crossing at t=3.6s.
fn scenario_script() -> Vec<Script> {
    vec![
        // Calibrating: t = 0.1, 0.2, 0.3
        line(100, "0.0,0.0,0.0"),
        line(100, "0.0,0.0,0.0"),
        line(100, "0.0,0.0,0.0"),
        // Buffering until t = 1.3; this spike is discarded
        line(200, "5.0,5.0,5.0"),
        // Monitoring
        line(1000, "0.1,0.0,0.0"),
        line(50, "garbage"),
        line(50, "0.4,0.0,0.0"),
        // CapturingP, window closes at t = 3.1
        line(500, "0.6,0.0,0.0"),
        line(500, "-0.2,0.1,0.0"),
        // WaitingS
        line(1000, "0.0,0.6,0.0"),
        line(100, "0.0,0.0,2.0"),
        Script::Hold,
    ]
}

#[tokio::test(start_paused = true)]
async fn test_end_to_end_detection_and_alert_lifecycle() {
    let alerts = shared(RecordingAlerts::default());
    let mut source = ScriptedSource::new(scenario_script());
    let closed = source.closed.clone();

    let run = Detector::new(scenario_config())
        .unwrap()
        .with_alert_service(alerts.clone())
        .run(&mut source)
        .await
        .unwrap();

    assert_eq!(run.termination, Termination::Completed);
    assert!(run.is_complete());

    let baseline = run.baseline.unwrap();
    assert_eq!((baseline.x0, baseline.y0, baseline.z0), (0.0, 0.0, 0.0));
    assert_eq!(run.p_wave.unwrap().amplitude, 0.6);
    // First crossing, not the larger sample after it
    assert_eq!(run.s_wave.unwrap().amplitude, 0.6);

    let delta = run.time_delta_secs.unwrap();
    assert!((delta - 2.0).abs() < 1e-3, "delta was {}", delta);
    assert!((run.distance_km.unwrap() - 24.0).abs() < 0.02);

    assert_eq!(
        run.phases,
        vec![
            Phase::Idle,
            Phase::Calibrating,
            Phase::Buffering,
            Phase::Monitoring,
            Phase::CapturingP,
            Phase::WaitingS,
            Phase::Reporting,
            Phase::Deactivating,
            Phase::Done,
        ]
    );

    assert_eq!(run.stats.discarded_while_buffering, 1);
    assert_eq!(run.stats.lines_skipped, 1);
    assert_eq!(run.stats.samples_accepted, 9);
    assert_eq!(run.stats.lines_read, 10);

    let outcome = run.alert.clone().unwrap();
    assert_eq!(outcome.alert_id, Some(AlertId(7)));
    assert!(outcome.deactivated);
    assert!(outcome.errors.is_empty());
    assert_eq!(alerts.calls(), vec!["submit", "deactivate 7"]);

    let report = alerts.reports.lock().unwrap()[0].clone();
    assert_eq!(report.pwave_amplitude, 0.6);
    assert_eq!(report.sensor_id, 1);
    assert!(report.active);
    assert!(report.distance_km.is_some());
    assert!(report.time_delta_sec.is_some());

    assert!(closed.load(Ordering::SeqCst), "source must be released");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wave_data.txt");
    assert!(save_wave_data(&run, &path).unwrap());
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "Calibration data: 0.0,0.0,0.0\nP wave: 0.6\nS wave: 0.6\n"
    );
}

#[tokio::test(start_paused = true)]
async fn test_interrupted_swave_wait_writes_nothing() {
    let mut script = scenario_script();
    // Drop both post-window samples so the wait never completes
    script.truncate(9);
    script.push(Script::Hold);

    let alerts = shared(RecordingAlerts::default());
    let cancel = CancellationToken::new();
    let mut source = ScriptedSource::new(script);
    let closed = source.closed.clone();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(30)).await;
        trigger.cancel();
    });

    let run = Detector::new(scenario_config())
        .unwrap()
        .with_alert_service(alerts.clone())
        .with_cancellation(cancel)
        .run(&mut source)
        .await
        .unwrap();

    assert_eq!(
        run.termination,
        Termination::Interrupted {
            phase: Phase::WaitingS
        }
    );
    assert!(run.baseline.is_some());
    assert_eq!(run.p_wave.unwrap().amplitude, 0.6);
    assert!(run.s_wave.is_none());
    assert!(run.report.is_none());
    assert!(alerts.calls().is_empty());
    assert!(closed.load(Ordering::SeqCst));
    assert_eq!(run.phases.last(), Some(&Phase::Done));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wave_data.txt");
    assert!(!save_wave_data(&run, &path).unwrap());
    assert!(!path.exists());
}

#[tokio::test(start_paused = true)]
async fn test_stream_end_before_calibration_is_fatal() {
    let mut source = ScriptedSource::new(vec![
        line(10, "0.0,0.0,1.0"),
        line(10, "not,a,sample"),
        line(10, "0.0,0.0,1.0"),
        Script::End,
    ]);
    let closed = source.closed.clone();

    let err = Detector::new(scenario_config())
        .unwrap()
        .run(&mut source)
        .await
        .unwrap_err();

    match err {
        QuakeError::CalibrationIncomplete { accepted, required } => {
            assert_eq!(accepted, 2);
            assert_eq!(required, 3);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_open_failure_is_fatal() {
    let mut source = ScriptedSource::failing_open();
    let closed = source.closed.clone();

    let err = Detector::new(scenario_config())
        .unwrap()
        .run(&mut source)
        .await
        .unwrap_err();

    assert!(matches!(err, QuakeError::SourceOpen(_)));
    assert!(closed.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn test_submit_failure_skips_deactivation() {
    let alerts = shared(RecordingAlerts::failing());
    let mut source = ScriptedSource::new(scenario_script());

    let run = Detector::new(scenario_config())
        .unwrap()
        .with_alert_service(alerts.clone())
        .run(&mut source)
        .await
        .unwrap();

    assert_eq!(run.termination, Termination::Completed);
    let outcome = run.alert.unwrap();
    assert_eq!(outcome.alert_id, None);
    assert!(!outcome.deactivated);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(alerts.calls(), vec!["submit"]);

    let tail: Vec<Phase> = run.phases.iter().rev().take(3).rev().copied().collect();
    assert_eq!(tail, vec![Phase::WaitingS, Phase::Reporting, Phase::Done]);
}

#[tokio::test(start_paused = true)]
async fn test_basic_lifecycle_reports_without_deactivation() {
    let mut config = scenario_config();
    if let Some(alert) = config.alert.as_mut() {
        alert.lifecycle = AlertLifecycle::Basic;
        alert.sensor_id = 12;
    }

    let alerts = shared(RecordingAlerts::default());
    let mut source = ScriptedSource::new(scenario_script());

    let run = Detector::new(config)
        .unwrap()
        .with_alert_service(alerts.clone())
        .run(&mut source)
        .await
        .unwrap();

    assert_eq!(alerts.calls(), vec!["submit"]);
    assert!(!run.phases.contains(&Phase::Deactivating));

    let report = run.report.unwrap();
    assert_eq!(report.sensor_id, 12);
    assert!(report.distance_km.is_none());
    assert!(report.time_delta_sec.is_none());
    // Distance is still computed locally
    assert!(run.distance_km.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_without_alert_service_reporting_goes_straight_to_done() {
    let mut source = ScriptedSource::new(scenario_script());

    let run = Detector::new(scenario_config())
        .unwrap()
        .run(&mut source)
        .await
        .unwrap();

    assert_eq!(run.termination, Termination::Completed);
    assert!(run.report.is_some());
    assert!(run.alert.is_none());
    let tail: Vec<Phase> = run.phases.iter().rev().take(2).rev().copied().collect();
    assert_eq!(tail, vec![Phase::Reporting, Phase::Done]);
}

#[tokio::test(start_paused = true)]
async fn test_swave_timeout() {
    let mut script = scenario_script();
    script.truncate(9);
    // Arrives after the window closes but stays below the P-wave peak
    script.push(line(800, "0.0,0.1,0.0"));
    script.push(Script::Hold);

    let config = DetectorConfig {
        swave_timeout_secs: Some(5.0),
        ..scenario_config()
    };
    let alerts = shared(RecordingAlerts::default());
    let mut source = ScriptedSource::new(script);

    let run = Detector::new(config)
        .unwrap()
        .with_alert_service(alerts.clone())
        .run(&mut source)
        .await
        .unwrap();

    assert_eq!(run.termination, Termination::SWaveTimedOut);
    assert!(run.p_wave.is_some());
    assert!(run.s_wave.is_none());
    assert!(alerts.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_empty_capture_window_has_zero_peak() {
    let script = vec![
        line(10, "0.0,0.0,0.0"),
        line(10, "0.0,0.0,0.0"),
        line(10, "0.0,0.0,0.0"),
        line(2000, "0.5,0.0,0.0"),
        // Nothing inside the 1.5s window; the next sample is the S-wave
        line(3000, "0.01,0.0,0.0"),
        Script::Hold,
    ];
    let mut source = ScriptedSource::new(script);

    let run = Detector::new(scenario_config())
        .unwrap()
        .run(&mut source)
        .await
        .unwrap();

    assert_eq!(run.p_wave.unwrap().amplitude, 0.0);
    assert_eq!(run.s_wave.unwrap().amplitude, 0.01);
    assert!((run.time_delta_secs.unwrap() - 3.0).abs() < 1e-3);
}

#[tokio::test(start_paused = true)]
async fn test_stream_end_while_monitoring() {
    let script = vec![
        line(10, "0.0,0.0,0.0"),
        line(10, "0.0,0.0,0.0"),
        line(10, "0.0,0.0,0.0"),
        line(2000, "0.1,0.1,0.1"),
        Script::End,
    ];
    let mut source = ScriptedSource::new(script);

    let run = Detector::new(scenario_config())
        .unwrap()
        .run(&mut source)
        .await
        .unwrap();

    assert_eq!(
        run.termination,
        Termination::StreamEnded {
            phase: Phase::Monitoring
        }
    );
    assert!(run.baseline.is_some());
    assert!(run.p_wave.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_transient_transport_errors_are_skipped() {
    let mut script = scenario_script();
    script.insert(1, Script::Fail);
    script.insert(5, Script::Fail);
    let mut source = ScriptedSource::new(script);

    let run = Detector::new(scenario_config())
        .unwrap()
        .run(&mut source)
        .await
        .unwrap();

    assert_eq!(run.termination, Termination::Completed);
    assert_eq!(run.stats.transport_errors, 2);
}

#[tokio::test(start_paused = true)]
async fn test_persistent_transport_failure_ends_stream() {
    let mut script = vec![line(10, "0.0,0.0,0.0")];
    script.extend(std::iter::repeat(Script::Fail).take(20));
    let mut source = ScriptedSource::new(script);

    let config = DetectorConfig {
        calibration_index: 1,
        buffer_time_secs: 0.0,
        max_consecutive_transport_errors: 3,
        ..scenario_config()
    };

    let run = Detector::new(config).unwrap().run(&mut source).await.unwrap();

    assert_eq!(
        run.termination,
        Termination::StreamEnded {
            phase: Phase::Monitoring
        }
    );
    assert_eq!(run.stats.transport_errors, 3);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_before_calibration() {
    let cancel = CancellationToken::new();
    let mut source = ScriptedSource::new(vec![Script::Hold]);
    let closed = source.closed.clone();

    let detector = Detector::new(scenario_config())
        .unwrap()
        .with_cancellation(cancel.clone());
    cancel.cancel();

    let run = detector.run(&mut source).await.unwrap();
    assert!(matches!(run.termination, Termination::Interrupted { .. }));
    assert!(run.baseline.is_none());
    assert!(closed.load(Ordering::SeqCst));
}

#[test]
fn test_invalid_config_rejected_up_front() {
    let config = DetectorConfig {
        threshold: -0.1,
        ..DetectorConfig::default()
    };
    assert!(matches!(Detector::new(config), Err(QuakeError::InvalidConfig(_))));
}

/// Token that fires after `ms` of (paused) time
fn cancel_after(ms: u64) -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        trigger.cancel();
    });
    cancel
}

fn calibrated_then_hold() -> Vec<Script> {
    vec![
        line(100, "0.0,0.0,0.0"),
        line(100, "0.0,0.0,0.0"),
        line(100, "0.0,0.0,0.0"),
        Script::Hold,
    ]
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_buffering() {
    let mut source = ScriptedSource::new(calibrated_then_hold());
    let closed = source.closed.clone();

    let run = Detector::new(scenario_config())
        .unwrap()
        .with_cancellation(cancel_after(500))
        .run(&mut source)
        .await
        .unwrap();

    assert_eq!(
        run.termination,
        Termination::Interrupted {
            phase: Phase::Buffering
        }
    );
    assert!(run.baseline.is_some());
    assert!(run.p_wave.is_none());
    assert!(closed.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_monitoring() {
    let mut source = ScriptedSource::new(calibrated_then_hold());

    let run = Detector::new(scenario_config())
        .unwrap()
        .with_cancellation(cancel_after(5_000))
        .run(&mut source)
        .await
        .unwrap();

    assert_eq!(
        run.termination,
        Termination::Interrupted {
            phase: Phase::Monitoring
        }
    );
    assert!(run.p_wave.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_bad_lines_inside_capture_window_do_not_move_deadline() {
    let script = vec![
        line(100, "0.0,0.0,0.0"),
        line(100, "0.0,0.0,0.0"),
        line(100, "0.0,0.0,0.0"),
        // Onset at t = 1.6, window closes at t = 3.1
        line(1300, "0.4,0.0,0.0"),
        line(300, "garbage"),
        Script::Fail,
        line(300, "0.6,0.0,0.0"),
        line(300, "1.0,2.0"),
        line(500, "0.5,0.0,0.0"),
        // t = 3.2: past the original deadline, so this is the S-wave
        line(200, "0.9,0.0,0.0"),
        Script::Hold,
    ];
    let mut source = ScriptedSource::new(script);

    let run = Detector::new(scenario_config())
        .unwrap()
        .run(&mut source)
        .await
        .unwrap();

    assert_eq!(run.termination, Termination::Completed);
    assert_eq!(run.p_wave.unwrap().amplitude, 0.6);
    assert_eq!(run.s_wave.unwrap().amplitude, 0.9);
    assert!((run.time_delta_secs.unwrap() - 1.6).abs() < 1e-3);
    assert_eq!(run.stats.lines_skipped, 2);
    assert_eq!(run.stats.transport_errors, 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_after_detection_marks_report_interrupted() {
    let cancel = CancellationToken::new();
    let alerts = shared(RecordingAlerts::default());
    let mut source = ScriptedSource::new(scenario_script()).cancel_on_close(cancel.clone());

    let run = Detector::new(scenario_config())
        .unwrap()
        .with_alert_service(alerts.clone())
        .with_cancellation(cancel)
        .run(&mut source)
        .await
        .unwrap();

    assert_eq!(
        run.termination,
        Termination::Interrupted {
            phase: Phase::Reporting
        }
    );
    assert!(run.is_complete());
    assert!(run.report.is_some());
    let outcome = run.alert.unwrap();
    assert!(outcome.cancelled);
    assert_eq!(outcome.alert_id, None);
    assert!(alerts.calls().is_empty());
}

#[test]
fn test_out_of_range_duration_rejected() {
    let config = DetectorConfig {
        capture_duration_secs: 1e20,
        ..scenario_config()
    };
    assert!(matches!(Detector::new(config), Err(QuakeError::InvalidConfig(_))));
}

#[tokio::test(start_paused = true)]
async fn test_unrepresentable_capture_window_does_not_panic() {
    // Fits in a Duration but not past "now" as an Instant
    let config = DetectorConfig {
        capture_duration_secs: 1.8e19,
        ..scenario_config()
    };
    let script = vec![
        line(10, "0.0,0.0,0.0"),
        line(10, "0.0,0.0,0.0"),
        line(10, "0.0,0.0,0.0"),
        line(2000, "0.5,0.0,0.0"),
        line(500, "0.6,0.0,0.0"),
        Script::End,
    ];
    let mut source = ScriptedSource::new(script);

    let run = Detector::new(config).unwrap().run(&mut source).await.unwrap();

    assert_eq!(
        run.termination,
        Termination::StreamEnded {
            phase: Phase::CapturingP
        }
    );
    assert!(run.p_wave.is_none());
}
