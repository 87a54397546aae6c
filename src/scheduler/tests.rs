use super::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

#[test]
fn test_fires_within_five_ms() {
    let cancel = CancelFlag::new();
    let target = SystemTime::now() + Duration::from_millis(200);
    let mut fired_at = None;

    let outcome = wait_and_run(target, DEFAULT_PRECISION_MARGIN, &cancel, || {
        fired_at = Some(SystemTime::now());
    });

    let TriggerOutcome::Fired { lateness } = outcome else {
        panic!("expected Fired, got {outcome:?}");
    };
    assert!(lateness < Duration::from_millis(5), "lateness {lateness:?}");

    let fired_at = fired_at.unwrap();
    assert!(fired_at >= target);
    assert!(fired_at.duration_since(target).unwrap() < Duration::from_millis(5));
}

#[test]
fn test_past_target_runs_immediately() {
    let cancel = CancelFlag::new();
    let target = SystemTime::now() - Duration::from_secs(1);
    let start = std::time::Instant::now();

    let outcome = wait_and_run(target, DEFAULT_PRECISION_MARGIN, &cancel, || {});

    assert!(outcome.fired());
    assert!(start.elapsed() < Duration::from_millis(5));
    if let TriggerOutcome::Fired { lateness } = outcome {
        assert!(lateness >= Duration::from_millis(999));
    }
}

#[test]
fn test_pre_cancelled_never_runs() {
    let cancel = CancelFlag::new();
    cancel.cancel();
    let ran = Arc::new(AtomicUsize::new(0));
    let counter = ran.clone();

    let outcome = wait_and_run(SystemTime::now(), DEFAULT_PRECISION_MARGIN, &cancel, move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    assert_eq!(outcome, TriggerOutcome::Cancelled);
    assert_eq!(ran.load(Ordering::SeqCst), 0);
}

#[test]
fn test_zero_margin_still_fires() {
    let cancel = CancelFlag::new();
    let target = SystemTime::now() + Duration::from_millis(30);

    let outcome = wait_and_run(target, Duration::ZERO, &cancel, || {});

    assert!(outcome.fired());
    assert!(SystemTime::now() >= target);
}

#[test]
fn test_schedule_runs_action_once() {
    let scheduler = TriggerScheduler::default();
    let ran = Arc::new(AtomicUsize::new(0));
    let counter = ran.clone();

    let handle = scheduler
        .schedule(SystemTime::now() + Duration::from_millis(50), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    assert!(handle.join().fired());
    assert_eq!(ran.load(Ordering::SeqCst), 1);
}

#[test]
fn test_cancel_during_coarse_sleep() {
    let scheduler = TriggerScheduler::default();
    let ran = Arc::new(AtomicUsize::new(0));
    let counter = ran.clone();

    let handle = scheduler
        .schedule(SystemTime::now() + Duration::from_secs(2), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    std::thread::sleep(Duration::from_millis(30));
    handle.cancel();
    assert!(handle.is_cancelled());

    let start = std::time::Instant::now();
    assert_eq!(handle.join(), TriggerOutcome::Cancelled);
    assert!(start.elapsed() < Duration::from_millis(500));
    assert_eq!(ran.load(Ordering::SeqCst), 0);
}

#[test]
fn test_cancel_during_busy_poll() {
    let scheduler = TriggerScheduler::new(SchedulerConfig {
        precision_margin: Duration::from_millis(500),
    });
    let ran = Arc::new(AtomicUsize::new(0));
    let counter = ran.clone();

    let handle = scheduler
        .schedule(SystemTime::now() + Duration::from_millis(300), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    std::thread::sleep(Duration::from_millis(50));
    handle.cancel();

    assert_eq!(handle.join(), TriggerOutcome::Cancelled);
    assert_eq!(ran.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_handle_wait_async() {
    let scheduler = TriggerScheduler::default();

    let mut handle = scheduler
        .schedule(SystemTime::now() + Duration::from_millis(20), || {})
        .unwrap();

    assert!(handle.wait().await.fired());
    // Second wait has nothing left to observe
    assert_eq!(handle.wait().await, TriggerOutcome::Cancelled);
}

#[test]
fn test_handle_target() {
    let scheduler = TriggerScheduler::default();
    let target = SystemTime::now() + Duration::from_millis(10);

    let handle = scheduler.schedule(target, || {}).unwrap();

    assert_eq!(handle.target(), target);
    handle.join();
}
