//! Wait/signal behavior: blocking waits, late waits, waiter wake order,
//! and stale-handle hygiene.

use serde_json::json;
use spool::testing::{RecordingHandler, run_local, wait_until};
use spool::{Event, Job, JobStatus, Scheduler};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::common::fast_config;

#[test]
fn test_wait_signal_round_trip() {
    run_local(async {
        let scheduler = Scheduler::with_config(fast_config()).unwrap();

        let producer = scheduler.spawn(Job::new("producer", |ctx, _args| async move {
            ctx.park().await?;
            Ok(vec![json!(1), json!(2), json!(3)])
        }));

        let received: Rc<RefCell<Vec<spool::Value>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = received.clone();
        let consumer = scheduler.spawn(Job::new("consumer", move |ctx, _args| async move {
            let values = ctx.wait(producer).await?;
            sink.borrow_mut().extend(values.iter().cloned());
            Ok(values)
        }));

        wait_until(Duration::from_secs(1), || {
            scheduler.status(producer) == Some(JobStatus::Waiting)
                && scheduler.status(consumer) == Some(JobStatus::Waiting)
        })
        .await;

        scheduler.resume(producer, vec![]).unwrap();
        scheduler.settled().await;

        assert_eq!(*received.borrow(), vec![json!(1), json!(2), json!(3)]);
        assert_eq!(
            scheduler.take_results(consumer),
            Some(vec![json!(1), json!(2), json!(3)])
        );
    });
}

#[test]
fn test_late_wait_returns_without_suspending() {
    run_local(async {
        let scheduler = Scheduler::with_config(fast_config()).unwrap();
        let recorder = RecordingHandler::new();
        scheduler.events().register(recorder.clone());

        let early = scheduler.spawn(Job::new("early", |_ctx, _args| async {
            Ok(vec![json!(9)])
        }));
        scheduler.settled().await;
        assert_eq!(scheduler.status(early), Some(JobStatus::Done));

        let late = scheduler.spawn(Job::new("late", move |ctx, _args| async move {
            let values = ctx.wait(early).await?;
            Ok(values)
        }));
        scheduler.settled().await;

        assert_eq!(scheduler.take_results(late), Some(vec![json!(9)]));
        // The waitee's retained entry was consumed by the wait.
        assert_eq!(scheduler.take_results(early), None);
        // The late waiter never suspended.
        let parked = recorder.count(|e| {
            matches!(e, Event::JobParked { handle, .. } if *handle == late)
        });
        assert_eq!(parked, 0);
    });
}

#[test]
fn test_signal_wakes_waiters_in_enrollment_order() {
    run_local(async {
        let scheduler = Scheduler::with_config(fast_config()).unwrap();
        let recorder = RecordingHandler::new();
        scheduler.events().register(recorder.clone());

        let producer = scheduler.spawn(Job::new("producer", |ctx, _args| async move {
            ctx.park().await?;
            Ok(vec![json!(5)])
        }));

        let first = scheduler.spawn(Job::new("first", move |ctx, _args| async move {
            ctx.wait(producer).await
        }));
        let second = scheduler.spawn(Job::new("second", move |ctx, _args| async move {
            ctx.wait(producer).await
        }));

        wait_until(Duration::from_secs(1), || {
            scheduler.status(first) == Some(JobStatus::Waiting)
                && scheduler.status(second) == Some(JobStatus::Waiting)
        })
        .await;
        assert_eq!(scheduler.waiter_count(producer), 2);

        scheduler.resume(producer, vec![]).unwrap();
        scheduler.settled().await;

        assert_eq!(scheduler.take_results(first), Some(vec![json!(5)]));
        assert_eq!(scheduler.take_results(second), Some(vec![json!(5)]));

        let resumed: Vec<_> = recorder
            .events()
            .iter()
            .filter_map(|e| match e {
                Event::JobResumed { handle, .. } => Some(*handle),
                _ => None,
            })
            .collect();
        // The external resume of the producer, then its waiters FIFO.
        assert_eq!(resumed, vec![producer, first, second]);
    });
}

#[test]
fn test_wait_on_consumed_handle_fails_cleanly() {
    run_local(async {
        let scheduler = Scheduler::with_config(fast_config()).unwrap();

        let gone = scheduler.spawn(Job::new("gone", |_ctx, _args| async {
            Ok(vec![json!(1)])
        }));
        scheduler.settled().await;
        assert!(scheduler.take_results(gone).is_some());

        // The handle is stale now; waiting on it is an error, not a
        // permanent block.
        let waiter = scheduler.spawn(Job::new("waiter", move |ctx, _args| async move {
            let values = ctx.wait(gone).await?;
            Ok(values)
        }));
        scheduler.settled().await;

        let output = scheduler.take_results(waiter).unwrap();
        assert_eq!(output.len(), 1);
        let message = output[0].as_str().unwrap();
        assert!(message.contains("unknown job handle"), "got: {message}");
    });
}

#[test]
fn test_park_delivers_resume_values() {
    run_local(async {
        let scheduler = Scheduler::with_config(fast_config()).unwrap();

        let parked = scheduler.spawn(Job::new("parked", |ctx, _args| async move {
            let first = ctx.park().await?;
            let second = ctx.park().await?;
            let mut all = first;
            all.extend(second);
            Ok(all)
        }));

        wait_until(Duration::from_secs(1), || {
            scheduler.status(parked) == Some(JobStatus::Waiting)
        })
        .await;
        scheduler.resume(parked, vec![json!("one")]).unwrap();

        wait_until(Duration::from_secs(1), || {
            scheduler.status(parked) == Some(JobStatus::Waiting)
        })
        .await;
        scheduler.resume(parked, vec![json!("two")]).unwrap();

        scheduler.settled().await;
        assert_eq!(
            scheduler.take_results(parked),
            Some(vec![json!("one"), json!("two")])
        );
    });
}
