//! Lifecycle observability and failure isolation.

use serde_json::json;
use spool::testing::{RecordingHandler, run_local, wait_until};
use spool::{Event, Job, JobStatus, Scheduler, SchedulerConfig};
use std::time::Duration;

use crate::common::{fast_config, round_robin_config};

#[test]
fn test_failing_callback_does_not_block_waiters() {
    run_local(async {
        let scheduler = Scheduler::with_config(fast_config()).unwrap();
        let recorder = RecordingHandler::new();
        scheduler.events().register(recorder.clone());

        let producer = scheduler.spawn(
            Job::new("producer", |ctx, _args| async move {
                ctx.park().await?;
                Ok(vec![json!(42)])
            })
            .with_callback(|_values| Err("callback exploded".into())),
        );

        let waiter = scheduler.spawn(Job::new("waiter", move |ctx, _args| async move {
            ctx.wait(producer).await
        }));

        wait_until(Duration::from_secs(1), || {
            scheduler.status(waiter) == Some(JobStatus::Waiting)
        })
        .await;

        scheduler.resume(producer, vec![]).unwrap();
        scheduler.settled().await;

        // The callback failure is isolated: the waiter still resumed and
        // completed with the producer's values.
        assert_eq!(scheduler.take_results(waiter), Some(vec![json!(42)]));
        let failures = recorder.count(|e| {
            matches!(e, Event::CallbackFailed { handle, .. } if *handle == producer)
        });
        assert_eq!(failures, 1);
    });
}

#[test]
fn test_event_sequence_for_simple_job() {
    run_local(async {
        let scheduler = Scheduler::with_config(fast_config()).unwrap();
        let recorder = RecordingHandler::new();
        scheduler.events().register(recorder.clone());

        let job = scheduler.spawn(Job::new("simple", |_ctx, _args| async { Ok(vec![]) }));
        scheduler.settled().await;

        let events: Vec<_> = recorder
            .events()
            .into_iter()
            .filter(|e| e.job() == job)
            .collect();

        assert!(matches!(events[0], Event::JobCreated { .. }));
        assert!(matches!(events[1], Event::JobDispatched { .. }));
        assert!(matches!(
            events.last(),
            Some(Event::JobCompleted { success: true, .. })
        ));
    });
}

#[test]
fn test_burst_expiry_emits_requeue() {
    run_local(async {
        let scheduler = Scheduler::with_config(round_robin_config()).unwrap();
        let recorder = RecordingHandler::new();
        scheduler.events().register(recorder.clone());

        let job = scheduler.spawn(Job::new("yielder", |ctx, _args| async move {
            ctx.timeout().await?;
            Ok(vec![])
        }));
        scheduler.settled().await;

        let requeues = recorder.count(|e| {
            matches!(e, Event::JobRequeued { handle, .. } if *handle == job)
        });
        assert_eq!(requeues, 1);
    });
}

#[test]
fn test_failed_job_emits_unsuccessful_completion() {
    run_local(async {
        let scheduler = Scheduler::with_config(fast_config()).unwrap();
        let recorder = RecordingHandler::new();
        scheduler.events().register(recorder.clone());

        let job = scheduler.spawn(Job::new("doomed", |_ctx, _args| async {
            Err(spool::JobError::failed("done for"))
        }));
        scheduler.settled().await;

        let failed = recorder.count(|e| {
            matches!(e, Event::JobCompleted { handle, success: false, .. } if *handle == job)
        });
        assert_eq!(failed, 1);
    });
}

#[test]
fn test_scheduler_from_yaml_config() {
    run_local(async {
        let config = SchedulerConfig::from_yaml_str(
            "cycle_time_ms: 20\nup_ratio: 0.9\nburst_ratio: 0.5\n",
        )
        .unwrap();
        let scheduler = Scheduler::with_config(config).unwrap();

        let job = scheduler.spawn(Job::new("configured", |_ctx, _args| async {
            Ok(vec![json!(true)])
        }));
        scheduler.settled().await;
        assert_eq!(scheduler.take_results(job), Some(vec![json!(true)]));
    });
}
