// tests/orchestrator_scenarios.rs

use std::sync::Arc;

use tokio::time::Instant;

use collab::errors::CollabError;
use collab::{CancellationToken, Orchestrator};
use collab_test_utils::fake_job::{fake, ok, Convey, Outcome};
use collab_test_utils::recording_sink::{PanickingSink, RecordingSink, SinkEvent};
use collab_test_utils::{approximately, init_tracing, ms};

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Run `co` once on a fresh payload; return the payload, result and elapsed time.
async fn invoke(
    co: &Orchestrator<Convey>,
) -> (Arc<Convey>, collab::Result<()>, std::time::Duration) {
    let convey = Convey::new();
    let begin = Instant::now();
    let result = co.run(&CancellationToken::new(), Arc::clone(&convey)).await;
    (convey, result, begin.elapsed())
}

#[tokio::test(start_paused = true)]
async fn single() -> TestResult {
    init_tracing();

    let mut co = Orchestrator::new();
    co.add_job("A", ok("A", 100), &[])?;

    let (convey, result, elapsed) = invoke(&co).await;
    result?;
    assert_eq!(convey.result(), "A");
    assert!(approximately(elapsed, ms(100)), "elapsed {elapsed:?}");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn parallel() -> TestResult {
    init_tracing();

    let mut co = Orchestrator::new();
    co.add_job("A", ok("A", 100), &[])?;
    co.add_job("B", ok("B", 100), &[])?;

    let (convey, result, elapsed) = invoke(&co).await;
    result?;
    assert!(["AB", "BA"].contains(&convey.result().as_str()));
    assert!(approximately(elapsed, ms(100)), "elapsed {elapsed:?}");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn serial() -> TestResult {
    init_tracing();

    let mut co = Orchestrator::new();
    let a = co.add_job("A", ok("A", 100), &[])?;
    co.add_job("B", ok("B", 100), &[a])?;

    let (convey, result, elapsed) = invoke(&co).await;
    result?;
    assert_eq!(convey.result(), "AB");
    assert!(approximately(elapsed, ms(200)), "elapsed {elapsed:?}");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn triangle() -> TestResult {
    init_tracing();

    let mut co = Orchestrator::new();
    let a = co.add_job("A", ok("A", 100), &[])?;
    co.add_job("B", ok("B", 50), &[a])?;
    co.add_job("C", ok("C", 80), &[a])?;

    let (convey, result, elapsed) = invoke(&co).await;
    result?;
    assert_eq!(convey.result(), "ABC");
    assert!(approximately(elapsed, ms(180)), "elapsed {elapsed:?}");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn diamond() -> TestResult {
    init_tracing();

    let sink = RecordingSink::new();
    let mut co = Orchestrator::new().with_sink(sink.clone());
    let a = co.add_job("A", ok("A", 100), &[])?;
    let b = co.add_job("B", ok("B", 50), &[a])?;
    let c = co.add_job("C", ok("C", 100), &[a])?;
    co.add_job("D", ok("D", 20), &[b, c])?;

    let (convey, result, elapsed) = invoke(&co).await;
    result?;
    assert_eq!(convey.result(), "ABCD");
    assert!(approximately(elapsed, ms(220)), "elapsed {elapsed:?}");

    // D waited for the slower of its two parents.
    let d = convey.span_of("D").unwrap();
    assert!(d.start >= convey.span_of("B").unwrap().end);
    assert!(d.start >= convey.span_of("C").unwrap().end);

    assert_eq!(sink.succeeded(), ["A", "B", "C", "D"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn tree() -> TestResult {
    init_tracing();

    let mut co = Orchestrator::new();
    let a = co.add_job("A", ok("A", 100), &[])?;
    let b = co.add_job("B", ok("B", 50), &[a])?;
    let c = co.add_job("C", ok("C", 120), &[])?;
    co.add_job("D", ok("D", 20), &[b, c])?;

    let (convey, result, elapsed) = invoke(&co).await;
    result?;
    assert_eq!(convey.result(), "ACBD");
    assert!(approximately(elapsed, ms(170)), "elapsed {elapsed:?}");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn wide_graph_follows_longest_path() -> TestResult {
    init_tracing();

    let mut co = Orchestrator::new();
    let a = co.add_job("A", ok("A", 5), &[])?;
    let b = co.add_job("B", ok("B", 2), &[])?;
    let c = co.add_job("C", ok("C", 5), &[a, b])?;
    let d = co.add_job("D", ok("D", 50), &[c])?;
    let e = co.add_job("E", ok("E", 5), &[c])?;
    co.add_job("F", ok("F", 1), &[d])?;
    co.add_job("G", ok("G", 40), &[e])?;

    let (convey, result, elapsed) = invoke(&co).await;
    result?;
    assert_eq!(convey.result(), "BACEGDF");
    assert!(approximately(elapsed, ms(61)), "elapsed {elapsed:?}");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn fan_in_from_many_levels() -> TestResult {
    init_tracing();

    let mut co = Orchestrator::new();
    let a = co.add_job("A", ok("A", 5), &[])?;
    let b = co.add_job("B", ok("B", 2), &[a])?;
    let c = co.add_job("C", ok("C", 4), &[a])?;
    let d = co.add_job("D", ok("D", 50), &[])?;
    let e = co.add_job("E", ok("E", 5), &[d])?;
    co.add_job("F", ok("F", 1), &[c, e])?;
    co.add_job("G", ok("G", 40), &[a, b, c, e])?;

    let (convey, result, elapsed) = invoke(&co).await;
    result?;
    assert_eq!(convey.result(), "ABCDEFG");
    // G waits for E (55ms) and then runs 40ms.
    assert!(approximately(elapsed, ms(95)), "elapsed {elapsed:?}");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn job_error_is_returned() -> TestResult {
    init_tracing();

    let mut co = Orchestrator::new();
    co.add_job("A", fake("A", 5, Outcome::Fail), &[])?;

    let (_convey, result, _) = invoke(&co).await;
    let err = result.unwrap_err();
    assert_eq!(err.job_name(), Some("A"));
    assert!(matches!(err, CollabError::Job { .. }));
    assert_eq!(err.to_string(), "job A failed: A exploded");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn dependent_of_failed_job_never_runs() -> TestResult {
    init_tracing();

    let sink = RecordingSink::new();
    let mut co = Orchestrator::new().with_sink(sink.clone());
    let a = co.add_job("A", ok("A", 5), &[])?;
    let b = co.add_job("B", fake("B", 5, Outcome::Fail), &[a])?;
    co.add_job("C", ok("C", 5), &[b])?;

    let (convey, result, _) = invoke(&co).await;
    let err = result.unwrap_err();
    assert_eq!(err.job_name(), Some("B"));
    assert!(err.to_string().contains("B exploded"));
    assert_eq!(convey.result(), "AB");
    assert!(!convey.ran("C"));
    assert_eq!(sink.canceled(), ["C"]);
    assert_eq!(
        sink.events(),
        [
            SinkEvent::Succeeded("A".to_string()),
            SinkEvent::Failed {
                job: "B".to_string(),
                error: "job B failed: B exploded".to_string(),
            },
            SinkEvent::Canceled("C".to_string()),
        ]
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn panicking_sink_does_not_change_outcome() -> TestResult {
    init_tracing();

    let mut co = Orchestrator::new().with_sink(PanickingSink);
    let a = co.add_job("A", ok("A", 10), &[])?;
    co.add_job("B", ok("B", 10), &[a])?;

    let (convey, result, elapsed) = invoke(&co).await;
    result?;
    assert_eq!(convey.result(), "AB");
    assert!(approximately(elapsed, ms(20)), "elapsed {elapsed:?}");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn panicking_sink_still_stops_dependents_of_a_failure() -> TestResult {
    init_tracing();

    let mut co = Orchestrator::new().with_sink(PanickingSink);
    let a = co.add_job("A", fake("A", 10, Outcome::Fail), &[])?;
    co.add_job("B", ok("B", 10), &[a])?;

    let (convey, result, _) = invoke(&co).await;
    let err = result.unwrap_err();
    assert!(matches!(err, CollabError::Job { ref name, .. } if name == "A"));
    assert!(!convey.ran("B"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn failure_cancels_rest_of_chain() -> TestResult {
    init_tracing();

    let mut co = Orchestrator::new();
    let a = co.add_job("A", ok("A", 100), &[])?;
    let b = co.add_job("B", fake("B", 100, Outcome::Fail), &[a])?;
    let c = co.add_job("C", ok("C", 100), &[b])?;
    co.add_job("D", ok("D", 100), &[c])?;

    let (convey, result, elapsed) = invoke(&co).await;
    let err = result.unwrap_err();
    assert!(err.to_string().contains("B exploded"));
    assert!(approximately(elapsed, ms(200)), "elapsed {elapsed:?}");
    assert!(!convey.ran("C"));
    assert!(!convey.ran("D"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn cancellation_is_graph_wide() -> TestResult {
    init_tracing();

    let sink = RecordingSink::new();
    let mut co = Orchestrator::new().with_sink(sink.clone());
    co.add_job("A", fake("A", 10, Outcome::Fail), &[])?;
    // X has no relation to A; it is already running when A fails and is not
    // interrupted, but its dependent Y observes the cancellation.
    let x = co.add_job("X", ok("X", 50), &[])?;
    co.add_job("Y", ok("Y", 10), &[x])?;

    let (convey, result, _) = invoke(&co).await;
    assert_eq!(result.unwrap_err().job_name(), Some("A"));
    assert!(convey.ran("X"));
    assert!(!convey.ran("Y"));
    assert_eq!(sink.canceled(), ["Y"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn running_jobs_can_observe_cancellation() -> TestResult {
    init_tracing();

    let mut co = Orchestrator::<Convey>::new();
    co.add_job("A", fake("A", 10, Outcome::Fail), &[])?;
    co.add_job(
        "watcher",
        |token: CancellationToken, _convey: Arc<Convey>| async move {
            token.cancelled().await;
            Err::<(), _>(anyhow::anyhow!("watcher stopped"))
        },
        &[],
    )?;

    let (_convey, result, elapsed) = invoke(&co).await;
    assert_eq!(result.unwrap_err().job_name(), Some("A"));
    assert!(approximately(elapsed, ms(10)), "elapsed {elapsed:?}");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn panic_is_contained() -> TestResult {
    init_tracing();

    let sink = RecordingSink::new();
    let mut co = Orchestrator::new().with_sink(sink.clone());
    co.add_job("A", fake("A", 5, Outcome::Panic), &[])?;

    let (_convey, result, _) = invoke(&co).await;
    let err = result.unwrap_err();
    match &err {
        CollabError::Panicked { name, message, trace } => {
            assert_eq!(name, "A");
            assert!(message.contains("A went off the rails"));
            assert!(trace.contains("fake_job.rs"), "trace {trace:?}");
        }
        other => panic!("expected a contained panic, got {other:?}"),
    }
    assert!(err.to_string().contains("job A panic"));

    let failed = sink.failed();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].0, "A");
    assert!(failed[0].1.contains("A went off the rails"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn panic_in_the_middle_stops_dependents() -> TestResult {
    init_tracing();

    let mut co = Orchestrator::new();
    let a = co.add_job("A", ok("A", 5), &[])?;
    let b = co.add_job("B", fake("B", 5, Outcome::Panic), &[a])?;
    co.add_job("C", ok("C", 5), &[b])?;

    let (convey, result, _) = invoke(&co).await;
    assert!(result.unwrap_err().to_string().contains("job B panic"));
    assert!(!convey.ran("C"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn global_timeout_returns_sentinel() -> TestResult {
    init_tracing();

    let mut co = Orchestrator::new().with_timeout(ms(1000));
    co.add_job("A", ok("A", 2000), &[])?;

    let (_convey, result, elapsed) = invoke(&co).await;
    assert!(result.unwrap_err().is_timeout());
    assert!(approximately(elapsed, ms(1000)), "elapsed {elapsed:?}");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn timeout_stops_jobs_that_have_not_started() -> TestResult {
    init_tracing();

    let mut co = Orchestrator::new().with_timeout(ms(100));
    let a = co.add_job("A", ok("A", 200), &[])?;
    co.add_job("B", ok("B", 10), &[a])?;

    let (convey, result, _) = invoke(&co).await;
    assert!(matches!(result, Err(CollabError::Timeout)));

    // A keeps running unattended and finishes; B sees the cancelled token.
    tokio::time::sleep(ms(300)).await;
    assert!(convey.ran("A"));
    assert!(!convey.ran("B"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn caller_cancellation_skips_every_job() -> TestResult {
    init_tracing();

    let sink = RecordingSink::new();
    let mut co = Orchestrator::new().with_sink(sink.clone());
    let a = co.add_job("A", ok("A", 10), &[])?;
    co.add_job("B", ok("B", 10), &[a])?;

    let ctx = CancellationToken::new();
    ctx.cancel();
    let convey = Convey::new();
    let err = co.run(&ctx, Arc::clone(&convey)).await.unwrap_err();

    assert!(err.is_canceled());
    assert_eq!(convey.result(), "");
    assert_eq!(sink.canceled().len(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn caller_cancellation_mid_run() -> TestResult {
    init_tracing();

    let mut co = Orchestrator::new();
    let a = co.add_job("A", ok("A", 100), &[])?;
    co.add_job("B", ok("B", 100), &[a])?;

    let ctx = CancellationToken::new();
    {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(ms(50)).await;
            ctx.cancel();
        });
    }

    let convey = Convey::new();
    let err = co.run(&ctx, Arc::clone(&convey)).await.unwrap_err();
    assert!(matches!(err, CollabError::Canceled { ref name } if name == "B"));
    assert_eq!(convey.result(), "A");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn internal_failure_does_not_cancel_the_caller() -> TestResult {
    init_tracing();

    let mut co = Orchestrator::new();
    co.add_job("A", fake("A", 1, Outcome::Fail), &[])?;

    let ctx = CancellationToken::new();
    assert!(co.run(&ctx, Convey::new()).await.is_err());
    assert!(!ctx.is_cancelled());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn orchestrator_can_run_twice() -> TestResult {
    init_tracing();

    let mut co = Orchestrator::new();
    let a = co.add_job("A", ok("A", 10), &[])?;
    co.add_job("B", ok("B", 10), &[a])?;

    for _ in 0..2 {
        let (convey, result, elapsed) = invoke(&co).await;
        result?;
        assert_eq!(convey.result(), "AB");
        assert!(approximately(elapsed, ms(20)), "elapsed {elapsed:?}");
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn duplicate_names_are_allowed() -> TestResult {
    init_tracing();

    let mut co = Orchestrator::new();
    let first = co.add_job("A", ok("A", 10), &[])?;
    co.add_job("A", ok("A", 10), &[first])?;

    let (convey, result, _) = invoke(&co).await;
    result?;
    assert_eq!(convey.result(), "AA");
    Ok(())
}
