use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// What a fake job does after its simulated work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Succeed,
    Fail,
    Panic,
}

/// Start / end of one job's function, measured on the tokio clock.
#[derive(Debug, Clone)]
pub struct Span {
    pub name: String,
    pub start: Instant,
    pub end: Instant,
}

/// Shared payload for orchestrator tests.
///
/// Each fake job appends its name to `result` when its work is done and
/// records the span its function ran for.
#[derive(Debug, Default)]
pub struct Convey {
    result: Mutex<String>,
    spans: Mutex<Vec<Span>>,
}

impl Convey {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn result(&self) -> String {
        self.result.lock().unwrap().clone()
    }

    pub fn spans(&self) -> Vec<Span> {
        self.spans.lock().unwrap().clone()
    }

    pub fn span_of(&self, name: &str) -> Option<Span> {
        self.spans().into_iter().find(|s| s.name == name)
    }

    pub fn ran(&self, name: &str) -> bool {
        self.span_of(name).is_some()
    }
}

pub type FakeJob =
    Box<dyn Fn(CancellationToken, Arc<Convey>) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// A job that sleeps `millis`, appends `name`, then behaves per `outcome`.
pub fn fake(name: &str, millis: u64, outcome: Outcome) -> FakeJob {
    let name = name.to_string();
    Box::new(move |_token: CancellationToken, convey: Arc<Convey>| {
        let name = name.clone();
        async move {
            let start = Instant::now();
            tokio::time::sleep(Duration::from_millis(millis)).await;
            convey.result.lock().unwrap().push_str(&name);
            convey.spans.lock().unwrap().push(Span {
                name: name.clone(),
                start,
                end: Instant::now(),
            });

            match outcome {
                Outcome::Succeed => Ok(()),
                Outcome::Fail => Err(anyhow::anyhow!("{name} exploded")),
                Outcome::Panic => panic!("{name} went off the rails"),
            }
        }
        .boxed()
    })
}

pub fn ok(name: &str, millis: u64) -> FakeJob {
    fake(name, millis, Outcome::Succeed)
}
