//! Scripted executor for scheduler tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::{TestExecutor, WorkerContext};
use crate::models::{ResultCode, TestItem, TestResult};

#[derive(Clone, Debug)]
struct Script {
    code: ResultCode,
    delay: Duration,
    error: bool,
    panic: bool,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            code: ResultCode::Pass,
            delay: Duration::ZERO,
            error: false,
            panic: false,
        }
    }
}

#[derive(Debug, Default)]
struct Gauge {
    active: usize,
    peak: usize,
}

/// Returns canned results per test path and records group concurrency
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    scripts: HashMap<String, Script>,
    default_delay: Duration,
    gauges: Mutex<HashMap<String, Gauge>>,
    init_calls: AtomicUsize,
    started: AtomicUsize,
    init_error: bool,
    init_panic: bool,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&mut self, path: &str) -> &mut Script {
        self.scripts.entry(path.to_string()).or_default()
    }

    pub fn code(mut self, path: &str, code: ResultCode) -> Self {
        self.script(path).code = code;
        self
    }

    pub fn slow(mut self, path: &str, delay: Duration) -> Self {
        self.script(path).delay = delay;
        self
    }

    pub fn error(mut self, path: &str) -> Self {
        self.script(path).error = true;
        self
    }

    pub fn panics(mut self, path: &str) -> Self {
        self.script(path).panic = true;
        self
    }

    /// Every worker's `init_worker` returns an error.
    pub fn init_fails(mut self) -> Self {
        self.init_error = true;
        self
    }

    /// Every worker's `init_worker` panics, killing the worker task.
    pub fn init_panics(mut self) -> Self {
        self.init_panic = true;
        self
    }

    pub fn default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Highest number of tests seen running at once in `group`.
    pub fn peak(&self, group: &str) -> usize {
        self.gauges
            .lock()
            .unwrap()
            .get(group)
            .map(|g| g.peak)
            .unwrap_or(0)
    }

    fn enter(&self, group: &str) {
        let mut gauges = self.gauges.lock().unwrap();
        let gauge = gauges.entry(group.to_string()).or_default();
        gauge.active += 1;
        gauge.peak = gauge.peak.max(gauge.active);
    }

    fn leave(&self, group: &str) {
        let mut gauges = self.gauges.lock().unwrap();
        if let Some(gauge) = gauges.get_mut(group) {
            gauge.active -= 1;
        }
    }
}

impl TestExecutor for ScriptedExecutor {
    fn init_worker(&self, ctx: &WorkerContext) -> anyhow::Result<()> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        if self.init_panic {
            panic!("worker {} crashed during init", ctx.worker_id);
        }
        if self.init_error {
            anyhow::bail!("initialization refused for worker {}", ctx.worker_id);
        }
        Ok(())
    }

    async fn run_one(
        &self,
        ctx: &WorkerContext,
        _index: usize,
        mut item: TestItem,
    ) -> anyhow::Result<TestItem> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let script = self.scripts.get(&item.path).cloned().unwrap_or_default();
        let delay = if script.delay.is_zero() {
            self.default_delay
        } else {
            script.delay
        };
        let group = item.group.clone().unwrap_or_default();

        let permit = ctx.permits.acquire(item.group.as_deref()).await?;
        self.enter(&group);
        tokio::time::sleep(delay).await;
        self.leave(&group);
        permit.release();

        if script.error {
            anyhow::bail!("environment failure in {}", item.path);
        }
        if script.panic {
            panic!("executor blew up on {}", item.path);
        }

        let output = format!("ran {}", item.path);
        item.set_result(TestResult::new(script.code, output, delay));
        Ok(item)
    }
}
