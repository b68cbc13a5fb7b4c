//! Shell command executor
//!
//! Runs each test's command through a shell and classifies the exit status.

use anyhow::Context;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::executor::{TestExecutor, WorkerContext};
use crate::models::{ResultCode, TestItem, TestResult};
use crate::utils::Timer;

#[derive(Clone, Debug)]
pub struct ShellExecutor {
    shell: String,
    per_test_timeout: Option<Duration>,
}

impl ShellExecutor {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            per_test_timeout: None,
        }
    }

    pub fn with_per_test_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.per_test_timeout = timeout;
        self
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new("sh")
    }
}

fn classify(success: bool, expect_fail: bool) -> ResultCode {
    match (success, expect_fail) {
        (true, false) => ResultCode::Pass,
        (true, true) => ResultCode::XPass,
        (false, false) => ResultCode::Fail,
        (false, true) => ResultCode::XFail,
    }
}

/// The process group a test's shell leads
///
/// Killing only the shell would leave background jobs and pipeline members
/// running, so dropping an armed group kills every process in it. That
/// covers the per-test timeout and a worker aborted mid-test.
#[derive(Debug)]
struct ProcessGroup {
    pgid: Option<i32>,
}

impl ProcessGroup {
    fn of(child: &Child) -> Self {
        Self {
            pgid: child.id().and_then(|id| i32::try_from(id).ok()),
        }
    }

    /// The shell exited on its own; leave the group alone.
    fn disarm(mut self) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        let Some(pgid) = self.pgid.take() else {
            return;
        };
        #[cfg(unix)]
        {
            debug!(pgid, "killing test process group");
            // SAFETY: kill(2) takes no pointers; a negative pid addresses the group.
            unsafe {
                libc::kill(-pgid, libc::SIGKILL);
            }
        }
        #[cfg(not(unix))]
        let _ = pgid;
    }
}

impl TestExecutor for ShellExecutor {
    fn init_worker(&self, ctx: &WorkerContext) -> anyhow::Result<()> {
        debug!(
            worker = ctx.worker_id,
            groups = ctx.permits.len(),
            shell = %self.shell,
            "shell worker ready"
        );
        Ok(())
    }

    async fn run_one(
        &self,
        ctx: &WorkerContext,
        _index: usize,
        mut item: TestItem,
    ) -> anyhow::Result<TestItem> {
        let definition = &item.definition;
        if definition.unsupported {
            item.set_result(TestResult::new(ResultCode::Unsupported, "", Duration::ZERO));
            return Ok(item);
        }
        if definition.skip {
            item.set_result(TestResult::new(ResultCode::Skip, "", Duration::ZERO));
            return Ok(item);
        }

        let command = definition
            .command
            .clone()
            .with_context(|| format!("test '{}' has no command", item.path))?;
        let expect_fail = definition.expect_fail;

        let _permit = ctx.permits.acquire(item.group.as_deref()).await?;

        let timer = Timer::start(item.path.clone());
        let mut shell = Command::new(&self.shell);
        shell
            .arg("-c")
            .arg(&command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        shell.process_group(0);

        let child = shell
            .spawn()
            .with_context(|| format!("failed to spawn '{}' for test '{}'", self.shell, item.path))?;
        let group = ProcessGroup::of(&child);

        let waited = match self.per_test_timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output()).await,
            None => Ok(child.wait_with_output().await),
        };

        let result = match waited {
            Ok(output) => {
                group.disarm();
                let output = output
                    .with_context(|| format!("failed to wait for test '{}'", item.path))?;
                let code = classify(output.status.success(), expect_fail);

                let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
                text.push_str(&String::from_utf8_lossy(&output.stderr));
                if !output.status.success() {
                    match output.status.code() {
                        Some(exit) => text.push_str(&format!("\nexit code: {exit}\n")),
                        None => text.push_str("\nterminated by signal\n"),
                    }
                }

                TestResult::new(code, text, timer.stop())
            }
            Err(_) => {
                drop(group);
                let limit = self.per_test_timeout.unwrap_or_default();
                warn!(path = %item.path, "test exceeded per-test timeout");
                TestResult::new(
                    ResultCode::Timeout,
                    format!("reached timeout of {} seconds", limit.as_secs_f64()),
                    timer.stop(),
                )
            }
        };

        item.set_result(result);
        Ok(item)
    }
}
