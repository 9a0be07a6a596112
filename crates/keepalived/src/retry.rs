//! Bounded exponential backoff for waiting on asynchronously written dumps.

use crate::error::{Error, Result};
use crate::host::{DumpReader, DumpStamp, KeepalivedHost};
use async_trait::async_trait;
use std::io;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::debug;

/// Source of time for the retry loop.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    async fn sleep(&self, duration: Duration);
}

/// Wall clock backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Backoff parameters for opening a dump file.
///
/// The wait doubles after every failed attempt, never exceeds half of
/// `max_elapsed`, and the loop gives up once `max_elapsed` has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial_interval: Duration,
    pub max_elapsed: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(10),
            max_elapsed: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Upper bound for a single wait.
    pub fn max_interval(&self) -> Duration {
        self.max_elapsed / 2
    }

    fn next_interval(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max_interval())
    }

    /// Open `path` through `host`, retrying until a dump newer than
    /// `previous` appears or the policy's ceiling is reached.
    ///
    /// `previous` is the stamp taken before the daemon was signalled. A
    /// dump whose stamp still matches it, or changes while it is being
    /// read, is not ready yet.
    pub async fn open<H, C>(
        &self,
        host: &H,
        clock: &C,
        path: &Path,
        previous: Option<DumpStamp>,
    ) -> Result<DumpReader>
    where
        H: KeepalivedHost + ?Sized,
        C: Clock + ?Sized,
    {
        let start = clock.now();
        let mut interval = self.initial_interval.min(self.max_interval());
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let err = match open_fresh(host, path, previous).await {
                Ok(reader) => {
                    debug!(path = %path.display(), attempt, "Opened dump file");
                    return Ok(reader);
                }
                Err(e) => e,
            };

            let elapsed = clock.now().saturating_duration_since(start);
            if elapsed >= self.max_elapsed {
                return Err(Error::SnapshotTimeout {
                    path: path.to_path_buf(),
                    elapsed,
                    last_error: err.to_string(),
                });
            }

            let wait = interval.min(self.max_elapsed - elapsed);
            debug!(
                path = %path.display(),
                attempt,
                error = %err,
                wait_ms = wait.as_millis() as u64,
                "Dump file not ready, retrying"
            );
            clock.sleep(wait).await;
            interval = self.next_interval(interval);
        }
    }
}

async fn open_fresh<H>(
    host: &H,
    path: &Path,
    previous: Option<DumpStamp>,
) -> io::Result<DumpReader>
where
    H: KeepalivedHost + ?Sized,
{
    let before = host.dump_stamp(path).await;
    if before.is_some() && before == previous {
        return Err(io::Error::other("dump not rewritten since the signal"));
    }

    let reader = host.open_file(path).await?;

    if host.dump_stamp(path).await != before {
        return Err(io::Error::other("dump changed while it was read"));
    }
    Ok(reader)
}
