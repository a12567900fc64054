//! Pass scheduler
//!
//! Runs one reconciliation pass immediately, then one per tick of a fixed
//! interval until shutdown or a fatal error.
//!
//! ## Flow control
//!
//! ```text
//! ┌────────────┐  send().await  ┌─────────────────┐  recv  ┌──────────────┐
//! │ tick timer │ ─────────────▶ │ mpsc (cap. 3)   │ ─────▶ │ pass loop    │
//! └────────────┘                └─────────────────┘        └──────────────┘
//! ```
//!
//! The timer runs on its own task; passes run one at a time on the caller's
//! task. When passes are slower than the interval, up to [`TICK_BUFFER`]
//! ticks queue up. After that the timer task blocks on `send` and its next
//! tick is delayed, so under sustained overload ticks arrive late but none
//! are dropped and the queue never grows past its capacity.
//!
//! ## States
//!
//! Idle (waiting for a tick) → Running-Pass → Idle. The loop only leaves
//! through shutdown or a fatal error.

use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::{Stream, StreamExt};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, warn};

use crate::config::FailurePolicy;
use crate::engine::Reconciler;
use crate::error::{Error, Result};
use crate::traits::DnsApi;

/// Capacity of the tick queue between the timer and the pass loop
pub const TICK_BUFFER: usize = 3;

/// Drives reconciliation passes on a fixed interval
pub struct Scheduler<A> {
    /// The pass to run
    reconciler: Reconciler<A>,

    /// Time between ticks
    interval: Duration,

    /// Which failures end the loop
    failure_policy: FailurePolicy,
}

impl<A: DnsApi> Scheduler<A> {
    /// Create a new scheduler
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if `interval` is zero.
    pub fn new(reconciler: Reconciler<A>, interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(Error::config("Scheduler interval must be positive"));
        }

        Ok(Self {
            reconciler,
            interval,
            failure_policy: FailurePolicy::default(),
        })
    }

    /// Set the failure escalation policy
    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    /// The reconciler driven by this scheduler
    pub fn reconciler(&self) -> &Reconciler<A> {
        &self.reconciler
    }

    /// Run until `shutdown_rx` fires (or its sender is dropped)
    ///
    /// A pass that is already running is finished before shutdown is
    /// observed.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Shutdown was requested
    /// - `Err(Error)`: A pass failed in a way the failure policy escalates
    pub async fn run_with_shutdown(&self, shutdown_rx: oneshot::Receiver<()>) -> Result<()> {
        info!(
            "Scheduler started: {} host(s), interval {:?}",
            self.reconciler.hosts().len(),
            self.interval
        );

        self.run_once().await?;

        let (tick_tx, tick_rx) = mpsc::channel(TICK_BUFFER);
        let timer = tokio::spawn(produce_ticks(self.interval, tick_tx));

        let result = self
            .run_on_ticks(ReceiverStream::new(tick_rx), shutdown_rx)
            .await;

        timer.abort();
        info!("Scheduler stopped");
        result
    }

    /// Run one pass per item of `ticks` until shutdown
    ///
    /// No pass is run up front. A tick stream that ends is an
    /// [`Error::Internal`]: the timer is expected to outlive the loop.
    pub async fn run_on_ticks<S>(
        &self,
        mut ticks: S,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) -> Result<()>
    where
        S: Stream<Item = Instant> + Unpin,
    {
        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown_rx => {
                    info!("Shutdown signal received");
                    break Ok(());
                }

                tick = ticks.next() => match tick {
                    Some(at) => {
                        debug!("Tick at {:?} (lag {:?})", at, at.elapsed());
                        self.run_once().await?;
                    }
                    None => {
                        error!("Tick timer stopped unexpectedly");
                        break Err(Error::internal("tick timer stopped unexpectedly"));
                    }
                },
            }
        }
    }

    /// Run a single pass and apply the failure policy to its result
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The loop may continue
    /// - `Err(Error)`: The process should stop
    pub async fn run_once(&self) -> Result<()> {
        let fail_fast = self.failure_policy == FailurePolicy::FailFast;

        match self.reconciler.run_pass().await {
            Ok(report) => {
                let elapsed = report.finished_at - report.started_at;
                info!(
                    "Pass complete for {}: {} updated, {} unchanged, {} failed ({} ms)",
                    report.ip,
                    report.updated_count(),
                    report.unchanged_count(),
                    report.failed_count(),
                    elapsed.num_milliseconds()
                );

                if fail_fast && let Some(e) = report.into_first_failure() {
                    error!("Host update failed with fail-fast policy: {}", e);
                    return Err(e);
                }
                Ok(())
            }
            Err(e) if e.is_fatal() || fail_fast => {
                error!("Reconciliation pass failed: {}", e);
                Err(e)
            }
            Err(e) => {
                warn!("Reconciliation pass failed, will retry on next tick: {}", e);
                Ok(())
            }
        }
    }
}

/// Emit a tick every `period` into `tx`, starting one period from now
///
/// Blocks on a full queue; the missed-tick behavior then shifts the
/// schedule instead of bursting to catch up.
async fn produce_ticks(period: Duration, tx: mpsc::Sender<Instant>) {
    let mut timer = tokio::time::interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let at = timer.tick().await;
        if tx.send(at).await.is_err() {
            debug!("Tick receiver dropped, stopping timer");
            break;
        }
    }
}
