//! Convergence waits.
//!
//! Masters learn about tablet servers only through periodic heartbeats and
//! offer no notification channel, so every wait is a bounded poll on the
//! calling task: query the master, compare, sleep `poll_interval`, repeat
//! until the condition holds or the deadline passes. The last query always
//! happens at (or just after) the deadline. There is no cancellation.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tokio::time::Instant;
use tracing::debug;
use tracing::warn;

use super::MiniCluster;
use super::ServerFactory;
use crate::metrics::WAIT_POLLS;
use crate::metrics::WAIT_TIMEOUTS;
use crate::Error;
use crate::MasterHandle;
use crate::ReplicaLocation;
use crate::Result;
use crate::TsDescriptor;

/// Result of a convergence wait: whether the condition held before the
/// deadline, and the master's answer from the last poll either way.
#[derive(Debug, Clone, PartialEq)]
pub struct WaitOutcome<T> {
    what: String,
    waited: Duration,
    converged: bool,
    observed: Vec<T>,
}

impl<T> WaitOutcome<T> {
    pub fn is_converged(&self) -> bool {
        self.converged
    }

    /// Time spent polling, measured when the last observation was taken.
    pub fn waited(&self) -> Duration {
        self.waited
    }

    /// The last observation. On timeout this is what the master reported at
    /// the deadline.
    pub fn observed(&self) -> &[T] {
        &self.observed
    }

    pub fn into_observed(self) -> Vec<T> {
        self.observed
    }

    /// Converts a timed out outcome into `Error::TimedOut`.
    pub fn into_result(self) -> Result<Vec<T>> {
        if self.converged {
            Ok(self.observed)
        } else {
            Err(Error::TimedOut {
                what: self.what,
                waited: self.waited,
                observed: self.observed.len(),
            })
        }
    }
}

/// Polls `query` until `converged` accepts its result or `timeout` elapses.
///
/// Query errors end the wait immediately. Running out of time is not an
/// error here; the returned outcome is simply not converged.
pub(crate) async fn poll_until<T, Q, Fut, P>(
    primitive: &'static str,
    what: &str,
    timeout: Duration,
    poll_interval: Duration,
    mut query: Q,
    converged: P,
) -> Result<WaitOutcome<T>>
where
    Q: FnMut() -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
    P: Fn(&[T]) -> bool,
{
    let started = Instant::now();
    let mut polls = 0u64;
    loop {
        polls += 1;
        WAIT_POLLS.with_label_values(&[primitive]).inc();

        let observed = query().await?;
        let waited = started.elapsed();
        if converged(observed.as_slice()) {
            debug!("{what}: converged after {:?} ({polls} polls)", waited);
            return Ok(WaitOutcome {
                what: what.to_string(),
                waited,
                converged: true,
                observed,
            });
        }

        if waited >= timeout {
            WAIT_TIMEOUTS.with_label_values(&[primitive]).inc();
            warn!(
                "{what}: timed out after {:?} ({polls} polls, last observed {})",
                waited,
                observed.len()
            );
            return Ok(WaitOutcome {
                what: what.to_string(),
                waited,
                converged: false,
                observed,
            });
        }

        sleep(poll_interval.min(timeout - waited)).await;
    }
}

impl<F: ServerFactory> MiniCluster<F> {
    /// Waits until at least `count` tablet servers are registered with the
    /// master. Servers registering later do not invalidate the result.
    ///
    /// # Errors
    /// - `Error::InvalidArgument` if the master is not running
    /// - `Error::TimedOut` after `wait.registration_wait_timeout_ms`
    pub async fn wait_for_tablet_server_count(
        &self,
        count: usize,
    ) -> Result<()> {
        self.wait_for_tablet_server_descriptors(count)
            .await?
            .into_result()
            .map(|_| ())
    }

    /// Like [`MiniCluster::wait_for_tablet_server_count`], but a timeout is
    /// reported through the outcome, which carries the descriptors from the
    /// last poll whether or not `count` was reached.
    ///
    /// # Errors
    /// - `Error::InvalidArgument` if the master is not running
    pub async fn wait_for_tablet_server_descriptors(
        &self,
        count: usize,
    ) -> Result<WaitOutcome<TsDescriptor>> {
        let master = self.running_master()?;
        poll_until(
            "tablet_server_count",
            &format!("waiting for {count} registered tablet servers"),
            self.config.wait.registration_timeout(),
            self.config.wait.poll_interval(),
            move || master.list_registered_tablet_servers(),
            |descs| descs.len() >= count,
        )
        .await
    }

    /// Waits until the master reports exactly `expected_count` replicas of
    /// `tablet_id`.
    ///
    /// # Errors
    /// - `Error::InvalidArgument` if the master is not running
    /// - `Error::TimedOut` after `wait.tablet_report_wait_timeout_ms`
    pub async fn wait_for_replica_count(
        &self,
        tablet_id: &str,
        expected_count: usize,
    ) -> Result<()> {
        self.wait_for_replica_locations(tablet_id, expected_count)
            .await?
            .into_result()
            .map(|_| ())
    }

    /// Like [`MiniCluster::wait_for_replica_count`], but a timeout is
    /// reported through the outcome, which carries the replicas from the
    /// last poll.
    ///
    /// # Errors
    /// - `Error::InvalidArgument` if the master is not running
    pub async fn wait_for_replica_locations(
        &self,
        tablet_id: &str,
        expected_count: usize,
    ) -> Result<WaitOutcome<ReplicaLocation>> {
        let master = self.running_master()?;
        poll_until(
            "replica_count",
            &format!("waiting for {expected_count} replicas of tablet {tablet_id}"),
            self.config.wait.tablet_report_timeout(),
            self.config.wait.poll_interval(),
            move || master.list_replica_locations(tablet_id),
            |locations| locations.len() == expected_count,
        )
        .await
    }
}
