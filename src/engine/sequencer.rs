//! Strictly sequential execution under a fixed-rate quota

use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;

use crate::core::constants::timeouts;
use crate::core::error::RemoteError;
use crate::engine::retry::{RetryPolicy, retry};

/// Minimum pause between the end of one operation and the start of the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaSpacing(pub Duration);

impl Default for QuotaSpacing {
    fn default() -> Self {
        Self(Duration::from_millis(timeouts::DEFAULT_QUOTA_SPACING_MS))
    }
}

impl QuotaSpacing {
    pub fn from_millis(ms: u64) -> Self {
        Self(Duration::from_millis(ms))
    }

    pub fn duration(&self) -> Duration {
        self.0
    }
}

/// A queued unit of work the sequencer can name in logs.
pub trait OperationDescriptor {
    fn describe(&self) -> String;
}

/// Outcome for one queued descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchEntry<D, T> {
    pub descriptor: D,
    pub result: Result<T, RemoteError>,
}

impl<D, T> BatchEntry<D, T> {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RateLimitedSequencer {
    spacing: QuotaSpacing,
    policy: RetryPolicy,
}

impl RateLimitedSequencer {
    pub fn new(spacing: QuotaSpacing, policy: RetryPolicy) -> Self {
        Self { spacing, policy }
    }

    /// Drain `descriptors` one at a time through `exec`, each call wrapped by
    /// the retry executor.
    ///
    /// Returns exactly one entry per descriptor, in input order. A failed
    /// entry carries its error; the batch always runs to the end.
    /// `on_progress(done, total)` is called after each completion.
    pub async fn run<D, T, F, Fut, P>(
        &self,
        descriptors: Vec<D>,
        exec: F,
        mut on_progress: P,
    ) -> Vec<BatchEntry<D, T>>
    where
        D: OperationDescriptor,
        F: Fn(&D) -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
        P: FnMut(usize, usize),
    {
        let total = descriptors.len();
        let mut queue: VecDeque<D> = descriptors.into();
        let mut entries = Vec::with_capacity(total);

        while let Some(descriptor) = queue.pop_front() {
            if !entries.is_empty() && !self.spacing.0.is_zero() {
                tokio::time::sleep(self.spacing.0).await;
            }

            let label = descriptor.describe();
            let result = retry(&self.policy, &label, || exec(&descriptor)).await;
            if let Err(ref err) = result {
                crate::logging::log_source_failure(&label, err);
            }
            entries.push(BatchEntry { descriptor, result });

            crate::logging::log_batch_progress(entries.len(), total);
            on_progress(entries.len(), total);
        }

        entries
    }
}
