// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Background solid rebuilds
//!
//! A rebuild clips a [`ClipSnapshot`] on the rayon pool and leaves its outcome
//! in a single-slot [`RebuildSlot`]. Starting a new rebuild cancels the one in
//! flight; the owner publishes an outcome only if its generation still matches
//! the registry.

use crate::csg::SolidKernel;
use crate::error::{Error, Result};
use crate::mesh::Mesh;
use crate::solid::SolidClipper;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};
use surfclip_core::ClipSnapshot;
use tracing::debug;

/// Cooperative cancellation flag shared with a running rebuild
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// `Err(Error::Cancelled)` once cancelled
    #[inline]
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Result of one rebuild, tagged with the generation it was built from
#[derive(Debug, Clone)]
pub struct RebuildOutcome {
    pub generation: u64,
    pub result: Result<Mesh>,
}

/// Single-slot handoff between rebuild jobs and the surface owner
///
/// Only the newest outcome is kept; an older generation never replaces a
/// newer one.
#[derive(Debug, Default)]
pub struct RebuildSlot {
    latest: Mutex<Option<RebuildOutcome>>,
    ready: Condvar,
}

impl RebuildSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an outcome and wake any waiter
    pub fn store(&self, outcome: RebuildOutcome) {
        let mut latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = latest.as_ref() {
            if existing.generation > outcome.generation {
                debug!(
                    stale = outcome.generation,
                    current = existing.generation,
                    "dropping out-of-order rebuild"
                );
                return;
            }
        }
        *latest = Some(outcome);
        self.ready.notify_all();
    }

    /// Take the stored outcome, if any
    pub fn take(&self) -> Option<RebuildOutcome> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Block until an outcome is available or `timeout` elapses
    pub fn wait_timeout(&self, timeout: Duration) -> Option<RebuildOutcome> {
        let deadline = Instant::now() + timeout;
        let mut latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        while latest.is_none() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            let (guard, _) = self
                .ready
                .wait_timeout(latest, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            latest = guard;
        }
        latest.take()
    }
}

/// Runs solid clips off the calling thread, one live job at a time
#[derive(Debug)]
pub struct SolidRebuilder<K: SolidKernel> {
    clipper: Arc<SolidClipper<K>>,
    slot: Arc<RebuildSlot>,
    in_flight: Option<(u64, CancelToken)>,
}

impl<K> SolidRebuilder<K>
where
    K: SolidKernel + 'static,
{
    pub fn new(clipper: SolidClipper<K>) -> Self {
        Self {
            clipper: Arc::new(clipper),
            slot: Arc::new(RebuildSlot::new()),
            in_flight: None,
        }
    }

    #[inline]
    pub fn clipper(&self) -> &SolidClipper<K> {
        &self.clipper
    }

    #[inline]
    pub fn slot(&self) -> &RebuildSlot {
        &self.slot
    }

    /// Generation of the job most recently started, if it has not been
    /// collected yet
    #[inline]
    pub fn in_flight(&self) -> Option<u64> {
        self.in_flight.as_ref().map(|(generation, _)| *generation)
    }

    /// Cancel the running job, if any
    pub fn cancel(&mut self) {
        if let Some((generation, token)) = self.in_flight.take() {
            debug!(generation, "cancelling solid rebuild");
            token.cancel();
        }
    }

    /// Start clipping `snapshot` on the rayon pool, superseding any running job
    pub fn spawn(&mut self, snapshot: ClipSnapshot) {
        self.cancel();

        let token = CancelToken::new();
        let generation = snapshot.generation;
        self.in_flight = Some((generation, token.clone()));

        let clipper = Arc::clone(&self.clipper);
        let slot = Arc::clone(&self.slot);
        debug!(
            generation,
            rectangles = snapshot.rectangles.len(),
            shapes = snapshot.shapes.len(),
            "spawning solid rebuild"
        );

        rayon::spawn(move || {
            let result = clipper.clip(&snapshot.rectangles, &snapshot.shapes, &token);
            if token.is_cancelled() {
                debug!(generation, "discarding cancelled rebuild");
                return;
            }
            slot.store(RebuildOutcome { generation, result });
        });
    }

    /// Clip `snapshot` on the calling thread, superseding any running job
    pub fn run_blocking(&mut self, snapshot: &ClipSnapshot) -> RebuildOutcome {
        self.cancel();
        // A finished job from before this call is stale now
        self.slot.take();

        RebuildOutcome {
            generation: snapshot.generation,
            result: self
                .clipper
                .clip(&snapshot.rectangles, &snapshot.shapes, &CancelToken::new()),
        }
    }

    /// Collect a finished outcome without blocking
    pub fn poll(&mut self) -> Option<RebuildOutcome> {
        let outcome = self.slot.take()?;
        self.settle(&outcome);
        Some(outcome)
    }

    /// Block for a finished outcome
    pub fn wait(&mut self, timeout: Duration) -> Option<RebuildOutcome> {
        let outcome = self.slot.wait_timeout(timeout)?;
        self.settle(&outcome);
        Some(outcome)
    }

    fn settle(&mut self, outcome: &RebuildOutcome) {
        if self.in_flight() == Some(outcome.generation) {
            self.in_flight = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn outcome(generation: u64) -> RebuildOutcome {
        RebuildOutcome {
            generation,
            result: Ok(Mesh::new()),
        }
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(token.check().is_ok());
        clone.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(token.check(), Err(Error::Cancelled)));
    }

    #[test]
    fn test_slot_keeps_newest_generation() {
        let slot = RebuildSlot::new();
        slot.store(outcome(3));
        slot.store(outcome(2));
        assert_eq!(slot.take().map(|o| o.generation), Some(3));
        assert!(slot.take().is_none());
    }

    #[test]
    fn test_wait_timeout_expires() {
        let slot = RebuildSlot::new();
        assert!(slot.wait_timeout(Duration::from_millis(10)).is_none());
    }

    #[test]
    fn test_wait_wakes_on_store() {
        let slot = Arc::new(RebuildSlot::new());
        let producer = Arc::clone(&slot);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.store(outcome(7));
        });

        let received = slot.wait_timeout(Duration::from_secs(5));
        handle.join().unwrap();
        assert_eq!(received.map(|o| o.generation), Some(7));
    }
}
