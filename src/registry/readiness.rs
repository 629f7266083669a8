use thiserror::Error;

use crate::errors::StoreError;
use crate::store::StoreClient;

// -----------------------------------------------------------------------------
// ----- Readiness -------------------------------------------------------------

/// A connection's status at the instant it was checked. Never cached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    Unresponsive,
    Closed,
}

/// What the heal loop does next for a given [`Readiness`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HealStep {
    Done,
    Probe,
    Reopen,
}

#[derive(Debug, Error)]
pub enum HealError {
    #[error("reopen failed: {0}")]
    Reopen(#[source] StoreError),

    #[error("liveness probe failed: {0}")]
    Probe(#[source] StoreError),

    #[error("connection still {0:?} after healing")]
    Stuck(Readiness),
}

// -----------------------------------------------------------------------------
// ----- Readiness: Static -----------------------------------------------------

impl Readiness {
    pub fn of<C: StoreClient + ?Sized>(client: &C) -> Self {
        if client.is_ready() {
            Readiness::Ready
        } else if client.is_open() {
            Readiness::Unresponsive
        } else {
            Readiness::Closed
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Readiness: Public -----------------------------------------------------

impl Readiness {
    pub fn next_step(self) -> HealStep {
        match self {
            Readiness::Ready => HealStep::Done,
            // Reopening a live transport is wasteful; ask it to answer instead.
            Readiness::Unresponsive => HealStep::Probe,
            Readiness::Closed => HealStep::Reopen,
        }
    }
}

// -----------------------------------------------------------------------------
// ----- heal ------------------------------------------------------------------

/// Drive `client` towards [`Readiness::Ready`]. Each step runs at most once,
/// so a reopen that leaves the transport unresponsive gets one probe and no
/// second reopen.
pub async fn heal<C: StoreClient + ?Sized>(client: &C) -> Result<(), HealError> {
    let mut reopened = false;
    let mut probed = false;

    loop {
        let state = Readiness::of(client);

        match state.next_step() {
            HealStep::Done => return Ok(()),

            HealStep::Reopen if !reopened => {
                reopened = true;
                client.open().await.map_err(HealError::Reopen)?;
            }

            HealStep::Probe if !probed => {
                probed = true;
                client.ping().await.map_err(HealError::Probe)?;
            }

            HealStep::Reopen | HealStep::Probe => return Err(HealError::Stuck(state)),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{Command, Reply};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Flags plus scripted outcomes for open/ping.
    #[derive(Default)]
    struct Scripted {
        open: AtomicBool,
        ready: AtomicBool,
        open_fails: bool,
        open_leaves_unresponsive: bool,
        ping_fails: bool,
        ping_leaves_unresponsive: bool,
        opens: AtomicUsize,
        pings: AtomicUsize,
    }

    impl Scripted {
        fn with_flags(open: bool, ready: bool) -> Self {
            let s = Self::default();
            s.open.store(open, Ordering::SeqCst);
            s.ready.store(ready, Ordering::SeqCst);
            s
        }
    }

    impl StoreClient for Scripted {
        fn is_open(&self) -> bool {
            self.open.load(Ordering::SeqCst)
        }

        fn is_ready(&self) -> bool {
            self.ready.load(Ordering::SeqCst)
        }

        async fn open(&self) -> Result<(), StoreError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            if self.open_fails {
                return Err(StoreError::Closed);
            }
            self.open.store(true, Ordering::SeqCst);
            self.ready.store(!self.open_leaves_unresponsive, Ordering::SeqCst);
            Ok(())
        }

        async fn ping(&self) -> Result<(), StoreError> {
            self.pings.fetch_add(1, Ordering::SeqCst);
            if self.ping_fails {
                return Err(StoreError::Timeout(std::time::Duration::from_secs(1)));
            }
            self.ready.store(!self.ping_leaves_unresponsive, Ordering::SeqCst);
            Ok(())
        }

        async fn call(&self, _command: Command) -> Result<Reply, StoreError> {
            Ok(Reply::Status("OK".into()))
        }

        async fn quit(&self) -> Result<(), StoreError> {
            Ok(())
        }

        fn terminate(&self) {}
    }

    #[test]
    fn readiness_from_flags() {
        assert_eq!(Readiness::of(&Scripted::with_flags(true, true)), Readiness::Ready);
        assert_eq!(Readiness::of(&Scripted::with_flags(true, false)), Readiness::Unresponsive);
        assert_eq!(Readiness::of(&Scripted::with_flags(false, false)), Readiness::Closed);
    }

    #[test]
    fn step_table() {
        assert_eq!(Readiness::Ready.next_step(), HealStep::Done);
        assert_eq!(Readiness::Unresponsive.next_step(), HealStep::Probe);
        assert_eq!(Readiness::Closed.next_step(), HealStep::Reopen);
    }

    #[tokio::test]
    async fn ready_client_is_left_alone() {
        let client = Scripted::with_flags(true, true);
        heal(&client).await.unwrap();
        assert_eq!(client.opens.load(Ordering::SeqCst), 0);
        assert_eq!(client.pings.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn closed_client_is_reopened() {
        let client = Scripted::with_flags(false, false);
        heal(&client).await.unwrap();
        assert_eq!(client.opens.load(Ordering::SeqCst), 1);
        assert_eq!(client.pings.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unresponsive_client_is_probed_not_reopened() {
        let client = Scripted::with_flags(true, false);
        heal(&client).await.unwrap();
        assert_eq!(client.opens.load(Ordering::SeqCst), 0);
        assert_eq!(client.pings.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reopen_then_probe_when_reopen_is_not_enough() {
        let client = Scripted {
            open_leaves_unresponsive: true,
            ..Scripted::default()
        };
        heal(&client).await.unwrap();
        assert_eq!(client.opens.load(Ordering::SeqCst), 1);
        assert_eq!(client.pings.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failures_are_reported_per_step() {
        let client = Scripted {
            open_fails: true,
            ..Scripted::default()
        };
        assert!(matches!(heal(&client).await, Err(HealError::Reopen(_))));

        let client = Scripted {
            ping_fails: true,
            ..Scripted::with_flags(true, false)
        };
        assert!(matches!(heal(&client).await, Err(HealError::Probe(_))));
    }

    #[tokio::test]
    async fn probe_that_does_not_help_is_stuck() {
        let client = Scripted {
            ping_leaves_unresponsive: true,
            ..Scripted::with_flags(true, false)
        };
        assert!(matches!(
            heal(&client).await,
            Err(HealError::Stuck(Readiness::Unresponsive))
        ));
        assert_eq!(client.pings.load(Ordering::SeqCst), 1);
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
