//! Single-flight slot shared by every caller waiting on one parse

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::{Error, Result};

/// In-flight computation for one key.
///
/// The electing caller publishes exactly one outcome with [`Loading::complete`];
/// every waiter observes that same outcome.
pub(crate) struct Loading<S> {
    outcome: Mutex<Option<Result<Arc<S>>>>,
    ready: Condvar,
}

impl<S> Loading<S> {
    pub fn new() -> Self {
        Self {
            outcome: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    pub fn complete(&self, outcome: Result<Arc<S>>) {
        let mut slot = self.outcome.lock();
        debug_assert!(slot.is_none(), "load completed twice");
        *slot = Some(outcome);
        drop(slot);
        self.ready.notify_all();
    }

    pub fn wait(&self) -> Result<Arc<S>> {
        let mut slot = self.outcome.lock();
        loop {
            if let Some(outcome) = slot.as_ref() {
                return outcome.clone();
            }
            self.ready.wait(&mut slot);
        }
    }

    pub fn wait_timeout(&self, timeout: Duration) -> Result<Arc<S>> {
        let deadline = Instant::now().checked_add(timeout);
        let mut slot = self.outcome.lock();
        loop {
            if let Some(outcome) = slot.as_ref() {
                return outcome.clone();
            }
            match deadline {
                Some(deadline) => {
                    if self.ready.wait_until(&mut slot, deadline).timed_out() {
                        return slot
                            .as_ref()
                            .map_or(Err(Error::Timeout(timeout)), Clone::clone);
                    }
                }
                // Deadline beyond the clock's range: wait indefinitely
                None => self.ready.wait(&mut slot),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::error::ParseError;

    #[test]
    fn test_wait_returns_completed_value() {
        let loading = Loading::new();
        loading.complete(Ok(Arc::new(7)));
        assert_eq!(*loading.wait().unwrap(), 7);
    }

    #[test]
    fn test_waiters_share_outcome() {
        let loading = Arc::new(Loading::<String>::new());
        let statement = Arc::new("parsed".to_string());

        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let loading = Arc::clone(&loading);
                thread::spawn(move || loading.wait())
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        loading.complete(Ok(Arc::clone(&statement)));

        for waiter in waiters {
            let received = waiter.join().unwrap().unwrap();
            assert!(Arc::ptr_eq(&received, &statement));
        }
    }

    #[test]
    fn test_waiters_share_failure() {
        let loading = Arc::new(Loading::<()>::new());
        let waiter = {
            let loading = Arc::clone(&loading);
            thread::spawn(move || loading.wait())
        };

        loading.complete(Err(ParseError::new("no").into()));

        let err = waiter.join().unwrap().unwrap_err();
        assert_eq!(err, Error::Parse(ParseError::new("no")));
    }

    #[test]
    fn test_wait_timeout_expires() {
        let loading = Loading::<()>::new();
        let err = loading
            .wait_timeout(Duration::from_millis(10))
            .unwrap_err();
        assert_eq!(err, Error::Timeout(Duration::from_millis(10)));
    }

    #[test]
    fn test_wait_timeout_sees_completed_value() {
        let loading = Loading::new();
        loading.complete(Ok(Arc::new(1u8)));
        assert_eq!(*loading.wait_timeout(Duration::ZERO).unwrap(), 1);
    }
}
