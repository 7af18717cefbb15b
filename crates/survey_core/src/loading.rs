use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

#[derive(Debug, Error)]
#[error("another load is already in flight")]
pub struct ConcurrentLoadError;

/// Guard over the wizard's loading state. At most one token is live at a
/// time; dropping the token releases the gate on every exit path, including
/// failures.
#[derive(Debug, Default)]
pub struct LoadingGate {
    busy: AtomicBool,
}

impl LoadingGate {
    pub fn new() -> Self {
        Self {
            busy: AtomicBool::new(false),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn acquire(&self) -> Result<LoadingToken<'_>, ConcurrentLoadError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ConcurrentLoadError)?;
        Ok(LoadingToken { gate: self })
    }
}

#[derive(Debug)]
pub struct LoadingToken<'a> {
    gate: &'a LoadingGate,
}

impl Drop for LoadingToken<'_> {
    fn drop(&mut self) {
        self.gate.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_while_a_token_is_live() {
        let gate = LoadingGate::new();
        let token = gate.acquire().expect("first acquire");
        assert!(gate.acquire().is_err());
        drop(token);
        assert!(gate.acquire().is_ok());
    }

    #[test]
    fn dropping_the_token_releases_the_gate() {
        let gate = LoadingGate::new();
        drop(gate.acquire().expect("acquire"));
        assert!(!gate.is_busy());
    }
}
