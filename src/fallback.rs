//! Ordered "first non-empty wins" runner.
//!
//! Each step is an attempt that resolves to `Ok(Some(value))` (done),
//! `Ok(None)` (nothing there, try the next step) or `Err` (transport failure).
//! Errors from non-final steps are logged and skipped; only the final step's
//! error reaches the caller. An empty final step is a valid empty answer.

use crate::error::FetchError;
use futures::future::BoxFuture;

type Attempt<'a, T> = Box<dyn FnOnce() -> BoxFuture<'a, Result<Option<T>, FetchError>> + Send + 'a>;

/// Values that can be "empty" for fallback purposes.
pub trait Emptiness {
    fn is_empty_result(&self) -> bool;
}

impl<T> Emptiness for Vec<T> {
    fn is_empty_result(&self) -> bool {
        self.is_empty()
    }
}

impl Emptiness for crate::models::CardPage {
    fn is_empty_result(&self) -> bool {
        self.results.is_empty()
    }
}

/// `Some(value)` unless the value is empty.
pub fn non_empty<T: Emptiness>(value: T) -> Option<T> {
    if value.is_empty_result() {
        None
    } else {
        Some(value)
    }
}

/// Outcome of a chain, with the label of the step that produced it.
#[derive(Debug)]
pub struct ChainOutcome<T> {
    pub value: Option<T>,
    pub step: Option<&'static str>,
}

impl<T> ChainOutcome<T> {
    pub fn into_value(self) -> Option<T> {
        self.value
    }
}

pub struct FallbackChain<'a, T> {
    name: &'static str,
    steps: Vec<(&'static str, Attempt<'a, T>)>,
}

impl<'a, T: Send + 'a> FallbackChain<'a, T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            steps: Vec::new(),
        }
    }

    /// Append a step. `attempt` is only invoked if every earlier step came
    /// back empty or failed.
    pub fn step<F>(mut self, label: &'static str, attempt: F) -> Self
    where
        F: FnOnce() -> BoxFuture<'a, Result<Option<T>, FetchError>> + Send + 'a,
    {
        self.steps.push((label, Box::new(attempt)));
        self
    }

    /// Append a step only when `enabled`.
    pub fn step_if<F>(self, enabled: bool, label: &'static str, attempt: F) -> Self
    where
        F: FnOnce() -> BoxFuture<'a, Result<Option<T>, FetchError>> + Send + 'a,
    {
        if enabled {
            self.step(label, attempt)
        } else {
            self
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub async fn run(self) -> Result<ChainOutcome<T>, FetchError> {
        let total = self.steps.len();
        for (index, (label, attempt)) in self.steps.into_iter().enumerate() {
            let is_last = index + 1 == total;
            match attempt().await {
                Ok(Some(value)) => {
                    log::debug!("[{}] step '{}' produced a result", self.name, label);
                    return Ok(ChainOutcome {
                        value: Some(value),
                        step: Some(label),
                    });
                }
                Ok(None) => {
                    log::debug!("[{}] step '{}' came back empty", self.name, label);
                }
                Err(e) if is_last => {
                    log::warn!("[{}] final step '{}' failed: {}", self.name, label, e);
                    return Err(e);
                }
                Err(e) => {
                    log::warn!("[{}] step '{}' failed, trying next: {}", self.name, label, e);
                }
            }
        }
        Ok(ChainOutcome {
            value: None,
            step: None,
        })
    }
}
