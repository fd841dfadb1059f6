//! Strictly ordered execution of asynchronous steps.
//!
//! Each step receives the value produced by the previous one. The carried
//! value is a `Result`; the dispatcher stops at the first `Err`, so a step
//! body only ever sees a successful input.

use std::future::Future;
use std::pin::Pin;

use tracing::debug;

use crate::Result;

pub type StepFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a>>;

/// One link of a [`Sequence`], run with a shared context `C`.
pub trait Step<C, T> {
    /// Short name used in logs.
    fn name(&self) -> &'static str {
        "step"
    }

    fn run<'a>(&'a mut self, ctx: &'a mut C, input: T) -> StepFuture<'a, T>;
}

/// A fixed list of steps run one after another.
pub struct Sequence<'s, C, T> {
    steps: Vec<Box<dyn Step<C, T> + 's>>,
    cursor: usize,
}

impl<'s, C, T> Sequence<'s, C, T> {
    pub fn new() -> Self {
        Sequence {
            steps: Vec::new(),
            cursor: 0,
        }
    }

    /// Append `step` to the end of the sequence.
    pub fn then<S>(mut self, step: S) -> Self
    where
        S: Step<C, T> + 's,
    {
        self.steps.push(Box::new(step));
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step in order, feeding `input` to the first one.
    ///
    /// Returns the output of the last step, or the first error any step
    /// produced. Steps after a failing one are never started.
    pub async fn run(mut self, ctx: &mut C, input: T) -> Result<T> {
        let mut carried = Ok(input);
        while self.cursor < self.steps.len() {
            let index = self.cursor;
            self.cursor += 1;
            carried = dispatch(self.steps[index].as_mut(), index, ctx, carried).await;
            if carried.is_err() {
                break;
            }
        }
        carried
    }
}

impl<C, T> Default for Sequence<'_, C, T> {
    fn default() -> Self {
        Sequence::new()
    }
}

async fn dispatch<C, T>(
    step: &mut (dyn Step<C, T> + '_),
    index: usize,
    ctx: &mut C,
    carried: Result<T>,
) -> Result<T> {
    match carried {
        Ok(input) => {
            debug!(index, step = step.name(), "running step");
            step.run(ctx, input).await
        }
        Err(err) => Err(err),
    }
}
