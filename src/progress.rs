//! Cooperative cancellation.
//!
//! Long-running synthesis calls report to a [`Progress`] observer at fixed
//! checkpoints, passing the stage and a `current` / `total` size pair with
//! `current <= total`. Within one stage of one call `current` never decreases.
//! Returning [`Cancelled`] from a checkpoint aborts the call without a partial
//! result.

use std::fmt;

/// Where a checkpoint was reached.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Stage {
    /// One work-stack pop in the Büchi product construction. Reports the
    /// product states expanded so far of those discovered.
    Product,
    /// One iteration of the innermost greatest fixpoint. Reports the states
    /// resolved so far of all states.
    Fixpoint,
    /// One iteration of the outer synthesis loop. Reports the states removed
    /// so far of the initial candidate.
    Driver,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Product => write!(f, "product"),
            Stage::Fixpoint => write!(f, "fixpoint"),
            Stage::Driver => write!(f, "driver"),
        }
    }
}

/// Marker error for a synthesis aborted by its [`Progress`] observer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct Cancelled;

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cancelled")
    }
}

impl std::error::Error for Cancelled {}

pub trait Progress {
    /// Called at every checkpoint; return `Err(Cancelled)` to abort.
    fn checkpoint(&mut self, stage: Stage, current: usize, total: usize) -> Result<(), Cancelled>;
}

/// Observer that never cancels.
#[derive(Debug, Copy, Clone, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    #[inline]
    fn checkpoint(&mut self, _stage: Stage, _current: usize, _total: usize) -> Result<(), Cancelled> {
        Ok(())
    }
}

/// Adapts a closure into a [`Progress`] observer.
///
/// ```
/// use buechi_syn::progress::{Cancelled, Progress, ProgressFn, Stage};
///
/// // cancel once the product grows beyond 100 states
/// let mut p = ProgressFn(|stage: Stage, current: usize, _total: usize| {
///     if stage == Stage::Product && current > 100 {
///         return Err(Cancelled);
///     }
///     Ok(())
/// });
/// assert!(p.checkpoint(Stage::Product, 7, 9).is_ok());
/// assert!(p.checkpoint(Stage::Driver, 200, 300).is_ok());
/// assert_eq!(p.checkpoint(Stage::Product, 101, 120), Err(Cancelled));
/// ```
pub struct ProgressFn<F>(pub F);

impl<F> Progress for ProgressFn<F>
where
    F: FnMut(Stage, usize, usize) -> Result<(), Cancelled>,
{
    fn checkpoint(&mut self, stage: Stage, current: usize, total: usize) -> Result<(), Cancelled> {
        (self.0)(stage, current, total)
    }
}

impl<P: Progress + ?Sized> Progress for &mut P {
    fn checkpoint(&mut self, stage: Stage, current: usize, total: usize) -> Result<(), Cancelled> {
        (**self).checkpoint(stage, current, total)
    }
}
