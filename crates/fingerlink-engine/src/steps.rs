//! Step tracking for the enrollment and identification sequences.
//!
//! Each sequence is a fixed chain of steps. A [`StepLog`] enforces that chain
//! and keeps the transitions taken, so a failed run can say exactly where it
//! stopped.
//!
//! # Enrollment
//!
//! ```text
//! Idle -> AllocatePosition -> WaitPress1 -> Capture1 -> WaitRelease
//!      -> WaitPress2 -> Capture2 -> Merge -> Store -> PublishIdentity -> Done
//! ```
//!
//! # Identification
//!
//! ```text
//! Idle -> WaitPress -> Capture -> Search -> Resolve -> Done
//!                                        \-> Done (no match)
//! ```
//!
//! Any step that has not finished may move to `Aborted`.
//!
//! # Examples
//!
//! ```
//! use fingerlink_engine::steps::{EnrollmentStep, StepLog};
//!
//! let mut log = StepLog::<EnrollmentStep>::new();
//! log.transition_to(EnrollmentStep::AllocatePosition).unwrap();
//! assert!(log.transition_to(EnrollmentStep::Store).is_err());
//! assert_eq!(log.current(), EnrollmentStep::AllocatePosition);
//! ```

use crate::{EngineError, EngineResult};
use serde::Serialize;
use std::fmt;
use std::time::Instant;
use tracing::trace;

/// A step in a fixed sequence.
pub trait Step: Copy + Eq + fmt::Debug + fmt::Display {
    const INITIAL: Self;

    fn can_transition_to(&self, target: &Self) -> bool;

    fn is_terminal(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStep {
    Idle,
    AllocatePosition,
    WaitPress1,
    Capture1,
    WaitRelease,
    WaitPress2,
    Capture2,
    Merge,
    Store,
    PublishIdentity,
    Done,
    Aborted,
}

impl fmt::Display for EnrollmentStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl Step for EnrollmentStep {
    const INITIAL: Self = Self::Idle;

    fn can_transition_to(&self, target: &Self) -> bool {
        use EnrollmentStep::*;
        if *target == Aborted {
            return !self.is_terminal();
        }
        matches!(
            (self, target),
            (Idle, AllocatePosition)
                | (AllocatePosition, WaitPress1)
                | (WaitPress1, Capture1)
                | (Capture1, WaitRelease)
                | (WaitRelease, WaitPress2)
                | (WaitPress2, Capture2)
                | (Capture2, Merge)
                | (Merge, Store)
                | (Store, PublishIdentity)
                | (PublishIdentity, Done)
        )
    }

    fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentificationStep {
    Idle,
    WaitPress,
    Capture,
    Search,
    Resolve,
    Done,
    Aborted,
}

impl fmt::Display for IdentificationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl Step for IdentificationStep {
    const INITIAL: Self = Self::Idle;

    fn can_transition_to(&self, target: &Self) -> bool {
        use IdentificationStep::*;
        if *target == Aborted {
            return !self.is_terminal();
        }
        matches!(
            (self, target),
            (Idle, WaitPress)
                | (WaitPress, Capture)
                | (Capture, Search)
                | (Search, Resolve | Done)
                | (Resolve, Done)
        )
    }

    fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }
}

/// One recorded move between steps.
#[derive(Debug, Clone)]
pub struct StepTransition<S> {
    pub from: S,
    pub to: S,
    pub timestamp: Instant,
}

impl<S> StepTransition<S> {
    pub fn elapsed(&self) -> std::time::Duration {
        self.timestamp.elapsed()
    }
}

/// Current step plus every transition taken to reach it.
#[derive(Debug, Clone)]
pub struct StepLog<S> {
    current: S,
    history: Vec<StepTransition<S>>,
}

impl<S: Step> Default for StepLog<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Step> StepLog<S> {
    pub fn new() -> Self {
        Self {
            current: S::INITIAL,
            history: Vec::new(),
        }
    }

    pub fn current(&self) -> S {
        self.current
    }

    pub fn history(&self) -> &[StepTransition<S>] {
        &self.history
    }

    /// Steps entered so far, in order, excluding the initial one.
    pub fn visited(&self) -> Vec<S> {
        self.history.iter().map(|t| t.to).collect()
    }

    /// Move to `next`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidTransition` and stays put if the sequence
    /// does not allow `next` from the current step.
    pub fn transition_to(&mut self, next: S) -> EngineResult<()> {
        if !self.current.can_transition_to(&next) {
            return Err(EngineError::invalid_transition(self.current, next));
        }
        trace!(from = %self.current, to = %next, "Step transition");
        self.history.push(StepTransition {
            from: self.current,
            to: next,
            timestamp: Instant::now(),
        });
        self.current = next;
        Ok(())
    }

    /// Move to the aborted step, remembering where the sequence stopped.
    ///
    /// Returns the step that was interrupted. A log that already finished is
    /// left alone.
    pub fn abort(&mut self, aborted: S) -> S {
        let interrupted = self.current;
        if self.transition_to(aborted).is_err() {
            trace!(step = %interrupted, "Abort on a finished sequence ignored");
        }
        interrupted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_enrollment_happy_path() {
        use EnrollmentStep::*;
        let mut log = StepLog::new();
        let path = [
            AllocatePosition,
            WaitPress1,
            Capture1,
            WaitRelease,
            WaitPress2,
            Capture2,
            Merge,
            Store,
            PublishIdentity,
            Done,
        ];
        for step in path {
            log.transition_to(step).unwrap();
        }
        assert_eq!(log.visited(), path.to_vec());
        assert!(log.current().is_terminal());
    }

    #[rstest]
    #[case(EnrollmentStep::Idle, EnrollmentStep::Store)]
    #[case(EnrollmentStep::Capture1, EnrollmentStep::Merge)]
    #[case(EnrollmentStep::Merge, EnrollmentStep::PublishIdentity)]
    #[case(EnrollmentStep::Done, EnrollmentStep::Aborted)]
    #[case(EnrollmentStep::Aborted, EnrollmentStep::Idle)]
    fn test_enrollment_rejects(#[case] from: EnrollmentStep, #[case] to: EnrollmentStep) {
        assert!(!from.can_transition_to(&to));
    }

    #[test]
    fn test_identification_no_match_skips_resolve() {
        use IdentificationStep::*;
        assert!(Search.can_transition_to(&Done));
        assert!(Search.can_transition_to(&Resolve));
        assert!(!Capture.can_transition_to(&Resolve));
    }

    #[test]
    fn test_abort_reports_interrupted_step() {
        let mut log = StepLog::<IdentificationStep>::new();
        log.transition_to(IdentificationStep::WaitPress).unwrap();
        log.transition_to(IdentificationStep::Capture).unwrap();

        let interrupted = log.abort(IdentificationStep::Aborted);
        assert_eq!(interrupted, IdentificationStep::Capture);
        assert_eq!(log.current(), IdentificationStep::Aborted);
        assert_eq!(log.history().len(), 3);
    }

    #[test]
    fn test_invalid_transition_keeps_state() {
        let mut log = StepLog::<EnrollmentStep>::new();
        let err = log.transition_to(EnrollmentStep::Merge).unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));
        assert_eq!(log.current(), EnrollmentStep::Idle);
        assert!(log.history().is_empty());
    }
}
