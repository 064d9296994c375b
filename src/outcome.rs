//! Capturing the result of fallible work.
//!
//! An [Outcome] is the result of running a unit of work that might fail: it
//! either holds the value the work produced or the [Cause] of its failure.
//! Outcomes are produced by [Outcome::execute], which never panics; an `Err`
//! returned by the work *and* a panic raised inside it both end up as
//! [Outcome::Failure].
//!
//! # Example
//!
//! ```
//! use thenable::outcome::Outcome;
//!
//! let parsed = Outcome::execute(|| Ok("42".parse::<i32>()?))
//!     .map(|x| x * 2)
//!     .ok();
//! assert_eq!(parsed, Some(84));
//!
//! let broken = Outcome::execute(|| Ok("forty-two".parse::<i32>()?))
//!     .map(|x| x * 2);
//! assert!(broken.is_failure());
//! assert_eq!(broken.recover(|| Ok(0)).ok(), Some(0));
//! ```
use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
};

use crate::error::TaskError;

/// The reason a unit of work failed.
///
/// Causes are reference counted so that the same failure can be handed to
/// several observers and propagated down a chain of tasks unchanged; use
/// [Arc::ptr_eq] to check that two failures share one origin.
pub type Cause = Arc<anyhow::Error>;

/// The immutable result of a fallible computation.
#[derive(Debug)]
pub enum Outcome<T> {
    /// The computation returned normally.
    Success(T),
    /// The computation returned an error or panicked.
    Failure(Cause),
}

impl<T> Outcome<T> {
    /// Run `work` and capture its result.
    ///
    /// Returns [Outcome::Success] if `work` returns `Ok`, and
    /// [Outcome::Failure] if it returns `Err` or panics. A panic is captured
    /// as [TaskError::Panicked].
    pub fn execute<F>(work: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<T>,
    {
        match catch_unwind(AssertUnwindSafe(work)) {
            Ok(Ok(value)) => Self::Success(value),
            Ok(Err(e)) => Self::failure(e),
            Err(payload) => Self::failure(TaskError::from_panic(payload)),
        }
    }

    /// Defer execution of a one-argument function.
    ///
    /// The returned closure applies `f` to its argument under the same
    /// contract as [Outcome::execute].
    ///
    /// ```
    /// use thenable::outcome::Outcome;
    ///
    /// let add = Outcome::execute_with(|x: i32| Ok(42 + x));
    /// assert_eq!(*add(42).value(), 84);
    /// ```
    pub fn execute_with<P, F>(f: F) -> impl FnOnce(P) -> Self
    where
        F: FnOnce(P) -> anyhow::Result<T>,
    {
        move |arg| Self::execute(move || f(arg))
    }

    pub fn success(value: T) -> Self {
        Self::Success(value)
    }

    pub fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(Arc::new(error.into()))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    /// The success value.
    ///
    /// # Panics
    ///
    /// Panics if the outcome is a failure. Check with
    /// [Outcome::is_success] first.
    #[track_caller]
    pub fn value(&self) -> &T {
        match self {
            Self::Success(v) => v,
            Self::Failure(_) => panic!("failure does not contain a value"),
        }
    }

    /// The failure cause.
    ///
    /// # Panics
    ///
    /// Panics if the outcome is a success.
    #[track_caller]
    pub fn cause(&self) -> &Cause {
        match self {
            Self::Success(_) => panic!("success does not contain a failure"),
            Self::Failure(c) => c,
        }
    }

    /// Chain a fallible computation onto a successful outcome.
    ///
    /// On success, `f` runs under [Outcome::execute]. On failure, `f` is not
    /// called and the same cause is carried into the new outcome.
    pub fn then<S, F>(self, f: F) -> Outcome<S>
    where
        F: FnOnce(T) -> anyhow::Result<S>,
    {
        match self {
            Self::Success(v) => Outcome::execute(move || f(v)),
            Self::Failure(c) => Outcome::Failure(c),
        }
    }

    /// Like [Outcome::then] for infallible functions. A panic in `f` still
    /// becomes a failure.
    pub fn map<S, F>(self, f: F) -> Outcome<S>
    where
        F: FnOnce(T) -> S,
    {
        self.then(move |v| Ok(f(v)))
    }

    /// Replace a failure with the outcome of `alt`. A success is returned
    /// unchanged and `alt` is not called.
    pub fn recover<F>(self, alt: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<T>,
    {
        match self {
            Self::Success(_) => self,
            Self::Failure(_) => Self::execute(alt),
        }
    }

    /// The success value, if any, discarding the cause of a failure.
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Success(v) => Some(v),
            Self::Failure(_) => None,
        }
    }

    pub fn as_ref(&self) -> Outcome<&T> {
        match self {
            Self::Success(v) => Outcome::Success(v),
            Self::Failure(c) => Outcome::Failure(Arc::clone(c)),
        }
    }

    pub fn into_result(self) -> Result<T, Cause> {
        self.into()
    }
}

impl<T> From<Outcome<T>> for Result<T, Cause> {
    fn from(value: Outcome<T>) -> Self {
        match value {
            Outcome::Success(v) => Ok(v),
            Outcome::Failure(c) => Err(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{num::ParseIntError, sync::Arc};

    use anyhow::{anyhow, bail};

    use super::{Cause, Outcome};
    use crate::error::TaskError;

    #[test]
    fn execute_success() {
        let o = Outcome::execute(|| Ok(42));
        assert!(o.is_success());
        assert_eq!(*o.value(), 42);
    }

    #[test]
    fn execute_error() {
        let o: Outcome<i32> = Outcome::execute(|| Ok("nope".parse::<i32>()?));
        assert!(o.is_failure());
        assert!(o.cause().downcast_ref::<ParseIntError>().is_some());
    }

    #[test]
    fn execute_panic() {
        let o: Outcome<i32> = Outcome::execute(|| panic!("kaboom"));
        assert_eq!(
            o.cause().downcast_ref::<TaskError>(),
            Some(&TaskError::Panicked("kaboom".into()))
        );
    }

    #[test]
    fn execute_with_argument() {
        let o = Outcome::execute_with(|s: &str| Ok(s.len()))("four");
        assert_eq!(o.ok(), Some(4));

        let o = Outcome::<i32>::execute_with(|_: ()| bail!("no"))(());
        assert_eq!(o.cause().to_string(), "no");
    }

    #[test]
    fn then_maps_success() {
        let o = Outcome::execute(|| Ok(42_i32)).then(|x| Ok(x.to_string()));
        assert_eq!(o.value(), "42");
    }

    #[test]
    fn then_keeps_cause() {
        let o: Outcome<i32> = Outcome::failure(anyhow!("first"));
        let cause = Arc::clone(o.cause());
        let mut called = false;

        let mapped: Outcome<String> = o.then(|x| {
            called = true;
            Ok(x.to_string())
        });

        assert!(!called);
        assert!(Arc::ptr_eq(&cause, mapped.cause()));
    }

    #[test]
    fn map_catches_panic() {
        let o = Outcome::success(1).map(|_: i32| -> i32 { panic!("in map") });
        assert!(o.cause().downcast_ref::<TaskError>().is_some());
    }

    #[test]
    fn recover() {
        let o = Outcome::success(1).recover(|| Ok(2));
        assert_eq!(o.ok(), Some(1));

        let o = Outcome::<i32>::failure(anyhow!("x")).recover(|| Ok(2));
        assert_eq!(o.ok(), Some(2));

        let o = Outcome::<i32>::failure(anyhow!("x")).recover(|| bail!("y"));
        assert_eq!(o.cause().to_string(), "y");
    }

    #[test]
    fn into_option_and_result() {
        assert_eq!(Outcome::success(5).ok(), Some(5));
        assert_eq!(Outcome::<i32>::failure(anyhow!("x")).ok(), None);

        let r: Result<i32, Cause> = Outcome::<i32>::failure(anyhow!("x")).into();
        assert_eq!(r.unwrap_err().to_string(), "x");
        assert_eq!(Outcome::success(5).into_result().ok(), Some(5));
    }

    #[test]
    fn as_ref_shares_cause() {
        let o: Outcome<i32> = Outcome::failure(anyhow!("x"));
        assert!(Arc::ptr_eq(o.cause(), o.as_ref().cause()));
        assert_eq!(Outcome::success(3).as_ref().ok(), Some(&3));
    }

    #[test]
    #[should_panic(expected = "failure does not contain a value")]
    fn value_of_failure() {
        Outcome::<i32>::failure(anyhow!("x")).value();
    }

    #[test]
    #[should_panic(expected = "success does not contain a failure")]
    fn cause_of_success() {
        Outcome::success(1).cause();
    }
}
