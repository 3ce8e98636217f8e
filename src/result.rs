//! Result algebra for exception-free composition.
//!
//! Every fallible operation in the engine returns [`std::result::Result`].
//! The standard library already supplies most of the algebra:
//!
//! - `map` transforms the success payload and leaves a failure untouched
//! - `map_err` transforms the failure payload only
//! - `unwrap` extracts the success value (calling it on a failure is a
//!   programming error)
//! - `unwrap_or` extracts or substitutes a default
//!
//! [`ResultExt`] adds the remaining combinators under the names used
//! throughout this crate: `flat_map` for chaining, `fold` for collapsing
//! both branches into one type, and `bimap` for transforming both sides.
//!
//! # Laws
//!
//! ```text
//! Ok(x).map(f).unwrap()   == f(x)
//! Err(e).map(f)           == Err(e)
//! Err(e).flat_map(g)      == Err(e)       // g is never invoked
//! Ok(x).flat_map(g)       == g(x)
//! ```
//!
//! # Examples
//!
//! ```rust
//! use effectum::result::ResultExt;
//!
//! let parsed: Result<i32, String> = Ok(21);
//! let doubled = parsed.flat_map(|value| Ok::<_, String>(value * 2));
//! assert_eq!(doubled, Ok(42));
//!
//! let failed: Result<i32, String> = Err("boom".to_string());
//! let message = failed.fold(|value| value.to_string(), |error| error);
//! assert_eq!(message, "boom");
//! ```

/// Combinators over [`Result`] that complete the success/failure algebra.
///
/// Implemented for every `Result<T, E>`; exhaustive handling of both
/// variants is enforced by the compiler wherever the value is consumed.
pub trait ResultExt<T, E>: Sized {
    /// Chains a `Result`-returning computation.
    ///
    /// Short-circuits on failure: the supplied function is never invoked
    /// when `self` is `Err`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effectum::result::ResultExt;
    ///
    /// let value: Result<i32, &str> = Ok(5);
    /// assert_eq!(value.flat_map(|n| Ok(n + 1)), Ok(6));
    ///
    /// let failure: Result<i32, &str> = Err("no");
    /// assert_eq!(failure.flat_map(|n| Ok(n + 1)), Err("no"));
    /// ```
    fn flat_map<U, F>(self, function: F) -> Result<U, E>
    where
        F: FnOnce(T) -> Result<U, E>;

    /// Collapses both variants into a single type.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effectum::result::ResultExt;
    ///
    /// let value: Result<i32, String> = Ok(3);
    /// assert_eq!(value.fold(|n| n * 2, |e| e.len() as i32), 6);
    /// ```
    fn fold<U, S, F>(self, on_success: S, on_failure: F) -> U
    where
        S: FnOnce(T) -> U,
        F: FnOnce(E) -> U;

    /// Transforms the success and failure payloads at once.
    fn bimap<U, G, S, F>(self, on_success: S, on_failure: F) -> Result<U, G>
    where
        S: FnOnce(T) -> U,
        F: FnOnce(E) -> G;

    /// Observes the failure payload without consuming it.
    ///
    /// Used to log a failure on its way up the call chain.
    #[must_use]
    fn tap_err<F>(self, observer: F) -> Self
    where
        F: FnOnce(&E);
}

impl<T, E> ResultExt<T, E> for Result<T, E> {
    #[inline]
    fn flat_map<U, F>(self, function: F) -> Result<U, E>
    where
        F: FnOnce(T) -> Result<U, E>,
    {
        match self {
            Ok(value) => function(value),
            Err(error) => Err(error),
        }
    }

    #[inline]
    fn fold<U, S, F>(self, on_success: S, on_failure: F) -> U
    where
        S: FnOnce(T) -> U,
        F: FnOnce(E) -> U,
    {
        match self {
            Ok(value) => on_success(value),
            Err(error) => on_failure(error),
        }
    }

    #[inline]
    fn bimap<U, G, S, F>(self, on_success: S, on_failure: F) -> Result<U, G>
    where
        S: FnOnce(T) -> U,
        F: FnOnce(E) -> G,
    {
        match self {
            Ok(value) => Ok(on_success(value)),
            Err(error) => Err(on_failure(error)),
        }
    }

    #[inline]
    fn tap_err<F>(self, observer: F) -> Self
    where
        F: FnOnce(&E),
    {
        if let Err(error) = &self {
            observer(error);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::cell::Cell;

    #[rstest]
    fn flat_map_on_success_applies_function() {
        let value: Result<i32, String> = Ok(10);
        assert_eq!(value.flat_map(|x| Ok(x * 2)), Ok(20));
    }

    #[rstest]
    fn flat_map_on_failure_never_invokes_function() {
        let invoked = Cell::new(false);
        let value: Result<i32, String> = Err("down".to_string());
        let result = value.flat_map(|x| {
            invoked.set(true);
            Ok::<_, String>(x)
        });

        assert_eq!(result, Err("down".to_string()));
        assert!(!invoked.get());
    }

    #[rstest]
    fn flat_map_can_turn_success_into_failure() {
        let value: Result<i32, &str> = Ok(-1);
        let result = value.flat_map(|x| if x < 0 { Err("negative") } else { Ok(x) });
        assert_eq!(result, Err("negative"));
    }

    #[rstest]
    #[case(Ok(4), "4")]
    #[case(Err("bad"), "error: bad")]
    fn fold_collapses_both_branches(#[case] input: Result<i32, &str>, #[case] expected: &str) {
        let output = input.fold(|x| x.to_string(), |e| format!("error: {e}"));
        assert_eq!(output, expected);
    }

    #[rstest]
    fn bimap_transforms_success() {
        let value: Result<i32, &str> = Ok(2);
        assert_eq!(value.bimap(|x| x + 1, str::len), Ok(3));
    }

    #[rstest]
    fn bimap_transforms_failure() {
        let value: Result<i32, &str> = Err("four");
        assert_eq!(value.bimap(|x| x + 1, str::len), Err(4));
    }

    #[rstest]
    fn tap_err_observes_only_failures() {
        let seen = Cell::new(0);
        let ok: Result<i32, i32> = Ok(1);
        let err: Result<i32, i32> = Err(7);

        let _ = ok.tap_err(|e| seen.set(*e));
        assert_eq!(seen.get(), 0);

        let passed = err.tap_err(|e| seen.set(*e));
        assert_eq!(seen.get(), 7);
        assert_eq!(passed, Err(7));
    }

    #[rstest]
    fn unwrap_or_substitutes_default() {
        let failure: Result<i32, &str> = Err("x");
        assert_eq!(failure.unwrap_or(9), 9);
    }
}
