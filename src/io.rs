//! `AsyncIO` - deferred asynchronous side effects.
//!
//! Every collaborator method returns an [`AsyncIO`]: a description of an
//! asynchronous operation that does nothing until [`AsyncIO::run_async`]
//! is awaited. Interpreters compose these descriptions with `fmap` and
//! `flat_map`, and only the program runner ever awaits one.
//!
//! # Examples
//!
//! ```rust
//! use effectum::io::AsyncIO;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let action = AsyncIO::pure(10)
//!     .fmap(|x| x * 2)
//!     .flat_map(|x| AsyncIO::pure(x + 1));
//!
//! assert_eq!(action.run_async().await, 21);
//! # });
//! ```

use std::future::Future;

use futures::future::BoxFuture;

/// A deferred asynchronous action producing a value of type `A`.
///
/// Nothing runs until `run_async` is awaited, so building an `AsyncIO`
/// is free of side effects.
///
/// # Monad Laws
///
/// 1. **Left Identity**: `AsyncIO::pure(a).flat_map(f) == f(a)`
/// 2. **Right Identity**: `m.flat_map(AsyncIO::pure) == m`
/// 3. **Associativity**: `m.flat_map(f).flat_map(g) == m.flat_map(|x| f(x).flat_map(g))`
pub struct AsyncIO<A> {
    run_async_io: Box<dyn FnOnce() -> BoxFuture<'static, A> + Send>,
}

// =============================================================================
// Constructors
// =============================================================================

impl<A: Send + 'static> AsyncIO<A> {
    /// Creates an action from an async closure.
    ///
    /// The closure is not called until `run_async` is awaited.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effectum::io::AsyncIO;
    ///
    /// let action = AsyncIO::new(|| async { 42 });
    /// ```
    pub fn new<F, Fut>(action: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = A> + Send + 'static,
    {
        Self {
            run_async_io: Box::new(move || Box::pin(action())),
        }
    }

    /// Wraps a future that has not been polled yet.
    pub fn from_future<Fut>(future: Fut) -> Self
    where
        Fut: Future<Output = A> + Send + 'static,
    {
        Self {
            run_async_io: Box::new(move || Box::pin(future)),
        }
    }

    /// Wraps a value without performing any side effect.
    pub fn pure(value: A) -> Self {
        Self {
            run_async_io: Box::new(move || Box::pin(async move { value })),
        }
    }
}

// =============================================================================
// Execution
// =============================================================================

impl<A: Send + 'static> AsyncIO<A> {
    /// Executes the action and returns its value.
    ///
    /// This is the only way to observe the value; it belongs at the edge
    /// of the system (the program runner, a handler, `main`).
    pub async fn run_async(self) -> A {
        (self.run_async_io)().await
    }
}

// =============================================================================
// Functor / Monad
// =============================================================================

impl<A: Send + 'static> AsyncIO<A> {
    /// Applies a function to the produced value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effectum::io::AsyncIO;
    ///
    /// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
    /// let action = AsyncIO::pure(21).fmap(|x| x * 2);
    /// assert_eq!(action.run_async().await, 42);
    /// # });
    /// ```
    pub fn fmap<B, F>(self, function: F) -> AsyncIO<B>
    where
        F: FnOnce(A) -> B + Send + 'static,
        B: Send + 'static,
    {
        AsyncIO::new(move || async move { function(self.run_async().await) })
    }

    /// Chains a second action that depends on the first one's value.
    pub fn flat_map<B, F>(self, function: F) -> AsyncIO<B>
    where
        F: FnOnce(A) -> AsyncIO<B> + Send + 'static,
        B: Send + 'static,
    {
        AsyncIO::new(move || async move {
            let value = self.run_async().await;
            function(value).run_async().await
        })
    }

    /// Runs `self` for its side effects, then `next`.
    #[must_use]
    pub fn then<B>(self, next: AsyncIO<B>) -> AsyncIO<B>
    where
        B: Send + 'static,
    {
        self.flat_map(move |_| next)
    }
}

impl<A> std::fmt::Debug for AsyncIO<A> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("AsyncIO(<deferred>)")
    }
}

static_assertions::assert_impl_all!(AsyncIO<i32>: Send);
