//! Scope-bound callbacks dispatched through a token registry.
//!
//! A [`ScopedCallback`] registers its closure on construction and releases the
//! token when dropped. Dispatching after that is a table miss: the checked
//! [`ScopedCallback::invoke`] reports it, the `extern "C"` trampoline faults.
//!
//! ```rust
//! use scoped_callback::ScopedCallback;
//! use std::sync::Mutex;
//!
//! // A C-style API: calls `cb(token, value)` exactly once.
//! fn notify(token: usize, cb: extern "C" fn(usize, u32) -> i32) -> i32 {
//!     cb(token, 7)
//! }
//!
//! let seen = Mutex::new(0u32);
//! let status = ScopedCallback::scope(
//!     |value: u32| {
//!         *seen.lock().unwrap() = value;
//!         0
//!     },
//!     |cb| notify(cb.token(), cb.trampoline()),
//! )
//! .unwrap();
//!
//! assert_eq!(status, 0);
//! assert_eq!(*seen.lock().unwrap(), 7);
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::{
    CallbackArgs, CallbackError, CallbackFn, CallbackRegistryApi, DispatchGate, GlobalRegistry,
    Token, TypedCallback,
};

/// Owns one registration in the registry `Reg` for as long as it lives.
///
/// `'a` is the borrow bound of the registered closure. Values with `'a` shorter
/// than `'static` only exist inside [`ScopedCallback::scope`], which guarantees
/// they are dropped before the borrow ends.
///
/// Dropping a `'static` registration never blocks, even from inside its own
/// dispatch. A borrowing registration waits on drop until dispatches running on
/// other threads have returned.
pub struct ScopedCallback<'a, R, Args, Reg = GlobalRegistry>
where
    R: 'static,
    Args: CallbackArgs,
    Reg: CallbackRegistryApi,
{
    token: Token,
    // Present only for borrowing registrations.
    gate: Option<Arc<DispatchGate>>,
    _marker: PhantomData<(&'a (), fn(Args) -> R, fn() -> Reg)>,
}

impl<R: 'static, Args: CallbackArgs> ScopedCallback<'static, R, Args, GlobalRegistry> {
    /// Register `callback` in the global registry.
    ///
    /// # Errors
    ///
    /// `TokensExhausted` when the registry's token counter cannot advance.
    pub fn new<F>(callback: F) -> Result<Self, CallbackError>
    where
        F: CallbackFn<R, Args> + 'static,
    {
        Self::new_in(GlobalRegistry::API, callback)
    }
}

impl<'a, R: 'static, Args: CallbackArgs> ScopedCallback<'a, R, Args, GlobalRegistry> {
    /// Register a closure that may borrow local state in the global registry, run
    /// `body` with it, and release the registration when `body` returns or unwinds.
    ///
    /// # Errors
    ///
    /// `TokensExhausted` when the registry's token counter cannot advance; `body`
    /// does not run in that case.
    pub fn scope<F, T>(
        callback: F,
        body: impl FnOnce(&ScopedCallback<'a, R, Args, GlobalRegistry>) -> T,
    ) -> Result<T, CallbackError>
    where
        F: CallbackFn<R, Args> + 'a,
    {
        Self::scope_in(GlobalRegistry::API, callback, body)
    }
}

impl<R: 'static, Args: CallbackArgs, Reg: CallbackRegistryApi> ScopedCallback<'static, R, Args, Reg> {
    /// Register `callback` in the registry `Reg`.
    ///
    /// # Errors
    ///
    /// `TokensExhausted` when the registry's token counter cannot advance.
    pub fn new_in<F>(registry: Reg, callback: F) -> Result<Self, CallbackError>
    where
        F: CallbackFn<R, Args> + 'static,
    {
        let token = registry.register(TypedCallback::new(callback))?;
        Ok(ScopedCallback {
            token,
            gate: None,
            _marker: PhantomData,
        })
    }
}

impl<'a, R: 'static, Args: CallbackArgs, Reg: CallbackRegistryApi> ScopedCallback<'a, R, Args, Reg> {
    /// [`ScopedCallback::scope`] for the registry `Reg`.
    ///
    /// When `body` finishes, the registration is removed and this call blocks until
    /// dispatches of it still running on other threads have returned. Dispatches on
    /// the calling thread always end before `body` does.
    ///
    /// # Errors
    ///
    /// `TokensExhausted` when the registry's token counter cannot advance.
    pub fn scope_in<F, T>(
        registry: Reg,
        callback: F,
        body: impl FnOnce(&ScopedCallback<'a, R, Args, Reg>) -> T,
    ) -> Result<T, CallbackError>
    where
        F: CallbackFn<R, Args> + 'a,
    {
        // SAFETY: the registration is owned by `scoped`, which never leaves this
        // function. Its drop removes the entry and waits on the gate until every
        // dispatch has dropped its handle, before `'a` can end, on return and on
        // unwind. The table hands closures out only through gate-counted checkouts.
        let callback = unsafe { TypedCallback::new(callback).erase_lifetime() };
        let (token, gate) = registry.register_gated(callback)?;

        let scoped = ScopedCallback {
            token,
            gate: Some(gate),
            _marker: PhantomData,
        };

        Ok(body(&scoped))
    }

    /// The token assigned at construction.
    pub fn token(&self) -> Token {
        self.token
    }

    /// The `extern "C"` dispatch function to hand out together with [`token`](Self::token).
    pub fn trampoline(&self) -> Args::ScopedFn<R> {
        Args::scoped_trampoline::<Reg, R>()
    }

    /// Dispatch this callback from Rust. Panics raised by the closure propagate.
    ///
    /// # Errors
    ///
    /// `TokenNotFound` if the registry was cleared while this value was alive.
    pub fn invoke(&self, args: Args) -> Result<R, CallbackError> {
        Reg::API.invoke(self.token, args)
    }
}

impl<R, Args, Reg> Drop for ScopedCallback<'_, R, Args, Reg>
where
    R: 'static,
    Args: CallbackArgs,
    Reg: CallbackRegistryApi,
{
    fn drop(&mut self) {
        Reg::API.unregister(self.token);

        if let Some(gate) = &self.gate {
            gate.wait_idle();
        }
    }
}

impl<R, Args, Reg> fmt::Debug for ScopedCallback<'_, R, Args, Reg>
where
    R: 'static,
    Args: CallbackArgs,
    Reg: CallbackRegistryApi,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedCallback")
            .field("token", &self.token)
            .field("borrowing", &self.gate.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_token_is_stable_and_registered() {
        define_callback_registry!(stable);

        let cb = ScopedCallback::new_in(stable::API, |x: u64| x).unwrap();
        let token = cb.token();
        assert_ne!(token, 0);
        assert_eq!(cb.token(), token);
        assert!(stable::contains(token));

        drop(cb);
        assert!(!stable::contains(token));
    }

    #[test]
    fn test_trampoline_returns_closure_result() {
        define_callback_registry!(results);

        let cb = ScopedCallback::new_in(results::API, |a: i32, b: i32| a - b).unwrap();
        let trampoline: extern "C" fn(Token, i32, i32) -> i32 = cb.trampoline();
        assert_eq!(trampoline(cb.token(), 50, 8), 42);
    }

    #[test]
    fn test_scope_borrows_local_state() {
        define_callback_registry!(borrowing);

        let total = AtomicUsize::new(0);
        let returned = ScopedCallback::scope_in(
            borrowing::API,
            |n: usize| total.fetch_add(n, Ordering::SeqCst),
            |cb| {
                let f = cb.trampoline();
                f(cb.token(), 2);
                f(cb.token(), 3);
                cb.token()
            },
        )
        .unwrap();

        assert_eq!(total.load(Ordering::SeqCst), 5);
        assert!(!borrowing::contains(returned));
        assert!(borrowing::is_empty());
    }

    #[test]
    fn test_scope_releases_on_unwind() {
        define_callback_registry!(unwinding);

        let token = Mutex::new(None);
        let outcome = std::panic::catch_unwind(|| {
            ScopedCallback::scope_in(
                unwinding::API,
                || (),
                |cb| {
                    *token.lock().unwrap() = Some(cb.token());
                    panic!("body failed");
                },
            )
        });

        assert!(outcome.is_err());
        let token = token.lock().unwrap().unwrap();
        assert!(!unwinding::contains(token));
    }

    #[test]
    fn test_early_return_releases_token() {
        define_callback_registry!(early);

        fn run() -> Result<Token, CallbackError> {
            let cb = ScopedCallback::new_in(early::API, || 1u8)?;
            if cb.invoke(())? == 1 {
                return Ok(cb.token());
            }
            unreachable!()
        }

        let token = run().unwrap();
        assert!(!early::contains(token));
    }

    #[test]
    fn test_invoke_after_clear_reports_missing_token() {
        define_callback_registry!(cleared);
        use crate::CallbackRegistryApi;

        let cb = ScopedCallback::new_in(cleared::API, || 5i32).unwrap();
        cleared::API.clear();

        assert_eq!(
            cb.invoke(()),
            Err(CallbackError::TokenNotFound { token: cb.token() })
        );
    }

    #[test]
    fn test_drop_releases_captured_resources() {
        define_callback_registry!(captures);

        let resource = Arc::new(String::from("buffer"));
        let inner = resource.clone();
        let cb = ScopedCallback::new_in(captures::API, move || inner.len()).unwrap();
        assert_eq!(Arc::strong_count(&resource), 2);

        drop(cb);
        assert_eq!(Arc::strong_count(&resource), 1);
    }

    #[test]
    fn test_new_registration_after_scope_gets_fresh_token() {
        define_callback_registry!(fresh);

        let first = {
            let cb = ScopedCallback::new_in(fresh::API, |x: i32| x + 1).unwrap();
            cb.token()
        };

        let second = ScopedCallback::new_in(fresh::API, |x: i32| x * 10).unwrap();
        assert_ne!(first, second.token());
        assert_eq!(second.invoke((4,)), Ok(40));
        assert_eq!(fresh::len(), 1);
    }

    #[test]
    fn test_one_shot_callback_drops_its_own_registration() {
        define_callback_registry!(one_shot);

        type Slot = Arc<Mutex<Option<ScopedCallback<'static, i32, (), one_shot::Api>>>>;

        let slot: Slot = Arc::new(Mutex::new(None));
        let own = slot.clone();
        let cb = ScopedCallback::new_in(one_shot::API, move || {
            let taken = own.lock().unwrap().take();
            drop(taken);
            1
        })
        .unwrap();

        let token = cb.token();
        let trampoline = cb.trampoline();
        *slot.lock().unwrap() = Some(cb);

        assert_eq!(trampoline(token), 1);
        assert!(!one_shot::contains(token));
        assert!(slot.lock().unwrap().is_none());
    }

    #[test]
    fn test_scope_survives_clear_inside_dispatch() {
        define_callback_registry!(clearing);
        use crate::CallbackRegistryApi;

        let calls = AtomicUsize::new(0);
        let (first, second) = ScopedCallback::scope_in(
            clearing::API,
            || {
                clearing::API.clear();
                calls.fetch_add(1, Ordering::SeqCst)
            },
            |cb| (cb.invoke(()), cb.invoke(())),
        )
        .unwrap();

        assert_eq!(first, Ok(0));
        assert!(matches!(second, Err(CallbackError::TokenNotFound { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(clearing::is_empty());
    }
}
