//! Core trait defining callback registry behavior.
//!
//! This module provides the `CallbackRegistryApi` trait with default implementations
//! for registering, dispatching and releasing type-erased closures by token.
//!
//! The closure itself always runs outside the registry lock: the lock is held only
//! to insert, remove, or check an entry out of the table. Nothing here waits for a
//! running dispatch; removed closures are dropped by whichever dispatch finishes
//! last.

use std::sync::{Arc, LazyLock, Mutex};

use crate::{
    CallbackArgs, CallbackError, CallbackEvent, CallbackTable, DispatchGate, ErasedCallback,
    Signature, Token, TypedCallback,
};

/// Type alias for the trace callback storage.
///
/// Note: This type is also spelled out in the `define_callback_registry!` macro.
/// Keep both definitions in sync.
pub type TraceCallback = LazyLock<Mutex<Option<Arc<dyn Fn(&CallbackEvent) + Send + Sync>>>>;

/// Type alias for the table storage of one registry.
pub type CallbackStorage = LazyLock<Mutex<CallbackTable>>;

/// Core trait defining callback registry behavior.
///
/// Implementors are zero-sized types that only point at their statics; every
/// operation is provided by default methods. `define_callback_registry!` writes the
/// implementation for you.
pub trait CallbackRegistryApi: Sized + Send + Sync + 'static {
    /// The value trampolines use to reach this registry.
    const API: Self;

    // -------------------------------------------------------------------------------------------------
    // Tracing
    // -------------------------------------------------------------------------------------------------

    /// Access the trace callback static.
    fn trace() -> &'static TraceCallback;

    /// Set a tracing callback for registry operations.
    ///
    /// # Safety Restrictions
    ///
    /// The callback must NOT set or clear the trace callback of the same registry,
    /// as the trace lock is held while it runs.
    fn set_trace_callback(&self, callback: impl Fn(&CallbackEvent) + Send + Sync + 'static) {
        let mut guard = Self::trace().lock().unwrap_or_else(|p| p.into_inner());
        *guard = Some(Arc::new(callback));
    }

    fn clear_trace_callback(&self) {
        let mut guard = Self::trace().lock().unwrap_or_else(|p| p.into_inner());
        *guard = None;
    }

    /// Invoke the trace callback, if any, with `event`.
    fn emit_event(&self, event: &CallbackEvent) {
        let guard = Self::trace().lock().unwrap_or_else(|p| p.into_inner());
        if let Some(callback) = guard.as_ref() {
            callback(event);
        }
    }

    // -------------------------------------------------------------------------------------------------
    // Registry
    // -------------------------------------------------------------------------------------------------

    /// Access the table static.
    fn storage() -> &'static CallbackStorage;

    /// Insert a closure and return its token.
    ///
    /// Taking the counter value and inserting happen under one lock acquisition, so
    /// concurrent registrations always receive distinct tokens.
    ///
    /// # Errors
    ///
    /// `TokensExhausted` when the token counter cannot advance.
    fn register<R: 'static, Args: CallbackArgs>(
        &self,
        callback: TypedCallback<'static, R, Args>,
    ) -> Result<Token, CallbackError> {
        self.register_gated(callback).map(|(token, _)| token)
    }

    /// [`register`](Self::register), also returning the registration's dispatch gate.
    ///
    /// The gate is taken in the same lock acquisition as the insert, so no dispatch
    /// can start before the caller holds it.
    #[doc(hidden)]
    fn register_gated<R: 'static, Args: CallbackArgs>(
        &self,
        callback: TypedCallback<'static, R, Args>,
    ) -> Result<(Token, Arc<DispatchGate>), CallbackError> {
        let signature = callback.signature();
        let entry: Arc<dyn ErasedCallback> = Arc::new(callback);

        let (token, gate) = {
            let mut table = Self::storage().lock().unwrap_or_else(|p| p.into_inner());
            let token = table.insert(entry)?;
            (token, table.gate(token).unwrap_or_default())
        };

        log::debug!("registered callback {token} ({signature})");
        self.emit_event(&CallbackEvent::Register {
            token,
            signature: signature.name(),
        });

        Ok((token, gate))
    }

    /// Remove the entry for `token`. Returns whether the token was present.
    ///
    /// Never waits: dispatches of this token that are still running keep the closure
    /// alive, and the last of them drops it. This includes a closure unregistering
    /// itself from inside its own dispatch.
    fn unregister(&self, token: Token) -> bool {
        let entry = Self::storage()
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(token);

        let found = entry.is_some();
        drop(entry);

        log::debug!("unregistered callback {token} (found: {found})");
        self.emit_event(&CallbackEvent::Unregister { token, found });

        found
    }

    /// Dispatch `token` with `args`, reporting misuse as an error.
    ///
    /// # Errors
    ///
    /// - `TokenNotFound` when no live registration owns `token`
    /// - `SignatureMismatch` when the registration has a different signature
    /// - `RegistryLock` when the registry lock is poisoned
    fn invoke<R: 'static, Args: CallbackArgs>(
        &self,
        token: Token,
        args: Args,
    ) -> Result<R, CallbackError> {
        let checkout = Self::storage()
            .lock()
            .map_err(|_| CallbackError::RegistryLock)?
            .checkout(token);

        log::trace!("dispatch callback {token} (found: {})", checkout.is_some());
        self.emit_event(&CallbackEvent::Dispatch {
            token,
            found: checkout.is_some(),
        });

        let checkout = checkout.ok_or(CallbackError::TokenNotFound { token })?;
        let entry = checkout.callback();

        let expected = Signature::of::<R, Args>();
        let mismatch = || CallbackError::SignatureMismatch {
            token,
            expected: expected.name(),
            found: entry.signature().name(),
        };

        if entry.signature() != expected {
            return Err(mismatch());
        }

        let typed = entry
            .as_any()
            .downcast_ref::<TypedCallback<'static, R, Args>>()
            .ok_or_else(mismatch)?;

        Ok(typed.call(args))
    }

    /// Dispatch used by the `extern "C"` trampolines.
    ///
    /// # Panics
    ///
    /// Panics on any `invoke` error. Dispatching a token after its owner is gone is a
    /// programming error; from inside an `extern "C"` trampoline the panic aborts
    /// the process.
    fn dispatch<R: 'static, Args: CallbackArgs>(&self, token: Token, args: Args) -> R {
        match self.invoke(token, args) {
            Ok(result) => result,
            Err(err) => {
                log::error!("callback dispatch failed: {err}");
                panic!("callback dispatch failed: {err}");
            }
        }
    }

    /// Check whether `token` is currently registered.
    fn contains(&self, token: Token) -> bool {
        Self::storage()
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains(token)
    }

    /// Number of live registrations.
    fn len(&self) -> usize {
        Self::storage()
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every registration.
    ///
    /// Primarily intended for testing. Live `ScopedCallback`s keep their token, which
    /// now misses; their drop still completes normally. The token counter is not
    /// reset. Like [`unregister`](Self::unregister) this never waits, so it may be
    /// called from inside a dispatch.
    #[doc(hidden)]
    fn clear(&self) {
        self.emit_event(&CallbackEvent::Clear {});

        let entries = Self::storage()
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .drain();

        drop(entries);
    }
}

// -------------------------------------------------------------------------------------------------
// Tests
// -------------------------------------------------------------------------------------------------
