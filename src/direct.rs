//! Address-identity callbacks.
//!
//! A [`DirectCallback`] boxes its closure behind a signature header and hands out the
//! box's address as the token. There is no table and no lock, which also means
//! nothing tracks liveness: the token may only be dispatched while the
//! `DirectCallback` is alive. Use it for synchronous foreign calls that finish
//! within the callback's lifetime; prefer [`ScopedCallback`](crate::ScopedCallback)
//! everywhere else.

use std::fmt;
use std::mem;

use crate::{CallbackArgs, CallbackFn, Signature, Token, TypedCallback};

/// Common prefix of every slot, readable without knowing the slot's signature.
#[repr(C)]
struct SlotHeader {
    signature: Signature,
}

#[repr(C)]
struct DirectSlot<'a, R, Args> {
    header: SlotHeader,
    callback: TypedCallback<'a, R, Args>,
}

/// A callback whose token is its own heap address.
///
/// Moving the `DirectCallback` does not change the token.
pub struct DirectCallback<'a, R, Args> {
    slot: Box<DirectSlot<'a, R, Args>>,
}

impl<'a, R: 'static, Args: CallbackArgs> DirectCallback<'a, R, Args> {
    pub fn new<F>(callback: F) -> Self
    where
        F: CallbackFn<R, Args> + 'a,
    {
        DirectCallback {
            slot: Box::new(DirectSlot {
                header: SlotHeader {
                    signature: Signature::of::<R, Args>(),
                },
                callback: TypedCallback::new(callback),
            }),
        }
    }

    /// The slot address, never 0.
    pub fn token(&self) -> Token {
        let slot: *const DirectSlot<'a, R, Args> = &*self.slot;
        slot as Token
    }

    /// Invoke the held closure directly.
    pub fn call(&self, args: Args) -> R {
        self.slot.callback.call(args)
    }
}

impl<R: Default + 'static, Args: CallbackArgs> DirectCallback<'_, R, Args> {
    /// The `unsafe extern "C"` dispatch function to hand out together with
    /// [`token`](Self::token).
    pub fn trampoline(&self) -> Args::DirectFn<R> {
        Args::direct_trampoline::<R>()
    }

    /// Dispatch `token` to the closure it identifies.
    ///
    /// A zero token returns `R::default()` without touching memory. A token whose
    /// header carries another signature, or that is not even aligned like a slot,
    /// also returns `R::default()`.
    ///
    /// # Safety
    ///
    /// `token` must be 0 or the token of a `DirectCallback` that is still alive.
    /// A token outliving its callback is not detected and reads freed memory.
    pub unsafe fn dispatch(token: Token, args: Args) -> R {
        if token == 0 {
            return R::default();
        }

        if token % mem::align_of::<DirectSlot<'static, R, Args>>() != 0 {
            log::warn!("direct callback token {token:#x} is misaligned, returning default");
            return R::default();
        }

        let expected = Signature::of::<R, Args>();

        // SAFETY: per the contract the token addresses a live slot, and every slot
        // starts with a `SlotHeader`.
        let header = unsafe { &*(token as *const SlotHeader) };
        if header.signature != expected {
            log::warn!(
                "direct callback token {token:#x} holds {}, expected {}, returning default",
                header.signature,
                expected
            );
            return R::default();
        }

        // SAFETY: the header proves the slot was built for exactly `fn(Args) -> R`.
        let slot = unsafe { &*(token as *const DirectSlot<'_, R, Args>) };
        slot.callback.call(args)
    }
}

impl<R: 'static, Args: CallbackArgs> fmt::Debug for DirectCallback<'_, R, Args> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectCallback")
            .field("token", &format_args!("{:#x}", self.token()))
            .field("signature", &self.slot.header.signature)
            .finish()
    }
}
