//! # Scoped Callback
//!
//! Pass capturing Rust closures through C-style callback APIs, the ones that only take a
//! plain function pointer plus one opaque integer:
//!
//! ```c
//! int api(uintptr_t token, int (*cb)(uintptr_t token, const char *data, size_t len));
//! ```
//!
//! The closure stays on the Rust side; the foreign code only ever sees a `Token` and an
//! environment-free `extern "C"` trampoline that finds the closure again from the token.
//!
//! ## Quick Start
//!
//! ```rust
//! use scoped_callback::{ScopedCallback, Token};
//! use std::ffi::{c_char, CStr};
//! use std::sync::Mutex;
//!
//! // Stand-in for a foreign function reporting the working directory.
//! extern "C" fn getcwdcb(
//!     token: Token,
//!     cb: extern "C" fn(Token, *const c_char, usize) -> i32,
//! ) -> i32 {
//!     cb(token, c"/home".as_ptr(), 0)
//! }
//!
//! let working_directory = Mutex::new(String::new());
//!
//! ScopedCallback::scope(
//!     |dir: *const c_char, _max: usize| {
//!         let dir = unsafe { CStr::from_ptr(dir) };
//!         *working_directory.lock().unwrap() = dir.to_string_lossy().into_owned();
//!         0
//!     },
//!     |cb| getcwdcb(cb.token(), cb.trampoline()),
//! )
//! .unwrap();
//!
//! assert_eq!(*working_directory.lock().unwrap(), "/home");
//! ```
//!
//! ## Strategies
//!
//! - [`ScopedCallback`]: the closure lives in a registry keyed by a counter token for
//!   exactly as long as the `ScopedCallback` does. Dispatching a released token is a
//!   miss, never a dangling access.
//! - [`DirectCallback`]: the token is the address of the boxed closure. No lock, no
//!   lookup, and no protection against tokens that outlive the callback.
//!
//! ## Main Items
//!
//! - [`ScopedCallback::new`] / [`ScopedCallback::scope`] - Register a closure
//! - [`ScopedCallback::trampoline`] / [`DirectCallback::trampoline`] - The `extern "C"` function to hand out
//! - [`define_callback_registry!`] - Declare an isolated registry
//! - [`CallbackRegistryApi::set_trace_callback`] - Observe registry operations

#[macro_use]
mod macros;

mod callback_args;
mod callback_error;
mod callback_event;
mod callback_table;
mod direct;
mod dispatch_gate;
mod erased;
mod registry_trait;
mod scoped;
mod typed;

pub use callback_args::CallbackArgs;
pub use callback_error::CallbackError;
pub use callback_event::CallbackEvent;
pub use callback_table::CallbackTable;
pub use direct::DirectCallback;
pub use dispatch_gate::DispatchGate;
pub use erased::{ErasedCallback, Signature};
pub use registry_trait::{CallbackRegistryApi, CallbackStorage, TraceCallback};
pub use scoped::ScopedCallback;
pub use typed::{CallbackFn, TypedCallback};

/// The opaque integer handed to foreign code alongside a trampoline (`uintptr_t`).
pub type Token = usize;

define_callback_registry!(global);

/// The process-wide registry used by [`ScopedCallback::new`] and [`ScopedCallback::scope`].
pub type GlobalRegistry = global::Api;
