//! Argument tuples and the `extern "C"` trampolines generated for them.
//!
//! A callback taking `(A0, .., An)` is dispatched through
//! `extern "C" fn(Token, A0, .., An) -> R`. The trampoline carries no environment:
//! everything it needs travels through the token.

use crate::{CallbackFn, CallbackRegistryApi, DirectCallback, Token};

/// An argument tuple of arity 0 to 6.
///
/// Names the two trampoline pointer types for the tuple and hands out the
/// monomorphized trampolines.
pub trait CallbackArgs: Sized + 'static {
    /// `extern "C" fn(Token, A0, .., An) -> R`, dispatched through a registry.
    type ScopedFn<R: 'static>: Copy;

    /// `unsafe extern "C" fn(Token, A0, .., An) -> R`, dispatched by address.
    type DirectFn<R: 'static>: Copy;

    fn scoped_trampoline<Reg: CallbackRegistryApi, R: 'static>() -> Self::ScopedFn<R>;

    fn direct_trampoline<R: Default + 'static>() -> Self::DirectFn<R>;
}

macro_rules! impl_callback_args {
    ($($arg:ident: $ty:ident),*) => {
        impl<F, R, $($ty,)*> CallbackFn<R, ($($ty,)*)> for F
        where
            F: Fn($($ty),*) -> R + Send + Sync,
        {
            #[inline]
            fn call(&self, ($($arg,)*): ($($ty,)*)) -> R {
                self($($arg),*)
            }
        }

        impl<$($ty: 'static),*> CallbackArgs for ($($ty,)*) {
            type ScopedFn<R: 'static> = extern "C" fn(Token $(, $ty)*) -> R;
            type DirectFn<R: 'static> = unsafe extern "C" fn(Token $(, $ty)*) -> R;

            fn scoped_trampoline<Reg: CallbackRegistryApi, R: 'static>() -> Self::ScopedFn<R> {
                #[allow(improper_ctypes_definitions)]
                extern "C" fn trampoline<Reg: CallbackRegistryApi, R: 'static, $($ty: 'static),*>(
                    token: Token
                    $(, $arg: $ty)*
                ) -> R {
                    Reg::API.dispatch::<R, ($($ty,)*)>(token, ($($arg,)*))
                }

                trampoline::<Reg, R $(, $ty)*>
            }

            fn direct_trampoline<R: Default + 'static>() -> Self::DirectFn<R> {
                #[allow(improper_ctypes_definitions)]
                unsafe extern "C" fn trampoline<R: Default + 'static, $($ty: 'static),*>(
                    token: Token
                    $(, $arg: $ty)*
                ) -> R {
                    unsafe { DirectCallback::<R, ($($ty,)*)>::dispatch(token, ($($arg,)*)) }
                }

                trampoline::<R $(, $ty)*>
            }
        }
    };
}

impl_callback_args!();
impl_callback_args!(a0: A0);
impl_callback_args!(a0: A0, a1: A1);
impl_callback_args!(a0: A0, a1: A1, a2: A2);
impl_callback_args!(a0: A0, a1: A1, a2: A2, a3: A3);
impl_callback_args!(a0: A0, a1: A1, a2: A2, a3: A3, a4: A4);
impl_callback_args!(a0: A0, a1: A1, a2: A2, a3: A3, a4: A4, a5: A5);
