//! Typed closure holder.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::mem;

use crate::{CallbackArgs, ErasedCallback, Signature};

/// A closure callable with the argument tuple `Args`, returning `R`.
///
/// Implemented for every `Fn(A0, .., An) -> R + Send + Sync` closure or function
/// with up to six arguments, so callers never implement it by hand.
pub trait CallbackFn<R, Args>: Send + Sync {
    fn call(&self, args: Args) -> R;
}

/// Holds one closure of signature `Fn(A0, .., An) -> R`.
///
/// `'a` bounds whatever the closure borrows. Only `TypedCallback<'static, _, _>`
/// implements [`ErasedCallback`]; borrowed holders reach a registry exclusively
/// through [`ScopedCallback::scope`](crate::ScopedCallback::scope).
pub struct TypedCallback<'a, R, Args> {
    inner: Box<dyn CallbackFn<R, Args> + 'a>,
    _signature: PhantomData<fn(Args) -> R>,
}

impl<'a, R: 'static, Args: CallbackArgs> TypedCallback<'a, R, Args> {
    pub fn new<F>(callback: F) -> Self
    where
        F: CallbackFn<R, Args> + 'a,
    {
        TypedCallback {
            inner: Box::new(callback),
            _signature: PhantomData,
        }
    }

    /// Invoke the held closure. Whatever it returns (or panics with) is passed
    /// through untouched.
    pub fn call(&self, args: Args) -> R {
        self.inner.call(args)
    }

    pub fn signature(&self) -> Signature {
        Signature::of::<R, Args>()
    }

    /// Forget the borrow bound of the held closure.
    ///
    /// # Safety
    ///
    /// The returned holder must be dropped, and never called again, before `'a` ends.
    pub(crate) unsafe fn erase_lifetime(self) -> TypedCallback<'static, R, Args> {
        let inner = unsafe {
            mem::transmute::<
                Box<dyn CallbackFn<R, Args> + 'a>,
                Box<dyn CallbackFn<R, Args> + 'static>,
            >(self.inner)
        };

        TypedCallback {
            inner,
            _signature: PhantomData,
        }
    }
}

impl<R: 'static, Args: CallbackArgs> ErasedCallback for TypedCallback<'static, R, Args> {
    fn signature(&self) -> Signature {
        Signature::of::<R, Args>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<R: 'static, Args: CallbackArgs> fmt::Debug for TypedCallback<'_, R, Args> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedCallback")
            .field("signature", &self.signature())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_call_forwards_arguments() {
        let add = TypedCallback::new(|a: i32, b: i32| a + b);
        assert_eq!(add.call((40, 2)), 42);
    }

    #[test]
    fn test_call_without_arguments() {
        let answer = TypedCallback::new(|| 42u64);
        assert_eq!(answer.call(()), 42);
    }

    #[test]
    fn test_borrowed_state_is_mutated() {
        let seen = Mutex::new(Vec::new());
        {
            let record = TypedCallback::new(|value: u8| seen.lock().unwrap().push(value));
            record.call((1,));
            record.call((2,));
        }
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_function_pointer_is_accepted() {
        fn double(x: i32) -> i32 {
            x * 2
        }
        let holder = TypedCallback::new(double);
        assert_eq!(holder.call((21,)), 42);
    }

    #[test]
    fn test_erased_downcast_to_originating_type() {
        let holder: Arc<dyn ErasedCallback> = Arc::new(TypedCallback::new(|x: u32| x + 1));

        assert_eq!(holder.signature(), Signature::of::<u32, (u32,)>());

        let typed = holder
            .as_any()
            .downcast_ref::<TypedCallback<'static, u32, (u32,)>>()
            .unwrap();
        assert_eq!(typed.call((1,)), 2);

        assert!(holder
            .as_any()
            .downcast_ref::<TypedCallback<'static, i32, (u32,)>>()
            .is_none());
    }

    #[test]
    fn test_drop_through_erased_handle_releases_captures() {
        let captured = Arc::new(AtomicUsize::new(0));
        let inner = captured.clone();

        let holder: Arc<dyn ErasedCallback> = Arc::new(TypedCallback::new(move || {
            inner.fetch_add(1, Ordering::SeqCst)
        }));
        assert_eq!(Arc::strong_count(&captured), 2);

        drop(holder);
        assert_eq!(Arc::strong_count(&captured), 1);
    }

    #[test]
    #[should_panic(expected = "closure failure")]
    fn test_panic_propagates_verbatim() {
        let failing = TypedCallback::new(|| -> i32 { panic!("closure failure") });
        failing.call(());
    }
}
