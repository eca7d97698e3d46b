//! Macros for creating callback registries.
//!
//! Each registry owns its own token table, counter, lock and trace callback, so
//! registries never see each other's tokens.

/// Creates a complete callback registry with a single macro invocation.
///
/// The macro generates a module containing:
/// - Table storage static (hidden)
/// - Trace callback static (hidden)
/// - A public zero-sized `Api` type that implements `CallbackRegistryApi`, to be
///   used as the registry parameter of `ScopedCallback`
/// - An `API` constant and free functions for inspection and tracing
///
/// # Examples
///
/// ```rust
/// use scoped_callback::{define_callback_registry, ScopedCallback};
///
/// define_callback_registry!(plugins);
///
/// let cb = ScopedCallback::new_in(plugins::API, |x: i32| x + 1).unwrap();
/// assert!(plugins::contains(cb.token()));
/// assert_eq!((cb.trampoline())(cb.token(), 41), 42);
///
/// drop(cb);
/// assert!(plugins::is_empty());
/// ```
#[macro_export]
macro_rules! define_callback_registry {
    ($name:ident) => {
        pub mod $name {
            use std::sync::{Arc, LazyLock, Mutex};

            // Token table (module-private)
            static STORAGE: LazyLock<Mutex<$crate::CallbackTable>> =
                LazyLock::new(|| Mutex::new($crate::CallbackTable::new()));

            // Trace callback storage (module-private)
            static TRACE: LazyLock<Mutex<Option<Arc<dyn Fn(&$crate::CallbackEvent) + Send + Sync>>>> =
                LazyLock::new(|| Mutex::new(None));

            /// Zero-sized handle of this registry.
            ///
            /// All registry operations are provided by the `CallbackRegistryApi` trait's
            /// default implementations. This struct only provides access to the statics.
            #[derive(Debug, Clone, Copy, Default)]
            pub struct Api;

            impl $crate::CallbackRegistryApi for Api {
                const API: Self = Api;

                fn storage() -> &'static LazyLock<Mutex<$crate::CallbackTable>> {
                    &STORAGE
                }

                fn trace() -> &'static LazyLock<Mutex<Option<Arc<dyn Fn(&$crate::CallbackEvent) + Send + Sync>>>> {
                    &TRACE
                }
            }

            /// Convenient constant for accessing the registry API.
            pub const API: Api = Api;

            /// Check whether `token` is currently registered.
            pub fn contains(token: $crate::Token) -> bool {
                use $crate::CallbackRegistryApi;
                API.contains(token)
            }

            /// Number of live registrations.
            pub fn len() -> usize {
                use $crate::CallbackRegistryApi;
                API.len()
            }

            /// Whether no registration is live.
            pub fn is_empty() -> bool {
                use $crate::CallbackRegistryApi;
                API.is_empty()
            }

            /// Set a tracing callback for registry operations.
            pub fn set_trace_callback(callback: impl Fn(&$crate::CallbackEvent) + Send + Sync + 'static) {
                use $crate::CallbackRegistryApi;
                API.set_trace_callback(callback)
            }

            /// Clear the tracing callback.
            pub fn clear_trace_callback() {
                use $crate::CallbackRegistryApi;
                API.clear_trace_callback()
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::ScopedCallback;

    #[test]
    fn test_define_callback_registry_macro() {
        define_callback_registry!(test_reg);

        let cb = ScopedCallback::new_in(test_reg::API, |x: i32| x * 3).unwrap();
        assert!(test_reg::contains(cb.token()));
        assert_eq!(test_reg::len(), 1);
        assert_eq!(cb.invoke((14,)), Ok(42));

        drop(cb);
        assert!(test_reg::is_empty());
    }

    #[test]
    fn test_multiple_registries() {
        define_callback_registry!(reg_a);
        define_callback_registry!(reg_b);

        let a = ScopedCallback::new_in(reg_a::API, || 1i32).unwrap();
        let b = ScopedCallback::new_in(reg_b::API, || 2i32).unwrap();

        // Both counters start at the same value; the tables stay apart.
        assert_eq!(a.token(), b.token());
        assert_eq!(a.invoke(()), Ok(1));
        assert_eq!(b.invoke(()), Ok(2));
    }

    #[test]
    fn test_tracing() {
        define_callback_registry!(trace_test);

        use std::sync::{Arc, Mutex};
        let events = Arc::new(Mutex::new(Vec::new()));
        let events_clone = events.clone();

        trace_test::set_trace_callback(move |event| {
            events_clone.lock().unwrap().push(format!("{}", event));
        });

        {
            let cb = ScopedCallback::new_in(trace_test::API, |x: u8| x).unwrap();
            let _ = (cb.trampoline())(cb.token(), 7);
        }

        let recorded = events.lock().unwrap();
        assert_eq!(recorded.len(), 3);
        assert!(recorded[0].contains("register"));
        assert!(recorded[1].contains("dispatch"));
        assert!(recorded[2].contains("unregister"));
    }
}
