use crate::Token;

/// Events emitted by a callback registry during operations.
///
/// These events are passed to the tracing callback set via `set_trace_callback`.
/// The `Clone` derive allows callbacks to store or forward events if needed.
///
/// # Examples
///
/// ```rust
/// use scoped_callback::CallbackEvent;
///
/// let event = CallbackEvent::Dispatch { token: 1, found: true };
/// assert_eq!(event.to_string(), "dispatch { token: 1, found: true }");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackEvent {
    /// A closure was inserted into the registry.
    Register {
        /// The token handed out for the closure
        token: Token,
        /// The signature name, e.g. `fn((*const i8, usize)) -> i32`
        signature: &'static str,
    },

    /// A token was dispatched.
    Dispatch {
        token: Token,
        /// Whether the token was present in the registry
        found: bool,
    },

    /// A scoped callback released its token.
    Unregister { token: Token, found: bool },

    /// The registry was cleared.
    Clear {},
}

impl std::fmt::Display for CallbackEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallbackEvent::Register { token, signature } => {
                write!(f, "register {{ token: {token}, signature: {signature} }}")
            }
            CallbackEvent::Dispatch { token, found } => {
                write!(f, "dispatch {{ token: {token}, found: {found} }}")
            }
            CallbackEvent::Unregister { token, found } => {
                write!(f, "unregister {{ token: {token}, found: {found} }}")
            }
            CallbackEvent::Clear {} => write!(f, "Clearing the Registry"),
        }
    }
}
