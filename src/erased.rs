//! Type-erased callback handles.
//!
//! Every typed holder implements [`ErasedCallback`], so holders of different
//! signatures can live behind one non-generic handle (`Arc<dyn ErasedCallback>`).
//! The concrete type is recovered by checking the [`Signature`] tag first and then
//! downcasting through [`ErasedCallback::as_any`].

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Explicit tag describing the signature `fn(Args) -> R` of a callback.
///
/// Equality and hashing only look at the `TypeId`; the name is kept for diagnostics.
#[derive(Clone, Copy)]
pub struct Signature {
    type_id: TypeId,
    name: &'static str,
}

impl Signature {
    /// The tag of a callback taking the argument tuple `Args` and returning `R`.
    pub fn of<R: 'static, Args: 'static>() -> Self {
        Signature {
            type_id: TypeId::of::<fn(Args) -> R>(),
            name: std::any::type_name::<fn(Args) -> R>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for Signature {}

impl Hash for Signature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Signature").field(&self.name).finish()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A type-erased, invocable closure.
///
/// Has no behaviour of its own. Dropping the handle drops the concrete holder
/// together with everything its closure captured.
pub trait ErasedCallback: Any + Send + Sync {
    /// The signature tag of the concrete holder.
    fn signature(&self) -> Signature;

    /// View used to downcast to the concrete holder type.
    fn as_any(&self) -> &dyn Any;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::os::raw::c_char;

    #[test]
    fn test_same_signature_is_equal() {
        assert_eq!(
            Signature::of::<i32, (*const c_char, usize)>(),
            Signature::of::<i32, (*const c_char, usize)>()
        );
    }

    #[test]
    fn test_return_type_distinguishes_signature() {
        assert_ne!(
            Signature::of::<i32, (usize,)>(),
            Signature::of::<u32, (usize,)>()
        );
    }

    #[test]
    fn test_argument_order_distinguishes_signature() {
        assert_ne!(
            Signature::of::<(), (u8, u16)>(),
            Signature::of::<(), (u16, u8)>()
        );
    }

    #[test]
    fn test_signature_hash_follows_type_id() {
        let mut set = HashSet::new();
        set.insert(Signature::of::<i32, ()>());
        set.insert(Signature::of::<i32, ()>());
        set.insert(Signature::of::<i64, ()>());
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_signature_name() {
        let sig = Signature::of::<bool, (u8,)>();
        assert!(sig.name().contains("u8"));
        assert!(sig.name().contains("bool"));
        assert_eq!(sig.to_string(), sig.name());
    }
}
