//! Token table backing a callback registry.

use std::collections::HashMap;
use std::fmt;
use std::mem::ManuallyDrop;
use std::sync::Arc;

use crate::{CallbackError, DispatchGate, ErasedCallback, Token};

struct Entry {
    callback: Arc<dyn ErasedCallback>,
    gate: Arc<DispatchGate>,
}

/// Maps live tokens to their type-erased closures.
///
/// Tokens come from a counter that only moves forward: a token is never handed out
/// twice, so a stale token can only miss, never reach a newer closure. `0` is never
/// issued.
///
/// Entries only leave the table through the registry, which drops them outside the
/// lock.
pub struct CallbackTable {
    entries: HashMap<Token, Entry>,
    next_token: Token,
}

impl CallbackTable {
    pub const FIRST_TOKEN: Token = 1;

    pub fn new() -> Self {
        Self::starting_at(Self::FIRST_TOKEN)
    }

    /// A table whose first issued token is `next_token` (clamped to at least 1).
    pub fn starting_at(next_token: Token) -> Self {
        CallbackTable {
            entries: HashMap::new(),
            next_token: next_token.max(Self::FIRST_TOKEN),
        }
    }

    /// Insert `callback` under the next counter value and advance the counter.
    ///
    /// # Errors
    ///
    /// `TokensExhausted` once the counter has reached `Token::MAX`. The table is left
    /// unchanged in that case.
    pub fn insert(&mut self, callback: Arc<dyn ErasedCallback>) -> Result<Token, CallbackError> {
        let token = self.next_token;
        self.next_token = token
            .checked_add(1)
            .ok_or(CallbackError::TokensExhausted)?;

        debug_assert!(!self.entries.contains_key(&token));
        self.entries.insert(
            token,
            Entry {
                callback,
                gate: Arc::new(DispatchGate::new()),
            },
        );

        Ok(token)
    }

    pub(crate) fn remove(&mut self, token: Token) -> Option<Arc<dyn ErasedCallback>> {
        self.entries.remove(&token).map(|entry| entry.callback)
    }

    /// The dispatch gate of `token`'s registration.
    pub(crate) fn gate(&self, token: Token) -> Option<Arc<DispatchGate>> {
        self.entries.get(&token).map(|entry| entry.gate.clone())
    }

    /// Hand out `token`'s closure for one dispatch, counted on its gate until the
    /// returned [`Checkout`] is dropped.
    pub(crate) fn checkout(&self, token: Token) -> Option<Checkout> {
        self.entries.get(&token).map(|entry| {
            entry.gate.enter();
            Checkout {
                callback: ManuallyDrop::new(entry.callback.clone()),
                gate: entry.gate.clone(),
            }
        })
    }

    pub fn contains(&self, token: Token) -> bool {
        self.entries.contains_key(&token)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The token the next insert will hand out.
    pub fn next_token(&self) -> Token {
        self.next_token
    }

    /// Remove every entry, returning them. The counter is not reset.
    pub(crate) fn drain(&mut self) -> Vec<Arc<dyn ErasedCallback>> {
        self.entries.drain().map(|(_, entry)| entry.callback).collect()
    }
}

/// One running dispatch of a table entry.
pub(crate) struct Checkout {
    callback: ManuallyDrop<Arc<dyn ErasedCallback>>,
    gate: Arc<DispatchGate>,
}

impl Checkout {
    pub(crate) fn callback(&self) -> &dyn ErasedCallback {
        &**self.callback
    }
}

impl Drop for Checkout {
    fn drop(&mut self) {
        // The closure may be dropped here; that has to finish before the gate
        // reports the dispatch as done.
        // SAFETY: `callback` is not touched again.
        unsafe { ManuallyDrop::drop(&mut self.callback) };
        self.gate.leave();
    }
}

impl Default for CallbackTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CallbackTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackTable")
            .field("live", &self.entries.len())
            .field("next_token", &self.next_token)
            .finish()
    }
}
