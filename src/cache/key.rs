use crate::model::{HistoryWindow, Request};
use std::fmt;

const KEY_CONTEXT: &str = "finance-edge 2024 request cache key v1";

/// blake3 digest identifying a logical request.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanonicalKey([u8; 32]);

impl CanonicalKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// First 8 hex chars, for logs.
    pub fn short(&self) -> String {
        self.0[..4].iter().map(|byte| format!("{byte:02x}")).collect()
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CanonicalKey({})", self.short())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct KeyCanonicalizer {
    window: HistoryWindow,
}

impl KeyCanonicalizer {
    pub fn new(window: HistoryWindow) -> Self {
        Self { window }
    }

    /// Hash `(message, expenses, app_data, last-W history)` in that order.
    ///
    /// Every string is length-prefixed so that moving bytes between adjacent
    /// fields always changes the digest.
    pub fn canonicalize(&self, request: &Request) -> CanonicalKey {
        let mut hasher = blake3::Hasher::new_derive_key(KEY_CONTEXT);
        write_str(&mut hasher, &request.message);
        write_str(&mut hasher, &request.expenses);
        write_str(&mut hasher, &request.app_data);

        let turns = self.window.apply(&request.history);
        hasher.update(&(turns.len() as u64).to_le_bytes());
        for turn in turns {
            hasher.update(&[turn.role.tag()]);
            write_str(&mut hasher, &turn.content);
        }
        CanonicalKey(*hasher.finalize().as_bytes())
    }
}

fn write_str(hasher: &mut blake3::Hasher, value: &str) {
    hasher.update(&(value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}
