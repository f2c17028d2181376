use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;

use crate::operation::Address;

/// Locally cached nonce of one signer
#[derive(Debug, Default)]
pub(crate) struct NonceEntry {
    next_nonce: Option<u64>,
}

impl NonceEntry {
    pub(crate) fn cached(&self) -> Option<u64> {
        self.next_nonce
    }

    /// The remote index is only a floor, a higher cached value wins.
    pub(crate) fn next_nonce(&self, remote_next_nonce: u64) -> u64 {
        self.next_nonce
            .map_or(remote_next_nonce, |cached| cached.max(remote_next_nonce))
    }

    /// `None` once the nonce space of the address is used up
    pub(crate) fn reserve(&mut self, remote_next_nonce: u64) -> Option<u64> {
        let nonce = self.next_nonce(remote_next_nonce);
        self.next_nonce = Some(nonce.checked_add(1)?);
        Some(nonce)
    }

    /// Moves the cache down to `nonce` if it is ahead of it.
    /// Returns whether the cache changed.
    pub(crate) fn roll_back(&mut self, nonce: u64) -> bool {
        match self.next_nonce {
            Some(cached) if cached > nonce => {
                self.next_nonce = Some(nonce);
                true
            }
            _ => false,
        }
    }

    #[cfg(test)]
    pub(crate) fn set(&mut self, nonce: u64) {
        self.next_nonce = Some(nonce);
    }
}

/// Next nonce per signer address. Every address owns its own lock so that
/// signers never wait on each other.
#[derive(Debug, Default)]
pub(crate) struct NonceManagerState {
    entries: Mutex<HashMap<Address, Arc<AsyncMutex<NonceEntry>>>>,
}

impl NonceManagerState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Entry of the address, created on first use
    pub(crate) fn entry(&self, address: &Address) -> Arc<AsyncMutex<NonceEntry>> {
        self.entries
            .lock()
            .entry(address.clone())
            .or_default()
            .clone()
    }

    pub(crate) async fn cached_nonce(&self, address: &Address) -> Option<u64> {
        let entry = self.entries.lock().get(address).cloned()?;
        let guard = entry.lock().await;
        guard.cached()
    }

    #[cfg(test)]
    pub(crate) async fn set_cached_nonce(&self, address: &Address, nonce: u64) {
        self.entry(address).lock().await.set(nonce);
    }
}

#[cfg(test)]
mod tests;
