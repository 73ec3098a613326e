use std::{
    collections::{HashMap, HashSet},
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;

use super::Backend;
use crate::error::BackendError;

/// Stand-in for the remote store. Each primitive takes the lock once, which
/// gives the same per-command atomicity the real store has.
#[derive(Default)]
pub struct MemoryBackend {
    sets: Mutex<HashMap<String, HashSet<String>>>,
    ints: Mutex<HashMap<String, u64>>,
    calls: AtomicUsize,
    mutations: AtomicUsize,
    fail_increments: AtomicBool,
}

impl MemoryBackend {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn mutations(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    /// Makes every following `increment_integer` fail, set inserts keep working.
    pub fn fail_increments(&self, fail: bool) {
        self.fail_increments.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn get_integer(&self, key: &str) -> Result<Option<u64>, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        Ok(self.ints.lock().unwrap().get(key).copied())
    }

    async fn add_to_set_if_absent(&self, key: &str, member: &str) -> Result<bool, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        let added = self
            .sets
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string());

        if added {
            self.mutations.fetch_add(1, Ordering::SeqCst);
        }

        Ok(added)
    }

    async fn increment_integer(&self, key: &str) -> Result<u64, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_increments.load(Ordering::SeqCst) {
            return Err(BackendError::Remote("connection reset".to_string()));
        }
        self.mutations.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        let mut ints = self.ints.lock().unwrap();
        let value = ints.entry(key.to_string()).or_insert(0);
        *value += 1;

        Ok(*value)
    }
}

/// Backend whose every call fails as if the network were down.
pub struct BrokenBackend;

#[async_trait]
impl Backend for BrokenBackend {
    async fn get_integer(&self, _key: &str) -> Result<Option<u64>, BackendError> {
        Err(BackendError::Remote("connection reset".to_string()))
    }

    async fn add_to_set_if_absent(&self, _key: &str, _member: &str) -> Result<bool, BackendError> {
        Err(BackendError::Remote("connection reset".to_string()))
    }

    async fn increment_integer(&self, _key: &str) -> Result<u64, BackendError> {
        Err(BackendError::Remote("connection reset".to_string()))
    }
}
