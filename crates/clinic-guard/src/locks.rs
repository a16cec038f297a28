//! Per-resource mutual exclusion for scheduling decisions.
//!
//! A lease holds a set of resource keys. Acquisition is all-or-nothing: a
//! caller waits until none of its keys is held, then takes every key at once,
//! so two leases can never wait on each other. Leases over disjoint resources
//! never block one another.

use std::collections::HashSet;
use std::sync::{Condvar, Mutex};

use crate::appointment::ResourceKey;
use crate::error::{GuardError, Result};

#[derive(Debug, Default)]
pub struct ResourceLocks {
    held: Mutex<HashSet<ResourceKey>>,
    released: Condvar,
}

impl ResourceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until every key in `keys` is free, then hold them all.
    ///
    /// Duplicate keys are allowed and collapse to one.
    pub fn acquire<I>(&self, keys: I) -> Result<ResourceLease<'_>>
    where
        I: IntoIterator<Item = ResourceKey>,
    {
        let keys: HashSet<ResourceKey> = keys.into_iter().collect();
        let mut held = self.held.lock().map_err(|_| poisoned())?;
        while keys.iter().any(|key| held.contains(key)) {
            held = self.released.wait(held).map_err(|_| poisoned())?;
        }
        held.extend(keys.iter().cloned());
        Ok(ResourceLease { locks: self, keys })
    }

    /// Whether `key` is currently leased.
    pub fn is_held(&self, key: &ResourceKey) -> Result<bool> {
        let held = self.held.lock().map_err(|_| poisoned())?;
        Ok(held.contains(key))
    }
}

fn poisoned() -> GuardError {
    GuardError::Store("resource lock table poisoned".to_string())
}

/// Keys held until drop.
#[derive(Debug)]
pub struct ResourceLease<'a> {
    locks: &'a ResourceLocks,
    keys: HashSet<ResourceKey>,
}

impl ResourceLease<'_> {
    pub fn keys(&self) -> impl Iterator<Item = &ResourceKey> {
        self.keys.iter()
    }
}

impl Drop for ResourceLease<'_> {
    fn drop(&mut self) {
        // A poisoned table still has to give the keys back.
        let mut held = match self.locks.held.lock() {
            Ok(held) => held,
            Err(poisoned) => poisoned.into_inner(),
        };
        for key in &self.keys {
            held.remove(key);
        }
        drop(held);
        self.locks.released.notify_all();
    }
}
