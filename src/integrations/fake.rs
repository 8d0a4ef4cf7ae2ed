//! Scripted profile source for tests; counts every lookup.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::twitter::{LookupError, ProfileSource};
use crate::models::Profile;

#[derive(Default)]
pub struct FakeProfileSource {
    calls: AtomicUsize,
    missing: Mutex<HashSet<String>>,
    looked_up: Mutex<Vec<String>>,
}

impl FakeProfileSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lookups for `handle` will fail with HTTP 404.
    pub fn mark_missing(&self, handle: &str) {
        self.missing.lock().unwrap().insert(handle.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn looked_up(&self) -> Vec<String> {
        self.looked_up.lock().unwrap().clone()
    }
}

pub fn sample_profile(handle: &str) -> Profile {
    Profile {
        twitter_id: format!("id-{}", handle),
        handle: handle.to_string(),
        name: format!("Creator {}", handle),
        description: Some(format!("bio of {}", handle)),
        avatar_url: Some(format!("https://img.example/{}.jpg", handle)),
    }
}

#[async_trait]
impl ProfileSource for FakeProfileSource {
    async fn lookup(&self, handle: &str) -> Result<Profile, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.looked_up.lock().unwrap().push(handle.to_string());
        if self.missing.lock().unwrap().contains(handle) {
            return Err(LookupError::Status(404));
        }
        Ok(sample_profile(handle))
    }
}
