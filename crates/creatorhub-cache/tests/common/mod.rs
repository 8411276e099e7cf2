//! In-memory stand-in for the remote tier with controllable status and
//! failure injection.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use creatorhub_cache::pattern::GlobPattern;
use creatorhub_core::error::AppError;
use creatorhub_core::result::AppResult;
use creatorhub_core::traits::cache::{RemoteCache, RemoteStatus};

#[derive(Debug)]
pub struct FakeRemote {
    entries: Mutex<HashMap<String, (String, Instant)>>,
    status: Mutex<RemoteStatus>,
    fail_all: AtomicBool,
    fail_patterns: Mutex<HashSet<String>>,
    pub gets: AtomicUsize,
    pub sets: AtomicUsize,
    pub deletes: AtomicUsize,
    pub closes: AtomicUsize,
}

impl FakeRemote {
    pub fn new(status: RemoteStatus) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            status: Mutex::new(status),
            fail_all: AtomicBool::new(false),
            fail_patterns: Mutex::new(HashSet::new()),
            gets: AtomicUsize::new(0),
            sets: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
        }
    }

    pub fn ready() -> Self {
        Self::new(RemoteStatus::Ready)
    }

    pub fn set_status(&self, status: RemoteStatus) {
        *self.status.lock().unwrap() = status;
    }

    /// Make every command fail as if the connection dropped.
    pub fn fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    /// Make `KEYS pattern` fail for one specific pattern.
    pub fn fail_pattern(&self, pattern: &str) {
        self.fail_patterns
            .lock()
            .unwrap()
            .insert(pattern.to_string());
    }

    /// Seed an entry directly, bypassing counters.
    pub fn seed(&self, key: &str, value: &str) {
        self.entries.lock().unwrap().insert(
            key.to_string(),
            (value.to_string(), Instant::now() + Duration::from_secs(3600)),
        );
    }

    pub fn contains(&self, key: &str) -> bool {
        self.raw(key).is_some()
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap();
        entries
            .get(key)
            .filter(|(_, deadline)| *deadline > Instant::now())
            .map(|(value, _)| value.clone())
    }

    pub fn ttl_of(&self, key: &str) -> Option<Duration> {
        let entries = self.entries.lock().unwrap();
        entries
            .get(key)
            .map(|(_, deadline)| deadline.saturating_duration_since(Instant::now()))
    }

    fn check(&self) -> AppResult<()> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(AppError::service_unavailable("connection reset by peer"));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteCache for FakeRemote {
    fn status(&self) -> RemoteStatus {
        *self.status.lock().unwrap()
    }

    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.raw(key))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> AppResult<u64> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let mut entries = self.entries.lock().unwrap();
        Ok(keys.iter().filter(|k| entries.remove(*k).is_some()).count() as u64)
    }

    async fn keys_matching(&self, pattern: &str) -> AppResult<Vec<String>> {
        self.check()?;
        if self.fail_patterns.lock().unwrap().contains(pattern) {
            return Err(AppError::service_unavailable("KEYS timed out"));
        }
        let glob = GlobPattern::new(pattern).unwrap();
        let now = Instant::now();
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(key, (_, deadline))| *deadline > now && glob.matches(key))
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn ping(&self) -> AppResult<()> {
        self.check()
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.set_status(RemoteStatus::Closed);
    }
}
