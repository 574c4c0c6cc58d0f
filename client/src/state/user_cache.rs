//! Freshness-tracked cache for the authenticated user.
//!
//! Entries are keyed by query tag plus the token they were fetched with, so a
//! login with a new token never reads a user fetched under the old one.

#[cfg(test)]
#[path = "user_cache_test.rs"]
mod user_cache_test;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::net::types::AuthUser;

/// Tag for the current-user query.
pub const USER_QUERY_TAG: &str = "user";

/// How long a fetched user stays fresh.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(5 * 60);

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UserKey {
    pub tag: &'static str,
    pub token: Option<String>,
}

impl UserKey {
    pub fn user(token: Option<&str>) -> Self {
        Self { tag: USER_QUERY_TAG, token: token.map(str::to_owned) }
    }
}

#[derive(Clone, Debug)]
struct Entry {
    /// `None` records a fetch that found no user.
    user: Option<AuthUser>,
    fetched_at: Instant,
    invalidated: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Lookup {
    Missing,
    Fresh(Option<AuthUser>),
    Stale(Option<AuthUser>),
}

#[derive(Debug)]
pub struct UserCache {
    stale_after: Duration,
    entries: HashMap<UserKey, Entry>,
}

impl Default for UserCache {
    fn default() -> Self {
        Self::new(DEFAULT_STALE_AFTER)
    }
}

impl UserCache {
    pub fn new(stale_after: Duration) -> Self {
        Self { stale_after, entries: HashMap::new() }
    }

    pub fn lookup(&self, key: &UserKey, now: Instant) -> Lookup {
        let Some(entry) = self.entries.get(key) else {
            return Lookup::Missing;
        };
        let age = now.saturating_duration_since(entry.fetched_at);
        if entry.invalidated || age >= self.stale_after {
            Lookup::Stale(entry.user.clone())
        } else {
            Lookup::Fresh(entry.user.clone())
        }
    }

    /// Store `user` under `key`, stamped `now`. Entries for the same tag
    /// under other tokens are dropped.
    pub fn put(&mut self, key: UserKey, user: Option<AuthUser>, now: Instant) {
        self.entries.retain(|existing, _| existing.tag != key.tag || *existing == key);
        self.entries.insert(key, Entry { user, fetched_at: now, invalidated: false });
    }

    /// Mark every entry with `tag` stale without dropping it.
    pub fn invalidate(&mut self, tag: &str) {
        for (key, entry) in &mut self.entries {
            if key.tag == tag {
                entry.invalidated = true;
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn fetched_at(&self, key: &UserKey) -> Option<Instant> {
        self.entries.get(key).map(|e| e.fetched_at)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
