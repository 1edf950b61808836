//! In-memory indexed event store.
//!
//! Every dimension the analytics queries filter on gets an ordered
//! `(timestamp, event_id)` index so lookups are range scans rather than
//! full sweeps. A separate `(expiry, event_id)` index drives purges.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;
use std::ops::Bound;
use tracing::debug;

use insights_core::{
    AnalyticsEvent, DateRange, Error, EventCategory, EventFilter, EventType, Result,
};

use crate::EventStore;

type IndexKey = (DateTime<Utc>, String);

#[derive(Default)]
struct Inner {
    events: HashMap<String, AnalyticsEvent>,
    by_time: BTreeSet<IndexKey>,
    by_customer: HashMap<String, BTreeSet<IndexKey>>,
    by_type: HashMap<EventType, BTreeSet<IndexKey>>,
    by_category: HashMap<EventCategory, BTreeSet<IndexKey>>,
    by_session: HashMap<String, BTreeSet<IndexKey>>,
    by_expiry: BTreeSet<IndexKey>,
}

fn index_insert<K: Eq + Hash>(index: &mut HashMap<K, BTreeSet<IndexKey>>, key: K, entry: IndexKey) {
    index.entry(key).or_default().insert(entry);
}

fn index_remove<K: Eq + Hash>(index: &mut HashMap<K, BTreeSet<IndexKey>>, key: &K, entry: &IndexKey) {
    if let Some(set) = index.get_mut(key) {
        set.remove(entry);
        if set.is_empty() {
            index.remove(key);
        }
    }
}

/// Iterates index keys within `range`, newest first.
fn scan<'a>(
    set: &'a BTreeSet<IndexKey>,
    range: Option<DateRange>,
) -> Box<dyn Iterator<Item = &'a IndexKey> + 'a> {
    match range {
        None => Box::new(set.iter().rev()),
        Some(range) => {
            let lower = Bound::Included((range.from, String::new()));
            let upper = Bound::Excluded((range.to + Duration::nanoseconds(1), String::new()));
            Box::new(set.range((lower, upper)).rev())
        }
    }
}

impl Inner {
    fn insert(&mut self, event: AnalyticsEvent) {
        let key = (event.timestamp, event.event_id.clone());

        self.by_time.insert(key.clone());
        index_insert(&mut self.by_customer, event.customer_id.clone(), key.clone());
        index_insert(&mut self.by_type, event.event_type, key.clone());
        index_insert(&mut self.by_category, event.event_category, key.clone());
        if let Some(ref session) = event.session_id {
            index_insert(&mut self.by_session, session.clone(), key.clone());
        }
        self.by_expiry
            .insert((event.privacy.data_retention_expiry, event.event_id.clone()));

        self.events.insert(event.event_id.clone(), event);
    }

    fn remove(&mut self, event_id: &str) -> bool {
        let Some(event) = self.events.remove(event_id) else {
            return false;
        };
        let key = (event.timestamp, event.event_id.clone());

        self.by_time.remove(&key);
        index_remove(&mut self.by_customer, &event.customer_id, &key);
        index_remove(&mut self.by_type, &event.event_type, &key);
        index_remove(&mut self.by_category, &event.event_category, &key);
        if let Some(ref session) = event.session_id {
            index_remove(&mut self.by_session, session, &key);
        }
        self.by_expiry
            .remove(&(event.privacy.data_retention_expiry, event.event_id));
        true
    }

    /// Picks the narrowest index the filter allows.
    fn candidates(&self, filter: &EventFilter) -> Option<&BTreeSet<IndexKey>> {
        if let Some(ref customer) = filter.customer_id {
            return self.by_customer.get(customer);
        }
        if let Some(ref session) = filter.session_id {
            return self.by_session.get(session);
        }
        if let Some(ref event_type) = filter.event_type {
            return self.by_type.get(event_type);
        }
        if let Some(ref category) = filter.event_category {
            return self.by_category.get(category);
        }
        Some(&self.by_time)
    }

    fn matching<'a>(&'a self, filter: &'a EventFilter) -> impl Iterator<Item = &'a AnalyticsEvent> + 'a {
        self.candidates(filter)
            .into_iter()
            .flat_map(move |set| scan(set, filter.range))
            .filter_map(move |(_, id)| self.events.get(id))
            .filter(move |event| filter.matches(event))
    }
}

/// Event store kept entirely in process memory.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn append(&self, event: AnalyticsEvent) -> Result<String> {
        let mut inner = self.inner.write();
        if inner.events.contains_key(&event.event_id) {
            return Err(Error::DuplicateEventId(event.event_id));
        }
        let id = event.event_id.clone();
        inner.insert(event);
        Ok(id)
    }

    async fn find(&self, filter: &EventFilter) -> Result<Vec<AnalyticsEvent>> {
        let inner = self.inner.read();
        Ok(inner.matching(filter).cloned().collect())
    }

    async fn count_matching(&self, filter: &EventFilter) -> Result<u64> {
        let inner = self.inner.read();
        Ok(inner.matching(filter).count() as u64)
    }

    async fn delete_expired_batch(&self, as_of: DateTime<Utc>, limit: usize) -> Result<u64> {
        let mut inner = self.inner.write();

        let expired: Vec<String> = inner
            .by_expiry
            .iter()
            .take_while(|(expiry, _)| *expiry < as_of)
            .take(limit)
            .map(|(_, id)| id.clone())
            .collect();

        let deleted = expired.iter().filter(|id| inner.remove(id)).count() as u64;
        if deleted > 0 {
            debug!(deleted, "Removed expired events from memory store");
        }
        Ok(deleted)
    }

    async fn count_all(&self) -> Result<u64> {
        Ok(self.inner.read().events.len() as u64)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
