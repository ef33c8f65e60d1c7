//! The URL frontier: a priority queue with deduplication and an exact
//! in-flight set, shared by every worker task.
//!
//! A single async mutex guards the queue, the in-flight set, and the
//! counters; a `Notify` wakes waiters when `add`/`retry` insert work.
//! Deduplication is approximate (see [`crate::url::BloomFilter`]): once a
//! URL has been added it is never re-added, even after `complete`, so a
//! rare false positive only costs coverage, never the no-duplicate-dispatch
//! invariant.

use crate::url::{normalize_url, BloomFilter};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use tokio::sync::{Mutex, Notify};
use tokio::time::{timeout, Duration, Instant};

/// Crawl priority, smaller is more urgent. Ordering on the frontier's
/// internal heap entries is reversed so that `Highest` pops first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Highest,
    High,
    Normal,
    Low,
}

impl Priority {
    /// One step worse, saturating at `Low`. Used by `retry`.
    fn worsen(self) -> Self {
        match self {
            Priority::Highest => Priority::High,
            Priority::High => Priority::Normal,
            Priority::Normal => Priority::Low,
            Priority::Low => Priority::Low,
        }
    }
}

/// A unit of work handed out by [`Frontier::get`]. Immutable once enqueued
/// except for the fields `retry` rewrites on re-enqueue.
#[derive(Debug, Clone)]
pub struct UrlItem {
    pub url: String,
    pub priority: Priority,
    pub depth: u32,
    pub parent: Option<String>,
    pub retry_count: u32,
    sequence: u64,
}

struct QueueEntry {
    item: UrlItem,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.item.priority == other.item.priority && self.item.sequence == other.item.sequence
    }
}
impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    /// `BinaryHeap` is a max-heap; this ordering makes the most urgent
    /// item (lowest `Priority`, then lowest `sequence`) compare greatest,
    /// so it's the one `pop()` returns.
    fn cmp(&self, other: &Self) -> Ordering {
        match self.item.priority.cmp(&other.item.priority) {
            Ordering::Less => Ordering::Greater,
            Ordering::Greater => Ordering::Less,
            Ordering::Equal => other.item.sequence.cmp(&self.item.sequence),
        }
    }
}

struct FrontierState {
    queue: BinaryHeap<QueueEntry>,
    in_flight: HashSet<String>,
    completed: u64,
    errored: u64,
    next_sequence: u64,
}

/// Shared priority queue of pending URLs.
///
/// Share a `Frontier` behind an `Arc` across worker tasks.
pub struct Frontier {
    state: Mutex<FrontierState>,
    not_empty: Notify,
    seen: BloomFilter,
}

impl Frontier {
    /// Creates an empty frontier sized for roughly `expected_urls` URLs.
    pub fn new(expected_urls: usize) -> Self {
        Self {
            state: Mutex::new(FrontierState {
                queue: BinaryHeap::new(),
                in_flight: HashSet::new(),
                completed: 0,
                errored: 0,
                next_sequence: 0,
            }),
            not_empty: Notify::new(),
            seen: BloomFilter::new(expected_urls),
        }
    }

    /// Normalizes `url`; if it parses and has not been seen before,
    /// records it as seen, enqueues it, and wakes one waiter. Returns
    /// whether it was added.
    pub async fn add(
        &self,
        url: &str,
        priority: Priority,
        depth: u32,
        parent: Option<String>,
    ) -> bool {
        let normalized = match normalize_url(url, None) {
            Ok(u) => u.to_string(),
            Err(_) => return false,
        };

        if self.seen.contains(&normalized) {
            return false;
        }
        self.seen.add(&normalized);

        let mut state = self.state.lock().await;
        let sequence = state.next_sequence;
        state.next_sequence += 1;
        state.queue.push(QueueEntry {
            item: UrlItem {
                url: normalized,
                priority,
                depth,
                parent,
                retry_count: 0,
                sequence,
            },
        });
        drop(state);
        self.not_empty.notify_one();
        true
    }

    /// Folds `add` over `items`, returning the count actually added.
    pub async fn add_many<I>(&self, items: I) -> usize
    where
        I: IntoIterator<Item = (String, Priority, u32, Option<String>)>,
    {
        let mut added = 0;
        for (url, priority, depth, parent) in items {
            if self.add(&url, priority, depth, parent).await {
                added += 1;
            }
        }
        added
    }

    /// Blocks until an item is available or `wait` elapses. On success,
    /// atomically pops the most urgent item and records it as in-flight.
    pub async fn get(&self, wait: Duration) -> Option<UrlItem> {
        let deadline = Instant::now() + wait;

        loop {
            {
                let mut state = self.state.lock().await;
                if let Some(entry) = state.queue.pop() {
                    state.in_flight.insert(entry.item.url.clone());
                    return Some(entry.item);
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return None;
            }

            if timeout(deadline - now, self.not_empty.notified())
                .await
                .is_err()
            {
                return None;
            }
        }
    }

    /// Removes `url` from the in-flight set and credits the completed or
    /// error counter.
    pub async fn complete(&self, url: &str, success: bool) {
        let mut state = self.state.lock().await;
        state.in_flight.remove(url);
        if success {
            state.completed += 1;
        } else {
            state.errored += 1;
        }
    }

    /// Removes `item` from in-flight. If its retry count has reached
    /// `max_retries`, credits the error counter and returns `false`.
    /// Otherwise re-enqueues a copy with `retry_count + 1` and strictly
    /// worse priority, and returns `true`.
    pub async fn retry(&self, item: UrlItem, max_retries: u32) -> bool {
        let mut state = self.state.lock().await;
        state.in_flight.remove(&item.url);

        if item.retry_count >= max_retries {
            state.errored += 1;
            return false;
        }

        let sequence = state.next_sequence;
        state.next_sequence += 1;
        state.queue.push(QueueEntry {
            item: UrlItem {
                url: item.url,
                priority: item.priority.worsen(),
                depth: item.depth,
                parent: item.parent,
                retry_count: item.retry_count + 1,
                sequence,
            },
        });
        drop(state);
        self.not_empty.notify_one();
        true
    }

    pub async fn queue_size(&self) -> usize {
        self.state.lock().await.queue.len()
    }

    pub async fn in_flight_count(&self) -> usize {
        self.state.lock().await.in_flight.len()
    }

    pub fn seen_count(&self) -> u64 {
        self.seen.inserted_count()
    }

    pub async fn completed_count(&self) -> u64 {
        self.state.lock().await.completed
    }

    pub async fn error_count(&self) -> u64 {
        self.state.lock().await.errored
    }

    pub async fn is_empty(&self) -> bool {
        let state = self.state.lock().await;
        state.queue.is_empty() && state.in_flight.is_empty()
    }
}
