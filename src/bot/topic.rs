use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use crate::bot::fallback::Equipment;

/// What we remember about a chat's last recognized subject.
#[derive(Debug, Clone)]
pub struct TopicEntry {
    pub subject: Equipment,
    /// Last parsed dimension, in millimeters.
    pub dimension_mm: Option<i64>,
    pub noted_at: DateTime<Utc>,
}

/// Best-effort per-chat memory of the last recognized subject. Bounded:
/// capacity eviction drops the oldest chat, and entries past the staleness
/// window are ignored on read. Losing an entry only costs continuity, never
/// correctness, so races between chats are tolerated.
pub struct TopicMemory {
    inner: Mutex<Inner>,
    capacity: usize,
}

struct Inner {
    entries: HashMap<i64, TopicEntry>,
    /// Insertion order, oldest first.
    order: VecDeque<i64>,
}

const STALE_AFTER_HOURS: i64 = 6;

impl TopicMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
            capacity: capacity.max(1),
        }
    }

    /// Record the subject of the latest exchange for this chat.
    pub fn remember(&self, chat_id: i64, subject: Equipment, dimension_mm: Option<i64>) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };

        if inner.entries.insert(
            chat_id,
            TopicEntry {
                subject,
                dimension_mm,
                noted_at: Utc::now(),
            },
        ).is_none()
        {
            inner.order.push_back(chat_id);
            if inner.order.len() > self.capacity {
                if let Some(oldest) = inner.order.pop_front() {
                    inner.entries.remove(&oldest);
                }
            }
        }
    }

    /// The remembered subject, unless it has gone stale.
    pub fn recall(&self, chat_id: i64) -> Option<TopicEntry> {
        let inner = self.inner.lock().ok()?;
        let entry = inner.entries.get(&chat_id)?;
        if Utc::now() - entry.noted_at > Duration::hours(STALE_AFTER_HOURS) {
            return None;
        }
        Some(entry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remembers_and_recalls() {
        let mem = TopicMemory::new(8);
        mem.remember(1, Equipment::SawBlade, Some(300));
        let entry = mem.recall(1).unwrap();
        assert_eq!(entry.subject, Equipment::SawBlade);
        assert_eq!(entry.dimension_mm, Some(300));
    }

    #[test]
    fn unknown_chat_recalls_nothing() {
        let mem = TopicMemory::new(8);
        assert!(mem.recall(99).is_none());
    }

    #[test]
    fn rewriting_a_chat_updates_in_place() {
        let mem = TopicMemory::new(2);
        mem.remember(1, Equipment::SawBlade, Some(300));
        mem.remember(1, Equipment::Motor, None);
        let entry = mem.recall(1).unwrap();
        assert_eq!(entry.subject, Equipment::Motor);
        assert_eq!(entry.dimension_mm, None);
    }

    #[test]
    fn capacity_evicts_the_oldest_chat() {
        let mem = TopicMemory::new(2);
        mem.remember(1, Equipment::SawBlade, None);
        mem.remember(2, Equipment::Motor, None);
        mem.remember(3, Equipment::Bearing, None);
        assert!(mem.recall(1).is_none());
        assert!(mem.recall(2).is_some());
        assert!(mem.recall(3).is_some());
    }

    #[test]
    fn stale_entries_are_ignored() {
        let mem = TopicMemory::new(2);
        mem.remember(1, Equipment::SawBlade, None);
        {
            let mut inner = mem.inner.lock().unwrap();
            inner.entries.get_mut(&1).unwrap().noted_at =
                Utc::now() - Duration::hours(STALE_AFTER_HOURS + 1);
        }
        assert!(mem.recall(1).is_none());
    }
}
