//! Bounded in-memory event log.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use safeguard_types::{EventDetails, EventId, SafetyEvent};

use crate::error::{ControllerError, ControllerResult};

/// Accepted events, oldest first, capped at a fixed capacity.
///
/// When full, the oldest resolved event is evicted first; only if every
/// retained event is still pending does the oldest pending event go.
#[derive(Debug, Clone)]
pub struct EventLog {
    events: VecDeque<SafetyEvent>,
    capacity: usize,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Append an event, returning whichever event was evicted to make room.
    pub fn push(&mut self, event: SafetyEvent) -> Option<SafetyEvent> {
        let evicted = if self.events.len() >= self.capacity {
            let index = self
                .events
                .iter()
                .position(|e| e.resolved)
                .unwrap_or(0);
            self.events.remove(index)
        } else {
            None
        };
        self.events.push_back(event);
        evicted
    }

    pub fn get(&self, id: &EventId) -> Option<&SafetyEvent> {
        self.events.iter().find(|e| e.id == *id)
    }

    /// Resolve the event with `id`, merging `details` into its payload.
    pub fn resolve(
        &mut self,
        id: &EventId,
        details: EventDetails,
        at: DateTime<Utc>,
    ) -> ControllerResult<&SafetyEvent> {
        let event = self
            .events
            .iter_mut()
            .find(|e| e.id == *id)
            .ok_or(ControllerError::EventNotFound(*id))?;
        if !event.resolve(details, at) {
            return Err(ControllerError::AlreadyResolved(*id));
        }
        Ok(event)
    }

    /// Up to `limit` most recent events, newest first.
    pub fn recent(&self, limit: usize) -> Vec<SafetyEvent> {
        self.events.iter().rev().take(limit).cloned().collect()
    }

    pub fn unresolved(&self) -> Vec<SafetyEvent> {
        self.events.iter().filter(|e| !e.resolved).cloned().collect()
    }

    pub fn pending_count(&self) -> usize {
        self.events.iter().filter(|e| !e.resolved).count()
    }

    pub fn resolved_count(&self) -> usize {
        self.events.len() - self.pending_count()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use safeguard_types::{Severity, TriggerKind};
    use std::time::Duration;

    fn event() -> SafetyEvent {
        SafetyEvent::new(
            TriggerKind::MemoryLeak,
            Severity::Medium,
            EventDetails::new(),
            Utc::now(),
            Duration::ZERO,
        )
    }

    #[test]
    fn test_push_within_capacity() {
        let mut log = EventLog::new(3);
        assert!(log.push(event()).is_none());
        assert!(log.push(event()).is_none());
        assert_eq!(log.len(), 2);
        assert_eq!(log.pending_count(), 2);
    }

    #[test]
    fn test_evicts_oldest_pending_when_none_resolved() {
        let mut log = EventLog::new(2);
        let first = event();
        let first_id = first.id;
        log.push(first);
        log.push(event());
        let evicted = log.push(event()).unwrap();
        assert_eq!(evicted.id, first_id);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_prefers_evicting_resolved() {
        let mut log = EventLog::new(2);
        let first = event();
        let second = event();
        let (first_id, second_id) = (first.id, second.id);
        log.push(first);
        log.push(second);
        log.resolve(&second_id, EventDetails::new(), Utc::now()).unwrap();

        let evicted = log.push(event()).unwrap();
        assert_eq!(evicted.id, second_id);
        assert!(log.get(&first_id).is_some());
    }

    #[test]
    fn test_resolve_errors() {
        let mut log = EventLog::new(4);
        let e = event();
        let id = e.id;
        log.push(e);

        assert!(log.resolve(&id, EventDetails::new(), Utc::now()).is_ok());
        assert!(matches!(
            log.resolve(&id, EventDetails::new(), Utc::now()),
            Err(ControllerError::AlreadyResolved(_))
        ));
        assert!(matches!(
            log.resolve(&EventId::generate(), EventDetails::new(), Utc::now()),
            Err(ControllerError::EventNotFound(_))
        ));
        assert_eq!(log.resolved_count(), 1);
    }

    #[test]
    fn test_recent_is_newest_first() {
        let mut log = EventLog::new(10);
        let ids: Vec<_> = (0..4)
            .map(|_| {
                let e = event();
                let id = e.id;
                log.push(e);
                id
            })
            .collect();
        let recent = log.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, ids[3]);
        assert_eq!(recent[1].id, ids[2]);
    }
}
