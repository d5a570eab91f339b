//! In-memory append-only event store
//!
//! Events are kept in arrival order and indexed by id. Nothing is ever
//! removed or rewritten; a correction is a new event whose supersession link
//! points back at the old one.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::epistemic::{EpistemicError, EpistemicResult, Event, EventValidator};
use crate::horizon::EventProvider;
use crate::observability::{log_event, LogEvent, Logger};

use super::errors::{StoreError, StoreResult};

#[derive(Debug, Clone, Default)]
pub struct MemoryEventStore {
    events: Vec<Event>,
    index: HashMap<String, usize>,
    validate_on_append: bool,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that runs strict event validation before every append
    pub fn validating() -> Self {
        Self {
            validate_on_append: true,
            ..Self::default()
        }
    }

    /// Appends an event.
    ///
    /// # Errors
    ///
    /// - `NOEMA_DUPLICATE_EVENT` if the id is already stored
    /// - `NOEMA_EVENT_INVALID` if this store validates and the event breaks a rule
    pub fn append(&mut self, event: Event) -> EpistemicResult<&Event> {
        if let Err(err) = self.admit(&event) {
            log_event(
                LogEvent::EventRejected,
                &[("code", err.code().code()), ("event_id", event.id())],
            );
            return Err(err);
        }

        Logger::trace(
            LogEvent::EventAppended.as_str(),
            &[
                ("epistemic_type", event.epistemic_type().as_str()),
                ("event_id", event.id()),
            ],
        );
        let position = self.events.len();
        self.index.insert(event.id().to_string(), position);
        self.events.push(event);
        Ok(&self.events[position])
    }

    fn admit(&self, event: &Event) -> EpistemicResult<()> {
        if self.index.contains_key(event.id()) {
            return Err(EpistemicError::duplicate_event(event.id()));
        }
        if self.validate_on_append {
            EventValidator::assert_valid(event)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    /// Events that declare they supersede `id`, oldest first
    pub fn superseded_by(&self, id: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| {
                e.supersession()
                    .and_then(|s| s.supersedes_id())
                    .is_some_and(|target| target == id)
            })
            .collect()
    }

    /// True if some later event supersedes `id`
    pub fn is_superseded(&self, id: &str) -> bool {
        !self.superseded_by(id).is_empty()
    }

    /// Decodes and appends every event of a JSON array, or of the `events`
    /// array of a JSON object. Decoding is strict; the first failure aborts.
    pub fn from_value(value: &Value, validate: bool) -> StoreResult<Self> {
        let items = match value {
            Value::Array(items) => items,
            Value::Object(obj) => obj
                .get("events")
                .and_then(Value::as_array)
                .ok_or_else(|| StoreError::decode_failed("expected an 'events' array"))?,
            _ => {
                return Err(StoreError::decode_failed(
                    "expected an array of events or an object with 'events'",
                ))
            }
        };

        let mut store = if validate {
            Self::validating()
        } else {
            Self::new()
        };
        for (i, item) in items.iter().enumerate() {
            let event = Event::from_value(item).map_err(|e| StoreError::event_rejected(i, &e))?;
            store
                .append(event)
                .map_err(|e| StoreError::event_rejected(i, &e))?;
        }
        Ok(store)
    }

    pub fn load(path: &Path, validate: bool) -> StoreResult<Self> {
        let value = read_json(path)?;
        Self::from_value(&value, validate)
    }
}

impl EventProvider for MemoryEventStore {
    fn events(&self) -> Vec<&Event> {
        self.events.iter().collect()
    }

    fn event(&self, id: &str) -> Option<&Event> {
        self.index.get(id).map(|&i| &self.events[i])
    }
}

pub(crate) fn read_json(path: &Path) -> StoreResult<Value> {
    let content = fs::read_to_string(path).map_err(|e| {
        StoreError::read_failed(format!("Failed to read {}", path.display()), e)
    })?;
    serde_json::from_str(&content).map_err(|e| {
        StoreError::decode_failed(format!("Invalid JSON in {}: {}", path.display(), e))
    })
}
