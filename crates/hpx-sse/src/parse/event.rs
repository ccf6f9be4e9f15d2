//! The event record handed to applications.

use std::collections::BTreeMap;

use bytes_utils::Str;

/// One parsed SSE event.
///
/// Every field is optional; an event with no field set is never produced by
/// the parser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Event {
    /// The `id` field.
    pub id: Option<Str>,
    /// The `event` field (event type name).
    pub event: Option<Str>,
    /// The `data` field; multiple `data` lines are joined with `\n`.
    pub data: Option<Str>,
    /// Bare lines without a field separator, keyed by the full line. Values
    /// are always empty.
    pub other: Option<BTreeMap<Str, Str>>,
    /// The non-standard `time` field.
    pub time: Option<Str>,
}

impl Event {
    /// Convenience accessor for the `id` field.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Convenience accessor for the `event` field.
    pub fn event_type(&self) -> Option<&str> {
        self.event.as_deref()
    }

    /// Convenience accessor for the `data` field.
    pub fn data(&self) -> Option<&str> {
        self.data.as_deref()
    }

    /// Convenience accessor for the `time` field.
    pub fn time(&self) -> Option<&str> {
        self.time.as_deref()
    }

    /// Whether a bare line equal to `line` appeared in the frame.
    pub fn has_other(&self, line: &str) -> bool {
        self.other
            .as_ref()
            .is_some_and(|other| other.contains_key(line))
    }

    /// `true` when no field carries a value.
    pub fn is_empty(&self) -> bool {
        fn blank(field: &Option<Str>) -> bool {
            field.as_deref().is_none_or(str::is_empty)
        }

        blank(&self.id)
            && blank(&self.event)
            && blank(&self.data)
            && blank(&self.time)
            && self.other.as_ref().is_none_or(BTreeMap::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty() {
        assert!(Event::default().is_empty());
    }

    #[test]
    fn test_empty_strings_count_as_empty() {
        let event = Event {
            id: Some(Str::from("")),
            data: Some(Str::from("")),
            other: Some(BTreeMap::new()),
            ..Default::default()
        };
        assert!(event.is_empty());
    }

    #[test]
    fn test_accessors() {
        let mut other = BTreeMap::new();
        other.insert(Str::from("ping"), Str::from(""));
        let event = Event {
            id: Some(Str::from("42")),
            event: Some(Str::from("add")),
            data: Some(Str::from("payload")),
            other: Some(other),
            time: Some(Str::from("1700000000")),
        };

        assert_eq!(event.id(), Some("42"));
        assert_eq!(event.event_type(), Some("add"));
        assert_eq!(event.data(), Some("payload"));
        assert_eq!(event.time(), Some("1700000000"));
        assert!(event.has_other("ping"));
        assert!(!event.has_other("pong"));
        assert!(!event.is_empty());
    }
}
