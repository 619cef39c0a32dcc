//! Grouping of actions by messenger and action type.

use modlog_core::types::{Action, ActionType, Messenger};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Aggregated value for one action type within a messenger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Entry {
    /// Number of `ban` or `warn` actions.
    Count(u64),
    /// Note texts in insertion order.
    Notes(Vec<String>),
}

/// Per-messenger breakdown, keyed by action type in order of first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessengerSummary {
    entries: Vec<(ActionType, Entry)>,
}

impl MessengerSummary {
    pub fn entries(&self) -> &[(ActionType, Entry)] {
        &self.entries
    }

    pub fn get(&self, kind: ActionType) -> Option<&Entry> {
        self.entries
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, entry)| entry)
    }

    /// Count for a non-note type, `None` if no such action was recorded.
    pub fn count(&self, kind: ActionType) -> Option<u64> {
        match self.get(kind) {
            Some(Entry::Count(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn notes(&self) -> Option<&[String]> {
        match self.get(ActionType::Note) {
            Some(Entry::Notes(notes)) => Some(notes),
            _ => None,
        }
    }

    fn record(&mut self, kind: ActionType, value: Option<&str>) {
        let idx = match self.entries.iter().position(|(k, _)| *k == kind) {
            Some(idx) => idx,
            None => {
                let initial = match kind {
                    ActionType::Note => Entry::Notes(Vec::new()),
                    _ => Entry::Count(0),
                };
                self.entries.push((kind, initial));
                self.entries.len() - 1
            }
        };

        match &mut self.entries[idx].1 {
            Entry::Count(n) => *n += 1,
            Entry::Notes(notes) => notes.extend(value.map(str::to_owned)),
        }
    }
}

impl Serialize for MessengerSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (kind, entry) in &self.entries {
            map.serialize_entry(kind.as_str(), entry)?;
        }
        map.end()
    }
}

/// Summary of the action log grouped by messenger.
///
/// Messengers keep the order of their first occurrence. Unscoped notes are
/// collected in the `global` bucket, which only exists if at least one was
/// recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    messengers: Vec<(Messenger, MessengerSummary)>,
    global: Option<Vec<String>>,
}

impl Report {
    pub fn messengers(&self) -> &[(Messenger, MessengerSummary)] {
        &self.messengers
    }

    pub fn messenger(&self, messenger: Messenger) -> Option<&MessengerSummary> {
        self.messengers
            .iter()
            .find(|(m, _)| *m == messenger)
            .map(|(_, summary)| summary)
    }

    pub fn global(&self) -> Option<&[String]> {
        self.global.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.messengers.is_empty() && self.global.is_none()
    }

    fn messenger_mut(&mut self, messenger: Messenger) -> &mut MessengerSummary {
        let idx = match self.messengers.iter().position(|(m, _)| *m == messenger) {
            Some(idx) => idx,
            None => {
                self.messengers.push((messenger, MessengerSummary::default()));
                self.messengers.len() - 1
            }
        };
        &mut self.messengers[idx].1
    }
}

impl Serialize for Report {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.messengers.len() + usize::from(self.global.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        for (messenger, summary) in &self.messengers {
            map.serialize_entry(messenger.as_str(), summary)?;
        }
        if let Some(global) = &self.global {
            map.serialize_entry("global", global)?;
        }
        map.end()
    }
}

/// Build the grouped summary of `actions`.
///
/// Unscoped actions contribute only their `value`, if any, to the global
/// bucket. A note tied to a messenger but carrying no value is skipped and
/// creates no keys.
pub fn build_summary(actions: &[Action]) -> Report {
    let mut report = Report::default();

    for action in actions {
        match action.messenger {
            None => {
                if let Some(value) = &action.value {
                    report.global.get_or_insert_with(Vec::new).push(value.clone());
                }
            }
            Some(messenger) => {
                if action.kind == ActionType::Note && action.value.is_none() {
                    continue;
                }
                report
                    .messenger_mut(messenger)
                    .record(action.kind, action.value.as_deref());
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_concrete_scenario() {
        let report = build_summary(&[
            Action::ban(Some(Messenger::Telegram)),
            Action::note(Some(Messenger::Telegram), "spam"),
            Action::note(None, "site-wide issue"),
        ]);

        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({
                "telegram": { "ban": 1, "note": ["spam"] },
                "global": ["site-wide issue"],
            })
        );
    }

    #[test]
    fn test_empty_log() {
        let report = build_summary(&[]);
        assert!(report.is_empty());
        assert_eq!(serde_json::to_string(&report).unwrap(), "{}");
    }

    #[test]
    fn test_unscoped_action_without_value_creates_no_global() {
        let report = build_summary(&[Action::ban(None), Action::warn(None)]);
        assert!(report.global().is_none());
        assert!(report.is_empty());
    }

    #[test]
    fn test_ban_count_and_no_note_key() {
        let actions: Vec<Action> = (0..7).map(|_| Action::ban(Some(Messenger::Discord))).collect();
        let report = build_summary(&actions);

        let discord = report.messenger(Messenger::Discord).unwrap();
        assert_eq!(discord.count(ActionType::Ban), Some(7));
        assert!(discord.get(ActionType::Note).is_none());
        assert!(discord.get(ActionType::Warn).is_none());
        assert_eq!(discord.entries().len(), 1);
    }

    #[test]
    fn test_messenger_order_follows_first_occurrence() {
        let report = build_summary(&[
            Action::warn(Some(Messenger::Matrix)),
            Action::ban(Some(Messenger::Whatsapp)),
            Action::ban(Some(Messenger::Matrix)),
        ]);

        let order: Vec<Messenger> = report.messengers().iter().map(|(m, _)| *m).collect();
        assert_eq!(order, vec![Messenger::Matrix, Messenger::Whatsapp]);

        let matrix = report.messenger(Messenger::Matrix).unwrap();
        let kinds: Vec<ActionType> = matrix.entries().iter().map(|(k, _)| *k).collect();
        assert_eq!(kinds, vec![ActionType::Warn, ActionType::Ban]);
    }

    #[test]
    fn test_notes_keep_insertion_order() {
        let report = build_summary(&[
            Action::note(Some(Messenger::Telegram), "first"),
            Action::note(None, "global one"),
            Action::note(Some(Messenger::Telegram), "second"),
            Action::note(None, "global two"),
        ]);

        let telegram = report.messenger(Messenger::Telegram).unwrap();
        assert_eq!(telegram.notes().unwrap(), ["first", "second"]);
        assert_eq!(report.global().unwrap(), ["global one", "global two"]);
    }

    #[test]
    fn test_valueless_scoped_note_is_skipped() {
        let stray = Action {
            kind: ActionType::Note,
            messenger: Some(Messenger::Matrix),
            value: None,
        };
        let report = build_summary(&[stray.clone()]);
        assert!(report.messenger(Messenger::Matrix).is_none());

        let report = build_summary(&[Action::note(Some(Messenger::Matrix), "kept"), stray]);
        let matrix = report.messenger(Messenger::Matrix).unwrap();
        assert_eq!(matrix.notes().unwrap(), ["kept"]);
    }

    #[test]
    fn test_unscoped_value_on_non_note_goes_to_global() {
        let legacy = Action {
            kind: ActionType::Ban,
            messenger: None,
            value: Some("legacy entry".into()),
        };
        let report = build_summary(&[legacy]);
        assert_eq!(report.global().unwrap(), ["legacy entry"]);
    }
}
