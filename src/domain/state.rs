//! Session state - the serializable position and accumulated answers
//!
//! A [`Snapshot`] is the only unit that is ever persisted or sent over the
//! wire: the current stage/phase plus the full answer map. Collections are
//! ordered (`BTreeMap`/`BTreeSet`) so serialization is deterministic and
//! replay comparisons are byte-stable.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Marker recorded in place of an answer when a timeout elapses before a
/// participant responded.
pub const NO_ANSWER: &str = "noAnswer";

/// Sub-step within one activity, determined by the activity kind.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum PhaseName {
    Individual,
    Group,
    Review
}

impl PhaseName {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseName::Individual => "individual",
            PhaseName::Group => "group",
            PhaseName::Review => "review"
        }
    }
}

/// Label identifying the active stage and, within an activity, the active
/// phase. Exactly one stage/phase is current at any time.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "stage", rename_all = "camelCase")]
pub enum StateValue {
    /// Participants are joining; the session has not started
    Waiting,
    /// One of the chained activities is active
    #[serde(rename_all = "camelCase")]
    Activity { activity_id: String, phase: PhaseName },
    /// Terminal stage - results are on display, no further transitions
    ViewResults
}

impl StateValue {
    /// The (activity, phase) pair if an activity is active
    pub fn active_phase(&self) -> Option<(&str, PhaseName)> {
        match self {
            StateValue::Activity { activity_id, phase } => Some((activity_id.as_str(), *phase)),
            _ => None
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StateValue::ViewResults)
    }
}

/// One participant's contribution to a phase.
///
/// A phase entry list never contains two entries with the same profile id;
/// [`SessionContext::upsert_entry`] maintains that invariant.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResultEntry {
    pub profile_id: String,
    /// Submitted answer; `None` until the participant submits, or for
    /// ready-only phases that never collect a value
    pub value:      Option<String>,
    pub ready:      bool
}

/// The mutable half of a [`Snapshot`]: who is connected, who is ready, and
/// everything answered so far.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    /// Participants needed before the session leaves `waiting`
    pub required_active_profile_count: usize,
    /// Currently connected participants
    pub current_active_profiles:       BTreeSet<String>,
    /// Participants that signalled ready-to-start while `waiting`
    pub ready_active_profiles:         BTreeSet<String>,
    /// activity id -> phase name -> entries, unique per profile id
    pub activity_result:               BTreeMap<String, BTreeMap<String, Vec<ResultEntry>>>,
    pub last_updated:                  DateTime<Utc>
}

impl SessionContext {
    pub fn new(required_active_profile_count: usize, now: DateTime<Utc>) -> Self {
        Self {
            required_active_profile_count,
            current_active_profiles: BTreeSet::new(),
            ready_active_profiles: BTreeSet::new(),
            activity_result: BTreeMap::new(),
            last_updated: now
        }
    }

    /// Entries recorded for one phase of one activity
    pub fn phase_entries(&self, activity_id: &str, phase: PhaseName) -> &[ResultEntry] {
        self.activity_result
            .get(activity_id)
            .and_then(|phases| phases.get(phase.as_str()))
            .map(|entries| entries.as_slice())
            .unwrap_or(&[])
    }

    /// Whether a profile has a ready entry for the given phase
    pub fn is_profile_ready(&self, activity_id: &str, phase: PhaseName, profile_id: &str) -> bool {
        self.phase_entries(activity_id, phase).iter().any(|e| e.profile_id == profile_id && e.ready)
    }

    /// Insert or update one profile's entry for a phase, preserving the
    /// one-entry-per-profile invariant. The mutator receives the existing
    /// entry or a fresh not-ready one.
    pub fn upsert_entry<F>(&mut self, activity_id: &str, phase: PhaseName, profile_id: &str, mutate: F)
    where
        F: FnOnce(&mut ResultEntry)
    {
        let entries = self
            .activity_result
            .entry(activity_id.to_string())
            .or_default()
            .entry(phase.as_str().to_string())
            .or_default();

        match entries.iter_mut().find(|e| e.profile_id == profile_id) {
            Some(entry) => mutate(entry),
            None => {
                let mut entry = ResultEntry { profile_id: profile_id.to_string(), value: None, ready: false };
                mutate(&mut entry);
                entries.push(entry);
            }
        }
    }
}

/// The complete serializable description of a session: its position and its
/// accumulated answers. Created fresh at `waiting` or restored from the
/// snapshot store; mutated only by the machine's transition function.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub value:   StateValue,
    pub context: SessionContext
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_keeps_one_entry_per_profile() {
        let mut context = SessionContext::new(2, Utc::now());

        context.upsert_entry("warmup", PhaseName::Individual, "ada", |e| e.value = Some("first".into()));
        context.upsert_entry("warmup", PhaseName::Individual, "ada", |e| e.value = Some("second".into()));
        context.upsert_entry("warmup", PhaseName::Individual, "lin", |e| e.ready = true);

        let entries = context.phase_entries("warmup", PhaseName::Individual);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].profile_id, "ada");
        assert_eq!(entries[0].value.as_deref(), Some("second"));
        assert!(!entries[0].ready);
        assert!(entries[1].ready);
    }

    #[test]
    fn state_value_serializes_with_stage_tag() {
        let value = StateValue::Activity { activity_id: "warmup".into(), phase: PhaseName::Group };
        let json = serde_json::to_value(&value).unwrap();

        assert_eq!(json["stage"], "activity");
        assert_eq!(json["activityId"], "warmup");
        assert_eq!(json["phase"], "group");

        let back: StateValue = serde_json::from_value(json).unwrap();
        assert_eq!(back, value);
    }
}
