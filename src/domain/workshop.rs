//! Core workshop domain types
//!
//! This module contains the immutable workshop definition as it arrives from
//! the collaborating persistence layer: an ordered list of activities, each
//! tagged with a kind and optional per-phase durations. The definition is
//! loaded once per worker and handed to the compiler.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::domain::error::SessionError;

/// Represents a complete workshop definition parsed from YAML.
///
/// A workshop is an ordered sequence of activities that a fixed group of
/// participants walks through in lockstep. Durations are expressed in
/// minutes; absent durations mean "no timer, advance on unanimous ready".
///
/// # Example YAML structure
/// ```yaml
/// name: "Team Kickoff"
/// required_profiles: 3
/// workshop_minutes: 90
/// activities:
///   - id: warmup
///     kind: question
///     title: "What do you expect from today?"
///     individual_minutes: 1
///     group_minutes: 5
///   - id: values
///     kind: conceptualization
///     activity_minutes: 15
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WorkshopDefinition {
    /// Human-readable name of the workshop
    pub name:              String,
    /// Number of participants that must be ready before the session starts
    pub required_profiles: usize,
    /// Optional hard deadline for the whole workshop, in minutes
    pub workshop_minutes:  Option<u64>,
    /// Ordered list of activities participants progress through
    pub activities:        Vec<Activity>
}

impl WorkshopDefinition {
    /// Parse a workshop definition from YAML content
    pub fn from_yaml(content: &str) -> Result<Self, SessionError> {
        let definition: WorkshopDefinition = serde_yaml::from_str(content)?;
        definition.validate()?;
        Ok(definition)
    }

    /// Reject definitions the compiler cannot chain
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.required_profiles == 0 {
            return Err(SessionError::Definition(format!(
                "workshop '{}' requires at least one profile",
                self.name
            )));
        }

        let mut seen = std::collections::BTreeSet::new();
        for activity in &self.activities {
            if activity.id.is_empty() {
                return Err(SessionError::Definition(format!("workshop '{}' has an activity without id", self.name)));
            }
            if !seen.insert(activity.id.as_str()) {
                return Err(SessionError::Definition(format!("duplicate activity id '{}'", activity.id)));
            }
        }

        Ok(())
    }
}

impl Display for WorkshopDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A single step of the workshop.
///
/// The kind selects one of the phase-pattern templates the compiler expands;
/// minute fields attach deadlines to the phases that exist for that kind and
/// are ignored for phases the template does not produce.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Activity {
    /// Stable identifier, referenced by actions and result entries
    pub id:                 String,
    /// Activity kind - determines the phase pattern
    pub kind:               ActivityKind,
    /// Optional human-readable title
    pub title:              Option<String>,
    /// Deadline for the whole activity, in minutes
    pub activity_minutes:   Option<u64>,
    /// Deadline for the individual phase, in minutes
    pub individual_minutes: Option<u64>,
    /// Deadline for the group phase, in minutes
    pub group_minutes:      Option<u64>,
    /// Deadline for the review phase, in minutes
    pub review_minutes:     Option<u64>
}

/// Defines the activity kinds supported by workshops.
///
/// Each kind maps to one of seven phase-pattern templates, see
/// [`crate::domain::compiler::PhasePattern`].
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ActivityKind {
    /// Reading material - participants only confirm they are done
    Theory,
    /// Individual answers discussed in the group afterwards
    Question,
    /// Individual work, no group step
    Assignment,
    /// Individual ideas converging on one shared group formulation
    Conceptualization,
    /// Individual and group work followed by a review step
    Benchmark,
    /// Individual poll answers
    Survey,
    /// Group agrees on a single action item
    Action
}

impl Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ActivityKind::Theory => "theory",
            ActivityKind::Question => "question",
            ActivityKind::Assignment => "assignment",
            ActivityKind::Conceptualization => "conceptualization",
            ActivityKind::Benchmark => "benchmark",
            ActivityKind::Survey => "survey",
            ActivityKind::Action => "action"
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KICKOFF_YAML: &str = r#"
name: "Team Kickoff"
required_profiles: 3
workshop_minutes: 90
activities:
  - id: warmup
    kind: question
    title: "What do you expect from today?"
    individual_minutes: 1
    group_minutes: 5
  - id: values
    kind: conceptualization
    activity_minutes: 15
"#;

    #[test]
    fn parses_workshop_yaml() {
        let workshop = WorkshopDefinition::from_yaml(KICKOFF_YAML).expect("valid yaml");

        assert_eq!(workshop.name, "Team Kickoff");
        assert_eq!(workshop.required_profiles, 3);
        assert_eq!(workshop.workshop_minutes, Some(90));
        assert_eq!(workshop.activities.len(), 2);

        let warmup = &workshop.activities[0];
        assert_eq!(warmup.id, "warmup");
        assert_eq!(warmup.kind, ActivityKind::Question);
        assert_eq!(warmup.individual_minutes, Some(1));
        assert_eq!(warmup.group_minutes, Some(5));
        assert_eq!(warmup.activity_minutes, None);

        let values = &workshop.activities[1];
        assert_eq!(values.kind, ActivityKind::Conceptualization);
        assert_eq!(values.activity_minutes, Some(15));
    }

    #[test]
    fn rejects_duplicate_activity_ids() {
        let yaml = r#"
name: "Broken"
required_profiles: 2
activities:
  - id: same
    kind: survey
  - id: same
    kind: theory
"#;
        let err = WorkshopDefinition::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("duplicate activity id"));
    }

    #[test]
    fn rejects_zero_required_profiles() {
        let yaml = r#"
name: "Empty"
required_profiles: 0
activities: []
"#;
        assert!(WorkshopDefinition::from_yaml(yaml).is_err());
    }
}
