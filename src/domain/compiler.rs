//! Definition Compiler
//!
//! Turns a [`WorkshopDefinition`] into the flat, executable form the machine
//! walks: a chain of stages, each expanded from one of seven phase-pattern
//! templates, with durations attached where the definition configures them.
//!
//! The compiler injects the two boundary pseudo-activities (`startEmotion`,
//! `endEmotion`) and the `teamName` step, so the compiled chain is always
//! `waiting -> startEmotion -> teamName -> activity1 .. activityN ->
//! endEmotion -> viewResults`.

use std::time::Duration;

use crate::domain::{
    state::PhaseName,
    workshop::{Activity, ActivityKind, WorkshopDefinition}
};

/// Id of the opening emotion check injected before the first activity
pub const START_EMOTION: &str = "startEmotion";
/// Id of the team naming step injected after the opening emotion check
pub const TEAM_NAME: &str = "teamName";
/// Id of the closing emotion check injected after the last activity
pub const END_EMOTION: &str = "endEmotion";

/// The seven phase-pattern templates an activity kind can expand to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhasePattern {
    IndividualOnly,
    /// Readiness with no value (reading material)
    IndividualReadyOnly,
    GroupOnly,
    /// A single shared value, overwritten by whichever profile submits last
    GroupOnlyOneValue,
    IndividualThenGroup,
    IndividualThenGroupOneValue,
    IndividualGroupThenReview
}

impl From<ActivityKind> for PhasePattern {
    fn from(kind: ActivityKind) -> Self {
        match kind {
            ActivityKind::Theory => PhasePattern::IndividualReadyOnly,
            ActivityKind::Question => PhasePattern::IndividualThenGroup,
            ActivityKind::Assignment | ActivityKind::Survey => PhasePattern::IndividualOnly,
            ActivityKind::Conceptualization => PhasePattern::IndividualThenGroupOneValue,
            ActivityKind::Benchmark => PhasePattern::IndividualGroupThenReview,
            ActivityKind::Action => PhasePattern::GroupOnlyOneValue
        }
    }
}

/// One compiled phase of an activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseDef {
    pub name:           PhaseName,
    /// Whether `setValue` is accepted in this phase
    pub collects_value: bool,
    /// Whether one submitted value overwrites every participant's entry
    pub one_value:      bool,
    /// Deadline after which the scheduler forces the phase closed
    pub duration:       Option<Duration>
}

/// One compiled stage of the chain (a real activity or an injected step).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityStage {
    pub activity_id: String,
    /// Deadline for the whole activity, independent of per-phase deadlines
    pub duration:    Option<Duration>,
    pub phases:      Vec<PhaseDef>
}

impl ActivityStage {
    pub fn phase(&self, name: PhaseName) -> Option<&PhaseDef> {
        self.phases.iter().find(|p| p.name == name)
    }

    /// Index of a phase within this stage
    pub fn phase_index(&self, name: PhaseName) -> Option<usize> {
        self.phases.iter().position(|p| p.name == name)
    }
}

/// The executable workshop: the ordered stage chain plus the optional
/// workshop-level deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledWorkshop {
    pub stages:            Vec<ActivityStage>,
    pub workshop_duration: Option<Duration>
}

impl CompiledWorkshop {
    pub fn stage(&self, activity_id: &str) -> Option<&ActivityStage> {
        self.stages.iter().find(|s| s.activity_id == activity_id)
    }

    pub fn stage_index(&self, activity_id: &str) -> Option<usize> {
        self.stages.iter().position(|s| s.activity_id == activity_id)
    }

    pub fn first_stage(&self) -> Option<&ActivityStage> {
        self.stages.first()
    }

    /// The stage after the given one, or `None` when the chain is exhausted
    /// (the successor is then the terminal `viewResults` stage)
    pub fn next_stage(&self, activity_id: &str) -> Option<&ActivityStage> {
        let index = self.stage_index(activity_id)?;
        self.stages.get(index + 1)
    }
}

fn minutes(value: Option<u64>) -> Option<Duration> {
    value.map(|m| Duration::from_secs(m * 60))
}

fn phase(name: PhaseName, collects_value: bool, one_value: bool, duration: Option<Duration>) -> PhaseDef {
    PhaseDef { name, collects_value, one_value, duration }
}

/// Expand one activity into its compiled stage.
fn compile_activity(activity: &Activity) -> ActivityStage {
    let individual = minutes(activity.individual_minutes);
    let group = minutes(activity.group_minutes);
    let review = minutes(activity.review_minutes);

    let phases = match PhasePattern::from(activity.kind) {
        PhasePattern::IndividualOnly => vec![phase(PhaseName::Individual, true, false, individual)],
        PhasePattern::IndividualReadyOnly => vec![phase(PhaseName::Individual, false, false, individual)],
        PhasePattern::GroupOnly => vec![phase(PhaseName::Group, true, false, group)],
        PhasePattern::GroupOnlyOneValue => vec![phase(PhaseName::Group, true, true, group)],
        PhasePattern::IndividualThenGroup => {
            vec![phase(PhaseName::Individual, true, false, individual), phase(PhaseName::Group, true, false, group)]
        }
        PhasePattern::IndividualThenGroupOneValue => {
            vec![phase(PhaseName::Individual, true, false, individual), phase(PhaseName::Group, true, true, group)]
        }
        PhasePattern::IndividualGroupThenReview => vec![
            phase(PhaseName::Individual, true, false, individual),
            phase(PhaseName::Group, true, false, group),
            phase(PhaseName::Review, false, false, review)
        ]
    };

    ActivityStage { activity_id: activity.id.clone(), duration: minutes(activity.activity_minutes), phases }
}

/// A boundary step with a fixed pattern and no deadline of its own.
fn boundary_stage(activity_id: &str, pattern: PhasePattern) -> ActivityStage {
    let phases = match pattern {
        PhasePattern::IndividualOnly => vec![phase(PhaseName::Individual, true, false, None)],
        PhasePattern::GroupOnlyOneValue => vec![phase(PhaseName::Group, true, true, None)],
        _ => unreachable!("boundary steps only use individual-only and group-only-one-value")
    };
    ActivityStage { activity_id: activity_id.to_string(), duration: None, phases }
}

/// Compile a workshop definition into the executable stage chain.
pub fn compile(definition: &WorkshopDefinition) -> CompiledWorkshop {
    let mut stages = Vec::with_capacity(definition.activities.len() + 3);

    stages.push(boundary_stage(START_EMOTION, PhasePattern::IndividualOnly));
    stages.push(boundary_stage(TEAM_NAME, PhasePattern::GroupOnlyOneValue));
    stages.extend(definition.activities.iter().map(compile_activity));
    stages.push(boundary_stage(END_EMOTION, PhasePattern::IndividualOnly));

    CompiledWorkshop { stages, workshop_duration: minutes(definition.workshop_minutes) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn activity(id: &str, kind: ActivityKind) -> Activity {
        Activity {
            id: id.to_string(),
            kind,
            title: None,
            activity_minutes: None,
            individual_minutes: None,
            group_minutes: None,
            review_minutes: None
        }
    }

    fn definition(activities: Vec<Activity>) -> WorkshopDefinition {
        WorkshopDefinition { name: "test".into(), required_profiles: 3, workshop_minutes: None, activities }
    }

    #[test]
    fn chains_boundary_steps_around_activities() {
        let compiled = compile(&definition(vec![
            activity("warmup", ActivityKind::Question),
            activity("poll", ActivityKind::Survey),
        ]));

        let ids: Vec<&str> = compiled.stages.iter().map(|s| s.activity_id.as_str()).collect();
        assert_eq!(ids, vec![START_EMOTION, TEAM_NAME, "warmup", "poll", END_EMOTION]);

        // last activity's successor is the end of the chain
        assert_eq!(compiled.next_stage(END_EMOTION), None);
        assert_eq!(compiled.next_stage("warmup").unwrap().activity_id, "poll");
    }

    #[test]
    fn expands_each_kind_to_its_template() {
        let compiled = compile(&definition(vec![
            activity("t", ActivityKind::Theory),
            activity("q", ActivityKind::Question),
            activity("a", ActivityKind::Assignment),
            activity("c", ActivityKind::Conceptualization),
            activity("b", ActivityKind::Benchmark),
            activity("s", ActivityKind::Survey),
            activity("x", ActivityKind::Action),
        ]));

        let phases = |id: &str| -> Vec<(PhaseName, bool, bool)> {
            compiled.stage(id).unwrap().phases.iter().map(|p| (p.name, p.collects_value, p.one_value)).collect()
        };

        assert_eq!(phases("t"), vec![(PhaseName::Individual, false, false)]);
        assert_eq!(phases("q"), vec![(PhaseName::Individual, true, false), (PhaseName::Group, true, false)]);
        assert_eq!(phases("a"), vec![(PhaseName::Individual, true, false)]);
        assert_eq!(phases("c"), vec![(PhaseName::Individual, true, false), (PhaseName::Group, true, true)]);
        assert_eq!(phases("b"), vec![
            (PhaseName::Individual, true, false),
            (PhaseName::Group, true, false),
            (PhaseName::Review, false, false)
        ]);
        assert_eq!(phases("s"), vec![(PhaseName::Individual, true, false)]);
        assert_eq!(phases("x"), vec![(PhaseName::Group, true, true)]);
    }

    #[test]
    fn attaches_durations_from_minute_fields() {
        let mut question = activity("warmup", ActivityKind::Question);
        question.individual_minutes = Some(1);
        question.group_minutes = Some(5);
        question.activity_minutes = Some(10);

        let mut def = definition(vec![question]);
        def.workshop_minutes = Some(90);

        let compiled = compile(&def);
        assert_eq!(compiled.workshop_duration, Some(Duration::from_secs(90 * 60)));

        let stage = compiled.stage("warmup").unwrap();
        assert_eq!(stage.duration, Some(Duration::from_secs(600)));
        assert_eq!(stage.phase(PhaseName::Individual).unwrap().duration, Some(Duration::from_secs(60)));
        assert_eq!(stage.phase(PhaseName::Group).unwrap().duration, Some(Duration::from_secs(300)));

        // boundary steps never carry a deadline
        assert_eq!(compiled.stage(START_EMOTION).unwrap().duration, None);
        assert_eq!(compiled.stage(START_EMOTION).unwrap().phases[0].duration, None);
    }
}
