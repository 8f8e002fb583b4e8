//! Session machine - the deterministic transition executor
//!
//! The nested state chart of the domain is flattened into an explicit tagged
//! [`StateValue`] plus one transition match on `(current value, action kind)`.
//! [`SessionMachine::send`] is a pure function: it never touches clocks, IO
//! or globals (the caller injects `now`), so replaying the same actions
//! against the same snapshot reproduces the same result - the property crash
//! recovery leans on.
//!
//! Guard rejection is not an error: an action that does not apply to the
//! current stage/phase returns the input snapshot unchanged, which makes
//! duplicate, late and out-of-order deliveries idempotent no-ops.

use chrono::{DateTime, Utc};

use crate::domain::{
    action::Action,
    compiler::{CompiledWorkshop, PhaseDef},
    state::{NO_ANSWER, PhaseName, SessionContext, Snapshot, StateValue}
};

/// Holds the compiled stage chain and executes transitions against it.
#[derive(Debug, Clone)]
pub struct SessionMachine {
    def: CompiledWorkshop
}

impl SessionMachine {
    pub fn new(def: CompiledWorkshop) -> Self {
        Self { def }
    }

    pub fn definition(&self) -> &CompiledWorkshop {
        &self.def
    }

    /// Fresh snapshot at the `waiting` stage.
    pub fn initial(&self, required_active_profile_count: usize, now: DateTime<Utc>) -> Snapshot {
        Snapshot { value: StateValue::Waiting, context: SessionContext::new(required_active_profile_count, now) }
    }

    /// Apply one action. Returns the successor snapshot; a guard-rejected
    /// action returns a snapshot identical to the input.
    pub fn send(&self, snapshot: &Snapshot, action: &Action, now: DateTime<Utc>) -> Snapshot {
        match self.apply(snapshot, action) {
            Some((value, mut context)) => {
                context.last_updated = now;
                Snapshot { value, context }
            }
            None => snapshot.clone()
        }
    }

    fn apply(&self, snapshot: &Snapshot, action: &Action) -> Option<(StateValue, SessionContext)> {
        let mut context = snapshot.context.clone();

        match (&snapshot.value, action) {
            // the terminal stage accepts nothing
            (StateValue::ViewResults, _) => None,

            (_, Action::Join { profile_id }) => {
                context.current_active_profiles.insert(profile_id.clone());
                Some((snapshot.value.clone(), context))
            }

            (_, Action::Disconnect { profile_id }) => {
                context.current_active_profiles.remove(profile_id);
                context.ready_active_profiles.remove(profile_id);
                Some((snapshot.value.clone(), context))
            }

            (StateValue::Waiting, Action::ReadyToStart { profile_id }) => {
                if !context.current_active_profiles.contains(profile_id) {
                    return None;
                }
                context.ready_active_profiles.insert(profile_id.clone());
                if self.is_ready_to_start(&context) {
                    Some((self.first_value(), context))
                } else {
                    Some((StateValue::Waiting, context))
                }
            }

            // the workshop deadline elapsed before the session ever started;
            // the forced sweep ends it with an empty result map
            (StateValue::Waiting, Action::ActivityTimeout { force: true, .. }) => {
                Some((StateValue::ViewResults, context))
            }

            (
                StateValue::Activity { activity_id, phase },
                Action::SetValue { profile_id, activity_id: target, value }
            ) => {
                let phase_def = self.guard_current_phase(activity_id, *phase, target)?;
                if !phase_def.collects_value || !context.current_active_profiles.contains(profile_id) {
                    return None;
                }

                if phase_def.one_value {
                    // shared value: whichever profile submits last overwrites all
                    for profile in context.current_active_profiles.clone() {
                        context.upsert_entry(activity_id, *phase, &profile, |e| e.value = Some(value.clone()));
                    }
                } else {
                    context.upsert_entry(activity_id, *phase, profile_id, |e| e.value = Some(value.clone()));
                }
                Some((snapshot.value.clone(), context))
            }

            (StateValue::Activity { activity_id, phase }, Action::SetReady { profile_id, activity_id: target }) => {
                self.guard_current_phase(activity_id, *phase, target)?;
                if !context.current_active_profiles.contains(profile_id) {
                    return None;
                }

                // unanimous once every *other* active profile is already ready
                let unanimous = self.is_ready_for_next_step(&context, activity_id, *phase, profile_id);
                context.upsert_entry(activity_id, *phase, profile_id, |e| e.ready = true);

                if unanimous {
                    Some((self.successor(activity_id, *phase), context))
                } else {
                    Some((snapshot.value.clone(), context))
                }
            }

            (StateValue::Activity { activity_id, phase }, Action::ActivityTimeout { activity_id: target, force }) => {
                let stage = self.def.stage(activity_id)?;
                if target != activity_id || !(*force || stage.duration.is_some()) {
                    return None;
                }

                let from = stage.phase_index(*phase)?;
                for phase_def in &stage.phases[from..] {
                    Self::close_phase(&mut context, activity_id, phase_def);
                }
                Some((self.enter_next_stage(activity_id), context))
            }

            (
                StateValue::Activity { activity_id, phase },
                Action::ActivityPartTimeout { activity_id: target, force }
            ) => {
                let phase_def = self.guard_current_phase(activity_id, *phase, target)?;
                if !(*force || phase_def.duration.is_some()) {
                    return None;
                }

                let phase_def = phase_def.clone();
                Self::close_phase(&mut context, activity_id, &phase_def);
                Some((self.successor(activity_id, *phase), context))
            }

            // readyToStart outside waiting, unforced activity actions while waiting
            _ => None
        }
    }

    /// `isReadyToStart`: the incoming ready pushed the set to the required
    /// participant count.
    fn is_ready_to_start(&self, context: &SessionContext) -> bool {
        context.ready_active_profiles.len() >= context.required_active_profile_count
    }

    /// `isReadyToForNextStep`: every other currently active profile already
    /// has a ready entry for the present phase, so the incoming ready makes
    /// it unanimous.
    fn is_ready_for_next_step(
        &self,
        context: &SessionContext,
        activity_id: &str,
        phase: PhaseName,
        incoming: &str
    ) -> bool {
        context
            .current_active_profiles
            .iter()
            .filter(|p| p.as_str() != incoming)
            .all(|p| context.is_profile_ready(activity_id, phase, p))
    }

    /// Phase definition, provided the action targets the current activity.
    fn guard_current_phase(&self, current: &str, phase: PhaseName, target: &str) -> Option<&PhaseDef> {
        if target != current {
            return None;
        }
        self.def.stage(current)?.phase(phase)
    }

    /// Forced close: every active profile without a value gets the sentinel,
    /// every entry in the phase is marked ready.
    fn close_phase(context: &mut SessionContext, activity_id: &str, phase_def: &PhaseDef) {
        for profile in context.current_active_profiles.clone() {
            context.upsert_entry(activity_id, phase_def.name, &profile, |e| {
                if phase_def.collects_value && e.value.is_none() {
                    e.value = Some(NO_ANSWER.to_string());
                }
                e.ready = true;
            });
        }
    }

    /// First phase of the first stage - where `waiting` advances to.
    fn first_value(&self) -> StateValue {
        match self.def.first_stage() {
            Some(stage) => StateValue::Activity {
                activity_id: stage.activity_id.clone(),
                phase:       stage.phases[0].name
            },
            // an empty chain degenerates straight to the terminal stage
            None => StateValue::ViewResults
        }
    }

    /// Next phase within the stage, or the next stage's first phase, or the
    /// terminal stage when the chain is exhausted.
    fn successor(&self, activity_id: &str, phase: PhaseName) -> StateValue {
        if let Some(stage) = self.def.stage(activity_id)
            && let Some(index) = stage.phase_index(phase)
            && let Some(next) = stage.phases.get(index + 1)
        {
            return StateValue::Activity { activity_id: activity_id.to_string(), phase: next.name };
        }
        self.enter_next_stage(activity_id)
    }

    fn enter_next_stage(&self, activity_id: &str) -> StateValue {
        match self.def.next_stage(activity_id) {
            Some(stage) => StateValue::Activity {
                activity_id: stage.activity_id.clone(),
                phase:       stage.phases[0].name
            },
            None => StateValue::ViewResults
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::domain::{
        compiler::{END_EMOTION, START_EMOTION, TEAM_NAME, compile},
        state::ResultEntry,
        workshop::{Activity, ActivityKind, WorkshopDefinition}
    };

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap()
    }

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

    /// startEmotion -> teamName -> warmup(question) -> endEmotion
    fn machine() -> SessionMachine {
        let mut warmup = activity("warmup", ActivityKind::Question);
        warmup.individual_minutes = Some(1);
        warmup.activity_minutes = Some(10);

        let definition = WorkshopDefinition {
            name:              "test".into(),
            required_profiles: 3,
            workshop_minutes:  None,
            activities:        vec![warmup]
        };
        SessionMachine::new(compile(&definition))
    }

    fn join(machine: &SessionMachine, snapshot: Snapshot, profiles: &[&str]) -> Snapshot {
        profiles.iter().fold(snapshot, |s, p| {
            machine.send(&s, &Action::Join { profile_id: p.to_string() }, now())
        })
    }

    /// Join and ready all three participants, landing on startEmotion
    fn started(machine: &SessionMachine) -> Snapshot {
        let snapshot = join(machine, machine.initial(3, now()), &["ada", "lin", "tux"]);
        ["ada", "lin", "tux"].iter().fold(snapshot, |s, p| {
            machine.send(&s, &Action::ReadyToStart { profile_id: p.to_string() }, now())
        })
    }

    /// Drive the session from startEmotion to the warmup individual phase
    fn at_warmup(machine: &SessionMachine) -> Snapshot {
        let mut snapshot = started(machine);
        // close startEmotion and teamName by unanimous ready
        for step in [START_EMOTION, TEAM_NAME] {
            for p in ["ada", "lin", "tux"] {
                snapshot = machine.send(
                    &snapshot,
                    &Action::SetReady { profile_id: p.to_string(), activity_id: step.to_string() },
                    now()
                );
            }
        }
        assert_eq!(snapshot.value, StateValue::Activity {
            activity_id: "warmup".into(),
            phase:       PhaseName::Individual
        });
        snapshot
    }

    fn entries<'a>(snapshot: &'a Snapshot, activity: &str, phase: PhaseName) -> &'a [ResultEntry] {
        snapshot.context.phase_entries(activity, phase)
    }

    #[test]
    fn scenario_a_three_ready_participants_leave_waiting() {
        let machine = machine();
        let snapshot = started(&machine);

        assert_eq!(snapshot.value, StateValue::Activity {
            activity_id: START_EMOTION.into(),
            phase:       PhaseName::Individual
        });
        assert_eq!(snapshot.context.ready_active_profiles.len(), 3);
    }

    #[test]
    fn waiting_is_left_exactly_once() {
        let machine = machine();
        let mut snapshot = join(&machine, machine.initial(3, now()), &["ada", "lin", "tux"]);

        snapshot = machine.send(&snapshot, &Action::ReadyToStart { profile_id: "ada".into() }, now());
        assert_eq!(snapshot.value, StateValue::Waiting);
        snapshot = machine.send(&snapshot, &Action::ReadyToStart { profile_id: "lin".into() }, now());
        assert_eq!(snapshot.value, StateValue::Waiting);
        snapshot = machine.send(&snapshot, &Action::ReadyToStart { profile_id: "tux".into() }, now());
        let started_value = snapshot.value.clone();
        assert_ne!(started_value, StateValue::Waiting);

        // a straggling readyToStart no longer moves the stage
        let after = machine.send(&snapshot, &Action::ReadyToStart { profile_id: "ada".into() }, now());
        assert_eq!(after.value, started_value);
    }

    #[test]
    fn ready_to_start_requires_a_joined_profile() {
        let machine = machine();
        let snapshot = machine.initial(3, now());

        let after = machine.send(&snapshot, &Action::ReadyToStart { profile_id: "ghost".into() }, now());
        assert_eq!(after, snapshot);
    }

    #[test]
    fn individual_advances_to_group_on_the_nth_ready() {
        let machine = machine();
        let mut snapshot = at_warmup(&machine);

        for p in ["ada", "lin"] {
            snapshot = machine.send(
                &snapshot,
                &Action::SetReady { profile_id: p.to_string(), activity_id: "warmup".into() },
                now()
            );
            assert_eq!(snapshot.value, StateValue::Activity {
                activity_id: "warmup".into(),
                phase:       PhaseName::Individual
            });
        }

        snapshot = machine.send(
            &snapshot,
            &Action::SetReady { profile_id: "tux".into(), activity_id: "warmup".into() },
            now()
        );
        assert_eq!(snapshot.value, StateValue::Activity { activity_id: "warmup".into(), phase: PhaseName::Group });
    }

    #[test]
    fn set_value_records_and_overwrites_one_entry() {
        let machine = machine();
        let mut snapshot = at_warmup(&machine);

        for value in ["draft", "final"] {
            snapshot = machine.send(
                &snapshot,
                &Action::SetValue { profile_id: "ada".into(), activity_id: "warmup".into(), value: value.into() },
                now()
            );
        }

        let recorded = entries(&snapshot, "warmup", PhaseName::Individual);
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].value.as_deref(), Some("final"));
        assert!(!recorded[0].ready);
    }

    #[test]
    fn one_value_phase_overwrites_every_participant() {
        let machine = machine();
        let mut snapshot = started(&machine);
        // close startEmotion, landing on teamName (group-only-one-value)
        for p in ["ada", "lin", "tux"] {
            snapshot = machine.send(
                &snapshot,
                &Action::SetReady { profile_id: p.to_string(), activity_id: START_EMOTION.into() },
                now()
            );
        }
        assert_eq!(snapshot.value, StateValue::Activity { activity_id: TEAM_NAME.into(), phase: PhaseName::Group });

        snapshot = machine.send(
            &snapshot,
            &Action::SetValue { profile_id: "ada".into(), activity_id: TEAM_NAME.into(), value: "ferris".into() },
            now()
        );
        snapshot = machine.send(
            &snapshot,
            &Action::SetValue { profile_id: "lin".into(), activity_id: TEAM_NAME.into(), value: "crabs".into() },
            now()
        );

        let recorded = entries(&snapshot, TEAM_NAME, PhaseName::Group);
        assert_eq!(recorded.len(), 3);
        assert!(recorded.iter().all(|e| e.value.as_deref() == Some("crabs")));
    }

    #[test]
    fn forced_timeout_sentinel_fills_and_advances_to_next_stage() {
        let machine = machine();
        let mut snapshot = at_warmup(&machine);

        snapshot = machine.send(
            &snapshot,
            &Action::SetValue { profile_id: "ada".into(), activity_id: "warmup".into(), value: "answered".into() },
            now()
        );
        snapshot = machine.send(
            &snapshot,
            &Action::ActivityTimeout { activity_id: "warmup".into(), force: true },
            now()
        );

        // whole activity closed: straight to the next stage
        assert_eq!(snapshot.value, StateValue::Activity {
            activity_id: END_EMOTION.into(),
            phase:       PhaseName::Individual
        });

        // individual phase: ada keeps her answer, the silent two get the sentinel
        let individual = entries(&snapshot, "warmup", PhaseName::Individual);
        assert_eq!(individual.len(), 3);
        assert!(individual.iter().all(|e| e.ready));
        assert_eq!(
            individual.iter().find(|e| e.profile_id == "ada").unwrap().value.as_deref(),
            Some("answered")
        );
        assert_eq!(individual.iter().filter(|e| e.value.as_deref() == Some(NO_ANSWER)).count(), 2);

        // the never-entered group phase was sentinel-filled too
        let group = entries(&snapshot, "warmup", PhaseName::Group);
        assert_eq!(group.len(), 3);
        assert!(group.iter().all(|e| e.ready && e.value.as_deref() == Some(NO_ANSWER)));
    }

    #[test]
    fn scenario_c_part_timeout_fills_only_the_current_phase() {
        let machine = machine();
        let mut snapshot = at_warmup(&machine);

        for p in ["ada", "lin"] {
            snapshot = machine.send(
                &snapshot,
                &Action::SetValue { profile_id: p.to_string(), activity_id: "warmup".into(), value: "done".into() },
                now()
            );
            snapshot = machine.send(
                &snapshot,
                &Action::SetReady { profile_id: p.to_string(), activity_id: "warmup".into() },
                now()
            );
        }

        // individual_minutes is configured, so the unforced part timeout passes its guard
        snapshot = machine.send(
            &snapshot,
            &Action::ActivityPartTimeout { activity_id: "warmup".into(), force: false },
            now()
        );

        assert_eq!(snapshot.value, StateValue::Activity { activity_id: "warmup".into(), phase: PhaseName::Group });

        let individual = entries(&snapshot, "warmup", PhaseName::Individual);
        assert_eq!(individual.iter().find(|e| e.profile_id == "tux").unwrap().value.as_deref(), Some(NO_ANSWER));
        assert!(individual.iter().all(|e| e.ready));
        // group phase untouched by a part timeout
        assert!(entries(&snapshot, "warmup", PhaseName::Group).is_empty());
    }

    #[test]
    fn scenario_d_set_value_for_a_non_current_activity_is_identical() {
        let machine = machine();
        let snapshot = at_warmup(&machine);

        let after = machine.send(
            &snapshot,
            &Action::SetValue { profile_id: "ada".into(), activity_id: "somewhere-else".into(), value: "x".into() },
            Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
        );

        // bit-identical, including the untouched last_updated timestamp
        assert_eq!(after, snapshot);
    }

    #[test]
    fn unforced_timeout_without_configured_duration_is_rejected() {
        let machine = machine();
        let snapshot = started(&machine);

        // startEmotion has no deadline configured
        let after = machine.send(
            &snapshot,
            &Action::ActivityTimeout { activity_id: START_EMOTION.into(), force: false },
            now()
        );
        assert_eq!(after, snapshot);

        let forced = machine.send(
            &snapshot,
            &Action::ActivityTimeout { activity_id: START_EMOTION.into(), force: true },
            now()
        );
        assert_ne!(forced.value, snapshot.value);
    }

    #[test]
    fn forced_timeout_while_waiting_ends_the_session() {
        let machine = machine();
        let snapshot = join(&machine, machine.initial(3, now()), &["ada"]);

        // only the privileged sweep may close a session that never started
        let unforced =
            machine.send(&snapshot, &Action::ActivityTimeout { activity_id: "warmup".into(), force: false }, now());
        assert_eq!(unforced, snapshot);

        let swept =
            machine.send(&snapshot, &Action::ActivityTimeout { activity_id: "warmup".into(), force: true }, now());
        assert_eq!(swept.value, StateValue::ViewResults);
        assert!(swept.context.activity_result.is_empty());
    }

    #[test]
    fn ready_only_phase_rejects_values_but_advances_on_ready() {
        let definition = WorkshopDefinition {
            name:              "theory".into(),
            required_profiles: 1,
            workshop_minutes:  None,
            activities:        vec![activity("reading", ActivityKind::Theory)]
        };
        let machine = SessionMachine::new(compile(&definition));

        let mut snapshot = join(&machine, machine.initial(1, now()), &["ada"]);
        snapshot = machine.send(&snapshot, &Action::ReadyToStart { profile_id: "ada".into() }, now());
        snapshot = machine.send(
            &snapshot,
            &Action::SetReady { profile_id: "ada".into(), activity_id: START_EMOTION.into() },
            now()
        );
        snapshot = machine.send(
            &snapshot,
            &Action::SetReady { profile_id: "ada".into(), activity_id: TEAM_NAME.into() },
            now()
        );
        assert_eq!(snapshot.value, StateValue::Activity {
            activity_id: "reading".into(),
            phase:       PhaseName::Individual
        });

        let rejected = machine.send(
            &snapshot,
            &Action::SetValue { profile_id: "ada".into(), activity_id: "reading".into(), value: "notes".into() },
            now()
        );
        assert_eq!(rejected, snapshot);

        snapshot = machine.send(
            &snapshot,
            &Action::SetReady { profile_id: "ada".into(), activity_id: "reading".into() },
            now()
        );
        assert_eq!(snapshot.value, StateValue::Activity {
            activity_id: END_EMOTION.into(),
            phase:       PhaseName::Individual
        });
    }

    #[test]
    fn disconnect_removes_profile_from_both_sets() {
        let machine = machine();
        let mut snapshot = join(&machine, machine.initial(3, now()), &["ada", "lin"]);
        snapshot = machine.send(&snapshot, &Action::ReadyToStart { profile_id: "ada".into() }, now());

        snapshot = machine.send(&snapshot, &Action::Disconnect { profile_id: "ada".into() }, now());
        assert!(!snapshot.context.current_active_profiles.contains("ada"));
        assert!(!snapshot.context.ready_active_profiles.contains("ada"));
    }

    #[test]
    fn disconnected_profiles_do_not_block_phase_advance() {
        let machine = machine();
        let mut snapshot = at_warmup(&machine);

        snapshot = machine.send(&snapshot, &Action::Disconnect { profile_id: "tux".into() }, now());
        for p in ["ada", "lin"] {
            snapshot = machine.send(
                &snapshot,
                &Action::SetReady { profile_id: p.to_string(), activity_id: "warmup".into() },
                now()
            );
        }

        assert_eq!(snapshot.value, StateValue::Activity { activity_id: "warmup".into(), phase: PhaseName::Group });
    }

    #[test]
    fn terminal_stage_ignores_every_action() {
        let machine = machine();
        let mut snapshot = at_warmup(&machine);
        snapshot.value = StateValue::ViewResults;

        for action in [
            Action::Join { profile_id: "new".into() },
            Action::ReadyToStart { profile_id: "ada".into() },
            Action::ActivityTimeout { activity_id: "warmup".into(), force: true },
        ] {
            let after = machine.send(&snapshot, &action, now());
            assert_eq!(after, snapshot);
        }
    }

    #[test]
    fn replay_reproduces_the_same_snapshot() {
        let machine = machine();
        let actions = vec![
            Action::Join { profile_id: "ada".into() },
            Action::Join { profile_id: "lin".into() },
            Action::Join { profile_id: "tux".into() },
            Action::ReadyToStart { profile_id: "ada".into() },
            Action::ReadyToStart { profile_id: "lin".into() },
            Action::ReadyToStart { profile_id: "tux".into() },
            Action::SetValue { profile_id: "ada".into(), activity_id: START_EMOTION.into(), value: "curious".into() },
            Action::ActivityTimeout { activity_id: START_EMOTION.into(), force: true },
            Action::SetValue { profile_id: "lin".into(), activity_id: TEAM_NAME.into(), value: "crabs".into() },
        ];

        let replay = || {
            actions
                .iter()
                .enumerate()
                .fold(machine.initial(3, now()), |snapshot, (tick, action)| {
                    let at = now() + chrono::Duration::seconds(tick as i64);
                    machine.send(&snapshot, action, at)
                })
        };

        let first = replay();
        let second = replay();
        assert_eq!(first, second);
        assert_eq!(serde_json::to_string(&first).unwrap(), serde_json::to_string(&second).unwrap());
    }

    #[test]
    fn whole_chain_reaches_view_results() {
        let machine = machine();
        let mut snapshot = at_warmup(&machine);

        for step in ["warmup", "warmup", END_EMOTION] {
            for p in ["ada", "lin", "tux"] {
                snapshot = machine.send(
                    &snapshot,
                    &Action::SetReady { profile_id: p.to_string(), activity_id: step.to_string() },
                    now()
                );
            }
        }

        assert_eq!(snapshot.value, StateValue::ViewResults);
        assert!(snapshot.value.is_terminal());
    }
}
