//! Scheduler - deadline timers for the hosting worker
//!
//! The scheduler observes every transition of the worker's machine. It keeps
//! at most three armed timers: the workshop-level deadline (armed once, at
//! construction), an activity-scoped deadline and a phase-scoped deadline.
//! Whenever the tracked activity or phase changes, the stale timer is
//! aborted before a fresh one is armed, so a timer can never fire for a
//! phase the session already left. Timer messages still carry the id they
//! were armed for; the machine's timeout guard drops any late fire that
//! slipped through delivery.

use ractor::{ActorRef, MessagingErr};
use tokio::task::JoinHandle;
use tracing::{Level, event};

use crate::{
    actor::message::SessionWorkerMessage,
    domain::{compiler::CompiledWorkshop, constant::scheduler, state::{PhaseName, Snapshot}}
};

type TimerHandle = JoinHandle<Result<(), MessagingErr<SessionWorkerMessage>>>;

/// Timer state owned by one session worker.
pub struct SessionScheduler {
    workshop_timer:   Option<TimerHandle>,
    activity_timer:   Option<TimerHandle>,
    phase_timer:      Option<TimerHandle>,
    tracked_activity: Option<String>,
    tracked_phase:    Option<(String, PhaseName)>
}

impl SessionScheduler {
    /// Construct and, if the workshop has a deadline, arm it immediately.
    pub fn new(myself: &ActorRef<SessionWorkerMessage>, def: &CompiledWorkshop) -> Self {
        let workshop_timer = def.workshop_duration.map(|duration| {
            event!(Level::DEBUG, event = scheduler::WORKSHOP_TIMER_ARMED, seconds = duration.as_secs());
            myself.send_after(duration, || SessionWorkerMessage::WorkshopDeadline)
        });

        Self {
            workshop_timer,
            activity_timer: None,
            phase_timer: None,
            tracked_activity: None,
            tracked_phase: None
        }
    }

    /// Recompute the tracked activity/phase after a transition, clearing and
    /// re-arming timers where the position changed.
    pub fn observe(&mut self, myself: &ActorRef<SessionWorkerMessage>, def: &CompiledWorkshop, snapshot: &Snapshot) {
        if snapshot.value.is_terminal() {
            self.clear_all();
            return;
        }

        let active = snapshot.value.active_phase();
        let activity = active.map(|(id, _)| id.to_string());
        let phase = active.map(|(id, phase)| (id.to_string(), phase));

        if activity != self.tracked_activity {
            if let Some(timer) = self.activity_timer.take() {
                event!(Level::DEBUG, event = scheduler::TIMERS_CLEARED, scope = "activity");
                timer.abort();
            }

            if let Some(id) = &activity
                && let Some(duration) = def.stage(id).and_then(|s| s.duration)
            {
                event!(Level::DEBUG, event = scheduler::ACTIVITY_TIMER_ARMED,
                       activity_id = %id, seconds = duration.as_secs());
                let armed_for = id.clone();
                self.activity_timer = Some(
                    myself.send_after(duration, move || SessionWorkerMessage::ActivityDeadline {
                        activity_id: armed_for.clone()
                    })
                );
            }
            self.tracked_activity = activity;
        }

        if phase != self.tracked_phase {
            if let Some(timer) = self.phase_timer.take() {
                event!(Level::DEBUG, event = scheduler::TIMERS_CLEARED, scope = "phase");
                timer.abort();
            }

            if let Some((id, name)) = &phase
                && let Some(duration) = def.stage(id).and_then(|s| s.phase(*name)).and_then(|p| p.duration)
            {
                event!(Level::DEBUG, event = scheduler::PHASE_TIMER_ARMED,
                       activity_id = %id, phase = name.as_str(), seconds = duration.as_secs());
                let armed_id = id.clone();
                let armed_phase = *name;
                self.phase_timer = Some(myself.send_after(duration, move || SessionWorkerMessage::PhaseDeadline {
                    activity_id: armed_id.clone(),
                    phase:       armed_phase
                }));
            }
            self.tracked_phase = phase;
        }
    }

    /// Abort every armed timer (terminal stage, worker stop).
    pub fn clear_all(&mut self) {
        for timer in [self.workshop_timer.take(), self.activity_timer.take(), self.phase_timer.take()]
            .into_iter()
            .flatten()
        {
            timer.abort();
        }
        self.tracked_activity = None;
        self.tracked_phase = None;
    }
}
