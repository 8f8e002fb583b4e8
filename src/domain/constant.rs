//! Domain Events - Structured events for internal monitoring and debugging

/// Guardian Actor Events
pub mod guardian {
    pub const GUARDIAN_STARTED: &str = "guardian.started";
    pub const CHILDREN_SPAWNING: &str = "children.spawning";
    pub const CHILDREN_SPAWNED: &str = "children.spawned";
    pub const CHILDREN_SPAWN_FAILED: &str = "children.spawn_failed";
    pub const SYSTEM_INITIALIZED: &str = "system.initialized";
    pub const SYSTEM_SHUTDOWN_STARTED: &str = "system.shutdown_started";
    pub const SYSTEM_SHUTDOWN_COMPLETED: &str = "system.shutdown_completed";
    pub const HEALTH_CHECK_COMPLETED: &str = "health.check_completed";
    pub const INITIALIZE_FAILED: &str = "system.initialize_failed";
    pub const REPLY_FAILED: &str = "reply.failed";
}

/// SessionSupervisor Actor Events
pub mod supervisor {
    pub const SUPERVISOR_STARTED: &str = "supervisor.started";
    pub const WORKER_SPAWNED: &str = "worker.spawned";
    pub const WORKER_SPAWN_FAILED: &str = "worker.spawn_failed";
    pub const WORKER_REUSED: &str = "worker.reused";
    pub const WORKER_FAILED: &str = "worker.failed";
    pub const WORKER_TERMINATED: &str = "worker.terminated";
    pub const ACTION_ROUTED: &str = "action.routed";
    pub const SESSION_COMPLETED: &str = "session.completed";
    pub const REPLY_FAILED: &str = "reply.failed";
}

/// SessionWorker Actor Events
pub mod worker {
    pub const WORKER_STARTED: &str = "worker.started";
    pub const SNAPSHOT_RESTORED: &str = "snapshot.restored";
    pub const SNAPSHOT_FRESH: &str = "snapshot.fresh";
    pub const ACTION_RECEIVED: &str = "action.received";
    pub const ACTION_APPLIED: &str = "action.applied";
    pub const ACTION_FAILED: &str = "action.failed";
    pub const FLUSH_SCHEDULED: &str = "flush.scheduled";
    pub const SNAPSHOT_FLUSHED: &str = "snapshot.flushed";
    pub const SNAPSHOT_FLUSH_FAILED: &str = "snapshot.flush_failed";
    pub const TERMINAL_REACHED: &str = "terminal.reached";
}

/// Scheduler Events
pub mod scheduler {
    pub const WORKSHOP_TIMER_ARMED: &str = "timer.workshop_armed";
    pub const ACTIVITY_TIMER_ARMED: &str = "timer.activity_armed";
    pub const PHASE_TIMER_ARMED: &str = "timer.phase_armed";
    pub const TIMERS_CLEARED: &str = "timer.cleared";
    pub const WORKSHOP_DEADLINE_FIRED: &str = "timer.workshop_fired";
    pub const TIMEOUT_FIRED: &str = "timer.timeout_fired";
    pub const STALE_DEADLINE_DROPPED: &str = "timer.stale_dropped";
}

/// Snapshot Store Events
pub mod store {
    pub const STORE_OPENED: &str = "store.opened";
    pub const SNAPSHOT_SAVED: &str = "store.snapshot_saved";
    pub const SNAPSHOT_LOADED: &str = "store.snapshot_loaded";
    pub const SNAPSHOT_MISSING: &str = "store.snapshot_missing";
}
