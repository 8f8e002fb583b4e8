//! Inbound action surface
//!
//! Every way the outside world (or a timer) can poke a session, as delivered
//! through the messaging bridge. The serde representation is the wire format:
//! a `kind` tag plus the profile/activity/value fields relevant to that kind.

use serde::{Deserialize, Serialize};

/// A single inbound session action.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Action {
    /// A participant connected
    #[serde(rename_all = "camelCase")]
    Join { profile_id: String },
    /// A participant disconnected
    #[serde(rename_all = "camelCase")]
    Disconnect { profile_id: String },
    /// A participant signalled readiness to start while waiting
    #[serde(rename_all = "camelCase")]
    ReadyToStart { profile_id: String },
    /// A participant submitted (or overwrote) an answer for the current phase
    #[serde(rename_all = "camelCase")]
    SetValue { profile_id: String, activity_id: String, value: String },
    /// A participant marked their entry for the current phase as ready
    #[serde(rename_all = "camelCase")]
    SetReady { profile_id: String, activity_id: String },
    /// Close the whole activity, sentinel-filling every remaining phase
    #[serde(rename_all = "camelCase")]
    ActivityTimeout {
        activity_id: String,
        /// Bypass the configured-duration check (workshop deadline sweep)
        #[serde(default)]
        force:       bool
    },
    /// Close only the current phase of the activity
    #[serde(rename_all = "camelCase")]
    ActivityPartTimeout {
        activity_id: String,
        #[serde(default)]
        force:       bool
    }
}

impl Action {
    /// Action kind name, for logging
    pub fn name(&self) -> &'static str {
        match self {
            Action::Join { .. } => "join",
            Action::Disconnect { .. } => "disconnect",
            Action::ReadyToStart { .. } => "readyToStart",
            Action::SetValue { .. } => "setValue",
            Action::SetReady { .. } => "setReady",
            Action::ActivityTimeout { .. } => "activityTimeout",
            Action::ActivityPartTimeout { .. } => "activityPartTimeout"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_round_trip_through_the_wire_format() {
        let json = r#"{"kind":"setValue","profileId":"ada","activityId":"warmup","value":"ship it"}"#;
        let action: Action = serde_json::from_str(json).unwrap();
        assert_eq!(
            action,
            Action::SetValue { profile_id: "ada".into(), activity_id: "warmup".into(), value: "ship it".into() }
        );

        // force defaults to false when omitted
        let timeout: Action = serde_json::from_str(r#"{"kind":"activityTimeout","activityId":"warmup"}"#).unwrap();
        assert_eq!(timeout, Action::ActivityTimeout { activity_id: "warmup".into(), force: false });
    }
}
