use std::collections::BTreeSet;

use callsession_telecom::{CallDirection, CallId, CallState, Capabilities};

/// Caller-facing details of a call, as the subsystem reports them on
/// `DetailsChanged`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallDetails {
    pub direction: CallDirection,
    pub capabilities: Capabilities,
    /// Milliseconds since the Unix epoch.
    pub creation_time: i64,
    /// Milliseconds since the Unix epoch, zero until the call is connected.
    pub connect_time: i64,
    pub remote_handle: Option<String>,
    pub caller_display_name: Option<String>,
}

/// Snapshot of one ongoing call leg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    pub id: CallId,
    pub direction: CallDirection,
    pub state: CallState,
    pub capabilities: Capabilities,
    // Calls this leg may be merged with, as reported for this leg only.
    pub conferenceable: BTreeSet<CallId>,
    pub creation_time: i64,
    pub connect_time: i64,
    pub remote_handle: Option<String>,
    pub caller_display_name: Option<String>,
}

impl CallRecord {
    pub fn new(id: CallId, direction: CallDirection, state: CallState) -> Self {
        Self {
            id,
            direction,
            state,
            capabilities: Capabilities::NONE,
            conferenceable: BTreeSet::new(),
            creation_time: now_millis(),
            connect_time: 0,
            remote_handle: None,
            caller_display_name: None,
        }
    }

    pub fn incoming(state: CallState) -> Self {
        Self::new(CallId::new(), CallDirection::Incoming, state)
    }

    pub fn outgoing(state: CallState) -> Self {
        Self::new(CallId::new(), CallDirection::Outgoing, state)
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_conferenceable(mut self, calls: impl IntoIterator<Item = CallId>) -> Self {
        self.conferenceable = calls.into_iter().collect();
        self
    }

    pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
        self.remote_handle = Some(handle.into());
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.caller_display_name = Some(name.into());
        self
    }

    pub fn with_creation_time(mut self, creation_time: i64) -> Self {
        self.creation_time = creation_time;
        self
    }

    pub fn with_connect_time(mut self, connect_time: i64) -> Self {
        self.connect_time = connect_time;
        self
    }

    pub fn details(&self) -> CallDetails {
        CallDetails {
            direction: self.direction,
            capabilities: self.capabilities,
            creation_time: self.creation_time,
            connect_time: self.connect_time,
            remote_handle: self.remote_handle.clone(),
            caller_display_name: self.caller_display_name.clone(),
        }
    }

    pub fn apply_details(&mut self, details: CallDetails) {
        self.direction = details.direction;
        self.capabilities = details.capabilities;
        self.creation_time = details.creation_time;
        self.connect_time = details.connect_time;
        self.remote_handle = details.remote_handle;
        self.caller_display_name = details.caller_display_name;
    }

    pub fn is_connected(&self) -> bool {
        self.connect_time > 0
    }

    /// Remote number, empty when the subsystem did not report one.
    pub fn number(&self) -> &str {
        self.remote_handle.as_deref().map(str::trim).unwrap_or("")
    }

    /// Display name, `None` when missing or blank.
    pub fn display_name(&self) -> Option<&str> {
        self.caller_display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    pub fn lists_conferenceable(&self, other: CallId) -> bool {
        self.conferenceable.contains(&other)
    }

    /// Connect time if the call was ever answered, creation time otherwise.
    pub fn start_time(&self) -> i64 {
        if self.connect_time > 0 {
            self.connect_time
        } else {
            self.creation_time
        }
    }
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
