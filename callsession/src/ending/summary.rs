use callsession_telecom::{CallDirection, CallId};

use crate::models::CallRecord;

/// How a finished call is filed in the call history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallClassification {
    Missed,
    Incoming,
    Outgoing,
    Unknown,
}

impl CallClassification {
    /// Incoming calls that never connected are missed; outgoing calls are
    /// outgoing whether or not they connected.
    pub fn of(record: &CallRecord) -> Self {
        match record.direction {
            CallDirection::Incoming if record.connect_time == 0 => CallClassification::Missed,
            CallDirection::Incoming => CallClassification::Incoming,
            CallDirection::Outgoing => CallClassification::Outgoing,
            CallDirection::Unknown => CallClassification::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CallClassification::Missed => "Missed",
            CallClassification::Incoming => "Incoming",
            CallClassification::Outgoing => "Outgoing",
            CallClassification::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for CallClassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What gets handed to the call log for a finished call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSummary {
    pub call_id: CallId,
    pub classification: CallClassification,
    pub number: String,
    pub display_name: Option<String>,
    // Creation time of the call, milliseconds since the Unix epoch.
    pub start_time: i64,
    pub duration_seconds: i64,
}

impl CallSummary {
    pub fn from_record(record: &CallRecord, now: i64) -> Self {
        Self {
            call_id: record.id,
            classification: CallClassification::of(record),
            number: record.number().to_string(),
            display_name: record.display_name().map(str::to_string),
            start_time: record.creation_time,
            duration_seconds: call_duration_seconds(record.connect_time, now),
        }
    }

    /// Name to show for this call: display name, else the number.
    pub fn caller_label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.number)
    }
}

/// Whole seconds since `connect_time`, zero for calls that never connected
/// or a clock that went backwards.
pub fn call_duration_seconds(connect_time: i64, now: i64) -> i64 {
    if connect_time > 0 {
        (now - connect_time).max(0) / 1000
    } else {
        0
    }
}
