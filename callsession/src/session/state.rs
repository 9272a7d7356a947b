use callsession_telecom::{CallId, CallState};
use tokio::sync::watch;

use crate::error::SessionError;
use crate::models::{AudioState, CallRecord};

/// Ordered call list plus a change counter.
///
/// `version` grows by one on every membership change and on every touch of a
/// contained record, so observers can detect change without diffing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallListState {
    pub calls: Vec<CallRecord>,
    pub version: u64,
}

impl CallListState {
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn get(&self, id: CallId) -> Option<&CallRecord> {
        self.calls.iter().find(|call| call.id == id)
    }

    pub fn contains(&self, id: CallId) -> bool {
        self.get(id).is_some()
    }

    pub fn first_in(&self, state: CallState) -> Option<&CallRecord> {
        self.calls.iter().find(|call| call.state == state)
    }

    pub fn active_call(&self) -> Option<&CallRecord> {
        self.first_in(CallState::Active)
    }

    pub fn holding_call(&self) -> Option<&CallRecord> {
        self.first_in(CallState::Holding)
    }

    pub fn primary_call(&self) -> Option<&CallRecord> {
        select_primary(&self.calls)
    }

    pub fn can_swap(&self) -> bool {
        self.active_call().is_some() && self.holding_call().is_some()
    }

    /// Active/holding pair that may be merged, with the reason it may.
    pub fn merge_candidates(&self) -> Option<MergeCandidates<'_>> {
        let active = self.active_call()?;
        let holding = self.holding_call()?;
        let eligibility = merge_eligibility(active, holding)?;
        Some(MergeCandidates {
            active,
            holding,
            eligibility,
        })
    }

    pub fn can_merge(&self) -> bool {
        self.merge_candidates().is_some()
    }
}

/// Picks the call a single-call surface should show.
///
/// Active beats dialing/connecting, which beats holding, which beats whatever
/// comes first. Ties go to insertion order.
pub fn select_primary(calls: &[CallRecord]) -> Option<&CallRecord> {
    calls
        .iter()
        .find(|call| call.state == CallState::Active)
        .or_else(|| calls.iter().find(|call| call.state.is_dialing()))
        .or_else(|| calls.iter().find(|call| call.state == CallState::Holding))
        .or_else(|| calls.first())
}

/// Why an active/holding pair may be merged into a conference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeEligibility {
    /// The active call lists the holding call as conferenceable.
    ConferenceableForward,
    /// The holding call lists the active call as conferenceable.
    ConferenceableBackward,
    /// Neither lists the other, but one of them advertises the merge capability.
    CapabilityBit,
}

/// Strongest merge reason for the pair, `None` if they cannot be merged.
pub fn merge_eligibility(active: &CallRecord, holding: &CallRecord) -> Option<MergeEligibility> {
    if active.lists_conferenceable(holding.id) {
        Some(MergeEligibility::ConferenceableForward)
    } else if holding.lists_conferenceable(active.id) {
        Some(MergeEligibility::ConferenceableBackward)
    } else if active.capabilities.can_merge() || holding.capabilities.can_merge() {
        Some(MergeEligibility::CapabilityBit)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MergeCandidates<'a> {
    pub active: &'a CallRecord,
    pub holding: &'a CallRecord,
    pub eligibility: MergeEligibility,
}

/// What every observer sees: the call list and the audio state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub calls: CallListState,
    pub audio: Option<AudioState>,
}

impl SessionSnapshot {
    pub fn version(&self) -> u64 {
        self.calls.version
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn primary_call(&self) -> Option<&CallRecord> {
        self.calls.primary_call()
    }

    pub fn can_swap(&self) -> bool {
        self.calls.can_swap()
    }

    pub fn can_merge(&self) -> bool {
        self.calls.can_merge()
    }

    pub fn is_muted(&self) -> bool {
        self.audio.map(|audio| audio.is_muted).unwrap_or(false)
    }

    pub fn is_speaker(&self) -> bool {
        self.audio.map(|audio| audio.is_speaker()).unwrap_or(false)
    }
}

/// Observable call-session container.
///
/// Readers subscribe and immediately see the latest snapshot; only the event
/// ingester writes.
pub struct CallSessionState {
    tx: watch::Sender<SessionSnapshot>,
}

impl CallSessionState {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(SessionSnapshot::default());
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.tx.borrow().clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub(crate) fn add_call(&self, record: CallRecord) -> Result<SessionSnapshot, SessionError> {
        if self.tx.borrow().calls.contains(record.id) {
            return Err(SessionError::inconsistent(
                "call_added",
                format!("call {} is already present", record.id),
            ));
        }
        self.tx.send_modify(|snapshot| {
            snapshot.calls.calls.push(record);
            snapshot.calls.version += 1;
        });
        Ok(self.snapshot())
    }

    /// Removes the call and returns its last record. Draining the list also
    /// clears the audio state.
    pub(crate) fn remove_call(
        &self,
        id: CallId,
    ) -> Result<(CallRecord, SessionSnapshot), SessionError> {
        let position = self
            .tx
            .borrow()
            .calls
            .calls
            .iter()
            .position(|call| call.id == id)
            .ok_or_else(|| {
                SessionError::inconsistent("call_removed", format!("call {id} is not present"))
            })?;
        let mut removed = None;
        self.tx.send_modify(|snapshot| {
            removed = Some(snapshot.calls.calls.remove(position));
            snapshot.calls.version += 1;
            if snapshot.calls.calls.is_empty() {
                snapshot.audio = None;
            }
        });
        match removed {
            Some(record) => Ok((record, self.snapshot())),
            None => Err(SessionError::inconsistent(
                "call_removed",
                format!("call {id} vanished during removal"),
            )),
        }
    }

    /// Updates one record in place and bumps the version.
    pub(crate) fn touch_call<F>(
        &self,
        event: &'static str,
        id: CallId,
        update: F,
    ) -> Result<SessionSnapshot, SessionError>
    where
        F: FnOnce(&mut CallRecord),
    {
        if !self.tx.borrow().calls.contains(id) {
            return Err(SessionError::inconsistent(
                event,
                format!("call {id} is not present"),
            ));
        }
        self.tx.send_modify(|snapshot| {
            if let Some(record) = snapshot.calls.calls.iter_mut().find(|call| call.id == id) {
                update(record);
            }
            snapshot.calls.version += 1;
        });
        Ok(self.snapshot())
    }

    pub(crate) fn set_audio(&self, audio: AudioState) {
        self.tx.send_modify(|snapshot| snapshot.audio = Some(audio));
    }
}

impl Default for CallSessionState {
    fn default() -> Self {
        Self::new()
    }
}
