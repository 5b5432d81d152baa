//! Mapping of the timer record and pending dialog onto durable keys.

use tracing::warn;

use super::modal::PendingModal;
use super::state::TimerState;
use crate::error::Result;
use crate::storage::KvStore;

pub const STATE_KEY: &str = "timer_state";
pub const MODAL_KEY: &str = "pending_modal";

pub struct TimerStore {
    kv: Box<dyn KvStore>,
}

impl TimerStore {
    pub fn new(kv: Box<dyn KvStore>) -> Self {
        Self { kv }
    }

    pub fn save_state(&mut self, state: &TimerState) -> Result<()> {
        let json = serde_json::to_string(state)?;
        self.kv.set(STATE_KEY, &json)?;
        Ok(())
    }

    /// `Ok(None)` when nothing was persisted; `Err` when the stored text is
    /// unreadable or does not parse.
    pub fn load_state(&self) -> Result<Option<TimerState>> {
        match self.kv.get(STATE_KEY)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub fn remove_state(&mut self) -> Result<()> {
        self.kv.remove(STATE_KEY)?;
        Ok(())
    }

    pub fn pending_modal(&self) -> Result<PendingModal> {
        let Some(value) = self.kv.get(MODAL_KEY)? else {
            return Ok(PendingModal::None);
        };
        match PendingModal::from_stored(&value) {
            Some(modal) => Ok(modal),
            None => {
                warn!("ignoring unrecognised pending modal value {value:?}");
                Ok(PendingModal::None)
            }
        }
    }

    pub fn set_pending_modal(&mut self, modal: PendingModal) -> Result<()> {
        match modal.stored_value() {
            Some(value) => self.kv.set(MODAL_KEY, value)?,
            None => self.kv.remove(MODAL_KEY)?,
        }
        Ok(())
    }

    /// Remove both durable keys.
    pub fn clear(&mut self) -> Result<()> {
        self.kv.remove(STATE_KEY)?;
        self.kv.remove(MODAL_KEY)?;
        Ok(())
    }
}
