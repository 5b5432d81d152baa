//! Acknowledgment dialogs owed to the user.
//!
//! A phase can finish while no timer view is mounted, so the dialog it needs
//! is recorded durably and delivered to whichever view mounts next. The value
//! stays set until the user acts on the dialog.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PendingModal {
    #[default]
    None,
    /// A focus cycle finished; offer a break or the next cycle.
    CycleDone,
    /// A break finished; offer to continue studying.
    BreakDone,
    /// Every configured cycle finished.
    SessionComplete,
}

impl PendingModal {
    /// Value written to durable storage. `None` is never stored.
    pub fn stored_value(self) -> Option<&'static str> {
        match self {
            PendingModal::None => None,
            PendingModal::CycleDone => Some("cycle"),
            PendingModal::BreakDone => Some("break"),
            PendingModal::SessionComplete => Some("complete"),
        }
    }

    pub fn from_stored(value: &str) -> Option<Self> {
        match value {
            "cycle" => Some(PendingModal::CycleDone),
            "break" => Some(PendingModal::BreakDone),
            "complete" => Some(PendingModal::SessionComplete),
            _ => None,
        }
    }

    pub fn is_pending(self) -> bool {
        self != PendingModal::None
    }

    /// Title shown by a view presenting this dialog.
    pub fn title(self) -> &'static str {
        match self {
            PendingModal::None => "",
            PendingModal::CycleDone => "Cycle complete! Take a break?",
            PendingModal::BreakDone => "Break is over. Ready to focus?",
            PendingModal::SessionComplete => "Session complete!",
        }
    }
}
