//! Outbound events.
//!
//! The engine queues a [`TimelineEvent`] for each intent the host has to act
//! on or mirror. Events are internally tagged with `"type"` so a host can forward them as JSON.

use serde::{Deserialize, Serialize};

use crate::calendar::DateRange;
use crate::columns::Granularity;
use crate::interaction::ItemDraft;

/// Every user intent the engine accepts produces an event.
/// The host polls for them with `TimelineEngine::drain_events` and does the
/// actual work (opening a sheet, writing to storage).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TimelineEvent {
    /// The "add" affordance was used. No item id exists yet.
    CreateRequested {
        default_range: DateRange,
        parent_id: Option<String>,
    },
    /// An editable row was activated.
    EditRequested { item_id: String, draft: ItemDraft },
    CollapseToggled { parent_id: String, collapsed: bool },
    GranularityChanged { granularity: Granularity },
    /// The open create/edit sheet was dismissed.
    InteractionCancelled,
    /// The host reported a successful write. `item_id` is `None` for creates.
    InteractionCompleted { item_id: Option<String> },
    /// The host reported a failed write; the sheet stays open with its draft.
    InteractionFailed {
        item_id: Option<String>,
        reason: String,
    },
}

impl TimelineEvent {
    pub fn granularity_changed(granularity: Granularity) -> Self {
        Self::GranularityChanged { granularity }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
