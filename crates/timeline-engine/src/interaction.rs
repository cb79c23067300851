//! Create/edit interaction state machine.
//!
//! The engine never writes items itself. It opens a create or edit session,
//! hands the host a [`TimelineEvent`], and waits to be told how the host's
//! write went.
//!
//! ## State Transitions
//!
//! ```text
//! Idle ──add──────────> Creating ──cancel / complete(Ok)──> Idle
//! Idle ──activate row─> Editing  ──cancel / complete(Ok)──> Idle
//! Creating / Editing ──complete(Failed)──> same state, draft kept
//! Creating / Editing ──add / activate──> new target (last request wins)
//! ```
//!
//! A failed write keeps the session open with its last draft and records the
//! failure reason, so the host can show the error and retry without
//! re-entering anything.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calendar::DateRange;
use crate::error::{Result, TimelineError};
use crate::events::TimelineEvent;
use crate::item::{ItemKind, TimelineItem};

/// Field values of the item being created or edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDraft {
    pub name: String,
    #[serde(default)]
    pub kind: ItemKind,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub parent_id: Option<String>,
}

impl ItemDraft {
    /// An unnamed task covering `range`.
    pub fn new(range: DateRange) -> Self {
        Self {
            name: String::new(),
            kind: ItemKind::Task,
            start_date: range.start(),
            end_date: range.end(),
            progress: 0.0,
            color: String::new(),
            parent_id: None,
        }
    }

    pub fn from_item(item: &TimelineItem) -> Self {
        Self {
            name: item.name.clone(),
            kind: item.kind,
            start_date: item.start_date,
            end_date: item.end_date,
            progress: item.progress,
            color: item.color.clone(),
            parent_id: item.parent_id.clone(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_kind(mut self, kind: ItemKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Turn the draft into an item with the id the host's storage assigned.
    ///
    /// # Errors
    ///
    /// Returns [`TimelineError::InvalidItem`] for an empty name and anything
    /// [`TimelineItem::validate`] rejects.
    pub fn into_item(self, id: impl Into<String>) -> Result<TimelineItem> {
        let id = id.into();
        if self.name.trim().is_empty() {
            return Err(TimelineError::InvalidItem {
                id,
                reason: "name must not be empty".to_string(),
            });
        }
        let item = TimelineItem {
            id,
            name: self.name,
            kind: self.kind,
            start_date: self.start_date,
            end_date: self.end_date,
            progress: self.progress,
            color: self.color,
            parent_id: self.parent_id,
            hierarchy_level: 0,
            is_editable: true,
        };
        item.validate()?;
        Ok(item)
    }

    pub fn validate(&self) -> Result<()> {
        self.clone().into_item("draft").map(|_| ())
    }
}

/// How the host's write went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Completion {
    Ok,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum InteractionState {
    #[default]
    Idle,
    Creating {
        default_range: DateRange,
        draft: ItemDraft,
        last_error: Option<String>,
    },
    Editing {
        item_id: String,
        draft: ItemDraft,
        last_error: Option<String>,
    },
}

impl InteractionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Creating { .. } => "creating",
            Self::Editing { .. } => "editing",
        }
    }

    /// Id of the item under edit; `None` while idle or creating.
    pub fn target_id(&self) -> Option<&str> {
        match self {
            Self::Editing { item_id, .. } => Some(item_id.as_str()),
            _ => None,
        }
    }

    pub fn draft(&self) -> Option<&ItemDraft> {
        match self {
            Self::Idle => None,
            Self::Creating { draft, .. } | Self::Editing { draft, .. } => Some(draft),
        }
    }

    pub fn last_error(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::Creating { last_error, .. } | Self::Editing { last_error, .. } => {
                last_error.as_deref()
            }
        }
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// Open a create session seeded with `default_range`, replacing any
    /// session already open.
    pub fn begin_create(&mut self, default_range: DateRange, parent_id: Option<String>) -> TimelineEvent {
        let mut draft = ItemDraft::new(default_range);
        draft.parent_id = parent_id.clone();
        debug!(from = self.as_str(), start = %default_range.start(), "interaction -> creating");
        *self = Self::Creating {
            default_range,
            draft,
            last_error: None,
        };
        TimelineEvent::CreateRequested {
            default_range,
            parent_id,
        }
    }

    /// Open an edit session for `item`, replacing any session already open.
    /// Read-only items are ignored.
    pub fn begin_edit(&mut self, item: &TimelineItem) -> Option<TimelineEvent> {
        if !item.is_editable {
            debug!(id = %item.id, "activation on read-only item ignored");
            return None;
        }
        let draft = ItemDraft::from_item(item);
        debug!(from = self.as_str(), id = %item.id, "interaction -> editing");
        *self = Self::Editing {
            item_id: item.id.clone(),
            draft: draft.clone(),
            last_error: None,
        };
        Some(TimelineEvent::EditRequested {
            item_id: item.id.clone(),
            draft,
        })
    }

    /// Record the form's current values. Returns `false` while idle.
    pub fn update_draft(&mut self, new_draft: ItemDraft) -> bool {
        match self {
            Self::Idle => false,
            Self::Creating { draft, .. } | Self::Editing { draft, .. } => {
                *draft = new_draft;
                true
            }
        }
    }

    /// Close the open session. Returns `None` if nothing was open.
    pub fn cancel(&mut self) -> Option<TimelineEvent> {
        if self.is_idle() {
            return None;
        }
        debug!(from = self.as_str(), "interaction cancelled");
        *self = Self::Idle;
        Some(TimelineEvent::InteractionCancelled)
    }

    /// Apply the host's write result.
    ///
    /// `Ok` returns to idle. `Failed` keeps the session and its draft and
    /// stores the reason in `last_error`. Ignored while idle.
    pub fn complete(&mut self, completion: Completion) -> Option<TimelineEvent> {
        if self.is_idle() {
            debug!("completion received while idle, ignoring");
            return None;
        }
        let item_id = self.target_id().map(str::to_string);
        match completion {
            Completion::Ok => {
                debug!(from = self.as_str(), "interaction completed");
                *self = Self::Idle;
                Some(TimelineEvent::InteractionCompleted { item_id })
            }
            Completion::Failed { reason } => {
                debug!(state = self.as_str(), %reason, "write failed, keeping session open");
                if let Self::Creating { last_error, .. } | Self::Editing { last_error, .. } = self {
                    *last_error = Some(reason.clone());
                }
                Some(TimelineEvent::InteractionFailed { item_id, reason })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn task(id: &str) -> TimelineItem {
        TimelineItem::task(id, "Task", date(2026, 2, 10), date(2026, 2, 12))
    }

    fn cell() -> DateRange {
        DateRange::single(date(2026, 2, 11))
    }

    // ── create ──────────────────────────────────────────────────────────

    #[test]
    fn test_begin_create_from_idle() {
        let mut state = InteractionState::default();
        let event = state.begin_create(cell(), None);
        assert_eq!(state.as_str(), "creating");
        assert_eq!(state.target_id(), None);
        assert_eq!(
            event,
            TimelineEvent::CreateRequested {
                default_range: cell(),
                parent_id: None
            }
        );
        let draft = state.draft().unwrap();
        assert_eq!(draft.start_date, date(2026, 2, 11));
        assert!(draft.name.is_empty());
    }

    #[test]
    fn test_begin_create_under_parent_seeds_draft() {
        let mut state = InteractionState::default();
        state.begin_create(cell(), Some("p1".into()));
        assert_eq!(state.draft().unwrap().parent_id.as_deref(), Some("p1"));
    }

    // ── edit ────────────────────────────────────────────────────────────

    #[test]
    fn test_begin_edit_editable() {
        let mut state = InteractionState::default();
        let event = state.begin_edit(&task("a")).unwrap();
        assert_eq!(state.target_id(), Some("a"));
        match event {
            TimelineEvent::EditRequested { item_id, draft } => {
                assert_eq!(item_id, "a");
                assert_eq!(draft.end_date, date(2026, 2, 12));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_begin_edit_read_only_is_noop() {
        let mut state = InteractionState::default();
        assert!(state.begin_edit(&task("a").with_editable(false)).is_none());
        assert!(state.is_idle());
    }

    #[test]
    fn test_last_request_wins() {
        let mut state = InteractionState::default();
        state.begin_edit(&task("a"));
        state.begin_edit(&task("b"));
        assert_eq!(state.target_id(), Some("b"));
        state.begin_create(cell(), None);
        assert_eq!(state.as_str(), "creating");
        state.begin_edit(&task("c"));
        assert_eq!(state.target_id(), Some("c"));
    }

    // ── cancel / complete ───────────────────────────────────────────────

    #[test]
    fn test_cancel_returns_to_idle() {
        let mut state = InteractionState::default();
        state.begin_edit(&task("a"));
        assert_eq!(state.cancel(), Some(TimelineEvent::InteractionCancelled));
        assert!(state.is_idle());
        assert_eq!(state.cancel(), None);
    }

    #[test]
    fn test_complete_ok_returns_to_idle() {
        let mut state = InteractionState::default();
        state.begin_edit(&task("a"));
        let event = state.complete(Completion::Ok);
        assert_eq!(
            event,
            Some(TimelineEvent::InteractionCompleted {
                item_id: Some("a".into())
            })
        );
        assert!(state.is_idle());
    }

    #[test]
    fn test_complete_failed_keeps_draft() {
        let mut state = InteractionState::default();
        state.begin_create(cell(), None);
        let typed = ItemDraft::new(cell()).with_name("X");
        assert!(state.update_draft(typed.clone()));

        let event = state.complete(Completion::Failed {
            reason: "network down".into(),
        });
        assert!(matches!(event, Some(TimelineEvent::InteractionFailed { item_id: None, .. })));
        assert_eq!(state.as_str(), "creating");
        assert_eq!(state.draft(), Some(&typed));
        assert_eq!(state.last_error(), Some("network down"));

        state.complete(Completion::Ok);
        assert!(state.is_idle());
    }

    #[test]
    fn test_complete_while_idle_ignored() {
        let mut state = InteractionState::default();
        assert_eq!(state.complete(Completion::Ok), None);
        assert!(!state.update_draft(ItemDraft::new(cell())));
    }

    // ── drafts ──────────────────────────────────────────────────────────

    #[test]
    fn test_draft_into_item() {
        let draft = ItemDraft::new(DateRange::new(date(2026, 2, 10), date(2026, 2, 12)).unwrap())
            .with_name("X")
            .with_parent("p1");
        let item = draft.into_item("new-1").unwrap();
        assert_eq!(item.id, "new-1");
        assert_eq!(item.parent_id.as_deref(), Some("p1"));
        assert!(item.is_editable);
    }

    #[test]
    fn test_draft_requires_name() {
        assert!(ItemDraft::new(cell()).validate().is_err());
        assert!(ItemDraft::new(cell()).with_name("  ").validate().is_err());
        assert!(ItemDraft::new(cell()).with_name("ok").validate().is_ok());
    }

    #[test]
    fn test_draft_milestone_must_be_single_day() {
        let range = DateRange::new(date(2026, 2, 10), date(2026, 2, 12)).unwrap();
        let draft = ItemDraft::new(range).with_name("M").with_kind(ItemKind::Milestone);
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_state_serializes_with_tag() {
        let json = serde_json::to_string(&InteractionState::Idle).unwrap();
        assert_eq!(json, r#"{"state":"idle"}"#);
        let json = serde_json::to_string(&Completion::Failed { reason: "x".into() }).unwrap();
        assert_eq!(json, r#"{"status":"failed","reason":"x"}"#);
    }
}
