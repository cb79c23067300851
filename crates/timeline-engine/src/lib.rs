//! # timeline-engine
//!
//! Deterministic Gantt timeline computation.
//!
//! The engine turns a flat list of tasks, phases and milestones into a
//! renderable time-axis model: hierarchical rows with collapse state,
//! labelled columns at day/week/month zoom, pixel-exact bar geometry, and
//! work-day durations under a configurable weekend policy. It also owns the
//! create/edit interaction state and reports user intents as events; it never
//! persists anything itself.
//!
//! ## Modules
//!
//! - [`calendar`] — Inclusive day counts, work days, weekend/today predicates, `DateRange`
//! - [`columns`] — Time-axis columns for a range at a granularity
//! - [`geometry`] — Bar offset/width in pixels, pixel-to-day hit testing
//! - [`item`] — Timeline item records and validation
//! - [`hierarchy`] — Parent/child arena, collapse state, visible rows
//! - [`interaction`] — Idle/creating/editing state machine and drafts
//! - [`events`] — Events emitted to the host
//! - [`config`] — TOML configuration
//! - [`engine`] — Composition root tying the above together
//! - [`error`] — Error types

pub mod calendar;
pub mod columns;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod geometry;
pub mod hierarchy;
pub mod interaction;
pub mod item;

pub use calendar::{
    calculate_work_days, days_between, is_today, is_weekend, DateRange, WorkDayPolicy,
};
pub use columns::{generate_columns, Column, Granularity};
pub use config::TimelineConfig;
pub use engine::{RenderModel, TimelineEngine, TimelineRow};
pub use error::TimelineError;
pub use events::TimelineEvent;
pub use geometry::{calculate_bar_position, BarPosition};
pub use hierarchy::{CollapseState, Hierarchy, VisibleRow};
pub use interaction::{Completion, InteractionState, ItemDraft};
pub use item::{ItemKind, TimelineItem};
