//! Timeline engine: the composition root.
//!
//! One [`TimelineEngine`] backs one rendered timeline. It owns everything
//! derived from the current item snapshot (hierarchy, padded date range,
//! collapse flags) plus the zoom level and the create/edit session, and it
//! turns user intents into [`TimelineEvent`]s the host drains.
//!
//! ## Usage
//!
//! ```
//! use chrono::NaiveDate;
//! use timeline_engine::{TimelineConfig, TimelineEngine, TimelineEvent, TimelineItem};
//!
//! let d = |day| NaiveDate::from_ymd_opt(2026, 2, day).unwrap();
//! let mut engine = TimelineEngine::new(TimelineConfig::default()).with_today(d(4));
//! engine.set_items(vec![TimelineItem::task("spec", "Write spec", d(2), d(6))])?;
//! let model = engine.render(1200.0)?;
//! assert_eq!(model.rows.len(), 1);
//!
//! // on double-click:
//! assert!(engine.activate_row("spec"));
//! for event in engine.drain_events() {
//!     if let TimelineEvent::EditRequested { item_id, .. } = event {
//!         assert_eq!(item_id, "spec"); // open the sheet, persist, ...
//!     }
//! }
//! # Ok::<(), timeline_engine::TimelineError>(())
//! ```
//!
//! Everything here is synchronous. Persistence happens in the host; the host
//! reports back with [`TimelineEngine::complete`] and feeds the new item list
//! into [`TimelineEngine::set_items`] on the next render.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calendar::{self, DateRange, WorkDayPolicy};
use crate::columns::{generate_columns, Column, Granularity};
use crate::config::{TimelineConfig, MIN_PADDING_DAYS};
use crate::error::{Result, TimelineError};
use crate::events::TimelineEvent;
use crate::geometry::{self, calculate_bar_position, BarPosition};
use crate::hierarchy::{CollapseState, Hierarchy, VisibleRow};
use crate::interaction::{Completion, InteractionState, ItemDraft};
use crate::item::TimelineItem;

/// The padded span of `items`, or the month containing `today` when there
/// are none. Padding is raised to [`MIN_PADDING_DAYS`].
pub fn derive_range(items: &[TimelineItem], padding_days: u32, today: NaiveDate) -> DateRange {
    DateRange::covering(items.iter().map(|item| (item.start_date, item.end_date)))
        .map(|span| span.padded(padding_days.max(MIN_PADDING_DAYS)))
        .unwrap_or_else(|| DateRange::month_of(today))
}

/// One visible row, ready to draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineRow {
    /// Copy of the caller's item with `hierarchy_level` recomputed.
    pub item: TimelineItem,
    pub has_children: bool,
    pub collapsed: bool,
    pub bar: BarPosition,
    /// Duration under the configured work-day policy.
    pub work_days: i64,
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderModel {
    pub range: DateRange,
    pub granularity: Granularity,
    pub columns: Vec<Column>,
    pub rows: Vec<TimelineRow>,
    pub total_width: f64,
    /// Centre of today's day cell when today is on the axis.
    pub today_x: Option<f64>,
}

impl RenderModel {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone)]
pub struct TimelineEngine {
    config: TimelineConfig,
    today: NaiveDate,
    items: Vec<TimelineItem>,
    hierarchy: Hierarchy,
    range: DateRange,
    granularity: Granularity,
    collapse: CollapseState,
    interaction: InteractionState,
    events: Vec<TimelineEvent>,
}

impl TimelineEngine {
    /// Create an engine with no items, anchored on the system clock's today.
    pub fn new(config: TimelineConfig) -> Self {
        let today = calendar::today();
        Self {
            granularity: config.granularity,
            config,
            today,
            items: Vec::new(),
            hierarchy: Hierarchy::default(),
            range: DateRange::month_of(today),
            collapse: CollapseState::new(),
            interaction: InteractionState::Idle,
            events: Vec::new(),
        }
    }

    /// Replace the "today" anchor (used for the empty-list window and the
    /// today marker).
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self.range = derive_range(&self.items, self.config.padding_days, today);
        self
    }

    // ── Snapshot ─────────────────────────────────────────────────────

    /// Load a new item snapshot.
    ///
    /// Collapse flags survive for ids that are still parents; everything else
    /// derived from the previous snapshot is rebuilt.
    ///
    /// # Errors
    ///
    /// - [`TimelineError::InvalidRange`] if an item ends before it starts
    /// - [`TimelineError::InvalidItem`] for any other malformed item
    /// - [`TimelineError::DuplicateItemId`] if two items share an id
    ///
    /// On error the previous snapshot stays loaded.
    pub fn set_items(&mut self, items: Vec<TimelineItem>) -> Result<()> {
        let mut seen = HashSet::with_capacity(items.len());
        for item in &items {
            item.validate()?;
            if !seen.insert(item.id.as_str()) {
                return Err(TimelineError::DuplicateItemId(item.id.clone()));
            }
        }

        let hierarchy = Hierarchy::build(&items);
        self.range = derive_range(&items, self.config.padding_days, self.today);
        self.collapse.retain_parents(&hierarchy);
        self.hierarchy = hierarchy;
        self.items = items;

        if let Some(id) = self.interaction.target_id() {
            if self.hierarchy.index_of(id).is_none() {
                debug!(id, "item under edit is no longer in the snapshot");
            }
        }
        debug!(
            items = self.items.len(),
            roots = self.hierarchy.roots().len(),
            start = %self.range.start(),
            end = %self.range.end(),
            "timeline items loaded"
        );
        Ok(())
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn items(&self) -> &[TimelineItem] {
        &self.items
    }

    pub fn item(&self, id: &str) -> Option<&TimelineItem> {
        self.hierarchy.index_of(id).map(|i| &self.items[i])
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    pub fn date_range(&self) -> DateRange {
        self.range
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn state(&self) -> &InteractionState {
        &self.interaction
    }

    pub fn collapse_state(&self) -> &CollapseState {
        &self.collapse
    }

    pub fn columns(&self) -> Vec<Column> {
        generate_columns(&self.range, self.granularity)
    }

    pub fn visible_rows(&self) -> Vec<VisibleRow> {
        self.hierarchy.visible_rows(&self.collapse)
    }

    /// Work-day duration of `id` under the configured policy.
    pub fn work_days(&self, id: &str) -> Option<i64> {
        self.item(id)
            .and_then(|item| item.work_days(&self.config.work_days).ok())
    }

    /// Build the frame for an axis `total_width` pixels wide.
    ///
    /// # Errors
    ///
    /// Returns [`TimelineError::InvalidWidth`] for a negative or non-finite
    /// width.
    pub fn render(&self, total_width: f64) -> Result<RenderModel> {
        if !total_width.is_finite() || total_width < 0.0 {
            return Err(TimelineError::InvalidWidth(total_width));
        }
        let rows = self
            .visible_rows()
            .into_iter()
            .map(|row| -> Result<TimelineRow> {
                let source = &self.items[row.index];
                let mut item = source.clone();
                item.hierarchy_level = row.level;
                Ok(TimelineRow {
                    bar: calculate_bar_position(source, &self.range, total_width)?,
                    work_days: source.work_days(&self.config.work_days)?,
                    item,
                    has_children: row.has_children,
                    collapsed: row.collapsed,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(RenderModel {
            range: self.range,
            granularity: self.granularity,
            columns: self.columns(),
            rows,
            total_width,
            today_x: geometry::today_marker_x(self.today, &self.range, total_width),
        })
    }

    // ── Intents ──────────────────────────────────────────────────────

    /// Collapse or expand `id`. Returns `false` (no event) when `id` has no
    /// children.
    pub fn toggle_collapse(&mut self, id: &str) -> bool {
        match self.collapse.toggle(&self.hierarchy, id) {
            Some(collapsed) => {
                self.events.push(TimelineEvent::CollapseToggled {
                    parent_id: id.to_string(),
                    collapsed,
                });
                true
            }
            None => false,
        }
    }

    /// Switch the zoom level. Returns `false` if it was already active.
    pub fn set_granularity(&mut self, granularity: Granularity) -> bool {
        if self.granularity == granularity {
            return false;
        }
        debug!(from = self.granularity.as_str(), to = granularity.as_str(), "granularity changed");
        self.granularity = granularity;
        self.events.push(TimelineEvent::granularity_changed(granularity));
        true
    }

    /// Switch the weekend policy used for work-day counts. Returns `false` if
    /// it was already active. Collapse flags and any open session are kept.
    pub fn set_work_day_policy(&mut self, policy: WorkDayPolicy) -> bool {
        if self.config.work_days == policy {
            return false;
        }
        debug!(
            include_saturday = policy.include_saturday,
            include_sunday = policy.include_sunday,
            "work-day policy changed"
        );
        self.config.work_days = policy;
        true
    }

    /// The "add" affordance: open a create session seeded with
    /// `default_range`.
    pub fn request_create(&mut self, default_range: DateRange) {
        let event = self.interaction.begin_create(default_range, None);
        self.events.push(event);
    }

    /// Open a create session for a child of `parent_id`.
    pub fn request_create_under(&mut self, parent_id: impl Into<String>, default_range: DateRange) {
        let event = self.interaction.begin_create(default_range, Some(parent_id.into()));
        self.events.push(event);
    }

    /// Open a create session for the day cell under pixel `x`.
    ///
    /// # Errors
    ///
    /// Returns [`TimelineError::InvalidWidth`] for a zero, negative or
    /// non-finite width.
    pub fn request_create_at(&mut self, x: f64, total_width: f64) -> Result<DateRange> {
        let day = geometry::date_at_x(x, &self.range, total_width)?;
        let range = DateRange::single(day);
        self.request_create(range);
        Ok(range)
    }

    /// Double-click on a row. Opens an edit session for editable items;
    /// returns `false` for read-only or unknown ids.
    pub fn activate_row(&mut self, id: &str) -> bool {
        let Some(index) = self.hierarchy.index_of(id) else {
            debug!(id, "activation on unknown row ignored");
            return false;
        };
        match self.interaction.begin_edit(&self.items[index]) {
            Some(event) => {
                self.events.push(event);
                true
            }
            None => false,
        }
    }

    /// Store the open sheet's field values. Returns `false` while idle.
    pub fn update_draft(&mut self, draft: ItemDraft) -> bool {
        self.interaction.update_draft(draft)
    }

    /// Close the open sheet. Always leaves the engine idle.
    pub fn cancel(&mut self) -> bool {
        match self.interaction.cancel() {
            Some(event) => {
                self.events.push(event);
                true
            }
            None => false,
        }
    }

    /// Report the outcome of the host's create/update write.
    pub fn complete(&mut self, completion: Completion) -> bool {
        match self.interaction.complete(completion) {
            Some(event) => {
                self.events.push(event);
                true
            }
            None => false,
        }
    }

    /// Take every event emitted since the last call, oldest first.
    pub fn drain_events(&mut self) -> Vec<TimelineEvent> {
        std::mem::take(&mut self.events)
    }
}

impl Default for TimelineEngine {
    fn default() -> Self {
        Self::new(TimelineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemKind;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn engine() -> TimelineEngine {
        TimelineEngine::new(TimelineConfig::default()).with_today(date(2026, 2, 11))
    }

    fn project() -> Vec<TimelineItem> {
        vec![
            TimelineItem::phase("design", "Design", date(2026, 2, 2), date(2026, 2, 13)),
            TimelineItem::task("wire", "Wireframes", date(2026, 2, 2), date(2026, 2, 6))
                .with_parent("design")
                .with_progress(80.0),
            TimelineItem::task("mock", "Mockups", date(2026, 2, 9), date(2026, 2, 13))
                .with_parent("design")
                .with_editable(false),
            TimelineItem::phase("build", "Build", date(2026, 2, 16), date(2026, 3, 6)),
            TimelineItem::task("api", "API", date(2026, 2, 16), date(2026, 2, 27)).with_parent("build"),
            TimelineItem::milestone("ship", "Ship", date(2026, 3, 6)).with_parent("build"),
        ]
    }

    fn loaded() -> TimelineEngine {
        let mut engine = engine();
        engine.set_items(project()).unwrap();
        engine
    }

    // ── set_items / range ───────────────────────────────────────────────

    #[test]
    fn test_range_is_padded_item_span() {
        let engine = loaded();
        assert_eq!(engine.date_range().start(), date(2026, 1, 30));
        assert_eq!(engine.date_range().end(), date(2026, 3, 9));
    }

    #[test]
    fn test_empty_items_default_to_current_month() {
        let mut engine = engine();
        engine.set_items(Vec::new()).unwrap();
        assert_eq!(engine.date_range(), DateRange::month_of(date(2026, 2, 11)));
        assert!(engine.render(500.0).unwrap().rows.is_empty());
    }

    #[test]
    fn test_invalid_item_propagates_and_keeps_snapshot() {
        let mut engine = loaded();
        let bad = vec![TimelineItem::task("x", "X", date(2026, 2, 12), date(2026, 2, 10))];
        let err = engine.set_items(bad).unwrap_err();
        assert!(matches!(err, TimelineError::InvalidRange { .. }));
        assert_eq!(engine.items().len(), 6);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut engine = engine();
        let items = vec![
            TimelineItem::task("a", "A", date(2026, 2, 10), date(2026, 2, 10)),
            TimelineItem::task("a", "A again", date(2026, 2, 11), date(2026, 2, 11)),
        ];
        assert_eq!(
            engine.set_items(items).unwrap_err(),
            TimelineError::DuplicateItemId("a".into())
        );
    }

    #[test]
    fn test_items_are_not_mutated() {
        let mut items = project();
        items[1].hierarchy_level = 5;
        let mut engine = engine();
        engine.set_items(items.clone()).unwrap();
        assert_eq!(engine.items(), items.as_slice());
        let model = engine.render(1000.0).unwrap();
        let wire = model.rows.iter().find(|r| r.item.id == "wire").unwrap();
        assert_eq!(wire.item.hierarchy_level, 1);
    }

    // ── render ──────────────────────────────────────────────────────────

    #[test]
    fn test_render_rows_and_geometry() {
        let engine = loaded();
        let model = engine.render(1000.0).unwrap();
        let ids: Vec<&str> = model.rows.iter().map(|r| r.item.id.as_str()).collect();
        assert_eq!(ids, ["design", "wire", "mock", "build", "api", "ship"]);
        assert_eq!(model.columns.len(), 7);

        let ship = &model.rows[5];
        assert_eq!(ship.item.kind, ItemKind::Milestone);
        assert_eq!(ship.bar.width, 0.0);
        assert!(model.rows[0].has_children);
        assert!(model.today_x.is_some());
    }

    #[test]
    fn test_render_work_days_follow_policy() {
        let engine = loaded();
        let model = engine.render(1000.0).unwrap();
        // Design: Mon Feb 2 .. Fri Feb 13 -> 10 weekdays
        assert_eq!(model.rows[0].work_days, 10);

        let config = TimelineConfig {
            work_days: WorkDayPolicy::ALL_DAYS,
            ..TimelineConfig::default()
        };
        let mut engine = TimelineEngine::new(config).with_today(date(2026, 2, 11));
        engine.set_items(project()).unwrap();
        assert_eq!(engine.work_days("design"), Some(12));
    }

    #[test]
    fn test_work_day_policy_change_keeps_view_state() {
        let mut engine = loaded();
        assert!(engine.toggle_collapse("build"));
        assert!(engine.activate_row("wire"));
        engine.drain_events();

        assert!(!engine.set_work_day_policy(WorkDayPolicy::WEEKDAYS));
        assert!(engine.set_work_day_policy(WorkDayPolicy::ALL_DAYS));

        let model = engine.render(1000.0).unwrap();
        assert_eq!(model.rows[0].item.id, "design");
        assert_eq!(model.rows[0].work_days, 12);
        assert!(engine.collapse_state().is_collapsed("build"));
        assert_eq!(engine.state().target_id(), Some("wire"));
        assert!(engine.drain_events().is_empty());
    }

    #[test]
    fn test_zero_padding_keeps_bars_on_axis() {
        let config = TimelineConfig {
            padding_days: 0,
            ..TimelineConfig::default()
        };
        let mut engine = TimelineEngine::new(config).with_today(date(2026, 2, 11));
        engine
            .set_items(vec![TimelineItem::phase("p", "P", date(2026, 2, 2), date(2026, 2, 13))])
            .unwrap();
        assert_eq!(engine.date_range().days(), 14);

        let bar = engine.render(1400.0).unwrap().rows[0].bar;
        assert_eq!(bar.left, 200.0);
        assert_eq!(bar.right(), 1400.0);
    }

    #[test]
    fn test_render_rejects_bad_width() {
        assert!(loaded().render(f64::INFINITY).is_err());
        assert!(loaded().render(-5.0).is_err());
    }

    #[test]
    fn test_render_model_serializes() {
        let json = loaded().render(1000.0).unwrap().to_json().unwrap();
        assert!(json.contains(r#""granularity":"week""#));
        assert!(json.contains(r#""id":"ship""#));
    }

    // ── collapse ────────────────────────────────────────────────────────

    #[test]
    fn test_toggle_collapse_emits_and_hides() {
        let mut engine = loaded();
        assert!(engine.toggle_collapse("design"));
        let ids: Vec<String> = engine
            .render(1000.0)
            .unwrap()
            .rows
            .into_iter()
            .map(|r| r.item.id)
            .collect();
        assert_eq!(ids, ["design", "build", "api", "ship"]);
        assert_eq!(
            engine.drain_events(),
            vec![TimelineEvent::CollapseToggled {
                parent_id: "design".into(),
                collapsed: true
            }]
        );
    }

    #[test]
    fn test_toggle_leaf_is_silent() {
        let mut engine = loaded();
        assert!(!engine.toggle_collapse("api"));
        assert!(engine.drain_events().is_empty());
    }

    #[test]
    fn test_collapse_survives_reload() {
        let mut engine = loaded();
        engine.toggle_collapse("build");
        engine.set_items(project()).unwrap();
        assert!(engine.collapse_state().is_collapsed("build"));
        assert_eq!(engine.visible_rows().len(), 4);
    }

    // ── granularity ─────────────────────────────────────────────────────

    #[test]
    fn test_set_granularity() {
        let mut engine = loaded();
        assert!(!engine.set_granularity(Granularity::Week));
        assert!(engine.set_granularity(Granularity::Day));
        assert_eq!(engine.columns().len() as i64, engine.date_range().days());
        assert_eq!(
            engine.drain_events(),
            vec![TimelineEvent::GranularityChanged {
                granularity: Granularity::Day
            }]
        );
        assert!(engine.set_granularity(Granularity::Month));
        let labels: Vec<String> = engine.columns().into_iter().map(|c| c.label).collect();
        assert_eq!(labels, ["Jan", "Feb", "Mar"]);
    }

    // ── interaction ─────────────────────────────────────────────────────

    #[test]
    fn test_activate_editable_row() {
        let mut engine = loaded();
        assert!(engine.activate_row("wire"));
        assert_eq!(engine.state().as_str(), "editing");
        assert_eq!(engine.state().target_id(), Some("wire"));
        let events = engine.drain_events();
        assert!(matches!(
            &events[..],
            [TimelineEvent::EditRequested { item_id, .. }] if item_id == "wire"
        ));
    }

    #[test]
    fn test_activate_read_only_row_stays_idle() {
        let mut engine = loaded();
        assert!(!engine.activate_row("mock"));
        assert!(engine.state().is_idle());
        assert!(!engine.activate_row("missing"));
        assert!(engine.drain_events().is_empty());
    }

    #[test]
    fn test_request_create_at_pixel() {
        let mut engine = loaded();
        // range is 39 days wide; pixel 0 is the first cell
        let range = engine.request_create_at(0.0, 390.0).unwrap();
        assert_eq!(range, DateRange::single(date(2026, 1, 30)));
        assert_eq!(engine.state().as_str(), "creating");
        assert!(engine.request_create_at(0.0, 0.0).is_err());
    }

    #[test]
    fn test_request_create_under_parent() {
        let mut engine = loaded();
        engine.request_create_under("build", DateRange::single(date(2026, 3, 2)));
        assert_eq!(
            engine.drain_events(),
            vec![TimelineEvent::CreateRequested {
                default_range: DateRange::single(date(2026, 3, 2)),
                parent_id: Some("build".into()),
            }]
        );
    }

    #[test]
    fn test_failed_completion_keeps_editing() {
        let mut engine = loaded();
        engine.activate_row("api");
        assert!(engine.complete(Completion::Failed {
            reason: "conflict".into()
        }));
        assert_eq!(engine.state().target_id(), Some("api"));
        assert_eq!(engine.state().last_error(), Some("conflict"));
        assert!(engine.cancel());
        assert!(engine.state().is_idle());
        assert!(!engine.cancel());
    }
}
