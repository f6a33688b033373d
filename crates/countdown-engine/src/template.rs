//! Widget templates: the per-phase appearance of a countdown widget.
//!
//! A template holds one list of [`WidgetPhase`] entries per phase kind. The
//! `During` list may carry several entries with distinct time windows; the
//! four boundary lists normally carry one entry each. Selecting the active
//! phase is where template state meets the classifier.

use std::fmt;
use std::rc::Rc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::{EngineError, Result};
use crate::event::EventInfoProvider;
use crate::phase::{classify, PhaseTimeKind, PhaseTimeRule, TimeOffset};

pub const DEFAULT_BACKGROUND_COLOR: &str = "#efeeef";

// ── Backgrounds ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackgroundKind {
    LinearGradient,
    MorandiColors,
    MacaronColors,
}

/// Appearance of a single phase. Exactly one of the style fields is
/// meaningful, selected by `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Background {
    pub id: Uuid,
    pub kind: BackgroundKind,
    pub background_color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_image: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub linear_gradient: Vec<String>,
}

impl Background {
    pub fn solid(color: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: BackgroundKind::MorandiColors,
            background_color: color.into(),
            background_image: None,
            linear_gradient: Vec::new(),
        }
    }

    pub fn gradient(colors: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: BackgroundKind::LinearGradient,
            background_color: DEFAULT_BACKGROUND_COLOR.to_owned(),
            background_image: None,
            linear_gradient: colors,
        }
    }
}

impl Default for Background {
    fn default() -> Self {
        Self::solid(DEFAULT_BACKGROUND_COLOR)
    }
}

// ── Widget phases ───────────────────────────────────────────────────────

/// One configured phase entry: a time rule plus the appearance to show
/// while that rule is active.
///
/// The bound provider supplies event data (titles, resolved dates) at
/// render time; it is process-local and excluded from serialization and
/// equality, which compare by `id` alone.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetPhase {
    pub id: Uuid,
    pub phase_time_rule: PhaseTimeRule,
    pub background: Background,
    #[serde(skip)]
    provider: Option<Rc<dyn EventInfoProvider>>,
}

impl WidgetPhase {
    /// A phase covering the whole window of `kind`, with the default
    /// background.
    pub fn new(kind: PhaseTimeKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            phase_time_rule: PhaseTimeRule::covering(kind),
            background: Background::default(),
            provider: None,
        }
    }

    pub fn with_rule(rule: PhaseTimeRule) -> Self {
        Self {
            id: Uuid::new_v4(),
            phase_time_rule: rule,
            background: Background::default(),
            provider: None,
        }
    }

    pub fn kind(&self) -> PhaseTimeKind {
        self.phase_time_rule.phase_time_kind
    }

    pub fn bind_provider(&mut self, provider: Rc<dyn EventInfoProvider>) {
        self.provider = Some(provider);
    }

    pub fn provider(&self) -> Option<&Rc<dyn EventInfoProvider>> {
        self.provider.as_ref()
    }

    /// A duplicate with a fresh identity, for copy-style editing flows.
    pub fn deep_copy(&self) -> Self {
        let mut copy = self.clone();
        copy.id = Uuid::new_v4();
        copy
    }
}

impl fmt::Debug for WidgetPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetPhase")
            .field("id", &self.id)
            .field("phase_time_rule", &self.phase_time_rule)
            .field("background", &self.background)
            .field("provider", &self.provider.as_ref().map(|_| ".."))
            .finish()
    }
}

impl PartialEq for WidgetPhase {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for WidgetPhase {}

// ── Templates ───────────────────────────────────────────────────────────

/// The full appearance configuration of a widget, one phase list per kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseTemplate {
    pub id: Uuid,
    /// Fallback background color when no phase styling applies.
    pub background: String,
    /// Sub-phases of the `During` window, ordered by their begin offsets.
    pub phases: Vec<WidgetPhase>,
    pub phases_before_start_date: Vec<WidgetPhase>,
    pub phases_between_start_and_start_time: Vec<WidgetPhase>,
    pub phases_between_end_time_and_end_date: Vec<WidgetPhase>,
    /// Stored under the historical key `phasesAfterStartDate`.
    #[serde(rename = "phasesAfterStartDate")]
    pub phases_after_end_date: Vec<WidgetPhase>,
}

impl PhaseTemplate {
    /// A starter template: one full-window phase per kind, with the
    /// `During` entry unbounded.
    pub fn starter() -> Self {
        Self {
            id: Uuid::new_v4(),
            background: DEFAULT_BACKGROUND_COLOR.to_owned(),
            phases: vec![WidgetPhase::new(PhaseTimeKind::During)],
            phases_before_start_date: vec![WidgetPhase::new(PhaseTimeKind::BeforeStartDate)],
            phases_between_start_and_start_time: vec![WidgetPhase::new(
                PhaseTimeKind::StartDayBeforeStartTime,
            )],
            phases_between_end_time_and_end_date: vec![WidgetPhase::new(
                PhaseTimeKind::EndTimeBeforeEndDate,
            )],
            phases_after_end_date: vec![WidgetPhase::new(PhaseTimeKind::AfterEndDate)],
        }
    }

    fn list(&self, kind: PhaseTimeKind) -> &Vec<WidgetPhase> {
        match kind {
            PhaseTimeKind::BeforeStartDate => &self.phases_before_start_date,
            PhaseTimeKind::StartDayBeforeStartTime => &self.phases_between_start_and_start_time,
            PhaseTimeKind::During => &self.phases,
            PhaseTimeKind::EndTimeBeforeEndDate => &self.phases_between_end_time_and_end_date,
            PhaseTimeKind::AfterEndDate => &self.phases_after_end_date,
        }
    }

    fn list_mut(&mut self, kind: PhaseTimeKind) -> &mut Vec<WidgetPhase> {
        match kind {
            PhaseTimeKind::BeforeStartDate => &mut self.phases_before_start_date,
            PhaseTimeKind::StartDayBeforeStartTime => {
                &mut self.phases_between_start_and_start_time
            }
            PhaseTimeKind::During => &mut self.phases,
            PhaseTimeKind::EndTimeBeforeEndDate => &mut self.phases_between_end_time_and_end_date,
            PhaseTimeKind::AfterEndDate => &mut self.phases_after_end_date,
        }
    }

    /// Whether a phase of `kind` may be deleted. Each list keeps at least
    /// one entry.
    pub fn can_delete(&self, kind: PhaseTimeKind) -> bool {
        self.list(kind).len() > 1
    }

    /// Remove a `During` sub-phase by id. Returns false when the phase is
    /// absent or is the last entry of its list. After a removal the final
    /// entry's end offset is forced back to unbounded so the `During`
    /// window stays fully covered at its tail.
    pub fn delete_phase(&mut self, id: Uuid) -> bool {
        if self.phases.len() <= 1 {
            return false;
        }
        let Some(index) = self.phases.iter().position(|p| p.id == id) else {
            return false;
        };
        self.phases.remove(index);
        if let Some(last) = self.phases.last_mut() {
            last.phase_time_rule.end_time_offset = TimeOffset::unbounded();
        }
        true
    }

    pub fn add_phase(&mut self, phase: WidgetPhase) {
        let list = self.list_mut(phase.kind());
        list.push(phase);
        list.sort_by(|a, b| a.phase_time_rule.cmp(&b.phase_time_rule));
    }

    /// Bind the event data source into every phase entry.
    pub fn bind_provider(&mut self, provider: Rc<dyn EventInfoProvider>) {
        for kind in PhaseTimeKind::ALL {
            for phase in self.list_mut(kind) {
                phase.bind_provider(Rc::clone(&provider));
            }
        }
    }

    /// Select the phase entry to render at `now`, resolving the event
    /// boundaries through `provider`.
    ///
    /// For `During`, the first entry whose window contains `now` wins; when
    /// the windows leave a gap the last entry stands in. The boundary kinds
    /// always render their first entry.
    ///
    /// # Errors
    ///
    /// [`EngineError::NoMatchingPhase`] when the selected kind's list is
    /// empty.
    pub fn active_phase(
        &self,
        now: NaiveDateTime,
        provider: &dyn EventInfoProvider,
    ) -> Result<&WidgetPhase> {
        let start = provider.next_start_date(now);
        let end = provider.next_end_date(now);
        let kind = classify(now, start, end);

        if kind == PhaseTimeKind::During {
            if let Some(phase) = self
                .phases
                .iter()
                .find(|p| p.phase_time_rule.matches(now, start, end))
            {
                return Ok(phase);
            }
            // Windows with gaps fall through to the tail entry.
            return match self.phases.last() {
                Some(last) => {
                    warn!(
                        phase_count = self.phases.len(),
                        "no during-phase window covers now, using last entry"
                    );
                    Ok(last)
                }
                None => Err(EngineError::NoMatchingPhase),
            };
        }

        self.list(kind).first().ok_or(EngineError::NoMatchingPhase)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| EngineError::TemplateEncode(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| EngineError::TemplateDecode(e.to_string()))
    }
}

impl Default for PhaseTemplate {
    fn default() -> Self {
        Self::starter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::EventBuilder;
    use crate::event::Event;
    use chrono::NaiveDate;

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    // June 10th, 09:00 to 17:00, no repeat.
    fn event() -> Event {
        EventBuilder::new(dt(2024, 5, 1, 12, 0))
            .title("Recital")
            .start_date(dt(2024, 6, 10, 9, 0))
            .end_date(dt(2024, 6, 10, 17, 0))
            .icon("020-balloon")
            .color_hex("#2f261e")
            .build(dt(2024, 5, 1, 12, 0))
            .unwrap()
    }

    fn split_during_template() -> PhaseTemplate {
        // During split at start+2h: [0, 2h] then (2h, end].
        let mut template = PhaseTemplate::starter();
        template.phases.clear();
        template.add_phase(WidgetPhase::with_rule(PhaseTimeRule::new(
            PhaseTimeKind::During,
            TimeOffset::new(0),
            TimeOffset::new(2 * 3600),
        )));
        template.add_phase(WidgetPhase::with_rule(PhaseTimeRule::new(
            PhaseTimeKind::During,
            TimeOffset::new(2 * 3600 + 1),
            TimeOffset::unbounded(),
        )));
        template
    }

    #[test]
    fn test_starter_covers_every_kind() {
        let template = PhaseTemplate::starter();
        for kind in PhaseTimeKind::ALL {
            assert_eq!(template.list(kind).len(), 1, "{kind:?}");
        }
        let during = &template.phases[0].phase_time_rule;
        assert!(during.end_time_offset.is_max);
    }

    #[test]
    fn test_active_phase_selects_by_window() {
        let template = split_during_template();
        let snapshot = event().snapshot();

        let early = template.active_phase(dt(2024, 6, 10, 10, 0), &snapshot).unwrap();
        assert_eq!(early.id, template.phases[0].id);

        let late = template.active_phase(dt(2024, 6, 10, 14, 0), &snapshot).unwrap();
        assert_eq!(late.id, template.phases[1].id);
    }

    #[test]
    fn test_active_phase_boundary_kinds_use_first_entry() {
        let template = PhaseTemplate::starter();
        let snapshot = event().snapshot();

        let before = template.active_phase(dt(2024, 6, 1, 12, 0), &snapshot).unwrap();
        assert_eq!(before.kind(), PhaseTimeKind::BeforeStartDate);

        let after = template.active_phase(dt(2024, 6, 12, 12, 0), &snapshot).unwrap();
        assert_eq!(after.kind(), PhaseTimeKind::AfterEndDate);
    }

    #[test]
    fn test_gap_falls_back_to_last_entry() {
        let mut template = PhaseTemplate::starter();
        template.phases.clear();
        // Only covers the first hour; everything later is a gap.
        template.add_phase(WidgetPhase::with_rule(PhaseTimeRule::new(
            PhaseTimeKind::During,
            TimeOffset::new(0),
            TimeOffset::new(3600),
        )));
        let snapshot = event().snapshot();
        let phase = template.active_phase(dt(2024, 6, 10, 15, 0), &snapshot).unwrap();
        assert_eq!(phase.id, template.phases[0].id);
    }

    #[test]
    fn test_empty_list_is_an_error() {
        let mut template = PhaseTemplate::starter();
        template.phases_before_start_date.clear();
        let snapshot = event().snapshot();
        let result = template.active_phase(dt(2024, 6, 1, 12, 0), &snapshot);
        assert!(matches!(result, Err(EngineError::NoMatchingPhase)));
    }

    #[test]
    fn test_delete_keeps_last_phase() {
        let mut template = PhaseTemplate::starter();
        let id = template.phases[0].id;
        assert!(!template.can_delete(PhaseTimeKind::During));
        assert!(!template.delete_phase(id));
        assert_eq!(template.phases.len(), 1);
    }

    #[test]
    fn test_delete_restores_unbounded_tail() {
        let mut template = split_during_template();
        let last_id = template.phases[1].id;
        assert!(template.can_delete(PhaseTimeKind::During));
        assert!(template.delete_phase(last_id));
        assert_eq!(template.phases.len(), 1);
        // The surviving entry must reach the event end again.
        assert!(template.phases[0].phase_time_rule.end_time_offset.is_max);
    }

    #[test]
    fn test_delete_unknown_id_is_noop() {
        let mut template = split_during_template();
        assert!(!template.delete_phase(Uuid::new_v4()));
        assert_eq!(template.phases.len(), 2);
    }

    #[test]
    fn test_deep_copy_gets_fresh_id() {
        let phase = WidgetPhase::new(PhaseTimeKind::During);
        let copy = phase.deep_copy();
        assert_ne!(phase.id, copy.id);
        assert_eq!(phase.phase_time_rule, copy.phase_time_rule);
    }

    #[test]
    fn test_bind_provider_reaches_all_lists() {
        let mut template = PhaseTemplate::starter();
        let provider: Rc<dyn EventInfoProvider> = Rc::new(event().snapshot());
        template.bind_provider(provider);
        for kind in PhaseTimeKind::ALL {
            assert!(template.list(kind)[0].provider().is_some(), "{kind:?}");
        }
    }

    #[test]
    fn test_json_round_trip_with_legacy_key() {
        let template = split_during_template();
        let json = template.to_json().unwrap();
        assert!(json.contains("phasesAfterStartDate"));
        let back = PhaseTemplate::from_json(&json).unwrap();
        assert_eq!(back, template);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        let result = PhaseTemplate::from_json("{not json");
        assert!(matches!(result, Err(EngineError::TemplateDecode(_))));
    }
}
