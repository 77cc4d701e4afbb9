//! Layout and panel-balance detection.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::classify::roles::ResolvedRoles;
use crate::data::{Dataset, RowIndex};
use crate::domain::{Layout, PanelBalance};

/// Layout of `dataset`.
///
/// Precedence: an entity column together with a time column (or an
/// entity/time row index) is a panel; otherwise a date-time index or any
/// time column makes a time series; everything else is a cross section.
pub fn detect_layout(dataset: &Dataset) -> Layout {
    layout_from_roles(dataset, &ResolvedRoles::resolve(dataset))
}

pub fn layout_from_roles(dataset: &Dataset, roles: &ResolvedRoles) -> Layout {
    let layout = match dataset.index() {
        Some(RowIndex::EntityTime { .. }) => Layout::Panel,
        _ if roles.entity.is_some() && roles.time.is_some() => Layout::Panel,
        Some(RowIndex::DateTime(_)) => Layout::TimeSeries,
        _ if roles.time.is_some() => Layout::TimeSeries,
        _ => Layout::CrossSection,
    };
    debug!(
        layout = layout.label(),
        entity = ?roles.entity,
        time = ?roles.time,
        "detected layout"
    );
    layout
}

/// Balance of a panel: `fixed` when every entity has the same number of
/// distinct time points.
///
/// Returns `None` for non-panel layouts and `Unfixed` when the entity or time
/// column cannot be resolved (see `Metadata::panel_roles_resolved`).
pub fn detect_panel_balance(dataset: &Dataset, layout: Layout) -> PanelBalance {
    balance_from_roles(dataset, layout, &ResolvedRoles::resolve(dataset))
}

pub fn balance_from_roles(dataset: &Dataset, layout: Layout, roles: &ResolvedRoles) -> PanelBalance {
    if layout != Layout::Panel {
        return PanelBalance::None;
    }

    let keys: Vec<(Option<String>, Option<String>)> = match (dataset.index(), &roles.entity, &roles.time) {
        (_, Some(entity), Some(time)) => {
            let (Some(entity), Some(time)) = (dataset.column(entity), dataset.column(time)) else {
                return PanelBalance::Unfixed;
            };
            (0..dataset.row_count())
                .map(|row| (entity.key_at(row), time.key_at(row)))
                .collect()
        }
        (Some(RowIndex::EntityTime { entities, times }), _, _) => entities
            .iter()
            .zip(times)
            .map(|(e, t)| (Some(e.clone()), Some(t.clone())))
            .collect(),
        _ => return PanelBalance::Unfixed,
    };

    let mut periods: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (entity, time) in keys {
        let Some(entity) = entity else { continue };
        let slot = periods.entry(entity).or_default();
        if let Some(time) = time {
            slot.insert(time);
        }
    }

    let mut counts = periods.values().map(BTreeSet::len);
    let Some(first) = counts.next() else {
        return PanelBalance::Unfixed;
    };
    if counts.all(|c| c == first) {
        PanelBalance::Fixed
    } else {
        PanelBalance::Unfixed
    }
}
