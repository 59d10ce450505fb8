//! Applying extracted criteria to a session's filter set.
//!
//! This is the only path by which collaborator output reaches a
//! [`FilterSet`]. It keeps two properties: essential criteria are never
//! cleared by a merge, and no more than `max_optional` optional criteria are
//! ever set at once. Changing an optional criterion that is already set is
//! always allowed; a new one is dropped once the cap is reached.

use dwell_core::{FilterPatch, FilterSet, OptionalFilter};

/// What a merge changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeReport {
    /// Field names whose value was written.
    pub applied: Vec<&'static str>,
    /// Optional criteria refused because the cap was reached.
    pub dropped_optional: Vec<OptionalFilter>,
}

/// Merge `patch` into `filters`, honouring the optional cap.
pub fn merge_patch(
    filters: &mut FilterSet,
    patch: FilterPatch,
    max_optional: usize,
) -> MergeReport {
    let mut report = MergeReport::default();

    if let Some(v) = patch.district {
        filters.district = Some(v);
        report.applied.push("district");
    }
    if let Some(v) = patch.min_area {
        filters.min_area = Some(v);
        report.applied.push("min_area");
    }
    if let Some(v) = patch.status {
        filters.status = Some(v);
        report.applied.push("status");
    }
    if let Some(v) = patch.max_budget {
        filters.max_budget = Some(v);
        report.applied.push("max_budget");
    }
    if let Some(v) = patch.bedrooms {
        filters.bedrooms = Some(v);
        report.applied.push("bedrooms");
    }

    merge_optional(
        filters,
        OptionalFilter::PetFriendly,
        patch.pet_friendly,
        max_optional,
        &mut report,
        |f| &mut f.pet_friendly,
    );
    merge_optional(
        filters,
        OptionalFilter::Balcony,
        patch.balcony,
        max_optional,
        &mut report,
        |f| &mut f.balcony,
    );
    merge_optional(
        filters,
        OptionalFilter::Terrace,
        patch.terrace,
        max_optional,
        &mut report,
        |f| &mut f.terrace,
    );
    merge_optional(
        filters,
        OptionalFilter::Furnished,
        patch.furnished,
        max_optional,
        &mut report,
        |f| &mut f.furnished,
    );
    merge_optional(
        filters,
        OptionalFilter::Bathrooms,
        patch.bathrooms,
        max_optional,
        &mut report,
        |f| &mut f.bathrooms,
    );

    report
}

fn merge_optional<T>(
    filters: &mut FilterSet,
    which: OptionalFilter,
    value: Option<T>,
    max_optional: usize,
    report: &mut MergeReport,
    slot: impl Fn(&mut FilterSet) -> &mut Option<T>,
) {
    let Some(value) = value else {
        return;
    };
    if filters.has_optional(which) || filters.optional_count() < max_optional {
        *slot(filters) = Some(value);
        report.applied.push(which.as_str());
    } else {
        report.dropped_optional.push(which);
    }
}
