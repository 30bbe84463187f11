//! Section completion evaluator
//!
//! Pure functions over one [`AggregateRecord`]. The backend ships several
//! sub-records twice (embedded per dress code / activity, plus a legacy flat
//! array); the precedence between the two shapes is decided here and nowhere
//! else:
//! - Dress preferences: embedded first, legacy array only when the embedded
//!   field is absent for that dress-code id
//! - Activity registration: the embedded flag, the guest's id list and the
//!   legacy registration rows all count as evidence
//!
//! Completion is always recomputed from a whole aggregate. There is no
//! incremental update path.

use portal_model::{
    ActivityId, AggregateRecord, DressCodeId, DressPreference, SectionCompletion,
};
use std::collections::{BTreeMap, BTreeSet};

/// Which representation a reconciled value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evidence<T> {
    /// Newer, embedded representation
    Embedded(T),
    /// Older, flat representation
    Legacy(T),
    /// Neither representation has a value
    Absent,
}

impl<T> Evidence<T> {
    /// Whether any representation supplied a value
    #[inline]
    #[must_use]
    pub fn is_present(&self) -> bool {
        !matches!(self, Evidence::Absent)
    }

    /// Whether the value came from the embedded representation
    #[inline]
    #[must_use]
    pub fn is_embedded(&self) -> bool {
        matches!(self, Evidence::Embedded(_))
    }

    /// The value, regardless of source
    #[inline]
    #[must_use]
    pub fn value(self) -> Option<T> {
        match self {
            Evidence::Embedded(value) | Evidence::Legacy(value) => Some(value),
            Evidence::Absent => None,
        }
    }
}

/// Where registration evidence for an activity was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationSource {
    /// `activities[].is_registered == true`
    Flag,
    /// `guest.registered_activities` contains the id
    GuestList,
    /// `activity_registrations[]` has a row for the id
    RegistrationRow,
}

/// Outfit plan for one dress code, embedded first
#[must_use]
pub fn resolve_dress_preference(
    aggregate: &AggregateRecord,
    dress_code_id: DressCodeId,
) -> Evidence<&DressPreference> {
    if let Some(preference) = aggregate
        .dress_code(dress_code_id)
        .and_then(|code| code.guest_preference.as_ref())
    {
        return Evidence::Embedded(preference);
    }
    aggregate
        .dress_preferences
        .iter()
        .find(|preference| preference.dress_code_id == Some(dress_code_id))
        .map_or(Evidence::Absent, Evidence::Legacy)
}

/// Registration evidence for one activity
#[must_use]
pub fn resolve_activity_registration(
    aggregate: &AggregateRecord,
    activity_id: ActivityId,
) -> Evidence<RegistrationSource> {
    let flagged = aggregate
        .activity(activity_id)
        .and_then(|activity| activity.is_registered)
        .unwrap_or(false);
    if flagged {
        return Evidence::Embedded(RegistrationSource::Flag);
    }

    let listed = aggregate
        .guest
        .registered_activities
        .as_ref()
        .is_some_and(|ids| ids.contains(&activity_id));
    if listed {
        return Evidence::Legacy(RegistrationSource::GuestList);
    }

    if aggregate
        .activity_registrations
        .iter()
        .any(|row| row.activity_id == activity_id)
    {
        return Evidence::Legacy(RegistrationSource::RegistrationRow);
    }
    Evidence::Absent
}

/// One reconciled reading of every dual-shape field
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled<'a> {
    /// Resolved preference per dress-code id, including legacy-only ids
    pub dress_preferences: BTreeMap<DressCodeId, Evidence<&'a DressPreference>>,
    /// Every activity id with registration evidence
    pub registered_activities: BTreeSet<ActivityId>,
}

impl Reconciled<'_> {
    /// Whether the guest is registered for an activity
    #[inline]
    #[must_use]
    pub fn is_registered(&self, activity_id: ActivityId) -> bool {
        self.registered_activities.contains(&activity_id)
    }
}

/// Reconcile embedded and legacy shapes in a single pass
#[must_use]
pub fn reconcile(aggregate: &AggregateRecord) -> Reconciled<'_> {
    let mut dress_preferences = BTreeMap::new();
    for code in &aggregate.dress_codes {
        dress_preferences.insert(code.id, resolve_dress_preference(aggregate, code.id));
    }
    for preference in &aggregate.dress_preferences {
        if let Some(id) = preference.dress_code_id {
            dress_preferences
                .entry(id)
                .or_insert(Evidence::Legacy(preference));
        }
    }

    let mut registered_activities: BTreeSet<ActivityId> = aggregate
        .activities
        .iter()
        .filter(|activity| resolve_activity_registration(aggregate, activity.id).is_present())
        .map(|activity| activity.id)
        .collect();
    if let Some(ids) = &aggregate.guest.registered_activities {
        registered_activities.extend(ids.iter().copied());
    }
    registered_activities.extend(aggregate.activity_registrations.iter().map(|row| row.activity_id));

    Reconciled {
        dress_preferences,
        registered_activities,
    }
}

/// Derive completion flags from an aggregate
#[must_use]
pub fn evaluate_completion(aggregate: &AggregateRecord) -> SectionCompletion {
    let dress = aggregate
        .dress_codes
        .iter()
        .any(|code| code.guest_preference.is_some())
        || !aggregate.dress_preferences.is_empty();

    let activities = aggregate
        .activities
        .iter()
        .any(|activity| resolve_activity_registration(aggregate, activity.id).is_present())
        || !aggregate.activity_registrations.is_empty();

    SectionCompletion {
        rsvp: aggregate.guest.rsvp_status.is_answered(),
        travel: aggregate.travel_info.is_some(),
        hotel: aggregate.hotel_info.is_some() || aggregate.hotel_preference.is_some(),
        dress,
        food: aggregate.food_preference.is_some(),
        activities,
    }
}
