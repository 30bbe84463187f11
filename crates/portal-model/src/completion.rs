//! Derived per-section completion flags

use serde::{Deserialize, Serialize};
use std::fmt;

/// Portal section a guest fills in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Rsvp,
    Travel,
    Hotel,
    Dress,
    Food,
    Activities,
}

impl Section {
    /// All sections in display order
    pub const ALL: [Section; 6] = [
        Section::Rsvp,
        Section::Travel,
        Section::Hotel,
        Section::Dress,
        Section::Food,
        Section::Activities,
    ];
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Section::Rsvp => "rsvp",
            Section::Travel => "travel",
            Section::Hotel => "hotel",
            Section::Dress => "dress",
            Section::Food => "food",
            Section::Activities => "activities",
        })
    }
}

/// Completion flags. Never persisted; always recomputed from a fetched aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SectionCompletion {
    pub rsvp: bool,
    pub travel: bool,
    pub hotel: bool,
    pub dress: bool,
    pub food: bool,
    pub activities: bool,
}

impl SectionCompletion {
    /// Flag for one section
    #[inline]
    #[must_use]
    pub fn get(&self, section: Section) -> bool {
        match section {
            Section::Rsvp => self.rsvp,
            Section::Travel => self.travel,
            Section::Hotel => self.hotel,
            Section::Dress => self.dress,
            Section::Food => self.food,
            Section::Activities => self.activities,
        }
    }

    /// `(section, done)` pairs in display order
    pub fn sections(&self) -> impl Iterator<Item = (Section, bool)> + '_ {
        Section::ALL.iter().map(move |section| (*section, self.get(*section)))
    }

    /// Number of completed sections
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.sections().filter(|(_, done)| *done).count()
    }

    /// Number of sections
    #[inline]
    #[must_use]
    pub fn total(&self) -> usize {
        Section::ALL.len()
    }

    /// Every section done
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed_count() == self.total()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_completed_sections() {
        let completion = SectionCompletion {
            rsvp: true,
            food: true,
            ..SectionCompletion::default()
        };
        assert_eq!(completion.completed_count(), 2);
        assert_eq!(completion.total(), 6);
        assert!(!completion.is_complete());
        assert!(completion.get(Section::Food));
        assert!(!completion.get(Section::Hotel));
    }
}
