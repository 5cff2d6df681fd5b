use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::super::domain::{ConferenceSubType, PublicationType, Quartile, VenueScope};

/// Money and point value attached to a tier or bonus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Award {
    pub amount: u64,
    pub points: u64,
}

impl Award {
    pub const ZERO: Award = Award {
        amount: 0,
        points: 0,
    };

    pub const fn new(amount: u64, points: u64) -> Self {
        Self { amount, points }
    }

    pub fn checked_add(self, other: Award) -> Option<Award> {
        Some(Award {
            amount: self.amount.checked_add(other.amount)?,
            points: self.points.checked_add(other.points)?,
        })
    }
}

/// Percentages of a pool reserved for the first and corresponding author slots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoleSplit {
    pub first_author_pct: f64,
    pub corresponding_author_pct: f64,
}

impl RoleSplit {
    /// What remains for co-authors once the named slots are taken.
    pub fn co_author_pool_pct(&self) -> f64 {
        100.0 - self.first_author_pct - self.corresponding_author_pct
    }
}

impl Default for RoleSplit {
    fn default() -> Self {
        Self {
            first_author_pct: 35.0,
            corresponding_author_pct: 30.0,
        }
    }
}

/// Half-open SJR interval `[min, max)`; `max = None` is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SjrBand {
    pub min: f64,
    #[serde(default)]
    pub max: Option<f64>,
    pub award: Award,
}

impl SjrBand {
    pub fn contains(&self, sjr: f64) -> bool {
        sjr >= self.min && self.max.map_or(true, |max| sjr < max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeAwards {
    pub national: Award,
    pub international: Award,
}

impl ScopeAwards {
    pub fn for_scope(&self, scope: VenueScope) -> Award {
        match scope {
            VenueScope::National => self.national,
            VenueScope::International => self.international,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchPaperRules {
    pub role_split: RoleSplit,
    pub quartiles: BTreeMap<Quartile, Award>,
    /// When configured and the claim carries an SJR, a band match wins over the quartile.
    #[serde(default)]
    pub sjr_bands: Vec<SjrBand>,
}

/// Shared shape for books and book chapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRules {
    pub authored: Award,
    pub edited: Award,
    pub scopus_bonus: Award,
    pub non_indexed_bonus: Award,
    pub sgt_house_bonus: Award,
    pub international_bonus: Award,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedConferenceRules {
    pub role_split: RoleSplit,
    pub proceedings_quartiles: BTreeMap<Quartile, Award>,
    pub international_bonus: Award,
    pub best_paper_bonus: Award,
}

/// Flat-rate conference categories (not indexed, keynote/invited, organizer).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlatConferenceRules {
    pub role_split: RoleSplit,
    pub awards: ScopeAwards,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrantRules {
    pub role_split: RoleSplit,
    pub awards: ScopeAwards,
}

/// Rule set of one policy, discriminated by the publication it governs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicyRules {
    ResearchPaper(ResearchPaperRules),
    Book(BookRules),
    BookChapter(BookRules),
    IndexedConference(IndexedConferenceRules),
    FlatConference(FlatConferenceRules),
    Grant(GrantRules),
}

impl PolicyRules {
    /// Role percentages used for forfeiture; books split equally and carry none.
    pub fn role_split(&self) -> Option<RoleSplit> {
        match self {
            PolicyRules::ResearchPaper(rules) => Some(rules.role_split),
            PolicyRules::IndexedConference(rules) => Some(rules.role_split),
            PolicyRules::FlatConference(rules) => Some(rules.role_split),
            PolicyRules::Grant(rules) => Some(rules.role_split),
            PolicyRules::Book(_) | PolicyRules::BookChapter(_) => None,
        }
    }

    /// Whether these rules may be filed under `scope`.
    pub fn fits(&self, scope: &PolicyScope) -> bool {
        match (self, scope.publication_type, scope.sub_type) {
            (PolicyRules::ResearchPaper(_), PublicationType::ResearchPaper, None) => true,
            (PolicyRules::Book(_), PublicationType::Book, None) => true,
            (PolicyRules::BookChapter(_), PublicationType::BookChapter, None) => true,
            (PolicyRules::Grant(_), PublicationType::Grant, None) => true,
            (
                PolicyRules::IndexedConference(_),
                PublicationType::ConferencePaper,
                Some(ConferenceSubType::ScopusIndexed),
            ) => true,
            (PolicyRules::FlatConference(_), PublicationType::ConferencePaper, Some(sub_type)) => {
                sub_type != ConferenceSubType::ScopusIndexed
            }
            _ => false,
        }
    }
}

/// Key a policy is filed and looked up under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PolicyScope {
    pub publication_type: PublicationType,
    #[serde(default)]
    pub sub_type: Option<ConferenceSubType>,
}

impl PolicyScope {
    pub const fn new(publication_type: PublicationType, sub_type: Option<ConferenceSubType>) -> Self {
        Self {
            publication_type,
            sub_type,
        }
    }
}

/// Versioned, date-ranged incentive policy maintained by administrators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncentivePolicy {
    pub id: String,
    pub scope: PolicyScope,
    pub effective_from: NaiveDate,
    #[serde(default)]
    pub effective_to: Option<NaiveDate>,
    pub rules: PolicyRules,
}

impl IncentivePolicy {
    /// Both bounds are inclusive.
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        date >= self.effective_from && self.effective_to.map_or(true, |to| date <= to)
    }

    pub fn overlaps(&self, other: &IncentivePolicy) -> bool {
        if self.scope != other.scope {
            return false;
        }
        let starts_before_other_ends = other.effective_to.map_or(true, |to| self.effective_from <= to);
        let other_starts_before_end = self.effective_to.map_or(true, |to| other.effective_from <= to);
        starts_before_other_ends && other_starts_before_end
    }
}
