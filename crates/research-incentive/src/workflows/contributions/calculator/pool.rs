use serde::{Deserialize, Serialize};

use super::super::domain::{
    BookDetails, BookIndexing, BookType, ConferenceDetails, ConferenceSubType, GrantDetails,
    JournalDetails, PublicationDetails, Quartile, VenueScope,
};
use super::super::policy::{
    Award, BookRules, FlatConferenceRules, GrantRules, IndexedConferenceRules, PolicyDefaults,
    PolicyRules, ResearchPaperRules, RoleSplit, SjrBand,
};
use super::CalculationError;

/// How a pool is shared among the participants of one claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Distribution {
    /// Role percentages (first/corresponding/co-author).
    RoleWeighted,
    /// Equal parts across the total author count.
    EqualSplit,
    /// The whole pool goes to the one person claiming it.
    SoleRecipient,
}

/// Which table or rule produced the pool; recorded on every trace.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "branch", rename_all = "snake_case")]
pub enum PoolBranch {
    JournalQuartile { quartile: Quartile },
    ConfiguredSjrBand { sjr: f64 },
    FallbackSjrBand { sjr: f64 },
    Book {
        book_type: BookType,
        indexing: BookIndexing,
        international: bool,
    },
    ProceedingsQuartile { quartile: Quartile },
    FlatConference {
        sub_type: ConferenceSubType,
        scope: VenueScope,
    },
    Grant { scope: VenueScope },
    Unmatched,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Pool {
    pub branch: PoolBranch,
    pub award: Award,
    pub distribution: Distribution,
    pub role_split: RoleSplit,
}

impl Pool {
    fn unmatched(distribution: Distribution, role_split: RoleSplit) -> Self {
        Self {
            branch: PoolBranch::Unmatched,
            award: Award::ZERO,
            distribution,
            role_split,
        }
    }
}

pub(crate) fn resolve_pool(
    rules: &PolicyRules,
    details: &PublicationDetails,
    sjr: Option<f64>,
    defaults: &PolicyDefaults,
) -> Result<Pool, CalculationError> {
    match (rules, details) {
        (PolicyRules::ResearchPaper(rules), PublicationDetails::ResearchPaper(journal)) => {
            Ok(research_paper_pool(rules, journal, sjr, &defaults.sjr_fallback))
        }
        (PolicyRules::Book(rules), PublicationDetails::Book(book))
        | (PolicyRules::BookChapter(rules), PublicationDetails::BookChapter(book)) => {
            book_pool(rules, book)
        }
        (PolicyRules::IndexedConference(rules), PublicationDetails::ConferencePaper(conference)) => {
            indexed_conference_pool(rules, conference)
        }
        (PolicyRules::FlatConference(rules), PublicationDetails::ConferencePaper(conference)) => {
            flat_conference_pool(rules, conference)
        }
        (PolicyRules::Grant(rules), PublicationDetails::Grant(grant)) => Ok(grant_pool(rules, grant)),
        _ => Err(CalculationError::RulesMismatch {
            publication_type: details.publication_type().label(),
        }),
    }
}

fn research_paper_pool(
    rules: &ResearchPaperRules,
    journal: &JournalDetails,
    sjr: Option<f64>,
    fallback: &[SjrBand],
) -> Pool {
    let configured_band = sjr.and_then(|value| {
        rules
            .sjr_bands
            .iter()
            .find(|band| band.contains(value))
            .map(|band| (value, band.award))
    });
    if let Some((sjr, award)) = configured_band {
        return Pool {
            branch: PoolBranch::ConfiguredSjrBand { sjr },
            award,
            distribution: Distribution::RoleWeighted,
            role_split: rules.role_split,
        };
    }

    let quartile_award = journal
        .quartile
        .and_then(|quartile| rules.quartiles.get(&quartile).map(|award| (quartile, *award)));
    if let Some((quartile, award)) = quartile_award {
        return Pool {
            branch: PoolBranch::JournalQuartile { quartile },
            award,
            distribution: Distribution::RoleWeighted,
            role_split: rules.role_split,
        };
    }

    let fallback_band = sjr.and_then(|value| {
        fallback
            .iter()
            .find(|band| band.contains(value))
            .map(|band| (value, band.award))
    });
    match fallback_band {
        Some((sjr, award)) => Pool {
            branch: PoolBranch::FallbackSjrBand { sjr },
            award,
            distribution: Distribution::RoleWeighted,
            role_split: rules.role_split,
        },
        None => Pool::unmatched(Distribution::RoleWeighted, rules.role_split),
    }
}

fn book_pool(rules: &BookRules, book: &BookDetails) -> Result<Pool, CalculationError> {
    let base = match book.book_type {
        BookType::Authored => rules.authored,
        BookType::Edited => rules.edited,
    };
    let indexing_bonus = match book.indexing {
        BookIndexing::Scopus => rules.scopus_bonus,
        BookIndexing::NonIndexed => rules.non_indexed_bonus,
        BookIndexing::SgtHouse => rules.sgt_house_bonus,
    };
    let international_bonus = if book.international {
        rules.international_bonus
    } else {
        Award::ZERO
    };

    let award = base
        .checked_add(indexing_bonus)
        .and_then(|award| award.checked_add(international_bonus))
        .ok_or(CalculationError::Overflow)?;

    Ok(Pool {
        branch: PoolBranch::Book {
            book_type: book.book_type,
            indexing: book.indexing,
            international: book.international,
        },
        award,
        distribution: Distribution::EqualSplit,
        role_split: RoleSplit::default(),
    })
}

fn indexed_conference_pool(
    rules: &IndexedConferenceRules,
    conference: &ConferenceDetails,
) -> Result<Pool, CalculationError> {
    let matched = conference.proceedings_quartile.and_then(|quartile| {
        rules
            .proceedings_quartiles
            .get(&quartile)
            .map(|award| (quartile, *award))
    });
    let Some((quartile, base)) = matched else {
        return Ok(Pool::unmatched(Distribution::RoleWeighted, rules.role_split));
    };

    let mut award = base;
    if conference.scope == VenueScope::International {
        award = award
            .checked_add(rules.international_bonus)
            .ok_or(CalculationError::Overflow)?;
    }
    if conference.best_paper_award {
        award = award
            .checked_add(rules.best_paper_bonus)
            .ok_or(CalculationError::Overflow)?;
    }

    Ok(Pool {
        branch: PoolBranch::ProceedingsQuartile { quartile },
        award,
        distribution: Distribution::RoleWeighted,
        role_split: rules.role_split,
    })
}

fn flat_conference_pool(
    rules: &FlatConferenceRules,
    conference: &ConferenceDetails,
) -> Result<Pool, CalculationError> {
    let (sub_type, distribution) = match conference.sub_type {
        Some(sub_type @ ConferenceSubType::NotIndexed) => (sub_type, Distribution::EqualSplit),
        Some(sub_type @ (ConferenceSubType::KeynoteInvited | ConferenceSubType::Organizer)) => {
            (sub_type, Distribution::SoleRecipient)
        }
        Some(ConferenceSubType::ScopusIndexed) | None => {
            return Err(CalculationError::RulesMismatch {
                publication_type: "conference_paper",
            })
        }
    };

    Ok(Pool {
        branch: PoolBranch::FlatConference {
            sub_type,
            scope: conference.scope,
        },
        award: rules.awards.for_scope(conference.scope),
        distribution,
        role_split: rules.role_split,
    })
}

fn grant_pool(rules: &GrantRules, grant: &GrantDetails) -> Pool {
    Pool {
        branch: PoolBranch::Grant { scope: grant.scope },
        award: rules.awards.for_scope(grant.scope),
        distribution: Distribution::RoleWeighted,
        role_split: rules.role_split,
    }
}
