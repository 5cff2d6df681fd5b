//! Author composition analysis.
//!
//! Classifies the applicant and every named contributor once per claim and
//! derives the aggregates the calculator needs to redistribute role
//! percentages. All participants of one claim share the same composition.

use serde::{Deserialize, Serialize};

use super::domain::{AuthorRole, Contribution, ContributorCategory};
use super::policy::RoleSplit;

/// Classification of one participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub is_internal: bool,
    pub is_student: bool,
    pub role: AuthorRole,
}

impl Participant {
    /// Internal when flagged so or the category carries the `internal_` prefix.
    pub fn classify(internal_flag: bool, category: ContributorCategory, role: AuthorRole) -> Self {
        Self {
            is_internal: internal_flag || category.is_internal(),
            is_student: category.is_student(),
            role,
        }
    }
}

/// Aggregates shared by every per-participant calculation of one claim.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AuthorComposition {
    pub internal_count: u32,
    pub external_count: u32,
    /// Internal co-authors (co_author/senior_author), students included.
    pub internal_co_author_count: u32,
    /// Internal co-authors excluding students; the point-pool divisor.
    pub internal_employee_co_author_count: u32,
    pub external_co_author_count: u32,
    /// First/corresponding percentage held by external participants.
    pub external_first_corresponding_pct: f64,
    pub total_author_count: u32,
    /// Named participants besides the applicant.
    pub total_co_author_count: u32,
}

/// Analyze the applicant plus named contributors.
pub fn analyze(
    applicant: Participant,
    contributors: &[Participant],
    declared_author_count: Option<u16>,
    split: RoleSplit,
) -> AuthorComposition {
    let mut composition = AuthorComposition {
        internal_count: 0,
        external_count: 0,
        internal_co_author_count: 0,
        internal_employee_co_author_count: 0,
        external_co_author_count: 0,
        external_first_corresponding_pct: 0.0,
        total_author_count: 0,
        total_co_author_count: contributors.len() as u32,
    };

    let mut first_forfeited = false;
    let mut corresponding_forfeited = false;

    for participant in std::iter::once(&applicant).chain(contributors.iter()) {
        if participant.is_internal {
            composition.internal_count += 1;
            if participant.role.is_co_author() {
                composition.internal_co_author_count += 1;
                if !participant.is_student {
                    composition.internal_employee_co_author_count += 1;
                }
            }
        } else {
            composition.external_count += 1;
            if participant.role.is_co_author() {
                composition.external_co_author_count += 1;
            }
            first_forfeited |= participant.role.holds_first();
            corresponding_forfeited |= participant.role.holds_corresponding();
        }
    }

    if first_forfeited {
        composition.external_first_corresponding_pct += split.first_author_pct;
    }
    if corresponding_forfeited {
        composition.external_first_corresponding_pct += split.corresponding_author_pct;
    }

    let named = 1 + composition.total_co_author_count;
    composition.total_author_count = named.max(u32::from(declared_author_count.unwrap_or(0)));

    composition
}

/// Applicant's own authorship role: declared, or first-and-corresponding when
/// nobody else is on the paper.
pub fn applicant_role(contribution: &Contribution) -> AuthorRole {
    match contribution.applicant.role {
        Some(role) => role,
        None if contribution.contributors.is_empty()
            && contribution.declared_author_count.unwrap_or(1) <= 1 =>
        {
            AuthorRole::FirstAndCorrespondingAuthor
        }
        None => AuthorRole::CoAuthor,
    }
}

/// Applicant participant followed by one participant per contributor, in row order.
pub fn participants(contribution: &Contribution) -> (Participant, Vec<Participant>) {
    let applicant = Participant::classify(
        contribution.applicant.is_internal,
        contribution.applicant.category,
        applicant_role(contribution),
    );
    let contributors = contribution
        .contributors
        .iter()
        .map(|contributor| {
            Participant::classify(contributor.is_internal, contributor.category, contributor.role)
        })
        .collect();
    (applicant, contributors)
}
