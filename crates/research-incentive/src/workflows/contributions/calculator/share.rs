use super::super::composition::AuthorComposition;
use super::super::domain::AuthorRole;
use super::super::policy::RoleSplit;
use super::pool::{Distribution, Pool};
use super::CalculationRequest;

/// Percentages of the pool one participant receives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SharePercentages {
    pub money: f64,
    pub points: f64,
}

impl SharePercentages {
    fn uniform(pct: f64) -> Self {
        Self {
            money: pct,
            points: pct,
        }
    }
}

pub(crate) fn percentages(
    pool: &Pool,
    request: &CalculationRequest<'_>,
    composition: &AuthorComposition,
) -> SharePercentages {
    match pool.distribution {
        Distribution::SoleRecipient if request.is_applicant => SharePercentages::uniform(100.0),
        Distribution::SoleRecipient => SharePercentages::uniform(0.0),
        Distribution::EqualSplit => {
            SharePercentages::uniform(100.0 / f64::from(composition.total_author_count.max(1)))
        }
        Distribution::RoleWeighted => role_weighted(request.role, composition, pool.role_split),
    }
}

fn role_weighted(
    role: AuthorRole,
    composition: &AuthorComposition,
    split: RoleSplit,
) -> SharePercentages {
    if composition.total_author_count == 1 {
        return SharePercentages::uniform(100.0 - composition.external_first_corresponding_pct);
    }
    if composition.total_author_count == 2 && composition.total_co_author_count == 0 {
        return SharePercentages::uniform(50.0);
    }

    match role {
        AuthorRole::FirstAndCorrespondingAuthor => {
            SharePercentages::uniform(split.first_author_pct + split.corresponding_author_pct)
        }
        AuthorRole::FirstAuthor => SharePercentages::uniform(split.first_author_pct),
        AuthorRole::CorrespondingAuthor => {
            SharePercentages::uniform(split.corresponding_author_pct)
        }
        AuthorRole::CoAuthor | AuthorRole::SeniorAuthor => {
            let co_pool = split.co_author_pool_pct();
            SharePercentages {
                money: co_pool / f64::from(composition.internal_co_author_count.max(1)),
                points: co_pool / f64::from(composition.internal_employee_co_author_count.max(1)),
            }
        }
    }
}
