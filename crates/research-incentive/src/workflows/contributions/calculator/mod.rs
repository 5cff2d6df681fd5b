//! Per-contributor incentive calculation.
//!
//! Pure with respect to the claim: the only collaborator is the read-only
//! policy resolver. Failures never escape [`IncentiveCalculator::calculate`];
//! they collapse to a zero award whose trace is marked `failed`, so a broken
//! policy row cannot block an approval yet stays visible in the logs.

mod pool;
mod share;

pub use pool::{Distribution, PoolBranch};

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::composition::{self, AuthorComposition, Participant};
use super::domain::{AuthorRole, Contribution, PublicationDetails};
use super::policy::{
    Award, PolicyDefaults, PolicyResolver, PolicySource, PolicyStoreError, Resolution, RoleSplit,
};

/// Inputs for one participant of one claim.
#[derive(Debug, Clone, Copy)]
pub struct CalculationRequest<'a> {
    pub details: &'a PublicationDetails,
    pub publication_date: Option<NaiveDate>,
    pub role: AuthorRole,
    pub is_student: bool,
    pub is_internal: bool,
    /// Filed the claim. Sole-recipient awards are paid to the applicant only.
    pub is_applicant: bool,
    /// Overrides the SJR carried on the journal details when set.
    pub sjr: Option<f64>,
    pub composition: &'a AuthorComposition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CalculationStatus {
    Computed,
    ExternalContributor,
    AwaitingSubType,
    Failed { reason: String },
}

/// Audit record of the branch taken and the percentages applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationTrace {
    pub status: CalculationStatus,
    pub policy: Option<PolicySource>,
    pub branch: Option<PoolBranch>,
    pub distribution: Option<Distribution>,
    pub pool: Award,
    pub money_pct: f64,
    pub points_pct: f64,
}

impl CalculationTrace {
    fn empty(status: CalculationStatus) -> Self {
        Self {
            status,
            policy: None,
            branch: None,
            distribution: None,
            pool: Award::ZERO,
            money_pct: 0.0,
            points_pct: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationOutcome {
    pub incentive_amount: u64,
    pub points: u64,
    pub trace: CalculationTrace,
}

impl CalculationOutcome {
    fn zero(status: CalculationStatus) -> Self {
        Self {
            incentive_amount: 0,
            points: 0,
            trace: CalculationTrace::empty(status),
        }
    }

    pub fn failed(&self) -> bool {
        matches!(self.trace.status, CalculationStatus::Failed { .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CalculationError {
    #[error(transparent)]
    Policy(#[from] PolicyStoreError),
    #[error("policy rules do not apply to a {publication_type} claim")]
    RulesMismatch { publication_type: &'static str },
    #[error("share percentage {value} is outside 0..=100")]
    InvalidPercentage { value: f64 },
    #[error("incentive arithmetic overflowed")]
    Overflow,
}

#[derive(Debug, Clone, Copy)]
enum Rounding {
    Nearest,
    Down,
}

/// Shares computed for a whole claim against a single composition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareAssessment {
    pub composition: AuthorComposition,
    pub applicant: CalculationOutcome,
    /// One entry per contributor row, in row order.
    pub contributors: Vec<CalculationOutcome>,
}

impl ShareAssessment {
    pub fn total_incentive(&self) -> u64 {
        self.contributors
            .iter()
            .fold(self.applicant.incentive_amount, |acc, outcome| {
                acc.saturating_add(outcome.incentive_amount)
            })
    }

    pub fn total_points(&self) -> u64 {
        self.contributors
            .iter()
            .fold(self.applicant.points, |acc, outcome| {
                acc.saturating_add(outcome.points)
            })
    }

    /// Write the applicant and contributor shares onto the claim.
    pub fn apply_to(&self, contribution: &mut Contribution) {
        contribution.calculated_incentive_amount = self.applicant.incentive_amount;
        contribution.calculated_points = self.applicant.points;
        for (contributor, outcome) in contribution
            .contributors
            .iter_mut()
            .zip(self.contributors.iter())
        {
            contributor.incentive_share = outcome.incentive_amount;
            contributor.points_share = outcome.points;
        }
    }
}

pub struct IncentiveCalculator {
    resolver: PolicyResolver,
}

impl IncentiveCalculator {
    pub fn new(resolver: PolicyResolver) -> Self {
        Self { resolver }
    }

    pub fn with_defaults(defaults: Arc<PolicyDefaults>) -> Self {
        Self::new(PolicyResolver::built_in(defaults))
    }

    pub fn defaults(&self) -> &PolicyDefaults {
        self.resolver.defaults()
    }

    /// Award for one participant. External participants get nothing without a
    /// policy lookup; any internal failure yields zero with a `failed` trace.
    pub fn calculate(&self, request: &CalculationRequest<'_>, today: NaiveDate) -> CalculationOutcome {
        if !request.is_internal {
            return CalculationOutcome::zero(CalculationStatus::ExternalContributor);
        }

        match self.try_calculate(request, today) {
            Ok(outcome) => {
                debug!(
                    publication_type = request.details.publication_type().label(),
                    role = request.role.label(),
                    status = ?outcome.trace.status,
                    branch = ?outcome.trace.branch,
                    pool_amount = outcome.trace.pool.amount,
                    pool_points = outcome.trace.pool.points,
                    money_pct = outcome.trace.money_pct,
                    points_pct = outcome.trace.points_pct,
                    incentive = outcome.incentive_amount,
                    points = outcome.points,
                    "incentive share calculated"
                );
                outcome
            }
            Err(err) => {
                error!(
                    publication_type = request.details.publication_type().label(),
                    role = request.role.label(),
                    error = %err,
                    "incentive calculation failed; recording zero award for manual audit"
                );
                CalculationOutcome::zero(CalculationStatus::Failed {
                    reason: err.to_string(),
                })
            }
        }
    }

    fn try_calculate(
        &self,
        request: &CalculationRequest<'_>,
        today: NaiveDate,
    ) -> Result<CalculationOutcome, CalculationError> {
        let date = request.publication_date.unwrap_or(today);
        let resolved = match self.resolver.resolve(
            request.details.publication_type(),
            request.details.conference_sub_type(),
            date,
        )? {
            Resolution::AwaitingSubType => {
                return Ok(CalculationOutcome::zero(CalculationStatus::AwaitingSubType))
            }
            Resolution::Resolved(resolved) => resolved,
        };

        let sjr = request.sjr.or_else(|| request.details.sjr());
        let pool = pool::resolve_pool(
            &resolved.rules,
            request.details,
            sjr,
            self.resolver.defaults(),
        )?;
        let percentages = share::percentages(&pool, request, request.composition);

        let incentive_amount = apply_percentage(pool.award.amount, percentages.money, Rounding::Nearest)?;
        let points = if request.is_student {
            0
        } else {
            apply_percentage(pool.award.points, percentages.points, Rounding::Down)?
        };

        Ok(CalculationOutcome {
            incentive_amount,
            points,
            trace: CalculationTrace {
                status: CalculationStatus::Computed,
                policy: Some(resolved.source),
                branch: Some(pool.branch),
                distribution: Some(pool.distribution),
                pool: pool.award,
                money_pct: percentages.money,
                points_pct: percentages.points,
            },
        })
    }

    /// Role percentages of the policy active for the claim, used to size the
    /// external forfeiture. Lookup failures fall back to the default split.
    pub fn role_split_for(&self, details: &PublicationDetails, date: NaiveDate) -> RoleSplit {
        match self.resolver.resolve(
            details.publication_type(),
            details.conference_sub_type(),
            date,
        ) {
            Ok(Resolution::Resolved(resolved)) => resolved.rules.role_split().unwrap_or_default(),
            Ok(Resolution::AwaitingSubType) => RoleSplit::default(),
            Err(err) => {
                error!(error = %err, "policy lookup failed while sizing forfeiture; using default split");
                RoleSplit::default()
            }
        }
    }

    /// Analyze the claim's composition once and price every participant against it.
    pub fn assess(&self, contribution: &Contribution, today: NaiveDate) -> ShareAssessment {
        let (applicant, contributors) = composition::participants(contribution);
        self.assess_participants(
            &contribution.details,
            contribution.publication_date,
            contribution.declared_author_count,
            applicant,
            &contributors,
            today,
        )
    }

    /// Same as [`IncentiveCalculator::assess`] for participants that are not
    /// attached to a stored claim (calculation previews).
    pub fn assess_participants(
        &self,
        details: &PublicationDetails,
        publication_date: Option<NaiveDate>,
        declared_author_count: Option<u16>,
        applicant: Participant,
        contributors: &[Participant],
        today: NaiveDate,
    ) -> ShareAssessment {
        let split = self.role_split_for(details, publication_date.unwrap_or(today));
        let composition =
            composition::analyze(applicant, contributors, declared_author_count, split);

        let request = |participant: &Participant, is_applicant: bool| CalculationRequest {
            details,
            publication_date,
            role: participant.role,
            is_student: participant.is_student,
            is_internal: participant.is_internal,
            is_applicant,
            sjr: None,
            composition: &composition,
        };

        let applicant_outcome = self.calculate(&request(&applicant, true), today);
        let contributor_outcomes = contributors
            .iter()
            .map(|participant| self.calculate(&request(participant, false), today))
            .collect();

        ShareAssessment {
            composition,
            applicant: applicant_outcome,
            contributors: contributor_outcomes,
        }
    }
}

fn apply_percentage(value: u64, pct: f64, rounding: Rounding) -> Result<u64, CalculationError> {
    if !pct.is_finite() || !(0.0..=100.0).contains(&pct) {
        return Err(CalculationError::InvalidPercentage { value: pct });
    }

    let raw = value as f64 * pct / 100.0;
    let rounded = match rounding {
        Rounding::Nearest => raw.round(),
        // Absorb float noise such as 6.9999999 before truncating.
        Rounding::Down => (raw + 1e-9).floor(),
    };
    if rounded >= u64::MAX as f64 {
        return Err(CalculationError::Overflow);
    }
    Ok(rounded as u64)
}
