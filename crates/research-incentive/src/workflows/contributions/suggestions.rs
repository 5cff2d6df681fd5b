//! Reviewer edit suggestions and the field coercion applied when the
//! applicant accepts one.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{
    AuthorRole, BookIndexing, BookType, ConferenceSubType, Contribution, PublicationDetails,
    Quartile, VenueScope,
};

/// Suggestion as submitted with a changes-required decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionDraft {
    pub field: String,
    pub suggested_value: String,
    #[serde(default)]
    pub note: Option<String>,
}

/// Applicant's answer to one suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionResponse {
    Accept,
    Reject,
}

/// Claim fields a reviewer may propose edits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionField {
    Title,
    Doi,
    Keywords,
    PublicationDate,
    DeclaredAuthorCount,
    ApplicantRole,
    JournalName,
    Quartile,
    Sjr,
    ImpactFactor,
    IndexedIn,
    BookType,
    Indexing,
    International,
    Publisher,
    BookTitle,
    ConferenceName,
    SubType,
    ProceedingsQuartile,
    Scope,
    BestPaperAward,
    FundingAgency,
    SanctionedAmount,
}

impl ContributionField {
    pub const fn label(self) -> &'static str {
        match self {
            ContributionField::Title => "title",
            ContributionField::Doi => "doi",
            ContributionField::Keywords => "keywords",
            ContributionField::PublicationDate => "publication_date",
            ContributionField::DeclaredAuthorCount => "declared_author_count",
            ContributionField::ApplicantRole => "applicant_role",
            ContributionField::JournalName => "journal_name",
            ContributionField::Quartile => "quartile",
            ContributionField::Sjr => "sjr",
            ContributionField::ImpactFactor => "impact_factor",
            ContributionField::IndexedIn => "indexed_in",
            ContributionField::BookType => "book_type",
            ContributionField::Indexing => "indexing",
            ContributionField::International => "international",
            ContributionField::Publisher => "publisher",
            ContributionField::BookTitle => "book_title",
            ContributionField::ConferenceName => "conference_name",
            ContributionField::SubType => "sub_type",
            ContributionField::ProceedingsQuartile => "proceedings_quartile",
            ContributionField::Scope => "scope",
            ContributionField::BestPaperAward => "best_paper_award",
            ContributionField::FundingAgency => "funding_agency",
            ContributionField::SanctionedAmount => "sanctioned_amount",
        }
    }

    const ALL: [ContributionField; 23] = [
        ContributionField::Title,
        ContributionField::Doi,
        ContributionField::Keywords,
        ContributionField::PublicationDate,
        ContributionField::DeclaredAuthorCount,
        ContributionField::ApplicantRole,
        ContributionField::JournalName,
        ContributionField::Quartile,
        ContributionField::Sjr,
        ContributionField::ImpactFactor,
        ContributionField::IndexedIn,
        ContributionField::BookType,
        ContributionField::Indexing,
        ContributionField::International,
        ContributionField::Publisher,
        ContributionField::BookTitle,
        ContributionField::ConferenceName,
        ContributionField::SubType,
        ContributionField::ProceedingsQuartile,
        ContributionField::Scope,
        ContributionField::BestPaperAward,
        ContributionField::FundingAgency,
        ContributionField::SanctionedAmount,
    ];

    /// Accepts snake_case names as well as camelCase form keys.
    pub fn parse(raw: &str) -> Result<Self, SuggestionError> {
        let normalized = snake_case(raw.trim());
        Self::ALL
            .into_iter()
            .find(|field| field.label() == normalized)
            .ok_or_else(|| SuggestionError::UnknownField {
                field: raw.to_string(),
            })
    }

    /// Fields whose value feeds the incentive calculation.
    pub const fn is_policy_relevant(self) -> bool {
        matches!(
            self,
            ContributionField::PublicationDate
                | ContributionField::DeclaredAuthorCount
                | ContributionField::ApplicantRole
                | ContributionField::Quartile
                | ContributionField::Sjr
                | ContributionField::BookType
                | ContributionField::Indexing
                | ContributionField::International
                | ContributionField::SubType
                | ContributionField::ProceedingsQuartile
                | ContributionField::Scope
                | ContributionField::BestPaperAward
        )
    }

    /// Current value rendered as text, `None` when unset or not carried by
    /// this publication type.
    pub fn current_value(self, contribution: &Contribution) -> Option<String> {
        let details = &contribution.details;
        match self {
            ContributionField::Title => Some(contribution.title.clone()),
            ContributionField::Doi => contribution.doi.clone(),
            ContributionField::Keywords => Some(contribution.keywords.join(", ")),
            ContributionField::PublicationDate => contribution
                .publication_date
                .map(|date| date.format("%Y-%m-%d").to_string()),
            ContributionField::DeclaredAuthorCount => {
                contribution.declared_author_count.map(|count| count.to_string())
            }
            ContributionField::ApplicantRole => {
                contribution.applicant.role.map(|role| role.label().to_string())
            }
            ContributionField::JournalName => match details {
                PublicationDetails::ResearchPaper(journal) => Some(journal.journal_name.clone()),
                _ => None,
            },
            ContributionField::Quartile => match details {
                PublicationDetails::ResearchPaper(journal) => {
                    journal.quartile.map(|quartile| quartile.label().to_string())
                }
                _ => None,
            },
            ContributionField::Sjr => details.sjr().map(|sjr| sjr.to_string()),
            ContributionField::ImpactFactor => match details {
                PublicationDetails::ResearchPaper(journal) => {
                    journal.impact_factor.map(|factor| factor.to_string())
                }
                _ => None,
            },
            ContributionField::IndexedIn => match details {
                PublicationDetails::ResearchPaper(journal) => Some(journal.indexed_in.join(", ")),
                _ => None,
            },
            ContributionField::BookType => match details {
                PublicationDetails::Book(book) | PublicationDetails::BookChapter(book) => {
                    Some(enum_label(&book.book_type))
                }
                _ => None,
            },
            ContributionField::Indexing => match details {
                PublicationDetails::Book(book) | PublicationDetails::BookChapter(book) => {
                    Some(enum_label(&book.indexing))
                }
                _ => None,
            },
            ContributionField::International => match details {
                PublicationDetails::Book(book) | PublicationDetails::BookChapter(book) => {
                    Some(yes_no(book.international))
                }
                _ => None,
            },
            ContributionField::Publisher => match details {
                PublicationDetails::Book(book) | PublicationDetails::BookChapter(book) => {
                    Some(book.publisher.clone())
                }
                _ => None,
            },
            ContributionField::BookTitle => match details {
                PublicationDetails::Book(book) | PublicationDetails::BookChapter(book) => {
                    book.book_title.clone()
                }
                _ => None,
            },
            ContributionField::ConferenceName => match details {
                PublicationDetails::ConferencePaper(conference) => {
                    Some(conference.conference_name.clone())
                }
                _ => None,
            },
            ContributionField::SubType => details
                .conference_sub_type()
                .map(|sub_type| sub_type.label().to_string()),
            ContributionField::ProceedingsQuartile => match details {
                PublicationDetails::ConferencePaper(conference) => conference
                    .proceedings_quartile
                    .map(|quartile| quartile.label().to_string()),
                _ => None,
            },
            ContributionField::Scope => match details {
                PublicationDetails::ConferencePaper(conference) => {
                    Some(enum_label(&conference.scope))
                }
                PublicationDetails::Grant(grant) => Some(enum_label(&grant.scope)),
                _ => None,
            },
            ContributionField::BestPaperAward => match details {
                PublicationDetails::ConferencePaper(conference) => {
                    Some(yes_no(conference.best_paper_award))
                }
                _ => None,
            },
            ContributionField::FundingAgency => match details {
                PublicationDetails::Grant(grant) => Some(grant.funding_agency.clone()),
                _ => None,
            },
            ContributionField::SanctionedAmount => match details {
                PublicationDetails::Grant(grant) => Some(grant.sanctioned_amount.to_string()),
                _ => None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SuggestionError {
    #[error("unknown field `{field}`")]
    UnknownField { field: String },
    #[error("field `{field}` does not apply to a {publication_type} claim")]
    NotApplicable {
        field: &'static str,
        publication_type: &'static str,
    },
    #[error("`{value}` is not a valid value for `{field}`")]
    InvalidValue { field: &'static str, value: String },
    #[error("suggestion {suggestion_id} not found on the latest review")]
    NotFound { suggestion_id: String },
    #[error("suggestion {suggestion_id} was already answered")]
    AlreadyAnswered { suggestion_id: String },
}

/// Copy `raw` onto `field`, coercing it to the field's type.
pub fn apply_suggestion(
    contribution: &mut Contribution,
    field: ContributionField,
    raw: &str,
) -> Result<(), SuggestionError> {
    let value = raw.trim();
    let invalid = || SuggestionError::InvalidValue {
        field: field.label(),
        value: raw.to_string(),
    };
    let not_applicable = SuggestionError::NotApplicable {
        field: field.label(),
        publication_type: contribution.publication_type().label(),
    };

    match field {
        ContributionField::Title => {
            if value.is_empty() {
                return Err(invalid());
            }
            contribution.title = value.to_string();
        }
        ContributionField::Doi => contribution.doi = optional_text(value),
        ContributionField::Keywords => contribution.keywords = parse_list(value),
        ContributionField::PublicationDate => {
            contribution.publication_date = Some(parse_date(value).ok_or_else(invalid)?);
        }
        ContributionField::DeclaredAuthorCount => {
            let count: u16 = value.parse().map_err(|_| invalid())?;
            if count == 0 {
                return Err(invalid());
            }
            contribution.declared_author_count = Some(count);
        }
        ContributionField::ApplicantRole => {
            contribution.applicant.role = Some(AuthorRole::from_label(value).ok_or_else(invalid)?);
        }
        ContributionField::JournalName
        | ContributionField::Quartile
        | ContributionField::Sjr
        | ContributionField::ImpactFactor
        | ContributionField::IndexedIn => {
            let PublicationDetails::ResearchPaper(journal) = &mut contribution.details else {
                return Err(not_applicable);
            };
            match field {
                ContributionField::JournalName => journal.journal_name = value.to_string(),
                ContributionField::Quartile => {
                    journal.quartile = Some(Quartile::from_label(value).ok_or_else(invalid)?);
                }
                ContributionField::Sjr => {
                    journal.sjr = Some(parse_non_negative(value).ok_or_else(invalid)?);
                }
                ContributionField::ImpactFactor => {
                    journal.impact_factor = Some(parse_non_negative(value).ok_or_else(invalid)?);
                }
                _ => journal.indexed_in = parse_list(value),
            }
        }
        ContributionField::BookType
        | ContributionField::Indexing
        | ContributionField::International
        | ContributionField::Publisher
        | ContributionField::BookTitle => {
            let (PublicationDetails::Book(book) | PublicationDetails::BookChapter(book)) =
                &mut contribution.details
            else {
                return Err(not_applicable);
            };
            match field {
                ContributionField::BookType => {
                    book.book_type = BookType::from_label(value).ok_or_else(invalid)?;
                }
                ContributionField::Indexing => {
                    book.indexing = BookIndexing::from_label(value).ok_or_else(invalid)?;
                }
                ContributionField::International => {
                    book.international = parse_bool(value).ok_or_else(invalid)?;
                }
                ContributionField::Publisher => book.publisher = value.to_string(),
                _ => book.book_title = optional_text(value),
            }
        }
        ContributionField::ConferenceName
        | ContributionField::SubType
        | ContributionField::ProceedingsQuartile
        | ContributionField::BestPaperAward => {
            let PublicationDetails::ConferencePaper(conference) = &mut contribution.details else {
                return Err(not_applicable);
            };
            match field {
                ContributionField::ConferenceName => conference.conference_name = value.to_string(),
                ContributionField::SubType => {
                    conference.sub_type =
                        Some(ConferenceSubType::from_label(value).ok_or_else(invalid)?);
                }
                ContributionField::ProceedingsQuartile => {
                    conference.proceedings_quartile =
                        Some(Quartile::from_label(value).ok_or_else(invalid)?);
                }
                _ => conference.best_paper_award = parse_bool(value).ok_or_else(invalid)?,
            }
        }
        ContributionField::Scope => {
            let scope = VenueScope::from_label(value).ok_or_else(invalid)?;
            match &mut contribution.details {
                PublicationDetails::ConferencePaper(conference) => conference.scope = scope,
                PublicationDetails::Grant(grant) => grant.scope = scope,
                _ => return Err(not_applicable),
            }
        }
        ContributionField::FundingAgency | ContributionField::SanctionedAmount => {
            let PublicationDetails::Grant(grant) = &mut contribution.details else {
                return Err(not_applicable);
            };
            if field == ContributionField::FundingAgency {
                grant.funding_agency = value.to_string();
            } else {
                grant.sanctioned_amount = value.replace(',', "").parse().map_err(|_| invalid())?;
            }
        }
    }

    Ok(())
}

fn snake_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 4);
    for (index, ch) in raw.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if index > 0 {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else if ch == '-' || ch == ' ' {
            out.push('_');
        } else {
            out.push(ch);
        }
    }
    out
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" | "1" => Some(true),
        "no" | "n" | "false" | "0" => Some(false),
        _ => None,
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

fn parse_non_negative(value: &str) -> Option<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite() && *number >= 0.0)
}

fn optional_text(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn yes_no(flag: bool) -> String {
    let label = if flag { "yes" } else { "no" };
    label.to_string()
}

/// Wire name of a unit enum (its snake_case serde form).
fn enum_label<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(label)) => label,
        _ => String::new(),
    }
}
