use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for research contributions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContributionId(pub String);

/// Identifier of a portal user (applicant, mentor, reviewer, approver).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReviewId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SuggestionId(pub String);

/// Kind of research output an incentive claim is filed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicationType {
    ResearchPaper,
    Book,
    BookChapter,
    ConferencePaper,
    Grant,
}

impl PublicationType {
    pub const fn label(self) -> &'static str {
        match self {
            PublicationType::ResearchPaper => "research_paper",
            PublicationType::Book => "book",
            PublicationType::BookChapter => "book_chapter",
            PublicationType::ConferencePaper => "conference_paper",
            PublicationType::Grant => "grant",
        }
    }

    /// Prefix used when minting application numbers.
    pub const fn application_prefix(self) -> &'static str {
        match self {
            PublicationType::ResearchPaper => "RP",
            PublicationType::Book => "BK",
            PublicationType::BookChapter => "BC",
            PublicationType::ConferencePaper => "CP",
            PublicationType::Grant => "GR",
        }
    }
}

/// Venue ranking tier used to size indexed incentive pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quartile {
    Top1,
    Top5,
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quartile {
    pub const fn label(self) -> &'static str {
        match self {
            Quartile::Top1 => "Top 1%",
            Quartile::Top5 => "Top 5%",
            Quartile::Q1 => "Q1",
            Quartile::Q2 => "Q2",
            Quartile::Q3 => "Q3",
            Quartile::Q4 => "Q4",
        }
    }

    /// Accepts both display labels ("Top 1%") and wire names ("top1").
    pub fn from_label(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '%' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "top1" => Some(Quartile::Top1),
            "top5" => Some(Quartile::Top5),
            "q1" => Some(Quartile::Q1),
            "q2" => Some(Quartile::Q2),
            "q3" => Some(Quartile::Q3),
            "q4" => Some(Quartile::Q4),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConferenceSubType {
    ScopusIndexed,
    NotIndexed,
    KeynoteInvited,
    Organizer,
}

impl ConferenceSubType {
    pub const fn label(self) -> &'static str {
        match self {
            ConferenceSubType::ScopusIndexed => "scopus_indexed",
            ConferenceSubType::NotIndexed => "not_indexed",
            ConferenceSubType::KeynoteInvited => "keynote_invited",
            ConferenceSubType::Organizer => "organizer",
        }
    }

    pub fn from_label(raw: &str) -> Option<Self> {
        match normalize_label(raw).as_str() {
            "scopus_indexed" | "scopus" | "indexed" => Some(ConferenceSubType::ScopusIndexed),
            "not_indexed" | "non_indexed" => Some(ConferenceSubType::NotIndexed),
            "keynote_invited" | "keynote" | "invited" | "keynote_invited_talk" => {
                Some(ConferenceSubType::KeynoteInvited)
            }
            "organizer" | "organiser" => Some(ConferenceSubType::Organizer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VenueScope {
    National,
    International,
}

impl VenueScope {
    pub fn from_label(raw: &str) -> Option<Self> {
        match normalize_label(raw).as_str() {
            "national" => Some(VenueScope::National),
            "international" => Some(VenueScope::International),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookType {
    Authored,
    Edited,
}

impl BookType {
    pub fn from_label(raw: &str) -> Option<Self> {
        match normalize_label(raw).as_str() {
            "authored" => Some(BookType::Authored),
            "edited" => Some(BookType::Edited),
            _ => None,
        }
    }
}

/// Where a book or chapter is indexed; `SgtHouse` is the university's own press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookIndexing {
    Scopus,
    NonIndexed,
    SgtHouse,
}

impl BookIndexing {
    pub fn from_label(raw: &str) -> Option<Self> {
        match normalize_label(raw).as_str() {
            "scopus" | "scopus_indexed" => Some(BookIndexing::Scopus),
            "non_indexed" | "not_indexed" => Some(BookIndexing::NonIndexed),
            "sgt_house" | "sgt_publication_house" => Some(BookIndexing::SgtHouse),
            _ => None,
        }
    }
}

fn normalize_label(raw: &str) -> String {
    raw.trim()
        .to_ascii_lowercase()
        .replace(['-', ' ', '/'], "_")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalDetails {
    pub journal_name: String,
    #[serde(default)]
    pub quartile: Option<Quartile>,
    #[serde(default)]
    pub sjr: Option<f64>,
    #[serde(default)]
    pub impact_factor: Option<f64>,
    #[serde(default)]
    pub indexed_in: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookDetails {
    pub book_type: BookType,
    pub indexing: BookIndexing,
    #[serde(default)]
    pub international: bool,
    pub publisher: String,
    #[serde(default)]
    pub book_title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConferenceDetails {
    pub conference_name: String,
    /// Left empty while the applicant is still drafting.
    #[serde(default)]
    pub sub_type: Option<ConferenceSubType>,
    #[serde(default)]
    pub proceedings_quartile: Option<Quartile>,
    pub scope: VenueScope,
    #[serde(default)]
    pub best_paper_award: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantDetails {
    pub funding_agency: String,
    pub scope: VenueScope,
    pub sanctioned_amount: u64,
}

/// Type-specific fields; each variant carries only what its policy needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "publication_type", rename_all = "snake_case")]
pub enum PublicationDetails {
    ResearchPaper(JournalDetails),
    Book(BookDetails),
    BookChapter(BookDetails),
    ConferencePaper(ConferenceDetails),
    Grant(GrantDetails),
}

impl PublicationDetails {
    pub fn publication_type(&self) -> PublicationType {
        match self {
            PublicationDetails::ResearchPaper(_) => PublicationType::ResearchPaper,
            PublicationDetails::Book(_) => PublicationType::Book,
            PublicationDetails::BookChapter(_) => PublicationType::BookChapter,
            PublicationDetails::ConferencePaper(_) => PublicationType::ConferencePaper,
            PublicationDetails::Grant(_) => PublicationType::Grant,
        }
    }

    pub fn sjr(&self) -> Option<f64> {
        match self {
            PublicationDetails::ResearchPaper(journal) => journal.sjr,
            _ => None,
        }
    }

    pub fn conference_sub_type(&self) -> Option<ConferenceSubType> {
        match self {
            PublicationDetails::ConferencePaper(conference) => conference.sub_type,
            _ => None,
        }
    }
}

/// Authorship role as declared on the contribution form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorRole {
    FirstAuthor,
    CorrespondingAuthor,
    FirstAndCorrespondingAuthor,
    CoAuthor,
    SeniorAuthor,
}

impl AuthorRole {
    pub const fn label(self) -> &'static str {
        match self {
            AuthorRole::FirstAuthor => "first_author",
            AuthorRole::CorrespondingAuthor => "corresponding_author",
            AuthorRole::FirstAndCorrespondingAuthor => "first_and_corresponding_author",
            AuthorRole::CoAuthor => "co_author",
            AuthorRole::SeniorAuthor => "senior_author",
        }
    }

    pub fn from_label(raw: &str) -> Option<Self> {
        match normalize_label(raw).as_str() {
            "first_author" | "first" => Some(AuthorRole::FirstAuthor),
            "corresponding_author" | "corresponding" => Some(AuthorRole::CorrespondingAuthor),
            "first_and_corresponding_author" | "first_and_corresponding" => {
                Some(AuthorRole::FirstAndCorrespondingAuthor)
            }
            "co_author" | "coauthor" => Some(AuthorRole::CoAuthor),
            "senior_author" | "senior" => Some(AuthorRole::SeniorAuthor),
            _ => None,
        }
    }

    pub const fn holds_first(self) -> bool {
        matches!(
            self,
            AuthorRole::FirstAuthor | AuthorRole::FirstAndCorrespondingAuthor
        )
    }

    pub const fn holds_corresponding(self) -> bool {
        matches!(
            self,
            AuthorRole::CorrespondingAuthor | AuthorRole::FirstAndCorrespondingAuthor
        )
    }

    /// Senior authors share the co-author pool.
    pub const fn is_co_author(self) -> bool {
        matches!(self, AuthorRole::CoAuthor | AuthorRole::SeniorAuthor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributorCategory {
    InternalFaculty,
    InternalStudent,
    InternalStaff,
    ExternalAcademic,
    ExternalIndustry,
    ExternalOther,
}

impl ContributorCategory {
    pub const fn label(self) -> &'static str {
        match self {
            ContributorCategory::InternalFaculty => "internal_faculty",
            ContributorCategory::InternalStudent => "internal_student",
            ContributorCategory::InternalStaff => "internal_staff",
            ContributorCategory::ExternalAcademic => "external_academic",
            ContributorCategory::ExternalIndustry => "external_industry",
            ContributorCategory::ExternalOther => "external_other",
        }
    }

    pub fn is_internal(self) -> bool {
        self.label().starts_with("internal_")
    }

    pub fn is_student(self) -> bool {
        self.label() == "internal_student"
    }
}

/// The person filing the claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Applicant {
    pub user_id: UserId,
    pub name: String,
    pub category: ContributorCategory,
    pub is_internal: bool,
    /// Own authorship entry; `None` when the form left it blank.
    #[serde(default)]
    pub role: Option<AuthorRole>,
    #[serde(default)]
    pub mentor_uid: Option<String>,
}

/// Named co-author or investigator other than the applicant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    pub name: String,
    #[serde(default)]
    pub uid: Option<String>,
    /// Linked portal account, resolved for internal contributors only.
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub is_internal: bool,
    pub category: ContributorCategory,
    pub role: AuthorRole,
    pub order: u16,
    #[serde(default)]
    pub incentive_share: u64,
    #[serde(default)]
    pub points_share: u64,
}

/// Lifecycle states of a contribution claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionStatus {
    Draft,
    Submitted,
    PendingMentorApproval,
    UnderReview,
    ChangesRequired,
    Resubmitted,
    Approved,
    Rejected,
    Completed,
}

impl ContributionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ContributionStatus::Draft => "draft",
            ContributionStatus::Submitted => "submitted",
            ContributionStatus::PendingMentorApproval => "pending_mentor_approval",
            ContributionStatus::UnderReview => "under_review",
            ContributionStatus::ChangesRequired => "changes_required",
            ContributionStatus::Resubmitted => "resubmitted",
            ContributionStatus::Approved => "approved",
            ContributionStatus::Rejected => "rejected",
            ContributionStatus::Completed => "completed",
        }
    }

    /// States in which the applicant may still edit the claim.
    pub const fn is_editable(self) -> bool {
        matches!(
            self,
            ContributionStatus::Draft
                | ContributionStatus::ChangesRequired
                | ContributionStatus::Resubmitted
        )
    }
}

/// One research output together with its contributor rows and calculated shares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub id: ContributionId,
    pub application_number: Option<String>,
    pub title: String,
    pub doi: Option<String>,
    pub keywords: Vec<String>,
    pub publication_date: Option<NaiveDate>,
    pub details: PublicationDetails,
    /// Total author count as typed on the form; may exceed the named rows.
    pub declared_author_count: Option<u16>,
    pub applicant: Applicant,
    pub school_id: String,
    pub department_id: String,
    pub contributors: Vec<Contributor>,
    pub status: ContributionStatus,
    /// Applicant's own share.
    pub calculated_incentive_amount: u64,
    pub calculated_points: u64,
    /// Applicant plus every contributor, stamped when the award is credited.
    pub total_incentive_amount: u64,
    pub total_points: u64,
    pub revision: u32,
    pub mentor_id: Option<UserId>,
    pub mentor_remarks: Option<String>,
    pub current_reviewer_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub credited_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Contribution {
    pub fn publication_type(&self) -> PublicationType {
        self.details.publication_type()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Reviewing,
    ChangesRequired,
    Recommended,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionStatus {
    Pending,
    Accepted,
    Rejected,
}

/// Field-level change proposed by a reviewer alongside a changes-required decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditSuggestion {
    pub id: SuggestionId,
    pub field: String,
    pub original_value: Option<String>,
    pub suggested_value: String,
    pub note: Option<String>,
    pub status: SuggestionStatus,
}

/// One reviewer action on a contribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub contribution_id: ContributionId,
    pub reviewer_id: UserId,
    pub decision: ReviewDecision,
    pub comments: Option<String>,
    pub suggestions: Vec<EditSuggestion>,
    pub pending_suggestions: u32,
    pub created_at: DateTime<Utc>,
}

/// Immutable audit row written for every status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub contribution_id: ContributionId,
    /// `None` for the row recording creation of the draft.
    pub from: Option<ContributionStatus>,
    pub to: ContributionStatus,
    pub actor_id: UserId,
    pub comment: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Review,
    Approve,
    Administer,
}

/// The user performing a request, as established by the (external) auth layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    #[serde(default)]
    pub permissions: BTreeSet<Permission>,
}

impl Actor {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: UserId(user_id.into()),
            permissions: BTreeSet::new(),
        }
    }

    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permissions.insert(permission);
        self
    }

    /// Approvers are implicitly reviewers.
    pub fn can_review(&self) -> bool {
        self.permissions.contains(&Permission::Review) || self.can_approve()
    }

    pub fn can_approve(&self) -> bool {
        self.permissions.contains(&Permission::Approve)
    }

    pub fn can_administer(&self) -> bool {
        self.permissions.contains(&Permission::Administer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quartile_labels_accept_display_and_wire_forms() {
        assert_eq!(Quartile::from_label("Top 1%"), Some(Quartile::Top1));
        assert_eq!(Quartile::from_label("top5"), Some(Quartile::Top5));
        assert_eq!(Quartile::from_label(" q3 "), Some(Quartile::Q3));
        assert_eq!(Quartile::from_label("Q9"), None);
    }

    #[test]
    fn category_prefix_drives_internal_and_student_flags() {
        assert!(ContributorCategory::InternalStaff.is_internal());
        assert!(!ContributorCategory::InternalStaff.is_student());
        assert!(ContributorCategory::InternalStudent.is_student());
        assert!(!ContributorCategory::ExternalAcademic.is_internal());
    }

    #[test]
    fn publication_details_serialize_with_type_tag() {
        let details = PublicationDetails::ConferencePaper(ConferenceDetails {
            conference_name: "ICSE".to_string(),
            sub_type: Some(ConferenceSubType::ScopusIndexed),
            proceedings_quartile: Some(Quartile::Q2),
            scope: VenueScope::International,
            best_paper_award: false,
        });
        let value = serde_json::to_value(&details).expect("serializes");
        assert_eq!(value["publication_type"], "conference_paper");
        assert_eq!(value["sub_type"], "scopus_indexed");
        assert_eq!(details.conference_sub_type(), Some(ConferenceSubType::ScopusIndexed));
    }

    #[test]
    fn approvers_inherit_review_permission() {
        let approver = Actor::new("drd-1").with_permission(Permission::Approve);
        assert!(approver.can_review());
        assert!(!Actor::new("faculty-1").can_review());
    }
}
