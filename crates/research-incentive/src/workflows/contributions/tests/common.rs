use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::contributions::calculator::IncentiveCalculator;
use crate::workflows::contributions::domain::{
    Actor, Applicant, AuthorRole, Contribution, ContributionId, ContributionStatus, Contributor,
    ContributorCategory, JournalDetails, Permission, PublicationDetails, Quartile,
    StatusHistoryEntry, UserId,
};
use crate::workflows::contributions::policy::PolicyDefaults;
use crate::workflows::contributions::repository::{
    ContributionRecord, ContributionRepository, DepartmentDirectory, DirectoryError, Notification,
    NotificationError, NotificationSink, RepositoryError, UserDirectory, UserRecord, UserRole,
};
use crate::workflows::contributions::service::{
    ContributionDraft, ContributionWorkflowService, ContributorDraft,
};

pub(super) const SCHOOL: &str = "sch-eng";
pub(super) const DEPARTMENT: &str = "dep-cse";

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn applicant_actor() -> Actor {
    Actor::new("fac-100")
}

pub(super) fn student_actor() -> Actor {
    Actor::new("stu-300")
}

pub(super) fn mentor_actor() -> Actor {
    Actor::new("fac-100")
}

pub(super) fn reviewer() -> Actor {
    Actor::new("rev-1").with_permission(Permission::Review)
}

pub(super) fn approver() -> Actor {
    Actor::new("drd-1").with_permission(Permission::Approve)
}

pub(super) fn administrator() -> Actor {
    Actor::new("admin-1").with_permission(Permission::Administer)
}

pub(super) fn calculator() -> IncentiveCalculator {
    IncentiveCalculator::with_defaults(Arc::new(PolicyDefaults::standard()))
}

pub(super) fn faculty_applicant(role: Option<AuthorRole>) -> Applicant {
    Applicant {
        user_id: UserId("fac-100".to_string()),
        name: "Dr. Asha Rao".to_string(),
        category: ContributorCategory::InternalFaculty,
        is_internal: true,
        role,
        mentor_uid: None,
    }
}

pub(super) fn student_applicant() -> Applicant {
    Applicant {
        user_id: UserId("stu-300".to_string()),
        name: "Kiran Mehta".to_string(),
        category: ContributorCategory::InternalStudent,
        is_internal: true,
        role: Some(AuthorRole::FirstAuthor),
        mentor_uid: Some("F100".to_string()),
    }
}

pub(super) fn journal(quartile: Option<Quartile>, sjr: Option<f64>) -> PublicationDetails {
    PublicationDetails::ResearchPaper(JournalDetails {
        journal_name: "Journal of Applied Systems".to_string(),
        quartile,
        sjr,
        impact_factor: Some(3.2),
        indexed_in: vec!["Scopus".to_string()],
    })
}

pub(super) fn contributor(
    name: &str,
    uid: Option<&str>,
    category: ContributorCategory,
    role: AuthorRole,
) -> ContributorDraft {
    ContributorDraft {
        name: name.to_string(),
        uid: uid.map(str::to_string),
        is_internal: category.is_internal(),
        category,
        role,
    }
}

/// Q1 research paper filed by the faculty applicant.
pub(super) fn research_draft(
    role: Option<AuthorRole>,
    contributors: Vec<ContributorDraft>,
) -> ContributionDraft {
    ContributionDraft {
        title: "Adaptive scheduling for edge clusters".to_string(),
        doi: Some("10.1000/jas.2025.001".to_string()),
        keywords: vec!["scheduling".to_string(), "edge".to_string()],
        publication_date: Some(date(2025, 3, 14)),
        details: journal(Some(Quartile::Q1), None),
        declared_author_count: None,
        applicant: faculty_applicant(role),
        school_id: SCHOOL.to_string(),
        department_id: DEPARTMENT.to_string(),
        contributors,
    }
}

pub(super) fn student_draft() -> ContributionDraft {
    ContributionDraft {
        applicant: student_applicant(),
        ..research_draft(None, Vec::new())
    }
}

/// Unsaved claim for exercising the calculator directly.
pub(super) fn claim(
    details: PublicationDetails,
    applicant: Applicant,
    contributors: &[(ContributorCategory, AuthorRole)],
    declared_author_count: Option<u16>,
) -> Contribution {
    Contribution {
        id: ContributionId("rc-test".to_string()),
        application_number: None,
        title: "Calculator fixture".to_string(),
        doi: None,
        keywords: Vec::new(),
        publication_date: Some(date(2025, 3, 14)),
        details,
        declared_author_count,
        applicant,
        school_id: SCHOOL.to_string(),
        department_id: DEPARTMENT.to_string(),
        contributors: contributors
            .iter()
            .enumerate()
            .map(|(index, (category, role))| Contributor {
                name: format!("Contributor {}", index + 1),
                uid: None,
                user_id: None,
                is_internal: category.is_internal(),
                category: *category,
                role: *role,
                order: index as u16 + 1,
                incentive_share: 0,
                points_share: 0,
            })
            .collect(),
        status: ContributionStatus::Draft,
        calculated_incentive_amount: 0,
        calculated_points: 0,
        total_incentive_amount: 0,
        total_points: 0,
        revision: 0,
        mentor_id: None,
        mentor_remarks: None,
        current_reviewer_id: None,
        created_at: Utc
            .with_ymd_and_hms(2025, 3, 20, 9, 0, 0)
            .single()
            .expect("valid timestamp"),
        submitted_at: None,
        approved_at: None,
        credited_at: None,
        completed_at: None,
    }
}

pub(super) fn today() -> NaiveDate {
    date(2025, 6, 1)
}

pub(super) type TestService = ContributionWorkflowService<MemoryRepository, MemoryNotifications>;

pub(super) fn build_service() -> (TestService, Arc<MemoryRepository>, Arc<MemoryNotifications>) {
    let repository = Arc::new(MemoryRepository::default());
    let notifications = Arc::new(MemoryNotifications::default());
    let service = ContributionWorkflowService::new(
        repository.clone(),
        notifications.clone(),
        Arc::new(MemoryDirectory::standard()),
        Arc::new(MemoryDepartments::standard()),
        Arc::new(calculator()),
    );
    (service, repository, notifications)
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<ContributionId, ContributionRecord>>>,
    pub(super) history: Arc<Mutex<Vec<StatusHistoryEntry>>>,
}

impl MemoryRepository {
    pub(super) fn history_len(&self) -> usize {
        self.history.lock().expect("history mutex poisoned").len()
    }
}

impl ContributionRepository for MemoryRepository {
    fn insert(
        &self,
        mut record: ContributionRecord,
        history: Vec<StatusHistoryEntry>,
    ) -> Result<ContributionRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.contribution.id) {
            return Err(RepositoryError::Conflict);
        }
        record.version = 1;
        guard.insert(record.contribution.id.clone(), record.clone());
        self.history
            .lock()
            .expect("history mutex poisoned")
            .extend(history);
        Ok(record)
    }

    fn commit(
        &self,
        mut record: ContributionRecord,
        history: Vec<StatusHistoryEntry>,
    ) -> Result<ContributionRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let stored = guard
            .get(&record.contribution.id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.version != record.version {
            return Err(RepositoryError::VersionConflict {
                expected: record.version,
                found: stored.version,
            });
        }
        record.version += 1;
        guard.insert(record.contribution.id.clone(), record.clone());
        self.history
            .lock()
            .expect("history mutex poisoned")
            .extend(history);
        Ok(record)
    }

    fn fetch(&self, id: &ContributionId) -> Result<Option<ContributionRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn history(&self, id: &ContributionId) -> Result<Vec<StatusHistoryEntry>, RepositoryError> {
        let guard = self.history.lock().expect("history mutex poisoned");
        Ok(guard
            .iter()
            .filter(|entry| &entry.contribution_id == id)
            .cloned()
            .collect())
    }

    fn by_status(
        &self,
        statuses: &[ContributionStatus],
        limit: usize,
    ) -> Result<Vec<ContributionRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut records: Vec<ContributionRecord> = guard
            .values()
            .filter(|record| statuses.contains(&record.contribution.status))
            .cloned()
            .collect();
        records.sort_by(|a, b| a.contribution.id.cmp(&b.contribution.id));
        records.truncate(limit);
        Ok(records)
    }
}

/// Hands out snapshots one version behind, as if another writer committed
/// between our read and our write.
#[derive(Default, Clone)]
pub(super) struct LaggingRepository {
    pub(super) inner: MemoryRepository,
}

impl ContributionRepository for LaggingRepository {
    fn insert(
        &self,
        record: ContributionRecord,
        history: Vec<StatusHistoryEntry>,
    ) -> Result<ContributionRecord, RepositoryError> {
        self.inner.insert(record, history)
    }

    fn commit(
        &self,
        record: ContributionRecord,
        history: Vec<StatusHistoryEntry>,
    ) -> Result<ContributionRecord, RepositoryError> {
        self.inner.commit(record, history)
    }

    fn fetch(&self, id: &ContributionId) -> Result<Option<ContributionRecord>, RepositoryError> {
        Ok(self.inner.fetch(id)?.map(|mut record| {
            record.version = record.version.saturating_sub(1);
            record
        }))
    }

    fn history(&self, id: &ContributionId) -> Result<Vec<StatusHistoryEntry>, RepositoryError> {
        self.inner.history(id)
    }

    fn by_status(
        &self,
        statuses: &[ContributionStatus],
        limit: usize,
    ) -> Result<Vec<ContributionRecord>, RepositoryError> {
        self.inner.by_status(statuses, limit)
    }
}

pub(super) struct UnavailableRepository;

impl ContributionRepository for UnavailableRepository {
    fn insert(
        &self,
        _record: ContributionRecord,
        _history: Vec<StatusHistoryEntry>,
    ) -> Result<ContributionRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn commit(
        &self,
        _record: ContributionRecord,
        _history: Vec<StatusHistoryEntry>,
    ) -> Result<ContributionRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ContributionId) -> Result<Option<ContributionRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn history(&self, _id: &ContributionId) -> Result<Vec<StatusHistoryEntry>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn by_status(
        &self,
        _statuses: &[ContributionStatus],
        _limit: usize,
    ) -> Result<Vec<ContributionRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifications {
    events: Arc<Mutex<Vec<Notification>>>,
}

impl MemoryNotifications {
    pub(super) fn events(&self) -> Vec<Notification> {
        self.events
            .lock()
            .expect("notification mutex poisoned")
            .clone()
    }

    pub(super) fn recipients(&self) -> BTreeSet<String> {
        self.events()
            .into_iter()
            .map(|notification| notification.recipient.0)
            .collect()
    }
}

impl NotificationSink for MemoryNotifications {
    fn notify(&self, notification: Notification) -> Result<(), NotificationError> {
        self.events
            .lock()
            .expect("notification mutex poisoned")
            .push(notification);
        Ok(())
    }
}

pub(super) struct FailingNotifications;

impl NotificationSink for FailingNotifications {
    fn notify(&self, _notification: Notification) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("smtp relay down".to_string()))
    }
}

pub(super) struct MemoryDirectory {
    users: HashMap<String, UserRecord>,
}

impl MemoryDirectory {
    pub(super) fn standard() -> Self {
        let users = [
            ("F100", "fac-100", "Dr. Asha Rao", UserRole::Faculty, true),
            ("F200", "fac-200", "Dr. Vikram Sen", UserRole::Faculty, true),
            ("F201", "fac-201", "Dr. Meera Iyer", UserRole::Faculty, true),
            ("S300", "stu-300", "Kiran Mehta", UserRole::Student, true),
            ("S301", "stu-301", "Ravi Kumar", UserRole::Student, true),
            ("D001", "drd-1", "DRD Approver", UserRole::Approver, true),
            ("D002", "drd-2", "DRD Deputy", UserRole::Approver, true),
        ];
        Self {
            users: users
                .into_iter()
                .map(|(uid, id, name, role, is_internal)| {
                    (
                        uid.to_string(),
                        UserRecord {
                            id: UserId(id.to_string()),
                            uid: uid.to_string(),
                            name: name.to_string(),
                            role,
                            is_internal,
                        },
                    )
                })
                .collect(),
        }
    }
}

impl UserDirectory for MemoryDirectory {
    fn find_user_by_uid(&self, uid: &str) -> Result<Option<UserRecord>, DirectoryError> {
        Ok(self.users.get(uid).cloned())
    }

    fn approvers(&self) -> Result<Vec<UserRecord>, DirectoryError> {
        let mut approvers: Vec<UserRecord> = self
            .users
            .values()
            .filter(|user| user.role == UserRole::Approver)
            .cloned()
            .collect();
        approvers.sort_by(|a, b| a.uid.cmp(&b.uid));
        Ok(approvers)
    }
}

pub(super) struct MemoryDepartments {
    known: BTreeSet<(String, String)>,
}

impl MemoryDepartments {
    pub(super) fn standard() -> Self {
        Self {
            known: [(SCHOOL.to_string(), DEPARTMENT.to_string())]
                .into_iter()
                .collect(),
        }
    }
}

impl DepartmentDirectory for MemoryDepartments {
    fn department_exists(
        &self,
        school_id: &str,
        department_id: &str,
    ) -> Result<bool, DirectoryError> {
        Ok(self
            .known
            .contains(&(school_id.to_string(), department_id.to_string())))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
