use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use research_incentive::config::WorkflowConfig;
use research_incentive::workflows::contributions::{
    ContributionId, ContributionRecord, ContributionRepository, ContributionStatus,
    ContributionWorkflowService, DepartmentDirectory, DirectoryError, IncentiveCalculator,
    Notification, NotificationError, NotificationSink, PolicyCatalog, PolicyDefaults,
    PolicyProvider, PolicyResolver, RepositoryError, StatusHistoryEntry, UserDirectory, UserId,
    UserRecord, UserRole,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type ContributionService =
    ContributionWorkflowService<InMemoryContributionRepository, InMemoryNotificationSink>;

/// Wire the workflow service over in-memory adapters and the built-in policy
/// table, optionally memoizing policy lookups.
pub(crate) fn contribution_service(
    config: WorkflowConfig,
) -> (ContributionService, Arc<InMemoryNotificationSink>) {
    let catalog: Arc<dyn PolicyProvider> = Arc::new(PolicyCatalog::new());
    let resolver = PolicyResolver::with_cache(
        catalog,
        Arc::new(PolicyDefaults::standard()),
        config.cache_policies,
    );
    let notifications = Arc::new(InMemoryNotificationSink::default());
    let service = ContributionWorkflowService::new(
        Arc::new(InMemoryContributionRepository::default()),
        notifications.clone(),
        Arc::new(InMemoryUserDirectory::seeded()),
        Arc::new(InMemoryDepartmentDirectory::seeded()),
        Arc::new(IncentiveCalculator::new(resolver)),
    )
    .with_config(config);
    (service, notifications)
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryContributionRepository {
    records: Arc<Mutex<HashMap<ContributionId, ContributionRecord>>>,
    history: Arc<Mutex<Vec<StatusHistoryEntry>>>,
}

impl ContributionRepository for InMemoryContributionRepository {
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
        // Both locks are held so the record and its history rows land together.
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let mut log = self.history.lock().expect("history mutex poisoned");
        let found = guard
            .get(&record.contribution.id)
            .map(|stored| stored.version)
            .ok_or(RepositoryError::NotFound)?;
        if found != record.version {
            return Err(RepositoryError::VersionConflict {
                expected: record.version,
                found,
            });
        }
        record.version += 1;
        guard.insert(record.contribution.id.clone(), record.clone());
        log.extend(history);
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
        records.sort_by(|a, b| {
            a.contribution
                .submitted_at
                .cmp(&b.contribution.submitted_at)
                .then_with(|| a.contribution.id.cmp(&b.contribution.id))
        });
        records.truncate(limit);
        Ok(records)
    }
}

/// Logs every notification and keeps it for inspection.
#[derive(Default, Clone)]
pub(crate) struct InMemoryNotificationSink {
    events: Arc<Mutex<Vec<Notification>>>,
}

impl NotificationSink for InMemoryNotificationSink {
    fn notify(&self, notification: Notification) -> Result<(), NotificationError> {
        info!(
            recipient = %notification.recipient.0,
            kind = ?notification.kind,
            title = %notification.title,
            "notification queued"
        );
        let mut guard = self.events.lock().expect("notification mutex poisoned");
        guard.push(notification);
        Ok(())
    }
}

impl InMemoryNotificationSink {
    pub(crate) fn events(&self) -> Vec<Notification> {
        self.events
            .lock()
            .expect("notification mutex poisoned")
            .clone()
    }
}

/// Portal users keyed by university uid.
#[derive(Debug, Clone, Default)]
pub(crate) struct InMemoryUserDirectory {
    users: HashMap<String, UserRecord>,
}

impl InMemoryUserDirectory {
    /// Accounts used by the demo and by a freshly started server.
    pub(crate) fn seeded() -> Self {
        let users = [
            ("F100", "fac-100", "Dr. Asha Rao", UserRole::Faculty),
            ("F200", "fac-200", "Dr. Vikram Sen", UserRole::Faculty),
            ("S300", "stu-300", "Kiran Mehta", UserRole::Student),
            ("R001", "rev-1", "Prof. Nandini Bose", UserRole::Reviewer),
            ("D001", "drd-1", "DRD Director", UserRole::Approver),
            ("A001", "admin-1", "Accounts Office", UserRole::Admin),
        ];
        Self {
            users: users
                .into_iter()
                .map(|(uid, id, name, role)| {
                    (
                        uid.to_string(),
                        UserRecord {
                            id: UserId(id.to_string()),
                            uid: uid.to_string(),
                            name: name.to_string(),
                            role,
                            is_internal: true,
                        },
                    )
                })
                .collect(),
        }
    }
}

impl UserDirectory for InMemoryUserDirectory {
    fn find_user_by_uid(&self, uid: &str) -> Result<Option<UserRecord>, DirectoryError> {
        Ok(self.users.get(uid.trim()).cloned())
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

#[derive(Debug, Clone, Default)]
pub(crate) struct InMemoryDepartmentDirectory {
    departments: BTreeSet<(String, String)>,
}

impl InMemoryDepartmentDirectory {
    pub(crate) fn seeded() -> Self {
        let departments = [
            ("sch-eng", "dep-cse"),
            ("sch-eng", "dep-ece"),
            ("sch-sci", "dep-phy"),
        ];
        Self {
            departments: departments
                .into_iter()
                .map(|(school, department)| (school.to_string(), department.to_string()))
                .collect(),
        }
    }
}

impl DepartmentDirectory for InMemoryDepartmentDirectory {
    fn department_exists(
        &self,
        school_id: &str,
        department_id: &str,
    ) -> Result<bool, DirectoryError> {
        Ok(self
            .departments
            .contains(&(school_id.to_string(), department_id.to_string())))
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
