use crate::infra::{contribution_service, ContributionService, InMemoryNotificationSink};
use chrono::{Local, NaiveDate};
use clap::Args;
use research_incentive::config::WorkflowConfig;
use research_incentive::error::AppError;
use research_incentive::workflows::contributions::{
    Actor, Applicant, AuthorRole, CalculationOutcome, CalculationStatus, ContributionDraft,
    ContributionRecord, ContributionStatus, ContributorCategory, ContributorDraft,
    IncentiveCalculator, JournalDetails, Participant, Permission, PolicyDefaults,
    PublicationDetails, Quartile, ShareAssessment, UserId, WorkflowAction,
};
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct CalculateArgs {
    /// Journal quartile (Top 1%, Top 5%, Q1..Q4)
    #[arg(long, value_parser = parse_quartile)]
    pub(crate) quartile: Option<Quartile>,
    /// SJR score, used when no quartile is given
    #[arg(long)]
    pub(crate) sjr: Option<f64>,
    /// Applicant's authorship role (defaults by author count)
    #[arg(long, value_parser = parse_role)]
    pub(crate) role: Option<AuthorRole>,
    /// Applicant is a student (money only, no points)
    #[arg(long)]
    pub(crate) student: bool,
    /// Additional author as CATEGORY:ROLE, e.g. external_academic:corresponding_author
    #[arg(long = "author", value_parser = parse_participant)]
    pub(crate) authors: Vec<(ContributorCategory, AuthorRole)>,
    /// Total author count printed on the paper
    #[arg(long)]
    pub(crate) declared_authors: Option<u16>,
    /// Publication date (YYYY-MM-DD); selects the active policy
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) publication_date: Option<NaiveDate>,
    /// Evaluation date (defaults to today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Send student submissions straight to review
    #[arg(long)]
    pub(crate) skip_mentor_gate: bool,
    /// Print every notification raised along the way
    #[arg(long)]
    pub(crate) show_notifications: bool,
}

pub(crate) fn run_calculation(args: CalculateArgs) -> Result<(), AppError> {
    let CalculateArgs {
        quartile,
        sjr,
        role,
        student,
        authors,
        declared_authors,
        publication_date,
        today,
    } = args;

    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let details = PublicationDetails::ResearchPaper(JournalDetails {
        journal_name: "Command line preview".to_string(),
        quartile,
        sjr,
        impact_factor: None,
        indexed_in: Vec::new(),
    });

    let sole_author = authors.is_empty() && declared_authors.unwrap_or(1) <= 1;
    let applicant_role = role.unwrap_or(if sole_author {
        AuthorRole::FirstAndCorrespondingAuthor
    } else {
        AuthorRole::CoAuthor
    });
    let applicant_category = if student {
        ContributorCategory::InternalStudent
    } else {
        ContributorCategory::InternalFaculty
    };
    let applicant = Participant::classify(true, applicant_category, applicant_role);
    let contributors: Vec<Participant> = authors
        .iter()
        .map(|(category, role)| Participant::classify(false, *category, *role))
        .collect();

    let calculator = IncentiveCalculator::with_defaults(Arc::new(PolicyDefaults::standard()));
    let assessment = calculator.assess_participants(
        &details,
        publication_date,
        declared_authors,
        applicant,
        &contributors,
        today,
    );

    println!("Incentive preview (evaluated {today})");
    render_assessment(&assessment, applicant_role, &authors);
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = WorkflowConfig {
        mentor_gate: !args.skip_mentor_gate,
        ..WorkflowConfig::default()
    };
    let (service, notifications) = contribution_service(config);

    println!("Research incentive workflow demo");

    println!("\nA. Sole internal author, Q1 journal");
    let sole = service.create_draft(
        &faculty(),
        journal_claim(AuthorRole::FirstAndCorrespondingAuthor, Vec::new()),
    )?;
    render_record(&sole);

    println!("\nB. Internal first and corresponding authors");
    let shared = service.create_draft(
        &faculty(),
        journal_claim(
            AuthorRole::FirstAuthor,
            vec![contributor(
                "Dr. Vikram Sen",
                Some("F200"),
                ContributorCategory::InternalFaculty,
                AuthorRole::CorrespondingAuthor,
            )],
        ),
    )?;
    render_record(&shared);

    println!("\nC. External corresponding author forfeits the slot");
    let mixed = service.create_draft(
        &faculty(),
        journal_claim(
            AuthorRole::FirstAuthor,
            vec![contributor(
                "Prof. Lena Ortiz",
                None,
                ContributorCategory::ExternalAcademic,
                AuthorRole::CorrespondingAuthor,
            )],
        ),
    )?;
    render_record(&mixed);

    println!("\nD. Student claim returned by the mentor");
    run_student_path(&service)?;

    println!("\nB continued: review, approval and crediting");
    run_approval_path(&service, &shared)?;

    let events = notifications.events();
    println!("\nNotifications raised: {}", events.len());
    if args.show_notifications {
        render_notifications(&notifications);
    }

    Ok(())
}

fn run_student_path(service: &ContributionService) -> Result<(), AppError> {
    let student = Actor::new("stu-300");
    let record = service.create_draft(&student, student_claim())?;
    let id = record.contribution.id.clone();
    render_record(&record);

    let submitted = service.transition(&id, &student, WorkflowAction::Submit, None)?;
    println!("  submit            -> {}", submitted.record.contribution.status.label());

    if submitted.record.contribution.status != ContributionStatus::PendingMentorApproval {
        println!("  mentor gate disabled; claim went straight to review");
        return Ok(());
    }

    let returned = service.transition(
        &id,
        &faculty(),
        WorkflowAction::MentorReject {
            comments: "Attach the acceptance letter".to_string(),
        },
        None,
    )?;
    println!("  mentor_reject     -> {}", returned.record.contribution.status.label());

    let resubmitted = service.transition(
        &id,
        &student,
        WorkflowAction::Resubmit {
            comments: Some("Acceptance letter attached".to_string()),
        },
        None,
    )?;
    println!(
        "  resubmit          -> {} (revision {})",
        resubmitted.record.contribution.status.label(),
        resubmitted.record.contribution.revision
    );
    Ok(())
}

fn run_approval_path(
    service: &ContributionService,
    record: &ContributionRecord,
) -> Result<(), AppError> {
    let id = record.contribution.id.clone();
    let reviewer = Actor::new("rev-1").with_permission(Permission::Review);
    let approver = Actor::new("drd-1").with_permission(Permission::Approve);
    let accounts = Actor::new("admin-1").with_permission(Permission::Administer);

    let steps = [
        (faculty(), WorkflowAction::Submit),
        (reviewer.clone(), WorkflowAction::ClaimReview),
        (
            reviewer,
            WorkflowAction::Recommend {
                comments: Some("Q1 venue verified in Scopus".to_string()),
            },
        ),
        (approver, WorkflowAction::Approve { comments: None }),
        (accounts, WorkflowAction::Complete { comments: None }),
    ];

    for (actor, action) in steps {
        let name = action.name();
        let receipt = service.transition(&id, &actor, action, None)?;
        println!(
            "  {:<17} -> {} ({} notification(s))",
            name,
            receipt.record.contribution.status.label(),
            receipt.notifications.len()
        );
    }

    let credited = service.get(&id)?;
    println!(
        "  credited total: {} incentive, {} points (application {})",
        credited.contribution.total_incentive_amount,
        credited.contribution.total_points,
        credited
            .contribution
            .application_number
            .as_deref()
            .unwrap_or("unassigned")
    );
    Ok(())
}

fn render_record(record: &ContributionRecord) {
    let contribution = &record.contribution;
    println!(
        "  {} [{}] applicant {}: {} incentive, {} points",
        contribution.id.0,
        contribution.status.label(),
        contribution.applicant.name,
        contribution.calculated_incentive_amount,
        contribution.calculated_points
    );
    for contributor in &contribution.contributors {
        println!(
            "    {:<20} {:<32} {:>7} incentive {:>4} points",
            contributor.name,
            format!("{} / {}", contributor.category.label(), contributor.role.label()),
            contributor.incentive_share,
            contributor.points_share
        );
    }
}

fn render_assessment(
    assessment: &ShareAssessment,
    applicant_role: AuthorRole,
    authors: &[(ContributorCategory, AuthorRole)],
) {
    let composition = &assessment.composition;
    println!(
        "Authors: {} total, {} internal, {} external",
        composition.total_author_count, composition.internal_count, composition.external_count
    );
    render_outcome("applicant", applicant_role.label(), &assessment.applicant);
    for ((category, role), outcome) in authors.iter().zip(&assessment.contributors) {
        render_outcome(category.label(), role.label(), outcome);
    }
    println!(
        "Total: {} incentive, {} points",
        assessment.total_incentive(),
        assessment.total_points()
    );
}

fn render_outcome(who: &str, role: &str, outcome: &CalculationOutcome) {
    println!(
        "  {:<18} {:<30} {:>7} incentive {:>4} points  {}",
        who,
        role,
        outcome.incentive_amount,
        outcome.points,
        status_label(&outcome.trace.status)
    );
}

fn status_label(status: &CalculationStatus) -> String {
    match status {
        CalculationStatus::Computed => "computed".to_string(),
        CalculationStatus::ExternalContributor => "external contributor".to_string(),
        CalculationStatus::AwaitingSubType => "awaiting sub-type".to_string(),
        CalculationStatus::Failed { reason } => format!("failed: {reason}"),
    }
}

fn render_notifications(notifications: &InMemoryNotificationSink) {
    for notification in notifications.events() {
        println!(
            "  -> {:<8} {:?}: {}",
            notification.recipient.0, notification.kind, notification.message
        );
    }
}

fn faculty() -> Actor {
    Actor::new("fac-100")
}

fn journal_claim(role: AuthorRole, contributors: Vec<ContributorDraft>) -> ContributionDraft {
    ContributionDraft {
        title: "Adaptive scheduling for edge clusters".to_string(),
        doi: Some("10.1000/jas.2025.001".to_string()),
        keywords: vec!["scheduling".to_string(), "edge computing".to_string()],
        publication_date: NaiveDate::from_ymd_opt(2025, 3, 14),
        details: PublicationDetails::ResearchPaper(JournalDetails {
            journal_name: "Journal of Applied Systems".to_string(),
            quartile: Some(Quartile::Q1),
            sjr: Some(1.42),
            impact_factor: Some(3.2),
            indexed_in: vec!["Scopus".to_string(), "Web of Science".to_string()],
        }),
        declared_author_count: None,
        applicant: Applicant {
            user_id: UserId("fac-100".to_string()),
            name: "Dr. Asha Rao".to_string(),
            category: ContributorCategory::InternalFaculty,
            is_internal: true,
            role: Some(role),
            mentor_uid: None,
        },
        school_id: "sch-eng".to_string(),
        department_id: "dep-cse".to_string(),
        contributors,
    }
}

fn student_claim() -> ContributionDraft {
    let mut draft = journal_claim(AuthorRole::FirstAuthor, Vec::new());
    draft.title = "Lightweight anomaly detection for sensor meshes".to_string();
    draft.applicant = Applicant {
        user_id: UserId("stu-300".to_string()),
        name: "Kiran Mehta".to_string(),
        category: ContributorCategory::InternalStudent,
        is_internal: true,
        role: Some(AuthorRole::FirstAuthor),
        mentor_uid: Some("F100".to_string()),
    };
    draft
}

fn contributor(
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

fn parse_quartile(raw: &str) -> Result<Quartile, String> {
    Quartile::from_label(raw).ok_or_else(|| format!("unknown quartile '{raw}'"))
}

fn parse_role(raw: &str) -> Result<AuthorRole, String> {
    AuthorRole::from_label(raw).ok_or_else(|| format!("unknown author role '{raw}'"))
}

fn parse_participant(raw: &str) -> Result<(ContributorCategory, AuthorRole), String> {
    let (category, role) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected CATEGORY:ROLE, got '{raw}'"))?;
    let category: ContributorCategory = serde_json::from_value(serde_json::Value::String(
        category.trim().to_ascii_lowercase(),
    ))
    .map_err(|_| format!("unknown contributor category '{category}'"))?;
    Ok((category, parse_role(role)?))
}
