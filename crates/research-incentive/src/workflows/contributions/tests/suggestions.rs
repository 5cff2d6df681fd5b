use super::common::*;
use crate::workflows::contributions::domain::{
    AuthorRole, BookDetails, BookIndexing, BookType, ContributionId, ContributionStatus,
    ContributorCategory, PublicationDetails, Quartile, SuggestionStatus,
};
use crate::workflows::contributions::service::WorkflowError;
use crate::workflows::contributions::suggestions::{
    apply_suggestion, ContributionField, SuggestionDraft, SuggestionError, SuggestionResponse,
};
use crate::workflows::contributions::workflow::WorkflowAction;

fn suggestion(field: &str, value: &str) -> SuggestionDraft {
    SuggestionDraft {
        field: field.to_string(),
        suggested_value: value.to_string(),
        note: None,
    }
}

/// Files, submits, claims, and returns a Q1 claim with the given suggestions.
fn returned_claim(service: &TestService, suggestions: Vec<SuggestionDraft>) -> ContributionId {
    let applicant = applicant_actor();
    let record = service
        .create_draft(
            &applicant,
            research_draft(
                Some(AuthorRole::FirstAuthor),
                vec![contributor(
                    "Dr. Vikram Sen",
                    Some("F200"),
                    ContributorCategory::InternalFaculty,
                    AuthorRole::CorrespondingAuthor,
                )],
            ),
        )
        .expect("draft created");
    let id = record.contribution.id.clone();
    service
        .transition(&id, &applicant, WorkflowAction::Submit, None)
        .expect("submitted");
    service
        .transition(&id, &reviewer(), WorkflowAction::ClaimReview, None)
        .expect("claimed");
    service
        .transition(
            &id,
            &reviewer(),
            WorkflowAction::RequestChanges {
                comments: "Scopus lists the journal as Q2".to_string(),
                suggestions,
            },
            None,
        )
        .expect("changes requested");
    id
}

#[test]
fn field_names_accept_form_keys() {
    assert_eq!(
        ContributionField::parse("publicationDate"),
        Ok(ContributionField::PublicationDate)
    );
    assert_eq!(
        ContributionField::parse("best_paper_award"),
        Ok(ContributionField::BestPaperAward)
    );
    assert_eq!(
        ContributionField::parse("sanctionedAmount"),
        Ok(ContributionField::SanctionedAmount)
    );
    assert!(matches!(
        ContributionField::parse("favouriteColour"),
        Err(SuggestionError::UnknownField { .. })
    ));
}

#[test]
fn values_are_coerced_to_field_types() {
    let mut journal_claim = claim(
        journal(Some(Quartile::Q1), None),
        faculty_applicant(None),
        &[],
        None,
    );
    apply_suggestion(&mut journal_claim, ContributionField::Quartile, "q2").expect("quartile");
    apply_suggestion(&mut journal_claim, ContributionField::IndexedIn, "Scopus, WoS ,")
        .expect("index list");
    apply_suggestion(&mut journal_claim, ContributionField::PublicationDate, "2024-11-02")
        .expect("date");

    let PublicationDetails::ResearchPaper(details) = &journal_claim.details else {
        panic!("journal claim changed type");
    };
    assert_eq!(details.quartile, Some(Quartile::Q2));
    assert_eq!(details.indexed_in, vec!["Scopus".to_string(), "WoS".to_string()]);
    assert_eq!(journal_claim.publication_date, Some(date(2024, 11, 2)));

    let mut book_claim = claim(
        PublicationDetails::Book(BookDetails {
            book_type: BookType::Authored,
            indexing: BookIndexing::NonIndexed,
            international: false,
            publisher: "Campus Press".to_string(),
            book_title: None,
        }),
        faculty_applicant(None),
        &[],
        None,
    );
    apply_suggestion(&mut book_claim, ContributionField::International, "Yes")
        .expect("yes is true");
    let PublicationDetails::Book(book) = &book_claim.details else {
        panic!("book claim changed type");
    };
    assert!(book.international);
}

#[test]
fn invalid_or_inapplicable_values_are_refused() {
    let mut journal_claim = claim(
        journal(Some(Quartile::Q1), None),
        faculty_applicant(None),
        &[],
        None,
    );
    let before = journal_claim.clone();

    assert!(matches!(
        apply_suggestion(&mut journal_claim, ContributionField::Quartile, "Q9"),
        Err(SuggestionError::InvalidValue {
            field: "quartile",
            ..
        })
    ));
    assert!(matches!(
        apply_suggestion(&mut journal_claim, ContributionField::BestPaperAward, "yes"),
        Err(SuggestionError::NotApplicable {
            field: "best_paper_award",
            publication_type: "research_paper",
        })
    ));
    assert!(matches!(
        apply_suggestion(&mut journal_claim, ContributionField::DeclaredAuthorCount, "0"),
        Err(SuggestionError::InvalidValue { .. })
    ));
    assert_eq!(journal_claim, before);
}

#[test]
fn change_request_records_original_values() {
    let (service, _, _) = build_service();
    let id = returned_claim(
        &service,
        vec![suggestion("quartile", "Q2"), suggestion("journalName", "Applied Systems Letters")],
    );

    let record = service.get(&id).expect("record");
    assert_eq!(record.contribution.status, ContributionStatus::ChangesRequired);
    let review = record.latest_review().expect("change request");
    assert_eq!(review.pending_suggestions, 2);
    assert_eq!(review.suggestions[0].field, "quartile");
    assert_eq!(review.suggestions[0].original_value.as_deref(), Some("Q1"));
    assert_eq!(review.suggestions[1].field, "journal_name");
    assert!(review
        .suggestions
        .iter()
        .all(|suggestion| suggestion.status == SuggestionStatus::Pending));
}

#[test]
fn unknown_suggestion_field_blocks_the_change_request() {
    let (service, _, _) = build_service();
    let applicant = applicant_actor();
    let record = service
        .create_draft(&applicant, research_draft(None, Vec::new()))
        .expect("draft created");
    let id = record.contribution.id.clone();
    service
        .transition(&id, &applicant, WorkflowAction::Submit, None)
        .expect("submitted");
    service
        .transition(&id, &reviewer(), WorkflowAction::ClaimReview, None)
        .expect("claimed");

    let err = service
        .transition(
            &id,
            &reviewer(),
            WorkflowAction::RequestChanges {
                comments: "Fix the colour".to_string(),
                suggestions: vec![suggestion("favouriteColour", "blue")],
            },
            None,
        )
        .expect_err("unknown field");

    assert!(matches!(
        err,
        WorkflowError::Suggestion(SuggestionError::UnknownField { .. })
    ));
    assert_eq!(
        service.get(&id).expect("record").contribution.status,
        ContributionStatus::UnderReview
    );
}

#[test]
fn unusable_suggestions_are_refused_when_filed() {
    let (service, _, _) = build_service();
    let applicant = applicant_actor();
    let record = service
        .create_draft(&applicant, research_draft(None, Vec::new()))
        .expect("draft created");
    let id = record.contribution.id.clone();
    service
        .transition(&id, &applicant, WorkflowAction::Submit, None)
        .expect("submitted");
    service
        .transition(&id, &reviewer(), WorkflowAction::ClaimReview, None)
        .expect("claimed");

    let request = |suggestions: Vec<SuggestionDraft>| WorkflowAction::RequestChanges {
        comments: "Please correct the venue".to_string(),
        suggestions,
    };

    let err = service
        .transition(&id, &reviewer(), request(vec![suggestion("quartile", "Q9")]), None)
        .expect_err("quartile does not exist");
    assert!(matches!(
        err,
        WorkflowError::Suggestion(SuggestionError::InvalidValue { field: "quartile", .. })
    ));

    let err = service
        .transition(
            &id,
            &reviewer(),
            request(vec![
                suggestion("quartile", "Q2"),
                suggestion("bookType", "authored"),
            ]),
            None,
        )
        .expect_err("book type does not apply to a journal paper");
    assert!(matches!(
        err,
        WorkflowError::Suggestion(SuggestionError::NotApplicable { .. })
    ));

    let record = service.get(&id).expect("record");
    assert_eq!(record.contribution.status, ContributionStatus::UnderReview);
    assert!(record
        .reviews
        .iter()
        .all(|review| review.suggestions.is_empty()));
}

#[test]
fn accepting_a_policy_field_recomputes_shares() {
    let (service, _, _) = build_service();
    let id = returned_claim(&service, vec![suggestion("quartile", "Q2")]);
    let suggestion_id = service.get(&id).expect("record").reviews[1].suggestions[0]
        .id
        .clone();

    let record = service
        .respond_to_suggestion(
            &id,
            &suggestion_id,
            &applicant_actor(),
            SuggestionResponse::Accept,
            None,
        )
        .expect("accepted");

    let contribution = &record.contribution;
    assert_eq!(contribution.calculated_incentive_amount, 10_500);
    assert_eq!(contribution.calculated_points, 10);
    assert_eq!(contribution.contributors[0].incentive_share, 9_000);
    let review = record.latest_review().expect("review");
    assert_eq!(review.suggestions[0].status, SuggestionStatus::Accepted);
    assert_eq!(review.pending_suggestions, 0);

    let again = service
        .respond_to_suggestion(
            &id,
            &suggestion_id,
            &applicant_actor(),
            SuggestionResponse::Reject,
            None,
        )
        .expect_err("already answered");
    assert!(matches!(
        again,
        WorkflowError::Suggestion(SuggestionError::AlreadyAnswered { .. })
    ));
}

#[test]
fn rejecting_a_suggestion_only_marks_it() {
    let (service, _, _) = build_service();
    let id = returned_claim(&service, vec![suggestion("quartile", "Q2")]);
    let before = service.get(&id).expect("record");
    let suggestion_id = before.reviews[1].suggestions[0].id.clone();

    let record = service
        .respond_to_suggestion(
            &id,
            &suggestion_id,
            &applicant_actor(),
            SuggestionResponse::Reject,
            Some(before.version),
        )
        .expect("rejected");

    let review = record.latest_review().expect("review");
    assert_eq!(review.suggestions[0].status, SuggestionStatus::Rejected);
    assert_eq!(review.pending_suggestions, 1);
    assert_eq!(record.contribution.details, before.contribution.details);
    assert_eq!(
        record.contribution.calculated_incentive_amount,
        before.contribution.calculated_incentive_amount
    );
}

#[test]
fn only_the_applicant_answers_suggestions() {
    let (service, _, _) = build_service();
    let id = returned_claim(&service, vec![suggestion("quartile", "Q2")]);
    let suggestion_id = service.get(&id).expect("record").reviews[1].suggestions[0]
        .id
        .clone();

    let err = service
        .respond_to_suggestion(
            &id,
            &suggestion_id,
            &reviewer(),
            SuggestionResponse::Accept,
            None,
        )
        .expect_err("reviewer cannot answer");
    assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
}
