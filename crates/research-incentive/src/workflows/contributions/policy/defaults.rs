use std::collections::BTreeMap;

use serde::Serialize;

use super::super::domain::{ConferenceSubType, PublicationType, Quartile};
use super::model::{
    Award, BookRules, FlatConferenceRules, GrantRules, IndexedConferenceRules, PolicyRules,
    ResearchPaperRules, RoleSplit, ScopeAwards, SjrBand,
};

/// Built-in rule table used whenever no administrator policy is active.
///
/// The same instance backs the calculator fallback and the policy preview
/// endpoint so the two can never disagree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyDefaults {
    pub research_paper: ResearchPaperRules,
    pub book: BookRules,
    pub book_chapter: BookRules,
    pub indexed_conference: IndexedConferenceRules,
    pub not_indexed_conference: FlatConferenceRules,
    pub keynote_conference: FlatConferenceRules,
    pub organizer_conference: FlatConferenceRules,
    pub grant: GrantRules,
    /// Bands consulted when neither a quartile nor a configured SJR band matched.
    pub sjr_fallback: Vec<SjrBand>,
}

impl PolicyDefaults {
    pub fn standard() -> Self {
        let split = RoleSplit::default();

        Self {
            research_paper: ResearchPaperRules {
                role_split: split,
                quartiles: quartile_table([
                    (Quartile::Top1, Award::new(100_000, 100)),
                    (Quartile::Top5, Award::new(75_000, 75)),
                    (Quartile::Q1, Award::new(50_000, 50)),
                    (Quartile::Q2, Award::new(30_000, 30)),
                    (Quartile::Q3, Award::new(15_000, 15)),
                    (Quartile::Q4, Award::new(5_000, 5)),
                ]),
                sjr_bands: Vec::new(),
            },
            book: BookRules {
                authored: Award::new(30_000, 30),
                edited: Award::new(15_000, 15),
                scopus_bonus: Award::new(20_000, 20),
                non_indexed_bonus: Award::ZERO,
                sgt_house_bonus: Award::new(5_000, 5),
                international_bonus: Award::new(10_000, 10),
            },
            book_chapter: BookRules {
                authored: Award::new(10_000, 10),
                edited: Award::new(5_000, 5),
                scopus_bonus: Award::new(5_000, 5),
                non_indexed_bonus: Award::ZERO,
                sgt_house_bonus: Award::new(2_000, 2),
                international_bonus: Award::new(3_000, 3),
            },
            indexed_conference: IndexedConferenceRules {
                role_split: split,
                proceedings_quartiles: quartile_table([
                    (Quartile::Top1, Award::new(40_000, 40)),
                    (Quartile::Top5, Award::new(30_000, 30)),
                    (Quartile::Q1, Award::new(20_000, 20)),
                    (Quartile::Q2, Award::new(15_000, 15)),
                    (Quartile::Q3, Award::new(10_000, 10)),
                    (Quartile::Q4, Award::new(5_000, 5)),
                ]),
                international_bonus: Award::new(5_000, 5),
                best_paper_bonus: Award::new(5_000, 5),
            },
            not_indexed_conference: FlatConferenceRules {
                role_split: split,
                awards: ScopeAwards {
                    national: Award::new(3_000, 3),
                    international: Award::new(5_000, 5),
                },
            },
            keynote_conference: FlatConferenceRules {
                role_split: split,
                awards: ScopeAwards {
                    national: Award::new(5_000, 5),
                    international: Award::new(10_000, 10),
                },
            },
            organizer_conference: FlatConferenceRules {
                role_split: split,
                awards: ScopeAwards {
                    national: Award::new(5_000, 5),
                    international: Award::new(10_000, 10),
                },
            },
            grant: GrantRules {
                role_split: split,
                awards: ScopeAwards {
                    national: Award::new(25_000, 25),
                    international: Award::new(50_000, 50),
                },
            },
            sjr_fallback: vec![
                SjrBand {
                    min: 2.0,
                    max: None,
                    award: Award::new(50_000, 50),
                },
                SjrBand {
                    min: 1.0,
                    max: Some(2.0),
                    award: Award::new(30_000, 30),
                },
                SjrBand {
                    min: 0.5,
                    max: Some(1.0),
                    award: Award::new(15_000, 15),
                },
                SjrBand {
                    min: 0.1,
                    max: Some(0.5),
                    award: Award::new(5_000, 5),
                },
            ],
        }
    }

    /// Rules for a publication type; conference papers need a sub-type.
    pub fn rules_for(
        &self,
        publication_type: PublicationType,
        sub_type: Option<ConferenceSubType>,
    ) -> Option<PolicyRules> {
        let rules = match publication_type {
            PublicationType::ResearchPaper => PolicyRules::ResearchPaper(self.research_paper.clone()),
            PublicationType::Book => PolicyRules::Book(self.book),
            PublicationType::BookChapter => PolicyRules::BookChapter(self.book_chapter),
            PublicationType::Grant => PolicyRules::Grant(self.grant),
            PublicationType::ConferencePaper => match sub_type? {
                ConferenceSubType::ScopusIndexed => {
                    PolicyRules::IndexedConference(self.indexed_conference.clone())
                }
                ConferenceSubType::NotIndexed => {
                    PolicyRules::FlatConference(self.not_indexed_conference)
                }
                ConferenceSubType::KeynoteInvited => {
                    PolicyRules::FlatConference(self.keynote_conference)
                }
                ConferenceSubType::Organizer => {
                    PolicyRules::FlatConference(self.organizer_conference)
                }
            },
        };
        Some(rules)
    }
}

impl Default for PolicyDefaults {
    fn default() -> Self {
        Self::standard()
    }
}

fn quartile_table<const N: usize>(entries: [(Quartile, Award); N]) -> BTreeMap<Quartile, Award> {
    entries.into_iter().collect()
}
