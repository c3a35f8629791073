//! The voting methods.
//!
//! Every method implements [`BallotComponentType`]. Calling code never looks at
//! the concrete types: it resolves a `dyn BallotComponentType` through the
//! [`crate::registry::Registry`].

pub mod approval_vote;
pub mod first_past_the_post;
pub mod ranked_choice;
pub mod yes_no;

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;

use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JSValue;

use crate::config::*;
use crate::error::{integrity, BallotResult};
use crate::validation::{self, RuleSet};

pub use approval_vote::ApprovalVote;
pub use first_past_the_post::FirstPastThePost;
pub use ranked_choice::RankedChoice;
pub use yes_no::YesNo;

/// The static configuration of a voting method.
///
/// One value per variant instance, owned by the registry.
#[derive(Debug, Clone)]
pub struct MethodSettings {
    /// Whether the administrator must provide options when creating a component.
    pub needs_options: bool,
    /// Rules for the `options.*` fields of a creation or update payload.
    pub options_validator: RuleSet,
    /// The options stored when `needs_options` is false.
    pub preset_options: JSValue,
    /// Name of the administration form for the options, if any.
    pub form: Option<&'static str>,
}

/// User-facing labels of a method.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct MethodStrings {
    pub name: &'static str,
    pub description: &'static str,
    pub instructions: &'static str,
}

/// The capabilities of a voting method.
pub trait BallotComponentType: Debug + Send + Sync {
    fn kind(&self) -> VotingMethodKind;

    fn settings(&self) -> &MethodSettings;

    fn strings(&self) -> MethodStrings;

    /// Rules for the value a voter submits for this component, keyed by the
    /// component id.
    fn submission_validator(
        &self,
        component: &BallotComponent,
        ballot: &Ballot,
    ) -> BallotResult<RuleSet>;

    /// Turns a raw value that passed the submission validator into a typed value.
    fn decode_value(&self, component: &BallotComponent, raw: &JSValue)
        -> Result<VoteValue, String>;

    /// The counting algorithm. A pure function of the votes and of the
    /// component configuration.
    fn calculate_results(
        &self,
        votes: &[Vote],
        component: &BallotComponent,
    ) -> BallotResult<ComponentResults>;

    /// Projects the value of one vote for this component into a single cell.
    fn values_to_csv(&self, vote: &Vote, component_id: ComponentId) -> BallotResult<String>;
}

// ******** Shared pieces *********

/// Options of the methods that pick among candidates.
#[derive(Eq, PartialEq, Debug, Clone, serde::Deserialize)]
pub(crate) struct CandidateOptions {
    pub candidates: Vec<String>,
    #[serde(default)]
    pub max_rankings: Option<u32>,
    #[serde(default)]
    pub max_approvals: Option<u32>,
}

pub(crate) fn candidates_rules() -> RuleSet {
    RuleSet::new().field(
        "options.candidates",
        vec![
            validation::required(),
            validation::array(),
            validation::min(2),
            validation::max(TallyLimits::DEFAULT_LIMITS.max_candidates as i64),
            validation::each_string(),
            validation::distinct(),
        ],
    )
}

/// Rules for an optional per-voter cap such as `options.max_rankings`. The cap
/// can never exceed the number of candidates a component may have.
pub(crate) fn cap_rules() -> Vec<validation::Rule> {
    vec![
        validation::nullable(),
        validation::integer(),
        validation::min(1),
        validation::max(TallyLimits::DEFAULT_LIMITS.max_candidates as i64),
    ]
}

pub(crate) fn parse_options<T: DeserializeOwned>(component: &BallotComponent) -> BallotResult<T> {
    serde_json::from_value(component.options.clone()).map_err(|e| {
        integrity(
            component.id,
            None,
            format!("stored options cannot be read: {}", e),
        )
    })
}

/// Reads the candidate options and checks what the options validator would
/// have enforced.
pub(crate) fn candidate_options(component: &BallotComponent) -> BallotResult<CandidateOptions> {
    let opts: CandidateOptions = parse_options(component)?;
    let unique: HashSet<&String> = opts.candidates.iter().collect();
    if opts.candidates.is_empty() || unique.len() != opts.candidates.len() {
        return Err(integrity(
            component.id,
            None,
            "stored candidates must be a non-empty list without duplicates",
        ));
    }
    Ok(opts)
}

/// Plurality counting shared by first-past-the-post and approval voting.
/// Ties are reported, never broken.
pub(crate) fn plurality_results(
    candidates: &[String],
    counts: &HashMap<String, u64>,
    counted: u64,
    abstained: u64,
) -> PluralityResults {
    let tally: Vec<CandidateTally> = candidates
        .iter()
        .map(|c| CandidateTally {
            candidate: c.clone(),
            votes: counts.get(c).cloned().unwrap_or(0),
        })
        .collect();
    let max_count = tally.iter().map(|ct| ct.votes).max().unwrap_or(0);
    let winners: Vec<String> = if max_count == 0 {
        Vec::new()
    } else {
        tally
            .iter()
            .filter(|ct| ct.votes == max_count)
            .map(|ct| ct.candidate.clone())
            .collect()
    };
    debug!(
        "plurality_results: tally: {:?} winners: {:?}",
        tally, winners
    );
    PluralityResults {
        tie: winners.len() > 1,
        winners,
        tally,
        counted,
        abstained,
    }
}

/// Decodes a JSON array of strings. The submission validator already checked
/// the shape, this only guards against misuse.
pub(crate) fn decode_string_list(raw: &JSValue) -> Result<Vec<String>, String> {
    match raw {
        JSValue::Array(items) => items
            .iter()
            .map(|x| match x {
                JSValue::String(s) => Ok(s.clone()),
                _ => Err(format!("expected a string, got {}", x)),
            })
            .collect(),
        _ => Err(format!("expected an array, got {}", raw)),
    }
}

/// Values that did not pass through `decode_value` of the right method.
pub(crate) fn wrong_shape(
    component_id: ComponentId,
    vote: &Vote,
    expected: &str,
    got: &VoteValue,
) -> crate::error::BallotError {
    integrity(
        component_id,
        Some(&vote.id),
        format!("expected a {} value, got {:?}", expected, got),
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub fn ballot() -> Ballot {
        Ballot {
            id: BallotId(1),
            election_id: 1,
            title: "Board election".to_string(),
            is_secret: true,
        }
    }

    pub fn component(id: u64, kind: VotingMethodKind, options: JSValue) -> BallotComponent {
        BallotComponent {
            id: ComponentId(id),
            ballot_id: BallotId(1),
            kind,
            version: "v1".to_string(),
            title: format!("Question {}", id),
            description: String::new(),
            order: id as i64,
            options,
            active: true,
            finished: false,
        }
    }

    /// One cast vote per entry, `None` leaving the component without a value.
    pub fn votes_for(component_id: ComponentId, values: &[Option<VoteValue>]) -> Vec<Vote> {
        values
            .iter()
            .enumerate()
            .map(|(idx, v)| Vote {
                id: VoteId(format!("vote-{:04}", idx + 1)),
                ballot_id: BallotId(1),
                voter: None,
                cast: true,
                values: v.iter().map(|x| (component_id, x.clone())).collect(),
            })
            .collect()
    }

    pub fn ranked(names: &[&str]) -> VoteValue {
        VoteValue::Ranked(names.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn plurality_reports_ties_without_breaking_them() {
        let candidates: Vec<String> = vec!["a".into(), "b".into(), "c".into()];
        let counts: HashMap<String, u64> =
            [("a".to_string(), 2), ("b".to_string(), 2)].into_iter().collect();
        let res = plurality_results(&candidates, &counts, 4, 0);
        assert_eq!(res.winners, vec!["a".to_string(), "b".to_string()]);
        assert!(res.tie);
        assert_eq!(res.tally[2].votes, 0);
    }

    #[test]
    fn plurality_without_votes_has_no_winner() {
        let candidates: Vec<String> = vec!["a".into(), "b".into()];
        let res = plurality_results(&candidates, &HashMap::new(), 0, 3);
        assert!(res.winners.is_empty());
        assert!(!res.tie);
        assert_eq!(res.abstained, 3);
    }

    #[test]
    fn unreadable_stored_options_are_a_data_integrity_fault() {
        let c = component(2, VotingMethodKind::FirstPastThePost, serde_json::json!({"candidates": "a"}));
        assert!(candidate_options(&c).is_err());
        let dup = component(
            2,
            VotingMethodKind::FirstPastThePost,
            serde_json::json!({"candidates": ["a", "a"]}),
        );
        assert!(candidate_options(&dup).is_err());
    }
}
