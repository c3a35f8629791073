// ********* Identifiers ***********

use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BallotId(pub u64);

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(pub u64);

/// The identity of a vote. For generated votes this is the code handed out to
/// the voter.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoteId(pub String);

impl Display for BallotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for VoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ********* Voting methods ***********

/// All the voting methods known to the registry.
///
/// The names are the ones stored in the `type` field of a component.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum VotingMethodKind {
    YesNo,
    FirstPastThePost,
    RankedChoice,
    ApprovalVote,
}

impl VotingMethodKind {
    pub const ALL: [VotingMethodKind; 4] = [
        VotingMethodKind::YesNo,
        VotingMethodKind::FirstPastThePost,
        VotingMethodKind::RankedChoice,
        VotingMethodKind::ApprovalVote,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            VotingMethodKind::YesNo => "YesNo",
            VotingMethodKind::FirstPastThePost => "FirstPastThePost",
            VotingMethodKind::RankedChoice => "RankedChoice",
            VotingMethodKind::ApprovalVote => "ApprovalVote",
        }
    }
}

impl Display for VotingMethodKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for VotingMethodKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VotingMethodKind::ALL
            .iter()
            .find(|k| k.name() == s)
            .copied()
            .ok_or_else(|| format!("unknown voting method {:?}", s))
    }
}

// ********* Input data structures ***********

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Ballot {
    pub id: BallotId,
    pub election_id: u64,
    pub title: String,
    /// Secret ballots hand out anonymous codes, public ballots link every code
    /// to a voter.
    pub is_secret: bool,
}

/// One voting-method instance within a ballot.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct BallotComponent {
    pub id: ComponentId,
    pub ballot_id: BallotId,
    #[serde(rename = "type")]
    pub kind: VotingMethodKind,
    pub version: String,
    pub title: String,
    pub description: String,
    pub order: i64,
    /// Method-specific configuration. The schema is owned by the variant.
    pub options: JSValue,
    pub active: bool,
    pub finished: bool,
}

impl BallotComponent {
    /// An active `v1` component without options.
    pub fn new(
        id: ComponentId,
        ballot_id: BallotId,
        kind: VotingMethodKind,
        title: &str,
    ) -> BallotComponent {
        BallotComponent {
            id,
            ballot_id,
            kind,
            version: "v1".to_string(),
            title: title.to_string(),
            description: String::new(),
            order: 0,
            options: JSValue::Null,
            active: true,
            finished: false,
        }
    }

    pub fn with_options(self, options: JSValue) -> BallotComponent {
        BallotComponent { options, ..self }
    }

    pub fn with_order(self, order: i64) -> BallotComponent {
        BallotComponent { order, ..self }
    }
}

/// A typed vote value for one component.
///
/// The raw submission of a voter is turned into one of these at the boundary,
/// so the counting algorithms never look at untyped data.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum VoteValue {
    /// An explicit `null` submission.
    Abstain,
    Boolean(bool),
    Single(String),
    /// Candidates in order of preference.
    Ranked(Vec<String>),
    /// Approved candidates, kept sorted and without duplicates.
    Set(Vec<String>),
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub id: VoteId,
    pub ballot_id: BallotId,
    /// The voter this code was issued to. Always empty for secret ballots.
    pub voter: Option<String>,
    pub cast: bool,
    pub values: BTreeMap<ComponentId, VoteValue>,
}

impl Vote {
    pub fn value_for(&self, component_id: ComponentId) -> Option<&VoteValue> {
        self.values.get(&component_id)
    }
}

// ******** Output data structures *********

#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct CandidateTally {
    pub candidate: String,
    pub votes: u64,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct YesNoResults {
    pub yes: u64,
    pub no: u64,
    /// Votes without a value for this component, or with an explicit abstention.
    pub abstained: u64,
}

/// Results for the methods where the candidate(s) with the most votes win.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct PluralityResults {
    /// In the order of the candidates declared in the options.
    pub tally: Vec<CandidateTally>,
    /// All the candidates sharing the maximum count. Empty if nobody got a vote.
    pub winners: Vec<String>,
    pub tie: bool,
    /// Number of ballots that expressed a choice.
    pub counted: u64,
    pub abstained: u64,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct EliminationStats {
    pub candidate: String,
    pub transfers: Vec<CandidateTally>,
    pub exhausted: u64,
}

/// Statistics for one instant-runoff round
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct RoundStats {
    pub round: u32,
    pub tally: Vec<CandidateTally>,
    /// Ballots still ranking a surviving candidate.
    pub active: u64,
    /// Number of votes needed for a strict majority of the active ballots.
    pub threshold: u64,
    pub eliminated: Vec<EliminationStats>,
    pub elected: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RankedOutcome {
    Elected {
        winner: String,
    },
    /// The lowest candidates are tied and eliminating them in any order could
    /// change the outcome. Counting stopped at this round.
    EliminationTie {
        round: u32,
        candidates: Vec<String>,
    },
    NoActiveBallots,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct RankedChoiceResults {
    pub rounds: Vec<RoundStats>,
    pub outcome: RankedOutcome,
    /// Ballots exhausted over all the rounds.
    pub exhausted: u64,
    pub abstained: u64,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ComponentResults {
    YesNo(YesNoResults),
    Plurality(PluralityResults),
    RankedChoice(RankedChoiceResults),
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct ComponentResultEntry {
    pub results: ComponentResults,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: VotingMethodKind,
}

// ********* Configuration **********

/// Upper bounds applied before any calculation or write.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct TallyLimits {
    pub max_components_per_ballot: usize,
    pub max_candidates: usize,
    pub max_cast_votes: usize,
    pub min_generated_votes: u64,
    pub max_generated_votes: u64,
}

impl TallyLimits {
    pub const DEFAULT_LIMITS: TallyLimits = TallyLimits {
        max_components_per_ballot: 256,
        max_candidates: 1000,
        max_cast_votes: 1_000_000,
        min_generated_votes: 1,
        max_generated_votes: 10_000,
    };
}

impl Default for TallyLimits {
    fn default() -> Self {
        TallyLimits::DEFAULT_LIMITS
    }
}
