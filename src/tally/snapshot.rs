use serde::{Deserialize, Serialize};
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;

use ballot_components::*;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputSettings {
    pub contest_name: String,
    pub results_file: Option<String>,
    pub csv_file: Option<String>,
    pub vote_id_label: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotBallot {
    pub id: u64,
    pub election_id: u64,
    pub title: String,
    #[serde(default)]
    pub is_secret: bool,
}

impl SnapshotBallot {
    pub fn to_ballot(&self) -> Ballot {
        Ballot {
            id: BallotId(self.id),
            election_id: self.election_id,
            title: self.title.clone(),
            is_secret: self.is_secret,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotComponent {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: String,
    pub version: String,
    pub title: String,
    pub description: Option<String>,
    pub order: Option<i64>,
    pub options: Option<JSValue>,
    pub active: Option<bool>,
    pub finished: Option<bool>,
}

impl SnapshotComponent {
    /// Unknown voting methods are not found.
    pub fn to_component(&self, ballot_id: BallotId) -> BallotResult<BallotComponent> {
        let kind = self
            .kind
            .parse::<VotingMethodKind>()
            .map_err(|_| BallotError::NotFound {
                what: "voting method",
                key: format!("{} {}", self.kind, self.version),
            })?;
        Ok(BallotComponent {
            id: ComponentId(self.id),
            ballot_id,
            kind,
            version: self.version.clone(),
            title: self.title.clone(),
            description: self.description.clone().unwrap_or_default(),
            order: self.order.unwrap_or(0),
            options: self.options.clone().unwrap_or(JSValue::Null),
            active: self.active.unwrap_or(true),
            finished: self.finished.unwrap_or(false),
        })
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotVote {
    pub id: String,
    pub voter: Option<String>,
    /// Raw values by component id.
    #[serde(default)]
    pub values: JSMap<String, JSValue>,
}

/// A ballot with its components and its cast votes.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub output_settings: OutputSettings,
    pub ballot: SnapshotBallot,
    pub components: Vec<SnapshotComponent>,
    #[serde(default)]
    pub votes: Vec<SnapshotVote>,
}

/// The `config` section of the summary.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputConfig {
    pub contest: String,
    pub ballot: String,
    pub components: usize,
    pub cast_votes: usize,
}
