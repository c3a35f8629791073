//! Storage of ballots, components and votes.
//!
//! The tallying core only talks to storage through these traits. The
//! [`MemoryStore`] is enough for the command line tool and for tests.

use std::collections::{BTreeMap, HashSet};

use log::debug;
use serde_json::Value as JSValue;

use crate::config::*;
use crate::error::{BallotError, BallotResult, ValidationErrors};
use crate::results::in_ballot_order;

/// The fields of a component that does not exist yet.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct NewComponent {
    pub ballot_id: BallotId,
    pub kind: VotingMethodKind,
    pub version: String,
    pub title: String,
    pub description: String,
    pub order: i64,
    pub options: JSValue,
    pub active: bool,
    pub finished: bool,
}

/// A partial update. `None` leaves the field unchanged.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ComponentPatch {
    pub kind: Option<VotingMethodKind>,
    pub version: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub order: Option<i64>,
    pub options: Option<JSValue>,
    pub active: Option<bool>,
    pub finished: Option<bool>,
}

impl ComponentPatch {
    pub fn is_empty(&self) -> bool {
        *self == ComponentPatch::default()
    }

    pub fn apply(self, c: &mut BallotComponent) {
        if let Some(x) = self.kind {
            c.kind = x;
        }
        if let Some(x) = self.version {
            c.version = x;
        }
        if let Some(x) = self.title {
            c.title = x;
        }
        if let Some(x) = self.description {
            c.description = x;
        }
        if let Some(x) = self.order {
            c.order = x;
        }
        if let Some(x) = self.options {
            c.options = x;
        }
        if let Some(x) = self.active {
            c.active = x;
        }
        if let Some(x) = self.finished {
            c.finished = x;
        }
    }
}

pub trait BallotStore {
    fn ballot(&self, id: BallotId) -> BallotResult<Ballot>;
}

pub trait ComponentStore {
    fn create_component(&mut self, fields: NewComponent) -> BallotResult<BallotComponent>;

    fn component(&self, id: ComponentId) -> BallotResult<BallotComponent>;

    fn update_component(
        &mut self,
        id: ComponentId,
        patch: ComponentPatch,
    ) -> BallotResult<BallotComponent>;

    fn delete_component(&mut self, id: ComponentId) -> BallotResult<()>;

    /// The components of a ballot, by `order` then id.
    fn list_components(&self, ballot_id: BallotId) -> BallotResult<Vec<BallotComponent>>;
}

pub trait VoteStore {
    /// The cast votes of a ballot, in a stable order.
    fn cast_votes(&self, ballot_id: BallotId) -> BallotResult<Vec<Vote>>;

    /// All the votes of a ballot, cast or not.
    fn votes(&self, ballot_id: BallotId) -> BallotResult<Vec<Vote>>;

    fn vote(&self, ballot_id: BallotId, id: &VoteId) -> BallotResult<Vote>;

    /// Inserts all the votes or none of them.
    fn insert_votes(&mut self, votes: Vec<Vote>) -> BallotResult<()>;

    /// Replaces an existing vote.
    fn save_vote(&mut self, vote: Vote) -> BallotResult<()>;
}

/// An in-memory store. Votes are returned in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    ballots: BTreeMap<BallotId, Ballot>,
    components: BTreeMap<ComponentId, BallotComponent>,
    votes: Vec<Vote>,
    next_component_id: u64,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn add_ballot(&mut self, ballot: Ballot) {
        self.ballots.insert(ballot.id, ballot);
    }

    /// Inserts a component with a known id, as found in a snapshot.
    pub fn insert_component(&mut self, component: BallotComponent) -> BallotResult<()> {
        if !self.ballots.contains_key(&component.ballot_id) {
            return Err(ballot_not_found(component.ballot_id));
        }
        if self.components.contains_key(&component.id) {
            let mut errors = ValidationErrors::default();
            errors.push("id", format!("component {} already exists", component.id));
            return Err(errors.into());
        }
        self.next_component_id = self.next_component_id.max(component.id.0);
        self.components.insert(component.id, component);
        Ok(())
    }
}

fn ballot_not_found(id: BallotId) -> BallotError {
    BallotError::NotFound {
        what: "ballot",
        key: id.to_string(),
    }
}

fn component_not_found(id: ComponentId) -> BallotError {
    BallotError::NotFound {
        what: "component",
        key: id.to_string(),
    }
}

impl BallotStore for MemoryStore {
    fn ballot(&self, id: BallotId) -> BallotResult<Ballot> {
        self.ballots
            .get(&id)
            .cloned()
            .ok_or_else(|| ballot_not_found(id))
    }
}

impl ComponentStore for MemoryStore {
    fn create_component(&mut self, fields: NewComponent) -> BallotResult<BallotComponent> {
        if !self.ballots.contains_key(&fields.ballot_id) {
            return Err(ballot_not_found(fields.ballot_id));
        }
        self.next_component_id += 1;
        let c = BallotComponent {
            id: ComponentId(self.next_component_id),
            ballot_id: fields.ballot_id,
            kind: fields.kind,
            version: fields.version,
            title: fields.title,
            description: fields.description,
            order: fields.order,
            options: fields.options,
            active: fields.active,
            finished: fields.finished,
        };
        debug!("create_component: {:?}", c);
        self.components.insert(c.id, c.clone());
        Ok(c)
    }

    fn component(&self, id: ComponentId) -> BallotResult<BallotComponent> {
        self.components
            .get(&id)
            .cloned()
            .ok_or_else(|| component_not_found(id))
    }

    fn update_component(
        &mut self,
        id: ComponentId,
        patch: ComponentPatch,
    ) -> BallotResult<BallotComponent> {
        let c = self
            .components
            .get_mut(&id)
            .ok_or_else(|| component_not_found(id))?;
        patch.apply(c);
        Ok(c.clone())
    }

    fn delete_component(&mut self, id: ComponentId) -> BallotResult<()> {
        self.components
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| component_not_found(id))
    }

    fn list_components(&self, ballot_id: BallotId) -> BallotResult<Vec<BallotComponent>> {
        if !self.ballots.contains_key(&ballot_id) {
            return Err(ballot_not_found(ballot_id));
        }
        let of_ballot: Vec<BallotComponent> = self
            .components
            .values()
            .filter(|c| c.ballot_id == ballot_id)
            .cloned()
            .collect();
        Ok(in_ballot_order(&of_ballot).into_iter().cloned().collect())
    }
}

impl VoteStore for MemoryStore {
    fn cast_votes(&self, ballot_id: BallotId) -> BallotResult<Vec<Vote>> {
        Ok(self
            .votes(ballot_id)?
            .into_iter()
            .filter(|v| v.cast)
            .collect())
    }

    fn votes(&self, ballot_id: BallotId) -> BallotResult<Vec<Vote>> {
        if !self.ballots.contains_key(&ballot_id) {
            return Err(ballot_not_found(ballot_id));
        }
        Ok(self
            .votes
            .iter()
            .filter(|v| v.ballot_id == ballot_id)
            .cloned()
            .collect())
    }

    fn vote(&self, ballot_id: BallotId, id: &VoteId) -> BallotResult<Vote> {
        self.votes
            .iter()
            .find(|v| v.ballot_id == ballot_id && v.id == *id)
            .cloned()
            .ok_or_else(|| BallotError::NotFound {
                what: "vote",
                key: id.to_string(),
            })
    }

    fn insert_votes(&mut self, votes: Vec<Vote>) -> BallotResult<()> {
        let mut seen: HashSet<(BallotId, VoteId)> = self
            .votes
            .iter()
            .map(|v| (v.ballot_id, v.id.clone()))
            .collect();
        let mut errors = ValidationErrors::default();
        for v in votes.iter() {
            if !self.ballots.contains_key(&v.ballot_id) {
                return Err(ballot_not_found(v.ballot_id));
            }
            if !seen.insert((v.ballot_id, v.id.clone())) {
                errors.push("id", format!("vote {} already exists", v.id));
            }
        }
        errors.into_result()?;
        debug!("insert_votes: {} votes", votes.len());
        self.votes.extend(votes);
        Ok(())
    }

    fn save_vote(&mut self, vote: Vote) -> BallotResult<()> {
        let existing = self
            .votes
            .iter_mut()
            .find(|v| v.ballot_id == vote.ballot_id && v.id == vote.id)
            .ok_or_else(|| BallotError::NotFound {
                what: "vote",
                key: vote.id.to_string(),
            })?;
        *existing = vote;
        Ok(())
    }
}
