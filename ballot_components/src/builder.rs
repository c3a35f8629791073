use log::debug;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;

use crate::config::*;
use crate::error::{integrity, BallotError, BallotResult, ValidationErrors};
use crate::registry::Registry;
use crate::service::BallotService;
use crate::store::{MemoryStore, VoteStore};
use crate::submission::decode_stored_value;

/// A builder for a ballot with its components and cast votes.
///
/// Votes are given as the raw values voters submitted, keyed by component id,
/// and are decoded with the rules of each component.
///
/// ```
/// use ballot_components::builder::Builder;
/// use ballot_components::*;
/// use serde_json::json;
///
/// let ballot = Ballot {
///     id: BallotId(1),
///     election_id: 1,
///     title: "Annual meeting".to_string(),
///     is_secret: true,
/// };
/// let chair = BallotComponent::new(ComponentId(1), ballot.id, VotingMethodKind::RankedChoice, "Chair")
///     .with_options(json!({"candidates": ["Anna", "Bob", "Clara"]}));
///
/// let mut builder = Builder::new(&ballot).component(chair)?;
/// builder.add_vote_simple(&json!({"1": ["Anna", "Clara"]}))?;
/// builder.add_vote_simple(&json!({"1": ["Bob"]}))?;
/// builder.add_vote_simple(&json!({"1": ["Anna"]}))?;
///
/// let service = builder.build()?;
/// let results = service.calculate_results(ballot.id)?;
/// assert_eq!(results.len(), 1);
///
/// # Ok::<(), BallotError>(())
/// ```
pub struct Builder {
    pub(crate) _ballot: Ballot,
    pub(crate) _registry: Registry,
    pub(crate) _components: Vec<BallotComponent>,
    pub(crate) _votes: Vec<Vote>,
}

impl Builder {
    pub fn new(ballot: &Ballot) -> Builder {
        Builder {
            _ballot: ballot.clone(),
            _registry: Registry::builtin(),
            _components: Vec::new(),
            _votes: Vec::new(),
        }
    }

    /// Uses another registry. Must be called before adding components.
    pub fn registry(self, registry: Registry) -> Builder {
        Builder {
            _registry: registry,
            ..self
        }
    }

    /// Adds a component. Its voting method must be registered and its options
    /// must satisfy the method: components come from storage, so bad options
    /// are a data integrity fault.
    pub fn component(mut self, component: BallotComponent) -> BallotResult<Builder> {
        let method = self._registry.resolve_component(&component)?;
        let settings = method.settings();
        let options = if settings.needs_options {
            let mut payload = JSMap::new();
            payload.insert("options".to_string(), component.options.clone());
            settings
                .options_validator
                .validate(&payload)
                .map_err(|errors| integrity(component.id, None, errors.to_string()))?;
            component.options.clone()
        } else {
            settings.preset_options.clone()
        };
        debug!("component: {} {}", component.id, component.kind);
        self._components.push(BallotComponent {
            ballot_id: self._ballot.id,
            options,
            ..component
        });
        Ok(self)
    }

    /// Adds a cast vote with a generated id.
    pub fn add_vote_simple(&mut self, values: &JSValue) -> BallotResult<()> {
        let id = format!("vote-{:06}", self._votes.len() + 1);
        let empty = JSMap::new();
        let values = match values {
            JSValue::Object(m) => m,
            JSValue::Null => &empty,
            _ => {
                let mut errors = ValidationErrors::default();
                errors.push("values", "values must be an object keyed by component id");
                return Err(errors.into());
            }
        };
        self.add_vote(&id, None, values)
    }

    /// Adds a cast vote.
    ///
    /// values: raw values by component id. Components left out count as
    /// non-responses.
    pub fn add_vote(
        &mut self,
        id: &str,
        voter: Option<&str>,
        values: &JSMap<String, JSValue>,
    ) -> BallotResult<()> {
        let vote_id = VoteId(id.to_string());
        let mut vote = Vote {
            id: vote_id.clone(),
            ballot_id: self._ballot.id,
            voter: voter.map(|s| s.to_string()),
            cast: true,
            values: Default::default(),
        };
        for (key, raw) in values.iter() {
            let component = self
                ._components
                .iter()
                .find(|c| c.id.to_string() == *key)
                .ok_or_else(|| BallotError::NotFound {
                    what: "component",
                    key: key.clone(),
                })?;
            let value =
                decode_stored_value(&self._registry, &self._ballot, component, &vote_id, raw)?;
            vote.values.insert(component.id, value);
        }
        self._votes.push(vote);
        Ok(())
    }

    pub fn build(self) -> BallotResult<BallotService<MemoryStore>> {
        let mut store = MemoryStore::new();
        store.add_ballot(self._ballot.clone());
        for c in self._components {
            store.insert_component(c)?;
        }
        store.insert_votes(self._votes)?;
        Ok(BallotService::new(store).with_registry(self._registry))
    }
}
