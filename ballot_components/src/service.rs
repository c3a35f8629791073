use std::collections::{BTreeMap, HashSet};

use log::{debug, info, warn};
use rand::distributions::{Alphanumeric, Distribution};
use serde::Serialize;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;

use crate::config::*;
use crate::error::{BallotError, BallotResult, ValidationErrors};
use crate::export::{results_table, ResultsTable};
use crate::registry::{MethodDescriptor, Registry};
use crate::results::{self, BallotResults};
use crate::store::{BallotStore, ComponentPatch, ComponentStore, NewComponent, VoteStore};
use crate::submission;
use crate::validation::{self, lookup, RuleSet};

/// Length of a generated vote code.
pub const VOTE_CODE_LENGTH: usize = 12;

/// A vote code handed out by [`BallotService::generate_votes`].
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct GeneratedCode {
    pub code: VoteId,
    /// Only set for public ballots.
    pub voter: Option<String>,
}

/// The operations offered to callers: discovery of the voting methods,
/// administration of the components of a ballot, tallying, export and votes.
#[derive(Debug, Clone)]
pub struct BallotService<S> {
    registry: Registry,
    store: S,
    limits: TallyLimits,
}

impl<S> BallotService<S>
where
    S: BallotStore + ComponentStore + VoteStore,
{
    /// A service with the built-in voting methods and the default limits.
    pub fn new(store: S) -> BallotService<S> {
        BallotService {
            registry: Registry::builtin(),
            store,
            limits: TallyLimits::DEFAULT_LIMITS,
        }
    }

    pub fn with_registry(self, registry: Registry) -> BallotService<S> {
        BallotService { registry, ..self }
    }

    pub fn with_limits(self, limits: TallyLimits) -> BallotService<S> {
        BallotService { limits, ..self }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn limits(&self) -> &TallyLimits {
        &self.limits
    }

    // ******** Discovery ********

    pub fn component_tree(&self) -> BTreeMap<String, BTreeMap<String, MethodDescriptor>> {
        self.registry.component_tree()
    }

    pub fn list_types(&self) -> Vec<String> {
        self.registry
            .list_types()
            .iter()
            .map(|k| k.name().to_string())
            .collect()
    }

    pub fn list_versions(&self, type_name: &str) -> Vec<String> {
        self.registry.list_versions(type_name)
    }

    // ******** Components ********

    /// Creates a component from an administrator payload.
    ///
    /// Fields: `title`, `description?`, `order?`, `type`, `version`,
    /// `options?`. The options are validated by the voting method when it
    /// needs some, and replaced by its preset otherwise.
    pub fn create_component(
        &mut self,
        ballot_id: BallotId,
        payload: &JSMap<String, JSValue>,
    ) -> BallotResult<BallotComponent> {
        self.store.ballot(ballot_id)?;
        let existing = self.store.list_components(ballot_id)?;
        if existing.len() >= self.limits.max_components_per_ballot {
            return Err(BallotError::LimitExceeded {
                what: "components",
                limit: self.limits.max_components_per_ballot,
                actual: existing.len() + 1,
            });
        }

        // The secondary validation needs a resolved method.
        self.component_rules(false).validate(payload)?;
        let kind = kind_field(payload)?;
        let version = str_field(payload, "version");
        let method = self.registry.resolve(kind, &version)?;
        let settings = method.settings();

        let options = if settings.needs_options {
            settings.options_validator.validate(payload)?;
            payload.get("options").cloned().unwrap_or(JSValue::Null)
        } else {
            settings.preset_options.clone()
        };

        let c = self.store.create_component(NewComponent {
            ballot_id,
            kind,
            version,
            title: str_field(payload, "title"),
            description: str_field(payload, "description"),
            order: payload.get("order").and_then(|x| x.as_i64()).unwrap_or(0),
            options,
            active: false,
            finished: false,
        })?;
        info!("create_component: {} {} ({} {})", c.id, c.title, c.kind, c.version);
        Ok(c)
    }

    pub fn read_component(&self, id: ComponentId) -> BallotResult<BallotComponent> {
        self.store.component(id)
    }

    pub fn list_components(&self, ballot_id: BallotId) -> BallotResult<Vec<BallotComponent>> {
        self.store.list_components(ballot_id)
    }

    /// Applies a partial update. Only the fields present in the payload change.
    ///
    /// A change of type or version is checked against the registry, and the
    /// resulting options (given ones, or the existing ones) must satisfy the
    /// new voting method.
    pub fn update_component(
        &mut self,
        id: ComponentId,
        payload: &JSMap<String, JSValue>,
    ) -> BallotResult<BallotComponent> {
        let current = self.store.component(id)?;
        self.component_rules(true).validate(payload)?;

        let kind = match payload.get("type") {
            Some(_) => kind_field(payload)?,
            None => current.kind,
        };
        let version = match payload.get("version") {
            Some(_) => str_field(payload, "version"),
            None => current.version.clone(),
        };
        let method = self.registry.resolve(kind, &version).map_err(|_| {
            let mut errors = ValidationErrors::default();
            errors.push("version", "version must be a valid version.");
            BallotError::from(errors)
        })?;
        let settings = method.settings();
        let method_changed = kind != current.kind || version != current.version;

        let options = if settings.needs_options {
            if payload.contains_key("options") {
                settings.options_validator.validate(payload)?;
                payload.get("options").cloned()
            } else if method_changed {
                let mut merged = JSMap::new();
                merged.insert("options".to_string(), current.options.clone());
                settings.options_validator.validate(&merged)?;
                None
            } else {
                None
            }
        } else if method_changed {
            Some(settings.preset_options.clone())
        } else {
            None
        };

        let patch = ComponentPatch {
            kind: Some(kind).filter(|k| *k != current.kind),
            version: Some(version).filter(|v| *v != current.version),
            title: payload.get("title").map(|_| str_field(payload, "title")),
            description: payload
                .get("description")
                .map(|_| str_field(payload, "description")),
            order: payload.get("order").and_then(|x| x.as_i64()),
            options,
            ..ComponentPatch::default()
        };
        debug!("update_component: {} {:?}", id, patch);
        self.store.update_component(id, patch)
    }

    pub fn delete_component(&mut self, id: ComponentId) -> BallotResult<()> {
        self.store.delete_component(id)?;
        info!("delete_component: {}", id);
        Ok(())
    }

    pub fn activate_component(&mut self, id: ComponentId) -> BallotResult<BallotComponent> {
        self.store.update_component(
            id,
            ComponentPatch {
                active: Some(true),
                ..ComponentPatch::default()
            },
        )
    }

    /// Closes a component. A closed component is marked finished for good.
    pub fn deactivate_component(&mut self, id: ComponentId) -> BallotResult<BallotComponent> {
        self.store.update_component(
            id,
            ComponentPatch {
                active: Some(false),
                finished: Some(true),
                ..ComponentPatch::default()
            },
        )
    }

    fn component_rules(&self, partial: bool) -> RuleSet {
        let types = self.list_types();
        let versions: BTreeMap<String, Vec<String>> = types
            .iter()
            .map(|t| (t.clone(), self.registry.list_versions(t)))
            .collect();
        // Absent fields are left alone on update.
        let head = |rules: Vec<validation::Rule>| {
            if partial {
                let mut all = vec![validation::sometimes()];
                all.extend(rules);
                all
            } else {
                rules
            }
        };
        RuleSet::new()
            .field(
                "title",
                head(vec![
                    validation::required(),
                    validation::string(),
                    validation::min(1),
                    validation::max(255),
                ]),
            )
            .field(
                "description",
                vec![validation::nullable(), validation::string(), validation::min(1)],
            )
            .field("order", vec![validation::nullable(), validation::integer()])
            .field(
                "type",
                head(vec![
                    validation::required(),
                    validation::string(),
                    validation::custom("valid_type", move |v, _| match v {
                        Some(JSValue::String(s)) if types.contains(s) => Ok(()),
                        _ => Err("must be a valid ballot type.".to_string()),
                    }),
                ]),
            )
            .field(
                "version",
                head(vec![
                    validation::required(),
                    validation::string(),
                    validation::custom("valid_version", move |v, p| {
                        // On update without a type, the pair is checked later
                        // against the current type.
                        let t = match lookup(p, "type") {
                            Some(JSValue::String(t)) => t,
                            _ if partial => return Ok(()),
                            _ => return Err("must be a valid version.".to_string()),
                        };
                        match v {
                            Some(JSValue::String(s))
                                if versions.get(t).map(|vs| vs.contains(s)).unwrap_or(false) =>
                            {
                                Ok(())
                            }
                            _ => Err("must be a valid version.".to_string()),
                        }
                    }),
                ]),
            )
    }

    // ******** Results ********

    /// The results of every component of the ballot, in ballot order.
    pub fn calculate_results(&self, ballot_id: BallotId) -> BallotResult<BallotResults> {
        self.store.ballot(ballot_id)?;
        let components = self.store.list_components(ballot_id)?;
        let votes = self.store.cast_votes(ballot_id)?;
        results::calculate_results(&self.registry, &components, &votes, &self.limits)
    }

    pub fn export_results_table(
        &self,
        ballot_id: BallotId,
        vote_id_label: &str,
    ) -> BallotResult<ResultsTable> {
        self.store.ballot(ballot_id)?;
        let components = self.store.list_components(ballot_id)?;
        let votes = self.store.cast_votes(ballot_id)?;
        results::check_limits(&components, &votes, &self.limits)?;
        results_table(&self.registry, &components, &votes, vote_id_label)
    }

    /// The results table rendered as CSV.
    pub fn export_results_csv(
        &self,
        ballot_id: BallotId,
        vote_id_label: &str,
    ) -> BallotResult<Vec<u8>> {
        self.export_results_table(ballot_id, vote_id_label)?.to_csv()
    }

    // ******** Votes ********

    /// The codes of all the votes of a ballot, cast or not.
    pub fn list_vote_codes(&self, ballot_id: BallotId) -> BallotResult<Vec<VoteId>> {
        Ok(self
            .store
            .votes(ballot_id)?
            .into_iter()
            .map(|v| v.id)
            .collect())
    }

    /// Hands out vote codes.
    ///
    /// Secret ballots take `{"quantity": n}` and produce anonymous codes.
    /// Public ballots take `{"voters": [..]}` and link one code to each voter.
    /// The request is validated before anything is written, and the codes are
    /// inserted in one batch.
    pub fn generate_votes(
        &mut self,
        ballot_id: BallotId,
        payload: &JSMap<String, JSValue>,
    ) -> BallotResult<Vec<GeneratedCode>> {
        let ballot = self.store.ballot(ballot_id)?;
        let min = self.limits.min_generated_votes as i64;
        let max = self.limits.max_generated_votes as i64;
        let existing = self.store.votes(ballot_id)?;

        let voters: Vec<Option<String>> = if ballot.is_secret {
            RuleSet::new()
                .field(
                    "quantity",
                    vec![
                        validation::required(),
                        validation::integer(),
                        validation::min(min),
                        validation::max(max),
                    ],
                )
                .validate(payload)?;
            let quantity = payload
                .get("quantity")
                .and_then(|x| x.as_u64())
                .unwrap_or(0);
            (0..quantity).map(|_| None).collect()
        } else {
            let known: HashSet<String> = existing.iter().filter_map(|v| v.voter.clone()).collect();
            RuleSet::new()
                .field(
                    "voters",
                    vec![
                        validation::required(),
                        validation::array(),
                        validation::min(min),
                        validation::max(max),
                        validation::each_string(),
                        validation::distinct(),
                        validation::custom("new_voters", move |v, _| {
                            let already: Vec<&str> = v
                                .and_then(|x| x.as_array())
                                .map(|xs| {
                                    xs.iter()
                                        .filter_map(|x| x.as_str())
                                        .filter(|x| known.contains(*x))
                                        .collect()
                                })
                                .unwrap_or_default();
                            if already.is_empty() {
                                Ok(())
                            } else {
                                Err(format!("already have a code: {}", already.join(", ")))
                            }
                        }),
                    ],
                )
                .validate(payload)?;
            payload
                .get("voters")
                .and_then(|x| x.as_array())
                .map(|xs| {
                    xs.iter()
                        .filter_map(|x| x.as_str())
                        .map(|s| Some(s.to_string()))
                        .collect()
                })
                .unwrap_or_default()
        };

        let mut taken: HashSet<VoteId> = existing.into_iter().map(|v| v.id).collect();
        let mut rng = rand::thread_rng();
        let mut codes: Vec<GeneratedCode> = Vec::with_capacity(voters.len());
        for voter in voters {
            let code = loop {
                let candidate = VoteId(
                    Alphanumeric
                        .sample_iter(&mut rng)
                        .take(VOTE_CODE_LENGTH)
                        .map(char::from)
                        .collect(),
                );
                if taken.insert(candidate.clone()) {
                    break candidate;
                }
            };
            codes.push(GeneratedCode { code, voter });
        }

        self.store.insert_votes(
            codes
                .iter()
                .map(|g| Vote {
                    id: g.code.clone(),
                    ballot_id,
                    voter: g.voter.clone(),
                    cast: false,
                    values: BTreeMap::new(),
                })
                .collect(),
        )?;
        info!(
            "generate_votes: ballot {} secret: {} codes: {}",
            ballot_id,
            ballot.is_secret,
            codes.len()
        );
        Ok(codes)
    }

    /// Records the values of a voter.
    ///
    /// A full submission must answer every open component. A partial one only
    /// answers some of them and keeps the values given earlier for the others.
    pub fn submit_vote(
        &mut self,
        ballot_id: BallotId,
        vote_id: &VoteId,
        payload: &JSMap<String, JSValue>,
        partial: bool,
    ) -> BallotResult<Vote> {
        let ballot = self.store.ballot(ballot_id)?;
        let mut vote = self.store.vote(ballot_id, vote_id)?;
        let components = self.store.list_components(ballot_id)?;
        let values =
            submission::decode_submission(&self.registry, &ballot, &components, payload, partial)
                .map_err(|e| {
                    warn!("submit_vote: vote {} rejected: {}", vote_id, e);
                    e
                })?;
        if !partial {
            vote.values.clear();
        }
        vote.values.extend(values);
        vote.cast = true;
        self.store.save_vote(vote.clone())?;
        debug!("submit_vote: vote {} cast", vote_id);
        Ok(vote)
    }
}

// Only called on fields that passed the string rules. Null reads as empty.
fn str_field(payload: &JSMap<String, JSValue>, name: &str) -> String {
    payload
        .get(name)
        .and_then(|x| x.as_str())
        .unwrap_or_default()
        .to_string()
}

fn kind_field(payload: &JSMap<String, JSValue>) -> BallotResult<VotingMethodKind> {
    str_field(payload, "type")
        .parse::<VotingMethodKind>()
        .map_err(|msg| {
            let mut errors = ValidationErrors::default();
            errors.push("type", msg);
            errors.into()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::methods::tests::ballot;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn payload(v: JSValue) -> JSMap<String, JSValue> {
        v.as_object().cloned().unwrap_or_default()
    }

    fn service(is_secret: bool) -> BallotService<MemoryStore> {
        let mut store = MemoryStore::new();
        store.add_ballot(Ballot {
            is_secret,
            ..ballot()
        });
        BallotService::new(store)
    }

    fn fptp(s: &mut BallotService<MemoryStore>) -> BallotComponent {
        s.create_component(
            BallotId(1),
            &payload(json!({
                "title": "Chair",
                "type": "FirstPastThePost",
                "version": "v1",
                "order": 2,
                "options": {"candidates": ["A", "B", "C"]}
            })),
        )
        .unwrap()
    }

    #[test]
    fn discovery() {
        let s = service(true);
        assert_eq!(
            s.list_types(),
            vec!["YesNo", "FirstPastThePost", "RankedChoice", "ApprovalVote"]
        );
        assert_eq!(s.list_versions("ApprovalVote"), vec!["v1"]);
        assert!(s.list_versions("Nope").is_empty());
        let tree = s.component_tree();
        assert_eq!(tree.len(), 4);
        let js = serde_json::to_value(&tree).unwrap();
        assert_eq!(js["YesNo"]["v1"]["needsOptions"], json!(false));
        assert_eq!(js["RankedChoice"]["v1"]["form"], json!("ranked-choice.v1"));
    }

    #[test]
    fn create_checks_the_structure_before_the_options() {
        let mut s = service(true);
        let err = s
            .create_component(
                BallotId(1),
                &payload(json!({"title": "", "type": "Borda", "version": "v1"})),
            )
            .unwrap_err();
        assert_eq!(
            err.validation_errors().unwrap().fields(),
            vec!["title", "type", "version"]
        );
        let err = s
            .create_component(
                BallotId(1),
                &payload(json!({"title": "Chair", "type": "RankedChoice", "version": "v1",
                                "options": {"candidates": ["A"]}})),
            )
            .unwrap_err();
        assert_eq!(
            err.validation_errors().unwrap().fields(),
            vec!["options.candidates"]
        );
        assert!(s
            .create_component(
                BallotId(9),
                &payload(json!({"title": "x", "type": "YesNo", "version": "v1"}))
            )
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn ranking_and_approval_caps_are_bounded() {
        let mut s = service(true);
        for (kind, cap) in [("RankedChoice", "max_rankings"), ("ApprovalVote", "max_approvals")] {
            let mut options = json!({"candidates": ["A", "B", "C"]});
            options[cap] = json!(5000000000u64);
            let err = s
                .create_component(
                    BallotId(1),
                    &payload(json!({"title": "Chair", "type": kind, "version": "v1",
                                    "options": options})),
                )
                .unwrap_err();
            assert_eq!(
                err.validation_errors().unwrap().fields(),
                vec![format!("options.{}", cap)]
            );
        }

        let c = s
            .create_component(
                BallotId(1),
                &payload(json!({"title": "Chair", "type": "RankedChoice", "version": "v1",
                                "options": {"candidates": ["A", "B", "C"], "max_rankings": 1000}})),
            )
            .unwrap();
        s.activate_component(c.id).unwrap();
        assert!(s.calculate_results(BallotId(1)).is_ok());
    }

    #[test]
    fn options_follow_the_method_settings() {
        let mut s = service(true);
        for kind in VotingMethodKind::ALL {
            let method = s.registry().resolve(kind, "v1").unwrap().clone();
            let without = s.create_component(
                BallotId(1),
                &payload(json!({"title": "q", "type": kind.name(), "version": "v1"})),
            );
            let with = s.create_component(
                BallotId(1),
                &payload(json!({"title": "q", "type": kind.name(), "version": "v1",
                                "options": {"candidates": ["A", "B"], "extra": 1}})),
            );
            if method.settings().needs_options {
                assert!(without.is_err(), "{}", kind);
                assert_eq!(with.unwrap().options["candidates"], json!(["A", "B"]));
            } else {
                assert_eq!(without.unwrap().options, method.settings().preset_options);
                assert_eq!(with.unwrap().options, method.settings().preset_options);
            }
        }
    }

    #[test]
    fn updating_the_order_leaves_the_rest_alone() {
        let mut s = service(true);
        let c = fptp(&mut s);
        let u = s.update_component(c.id, &payload(json!({"order": 7}))).unwrap();
        assert_eq!(u.order, 7);
        assert_eq!(u.title, c.title);
        assert_eq!(u.options, c.options);
        assert_eq!(u.kind, c.kind);
        assert_eq!(u.version, c.version);
    }

    #[test]
    fn changing_the_method_revalidates_the_options() {
        let mut s = service(true);
        let c = fptp(&mut s);
        let u = s
            .update_component(c.id, &payload(json!({"type": "ApprovalVote"})))
            .unwrap();
        assert_eq!(u.kind, VotingMethodKind::ApprovalVote);
        assert_eq!(u.options, c.options);
        let u = s
            .update_component(c.id, &payload(json!({"type": "YesNo"})))
            .unwrap();
        assert_eq!(u.options, json!({}));
        let err = s
            .update_component(c.id, &payload(json!({"type": "RankedChoice"})))
            .unwrap_err();
        assert_eq!(
            err.validation_errors().unwrap().fields(),
            vec!["options.candidates"]
        );
        let err = s
            .update_component(c.id, &payload(json!({"version": "v7"})))
            .unwrap_err();
        assert_eq!(err.validation_errors().unwrap().fields(), vec!["version"]);
        assert!(s
            .update_component(ComponentId(99), &payload(json!({})))
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn deactivation_finishes_the_component() {
        let mut s = service(true);
        let c = fptp(&mut s);
        assert!(!c.active);
        assert!(s.activate_component(c.id).unwrap().active);
        let d = s.deactivate_component(c.id).unwrap();
        assert!(!d.active);
        assert!(d.finished);
        let again = s.activate_component(c.id).unwrap();
        assert!(again.finished);
        s.delete_component(c.id).unwrap();
        assert!(s.delete_component(c.id).unwrap_err().is_not_found());
        assert!(s.read_component(c.id).unwrap_err().is_not_found());
    }

    #[test]
    fn secret_ballots_generate_anonymous_codes() {
        let mut s = service(true);
        let codes = s
            .generate_votes(BallotId(1), &payload(json!({"quantity": 25})))
            .unwrap();
        assert_eq!(codes.len(), 25);
        let unique: HashSet<&VoteId> = codes.iter().map(|g| &g.code).collect();
        assert_eq!(unique.len(), 25);
        for g in codes.iter() {
            assert_eq!(g.code.0.len(), VOTE_CODE_LENGTH);
            assert!(g.code.0.chars().all(|ch| ch.is_ascii_alphanumeric()));
            assert_eq!(g.voter, None);
        }
        assert_eq!(s.list_vote_codes(BallotId(1)).unwrap().len(), 25);
        for bad in [json!({"quantity": 0}), json!({"quantity": 10001}), json!({})] {
            assert!(s.generate_votes(BallotId(1), &payload(bad)).is_err());
        }
        assert_eq!(s.list_vote_codes(BallotId(1)).unwrap().len(), 25);
    }

    #[test]
    fn public_ballots_link_codes_to_voters() {
        let mut s = service(false);
        let codes = s
            .generate_votes(BallotId(1), &payload(json!({"voters": ["ann", "bob"]})))
            .unwrap();
        assert_eq!(codes[0].voter, Some("ann".to_string()));
        assert_eq!(codes[1].voter, Some("bob".to_string()));
        let err = s
            .generate_votes(BallotId(1), &payload(json!({"voters": ["cat", "bob"]})))
            .unwrap_err();
        assert_eq!(err.validation_errors().unwrap().fields(), vec!["voters"]);
        assert!(s
            .generate_votes(BallotId(1), &payload(json!({"voters": ["dan", "dan"]})))
            .is_err());
        assert!(s
            .generate_votes(BallotId(1), &payload(json!({"quantity": 3})))
            .is_err());
        assert_eq!(s.list_vote_codes(BallotId(1)).unwrap().len(), 2);
    }

    #[test]
    fn submitted_votes_are_tallied_and_exported() {
        let mut s = service(true);
        let c = fptp(&mut s);
        let yn = s
            .create_component(
                BallotId(1),
                &payload(json!({"title": "Budget", "type": "YesNo", "version": "v1", "order": 1})),
            )
            .unwrap();
        s.activate_component(c.id).unwrap();
        s.activate_component(yn.id).unwrap();
        let codes = s
            .generate_votes(BallotId(1), &payload(json!({"quantity": 4})))
            .unwrap();
        let fk = c.id.to_string();
        let yk = yn.id.to_string();
        let submissions = [json!("A"), json!("A"), json!("B")];
        for (g, choice) in codes.iter().zip(submissions.iter()) {
            let mut p = JSMap::new();
            p.insert(fk.clone(), choice.clone());
            p.insert(yk.clone(), json!(true));
            s.submit_vote(BallotId(1), &g.code, &p, false).unwrap();
        }
        // Partial submission keeps the earlier answers.
        let mut p = JSMap::new();
        p.insert(yk.clone(), json!(false));
        let v = s.submit_vote(BallotId(1), &codes[0].code, &p, true).unwrap();
        assert_eq!(v.value_for(c.id), Some(&VoteValue::Single("A".to_string())));
        assert_eq!(v.value_for(yn.id), Some(&VoteValue::Boolean(false)));

        let res = s.calculate_results(BallotId(1)).unwrap();
        assert_eq!(res.ids(), vec![yn.id, c.id]);
        assert_eq!(
            res.get(yn.id).unwrap().results,
            ComponentResults::YesNo(YesNoResults {
                yes: 2,
                no: 1,
                abstained: 0
            })
        );

        let t = s.export_results_table(BallotId(1), "Code").unwrap();
        assert_eq!(t.header, vec!["Code", "Budget", "Chair"]);
        assert_eq!(t.rows.len(), 3);
        assert_eq!(t.rows[0], vec![codes[0].code.0.clone(), "No".into(), "A".into()]);

        let mut p = JSMap::new();
        p.insert(fk.clone(), json!("Z"));
        p.insert(yk.clone(), json!(true));
        assert!(s.submit_vote(BallotId(1), &codes[3].code, &p, false).is_err());
        assert!(s
            .submit_vote(BallotId(1), &VoteId("nope".into()), &p, false)
            .unwrap_err()
            .is_not_found());
    }
}
