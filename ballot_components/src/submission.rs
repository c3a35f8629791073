//! Validation and decoding of voter submissions.
//!
//! A submission payload maps component ids (as strings) to the raw value the
//! voter picked. The rules of every active component of the ballot are
//! collected in a single [`RuleSet`] so that a full ballot is checked in one
//! pass.

use std::collections::BTreeMap;

use log::{debug, warn};
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;

use crate::config::*;
use crate::error::{integrity, BallotResult, ValidationErrors};
use crate::registry::Registry;
use crate::validation::RuleSet;

/// The rules for a full submission: one entry per active component.
pub fn submission_rules(
    registry: &Registry,
    ballot: &Ballot,
    components: &[BallotComponent],
) -> BallotResult<RuleSet> {
    let mut rules = RuleSet::new();
    for c in components.iter().filter(|c| c.active) {
        let method = registry.resolve_component(c)?;
        rules = rules.concat(method.submission_validator(c, ballot)?);
    }
    Ok(rules)
}

/// The rules for a partial submission. Components that are not in the payload
/// are skipped entirely.
pub fn partial_submission_rules(
    registry: &Registry,
    ballot: &Ballot,
    components: &[BallotComponent],
    payload: &JSMap<String, JSValue>,
) -> BallotResult<RuleSet> {
    let present: Vec<BallotComponent> = components
        .iter()
        .filter(|c| payload.contains_key(&c.id.to_string()))
        .cloned()
        .collect();
    submission_rules(registry, ballot, &present)
}

/// Validates a submission and turns it into typed values, keyed by component.
///
/// Keys that do not name an active component of the ballot are rejected.
pub fn decode_submission(
    registry: &Registry,
    ballot: &Ballot,
    components: &[BallotComponent],
    payload: &JSMap<String, JSValue>,
    partial: bool,
) -> BallotResult<BTreeMap<ComponentId, VoteValue>> {
    let active: Vec<&BallotComponent> = components.iter().filter(|c| c.active).collect();

    let mut unknown = ValidationErrors::default();
    for key in payload.keys() {
        if !active.iter().any(|c| c.id.to_string() == *key) {
            unknown.push(
                key.clone(),
                format!("{} is not an open question of this ballot", key),
            );
        }
    }
    if !unknown.is_empty() {
        warn!("decode_submission: rejected keys: {:?}", unknown.fields());
        return Err(unknown.into());
    }

    let rules = if partial {
        partial_submission_rules(registry, ballot, components, payload)?
    } else {
        submission_rules(registry, ballot, components)?
    };
    if let Err(errors) = rules.validate(payload) {
        warn!("decode_submission: rejected submission: {}", errors);
        return Err(errors.into());
    }

    let mut res: BTreeMap<ComponentId, VoteValue> = BTreeMap::new();
    let mut errors = ValidationErrors::default();
    for c in active.iter() {
        let key = c.id.to_string();
        if let Some(raw) = payload.get(&key) {
            let method = registry.resolve_component(c)?;
            match method.decode_value(c, raw) {
                Ok(v) => {
                    res.insert(c.id, v);
                }
                Err(msg) => errors.push(key, msg),
            }
        }
    }
    errors.into_result()?;
    debug!("decode_submission: {} values", res.len());
    Ok(res)
}

/// Decodes a value that was recorded without going through the service, for
/// instance a vote loaded from a snapshot. A value that would not pass the
/// submission rules is a data integrity fault.
pub fn decode_stored_value(
    registry: &Registry,
    ballot: &Ballot,
    component: &BallotComponent,
    vote_id: &VoteId,
    raw: &JSValue,
) -> BallotResult<VoteValue> {
    let method = registry.resolve_component(component)?;
    let key = component.id.to_string();
    let mut payload = JSMap::new();
    payload.insert(key, raw.clone());
    method
        .submission_validator(component, ballot)?
        .validate(&payload)
        .map_err(|errors| integrity(component.id, Some(vote_id), errors.to_string()))?;
    method
        .decode_value(component, raw)
        .map_err(|msg| integrity(component.id, Some(vote_id), msg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::methods::tests::{ballot, component};
    use serde_json::json;

    fn components() -> Vec<BallotComponent> {
        let mut closed = component(3, VotingMethodKind::YesNo, json!({}));
        closed.active = false;
        vec![
            component(1, VotingMethodKind::YesNo, json!({})),
            component(
                2,
                VotingMethodKind::RankedChoice,
                json!({"candidates": ["A", "B", "C"]}),
            ),
            closed,
        ]
    }

    fn payload(v: JSValue) -> JSMap<String, JSValue> {
        v.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn full_rules_cover_active_components_only() {
        let r = Registry::builtin();
        let rules = submission_rules(&r, &ballot(), &components()).unwrap();
        assert_eq!(rules.field_names(), vec!["1", "2"]);
    }

    #[test]
    fn partial_rules_skip_absent_components() {
        let r = Registry::builtin();
        let p = payload(json!({"2": ["A"]}));
        let rules = partial_submission_rules(&r, &ballot(), &components(), &p).unwrap();
        assert_eq!(rules.field_names(), vec!["2"]);
        assert!(rules.validate(&p).is_ok());
    }

    #[test]
    fn full_submission_needs_every_active_component() {
        let r = Registry::builtin();
        let p = payload(json!({"2": ["A"]}));
        let err = decode_submission(&r, &ballot(), &components(), &p, false).unwrap_err();
        assert_eq!(err.validation_errors().unwrap().fields(), vec!["1"]);
        let values = decode_submission(&r, &ballot(), &components(), &p, true).unwrap();
        assert_eq!(
            values.get(&ComponentId(2)),
            Some(&VoteValue::Ranked(vec!["A".to_string()]))
        );
    }

    #[test]
    fn null_decodes_to_abstain() {
        let r = Registry::builtin();
        let p = payload(json!({"1": null, "2": ["C", "A"]}));
        let values = decode_submission(&r, &ballot(), &components(), &p, false).unwrap();
        assert_eq!(values.get(&ComponentId(1)), Some(&VoteValue::Abstain));
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn values_for_closed_or_unknown_components_are_rejected() {
        let r = Registry::builtin();
        let p = payload(json!({"1": true, "2": ["A"], "3": true}));
        let err = decode_submission(&r, &ballot(), &components(), &p, false).unwrap_err();
        assert_eq!(err.validation_errors().unwrap().fields(), vec!["3"]);
        let p = payload(json!({"1": true, "2": ["A"], "42": true}));
        assert!(decode_submission(&r, &ballot(), &components(), &p, true).is_err());
    }

    #[test]
    fn invalid_stored_values_are_data_integrity_faults() {
        let r = Registry::builtin();
        let cs = components();
        let id = VoteId("abc".to_string());
        assert_eq!(
            decode_stored_value(&r, &ballot(), &cs[1], &id, &json!(["B"])).unwrap(),
            VoteValue::Ranked(vec!["B".to_string()])
        );
        let err = decode_stored_value(&r, &ballot(), &cs[1], &id, &json!(["Z"])).unwrap_err();
        assert!(matches!(
            err,
            crate::BallotError::DataIntegrity { vote: Some(_), .. }
        ));
    }
}
