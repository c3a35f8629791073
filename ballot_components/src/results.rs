use std::time::Instant;

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::ser::{Serialize, Serializer};
use snafu::prelude::*;

use crate::config::*;
use crate::error::{BallotResult, ComponentFailedSnafu, LimitExceededSnafu};
use crate::registry::Registry;

/// The results of every component of a ballot, in ballot order.
///
/// Serialized as a map from component id to entry.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct BallotResults(pub Vec<(ComponentId, ComponentResultEntry)>);

impl BallotResults {
    pub fn get(&self, id: ComponentId) -> Option<&ComponentResultEntry> {
        self.0.iter().find(|(cid, _)| *cid == id).map(|(_, e)| e)
    }

    pub fn ids(&self) -> Vec<ComponentId> {
        self.0.iter().map(|(cid, _)| *cid).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for BallotResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(cid, e)| (cid.to_string(), e)))
    }
}

/// The components sorted for display and tallying: by `order`, then by id.
pub fn in_ballot_order(components: &[BallotComponent]) -> Vec<&BallotComponent> {
    let mut res: Vec<&BallotComponent> = components.iter().collect();
    res.sort_by_key(|c| (c.order, c.id));
    res
}

pub(crate) fn check_limits(
    components: &[BallotComponent],
    votes: &[Vote],
    limits: &TallyLimits,
) -> BallotResult<()> {
    ensure!(
        components.len() <= limits.max_components_per_ballot,
        LimitExceededSnafu {
            what: "components",
            limit: limits.max_components_per_ballot,
            actual: components.len(),
        }
    );
    ensure!(
        votes.len() <= limits.max_cast_votes,
        LimitExceededSnafu {
            what: "cast votes",
            limit: limits.max_cast_votes,
            actual: votes.len(),
        }
    );
    Ok(())
}

/// Runs the counting algorithm of every component against the same cast votes.
///
/// The components are independent and are calculated in parallel. If any of
/// them fails, the whole calculation fails with the first failing component in
/// ballot order.
pub fn calculate_results(
    registry: &Registry,
    components: &[BallotComponent],
    votes: &[Vote],
    limits: &TallyLimits,
) -> BallotResult<BallotResults> {
    check_limits(components, votes, limits)?;
    let ordered = in_ballot_order(components);
    info!(
        "calculate_results: {} components, {} cast votes",
        ordered.len(),
        votes.len()
    );

    let outcomes: Vec<BallotResult<(ComponentId, ComponentResultEntry)>> = ordered
        .par_iter()
        .map(|c| {
            calculate_component(registry, c, votes).context(ComponentFailedSnafu {
                component: c.id,
                title: c.title.clone(),
            })
        })
        .collect();

    let mut res: Vec<(ComponentId, ComponentResultEntry)> = Vec::new();
    for o in outcomes {
        match o {
            Ok(entry) => res.push(entry),
            Err(e) => {
                warn!("calculate_results: {}", e);
                return Err(e);
            }
        }
    }
    Ok(BallotResults(res))
}

fn calculate_component(
    registry: &Registry,
    component: &BallotComponent,
    votes: &[Vote],
) -> BallotResult<(ComponentId, ComponentResultEntry)> {
    let start = Instant::now();
    let method = registry.resolve_component(component)?;
    let results = method.calculate_results(votes, component)?;
    debug!(
        "calculate_component: {} ({}) took {:?}",
        component.id,
        component.kind,
        start.elapsed()
    );
    Ok((
        component.id,
        ComponentResultEntry {
            results,
            title: component.title.clone(),
            description: component.description.clone(),
            kind: component.kind,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::methods::tests::{component, ranked};
    use crate::BallotError;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn components() -> Vec<BallotComponent> {
        let mut fptp = component(
            7,
            VotingMethodKind::FirstPastThePost,
            json!({"candidates": ["A", "B", "C"]}),
        );
        fptp.order = 0;
        let mut rc = component(
            2,
            VotingMethodKind::RankedChoice,
            json!({"candidates": ["A", "B"]}),
        );
        rc.order = 5;
        let mut yn = component(3, VotingMethodKind::YesNo, json!({}));
        yn.order = 5;
        let mut av = component(
            9,
            VotingMethodKind::ApprovalVote,
            json!({"candidates": ["A", "B"]}),
        );
        av.order = 6;
        vec![rc, yn, fptp, av]
    }

    fn vote(idx: usize, values: Vec<(u64, VoteValue)>) -> Vote {
        Vote {
            id: VoteId(format!("v{}", idx)),
            ballot_id: BallotId(1),
            voter: None,
            cast: true,
            values: values
                .into_iter()
                .map(|(cid, v)| (ComponentId(cid), v))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    fn votes() -> Vec<Vote> {
        vec![
            vote(
                1,
                vec![
                    (7, VoteValue::Single("A".into())),
                    (2, ranked(&["A", "B"])),
                    (3, VoteValue::Boolean(true)),
                ],
            ),
            vote(2, vec![(7, VoteValue::Single("A".into())), (2, ranked(&["B"]))]),
            vote(3, vec![(7, VoteValue::Single("B".into())), (2, ranked(&["A"]))]),
            vote(4, vec![(7, VoteValue::Single("C".into()))]),
        ]
    }

    #[test]
    fn results_follow_ballot_order() {
        init();
        let r = Registry::builtin();
        let res = calculate_results(&r, &components(), &votes(), &TallyLimits::DEFAULT_LIMITS)
            .unwrap();
        assert_eq!(
            res.ids(),
            vec![ComponentId(7), ComponentId(2), ComponentId(3), ComponentId(9)]
        );
        let fptp = res.get(ComponentId(7)).unwrap();
        assert_eq!(fptp.kind, VotingMethodKind::FirstPastThePost);
        let ComponentResults::Plurality(p) = &fptp.results else {
            panic!("expected plurality results");
        };
        let counts: Vec<u64> = p.tally.iter().map(|ct| ct.votes).collect();
        assert_eq!(counts, vec![2, 1, 1]);
        assert_eq!(
            res.get(ComponentId(3)).unwrap().results,
            ComponentResults::YesNo(YesNoResults {
                yes: 1,
                no: 0,
                abstained: 3
            })
        );
    }

    #[test]
    fn calculation_is_idempotent() {
        init();
        let r = Registry::builtin();
        let cs = components();
        let vs = votes();
        let first = calculate_results(&r, &cs, &vs, &TallyLimits::DEFAULT_LIMITS).unwrap();
        let second = calculate_results(&r, &cs, &vs, &TallyLimits::DEFAULT_LIMITS).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn empty_vote_sets_give_zeroed_results() {
        init();
        let r = Registry::builtin();
        let res = calculate_results(&r, &components(), &[], &TallyLimits::DEFAULT_LIMITS).unwrap();
        assert_eq!(res.len(), 4);
        let js = serde_json::to_value(&res).unwrap();
        assert_eq!(js["3"]["results"], json!({"yes": 0, "no": 0, "abstained": 0}));
        assert_eq!(js["2"]["results"]["outcome"], json!({"status": "no_active_ballots"}));
        assert_eq!(js["7"]["type"], json!("FirstPastThePost"));
        assert_eq!(
            js["7"]["results"]["tally"],
            json!([{"candidate": "A", "votes": 0}, {"candidate": "B", "votes": 0},
                   {"candidate": "C", "votes": 0}])
        );
        assert_eq!(
            js["9"]["results"],
            json!({"tally": [{"candidate": "A", "votes": 0}, {"candidate": "B", "votes": 0}],
                   "winners": [], "tie": false, "counted": 0, "abstained": 0})
        );
    }

    #[test]
    fn a_failing_component_fails_the_whole_calculation() {
        init();
        let r = Registry::builtin();
        let mut vs = votes();
        vs[3].values.insert(ComponentId(3), VoteValue::Single("A".into()));
        let err = calculate_results(&r, &components(), &vs, &TallyLimits::DEFAULT_LIMITS)
            .unwrap_err();
        match err {
            BallotError::ComponentFailed {
                component, source, ..
            } => {
                assert_eq!(component, ComponentId(3));
                assert!(matches!(*source, BallotError::DataIntegrity { .. }));
            }
            x => panic!("unexpected error {:?}", x),
        }
    }

    #[test]
    fn limits_are_checked_first() {
        let r = Registry::builtin();
        let limits = TallyLimits {
            max_cast_votes: 2,
            ..TallyLimits::DEFAULT_LIMITS
        };
        let err = calculate_results(&r, &components(), &votes(), &limits).unwrap_err();
        assert!(matches!(err, BallotError::LimitExceeded { actual: 4, .. }));
    }
}
