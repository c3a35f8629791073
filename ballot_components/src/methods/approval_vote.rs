use std::collections::{HashMap, HashSet};

use serde_json::Value as JSValue;

use crate::config::*;
use crate::error::{integrity, BallotResult};
use crate::methods::{
    candidate_options, candidates_rules, cap_rules, decode_string_list, plurality_results,
    wrong_shape, BallotComponentType, MethodSettings, MethodStrings,
};
use crate::validation::{self, RuleSet};

/// Approve any number of candidates. Every approval counts for its candidate.
#[derive(Debug, Clone)]
pub struct ApprovalVote {
    settings: MethodSettings,
}

impl ApprovalVote {
    pub fn v1() -> ApprovalVote {
        ApprovalVote {
            settings: MethodSettings {
                needs_options: true,
                options_validator: candidates_rules().field("options.max_approvals", cap_rules()),
                preset_options: JSValue::Null,
                form: Some("approval-vote.v1"),
            },
        }
    }
}

impl BallotComponentType for ApprovalVote {
    fn kind(&self) -> VotingMethodKind {
        VotingMethodKind::ApprovalVote
    }

    fn settings(&self) -> &MethodSettings {
        &self.settings
    }

    fn strings(&self) -> MethodStrings {
        MethodStrings {
            name: "Approval vote",
            description: "Voters approve as many candidates as they like. The most approved candidate wins.",
            instructions: "Select every candidate you approve of.",
        }
    }

    fn submission_validator(
        &self,
        component: &BallotComponent,
        _ballot: &Ballot,
    ) -> BallotResult<RuleSet> {
        let opts = candidate_options(component)?;
        let max_approvals = opts
            .max_approvals
            .map(|m| m as usize)
            .unwrap_or(opts.candidates.len());
        Ok(RuleSet::new().field(
            component.id.to_string(),
            vec![
                validation::present_key(),
                validation::nullable(),
                validation::array(),
                validation::max(max_approvals as i64),
                validation::distinct(),
                validation::each_one_of(opts.candidates),
            ],
        ))
    }

    fn decode_value(
        &self,
        _component: &BallotComponent,
        raw: &JSValue,
    ) -> Result<VoteValue, String> {
        if raw.is_null() {
            return Ok(VoteValue::Abstain);
        }
        let mut approved = decode_string_list(raw)?;
        approved.sort();
        approved.dedup();
        Ok(VoteValue::Set(approved))
    }

    fn calculate_results(
        &self,
        votes: &[Vote],
        component: &BallotComponent,
    ) -> BallotResult<ComponentResults> {
        let opts = candidate_options(component)?;
        let mut counts: HashMap<String, u64> =
            opts.candidates.iter().map(|c| (c.clone(), 0)).collect();
        let mut counted: u64 = 0;
        let mut abstained: u64 = 0;
        for vote in votes.iter() {
            match vote.value_for(component.id) {
                None | Some(VoteValue::Abstain) => abstained += 1,
                Some(VoteValue::Set(approved)) => {
                    if let Some(limit) = opts.max_approvals {
                        if approved.len() > limit as usize {
                            return Err(integrity(
                                component.id,
                                Some(&vote.id),
                                format!("{} approvals, at most {} allowed", approved.len(), limit),
                            ));
                        }
                    }
                    let mut seen: HashSet<&String> = HashSet::new();
                    for c in approved.iter() {
                        if !seen.insert(c) {
                            return Err(integrity(
                                component.id,
                                Some(&vote.id),
                                format!("candidate {:?} approved twice", c),
                            ));
                        }
                        let e = counts.get_mut(c).ok_or_else(|| {
                            integrity(
                                component.id,
                                Some(&vote.id),
                                format!("unknown candidate {:?}", c),
                            )
                        })?;
                        *e += 1;
                    }
                    counted += 1;
                }
                Some(x) => return Err(wrong_shape(component.id, vote, "approval set", x)),
            }
        }
        Ok(ComponentResults::Plurality(plurality_results(
            &opts.candidates,
            &counts,
            counted,
            abstained,
        )))
    }

    fn values_to_csv(&self, vote: &Vote, component_id: ComponentId) -> BallotResult<String> {
        match vote.value_for(component_id) {
            Some(VoteValue::Set(approved)) => Ok(approved.join(";")),
            None | Some(VoteValue::Abstain) => Ok(String::new()),
            Some(x) => Err(wrong_shape(component_id, vote, "approval set", x)),
        }
    }
}
