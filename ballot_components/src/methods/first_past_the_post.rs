use std::collections::HashMap;

use serde_json::Value as JSValue;

use crate::config::*;
use crate::error::{integrity, BallotResult};
use crate::methods::{
    candidate_options, candidates_rules, plurality_results, wrong_shape, BallotComponentType,
    MethodSettings, MethodStrings,
};
use crate::validation::{self, RuleSet};

/// Pick one candidate. The candidates with the most votes win.
#[derive(Debug, Clone)]
pub struct FirstPastThePost {
    settings: MethodSettings,
}

impl FirstPastThePost {
    pub fn v1() -> FirstPastThePost {
        FirstPastThePost {
            settings: MethodSettings {
                needs_options: true,
                options_validator: candidates_rules(),
                preset_options: JSValue::Null,
                form: Some("first-past-the-post.v1"),
            },
        }
    }
}

impl BallotComponentType for FirstPastThePost {
    fn kind(&self) -> VotingMethodKind {
        VotingMethodKind::FirstPastThePost
    }

    fn settings(&self) -> &MethodSettings {
        &self.settings
    }

    fn strings(&self) -> MethodStrings {
        MethodStrings {
            name: "First past the post",
            description: "Voters pick one candidate. The candidate with the most votes wins.",
            instructions: "Choose one candidate.",
        }
    }

    fn submission_validator(
        &self,
        component: &BallotComponent,
        _ballot: &Ballot,
    ) -> BallotResult<RuleSet> {
        let opts = candidate_options(component)?;
        Ok(RuleSet::new().field(
            component.id.to_string(),
            vec![
                validation::present_key(),
                validation::nullable(),
                validation::string(),
                validation::one_of(opts.candidates),
            ],
        ))
    }

    fn decode_value(
        &self,
        _component: &BallotComponent,
        raw: &JSValue,
    ) -> Result<VoteValue, String> {
        match raw {
            JSValue::Null => Ok(VoteValue::Abstain),
            JSValue::String(s) => Ok(VoteValue::Single(s.clone())),
            x => Err(format!("expected a candidate or null, got {}", x)),
        }
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
                Some(VoteValue::Single(c)) => {
                    let e = counts.get_mut(c).ok_or_else(|| {
                        integrity(
                            component.id,
                            Some(&vote.id),
                            format!("unknown candidate {:?}", c),
                        )
                    })?;
                    *e += 1;
                    counted += 1;
                }
                Some(x) => return Err(wrong_shape(component.id, vote, "single choice", x)),
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
            Some(VoteValue::Single(c)) => Ok(c.clone()),
            None | Some(VoteValue::Abstain) => Ok(String::new()),
            Some(x) => Err(wrong_shape(component_id, vote, "single choice", x)),
        }
    }
}
