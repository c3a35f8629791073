use serde_json::json;
use serde_json::Value as JSValue;

use crate::config::*;
use crate::error::BallotResult;
use crate::methods::{wrong_shape, BallotComponentType, MethodSettings, MethodStrings};
use crate::validation::{self, RuleSet};

/// A single question answered with yes or no.
#[derive(Debug, Clone)]
pub struct YesNo {
    settings: MethodSettings,
}

impl YesNo {
    pub fn v1() -> YesNo {
        YesNo {
            settings: MethodSettings {
                needs_options: false,
                options_validator: RuleSet::new(),
                preset_options: json!({}),
                form: None,
            },
        }
    }
}

impl BallotComponentType for YesNo {
    fn kind(&self) -> VotingMethodKind {
        VotingMethodKind::YesNo
    }

    fn settings(&self) -> &MethodSettings {
        &self.settings
    }

    fn strings(&self) -> MethodStrings {
        MethodStrings {
            name: "Yes / No",
            description: "A question answered with yes or no.",
            instructions: "Choose yes or no.",
        }
    }

    fn submission_validator(
        &self,
        component: &BallotComponent,
        _ballot: &Ballot,
    ) -> BallotResult<RuleSet> {
        Ok(RuleSet::new().field(
            component.id.to_string(),
            vec![
                validation::present_key(),
                validation::nullable(),
                validation::boolean(),
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
            JSValue::Bool(b) => Ok(VoteValue::Boolean(*b)),
            x => Err(format!("expected true, false or null, got {}", x)),
        }
    }

    fn calculate_results(
        &self,
        votes: &[Vote],
        component: &BallotComponent,
    ) -> BallotResult<ComponentResults> {
        let mut res = YesNoResults {
            yes: 0,
            no: 0,
            abstained: 0,
        };
        for vote in votes.iter() {
            match vote.value_for(component.id) {
                Some(VoteValue::Boolean(true)) => res.yes += 1,
                Some(VoteValue::Boolean(false)) => res.no += 1,
                None | Some(VoteValue::Abstain) => res.abstained += 1,
                Some(x) => return Err(wrong_shape(component.id, vote, "boolean", x)),
            }
        }
        Ok(ComponentResults::YesNo(res))
    }

    fn values_to_csv(&self, vote: &Vote, component_id: ComponentId) -> BallotResult<String> {
        match vote.value_for(component_id) {
            Some(VoteValue::Boolean(true)) => Ok("Yes".to_string()),
            Some(VoteValue::Boolean(false)) => Ok("No".to_string()),
            None | Some(VoteValue::Abstain) => Ok(String::new()),
            Some(x) => Err(wrong_shape(component_id, vote, "boolean", x)),
        }
    }
}
