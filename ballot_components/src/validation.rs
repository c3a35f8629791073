//! Composable validation rules.
//!
//! A [`Rule`] is a pure function of the value of one field (absent values are
//! `None`) and of the whole payload. A [`RuleSet`] is an ordered list of
//! fields, each with an ordered list of rules. Rule sets are combined by
//! concatenation.
//!
//! Rules of a field run in order and stop at the first failure, or when a rule
//! asks to skip the rest of the field (`nullable`, `sometimes`). Every field is
//! checked, so all the failing fields are reported at once.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};
use std::fmt::Debug;
use std::sync::Arc;

use serde_json::Map as JSMap;
use serde_json::Value as JSValue;

use crate::error::ValidationErrors;

/// The outcome of a single rule.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Check {
    Pass,
    /// Stop checking this field, successfully.
    Skip,
    Fail(String),
}

type CheckFn = dyn Fn(Option<&JSValue>, &JSMap<String, JSValue>) -> Check + Send + Sync;

#[derive(Clone)]
pub struct Rule {
    name: Cow<'static, str>,
    check: Arc<CheckFn>,
}

impl Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Rule({})", self.name)
    }
}

impl Rule {
    pub fn new<F>(name: impl Into<Cow<'static, str>>, check: F) -> Rule
    where
        F: Fn(Option<&JSValue>, &JSMap<String, JSValue>) -> Check + Send + Sync + 'static,
    {
        Rule {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    /// A printable description, as listed in the component tree.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn check(&self, value: Option<&JSValue>, payload: &JSMap<String, JSValue>) -> Check {
        (self.check)(value, payload)
    }
}

// Builds a rule that only looks at present values. Absent values pass.
fn present<F>(name: impl Into<Cow<'static, str>>, f: F) -> Rule
where
    F: Fn(&JSValue) -> Check + Send + Sync + 'static,
{
    Rule::new(name, move |value, _| match value {
        Some(v) => f(v),
        None => Check::Pass,
    })
}

fn fail(msg: impl Into<String>) -> Check {
    Check::Fail(msg.into())
}

pub fn required() -> Rule {
    Rule::new("required", |value, _| match value {
        None | Some(JSValue::Null) => fail("is required"),
        Some(JSValue::String(s)) if s.is_empty() => fail("is required"),
        _ => Check::Pass,
    })
}

/// The field must be in the payload, but may be null.
pub fn present_key() -> Rule {
    Rule::new("present", |value, _| match value {
        None => fail("must be present"),
        _ => Check::Pass,
    })
}

/// Skips the remaining rules when the field is absent or null.
pub fn nullable() -> Rule {
    Rule::new("nullable", |value, _| match value {
        None | Some(JSValue::Null) => Check::Skip,
        _ => Check::Pass,
    })
}

/// Skips the remaining rules when the field is absent.
pub fn sometimes() -> Rule {
    Rule::new("sometimes", |value, _| match value {
        None => Check::Skip,
        _ => Check::Pass,
    })
}

pub fn string() -> Rule {
    present("string", |v| match v {
        JSValue::String(_) => Check::Pass,
        _ => fail("must be a string"),
    })
}

pub fn boolean() -> Rule {
    present("boolean", |v| match v {
        JSValue::Bool(_) => Check::Pass,
        _ => fail("must be true or false"),
    })
}

pub fn integer() -> Rule {
    present("integer", |v| match v {
        JSValue::Number(n) if n.is_i64() || n.is_u64() => Check::Pass,
        _ => fail("must be an integer"),
    })
}

pub fn array() -> Rule {
    present("array", |v| match v {
        JSValue::Array(_) => Check::Pass,
        _ => fail("must be an array"),
    })
}

/// Minimum length of a string, or minimum value of an integer.
pub fn min(bound: i64) -> Rule {
    present(format!("min:{}", bound), move |v| match v {
        JSValue::String(s) if (s.chars().count() as i64) < bound => {
            fail(format!("must be at least {} characters", bound))
        }
        JSValue::Number(n) if n.as_i64().map(|x| x < bound).unwrap_or(false) => {
            fail(format!("must be at least {}", bound))
        }
        JSValue::Array(a) if (a.len() as i64) < bound => {
            fail(format!("must have at least {} items", bound))
        }
        _ => Check::Pass,
    })
}

/// Maximum length of a string, maximum value of an integer or maximum size of
/// an array.
pub fn max(bound: i64) -> Rule {
    present(format!("max:{}", bound), move |v| match v {
        JSValue::String(s) if (s.chars().count() as i64) > bound => {
            fail(format!("must not be longer than {} characters", bound))
        }
        JSValue::Number(n) if n.as_u64().map(|x| x > bound as u64).unwrap_or(false) => {
            fail(format!("must not be greater than {}", bound))
        }
        JSValue::Array(a) if (a.len() as i64) > bound => {
            fail(format!("must not have more than {} items", bound))
        }
        _ => Check::Pass,
    })
}

/// The value must be a string from the given list.
pub fn one_of(allowed: Vec<String>) -> Rule {
    let allowed_set: HashSet<String> = allowed.iter().cloned().collect();
    present(format!("in:{}", allowed.join(",")), move |v| match v {
        JSValue::String(s) if allowed_set.contains(s) => Check::Pass,
        _ => fail("is not a valid choice"),
    })
}

/// Every item of an array must be a non-empty string.
pub fn each_string() -> Rule {
    present("each:string", |v| match v {
        JSValue::Array(items) => {
            if items
                .iter()
                .all(|x| matches!(x, JSValue::String(s) if !s.is_empty()))
            {
                Check::Pass
            } else {
                fail("must only contain non-empty strings")
            }
        }
        _ => Check::Pass,
    })
}

/// Every item of an array must be a string from the given list.
pub fn each_one_of(allowed: Vec<String>) -> Rule {
    let allowed_set: HashSet<String> = allowed.iter().cloned().collect();
    present(format!("each:in:{}", allowed.join(",")), move |v| match v {
        JSValue::Array(items) => {
            let bad = items.iter().find(|x| match x {
                JSValue::String(s) => !allowed_set.contains(s),
                _ => true,
            });
            match bad {
                Some(x) => fail(format!("contains an invalid choice: {}", x)),
                None => Check::Pass,
            }
        }
        _ => Check::Pass,
    })
}

/// The items of an array must be pairwise distinct.
pub fn distinct() -> Rule {
    present("distinct", |v| match v {
        JSValue::Array(items) => {
            let mut seen: HashSet<String> = HashSet::new();
            for x in items {
                if !seen.insert(x.to_string()) {
                    return fail(format!("contains a duplicate: {}", x));
                }
            }
            Check::Pass
        }
        _ => Check::Pass,
    })
}

/// Escape hatch for checks that need the rest of the payload.
pub fn custom<F>(name: impl Into<Cow<'static, str>>, f: F) -> Rule
where
    F: Fn(Option<&JSValue>, &JSMap<String, JSValue>) -> Result<(), String> + Send + Sync + 'static,
{
    Rule::new(name, move |value, payload| match f(value, payload) {
        Ok(()) => Check::Pass,
        Err(msg) => Check::Fail(msg),
    })
}

/// Finds a value by dotted path (`options.candidates`).
pub fn lookup<'a>(payload: &'a JSMap<String, JSValue>, path: &str) -> Option<&'a JSValue> {
    let mut parts = path.split('.');
    let first = parts.next()?;
    let mut cur = payload.get(first)?;
    for p in parts {
        cur = cur.as_object()?.get(p)?;
    }
    Some(cur)
}

#[derive(Clone, Debug, Default)]
pub struct RuleSet {
    fields: Vec<(String, Vec<Rule>)>,
}

impl RuleSet {
    pub fn new() -> RuleSet {
        RuleSet { fields: Vec::new() }
    }

    /// Adds rules for a field. Rules for a field already present are appended.
    pub fn field(mut self, name: impl Into<String>, rules: Vec<Rule>) -> RuleSet {
        let name = name.into();
        if let Some((_, existing)) = self.fields.iter_mut().find(|(n, _)| *n == name) {
            existing.extend(rules);
        } else {
            self.fields.push((name, rules));
        }
        self
    }

    pub fn concat(self, other: RuleSet) -> RuleSet {
        other
            .fields
            .into_iter()
            .fold(self, |acc, (name, rules)| acc.field(name, rules))
    }

    /// Keeps only the fields accepted by the predicate.
    pub fn retain(mut self, keep: impl Fn(&str) -> bool) -> RuleSet {
        self.fields.retain(|(name, _)| keep(name));
        self
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The rule names per field.
    pub fn describe(&self) -> BTreeMap<String, Vec<String>> {
        self.fields
            .iter()
            .map(|(n, rules)| (n.clone(), rules.iter().map(|r| r.name().to_string()).collect()))
            .collect()
    }

    pub fn validate(&self, payload: &JSMap<String, JSValue>) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        for (name, rules) in self.fields.iter() {
            let value = lookup(payload, name);
            for rule in rules.iter() {
                match rule.check(value, payload) {
                    Check::Pass => {}
                    Check::Skip => break,
                    Check::Fail(msg) => {
                        errors.push(name.clone(), format!("{} {}", name, msg));
                        break;
                    }
                }
            }
        }
        errors.into_result()
    }
}
