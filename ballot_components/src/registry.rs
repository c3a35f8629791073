use std::collections::BTreeMap;
use std::sync::Arc;

use log::debug;
use serde::Serialize;

use crate::config::*;
use crate::error::{BallotError, BallotResult};
use crate::methods::{
    ApprovalVote, BallotComponentType, FirstPastThePost, MethodStrings, RankedChoice, YesNo,
};

/// The table of voting methods, keyed by (type, version).
///
/// Methods are resolved once per component from this table. Adding a method
/// or a new version of a method only means registering one more entry.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: BTreeMap<(VotingMethodKind, String), Arc<dyn BallotComponentType>>,
}

/// What the administration tooling needs to know about one (type, version).
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodDescriptor {
    pub needs_options: bool,
    pub form: Option<&'static str>,
    /// Field name to rule names.
    pub options_validators: BTreeMap<String, Vec<String>>,
    pub strings: MethodStrings,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Registry {
        Registry::default()
    }

    /// The four built-in methods at version `v1`.
    pub fn builtin() -> Registry {
        let mut r = Registry::new();
        r.register("v1", Arc::new(YesNo::v1()));
        r.register("v1", Arc::new(FirstPastThePost::v1()));
        r.register("v1", Arc::new(RankedChoice::v1()));
        r.register("v1", Arc::new(ApprovalVote::v1()));
        r
    }

    /// Registers a method under its kind and the given version. An existing
    /// entry for the same pair is replaced.
    pub fn register(&mut self, version: &str, method: Arc<dyn BallotComponentType>) {
        debug!("register: {} {}", method.kind(), version);
        self.entries
            .insert((method.kind(), version.to_string()), method);
    }

    pub fn list_types(&self) -> Vec<VotingMethodKind> {
        let mut res: Vec<VotingMethodKind> = self.entries.keys().map(|(k, _)| *k).collect();
        res.dedup();
        res
    }

    /// The versions of a type, by type name. Unknown types have no version.
    pub fn list_versions(&self, type_name: &str) -> Vec<String> {
        match type_name.parse::<VotingMethodKind>() {
            Ok(kind) => self
                .entries
                .keys()
                .filter(|(k, _)| *k == kind)
                .map(|(_, v)| v.clone())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn resolve(
        &self,
        kind: VotingMethodKind,
        version: &str,
    ) -> BallotResult<&Arc<dyn BallotComponentType>> {
        self.entries
            .get(&(kind, version.to_string()))
            .ok_or_else(|| BallotError::NotFound {
                what: "voting method",
                key: format!("{} {}", kind, version),
            })
    }

    /// Resolves by type name, as found in a raw payload.
    pub fn resolve_name(
        &self,
        type_name: &str,
        version: &str,
    ) -> BallotResult<&Arc<dyn BallotComponentType>> {
        let kind = type_name
            .parse::<VotingMethodKind>()
            .map_err(|_| BallotError::NotFound {
                what: "voting method",
                key: format!("{} {}", type_name, version),
            })?;
        self.resolve(kind, version)
    }

    pub fn resolve_component(
        &self,
        component: &BallotComponent,
    ) -> BallotResult<&Arc<dyn BallotComponentType>> {
        self.resolve(component.kind, &component.version)
    }

    /// type name -> version -> descriptor
    pub fn component_tree(&self) -> BTreeMap<String, BTreeMap<String, MethodDescriptor>> {
        let mut res: BTreeMap<String, BTreeMap<String, MethodDescriptor>> = BTreeMap::new();
        for ((kind, version), method) in self.entries.iter() {
            let settings = method.settings();
            res.entry(kind.name().to_string()).or_default().insert(
                version.clone(),
                MethodDescriptor {
                    needs_options: settings.needs_options,
                    form: settings.form,
                    options_validators: settings.options_validator.describe(),
                    strings: method.strings(),
                },
            );
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_has_the_four_methods_at_v1() {
        let r = Registry::builtin();
        assert_eq!(r.list_types(), VotingMethodKind::ALL.to_vec());
        for kind in VotingMethodKind::ALL {
            assert_eq!(r.list_versions(kind.name()), vec!["v1".to_string()]);
            assert_eq!(r.resolve(kind, "v1").unwrap().kind(), kind);
        }
    }

    #[test]
    fn unknown_pairs_are_not_found() {
        let r = Registry::builtin();
        assert!(r
            .resolve(VotingMethodKind::YesNo, "v2")
            .unwrap_err()
            .is_not_found());
        assert!(r.resolve_name("Borda", "v1").unwrap_err().is_not_found());
        assert!(r.list_versions("Borda").is_empty());
        assert!(Registry::new()
            .resolve(VotingMethodKind::YesNo, "v1")
            .is_err());
    }

    #[test]
    fn options_settings_are_consistent() {
        let r = Registry::builtin();
        for kind in r.list_types() {
            let s = r.resolve(kind, "v1").unwrap().settings();
            if s.needs_options {
                assert!(!s.options_validator.is_empty(), "{}", kind);
                assert!(s.form.is_some(), "{}", kind);
            } else {
                assert!(s.options_validator.is_empty(), "{}", kind);
                assert!(s.preset_options.is_object(), "{}", kind);
            }
        }
    }

    #[test]
    fn new_versions_register_without_touching_the_others() {
        let mut r = Registry::builtin();
        r.register("v2", Arc::new(YesNo::v1()));
        assert_eq!(
            r.list_versions("YesNo"),
            vec!["v1".to_string(), "v2".to_string()]
        );
        assert_eq!(r.list_versions("RankedChoice"), vec!["v1".to_string()]);
    }

    #[test]
    fn component_tree_describes_option_rules() {
        let tree = Registry::builtin().component_tree();
        let rc = &tree["RankedChoice"]["v1"];
        assert!(rc.needs_options);
        assert_eq!(rc.form, Some("ranked-choice.v1"));
        assert!(rc.options_validators.contains_key("options.candidates"));
        assert!(rc.options_validators.contains_key("options.max_rankings"));
        let yn = &tree["YesNo"]["v1"];
        assert!(!yn.needs_options);
        assert!(yn.options_validators.is_empty());
    }
}
