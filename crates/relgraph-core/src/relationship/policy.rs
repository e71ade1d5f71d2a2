//! Type-pair mapping policy.
//!
//! Regular users may not map or unmap certain groups of object types; those
//! mappings are owned by trusted external integrations. The rules are
//! checked in a fixed order and the first match is reported:
//!
//! 1. scoping objects with directives (Regulation, Standard)
//! 2. Control with scoping objects, directives, or Risk
//! 3. Risk with scoping objects, directives, or Control

use std::collections::BTreeSet;

use crate::error::ValidationError;

const DIRECTIVE_TYPES: &[&str] = &["Regulation", "Standard"];
const CONTROL_TYPE: &str = "Control";
const RISK_TYPE: &str = "Risk";

/// Which restriction a type pair ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PolicyViolation {
    #[error(
        "You do not have the necessary permissions to map and unmap scoping objects to \
         directives in this application. Please contact your administrator if you have \
         any questions."
    )]
    ScopingToDirective,

    #[error(
        "You do not have the necessary permissions to map and unmap controls to scoping \
         objects, standards and regulations in this application. Please contact your \
         administrator if you have any questions."
    )]
    Control,

    #[error(
        "You do not have the necessary permissions to map and unmap risks to scoping \
         objects, controls, standards and regulations in this application. Please \
         contact your administrator if you have any questions."
    )]
    Risk,
}

impl From<PolicyViolation> for ValidationError {
    fn from(violation: PolicyViolation) -> Self {
        Self::new(violation.to_string())
    }
}

/// Whether one type is in `group1` and the other in `group2`, in either order.
#[must_use]
pub fn check_relation_types_group(
    type1: &str,
    type2: &str,
    group1: &dyn Fn(&str) -> bool,
    group2: &dyn Fn(&str) -> bool,
) -> bool {
    (group1(type1) && group2(type2)) || (group1(type2) && group2(type1))
}

/// Decide whether `source_type` and `destination_type` may be mapped.
///
/// `scoping` is the set of scoping object type names. External actors are
/// exempt from every rule.
///
/// # Errors
///
/// Returns the first [`PolicyViolation`] the pair matches.
pub fn check_mapping(
    scoping: &BTreeSet<&str>,
    is_external: bool,
    source_type: &str,
    destination_type: &str,
) -> Result<(), PolicyViolation> {
    if is_external {
        return Ok(());
    }

    let is_scoping = |t: &str| scoping.contains(t);
    let is_directive = |t: &str| DIRECTIVE_TYPES.iter().any(|d| *d == t);

    if check_relation_types_group(source_type, destination_type, &is_scoping, &is_directive) {
        return Err(PolicyViolation::ScopingToDirective);
    }

    let control_restricted = |t: &str| is_scoping(t) || is_directive(t) || t == RISK_TYPE;
    if check_relation_types_group(
        source_type,
        destination_type,
        &control_restricted,
        &|t: &str| t == CONTROL_TYPE,
    ) {
        return Err(PolicyViolation::Control);
    }

    let risk_restricted = |t: &str| is_scoping(t) || is_directive(t) || t == CONTROL_TYPE;
    if check_relation_types_group(
        source_type,
        destination_type,
        &risk_restricted,
        &|t: &str| t == RISK_TYPE,
    ) {
        return Err(PolicyViolation::Risk);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::BUILTIN_SCOPING_TYPES;
    use proptest::prelude::*;

    fn scoping() -> BTreeSet<&'static str> {
        BUILTIN_SCOPING_TYPES.iter().copied().collect()
    }

    fn any_type() -> impl Strategy<Value = &'static str> {
        prop::sample::select(vec![
            "System",
            "Vendor",
            "Product",
            "Regulation",
            "Standard",
            "Control",
            "Risk",
            "Objective",
            "Issue",
            "Audit",
            "Snapshot",
            "Person",
        ])
    }

    #[test]
    fn scoping_to_directive_is_restricted_first() {
        let scoping = scoping();
        assert_eq!(
            check_mapping(&scoping, false, "System", "Regulation"),
            Err(PolicyViolation::ScopingToDirective)
        );
        assert_eq!(
            check_mapping(&scoping, false, "Standard", "Vendor"),
            Err(PolicyViolation::ScopingToDirective)
        );
    }

    #[test]
    fn control_and_risk_rules() {
        let scoping = scoping();
        assert_eq!(
            check_mapping(&scoping, false, "Control", "Regulation"),
            Err(PolicyViolation::Control)
        );
        assert_eq!(
            check_mapping(&scoping, false, "Risk", "Control"),
            Err(PolicyViolation::Control)
        );
        assert_eq!(
            check_mapping(&scoping, false, "Product", "Risk"),
            Err(PolicyViolation::Risk)
        );
        assert_eq!(check_mapping(&scoping, false, "Control", "Objective"), Ok(()));
        assert_eq!(check_mapping(&scoping, false, "Control", "Control"), Ok(()));
        assert_eq!(check_mapping(&scoping, false, "Risk", "Issue"), Ok(()));
    }

    #[test]
    fn messages_name_the_restricted_category() {
        assert!(PolicyViolation::ScopingToDirective
            .to_string()
            .contains("scoping objects to directives"));
        assert!(PolicyViolation::Control.to_string().contains("map and unmap controls"));
        assert!(PolicyViolation::Risk.to_string().contains("map and unmap risks"));
    }

    proptest! {
        #[test]
        fn decision_is_symmetric(a in any_type(), b in any_type(), external in any::<bool>()) {
            let scoping = scoping();
            prop_assert_eq!(
                check_mapping(&scoping, external, a, b),
                check_mapping(&scoping, external, b, a)
            );
        }

        #[test]
        fn external_actors_are_exempt(a in any_type(), b in any_type()) {
            prop_assert_eq!(check_mapping(&scoping(), true, a, b), Ok(()));
        }

        #[test]
        fn scoping_with_directive_always_fails(
            s in prop::sample::select(BUILTIN_SCOPING_TYPES.to_vec()),
            d in prop::sample::select(DIRECTIVE_TYPES.to_vec()),
        ) {
            let scoping = scoping();
            prop_assert_eq!(
                check_mapping(&scoping, false, s, d),
                Err(PolicyViolation::ScopingToDirective)
            );
            prop_assert_eq!(
                check_mapping(&scoping, false, d, s),
                Err(PolicyViolation::ScopingToDirective)
            );
        }
    }
}
