//! Property tests for the DN model

use dirbac_directory::{Dn, Rdn};
use proptest::prelude::*;

fn rdn_strategy() -> impl Strategy<Value = String> {
    ("(cn|ou|dc|uid)", "[A-Za-z0-9][A-Za-z0-9 _-]{0,11}[A-Za-z0-9]")
        .prop_map(|(attr, value)| format!("{}={}", attr, value))
}

fn dn_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(rdn_strategy(), 1..6).prop_map(|rdns| rdns.join(","))
}

proptest! {
    #[test]
    fn test_child_relations(parent in dn_strategy(), rdn in rdn_strategy()) {
        let parent = Dn::new(&parent).unwrap();
        let child = parent.child(Rdn::new(&rdn).unwrap());

        prop_assert!(child.is_child_of(&parent));
        prop_assert!(child.is_descendant_of(&parent));
        prop_assert!(!parent.is_descendant_of(&child));
        prop_assert_eq!(child.parent(), Some(parent.clone()));
        prop_assert_eq!(child.relative_to(&parent).map(|r| r.len()), Some(1));
    }

    #[test]
    fn test_normalization_ignores_case_and_spacing(dn in dn_strategy()) {
        let spaced = dn.replace(',', " , ").to_uppercase();
        prop_assert_eq!(Dn::new(&dn).unwrap(), Dn::new(&spaced).unwrap());
    }

    #[test]
    fn test_reparse_is_stable(dn in dn_strategy()) {
        let parsed = Dn::new(&dn).unwrap();
        let reparsed: Dn = parsed.to_string().parse().unwrap();
        prop_assert_eq!(parsed.normalized(), reparsed.normalized());
    }
}
