//! Property tests for DN template composition

use dirbac_authz::template::{compose, marker_count, MARKER};
use dirbac_authz::GraphError;
use proptest::prelude::*;

fn component() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 %_-]{0,12}"
}

fn template_strategy() -> impl Strategy<Value = (Vec<String>, usize)> {
    // Literal segments between markers; n segments give n - 1 markers
    prop::collection::vec("[a-z=,]{0,8}", 1..6).prop_map(|segments| {
        let markers = segments.len() - 1;
        (segments, markers)
    })
}

proptest! {
    #[test]
    fn test_full_composition_replaces_every_marker(
        (segments, markers) in template_strategy(),
        components in prop::collection::vec(component(), 5),
    ) {
        let template = segments.join(MARKER);
        prop_assume!(!template.is_empty());
        prop_assert_eq!(marker_count(&template), markers);

        let supplied: Vec<&str> = components.iter().take(markers).map(String::as_str).collect();
        let composed = compose(&template, &supplied).unwrap();

        // Rebuild the expected output segment by segment
        let mut expected = segments[0].clone();
        for (segment, value) in segments[1..].iter().zip(&supplied) {
            expected.push_str(value);
            expected.push_str(segment);
        }
        prop_assert_eq!(composed, expected);
    }

    #[test]
    fn test_missing_components_leave_markers(
        (segments, markers) in template_strategy(),
        components in prop::collection::vec("[A-Za-z0-9]{1,8}", 5),
        missing in 1usize..3,
    ) {
        prop_assume!(markers >= missing);
        let template = segments.join(MARKER);

        let supplied: Vec<&str> = components
            .iter()
            .take(markers - missing)
            .map(String::as_str)
            .collect();
        let composed = compose(&template, &supplied).unwrap();

        prop_assert_eq!(marker_count(&composed), missing);
    }

    #[test]
    fn test_excess_components_rejected(
        (segments, markers) in template_strategy(),
        extra in 1usize..3,
    ) {
        let template = segments.join(MARKER);
        prop_assume!(!template.is_empty());

        let supplied = vec!["x"; markers + extra];
        prop_assert!(matches!(compose(&template, &supplied), Err(GraphError::Configuration(_))));
    }
}
