//! Positional DN templates
//!
//! A template is a DN or filter with `%s` markers, filled left to right with
//! the supplied components. Components are inserted verbatim and substituted
//! text is never scanned for further markers.

use crate::error::{GraphError, Result};

/// Placeholder replaced by one component
pub const MARKER: &str = "%s";

/// Substitutes one marker per component, left to right.
///
/// Fails when the template is empty or when there are more components than
/// markers. Markers left over when fewer components are supplied stay in the
/// output as they are.
pub fn compose(template: &str, components: &[&str]) -> Result<String> {
    if template.is_empty() {
        return Err(GraphError::Configuration("Empty DN template".to_string()));
    }

    let markers = marker_count(template);
    if components.len() > markers {
        return Err(GraphError::Configuration(format!(
            "Template \"{}\" has {} marker(s) but {} component(s) were supplied",
            template,
            markers,
            components.len()
        )));
    }

    let capacity = template.len() + components.iter().map(|c| c.len()).sum::<usize>();
    let mut out = String::with_capacity(capacity);
    let mut rest = template;
    for component in components {
        // Counted above, so every component has a marker
        let Some(at) = rest.find(MARKER) else { break };
        out.push_str(&rest[..at]);
        out.push_str(component);
        rest = &rest[at + MARKER.len()..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Number of `%s` markers in a template
pub fn marker_count(template: &str) -> usize {
    template.matches(MARKER).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_fills_markers_in_order() {
        let dn = compose(
            "cn=%s,ou=%s,ou=Roles,ou=%s,ou=Systems,dc=test",
            &["tester", "Auditor", "Datastore"],
        )
        .unwrap();
        assert_eq!(dn, "cn=tester,ou=Auditor,ou=Roles,ou=Datastore,ou=Systems,dc=test");
    }

    #[test]
    fn test_compose_leaves_missing_components_unsubstituted() {
        let dn = compose("ou=%s,ou=%s,dc=test", &["A"]).unwrap();
        assert_eq!(dn, "ou=A,ou=%s,dc=test");
    }

    #[test]
    fn test_compose_rejects_excess_components() {
        let err = compose("ou=%s,dc=test", &["A", "B"]).unwrap_err();
        assert!(matches!(err, GraphError::Configuration(_)));
    }

    #[test]
    fn test_compose_rejects_empty_template() {
        assert!(matches!(compose("", &[]), Err(GraphError::Configuration(_))));
    }

    #[test]
    fn test_component_markers_are_not_rescanned() {
        let dn = compose("cn=%s,ou=%s,dc=test", &["50%s", "B"]).unwrap();
        assert_eq!(dn, "cn=50%s,ou=B,dc=test");
    }

    #[test]
    fn test_marker_count() {
        assert_eq!(marker_count("dc=test"), 0);
        assert_eq!(marker_count("ou=%s,ou=Roles,ou=%s,ou=Systems,dc=test"), 2);
    }
}
