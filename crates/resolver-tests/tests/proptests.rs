//! Property tests for range semantics and resolver determinism.
//!
//! Wally ranges are reimplemented by hand (see `jelly::resolver::range`'s
//! doc comment for why `semver::VersionReq` isn't reused), so these
//! properties are what stand in for trusting a battle-tested crate:
//! every desugaring is checked against an independently computed
//! expectation, not just against its own implementation.

mod common;

use std::collections::BTreeMap;

use common::{base_url, req, FakeRegistry};
use jelly::resolver::{resolve_tree, Range};
use jelly::Version;
use proptest::prelude::*;

fn arb_version() -> impl Strategy<Value = Version> {
    (0u64..6, 0u64..6, 0u64..6).prop_map(|(major, minor, patch)| Version::new(major, minor, patch))
}

proptest! {
    #[test]
    fn caret_matches_same_major_not_less_not_next_major(
        (major, minor, patch) in (1u64..8, 0u64..8, 0u64..8),
        bump_minor in 0u64..8,
    ) {
        let base = Version::new(major, minor, patch);
        let range = Range::parse(&format!("^{base}"));

        prop_assert!(range.satisfies(&base));
        prop_assert!(range.satisfies(&Version::new(major, minor + bump_minor, patch)));
        prop_assert!(!range.satisfies(&Version::new(major + 1, 0, 0)));
    }

    #[test]
    fn caret_on_zero_major_only_spans_the_same_minor(
        minor in 0u64..8, patch in 0u64..8, bump_patch in 0u64..8,
    ) {
        let base = Version::new(0, minor, patch);
        let range = Range::parse(&format!("^{base}"));

        prop_assert!(range.satisfies(&base));
        prop_assert!(range.satisfies(&Version::new(0, minor, patch + bump_patch)));
        prop_assert!(!range.satisfies(&Version::new(0, minor + 1, 0)));
    }

    #[test]
    fn tilde_only_spans_the_same_minor(
        (major, minor, patch) in (0u64..8, 0u64..8, 0u64..8),
        bump_patch in 0u64..8,
    ) {
        let base = Version::new(major, minor, patch);
        let range = Range::parse(&format!("~{base}"));

        prop_assert!(range.satisfies(&base));
        prop_assert!(range.satisfies(&Version::new(major, minor, patch + bump_patch)));
        prop_assert!(!range.satisfies(&Version::new(major, minor + 1, 0)));
    }

    #[test]
    fn comparator_forms_agree_with_ord(a in arb_version(), b in arb_version()) {
        prop_assert_eq!(Range::parse(&format!(">={a}")).satisfies(&b), b >= a);
        prop_assert_eq!(Range::parse(&format!("<={a}")).satisfies(&b), b <= a);
        prop_assert_eq!(Range::parse(&format!(">{a}")).satisfies(&b), b > a);
        prop_assert_eq!(Range::parse(&format!("<{a}")).satisfies(&b), b < a);
        prop_assert_eq!(Range::parse(&a.to_string()).satisfies(&b), a == b);
    }

    #[test]
    fn disjunction_is_the_union_of_its_branches(a in arb_version(), b in arb_version(), c in arb_version()) {
        let range = Range::parse(&format!("{a} || {b}"));
        prop_assert_eq!(range.satisfies(&c), c == a || c == b);
    }

    #[test]
    fn wildcard_always_matches(v in arb_version()) {
        prop_assert!(Range::any().satisfies(&v));
    }
}

/// "Highest-compatible": the resolver never settles on a version lower
/// than the true maximum of the versions satisfying the root range,
/// for a single package with no transitive dependencies.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]
    #[test]
    fn resolve_one_package_picks_the_registry_maximum_satisfying_the_range(
        versions in prop::collection::btree_set(arb_version(), 1..8),
        floor in arb_version(),
    ) {
        let range = Range::parse(&format!(">={floor}"));
        let expected_max = versions.iter().filter(|v| range.satisfies(v)).max().cloned();

        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let resolved_version = rt.block_on(async {
            let registry = FakeRegistry::new();
            for v in &versions {
                registry.add("a/x", &v.to_string(), &[]);
            }
            let direct = BTreeMap::from([req("a/x", &range.to_string())]);
            let outcome = resolve_tree(&registry, &base_url(), &direct).await.unwrap();
            outcome.graph.nodes.get(&"a/x".parse().unwrap()).map(|n| n.version.clone())
        });

        prop_assert_eq!(resolved_version, expected_max);
    }
}
