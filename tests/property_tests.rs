//! Property-based tests for logtree using proptest

use logtree::prelude::*;
use proptest::prelude::*;

fn standard_level() -> impl Strategy<Value = Level> {
    prop_oneof![
        Just(Level::TRACE),
        Just(Level::DEBUG),
        Just(Level::INFO),
        Just(Level::WARN),
        Just(Level::ERROR),
        Just(Level::FATAL),
    ]
}

/// Filter expressions built from the grammar's terminals and combinators
fn expression() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        Just("accept".to_string()),
        Just("deny".to_string()),
        standard_level().prop_map(|l| format!("levelChange({})", l)),
        (standard_level(), standard_level()).prop_map(|(a, b)| format!("levels({},{})", a, b)),
        (any::<bool>(), standard_level(), standard_level(), any::<bool>()).prop_map(
            |(lo, a, b, hi)| format!(
                "levelRange{}{},{}{}",
                if lo { '[' } else { '(' },
                a,
                b,
                if hi { ']' } else { ')' }
            )
        ),
        "[a-z]{1,6}".prop_map(|p| format!("match(\"{}\")", p)),
    ];
    leaf.prop_recursive(3, 16, 3, |inner| {
        prop_oneof![
            inner.clone().prop_map(|e| format!("not({})", e)),
            prop::collection::vec(inner.clone(), 1..4)
                .prop_map(|items| format!("all({})", items.join(","))),
            prop::collection::vec(inner, 1..4)
                .prop_map(|items| format!("any({})", items.join(","))),
        ]
    })
}

proptest! {
    /// Level ordering follows severity
    #[test]
    fn test_level_ordering(a in standard_level(), b in standard_level()) {
        prop_assert_eq!(a < b, a.severity() < b.severity());
        prop_assert_eq!(a == b, a.severity() == b.severity());
        prop_assert!(Level::ALL <= a && a <= Level::OFF);
    }

    /// Level names parse back regardless of case
    #[test]
    fn test_level_name_roundtrip(level in standard_level()) {
        let lower = level.name().to_lowercase();
        let parsed: Level = lower.parse().unwrap();
        prop_assert_eq!(parsed, level);
    }

    /// The effective level of any node equals the nearest explicit level on
    /// its path, or the baseline when there is none
    #[test]
    fn test_effective_level_is_nearest_explicit(
        depth in 1usize..6,
        explicit in prop::collection::vec(prop::option::of(standard_level()), 6),
    ) {
        let namespace = Namespace::new();
        let path: Vec<String> = (0..depth).map(|i| format!("n{}", i)).collect();
        let leaf = namespace.logger(&path.join("."));

        for (i, level) in explicit.iter().take(depth).enumerate() {
            namespace.logger(&path[..=i].join(".")).set_level(level.clone());
        }

        let expected = explicit
            .iter()
            .take(depth)
            .rev()
            .flatten()
            .next()
            .map_or(Level::INFO.severity(), Level::severity);
        prop_assert_eq!(leaf.effective_level(), expected);
    }

    /// Rendering a parsed filter yields an expression that parses to the
    /// same rendering
    #[test]
    fn test_filter_display_reparses(expr in expression()) {
        let namespace = Namespace::new();
        let filter = namespace.parse_filter(&expr).unwrap();
        let rendered = filter.to_string();
        prop_assert_eq!(&rendered, &expr);
        let reparsed = namespace.parse_filter(&rendered).unwrap();
        prop_assert_eq!(reparsed.to_string(), rendered);
    }

    /// levelRange accepts exactly the severities inside its bounds
    #[test]
    fn test_level_range_semantics(
        min in standard_level(),
        max in standard_level(),
        min_inclusive in any::<bool>(),
        max_inclusive in any::<bool>(),
        level in standard_level(),
    ) {
        let filter = Filter::level_range(min.clone(), min_inclusive, max.clone(), max_inclusive);
        let s = level.severity();
        let above = if min_inclusive { s >= min.severity() } else { s > min.severity() };
        let below = if max_inclusive { s <= max.severity() } else { s < max.severity() };
        prop_assert_eq!(filter.is_loggable(&mut LogRecord::new(level, "x")), above && below);
    }

    /// Nesting of any depth yields a filter or a parse error
    #[test]
    fn test_deep_nesting_is_bounded(depth in 0usize..3000, head in prop_oneof![
        Just("not("),
        Just("all("),
        Just("any(deny,"),
    ]) {
        let namespace = Namespace::new();
        let input = format!("{}accept{}", head.repeat(depth), ")".repeat(depth));
        match namespace.parse_filter(&input) {
            Ok(_) => {
                prop_assert!(depth < 64);
            }
            Err(LoggerError::Parse { .. }) => {
                prop_assert!(depth >= 64);
            }
            Err(other) => {
                prop_assert!(false, "unexpected error {}", other);
            }
        }
    }

    /// Arbitrary input never panics the parser
    #[test]
    fn test_parser_never_panics(input in "\\PC{0,40}") {
        let namespace = Namespace::new();
        let _ = namespace.parse_filter(&input);
    }
}
