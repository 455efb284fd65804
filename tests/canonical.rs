use sorted_args::{canonicalize, CanonicalResult, ParameterFilterSet, SortOrder};

const ORDERS: [SortOrder; 2] = [SortOrder::Compatible, SortOrder::Lexicographic];

fn run(query: &str, filter: &[&str], order: SortOrder) -> CanonicalResult {
    let filter = ParameterFilterSet::build(filter);
    canonicalize(query, Some(&filter), order).expect("canonicalize")
}

#[test]
fn empty_query_has_no_facts() {
    for order in ORDERS {
        let result = run("", &["a"], order);

        assert!(!result.has_args());
        assert!(!result.is_args());
        assert_eq!(result.canonical(), "");
    }
}

#[test]
fn unfiltered_query_always_has_visible_args() {
    for query in ["a", "&", "=", "b=2&a=1", "&&&", "x=%20"] {
        let result = canonicalize(query, None, SortOrder::Compatible).expect("canonicalize");

        assert!(result.has_args(), "{query}");
        assert!(result.is_args(), "{query}");
    }
}

#[test]
fn sorts_by_key() {
    for order in ORDERS {
        let result = run("b=2&a=1&c=3", &[], order);

        assert!(result.has_args());
        assert!(result.is_args());
        assert_eq!(result.canonical(), "a=1&b=2&c=3");
    }
}

#[test]
fn removes_filtered_parameter() {
    let result = run("a=1&b=2", &["a"], SortOrder::Compatible);
    assert_eq!(result.canonical(), "b=2");
}

#[test]
fn everything_filtered_still_has_args() {
    let result = run("a=1&b=2", &["a", "b"], SortOrder::Compatible);

    assert_eq!(result.canonical(), "");
    assert!(!result.is_args());
    assert!(result.has_args());
}

#[test]
fn empty_fragments_survive_filtering() {
    for order in ORDERS {
        let result = run("&a=1&", &["a"], order);

        assert_eq!(result.canonical(), "&");
        assert!(result.is_args());
        assert_eq!(run("&a=1&", &["a"], order), result);
    }
}

#[test]
fn filter_matches_any_case_and_keeps_repeats_apart() {
    let result = run(
        "UTM_Source=a&q=rust&utm_source=b&Q=Rust&utm_medium=c",
        &["utm_source", "UTM_MEDIUM"],
        SortOrder::Compatible,
    );

    assert_eq!(result.canonical(), "q=rust&Q=Rust");
    for fragment in result.canonical().split('&') {
        assert!(!fragment.to_ascii_lowercase().starts_with("utm_"));
    }
}

#[test]
fn filtered_name_is_matched_on_whole_key() {
    let result = run("id=1&idx=2&id", &["id"], SortOrder::Compatible);
    assert_eq!(result.canonical(), "idx=2");
}

#[test]
fn canonical_output_is_a_fixed_point() {
    let queries = [
        "b=2&a=1&c=3",
        "z&y=1&x=2&Y=0",
        "page=2&sort=desc&filter=name&limit=10",
        "c=%2F&b=a+b&a=",
        "&&q=1&",
    ];

    for order in ORDERS {
        for query in queries {
            let once = run(query, &["limit"], order);
            let twice = run(once.canonical(), &["limit"], order);

            assert_eq!(once.canonical(), twice.canonical(), "{query} ({order:?})");
        }
    }
}

#[test]
fn lexicographic_output_is_a_fixed_point_for_generated_queries() {
    const FRAGMENTS: [&str; 10] = ["a", "A", "ab", "aa", "b", "=", "", "a=1", "ab=", "A=1"];

    // Every sequence of one to four fragments.
    let mut level: Vec<Vec<&str>> = vec![Vec::new()];
    let mut queries = Vec::new();
    for _ in 0..4 {
        level = level
            .iter()
            .flat_map(|prefix| {
                FRAGMENTS.iter().map(move |fragment| {
                    let mut next = prefix.clone();
                    next.push(*fragment);
                    next
                })
            })
            .collect();
        queries.extend(level.iter().map(|fragments| fragments.join("&")));
    }

    for query in &queries {
        let once = run(&query, &["b"], SortOrder::Lexicographic);
        let twice = run(once.canonical(), &["b"], SortOrder::Lexicographic);

        assert_eq!(once.canonical(), twice.canonical(), "{query}");
    }
}

#[test]
fn compatible_order_can_resort_its_own_output() {
    let once = run("ab=&b&A&a=1&aa", &["b"], SortOrder::Compatible);
    let twice = run(once.canonical(), &["b"], SortOrder::Compatible);

    assert_eq!(once.canonical(), "ab=&A&a=1&aa");
    assert_eq!(twice.canonical(), "a=1&aa&ab=&A");
}

#[test]
fn default_order_is_idempotent() {
    let once = run("ab=&b&A&a=1&aa", &["b"], SortOrder::default());
    let twice = run(once.canonical(), &["b"], SortOrder::default());

    assert_eq!(once.canonical(), twice.canonical());
}

#[test]
fn distinct_keys_come_out_ordered() {
    let query = "delta=4&Alpha=1&charlie=3&bravo=2&echo=5";

    for order in ORDERS {
        let result = run(query, &[], order);
        let keys: Vec<String> = result
            .canonical()
            .split('&')
            .map(|fragment| fragment.split('=').next().unwrap_or("").to_ascii_lowercase())
            .collect();

        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }
}

#[test]
fn values_and_encoding_are_untouched() {
    let result = run("q=Hello%20World&name=a+b&Flag", &[], SortOrder::Compatible);
    assert_eq!(result.canonical(), "Flag&name=a+b&q=Hello%20World");
}

#[test]
fn orders_disagree_only_on_prefix_ties() {
    // "a" is a prefix of "ab", so the compatible order ties on the key and
    // decides on raw text, where '=' sorts before 'b'.
    let compatible = run("ab=1&a=2", &[], SortOrder::Compatible);
    let lexicographic = run("ab=1&a=2", &[], SortOrder::Lexicographic);

    assert_eq!(compatible.canonical(), "a=2&ab=1");
    assert_eq!(lexicographic.canonical(), "a=2&ab=1");

    // Raw texts tie as well, so the historical order keeps input order.
    let compatible = run("ab&a", &[], SortOrder::Compatible);
    let lexicographic = run("ab&a", &[], SortOrder::Lexicographic);

    assert_eq!(compatible.canonical(), "ab&a");
    assert_eq!(lexicographic.canonical(), "a&ab");
}

#[test]
fn filter_set_deduplicates() {
    let set = ParameterFilterSet::build(["utm_source", "UTM_SOURCE", "utm_medium"]);

    assert_eq!(set.len(), 2);
    assert!(set.contains("utm_source"));
    assert!(set.contains("utm_medium"));
}
