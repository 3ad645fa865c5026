//! Structural invariants of the builder, property-checked

use docpress_convert::{BuildOptions, convert};
use docpress_domain::constants::MAX_TEXT_RUN_LEN;
use docpress_domain::Block;
use proptest::prelude::*;

fn assert_run_lengths(blocks: &[Block]) {
    for block in blocks {
        if let Some(runs) = block.rich_text() {
            for run in runs {
                assert!(
                    run.len_code_points() <= MAX_TEXT_RUN_LEN,
                    "run of {} code points in {:?}",
                    run.len_code_points(),
                    block.kind()
                );
            }
        }
        if let Some(children) = block.children() {
            assert_run_lengths(children);
        }
    }
}

fn assert_leaf_kinds_childless(blocks: &[Block]) {
    for block in blocks {
        if let Some(children) = block.children() {
            assert!(
                block.kind().supports_children() || children.is_empty(),
                "{:?} carries children",
                block.kind()
            );
            assert_leaf_kinds_childless(children);
        }
    }
}

fn text_strategy() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-zA-Z0-9 ,.!?'\u{e9}\u{4e2d}]{1,400}")
        .expect("valid regex")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn emitted_runs_respect_the_length_limit(
        paragraphs in proptest::collection::vec(text_strategy(), 1..8),
        repeat in 1usize..12,
    ) {
        let mut html = String::new();
        for text in &paragraphs {
            html.push_str("<p>");
            for _ in 0..repeat {
                html.push_str(text);
            }
            html.push_str("</p>");
        }
        let outcome = convert(&html, &BuildOptions::default());
        if let Ok(outcome) = outcome {
            assert_run_lengths(&outcome.blocks);
        }
    }

    #[test]
    fn leaf_kinds_never_carry_children(
        items in proptest::collection::vec(text_strategy(), 1..6),
        nest in 0usize..4,
    ) {
        let mut html = String::new();
        html.push_str("<h1>Title</h1>");
        for _ in 0..nest {
            html.push_str("<ul><li>level");
        }
        for item in &items {
            html.push_str(&format!("<li>{item}</li>"));
        }
        for _ in 0..nest {
            html.push_str("</li></ul>");
        }
        html.push_str("<pre>code body</pre><hr>");
        let outcome = convert(&html, &BuildOptions::default());
        if let Ok(outcome) = outcome {
            assert_leaf_kinds_childless(&outcome.blocks);
        }
    }

    #[test]
    fn conversion_never_panics_on_fragment_soup(
        fragments in proptest::collection::vec(
            proptest::sample::select(vec![
                "<p>text</p>", "<div>", "</div>", "<ul><li>a", "<table><tr><td>x",
                "<h3>h</h3>", "<b>bold", "<blockquote>q</blockquote>", "</span>",
                "<img src=\"https://example.com/i.png\">", "<hr>", "<br>",
            ]),
            1..20,
        ),
    ) {
        let html: String = fragments.concat();
        // Permissive parsing must never panic; empty outcomes are fine.
        let _ = convert(&html, &BuildOptions::default());
    }
}
