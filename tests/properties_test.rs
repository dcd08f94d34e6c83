// Property tests for the placeholder codec, expansion fast path and color remap.
use std::sync::Arc;

use artifact_studio::expander::{
    ExpansionOutcome, ReferenceExpander, find_references, make_reference, remap_colors,
};
use artifact_studio::library::MemoryResourceStore;
use proptest::prelude::*;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("build test runtime")
}

fn empty_expander() -> ReferenceExpander {
    ReferenceExpander::new(Arc::new(MemoryResourceStore::new()))
}

fn color_fragment() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("background-color: #121212;".to_string()),
        Just("background-color:#000".to_string()),
        Just("background-color: #333333".to_string()),
        Just("color: #fff;".to_string()),
        Just("color:#E8EAED".to_string()),
        Just("color: #cccccc".to_string()),
        Just("border-color: #121212".to_string()),
        Just("color: #123456".to_string()),
        Just("background-color: #ffffff".to_string()),
        Just("color: #202124".to_string()),
        "[a-z <>=\"/;]{0,12}",
    ]
}

proptest! {
    #[test]
    fn reference_tokens_round_trip(id in "[A-Za-z0-9-]{1,40}") {
        let token = make_reference(&id);
        let found = find_references(&format!("<p>{token}</p>"));

        prop_assert_eq!(found.len(), 1);
        prop_assert_eq!(&found[0].resource_id, &id);
        prop_assert_eq!(&found[0].token, &token);
    }

    #[test]
    fn html_without_braces_is_never_touched(html in "[^{}]{0,200}") {
        let expansion = runtime().block_on(empty_expander().expand_with_report(&html));

        prop_assert_eq!(expansion.outcome, ExpansionOutcome::Unchanged);
        prop_assert_eq!(expansion.html, html);
    }

    #[test]
    fn unresolved_tokens_survive_byte_for_byte(
        parts in prop::collection::vec(
            prop_oneof!["[a-z <>/]{0,10}", "[A-Za-z0-9-]{1,12}".prop_map(|id| make_reference(&id))],
            1..12,
        )
    ) {
        let html: String = parts.concat();
        let out = runtime().block_on(empty_expander().expand(&html));

        prop_assert_eq!(out, html);
    }

    #[test]
    fn color_remap_is_idempotent(parts in prop::collection::vec(color_fragment(), 0..10)) {
        let html = parts.join(" ");
        let once = remap_colors(&html);

        prop_assert_eq!(remap_colors(&once), once.clone());
        prop_assert!(!once.to_ascii_lowercase().contains("background-color: #121212"));
    }
}
