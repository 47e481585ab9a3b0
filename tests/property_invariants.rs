use cobie_graph::SheetKind;
use cobie_graph::uri::{entity_uri, url_safe};
use oxigraph::model::NamedNode;
use percent_encoding::percent_decode_str;
use proptest::prelude::*;

proptest! {
    #[test]
    fn url_safe_is_deterministic(name in ".*") {
        prop_assert_eq!(url_safe(&name), url_safe(&name));
    }

    #[test]
    fn url_safe_stays_within_one_segment(name in ".*") {
        let token = url_safe(&name);
        prop_assert!(token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"-._~%".contains(&b)));
        prop_assert!(!token.contains('/'));
    }

    #[test]
    fn url_safe_decodes_to_lowercased_name(name in "\\PC*") {
        let decoded = percent_decode_str(&url_safe(&name)).decode_utf8().unwrap().into_owned();
        prop_assert_eq!(decoded, name.to_lowercase());
    }

    #[test]
    fn case_variants_collide(name in "[A-Za-z0-9 ]{1,24}") {
        prop_assert_eq!(url_safe(&name.to_uppercase()), url_safe(&name.to_lowercase()));
    }

    #[test]
    fn entity_uris_are_valid_iris(name in "\\PC{1,40}") {
        let uri = entity_uri("https://example.com/hq", SheetKind::Space, &name);
        prop_assert!(NamedNode::new(&uri).is_ok(), "{}", uri);
    }
}
