use proptest::prelude::*;

use treelight::syntax::{render_captures, Capture};
use treelight::theme::BUILTIN_THEMES;
use treelight::{escape_html, ThemeDefinition};

// Strategy for source text heavy in characters that need escaping
fn source_strategy() -> impl Strategy<Value = String> {
    "[a-z <>&\"'é\n]{0,48}"
}

// Strategy for capture names, including hidden and dotted ones
fn name_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("keyword".to_string()),
        Just("keyword.error".to_string()),
        Just("string".to_string()),
        Just("variable.parameter".to_string()),
        Just("_private".to_string()),
    ]
}

// Offsets may run past the end or land inside a multi-byte char
fn captures_strategy() -> impl Strategy<Value = Vec<Capture>> {
    prop::collection::vec((name_strategy(), 0usize..56, 0usize..56), 0..12).prop_map(|raw| {
        raw.into_iter()
            .map(|(name, a, b)| Capture::new(&name, a.min(b), a.max(b)))
            .collect()
    })
}

fn theme_strategy() -> impl Strategy<Value = ThemeDefinition> {
    (0..BUILTIN_THEMES.len()).prop_map(|idx| {
        ThemeDefinition::from_yaml(BUILTIN_THEMES[idx].yaml).expect("built-in theme parses")
    })
}

/// Drop every tag, leaving only text content
fn strip_tags(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }
    text
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

proptest! {
    #[test]
    fn test_text_is_escaped_and_preserved(
        source in source_strategy(),
        captures in captures_strategy(),
        theme in theme_strategy(),
    ) {
        let html = render_captures(&source, &captures, &theme);
        let text = strip_tags(&html);

        prop_assert!(!text.contains(['<', '>', '"', '\'']));
        prop_assert_eq!(unescape(&text), source);
    }

    #[test]
    fn test_spans_are_balanced(
        source in source_strategy(),
        captures in captures_strategy(),
        theme in theme_strategy(),
    ) {
        let html = render_captures(&source, &captures, &theme);
        let mut depth: i64 = 0;
        let mut rest = html.as_str();
        while let Some(pos) = rest.find('<') {
            rest = &rest[pos..];
            if rest.starts_with("</span>") {
                depth -= 1;
            } else {
                prop_assert!(rest.starts_with("<span class=\""));
                depth += 1;
            }
            prop_assert!(depth >= 0);
            rest = &rest[1..];
        }
        prop_assert_eq!(depth, 0);
    }

    #[test]
    fn test_no_captures_is_escaped_source(
        source in source_strategy(),
        theme in theme_strategy(),
    ) {
        let html = render_captures(&source, &[], &theme);
        prop_assert!(!html.contains("<span"));
        prop_assert_eq!(html, escape_html(&source));
    }
}
