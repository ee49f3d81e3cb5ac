// tests/property_js_minify.rs

use proptest::prelude::*;

use assetpipe::transform::js::minify;

/// Words the identifier strategy can produce that are not valid binding names.
const RESERVED: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete",
    "do", "else", "enum", "export", "extends", "false", "finally", "for", "function", "if",
    "import", "in", "new", "null", "return", "super", "switch", "this", "throw", "true", "try",
    "typeof", "var", "void", "while", "with",
];

#[derive(Debug, Clone)]
struct Statement {
    ident: String,
    value: u32,
    // Whitespace after `var`, around `=` and before `;`.
    spacing: [String; 4],
}

impl Statement {
    fn source(&self) -> String {
        let [after_var, before_eq, after_eq, before_semi] = &self.spacing;
        format!(
            "var{after_var}{}{before_eq}={after_eq}{}{before_semi};",
            self.ident, self.value
        )
    }

    fn minified(&self) -> String {
        format!("var {}={};", self.ident, self.value)
    }
}

fn statement_strategy() -> impl Strategy<Value = Statement> {
    (
        "[a-z_][a-z0-9_]{0,6}".prop_filter("reserved word", |id| !RESERVED.contains(&id.as_str())),
        // Small enough that no exponent form is ever shorter.
        0..100u32,
        "[ \t]{1,3}",
        "[ \t]{0,2}",
        "[ \t]{0,2}",
        "[ \t]{0,2}",
    )
        .prop_map(|(ident, value, a, b, c, d)| Statement {
            ident,
            value,
            spacing: [a, b, c, d],
        })
}

// Anything that may sit between two statements without changing them.
fn separator_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[ \t\n]{0,4}",
        "[a-z ]{0,12}".prop_map(|c| format!("/* {c} */")),
        "[a-z ]{0,12}".prop_map(|c| format!("// {c}\n")),
        "[a-z ]{0,12}".prop_map(|c| format!("\n/*\n {c}\n*/\n")),
    ]
}

proptest! {
    #[test]
    fn statements_survive_any_layout(
        parts in proptest::collection::vec((separator_strategy(), statement_strategy()), 1..12),
        trailing in separator_strategy(),
    ) {
        let mut src = String::new();
        let mut expected = String::new();
        for (sep, stmt) in &parts {
            src.push_str(sep);
            src.push_str(&stmt.source());
            expected.push_str(&stmt.minified());
        }
        src.push_str(&trailing);

        let out = minify(&src).unwrap();
        prop_assert_eq!(out, expected);
    }

    #[test]
    fn string_contents_are_untouched(content in "[a-z /*+-]{0,16}") {
        let src = format!("var s = '{content}' ;\n");
        let out = minify(&src).unwrap();
        // The quote style is the codegen's choice; the contents are not.
        prop_assert!(
            out == format!("var s='{content}';") || out == format!("var s=\"{content}\";"),
            "{}",
            out
        );
    }

    #[test]
    fn minifying_twice_changes_nothing(
        parts in proptest::collection::vec((separator_strategy(), statement_strategy()), 1..8),
    ) {
        let src: String = parts
            .iter()
            .map(|(sep, stmt)| format!("{sep}{}", stmt.source()))
            .collect();

        let once = minify(&src).unwrap();
        let twice = minify(&once).unwrap();
        prop_assert_eq!(once, twice);
    }
}
