//! Code-language inference
//!
//! The workspace accepts a fixed language vocabulary on code blocks.
//! Languages are inferred from `data-language` attributes or `language-*`
//! classes; anything outside the vocabulary downgrades to "plain text".

use scraper::ElementRef;

/// Languages the workspace accepts on code blocks
const LANGUAGES: &[&str] = &[
    "abap",
    "bash",
    "c",
    "c#",
    "c++",
    "clojure",
    "css",
    "dart",
    "diff",
    "docker",
    "elixir",
    "erlang",
    "f#",
    "go",
    "graphql",
    "groovy",
    "haskell",
    "html",
    "java",
    "javascript",
    "json",
    "kotlin",
    "latex",
    "less",
    "lua",
    "makefile",
    "markdown",
    "matlab",
    "mermaid",
    "objective-c",
    "ocaml",
    "pascal",
    "perl",
    "php",
    "plain text",
    "powershell",
    "protobuf",
    "python",
    "r",
    "ruby",
    "rust",
    "sass",
    "scala",
    "scheme",
    "scss",
    "shell",
    "sql",
    "swift",
    "typescript",
    "vb.net",
    "xml",
    "yaml",
];

/// Normalize a raw language tag into the workspace vocabulary
///
/// Aliases map onto their canonical entry; unknown tags fall back to
/// "plain text".
#[must_use]
pub fn normalize_language(raw: &str) -> String {
    let lower = raw.trim().to_ascii_lowercase();
    let canonical = match lower.as_str() {
        "js" | "jsx" | "node" | "nodejs" => "javascript",
        "ts" | "tsx" => "typescript",
        "py" | "python3" => "python",
        "sh" | "zsh" | "console" | "terminal" => "shell",
        "shell-session" | "shellsession" => "shell",
        "yml" => "yaml",
        "csharp" | "cs" => "c#",
        "cpp" | "cxx" => "c++",
        "objc" => "objective-c",
        "dockerfile" => "docker",
        "golang" => "go",
        "plaintext" | "text" | "txt" | "none" | "" => "plain text",
        "htm" | "xhtml" => "html",
        "postgres" | "postgresql" | "mysql" | "plsql" => "sql",
        other => other,
    };
    if LANGUAGES.contains(&canonical) {
        canonical.to_owned()
    } else {
        "plain text".to_owned()
    }
}

/// Infer the language of a code element
///
/// Checks `data-language` on the element, then `language-*` / `lang-*`
/// classes on the element and its first `code` child.
#[must_use]
pub fn infer_language(element: ElementRef<'_>) -> String {
    if let Some(attr) = element.value().attr("data-language") {
        return normalize_language(attr);
    }
    if let Some(lang) = language_class(element) {
        return lang;
    }
    for child in element.child_elements() {
        if child.value().name() == "code" {
            if let Some(attr) = child.value().attr("data-language") {
                return normalize_language(attr);
            }
            if let Some(lang) = language_class(child) {
                return lang;
            }
        }
    }
    "plain text".to_owned()
}

fn language_class(element: ElementRef<'_>) -> Option<String> {
    let classes = element.value().attr("class")?;
    for token in classes.split_whitespace() {
        if let Some(lang) = token
            .strip_prefix("language-")
            .or_else(|| token.strip_prefix("lang-"))
        {
            return Some(normalize_language(lang));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    #[test]
    fn aliases_normalize() {
        assert_eq!(normalize_language("js"), "javascript");
        assert_eq!(normalize_language("Sh"), "shell");
        assert_eq!(normalize_language("PY"), "python");
        assert_eq!(normalize_language("yml"), "yaml");
    }

    #[test]
    fn unknown_language_downgrades() {
        assert_eq!(normalize_language("klingon"), "plain text");
        assert_eq!(normalize_language(""), "plain text");
    }

    #[test]
    fn infers_from_attr_and_class() {
        let document = Html::parse_document(
            r#"<body><pre id="a" data-language="rust">x</pre>
               <pre id="b"><code class="language-python">y</code></pre>
               <pre id="c">z</pre></body>"#,
        );
        let sel = |css: &str| {
            let s = Selector::parse(css).expect("selector");
            document.select(&s).next().expect("element")
        };
        assert_eq!(infer_language(sel("#a")), "rust");
        assert_eq!(infer_language(sel("#b")), "python");
        assert_eq!(infer_language(sel("#c")), "plain text");
    }
}
