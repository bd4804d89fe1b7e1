//! Browser query editor (YASGUI) page

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;

use crate::config::EndpointConfig;

/// Longer names first: alternation is leftmost-first
static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$(TITLE|DESCRIPTION|FAVICON|EXAMPLE_QUERIES|EXAMPLE_QUERY)").expect("valid regex")
});

const TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>$TITLE</title>
  <meta name="description" content="$DESCRIPTION">
  <link rel="icon" href="$FAVICON">
  <link href="https://unpkg.com/@triply/yasgui@4/build/yasgui.min.css" rel="stylesheet" type="text/css" />
  <script src="https://unpkg.com/@triply/yasgui@4/build/yasgui.min.js"></script>
</head>
<body>
  <div id="yasgui"></div>
  <script>
    Yasqe.defaults.value = $EXAMPLE_QUERY;
    const endpoint = window.location.href.split("?")[0];
    const yasgui = new Yasgui(document.getElementById("yasgui"), {
      requestConfig: { endpoint: endpoint, method: "POST" },
      copyEndpointOnNewTab: false,
    });
    const exampleQueries = $EXAMPLE_QUERIES;
    Object.entries(exampleQueries).forEach(([name, example]) => {
      yasgui.addTab(false, {
        ...Yasgui.Tab.getDefaults(),
        name: name,
        requestConfig: { endpoint: example.endpoint || endpoint, method: "POST" },
        yasqe: { value: example.query },
      });
    });
  </script>
</body>
</html>
"#;

/// Render the query editor page for this endpoint.
///
/// Placeholders are substituted in one pass, so configured values are never
/// rescanned for placeholders.
pub fn render(config: &EndpointConfig) -> String {
    PLACEHOLDER
        .replace_all(TEMPLATE, |caps: &Captures| match &caps[1] {
            "TITLE" => escape_html(&config.title),
            "DESCRIPTION" => escape_html(&config.description),
            "FAVICON" => escape_html(&config.favicon),
            "EXAMPLE_QUERY" => script_value(&config.example_query),
            "EXAMPLE_QUERIES" => script_value(&config.example_queries),
            other => format!("${}", other),
        })
        .into_owned()
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// JSON literal that cannot close the surrounding script element
fn script_value<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "null".to_string())
        .replace("</", "<\\/")
}
