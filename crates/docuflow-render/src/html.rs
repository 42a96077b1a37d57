//! Rendering of filled templates to HTML and plain text.
//!
//! A filled template is a JSON tree using the structural keys `title`,
//! `sections`, `section_title`, `content`, `clauses`, and `signature_block`.
//! The walk handles those keys in document order (serde_json maps are
//! key-sorted, so insertion order cannot be relied on) and renders any other
//! entries as simple key/value lines.

use serde_json::Value;

const HTML_HEAD: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<style>
@page {
    size: letter;
    margin: 1in;
}
body {
    font-family: 'Times New Roman', serif;
    font-size: 12pt;
    line-height: 1.5;
    color: #000;
}
h1 {
    text-align: center;
    font-size: 18pt;
    font-weight: bold;
    margin-bottom: 24pt;
    text-transform: uppercase;
}
h2 {
    font-size: 14pt;
    font-weight: bold;
    margin-top: 18pt;
    margin-bottom: 12pt;
}
h3 {
    font-size: 12pt;
    font-weight: bold;
    margin-top: 12pt;
    margin-bottom: 6pt;
}
p {
    margin-bottom: 6pt;
    text-align: justify;
}
.clause {
    margin-left: 0.5in;
    margin-bottom: 6pt;
}
.signature-block {
    margin-top: 48pt;
    page-break-inside: avoid;
}
</style>
</head>
<body>
"#;

const HTML_TAIL: &str = "</body>\n</html>\n";

/// Structural keys consumed by the walk; everything else renders generically.
const STRUCTURAL_KEYS: &[&str] = &[
    "title",
    "sections",
    "section_title",
    "content",
    "clauses",
    "signature_block",
];

/// Render a filled template to a standalone HTML document.
pub fn render_html(filled: &Value) -> String {
    let mut out = String::from(HTML_HEAD);
    walk_html(filled, 0, &mut out);
    out.push_str(HTML_TAIL);
    out
}

fn walk_html(data: &Value, level: usize, out: &mut String) {
    match data {
        Value::Object(map) => {
            if level == 0 {
                if let Some(title) = map.get("title").and_then(scalar_text) {
                    out.push_str(&format!("<h1>{}</h1>\n", escape_html(&title)));
                }
            }

            if let Some(section_title) = map.get("section_title").and_then(scalar_text) {
                let heading = (level + 1).min(3);
                out.push_str(&format!(
                    "<h{h}>{}</h{h}>\n",
                    escape_html(&section_title),
                    h = heading
                ));
            }

            if let Some(Value::Array(content)) = map.get("content") {
                for paragraph in content {
                    if let Some(text) = scalar_text(paragraph) {
                        out.push_str(&format!("<p>{}</p>\n", escape_html(&text)));
                    }
                }
            }

            if let Some(Value::Array(clauses)) = map.get("clauses") {
                for (i, clause) in clauses.iter().enumerate() {
                    if let Some(text) = scalar_text(clause) {
                        out.push_str(&format!(
                            "<p class=\"clause\">{}. {}</p>\n",
                            i + 1,
                            escape_html(&text)
                        ));
                    }
                }
            }

            if let Some(Value::Array(sections)) = map.get("sections") {
                for section in sections {
                    walk_html(section, level + 1, out);
                }
            }

            for (key, value) in map {
                if STRUCTURAL_KEYS.contains(&key.as_str()) {
                    continue;
                }
                match value {
                    Value::Object(_) | Value::Array(_) => walk_html(value, level + 1, out),
                    scalar => {
                        if let Some(text) = scalar_text(scalar) {
                            out.push_str(&format!(
                                "<p><strong>{}:</strong> {}</p>\n",
                                escape_html(key),
                                escape_html(&text)
                            ));
                        }
                    }
                }
            }

            if let Some(signature) = map.get("signature_block") {
                out.push_str("<div class=\"signature-block\">\n");
                walk_html(signature, level, out);
                out.push_str("</div>\n");
            }
        }
        Value::Array(items) => {
            for item in items {
                walk_html(item, level, out);
            }
        }
        scalar => {
            if let Some(text) = scalar_text(scalar) {
                out.push_str(&format!("<p>{}</p>\n", escape_html(&text)));
            }
        }
    }
}

/// Render a filled template to plain text, mirroring the HTML walk.
pub fn render_text(filled: &Value) -> String {
    let mut out = String::new();
    walk_text(filled, 0, &mut out);
    out
}

fn walk_text(data: &Value, level: usize, out: &mut String) {
    match data {
        Value::Object(map) => {
            if level == 0 {
                if let Some(title) = map.get("title").and_then(scalar_text) {
                    out.push_str(&title.to_uppercase());
                    out.push_str("\n\n");
                }
            }

            if let Some(section_title) = map.get("section_title").and_then(scalar_text) {
                out.push_str(&section_title);
                out.push_str("\n\n");
            }

            if let Some(Value::Array(content)) = map.get("content") {
                for paragraph in content {
                    if let Some(text) = scalar_text(paragraph) {
                        out.push_str(&text);
                        out.push_str("\n\n");
                    }
                }
            }

            if let Some(Value::Array(clauses)) = map.get("clauses") {
                for (i, clause) in clauses.iter().enumerate() {
                    if let Some(text) = scalar_text(clause) {
                        out.push_str(&format!("{}. {}\n\n", i + 1, text));
                    }
                }
            }

            if let Some(Value::Array(sections)) = map.get("sections") {
                for section in sections {
                    walk_text(section, level + 1, out);
                }
            }

            for (key, value) in map {
                if STRUCTURAL_KEYS.contains(&key.as_str()) {
                    continue;
                }
                match value {
                    Value::Object(_) | Value::Array(_) => walk_text(value, level + 1, out),
                    scalar => {
                        if let Some(text) = scalar_text(scalar) {
                            out.push_str(&format!("{}: {}\n", key, text));
                        }
                    }
                }
            }

            if let Some(signature) = map.get("signature_block") {
                out.push('\n');
                walk_text(signature, level, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk_text(item, level, out);
            }
        }
        scalar => {
            if let Some(text) = scalar_text(scalar) {
                out.push_str(&text);
                out.push_str("\n\n");
            }
        }
    }
}

/// Text of a scalar value; null and blank strings render nothing.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Escape HTML special characters.
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_filled() -> Value {
        json!({
            "title": "Employment Agreement",
            "sections": [
                {
                    "section_title": "PARTIES",
                    "content": [
                        "This Agreement is entered into between Acme Corp and Jane Doe.",
                        ""
                    ]
                },
                {
                    "section_title": "TERMS",
                    "clauses": [
                        "The Employee shall report to the CTO.",
                        "The salary is 85,000 CAD per year."
                    ]
                }
            ],
            "signature_block": {
                "employer_signature": "_________________",
                "employee_signature": "_________________"
            }
        })
    }

    #[test]
    fn test_render_html_title_and_sections() {
        let html = render_html(&sample_filled());
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<h1>Employment Agreement</h1>"));
        assert!(html.contains("<h2>PARTIES</h2>"));
        assert!(html.contains("<p>This Agreement is entered into between Acme Corp and Jane Doe.</p>"));
        assert!(html.ends_with("</body>\n</html>\n"));
    }

    #[test]
    fn test_render_html_numbers_clauses() {
        let html = render_html(&sample_filled());
        assert!(html.contains("<p class=\"clause\">1. The Employee shall report to the CTO.</p>"));
        assert!(html.contains("<p class=\"clause\">2. The salary is 85,000 CAD per year.</p>"));
    }

    #[test]
    fn test_render_html_signature_block() {
        let html = render_html(&sample_filled());
        assert!(html.contains("<div class=\"signature-block\">"));
        assert!(html.contains("<strong>employer_signature:</strong>"));
    }

    #[test]
    fn test_render_html_escapes_markup() {
        let filled = json!({
            "title": "A & B <Agreement>",
            "sections": [{"content": ["<script>alert('x')</script>"]}]
        });
        let html = render_html(&filled);
        assert!(html.contains("<h1>A &amp; B &lt;Agreement&gt;</h1>"));
        assert!(html.contains("&lt;script&gt;alert('x')&lt;/script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_render_html_skips_blank_content() {
        let html = render_html(&sample_filled());
        // The empty paragraph in PARTIES renders nothing.
        assert!(!html.contains("<p></p>"));
    }

    #[test]
    fn test_render_html_nested_section_heading_depth_caps_at_3() {
        let filled = json!({
            "sections": [{
                "sections": [{
                    "sections": [{
                        "section_title": "Deep"
                    }]
                }]
            }]
        });
        let html = render_html(&filled);
        assert!(html.contains("<h3>Deep</h3>"));
        assert!(!html.contains("<h4>"));
    }

    #[test]
    fn test_render_html_title_only_at_root() {
        let filled = json!({
            "sections": [{"title": "not a heading"}]
        });
        let html = render_html(&filled);
        assert!(!html.contains("<h1>"));
        // Nested "title" falls through to the generic key/value branch.
        assert!(html.contains("<strong>title:</strong> not a heading"));
    }

    #[test]
    fn test_render_html_scalar_root() {
        let html = render_html(&json!("Just text"));
        assert!(html.contains("<p>Just text</p>"));
    }

    #[test]
    fn test_render_text_mirrors_structure() {
        let text = render_text(&sample_filled());
        assert!(text.starts_with("EMPLOYMENT AGREEMENT\n"));
        assert!(text.contains("PARTIES\n"));
        assert!(text.contains("1. The Employee shall report to the CTO."));
        assert!(text.contains("employer_signature: _________________"));
        assert!(!text.contains('<'));
    }

    #[test]
    fn test_render_text_skips_nulls() {
        let text = render_text(&json!({"sections": [{"content": [null, "kept"]}]}));
        assert!(text.contains("kept"));
        assert!(!text.contains("null"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a & b"), "a &amp; b");
        assert_eq!(escape_html("<p>"), "&lt;p&gt;");
        assert_eq!(escape_html("say \"hi\""), "say &quot;hi&quot;");
        assert_eq!(escape_html("plain"), "plain");
    }
}
