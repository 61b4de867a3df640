//! HTML rendering for the note list page.
//!
//! # Invariants
//! - Note text is HTML-escaped; nothing submitted by clients is emitted raw.
//! - Items appear in the order given, which callers keep newest first.

use notebox_core::Note;

pub const STYLESHEET: &str = include_str!("assets/style.css");
pub const EMPTY_PLACEHOLDER: &str = "No notes yet!";

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Notes App</title>
    <link rel="stylesheet" href="/static/style.css">
</head>
<body>
    <div class="container">
        <h1>Notes</h1>
        <form method="POST" action="/add">
            <input type="text" name="text" placeholder="Write a note..." required>
            <button type="submit">Add</button>
        </form>
        <ul>
"#;

const PAGE_TAIL: &str = r#"        </ul>
    </div>
</body>
</html>
"#;

/// Renders the index page listing `notes`.
pub fn index_page(notes: &[Note]) -> String {
    let mut page = String::with_capacity(PAGE_HEAD.len() + PAGE_TAIL.len() + notes.len() * 64);
    page.push_str(PAGE_HEAD);
    if notes.is_empty() {
        page.push_str("            <li class=\"empty\">");
        page.push_str(EMPTY_PLACEHOLDER);
        page.push_str("</li>\n");
    }
    for note in notes {
        page.push_str("            <li data-id=\"");
        page.push_str(&note.id.to_string());
        page.push_str("\">");
        page.push_str(&escape_html(&note.text));
        page.push_str("</li>\n");
    }
    page.push_str(PAGE_TAIL);
    page
}

pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
