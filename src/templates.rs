//! HTML templates and styling for the shelf.
//!
//! Server-rendered, one page: sidebar with the taxonomy facets, paper list,
//! add form. Facet elements carry `data-axis`/`data-value` attributes and a
//! single delegated listener posts the selection mutation back.

use crate::models::{LabelCount, Paper, ShelfView};
use pulldown_cmark::Parser;

// ============================================================================
// CSS Styles
// ============================================================================

pub const STYLE: &str = r#"
/* Solarized Light Theme */
:root {
    --base01: #586e75;
    --base00: #657b83;
    --base1: #93a1a1;
    --base2: #eee8d5;
    --base3: #fdf6e3;
    --blue: #268bd2;
    --cyan: #2aa198;
    --red: #dc322f;

    --bg: var(--base3);
    --fg: var(--base00);
    --muted: var(--base1);
    --border: var(--base2);
    --link: var(--blue);
    --link-hover: var(--cyan);
    --accent: var(--base2);
    --paper-bg: #f5ecd5;
}

* { box-sizing: border-box; margin: 0; padding: 0; }

body {
    font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, "Helvetica Neue", Arial, sans-serif;
    line-height: 1.6;
    color: var(--fg);
    background: var(--bg);
}

.container {
    max-width: 1100px;
    margin: 0 auto;
    padding: 1rem;
    display: flex;
    gap: 2rem;
    align-items: flex-start;
}

a { color: var(--link); text-decoration: none; }
a:hover { color: var(--link-hover); text-decoration: underline; }

h1, h2, h3 { font-weight: 600; margin-bottom: 0.5rem; }
h1 { font-size: 1.4rem; }
h3 { font-size: 0.85rem; text-transform: uppercase; letter-spacing: 0.05em; color: var(--base01); margin-top: 1.25rem; }

.nav-bar {
    position: sticky;
    top: 0;
    background: var(--bg);
    border-bottom: 1px solid var(--border);
    padding: 0.5rem 1rem;
    display: flex;
    gap: 1rem;
    align-items: center;
    z-index: 100;
}
.nav-bar .spacer { flex: 1; }

.search-box input {
    padding: 0.4rem 0.75rem;
    border: 1px solid var(--border);
    border-radius: 4px;
    background: var(--bg);
    color: var(--fg);
    font-size: 0.9rem;
    width: 220px;
}

.sidebar { width: 230px; flex-shrink: 0; font-size: 0.9rem; }
.sidebar ul { list-style: none; }
.sidebar li { padding: 0.15rem 0; }
.sidebar .facet { cursor: pointer; }
.sidebar .facet.active { font-weight: 600; color: var(--base01); }
.sidebar .count { color: var(--muted); font-size: 0.8rem; margin-left: 0.3rem; }
.sidebar .sub { margin-left: 1rem; }

.content { flex: 1; min-width: 0; }

.paper-list { list-style: none; }
.paper-item {
    background: var(--paper-bg);
    border: 1px solid var(--border);
    border-radius: 6px;
    padding: 0.75rem 1rem;
    margin-bottom: 0.75rem;
}
.paper-item .title { font-size: 1.05rem; font-weight: 600; }
.paper-item .authors { font-size: 0.85rem; color: var(--base01); }
.paper-item .meta { font-size: 0.8rem; color: var(--muted); }
.paper-item .summary { font-size: 0.9rem; margin-top: 0.4rem; }
.paper-item .delete { float: right; color: var(--red); background: none; border: none; cursor: pointer; font-size: 0.8rem; }

.badge {
    font-size: 0.65rem;
    padding: 0.1rem 0.4rem;
    background: var(--accent);
    border-radius: 3px;
    text-transform: uppercase;
    letter-spacing: 0.05em;
    margin-right: 0.3rem;
    cursor: pointer;
}

.add-form {
    border: 1px solid var(--border);
    border-radius: 6px;
    padding: 0.75rem 1rem;
    margin-bottom: 1rem;
    display: flex;
    gap: 0.5rem;
    align-items: center;
    flex-wrap: wrap;
}
.add-form input[type=url] {
    flex: 1;
    min-width: 240px;
    padding: 0.4rem 0.75rem;
    border: 1px solid var(--border);
    border-radius: 4px;
    background: var(--bg);
}
.add-form button {
    padding: 0.4rem 0.75rem;
    border: 1px solid var(--border);
    border-radius: 4px;
    background: var(--accent);
    cursor: pointer;
}
.add-form .status { width: 100%; font-size: 0.85rem; color: var(--base01); }
.add-form .status.error { color: var(--red); }
"#;

// ============================================================================
// JavaScript
// ============================================================================

const SCRIPT: &str = r#"
async function setSelection(axis, value) {
    await fetch('/api/selection', {
        method: 'POST',
        headers: {'Content-Type': 'application/json'},
        body: JSON.stringify({axis: axis, value: value})
    });
    location.reload();
}

document.addEventListener('click', function(e) {
    const facet = e.target.closest('[data-axis]');
    if (!facet) return;
    e.preventDefault();
    const value = facet.dataset.value === '' ? null : facet.dataset.value;
    setSelection(facet.dataset.axis, value);
});

document.getElementById('search-input').addEventListener('keydown', function(e) {
    if (e.key === 'Enter') setSelection('search', this.value);
});

async function addPaper(e) {
    e.preventDefault();
    const status = document.getElementById('add-status');
    const input = document.getElementById('add-url');
    status.textContent = 'Analyzing…';
    status.className = 'status';
    const res = await fetch('/api/papers', {
        method: 'POST',
        headers: {'Content-Type': 'application/json'},
        body: JSON.stringify({url: input.value})
    });
    const body = await res.json();
    if (body.error) {
        /* keep the submitted URL in place: duplicates and other expected
           failures must not erase user input */
        status.textContent = body.error;
        status.className = 'status error';
    } else {
        location.reload();
    }
}

async function uploadPaper(e) {
    const status = document.getElementById('add-status');
    status.textContent = 'Analyzing document…';
    status.className = 'status';
    const data = new FormData();
    data.append('file', e.target.files[0]);
    const res = await fetch('/api/papers/upload', {method: 'POST', body: data});
    const body = await res.json();
    if (body.error) {
        status.textContent = body.error;
        status.className = 'status error';
    } else {
        location.reload();
    }
}

async function deletePaper(id) {
    if (!confirm('Remove this paper from the shelf?')) return;
    await fetch('/api/paper/' + id, {method: 'DELETE'});
    location.reload();
}
"#;

// ============================================================================
// Text Escaping & Markdown
// ============================================================================

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Render a summary as sanitized HTML. Analyzer summaries are untrusted
/// text that often contains markdown.
pub fn render_markdown(content: &str) -> String {
    let parser = Parser::new(content);
    let mut html_output = String::new();
    pulldown_cmark::html::push_html(&mut html_output, parser);
    ammonia::clean(&html_output)
}

// ============================================================================
// Page Assembly
// ============================================================================

pub fn base_html(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>{style}</style>
</head>
<body>
{body}
<script>{script}</script>
</body>
</html>"#,
        title = html_escape(title),
        style = STYLE,
        body = body,
        script = SCRIPT,
    )
}

fn facet_list(entries: &[LabelCount], axis: &str, active: Option<&str>, class: &str) -> String {
    let mut html = String::from("<ul>");
    for entry in entries {
        let is_active = active == Some(entry.label.as_str());
        html.push_str(&format!(
            r##"<li class="{class}"><a href="#" class="facet{active}" data-axis="{axis}" data-value="{value}">{label}</a><span class="count">{count}</span></li>"##,
            class = class,
            active = if is_active { " active" } else { "" },
            axis = axis,
            value = html_escape(&entry.label),
            label = html_escape(&entry.label),
            count = entry.count,
        ));
    }
    html.push_str("</ul>");
    html
}

fn render_sidebar(view: &ShelfView) -> String {
    let mut html = String::from(r#"<aside class="sidebar">"#);

    let all_active = if view.selection.topic.is_none() && view.selection.tag.is_none() {
        " active"
    } else {
        ""
    };
    html.push_str(&format!(
        r##"<h3>Topics</h3><ul><li><a href="#" class="facet{}" data-axis="topic" data-value="">All papers</a><span class="count">{}</span></li></ul>"##,
        all_active, view.total,
    ));
    html.push_str(&facet_list(
        &view.topic_counts,
        "topic",
        view.selection.topic.as_deref(),
        "",
    ));

    if !view.sub_topic_counts.is_empty() {
        html.push_str("<h3>Sub-topics</h3>");
        html.push_str(&facet_list(
            &view.sub_topic_counts,
            "subTopic",
            view.selection.sub_topic.as_deref(),
            "sub",
        ));
    }

    if !view.tag_counts.is_empty() {
        html.push_str("<h3>Tags</h3>");
        html.push_str(&facet_list(
            &view.tag_counts,
            "tag",
            view.selection.tag.as_deref(),
            "",
        ));
    }

    html.push_str("</aside>");
    html
}

fn render_paper(paper: &Paper) -> String {
    let title = if paper.url.is_empty() {
        html_escape(&paper.title)
    } else {
        format!(
            r#"<a href="{}" target="_blank" rel="noopener">{}</a>"#,
            html_escape(&paper.url),
            html_escape(&paper.title)
        )
    };

    let mut badges = format!(
        r#"<span class="badge" data-axis="topic" data-value="{0}">{0}</span>"#,
        html_escape(&paper.topic)
    );
    if let Some(sub) = &paper.sub_topic {
        badges.push_str(&format!(
            r#"<span class="badge">{}</span>"#,
            html_escape(sub)
        ));
    }
    for tag in &paper.tags {
        badges.push_str(&format!(
            r#"<span class="badge" data-axis="tag" data-value="{0}">{0}</span>"#,
            html_escape(tag)
        ));
    }

    let mut meta = Vec::new();
    if let Some(journal) = &paper.journal {
        meta.push(html_escape(journal));
    }
    if let Some(date) = &paper.publish_date {
        meta.push(html_escape(date));
    }
    meta.push(paper.added_at.format("added %Y-%m-%d").to_string());

    format!(
        r#"<li class="paper-item">
    <button class="delete" onclick="deletePaper('{id}')">remove</button>
    <div class="title">{title}</div>
    <div class="authors">{authors}</div>
    <div>{badges}</div>
    <div class="meta">{meta}</div>
    <div class="summary">{summary}</div>
</li>"#,
        id = html_escape(&paper.id),
        title = title,
        authors = html_escape(&paper.authors.join(", ")),
        badges = badges,
        meta = meta.join(" · "),
        summary = render_markdown(&paper.summary),
    )
}

pub fn render_shelf(view: &ShelfView) -> String {
    let mut content = String::from(r#"<main class="content">"#);

    content.push_str(
        r#"<form class="add-form" onsubmit="addPaper(event)">
    <input type="url" id="add-url" placeholder="Paste a paper link to add it" required>
    <button type="submit">Add paper</button>
    <label class="badge" for="add-file">or upload a document</label>
    <input type="file" id="add-file" hidden onchange="uploadPaper(event)">
    <div class="status" id="add-status"></div>
</form>"#,
    );

    if view.papers.is_empty() {
        content.push_str("<p>No papers match the current filters.</p>");
    } else {
        content.push_str(r#"<ul class="paper-list">"#);
        for paper in &view.papers {
            content.push_str(&render_paper(paper));
        }
        content.push_str("</ul>");
    }
    content.push_str("</main>");

    let nav = format!(
        r#"<div class="nav-bar">
    <h1>Papershelf</h1>
    <span class="spacer"></span>
    <span class="search-box"><input id="search-input" type="search" placeholder="Search title, authors, tags&hellip;" value="{}"></span>
</div>"#,
        html_escape(&view.selection.search),
    );

    let body = format!(
        r#"{nav}<div class="container">{sidebar}{content}</div>"#,
        nav = nav,
        sidebar = render_sidebar(view),
        content = content,
    );

    base_html("Papershelf", &body)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"<b>"A & B"</b>"#),
            "&lt;b&gt;&quot;A &amp; B&quot;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_render_markdown_sanitizes_html() {
        let rendered = render_markdown("A *summary* <script>alert(1)</script>");
        assert!(rendered.contains("<em>summary</em>"));
        assert!(!rendered.contains("<script>"));
    }
}
