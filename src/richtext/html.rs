//! HTML serialization of rich text

use super::{NodeKind, RichTextNode, Span, SpanKind};
use crate::helpers::{html_escape, post_path};

/// Serialize a rich-text field to HTML
///
/// Consecutive list items are grouped into a single `<ul>` / `<ol>`.
pub fn as_html(nodes: &[RichTextNode]) -> String {
    let mut out = String::new();
    let mut open_list: Option<NodeKind> = None;

    for node in nodes {
        let list = matches!(node.kind, NodeKind::ListItem | NodeKind::OListItem);

        if open_list.is_some() && (!list || open_list != Some(node.kind)) {
            out.push_str(list_close(open_list));
            open_list = None;
        }
        if list && open_list.is_none() {
            out.push_str(if node.kind == NodeKind::ListItem {
                "<ul>"
            } else {
                "<ol>"
            });
            open_list = Some(node.kind);
        }

        out.push_str(&serialize_node(node));
    }

    if open_list.is_some() {
        out.push_str(list_close(open_list));
    }

    out
}

fn list_close(kind: Option<NodeKind>) -> &'static str {
    match kind {
        Some(NodeKind::OListItem) => "</ol>",
        _ => "</ul>",
    }
}

fn serialize_node(node: &RichTextNode) -> String {
    let inner = || serialize_spans(node.text.as_deref().unwrap_or(""), &node.spans);

    if let Some(level) = node.kind.heading_level() {
        return format!("<h{level}>{}</h{level}>", inner());
    }

    match node.kind {
        NodeKind::Paragraph => format!("<p>{}</p>", inner()),
        NodeKind::Preformatted => format!("<pre>{}</pre>", inner()),
        NodeKind::ListItem | NodeKind::OListItem => format!("<li>{}</li>", inner()),
        NodeKind::Image => match &node.url {
            Some(url) => format!(
                r#"<p class="block-img"><img src="{}" alt="{}" /></p>"#,
                html_escape(url),
                html_escape(node.alt.as_deref().unwrap_or(""))
            ),
            None => String::new(),
        },
        NodeKind::Embed => match &node.oembed {
            Some(embed) => format!(
                r#"<div data-oembed="{}" data-oembed-type="{}" data-oembed-provider="{}">{}</div>"#,
                html_escape(embed.embed_url.as_deref().unwrap_or("")),
                html_escape(embed.kind.as_deref().unwrap_or("")),
                html_escape(embed.provider_name.as_deref().unwrap_or("")),
                embed.html.as_deref().unwrap_or("")
            ),
            None => String::new(),
        },
        _ => match &node.text {
            Some(_) => format!("<p>{}</p>", inner()),
            None => String::new(),
        },
        // headings are handled above
    }
}

/// Apply spans to `text`, cutting it at every span boundary
///
/// Each segment is wrapped in the spans covering it, outermost first, so the
/// result is always well nested even when spans overlap.
fn serialize_spans(text: &str, spans: &[Span]) -> String {
    if spans.is_empty() {
        return escape_text(text);
    }

    let ranges: Vec<(usize, usize, &Span)> = spans
        .iter()
        .map(|span| {
            let start = utf16_to_byte(text, span.start);
            let end = utf16_to_byte(text, span.end.max(span.start));
            (start, end, span)
        })
        .filter(|(start, end, _)| start < end)
        .collect();

    let mut bounds: Vec<usize> = vec![0, text.len()];
    for (start, end, _) in &ranges {
        bounds.push(*start);
        bounds.push(*end);
    }
    bounds.sort_unstable();
    bounds.dedup();

    let mut out = String::new();
    for window in bounds.windows(2) {
        let (from, to) = (window[0], window[1]);
        let mut active: Vec<&(usize, usize, &Span)> = ranges
            .iter()
            .filter(|(start, end, _)| *start <= from && *end >= to)
            .collect();
        active.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

        let mut segment = escape_text(&text[from..to]);
        for (_, _, span) in active.iter().rev() {
            segment = wrap_span(span, segment);
        }
        out.push_str(&segment);
    }

    out
}

fn wrap_span(span: &Span, inner: String) -> String {
    match span.kind {
        SpanKind::Strong => format!("<strong>{}</strong>", inner),
        SpanKind::Em => format!("<em>{}</em>", inner),
        SpanKind::Hyperlink => {
            let data = span.data.clone().unwrap_or_default();
            let href = data
                .url
                .or_else(|| data.uid.as_deref().map(post_path))
                .unwrap_or_default();
            match data.target {
                Some(target) => format!(
                    r#"<a href="{}" target="{}" rel="noopener noreferrer">{}</a>"#,
                    html_escape(&href),
                    html_escape(&target),
                    inner
                ),
                None => format!(r#"<a href="{}">{}</a>"#, html_escape(&href), inner),
            }
        }
        SpanKind::Label => {
            let label = span
                .data
                .as_ref()
                .and_then(|d| d.label.as_deref())
                .unwrap_or("");
            format!(r#"<span class="{}">{}</span>"#, html_escape(label), inner)
        }
        SpanKind::Unknown => inner,
    }
}

fn escape_text(text: &str) -> String {
    html_escape(text).replace('\n', "<br />")
}

/// Byte offset of the UTF-16 code unit `offset`, clamped to the text
fn utf16_to_byte(text: &str, offset: usize) -> usize {
    let mut units = 0;
    for (byte, ch) in text.char_indices() {
        if units >= offset {
            return byte;
        }
        units += ch.len_utf16();
    }
    text.len()
}
