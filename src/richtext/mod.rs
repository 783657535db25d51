//! Structured rich text as delivered by the CMS
//!
//! A rich-text field is an ordered list of typed nodes (paragraphs, headings,
//! list items, images, embeds). Inline formatting is expressed as spans over
//! the node text, with offsets counted in UTF-16 code units.
//!
//! [`as_text`] flattens a field to plain text (used for word counting) and
//! [`as_html`] serializes it to markup. The HTML is inserted into pages
//! verbatim: node text is escaped, but embed markup coming from the CMS is
//! trusted as-is and no sanitization happens here.

mod html;

use serde::Deserialize;

pub use html::as_html;

/// One block of a rich-text field
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RichTextNode {
    #[serde(rename = "type")]
    pub kind: NodeKind,

    #[serde(default)]
    pub text: Option<String>,

    #[serde(default)]
    pub spans: Vec<Span>,

    /// Image source
    #[serde(default)]
    pub url: Option<String>,

    /// Image alternative text
    #[serde(default)]
    pub alt: Option<String>,

    #[serde(default)]
    pub oembed: Option<Embed>,
}

impl RichTextNode {
    /// Create a text-bearing node without spans
    pub fn text(kind: NodeKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: Some(text.into()),
            spans: Vec::new(),
            url: None,
            alt: None,
            oembed: None,
        }
    }

    /// Create a paragraph node
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::text(NodeKind::Paragraph, text)
    }
}

/// Node types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum NodeKind {
    #[serde(rename = "heading1")]
    Heading1,
    #[serde(rename = "heading2")]
    Heading2,
    #[serde(rename = "heading3")]
    Heading3,
    #[serde(rename = "heading4")]
    Heading4,
    #[serde(rename = "heading5")]
    Heading5,
    #[serde(rename = "heading6")]
    Heading6,
    #[serde(rename = "paragraph")]
    Paragraph,
    #[serde(rename = "preformatted")]
    Preformatted,
    #[serde(rename = "list-item")]
    ListItem,
    #[serde(rename = "o-list-item")]
    OListItem,
    #[serde(rename = "image")]
    Image,
    #[serde(rename = "embed")]
    Embed,
    #[serde(other)]
    Unknown,
}

impl NodeKind {
    /// Heading level, if this is a heading
    pub fn heading_level(self) -> Option<u8> {
        match self {
            NodeKind::Heading1 => Some(1),
            NodeKind::Heading2 => Some(2),
            NodeKind::Heading3 => Some(3),
            NodeKind::Heading4 => Some(4),
            NodeKind::Heading5 => Some(5),
            NodeKind::Heading6 => Some(6),
            _ => None,
        }
    }
}

/// Inline formatting over `[start, end)` of the node text
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: SpanKind,
    #[serde(default)]
    pub data: Option<SpanData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    Strong,
    Em,
    Hyperlink,
    Label,
    #[serde(other)]
    Unknown,
}

/// Hyperlink target or label name
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct SpanData {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    /// Linked document, for links to other posts
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

/// oEmbed payload of an embed node
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Embed {
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub embed_url: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub provider_name: Option<String>,
}

/// Plain text of a rich-text field, blocks joined by a single space
pub fn as_text(nodes: &[RichTextNode]) -> String {
    nodes
        .iter()
        .filter_map(|node| node.text.as_deref())
        .collect::<Vec<_>>()
        .join(" ")
}
