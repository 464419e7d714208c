//! YAML node tree that keeps scalar source text.
//!
//! Scalars are stored exactly as written (`1.10` stays `1.10`, `0x1F` stays
//! `0x1F`) together with their quoting style, so comparisons see what the
//! author wrote and documents can be written back without being retyped.
//! Tags are kept; anchors are expanded at their aliases; comments are not
//! retained.

use crate::error::DocumentError;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt::Write as _;
use yaml_rust2::parser::{Event, EventReceiver, Parser};
use yaml_rust2::scanner::TScalarStyle;

/// How a scalar was quoted in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarStyle {
    Plain,
    SingleQuoted,
    DoubleQuoted,
    Literal,
    Folded,
}

impl ScalarStyle {
    fn from_event(style: TScalarStyle) -> Self {
        match style {
            TScalarStyle::Plain => ScalarStyle::Plain,
            TScalarStyle::SingleQuoted => ScalarStyle::SingleQuoted,
            TScalarStyle::DoubleQuoted => ScalarStyle::DoubleQuoted,
            TScalarStyle::Literal => ScalarStyle::Literal,
            _ => ScalarStyle::Folded,
        }
    }
}

/// One node of a YAML document.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Scalar {
        text: String,
        style: ScalarStyle,
        tag: Option<String>,
    },
    Sequence {
        items: Vec<Node>,
        tag: Option<String>,
    },
    Mapping {
        entries: Vec<(Node, Node)>,
        tag: Option<String>,
    },
}

impl Node {
    /// Parse every document of a YAML stream.
    pub fn parse_stream(content: &str) -> Result<Vec<Node>, DocumentError> {
        let mut builder = TreeBuilder::default();
        let mut parser = Parser::new_from_str(content);
        parser
            .load(&mut builder, true)
            .map_err(|err| DocumentError::Syntax(err.to_string()))?;
        match builder.error {
            Some(message) => Err(DocumentError::Syntax(message)),
            None => Ok(builder.documents),
        }
    }

    /// Parse the first non-null document of `content`.
    pub fn parse(content: &str) -> Result<Node, DocumentError> {
        Self::parse_stream(content)?
            .into_iter()
            .find(|doc| !doc.is_null())
            .ok_or(DocumentError::Empty)
    }

    /// A string scalar, quoted only when plain text would read as another type.
    pub fn string(text: impl Into<String>) -> Self {
        let text = text.into();
        let style = if is_plain_safe(&text) {
            ScalarStyle::Plain
        } else {
            ScalarStyle::DoubleQuoted
        };
        Node::Scalar {
            text,
            style,
            tag: None,
        }
    }

    pub fn null() -> Self {
        Node::Scalar {
            text: "null".to_string(),
            style: ScalarStyle::Plain,
            tag: None,
        }
    }

    /// A mapping with string keys, in the given order.
    pub fn mapping<K: Into<String>>(entries: impl IntoIterator<Item = (K, Node)>) -> Self {
        Node::Mapping {
            entries: entries
                .into_iter()
                .map(|(key, value)| (Node::string(key), value))
                .collect(),
            tag: None,
        }
    }

    pub fn sequence(items: Vec<Node>) -> Self {
        Node::Sequence { items, tag: None }
    }

    /// Value stored under a scalar key of a mapping.
    pub fn get(&self, key: &str) -> Option<&Node> {
        match self {
            Node::Mapping { entries, .. } => entries
                .iter()
                .find(|(k, _)| k.as_str() == Some(key))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Text of a non-null scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::Scalar { text, .. } if !self.is_null() => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Node]> {
        match self {
            Node::Sequence { items, .. } => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&[(Node, Node)]> {
        match self {
            Node::Mapping { entries, .. } => Some(entries),
            _ => None,
        }
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self, Node::Mapping { .. })
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Node::Scalar { .. })
    }

    /// An untagged plain scalar spelled as YAML null.
    pub fn is_null(&self) -> bool {
        matches!(
            self,
            Node::Scalar { text, style: ScalarStyle::Plain, tag: None }
                if matches!(text.as_str(), "" | "~" | "null" | "Null" | "NULL")
        )
    }

    /// Null, or a collection without entries.
    pub fn is_empty(&self) -> bool {
        match self {
            Node::Mapping { entries, .. } => entries.is_empty(),
            Node::Sequence { items, .. } => items.is_empty(),
            Node::Scalar { .. } => self.is_null(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Node::Scalar { .. } => "scalar",
            Node::Sequence { .. } => "sequence",
            Node::Mapping { .. } => "mapping",
        }
    }

    /// Decode the node into a serde type.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, serde_yaml::Error> {
        serde_yaml::from_str(&self.to_yaml())
    }

    /// Render the node as a block-style YAML document.
    pub fn to_yaml(&self) -> String {
        let mut out = String::new();
        match self {
            Node::Mapping { entries, tag } if !entries.is_empty() => {
                if let Some(tag) = tag {
                    out.push_str(tag);
                    out.push('\n');
                }
                write_mapping(&mut out, entries, 0);
            }
            Node::Sequence { items, tag } if !items.is_empty() => {
                if let Some(tag) = tag {
                    out.push_str(tag);
                    out.push('\n');
                }
                write_sequence(&mut out, items, 0);
            }
            other => {
                out.push_str(&flow_text(other, false));
                out.push('\n');
            }
        }
        out
    }
}

#[derive(Default)]
struct TreeBuilder {
    stack: Vec<Frame>,
    documents: Vec<Node>,
    anchors: HashMap<usize, Node>,
    error: Option<String>,
}

enum Frame {
    Sequence {
        items: Vec<Node>,
        tag: Option<String>,
        anchor: usize,
    },
    Mapping {
        entries: Vec<(Node, Node)>,
        key: Option<Node>,
        tag: Option<String>,
        anchor: usize,
    },
}

impl TreeBuilder {
    fn complete(&mut self, node: Node, anchor: usize) {
        if anchor != 0 {
            self.anchors.insert(anchor, node.clone());
        }
        match self.stack.last_mut() {
            None => self.documents.push(node),
            Some(Frame::Sequence { items, .. }) => items.push(node),
            Some(Frame::Mapping { entries, key, .. }) => match key.take() {
                Some(k) => entries.push((k, node)),
                None => *key = Some(node),
            },
        }
    }

    fn close(&mut self) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        let (node, anchor) = match frame {
            Frame::Sequence { items, tag, anchor } => (Node::Sequence { items, tag }, anchor),
            Frame::Mapping {
                entries,
                tag,
                anchor,
                ..
            } => (Node::Mapping { entries, tag }, anchor),
        };
        self.complete(node, anchor);
    }
}

impl EventReceiver for TreeBuilder {
    fn on_event(&mut self, event: Event) {
        match event {
            Event::Scalar(text, style, anchor, tag) => {
                let node = Node::Scalar {
                    text,
                    style: ScalarStyle::from_event(style),
                    tag: tag.map(|t| tag_text(&t.handle, &t.suffix)),
                };
                self.complete(node, anchor);
            }
            Event::SequenceStart(anchor, tag) => self.stack.push(Frame::Sequence {
                items: Vec::new(),
                tag: tag.map(|t| tag_text(&t.handle, &t.suffix)),
                anchor,
            }),
            Event::MappingStart(anchor, tag) => self.stack.push(Frame::Mapping {
                entries: Vec::new(),
                key: None,
                tag: tag.map(|t| tag_text(&t.handle, &t.suffix)),
                anchor,
            }),
            Event::SequenceEnd | Event::MappingEnd => self.close(),
            Event::Alias(id) => match self.anchors.get(&id).cloned() {
                Some(node) => self.complete(node, 0),
                None => {
                    self.error
                        .get_or_insert_with(|| format!("alias refers to unknown anchor {}", id));
                }
            },
            _ => {}
        }
    }
}

fn tag_text(handle: &str, suffix: &str) -> String {
    match handle {
        "!!" | "tag:yaml.org,2002:" => format!("!!{}", suffix),
        "" => format!("!<{}>", suffix),
        h if h.starts_with('!') => format!("{}{}", h, suffix),
        h => format!("!<{}{}>", h, suffix),
    }
}

fn pad(out: &mut String, indent: usize) {
    out.extend(std::iter::repeat_n(' ', indent));
}

fn write_mapping(out: &mut String, entries: &[(Node, Node)], indent: usize) {
    for (key, value) in entries {
        pad(out, indent);
        out.push_str(&flow_text(key, true));
        out.push(':');
        write_value(out, value, indent);
    }
}

fn write_sequence(out: &mut String, items: &[Node], indent: usize) {
    for item in items {
        pad(out, indent);
        out.push('-');
        let nested = match item {
            Node::Mapping { entries, tag: None } if !entries.is_empty() => {
                let mut nested = String::new();
                write_mapping(&mut nested, entries, indent + 2);
                nested
            }
            Node::Sequence { items, tag: None } if !items.is_empty() => {
                let mut nested = String::new();
                write_sequence(&mut nested, items, indent + 2);
                nested
            }
            other => {
                write_value(out, other, indent);
                continue;
            }
        };
        // The first nested line shares the dash's line.
        out.push(' ');
        out.push_str(&nested[indent + 2..]);
    }
}

/// Write the value that follows `key:` or `-`, including the line break.
fn write_value(out: &mut String, value: &Node, indent: usize) {
    match value {
        Node::Mapping { entries, tag } if !entries.is_empty() => {
            push_tag(out, tag);
            out.push('\n');
            write_mapping(out, entries, indent + 2);
        }
        Node::Sequence { items, tag } if !items.is_empty() => {
            push_tag(out, tag);
            out.push('\n');
            write_sequence(out, items, indent + 2);
        }
        Node::Scalar {
            text,
            style: ScalarStyle::Literal | ScalarStyle::Folded,
            tag,
        } if fits_literal_block(text) => {
            push_tag(out, tag);
            out.push(' ');
            write_literal(out, text, indent + 2);
        }
        other => {
            let text = flow_text(other, false);
            if !text.is_empty() {
                out.push(' ');
                out.push_str(&text);
            }
            out.push('\n');
        }
    }
}

fn push_tag(out: &mut String, tag: &Option<String>) {
    if let Some(tag) = tag {
        out.push(' ');
        out.push_str(tag);
    }
}

/// Single-line rendering, used for scalars, keys and empty collections.
fn flow_text(node: &Node, in_flow: bool) -> String {
    let (body, tag) = match node {
        Node::Scalar { text, style, tag } => (scalar_inline(text, *style, in_flow), tag),
        Node::Sequence { items, tag } => {
            let items: Vec<_> = items.iter().map(|item| flow_text(item, true)).collect();
            (format!("[{}]", items.join(", ")), tag)
        }
        Node::Mapping { entries, tag } => {
            let entries: Vec<_> = entries
                .iter()
                .map(|(k, v)| format!("{}: {}", flow_text(k, true), flow_text(v, true)))
                .collect();
            (format!("{{{}}}", entries.join(", ")), tag)
        }
    };
    match tag {
        Some(tag) if body.is_empty() => tag.clone(),
        Some(tag) => format!("{} {}", tag, body),
        None => body,
    }
}

fn scalar_inline(text: &str, style: ScalarStyle, in_flow: bool) -> String {
    match style {
        ScalarStyle::Plain if plain_representable(text, in_flow) => text.to_string(),
        ScalarStyle::SingleQuoted if !text.contains('\n') => {
            format!("'{}'", text.replace('\'', "''"))
        }
        _ => double_quoted(text),
    }
}

/// Source plain text can be written back as-is unless it spans lines or
/// would collide with flow punctuation.
fn plain_representable(text: &str, in_flow: bool) -> bool {
    !text.contains('\n')
        && text.trim() == text
        && !(in_flow && text.contains([',', '[', ']', '{', '}']))
}

fn is_plain_safe(text: &str) -> bool {
    text.starts_with(|c: char| c.is_ascii_alphabetic())
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/'))
        && !matches!(
            text.to_ascii_lowercase().as_str(),
            "true" | "false" | "null" | "yes" | "no" | "on" | "off" | "y" | "n"
        )
}

fn double_quoted(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn fits_literal_block(text: &str) -> bool {
    text.contains('\n')
        && text.starts_with(|c: char| !c.is_whitespace())
        && !text.chars().any(|c| c.is_control() && c != '\n' && c != '\t')
}

fn write_literal(out: &mut String, text: &str, indent: usize) {
    let (body, chomp) = if text.ends_with("\n\n") {
        (&text[..text.len() - 1], "+")
    } else if let Some(body) = text.strip_suffix('\n') {
        (body, "")
    } else {
        (text, "-")
    };
    out.push('|');
    out.push_str(chomp);
    out.push('\n');
    for line in body.split('\n') {
        if !line.is_empty() {
            pad(out, indent);
            out.push_str(line);
        }
        out.push('\n');
    }
}
