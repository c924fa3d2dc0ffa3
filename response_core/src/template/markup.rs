//! Template markup - the tree form of authored response templates.
//!
//! Templates arrive as markup text and are parsed once, at load time, into
//! a [`TemplateNode`] tree the evaluator walks. The dialect is a small XML
//! subset: nested elements, self-closing elements, quoted attributes,
//! comments, and the five standard character entities.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from parsing template markup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkupError {
    #[error("unexpected end of markup")]
    UnexpectedEnd,

    #[error("malformed tag at offset {offset}")]
    MalformedTag { offset: usize },

    #[error("mismatched closing tag: expected </{expected}>, found </{found}>")]
    MismatchedClose { expected: String, found: String },

    #[error("unexpected closing tag </{found}>")]
    UnexpectedClose { found: String },
}

/// One element in a template tree.
///
/// Tag and attribute names are lowercased at parse time; tag dispatch in
/// the evaluator is therefore case-insensitive by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateNode {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<TemplateChild>,
}

/// A child of a template element: literal text or a nested element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TemplateChild {
    Text(String),
    Element(TemplateNode),
}

impl TemplateNode {
    /// Parse template markup into a tree.
    ///
    /// A single root element becomes the tree root directly; bare text or
    /// multiple top-level items are wrapped in a synthetic `template`
    /// root, so plain-text templates parse fine.
    pub fn parse(markup: &str) -> Result<Self, MarkupError> {
        let mut parser = Parser::new(markup);
        let mut children = parser.parse_children(None)?;

        let only_whitespace_text = children.iter().all(|child| match child {
            TemplateChild::Text(text) => text.trim().is_empty(),
            TemplateChild::Element(_) => true,
        });
        let element_indices: Vec<usize> = children
            .iter()
            .enumerate()
            .filter(|(_, child)| matches!(child, TemplateChild::Element(_)))
            .map(|(index, _)| index)
            .collect();

        if only_whitespace_text && element_indices.len() == 1 {
            if let TemplateChild::Element(root) = children.swap_remove(element_indices[0]) {
                return Ok(root);
            }
        }

        Ok(TemplateNode {
            name: "template".to_string(),
            attributes: Vec::new(),
            children,
        })
    }

    /// Look up an attribute value by (case-insensitive) name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(attr, _)| attr.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Whether the element has no children at all.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    source: &'a str,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            source,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn starts_with(&self, prefix: &str) -> bool {
        prefix
            .chars()
            .enumerate()
            .all(|(i, c)| self.chars.get(self.pos + i) == Some(&c))
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    /// Parse children until the closing tag of `parent` (or end of input
    /// when `parent` is `None`).
    fn parse_children(
        &mut self,
        parent: Option<&str>,
    ) -> Result<Vec<TemplateChild>, MarkupError> {
        let mut children = Vec::new();

        loop {
            if self.pos >= self.chars.len() {
                return match parent {
                    None => Ok(children),
                    Some(_) => Err(MarkupError::UnexpectedEnd),
                };
            }

            if self.starts_with("<!--") {
                self.skip_comment()?;
            } else if self.starts_with("</") {
                let found = self.parse_close_tag()?;
                return match parent {
                    Some(expected) if expected == found => Ok(children),
                    Some(expected) => Err(MarkupError::MismatchedClose {
                        expected: expected.to_string(),
                        found,
                    }),
                    None => Err(MarkupError::UnexpectedClose { found }),
                };
            } else if self.peek() == Some('<') {
                children.push(TemplateChild::Element(self.parse_element()?));
            } else {
                let text = self.parse_text();
                if !text.is_empty() {
                    children.push(TemplateChild::Text(text));
                }
            }
        }
    }

    fn skip_comment(&mut self) -> Result<(), MarkupError> {
        self.pos += 4;
        while !self.starts_with("-->") {
            if self.pos >= self.chars.len() {
                return Err(MarkupError::UnexpectedEnd);
            }
            self.pos += 1;
        }
        self.pos += 3;
        Ok(())
    }

    fn parse_text(&mut self) -> String {
        let start = self.pos;
        while self.pos < self.chars.len() && self.peek() != Some('<') {
            self.pos += 1;
        }
        let raw: String = self.chars[start..self.pos].iter().collect();
        decode_entities(&raw)
    }

    fn parse_name(&mut self) -> Result<String, MarkupError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(MarkupError::MalformedTag { offset: self.offset() });
        }
        Ok(self.chars[start..self.pos]
            .iter()
            .collect::<String>()
            .to_ascii_lowercase())
    }

    fn parse_close_tag(&mut self) -> Result<String, MarkupError> {
        self.pos += 2;
        let name = self.parse_name()?;
        self.skip_whitespace();
        if self.peek() != Some('>') {
            return Err(MarkupError::MalformedTag { offset: self.offset() });
        }
        self.pos += 1;
        Ok(name)
    }

    fn parse_element(&mut self) -> Result<TemplateNode, MarkupError> {
        self.pos += 1;
        let name = self.parse_name()?;
        let mut attributes = Vec::new();

        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('>') => {
                    self.pos += 1;
                    let children = self.parse_children(Some(&name))?;
                    return Ok(TemplateNode {
                        name,
                        attributes,
                        children,
                    });
                }
                Some('/') if self.starts_with("/>") => {
                    self.pos += 2;
                    return Ok(TemplateNode {
                        name,
                        attributes,
                        children: Vec::new(),
                    });
                }
                Some(c) if c.is_ascii_alphanumeric() || c == '-' || c == '_' => {
                    attributes.push(self.parse_attribute()?);
                }
                _ => return Err(MarkupError::MalformedTag { offset: self.offset() }),
            }
        }
    }

    fn parse_attribute(&mut self) -> Result<(String, String), MarkupError> {
        let name = self.parse_name()?;
        self.skip_whitespace();
        if self.peek() != Some('=') {
            return Err(MarkupError::MalformedTag { offset: self.offset() });
        }
        self.pos += 1;
        self.skip_whitespace();

        let quote = match self.peek() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(MarkupError::MalformedTag { offset: self.offset() }),
        };
        self.pos += 1;

        let start = self.pos;
        while self.peek().is_some_and(|c| c != quote) {
            self.pos += 1;
        }
        if self.peek() != Some(quote) {
            return Err(MarkupError::UnexpectedEnd);
        }
        let raw: String = self.chars[start..self.pos].iter().collect();
        self.pos += 1;

        Ok((name, decode_entities(&raw)))
    }

    fn offset(&self) -> usize {
        // Byte offset is approximate for multibyte input; good enough for
        // pointing a rule author at the problem.
        self.source
            .char_indices()
            .nth(self.pos)
            .map(|(i, _)| i)
            .unwrap_or(self.source.len())
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
