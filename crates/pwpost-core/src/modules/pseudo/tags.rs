use std::borrow::Cow;
use std::collections::BTreeMap;

/// Tag given to the synthetic node that gathers several top-level elements.
pub const DOCUMENT_ROOT_TAG: &str = "#document";

/// One element of a parsed tag tree.
///
/// `text` holds the character data that precedes the first child element
/// (entities already decoded, comments skipped), or `None` when there is
/// none. Character data after a child is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PseudoNode {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    pub children: Vec<PseudoNode>,
    pub text: Option<String>,
}

impl PseudoNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// First direct child with exactly this tag.
    pub fn child(&self, tag: &str) -> Option<&PseudoNode> {
        self.children.iter().find(|child| child.tag == tag)
    }

    /// Follows a `/`-separated chain of direct-child tags.
    pub fn find(&self, path: &str) -> Option<&PseudoNode> {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(self, |node, segment| node.child(segment))
    }

    pub fn is_document_root(&self) -> bool {
        self.tag == DOCUMENT_ROOT_TAG
    }

    fn push_text(&mut self, text: &str) {
        if self.children.is_empty() {
            self.text.get_or_insert_with(String::new).push_str(text);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TagParseError {
    #[error("document contains no elements")]
    Empty,
    #[error("unexpected end of input inside {context} starting at line {line}, column {column}")]
    UnexpectedEof {
        context: &'static str,
        line: usize,
        column: usize,
    },
    #[error("invalid tag name at line {line}, column {column}")]
    InvalidName { line: usize, column: usize },
    #[error("malformed attribute in <{tag}> at line {line}, column {column}")]
    MalformedAttribute {
        tag: String,
        line: usize,
        column: usize,
    },
    #[error("attribute '{name}' repeated in <{tag}> at line {line}, column {column}")]
    DuplicateAttribute {
        tag: String,
        name: String,
        line: usize,
        column: usize,
    },
    #[error("closing tag </{tag}> has no matching open tag at line {line}, column {column}")]
    UnmatchedClose {
        tag: String,
        line: usize,
        column: usize,
    },
    #[error("expected </{expected}> but found </{found}> at line {line}, column {column}")]
    MismatchedClose {
        expected: String,
        found: String,
        line: usize,
        column: usize,
    },
    #[error("element <{tag}> opened at line {line} is never closed")]
    Unclosed { tag: String, line: usize },
    #[error("unknown entity '&{entity};' at line {line}, column {column}")]
    UnknownEntity {
        entity: String,
        line: usize,
        column: usize,
    },
    #[error("bare '&' at line {line}, column {column}")]
    BareAmpersand { line: usize, column: usize },
    #[error("character data outside any element at line {line}, column {column}")]
    TextOutsideRoot { line: usize, column: usize },
}

/// Classifies one line of markup: a tag line is `<...>` (after trimming
/// spaces, tabs and newlines) whose body, apart from an optional leading
/// and trailing `/`, consists only of word characters, spaces and
/// `= + - . "`. Returns the line without its angle brackets.
pub fn tag_line(line: &str) -> Option<&str> {
    let trimmed = line.trim_matches([' ', '\t', '\n', '\r']);
    let inner = trimmed.strip_prefix('<')?.strip_suffix('>')?;
    let body = inner.strip_prefix('/').unwrap_or(inner);
    let body = body.strip_suffix('/').unwrap_or(body);
    if body.is_empty() || !body.chars().all(is_tag_line_char) {
        return None;
    }
    Some(trimmed.trim_matches([' ', '<', '>']))
}

fn is_tag_line_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | ' ' | '=' | '+' | '-' | '.' | '"')
}

/// Rewrites every literal `&input` as `&amp;input` so that the Fortran
/// namelist echoed into pseudopotential headers parses as character data.
pub fn escape_input_ampersand(source: &str) -> Cow<'_, str> {
    if source.contains("&input") {
        Cow::Owned(source.replace("&input", "&amp;input"))
    } else {
        Cow::Borrowed(source)
    }
}

/// Parses nested markup into a tree.
///
/// A document with one top-level element returns that element; several
/// top-level elements are gathered, in order, under a node tagged
/// [`DOCUMENT_ROOT_TAG`]. Comments, processing instructions and
/// declarations are skipped; CDATA sections are kept as text.
pub fn parse_tag_tree(source: &str) -> Result<PseudoNode, TagParseError> {
    TagParser::new(source).parse_document()
}

struct OpenElement {
    node: PseudoNode,
    line: usize,
}

struct TagParser<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> TagParser<'a> {
    fn new(source: &'a str) -> Self {
        let source = source.strip_prefix('\u{feff}').unwrap_or(source);
        Self { source, pos: 0 }
    }

    fn parse_document(mut self) -> Result<PseudoNode, TagParseError> {
        let mut stack: Vec<OpenElement> = Vec::new();
        let mut top_level: Vec<PseudoNode> = Vec::new();

        while !self.at_end() {
            if self.rest().starts_with("<!--") {
                self.skip_past("<!--", "-->", "comment")?;
            } else if self.rest().starts_with("<?") {
                self.skip_past("<?", "?>", "processing instruction")?;
            } else if self.rest().starts_with("<![CDATA[") {
                let start = self.pos;
                let text = self.take_delimited("<![CDATA[", "]]>", "CDATA section")?;
                match stack.last_mut() {
                    Some(open) => open.node.push_text(text),
                    None if text.trim().is_empty() => {}
                    None => return Err(self.text_outside_root(start)),
                }
            } else if self.rest().starts_with("<!") {
                self.skip_past("<!", ">", "declaration")?;
            } else if self.rest().starts_with("</") {
                let start = self.pos;
                self.pos += 2;
                let name = self.parse_name()?;
                self.skip_whitespace();
                self.expect_char('>', start, "closing tag")?;

                let Some(open) = stack.pop() else {
                    let (line, column) = self.location(start);
                    return Err(TagParseError::UnmatchedClose {
                        tag: name.to_string(),
                        line,
                        column,
                    });
                };
                if open.node.tag != name {
                    let (line, column) = self.location(start);
                    return Err(TagParseError::MismatchedClose {
                        expected: open.node.tag,
                        found: name.to_string(),
                        line,
                        column,
                    });
                }
                attach(&mut stack, &mut top_level, open.node);
            } else if self.rest().starts_with('<') {
                let start = self.pos;
                let (node, self_closing) = self.parse_open_tag()?;
                if self_closing {
                    attach(&mut stack, &mut top_level, node);
                } else {
                    let (line, _) = self.location(start);
                    stack.push(OpenElement { node, line });
                }
            } else {
                let start = self.pos;
                let raw = self.take_until('<');
                let text = self.decode_entities(raw, start)?;
                match stack.last_mut() {
                    Some(open) => open.node.push_text(&text),
                    None if text.trim().is_empty() => {}
                    None => return Err(self.text_outside_root(start)),
                }
            }
        }

        if let Some(open) = stack.pop() {
            return Err(TagParseError::Unclosed {
                tag: open.node.tag,
                line: open.line,
            });
        }

        match top_level.len() {
            0 => Err(TagParseError::Empty),
            1 => Ok(top_level.remove(0)),
            _ => {
                let mut root = PseudoNode::new(DOCUMENT_ROOT_TAG);
                root.children = top_level;
                Ok(root)
            }
        }
    }

    fn parse_open_tag(&mut self) -> Result<(PseudoNode, bool), TagParseError> {
        let start = self.pos;
        self.pos += 1;
        let mut node = PseudoNode::new(self.parse_name()?);

        loop {
            let had_space = self.skip_whitespace();
            if self.rest().starts_with("/>") {
                self.pos += 2;
                return Ok((node, true));
            }
            if self.rest().starts_with('>') {
                self.pos += 1;
                return Ok((node, false));
            }
            if self.at_end() {
                let (line, column) = self.location(start);
                return Err(TagParseError::UnexpectedEof {
                    context: "tag",
                    line,
                    column,
                });
            }
            if !had_space {
                return Err(self.malformed_attribute(&node.tag));
            }

            let attribute_start = self.pos;
            let name = self
                .parse_name()
                .map_err(|_| self.malformed_attribute(&node.tag))?
                .to_string();
            self.skip_whitespace();
            if !self.eat_char('=') {
                return Err(self.malformed_attribute(&node.tag));
            }
            self.skip_whitespace();
            let value = self.parse_quoted_value(&node.tag)?;

            if node.attributes.contains_key(&name) {
                let (line, column) = self.location(attribute_start);
                return Err(TagParseError::DuplicateAttribute {
                    tag: node.tag,
                    name,
                    line,
                    column,
                });
            }
            node.attributes.insert(name, value);
        }
    }

    fn parse_quoted_value(&mut self, tag: &str) -> Result<String, TagParseError> {
        let quote = match self.peek() {
            Some(quote @ ('"' | '\'')) => quote,
            _ => return Err(self.malformed_attribute(tag)),
        };
        self.pos += 1;
        let start = self.pos;
        let Some(length) = self.rest().find(quote) else {
            let (line, column) = self.location(start);
            return Err(TagParseError::UnexpectedEof {
                context: "attribute value",
                line,
                column,
            });
        };
        let raw = &self.source[start..start + length];
        self.pos = start + length + 1;
        self.decode_entities(raw, start).map(Cow::into_owned)
    }

    fn parse_name(&mut self) -> Result<&'a str, TagParseError> {
        let start = self.pos;
        let length = self
            .rest()
            .find(|c: char| !is_name_char(c))
            .unwrap_or(self.rest().len());
        let name = &self.source[start..start + length];
        match name.chars().next() {
            Some(first) if first.is_alphabetic() || first == '_' || first == ':' => {
                self.pos += length;
                Ok(name)
            }
            _ => {
                let (line, column) = self.location(start);
                Err(TagParseError::InvalidName { line, column })
            }
        }
    }

    fn decode_entities<'s>(
        &self,
        raw: &'s str,
        offset: usize,
    ) -> Result<Cow<'s, str>, TagParseError> {
        if !raw.contains('&') {
            return Ok(Cow::Borrowed(raw));
        }

        let mut decoded = String::with_capacity(raw.len());
        let mut rest = raw;
        while let Some(amp) = rest.find('&') {
            decoded.push_str(&rest[..amp]);
            let entity_offset = offset + (raw.len() - rest.len()) + amp;
            let after = &rest[amp + 1..];
            let Some(end) = after.find(';').filter(|end| {
                after[..*end]
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '#')
                    && *end > 0
            }) else {
                let (line, column) = self.location(entity_offset);
                return Err(TagParseError::BareAmpersand { line, column });
            };

            let entity = &after[..end];
            let Some(ch) = resolve_entity(entity) else {
                let (line, column) = self.location(entity_offset);
                return Err(TagParseError::UnknownEntity {
                    entity: entity.to_string(),
                    line,
                    column,
                });
            };
            decoded.push(ch);
            rest = &after[end + 1..];
        }
        decoded.push_str(rest);
        Ok(Cow::Owned(decoded))
    }

    fn skip_past(
        &mut self,
        open: &str,
        close: &str,
        context: &'static str,
    ) -> Result<(), TagParseError> {
        self.take_delimited(open, close, context).map(|_| ())
    }

    fn take_delimited(
        &mut self,
        open: &str,
        close: &str,
        context: &'static str,
    ) -> Result<&'a str, TagParseError> {
        let start = self.pos;
        let body_start = start + open.len();
        let Some(length) = self.source[body_start..].find(close) else {
            let (line, column) = self.location(start);
            return Err(TagParseError::UnexpectedEof {
                context,
                line,
                column,
            });
        };
        self.pos = body_start + length + close.len();
        Ok(&self.source[body_start..body_start + length])
    }

    fn take_until(&mut self, delimiter: char) -> &'a str {
        let start = self.pos;
        let length = self.rest().find(delimiter).unwrap_or(self.rest().len());
        self.pos += length;
        &self.source[start..start + length]
    }

    fn expect_char(
        &mut self,
        expected: char,
        start: usize,
        context: &'static str,
    ) -> Result<(), TagParseError> {
        if self.eat_char(expected) {
            return Ok(());
        }
        let (line, column) = self.location(start);
        if self.at_end() {
            Err(TagParseError::UnexpectedEof {
                context,
                line,
                column,
            })
        } else {
            Err(TagParseError::InvalidName { line, column })
        }
    }

    fn eat_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) -> bool {
        let length = self
            .rest()
            .find(|c: char| !c.is_whitespace())
            .unwrap_or(self.rest().len());
        self.pos += length;
        length > 0
    }

    fn malformed_attribute(&self, tag: &str) -> TagParseError {
        let (line, column) = self.location(self.pos);
        TagParseError::MalformedAttribute {
            tag: tag.to_string(),
            line,
            column,
        }
    }

    fn text_outside_root(&self, start: usize) -> TagParseError {
        let offset = self.source[start..]
            .find(|c: char| !c.is_whitespace())
            .map_or(start, |skip| start + skip);
        let (line, column) = self.location(offset);
        TagParseError::TextOutsideRoot { line, column }
    }

    fn location(&self, offset: usize) -> (usize, usize) {
        let prefix = &self.source[..offset.min(self.source.len())];
        let line = prefix.matches('\n').count() + 1;
        let column = prefix
            .rsplit('\n')
            .next()
            .map_or(0, |tail| tail.chars().count())
            + 1;
        (line, column)
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.source.len()
    }
}

fn attach(stack: &mut [OpenElement], top_level: &mut Vec<PseudoNode>, node: PseudoNode) {
    match stack.last_mut() {
        Some(parent) => parent.node.children.push(node),
        None => top_level.push(node),
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')
}

fn resolve_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let reference = entity.strip_prefix('#')?;
            let code = match reference.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => reference.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}
