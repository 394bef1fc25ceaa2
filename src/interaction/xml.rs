//! Minimal element-tree reader for the control block.
//!
//! Supports elements, attributes, character data, the five predefined
//! entities, numeric character references, CDATA sections, comments and
//! processing instructions. It rejects anything that is not well-formed
//! (mismatched tags, stray `<` or `&`, a second root, trailing content),
//! since the caller reports all of those as a single structural failure.

use thiserror::Error;

const MAX_DEPTH: usize = 64;

/// One parsed element. `text` holds only the character data that precedes
/// the first child element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    /// First direct child named `name`.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.name == name)
    }

    /// Every direct child named `name`, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at byte {offset}")]
pub struct XmlError {
    pub message: String,
    pub offset: usize,
}

/// Parses a complete document with exactly one root element.
pub fn parse_document(input: &str) -> Result<Element, XmlError> {
    let mut reader = Reader { src: input, pos: 0 };
    reader.skip_misc()?;
    if reader.at_end() {
        return Err(reader.error("document has no root element"));
    }

    let root = reader.element(0)?;
    reader.skip_misc()?;
    if !reader.at_end() {
        return Err(reader.error("content after the root element"));
    }
    Ok(root)
}

struct Reader<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Reader<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn starts_with(&self, pattern: &str) -> bool {
        self.rest().starts_with(pattern)
    }

    fn error(&self, message: impl Into<String>) -> XmlError {
        XmlError {
            message: message.into(),
            offset: self.pos,
        }
    }

    fn expect(&mut self, pattern: &str) -> Result<(), XmlError> {
        if self.starts_with(pattern) {
            self.pos += pattern.len();
            Ok(())
        } else {
            Err(self.error(format!("expected `{pattern}`")))
        }
    }

    fn skip_whitespace(&mut self) -> bool {
        let before = self.pos;
        let trimmed = self.rest().trim_start_matches(is_xml_whitespace);
        self.pos = self.src.len() - trimmed.len();
        self.pos > before
    }

    /// Consumes input up to and including `terminator`, returning what came before it.
    fn take_until(&mut self, terminator: &str, what: &str) -> Result<&'a str, XmlError> {
        let rest = self.rest();
        let Some(end) = rest.find(terminator) else {
            return Err(self.error(format!("unterminated {what}")));
        };
        self.pos += end + terminator.len();
        Ok(&rest[..end])
    }

    /// Skips whitespace, comments and processing instructions outside the root.
    fn skip_misc(&mut self) -> Result<(), XmlError> {
        loop {
            self.skip_whitespace();
            if self.starts_with("<!--") {
                self.pos += 4;
                self.comment_body()?;
            } else if self.starts_with("<?") {
                self.pos += 2;
                self.take_until("?>", "processing instruction")?;
            } else {
                return Ok(());
            }
        }
    }

    fn comment_body(&mut self) -> Result<(), XmlError> {
        let body = self.take_until("-->", "comment")?;
        if body.contains("--") {
            return Err(self.error("`--` inside comment"));
        }
        Ok(())
    }

    fn name(&mut self) -> Result<String, XmlError> {
        let rest = self.rest();
        let mut chars = rest.char_indices();
        match chars.next() {
            Some((_, ch)) if is_name_start(ch) => {}
            _ => return Err(self.error("expected a name")),
        }
        let end = chars
            .find(|(_, ch)| !is_name_char(*ch))
            .map_or(rest.len(), |(index, _)| index);
        self.pos += end;
        Ok(rest[..end].to_string())
    }

    fn element(&mut self, depth: usize) -> Result<Element, XmlError> {
        if depth >= MAX_DEPTH {
            return Err(self.error("elements nested too deeply"));
        }

        self.expect("<")?;
        let mut element = Element {
            name: self.name()?,
            ..Element::default()
        };

        loop {
            let had_space = self.skip_whitespace();
            if self.starts_with("/>") {
                self.pos += 2;
                return Ok(element);
            }
            if self.starts_with(">") {
                self.pos += 1;
                break;
            }
            if !had_space {
                return Err(self.error("expected whitespace before attribute"));
            }

            let key = self.name()?;
            self.skip_whitespace();
            self.expect("=")?;
            self.skip_whitespace();
            let value = self.attribute_value()?;
            if element.attribute(&key).is_some() {
                return Err(self.error(format!("duplicate attribute `{key}`")));
            }
            element.attributes.push((key, value));
        }

        self.content(&mut element, depth)?;
        Ok(element)
    }

    fn attribute_value(&mut self) -> Result<String, XmlError> {
        let quote = match self.peek() {
            Some(quote @ ('"' | '\'')) => quote,
            _ => return Err(self.error("expected a quoted attribute value")),
        };
        self.pos += 1;

        let mut value = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated attribute value")),
                Some(ch) if ch == quote => {
                    self.pos += 1;
                    return Ok(value);
                }
                Some('<') => return Err(self.error("`<` inside attribute value")),
                Some('&') => value.push(self.reference()?),
                Some(ch) => {
                    value.push(ch);
                    self.pos += ch.len_utf8();
                }
            }
        }
    }

    fn content(&mut self, element: &mut Element, depth: usize) -> Result<(), XmlError> {
        loop {
            if self.at_end() {
                return Err(self.error(format!("unclosed element `{}`", element.name)));
            }

            if self.starts_with("</") {
                self.pos += 2;
                let closing = self.name()?;
                if closing != element.name {
                    return Err(self.error(format!(
                        "mismatched closing tag `{closing}` for `{}`",
                        element.name
                    )));
                }
                self.skip_whitespace();
                return self.expect(">");
            }

            let leading = element.children.is_empty();
            if self.starts_with("<!--") {
                self.pos += 4;
                self.comment_body()?;
            } else if self.starts_with("<![CDATA[") {
                self.pos += 9;
                let data = self.take_until("]]>", "CDATA section")?;
                if leading {
                    element.text.push_str(data);
                }
            } else if self.starts_with("<?") {
                self.pos += 2;
                self.take_until("?>", "processing instruction")?;
            } else if self.starts_with("<!") {
                return Err(self.error("markup declarations are not supported"));
            } else if self.starts_with("<") {
                let child = self.element(depth + 1)?;
                element.children.push(child);
            } else if self.starts_with("&") {
                let ch = self.reference()?;
                if leading {
                    element.text.push(ch);
                }
            } else {
                let rest = self.rest();
                let end = rest.find(['<', '&']).unwrap_or(rest.len());
                let chunk = &rest[..end];
                if chunk.contains("]]>") {
                    return Err(self.error("`]]>` in character data"));
                }
                if leading {
                    element.text.push_str(chunk);
                }
                self.pos += end;
            }
        }
    }

    /// Decodes one `&...;` reference starting at the current `&`.
    fn reference(&mut self) -> Result<char, XmlError> {
        let start = self.pos;
        self.expect("&")?;
        let body = self.take_until(";", "entity reference")?;
        let decoded = match body {
            "lt" => Some('<'),
            "gt" => Some('>'),
            "amp" => Some('&'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => numeric_reference(body),
        };
        decoded.ok_or_else(|| XmlError {
            message: format!("undefined entity `&{body};`"),
            offset: start,
        })
    }
}

fn numeric_reference(body: &str) -> Option<char> {
    let digits = body.strip_prefix('#')?;
    let code = match digits.strip_prefix('x') {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<u32>().ok()?,
    };
    char::from_u32(code).filter(|ch| *ch != '\0')
}

fn is_xml_whitespace(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\r' | '\n')
}

fn is_name_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == ':'
}

fn is_name_char(ch: char) -> bool {
    is_name_start(ch) || ch.is_ascii_digit() || matches!(ch, '-' | '.') || ch.is_numeric()
}
