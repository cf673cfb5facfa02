//! Pull reader for contract text.
//!
//! Yields every start (or empty) element with its attributes, in document
//! order. End tags, text, comments, declarations and CDATA are skipped: the
//! contract formats here carry all of their data in attributes.

use crate::contract::ContractError;

/// A start or empty element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value of the first attribute called `name`, if present.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Like [`attribute`](Self::attribute), but treats an empty value as absent.
    pub fn non_empty_attribute(&self, name: &str) -> Option<&str> {
        self.attribute(name).filter(|v| !v.is_empty())
    }
}

/// Iterator over the elements of a document.
pub struct ElementReader<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> ElementReader<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn fail(&mut self, msg: impl Into<String>) -> Option<Result<Element, ContractError>> {
        // Fuse after the first error.
        self.pos = self.input.len();
        Some(Err(ContractError::Xml(msg.into())))
    }

    /// Move past the next occurrence of `marker`, or report it missing.
    fn skip_past(&mut self, from: usize, marker: &str) -> Result<(), String> {
        match self.input[from..].find(marker) {
            Some(idx) => {
                self.pos = from + idx + marker.len();
                Ok(())
            }
            None => Err(format!("unterminated markup, expected '{marker}'")),
        }
    }

    fn parse_start(&mut self, start: usize) -> Result<Element, String> {
        let bytes = self.input.as_bytes();
        let mut i = start + 1;

        let name_start = i;
        while i < bytes.len() && !is_name_end(bytes[i]) {
            i += 1;
        }
        if i == name_start {
            return Err(format!("missing element name at offset {start}"));
        }
        let mut element = Element::new(&self.input[name_start..i]);

        loop {
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            match bytes.get(i) {
                None => return Err(format!("unterminated element <{}>", element.name)),
                Some(b'>') => {
                    self.pos = i + 1;
                    return Ok(element);
                }
                Some(b'/') => {
                    if bytes.get(i + 1) != Some(&b'>') {
                        return Err(format!("stray '/' in element <{}>", element.name));
                    }
                    self.pos = i + 2;
                    return Ok(element);
                }
                Some(_) => {}
            }

            let attr_start = i;
            while i < bytes.len() && bytes[i] != b'=' && !is_name_end(bytes[i]) {
                i += 1;
            }
            let attr_name = &self.input[attr_start..i];
            if attr_name.is_empty() {
                return Err(format!("malformed attribute in <{}>", element.name));
            }

            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if bytes.get(i) != Some(&b'=') {
                return Err(format!("attribute '{attr_name}' has no value"));
            }
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }

            let quote = match bytes.get(i) {
                Some(&q) if q == b'"' || q == b'\'' => q,
                _ => return Err(format!("attribute '{attr_name}' value is not quoted")),
            };
            i += 1;
            let value_start = i;
            while i < bytes.len() && bytes[i] != quote {
                i += 1;
            }
            if i >= bytes.len() {
                return Err(format!("unterminated value for attribute '{attr_name}'"));
            }
            let value = unescape(&self.input[value_start..i]);
            i += 1;

            element.attributes.push((attr_name.to_string(), value));
        }
    }
}

impl Iterator for ElementReader<'_> {
    type Item = Result<Element, ContractError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let lt = self.pos + self.input.get(self.pos..)?.find('<')?;
            let rest = &self.input[lt..];

            let skipped = if rest.starts_with("<!--") {
                self.skip_past(lt + 4, "-->")
            } else if rest.starts_with("<![CDATA[") {
                self.skip_past(lt + 9, "]]>")
            } else if rest.starts_with("<?") {
                self.skip_past(lt + 2, "?>")
            } else if rest.starts_with("<!") || rest.starts_with("</") {
                self.skip_past(lt + 2, ">")
            } else {
                return match self.parse_start(lt) {
                    Ok(element) => Some(Ok(element)),
                    Err(msg) => self.fail(msg),
                };
            };

            if let Err(msg) = skipped {
                return self.fail(msg);
            }
        }
    }
}

fn is_name_end(b: u8) -> bool {
    b.is_ascii_whitespace() || b == b'/' || b == b'>'
}

/// Replace the predefined and numeric character entities.
pub fn unescape(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }

    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let Some(semi) = tail.find(';') else {
            out.push_str(tail);
            return out;
        };

        let entity = &tail[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .map(|hex| u32::from_str_radix(hex, 16).ok())
                .unwrap_or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                .and_then(char::from_u32),
        };

        match decoded {
            Some(c) => out.push(c),
            None => out.push_str(&tail[..=semi]),
        }
        rest = &tail[semi + 1..];
    }
    out.push_str(rest);
    out
}
