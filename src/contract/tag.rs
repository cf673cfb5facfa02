//! Element emitter for contract text.
//!
//! Output is byte-for-byte deterministic: attributes keep the order they were
//! added in, each element sits on its own line, and there is no indentation.
//! Content identifiers are digests of this text, so the layout must not change.

/// One element with ordered attributes and child elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Tag>,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn add_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.push((name.into(), value.into()));
    }

    pub fn add_tag(&mut self, child: Tag) {
        self.children.push(child);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render the element tree.
    pub fn output(&self) -> String {
        let mut out = String::new();
        self.write_into(&mut out);
        out
    }

    fn write_into(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (name, value) in &self.attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape(value));
            out.push('"');
        }

        if self.children.is_empty() {
            out.push_str("/>\n");
            return;
        }

        out.push_str(">\n");
        for child in &self.children {
            child.write_into(out);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push_str(">\n");
    }
}

/// Escape the characters that may not appear raw in an attribute value.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_element() {
        let mut tag = Tag::new("basketItem");
        tag.add_attribute("minimumTransfer", "10");
        tag.add_attribute("accountID", "");
        assert_eq!(tag.output(), "<basketItem minimumTransfer=\"10\" accountID=\"\"/>\n");
    }

    #[test]
    fn test_nested_elements_keep_order() {
        let mut root = Tag::new("root");
        root.add_attribute("b", "2");
        root.add_attribute("a", "1");
        root.add_tag(Tag::new("first"));
        root.add_tag(Tag::new("second"));

        assert_eq!(
            root.output(),
            "<root b=\"2\" a=\"1\">\n<first/>\n<second/>\n</root>\n"
        );
    }

    #[test]
    fn test_attribute_escaping() {
        assert_eq!(escape(r#"a<b>&"c'"#), "a&lt;b&gt;&amp;&quot;c&apos;");
    }
}
