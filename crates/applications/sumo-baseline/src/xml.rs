//! Minimal XML element tree for SUMO input files
//!
//! SUMO configuration and additional files are flat trees of elements whose
//! payload lives in attributes, so a small builder is enough. Rendering is
//! canonical: UTF-8 declaration, 4-space indentation, attributes in
//! insertion order, `<tag/>` for childless elements, trailing newline.

use std::fmt::Write;

const INDENT: &str = "    ";

/// An XML element with ordered attributes and children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
}

impl Element {
    /// Create an empty element
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Shorthand for `<name value="..."/>`, the shape of every sumocfg option
    pub fn option(name: impl Into<String>, value: impl ToString) -> Self {
        Self::new(name).with_attr("value", value)
    }

    /// Append an attribute
    pub fn with_attr(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.attributes.push((key.into(), value.to_string()));
        self
    }

    /// Append a child element
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Append several child elements
    pub fn with_children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children.extend(children);
        self
    }

    /// Render as a complete document
    pub fn to_document(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        self.render(&mut out, 0);
        out
    }

    fn render(&self, out: &mut String, depth: usize) {
        for _ in 0..depth {
            out.push_str(INDENT);
        }
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            let _ = write!(out, " {}=\"{}\"", key, escape(value));
        }

        if self.children.is_empty() {
            out.push_str("/>\n");
            return;
        }

        out.push_str(">\n");
        for child in &self.children {
            child.render(out, depth + 1);
        }
        for _ in 0..depth {
            out.push_str(INDENT);
        }
        let _ = writeln!(out, "</{}>", self.name);
    }
}

/// Escape a value for use inside a double-quoted attribute
pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\n' => escaped.push_str("&#10;"),
            '\t' => escaped.push_str("&#9;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_nested_document() {
        let doc = Element::new("configuration")
            .with_child(
                Element::new("input").with_child(Element::option("net-file", "../net.xml.gz")),
            )
            .with_child(Element::new("time"))
            .to_document();

        let expected = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
                        <configuration>\n\
                        \x20   <input>\n\
                        \x20       <net-file value=\"../net.xml.gz\"/>\n\
                        \x20   </input>\n\
                        \x20   <time/>\n\
                        </configuration>\n";
        assert_eq!(doc, expected);
    }

    #[test]
    fn test_attributes_keep_insertion_order() {
        let doc = Element::new("edgeData")
            .with_attr("id", "a")
            .with_attr("begin", 0)
            .with_attr("end", 3600)
            .to_document();
        assert!(doc.contains("<edgeData id=\"a\" begin=\"0\" end=\"3600\"/>"));
    }

    #[test]
    fn test_escape_special_characters() {
        assert_eq!(escape(r#"a<b>&"c""#), "a&lt;b&gt;&amp;&quot;c&quot;");
        assert_eq!(escape("plain/path_0.xml"), "plain/path_0.xml");
    }

    #[test]
    fn test_option_values_are_escaped() {
        let doc = Element::new("output")
            .with_child(Element::option("log", "a&b \"x\".log"))
            .to_document();
        assert!(doc.contains("<log value=\"a&amp;b &quot;x&quot;.log\"/>"));
    }
}
