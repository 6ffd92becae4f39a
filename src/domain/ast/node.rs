//! Tag tree nodes

/// Name of the synthetic tag wrapping a parsed document
pub const ROOT_TAG: &str = "root";

/// An element of a tag tree: literal text or a tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(String),
    Tag(Tag),
}

impl Node {
    pub fn text(s: impl Into<String>) -> Self {
        Node::Text(s.into())
    }

    pub fn as_tag(&self) -> Option<&Tag> {
        match self {
            Node::Tag(tag) => Some(tag),
            Node::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Node::Text(text) => Some(text),
            Node::Tag(_) => None,
        }
    }

    /// Text with all tag markup stripped
    pub fn default_fmt(&self) -> String {
        match self {
            Node::Text(text) => text.clone(),
            Node::Tag(tag) => tag.default_fmt(),
        }
    }

    /// Markup that parses back into this node
    pub fn to_markup(&self, prefix: char) -> String {
        match self {
            Node::Text(text) => text.clone(),
            Node::Tag(tag) => tag.to_markup(prefix),
        }
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Node::Text(s.to_string())
    }
}

impl From<Tag> for Node {
    fn from(tag: Tag) -> Self {
        Node::Tag(tag)
    }
}

/// The content of a tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagContent {
    /// Markup that has not been parsed yet
    Markup(String),
    /// Parsed children
    Nodes(Vec<Node>),
}

impl TagContent {
    fn default_fmt(&self) -> String {
        match self {
            TagContent::Markup(markup) => markup.clone(),
            TagContent::Nodes(nodes) => nodes.iter().map(Node::default_fmt).collect(),
        }
    }
}

/// A tag: a name, optional attributes and its content
#[derive(Debug, Clone, Eq)]
pub struct Tag {
    pub name: String,
    pub content: TagContent,
    /// Raw attribute string, without the surrounding brackets
    pub attributes: Option<String>,
    /// Byte offset of the tag in the string it was scanned from
    pub offset: usize,
}

// The offset is where a tag came from, not what it is
impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.content == other.content
            && self.attributes == other.attributes
    }
}

impl Tag {
    pub fn new(name: impl Into<String>, content: TagContent, attributes: Option<String>) -> Self {
        Tag {
            name: name.into(),
            content,
            attributes,
            offset: 0,
        }
    }

    /// A tag whose content still has to be parsed
    pub fn pending(name: impl Into<String>, markup: impl Into<String>) -> Self {
        Self::new(name, TagContent::Markup(markup.into()), None)
    }

    /// A tag with parsed children
    pub fn with_children(name: impl Into<String>, children: Vec<Node>) -> Self {
        Self::new(name, TagContent::Nodes(children), None)
    }

    pub fn with_attributes(mut self, attributes: impl Into<String>) -> Self {
        self.attributes = Some(attributes.into());
        self
    }

    /// Parsed children, empty while the content is still markup
    pub fn children(&self) -> &[Node] {
        match &self.content {
            TagContent::Nodes(nodes) => nodes,
            TagContent::Markup(_) => &[],
        }
    }

    /// True when neither this tag nor any descendant holds unparsed markup
    pub fn is_resolved(&self) -> bool {
        match &self.content {
            TagContent::Markup(_) => false,
            TagContent::Nodes(nodes) => nodes
                .iter()
                .all(|n| n.as_tag().map_or(true, Tag::is_resolved)),
        }
    }

    /// Look up an attribute value.
    ///
    /// Attributes are whitespace separated `key=value` pairs or bare flags:
    /// `id=fig:1 short="A figure" wide`. Flags return an empty string.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        let attributes = self.attributes.as_deref()?;
        split_attributes(attributes).find_map(|token| match token.split_once('=') {
            Some((k, v)) if k == key => Some(v.trim_matches('"')),
            None if token == key => Some(""),
            _ => None,
        })
    }

    /// The text of the content with markup stripped
    pub fn default_fmt(&self) -> String {
        self.content.default_fmt()
    }

    /// The content text, trimmed, for use as a heading or caption title
    pub fn title(&self) -> String {
        self.default_fmt().trim().to_string()
    }

    /// Markup that parses back into this tag
    pub fn to_markup(&self, prefix: char) -> String {
        let mut out = String::new();
        out.push(prefix);
        out.push_str(&self.name);
        if let Some(attributes) = &self.attributes {
            out.push('[');
            out.push_str(attributes);
            out.push(']');
        }
        out.push('{');
        match &self.content {
            TagContent::Markup(markup) => out.push_str(markup),
            TagContent::Nodes(nodes) => {
                for node in nodes {
                    out.push_str(&node.to_markup(prefix));
                }
            }
        }
        out.push('}');
        out
    }

    /// Visit this tag and every descendant tag, depth-first, in document order
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Tag)) {
        visit(self);
        for child in self.children() {
            if let Node::Tag(tag) = child {
                tag.walk(visit);
            }
        }
    }
}

/// Split on whitespace, keeping double-quoted values together
fn split_attributes(s: &str) -> impl Iterator<Item = &str> {
    let mut tokens = Vec::new();
    let mut start = None;
    let mut quoted = false;
    for (i, c) in s.char_indices() {
        match c {
            '"' => {
                quoted = !quoted;
                start.get_or_insert(i);
            }
            c if c.is_whitespace() && !quoted => {
                if let Some(st) = start.take() {
                    tokens.push(&s[st..i]);
                }
            }
            _ => {
                start.get_or_insert(i);
            }
        }
    }
    if let Some(st) = start {
        tokens.push(&s[st..]);
    }
    tokens.into_iter()
}
