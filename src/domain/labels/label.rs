//! Label types

/// Identifies a label within a project: the owning document and the label id
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelKey {
    pub doc_id: String,
    pub id: String,
}

impl LabelKey {
    pub fn new(doc_id: impl Into<String>, id: impl Into<String>) -> Self {
        LabelKey {
            doc_id: doc_id.into(),
            id: id.into(),
        }
    }

    /// The fully qualified id, e.g. `chapter1::fig:setup`
    pub fn qualified(&self, sep: &str) -> String {
        format!("{}{}{}", self.doc_id, sep, self.id)
    }
}

/// Heading levels, from least to most specific
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HeadingLevel {
    Part,
    Chapter,
    Section,
    Subsection,
    Subsubsection,
}

impl HeadingLevel {
    pub const ALL: [HeadingLevel; 5] = [
        HeadingLevel::Part,
        HeadingLevel::Chapter,
        HeadingLevel::Section,
        HeadingLevel::Subsection,
        HeadingLevel::Subsubsection,
    ];

    pub fn name(self) -> &'static str {
        match self {
            HeadingLevel::Part => "part",
            HeadingLevel::Chapter => "chapter",
            HeadingLevel::Section => "section",
            HeadingLevel::Subsection => "subsection",
            HeadingLevel::Subsubsection => "subsubsection",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.name() == name)
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// A non-owning reference to an enclosing heading, captured when the
/// hierarchy was last linked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingRef {
    pub key: LabelKey,
    pub number: Option<u32>,
    pub title: String,
}

/// The enclosing headings of a content label, one slot per level
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hierarchy {
    refs: [Option<HeadingRef>; 5],
}

impl Hierarchy {
    pub fn get(&self, level: HeadingLevel) -> Option<&HeadingRef> {
        self.refs[level.index()].as_ref()
    }

    /// Point `level` at `heading` and forget every more specific level
    pub fn enter(&mut self, level: HeadingLevel, heading: HeadingRef) {
        self.refs[level.index()] = Some(heading);
        for slot in &mut self.refs[level.index() + 1..] {
            *slot = None;
        }
    }

    /// Set heading numbers joined with '.', e.g. "2.3.1"
    pub fn tree_number(&self) -> String {
        self.refs
            .iter()
            .flatten()
            .filter_map(|r| r.number)
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// What a label labels
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelVariant {
    Plain,
    /// Headings, figures, tables: anything with a title that sits in the
    /// heading hierarchy
    Content { title: String, hierarchy: Hierarchy },
    /// A whole document
    Document { title: String },
}

impl LabelVariant {
    pub fn content(title: impl Into<String>) -> Self {
        LabelVariant::Content {
            title: title.into(),
            hierarchy: Hierarchy::default(),
        }
    }

    pub fn document(title: impl Into<String>) -> Self {
        LabelVariant::Document {
            title: title.into(),
        }
    }
}

/// A numbered reference point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub doc_id: String,
    pub id: String,
    /// Categories from least to most specific, e.g. `["heading", "chapter"]`
    pub kind: Vec<String>,
    /// One count per kind entry; `None` until registered
    pub order: Option<Vec<u32>>,
    pub variant: LabelVariant,
}

impl Label {
    pub fn new(
        doc_id: impl Into<String>,
        id: impl Into<String>,
        kind: Vec<String>,
        variant: LabelVariant,
    ) -> Self {
        Label {
            doc_id: doc_id.into(),
            id: id.into(),
            kind,
            order: None,
            variant,
        }
    }

    pub fn key(&self) -> LabelKey {
        LabelKey::new(&self.doc_id, &self.id)
    }

    /// The count for the most specific kind
    pub fn number(&self) -> Option<u32> {
        self.order.as_ref().and_then(|order| order.last().copied())
    }

    pub fn most_specific_kind(&self) -> Option<&str> {
        self.kind.last().map(String::as_str)
    }

    pub fn has_kind(&self, kind: &str) -> bool {
        self.kind.iter().any(|k| k == kind)
    }

    pub fn title(&self) -> Option<&str> {
        match &self.variant {
            LabelVariant::Content { title, .. } | LabelVariant::Document { title } => Some(title),
            LabelVariant::Plain => None,
        }
    }

    pub fn is_document(&self) -> bool {
        matches!(self.variant, LabelVariant::Document { .. })
    }

    pub fn is_content(&self) -> bool {
        matches!(self.variant, LabelVariant::Content { .. })
    }

    pub fn hierarchy(&self) -> Option<&Hierarchy> {
        match &self.variant {
            LabelVariant::Content { hierarchy, .. } => Some(hierarchy),
            _ => None,
        }
    }

    /// Number of the enclosing heading at `level`
    pub fn level_number(&self, level: HeadingLevel) -> Option<u32> {
        self.hierarchy()?.get(level)?.number
    }

    /// Title of the enclosing heading at `level`
    pub fn level_title(&self, level: HeadingLevel) -> Option<&str> {
        self.hierarchy()?.get(level).map(|r| r.title.as_str())
    }

    pub fn part_number(&self) -> Option<u32> {
        self.level_number(HeadingLevel::Part)
    }

    pub fn chapter_number(&self) -> Option<u32> {
        self.level_number(HeadingLevel::Chapter)
    }

    pub fn section_number(&self) -> Option<u32> {
        self.level_number(HeadingLevel::Section)
    }

    pub fn subsection_number(&self) -> Option<u32> {
        self.level_number(HeadingLevel::Subsection)
    }

    pub fn subsubsection_number(&self) -> Option<u32> {
        self.level_number(HeadingLevel::Subsubsection)
    }

    pub fn part_title(&self) -> Option<&str> {
        self.level_title(HeadingLevel::Part)
    }

    pub fn chapter_title(&self) -> Option<&str> {
        self.level_title(HeadingLevel::Chapter)
    }

    pub fn section_title(&self) -> Option<&str> {
        self.level_title(HeadingLevel::Section)
    }

    pub fn subsection_title(&self) -> Option<&str> {
        self.level_title(HeadingLevel::Subsection)
    }

    pub fn subsubsection_title(&self) -> Option<&str> {
        self.level_title(HeadingLevel::Subsubsection)
    }

    /// Enclosing heading numbers joined with '.'; empty for non-content labels
    pub fn tree_number(&self) -> String {
        self.hierarchy().map(Hierarchy::tree_number).unwrap_or_default()
    }
}
