//! Construction of concrete tags

use super::node::{Tag, TagContent};
use crate::domain::project::DocumentContext;
use crate::error::{FolioError, Result};
use std::collections::HashSet;

/// Builds the tags found by the parser.
///
/// The parser knows nothing about what a tag means; it hands every match to a
/// factory.
pub trait TagFactory: Send + Sync {
    /// Tags whose content is kept as literal text instead of being parsed
    fn is_verbatim(&self, _name: &str) -> bool {
        false
    }

    fn tag(
        &self,
        name: &str,
        content: TagContent,
        attributes: Option<&str>,
        context: &DocumentContext,
    ) -> Result<Tag>;
}

/// Factory building plain [`Tag`]s
#[derive(Debug, Clone, Default)]
pub struct StandardTagFactory {
    verbatim: HashSet<String>,
    allowed: Option<HashSet<String>>,
}

impl StandardTagFactory {
    pub fn new<I, S>(verbatim: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StandardTagFactory {
            verbatim: verbatim.into_iter().map(Into::into).collect(),
            allowed: None,
        }
    }

    /// Only accept the given tag names (verbatim tags are always accepted)
    pub fn restrict_to<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed = Some(names.into_iter().map(Into::into).collect());
        self
    }
}

impl TagFactory for StandardTagFactory {
    fn is_verbatim(&self, name: &str) -> bool {
        self.verbatim.contains(name)
    }

    fn tag(
        &self,
        name: &str,
        content: TagContent,
        attributes: Option<&str>,
        _context: &DocumentContext,
    ) -> Result<Tag> {
        if let Some(allowed) = &self.allowed {
            if !allowed.contains(name) && !self.is_verbatim(name) {
                return Err(FolioError::UnknownTag(name.to_string()));
            }
        }
        Ok(Tag::new(name, content, attributes.map(str::to_string)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbatim_names() {
        let factory = StandardTagFactory::new(["verb"]);
        assert!(factory.is_verbatim("verb"));
        assert!(!factory.is_verbatim("b"));
    }

    #[test]
    fn test_restricted_factory_rejects_unknown() {
        let context = DocumentContext::standalone("main");
        let factory = StandardTagFactory::new(["verb"]).restrict_to(["b", "i"]);

        assert!(factory
            .tag("b", TagContent::Nodes(vec![]), None, &context)
            .is_ok());
        assert!(factory
            .tag("verb", TagContent::Nodes(vec![]), None, &context)
            .is_ok());
        assert!(matches!(
            factory.tag("blink", TagContent::Nodes(vec![]), None, &context),
            Err(FolioError::UnknownTag(name)) if name == "blink"
        ));
    }

    #[test]
    fn test_attributes_copied() {
        let context = DocumentContext::standalone("main");
        let tag = StandardTagFactory::default()
            .tag(
                "figure",
                TagContent::Markup("x".to_string()),
                Some("id=fig:1"),
                &context,
            )
            .unwrap();
        assert_eq!(tag.attribute("id"), Some("fig:1"));
    }
}
