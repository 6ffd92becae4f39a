//! Links content labels to their enclosing headings

use super::label::{HeadingLevel, HeadingRef, Hierarchy, Label, LabelVariant};

/// Walk `labels` in registration order, tracking the most recent heading of
/// each level, and record those headings on every content label.
///
/// A content label whose most specific kind is a heading level becomes the
/// current heading for that level and clears every more specific level.
/// Labels must already be ordered and counted.
pub fn link_content_labels(labels: &mut [Label]) {
    let mut current = Hierarchy::default();

    for label in labels.iter_mut() {
        let level = label.most_specific_kind().and_then(HeadingLevel::from_name);
        let key = label.key();
        let number = label.number();

        if let LabelVariant::Content { title, hierarchy } = &mut label.variant {
            if let Some(level) = level {
                current.enter(
                    level,
                    HeadingRef {
                        key,
                        number,
                        title: title.clone(),
                    },
                );
            }
            *hierarchy = current.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::labels::ordering::assign_orders;
    use crate::infrastructure::Settings;

    fn content(id: &str, kind: &[&str], title: &str) -> Label {
        Label::new(
            "main",
            id,
            kind.iter().map(|k| k.to_string()).collect(),
            LabelVariant::content(title),
        )
    }

    fn linked(mut labels: Vec<Label>) -> Vec<Label> {
        assign_orders(&mut labels, &Settings::default_label_resets());
        link_content_labels(&mut labels);
        labels
    }

    #[test]
    fn test_figure_inside_section() {
        let labels = linked(vec![
            content("ch1", &["heading", "chapter"], "One"),
            content("s1", &["heading", "section"], "Setup"),
            content("s2", &["heading", "section"], "Method"),
            content("fig", &["figure"], "Plot"),
        ]);

        let fig = &labels[3];
        assert_eq!(fig.chapter_number(), Some(1));
        assert_eq!(fig.chapter_title(), Some("One"));
        assert_eq!(fig.section_number(), Some(2));
        assert_eq!(fig.section_title(), Some("Method"));
        assert_eq!(fig.tree_number(), "1.2");
    }

    #[test]
    fn test_heading_points_at_itself() {
        let labels = linked(vec![
            content("ch1", &["heading", "chapter"], "One"),
            content("ch2", &["heading", "chapter"], "Two"),
        ]);
        let ch2 = &labels[1];
        assert_eq!(
            ch2.hierarchy().unwrap().get(HeadingLevel::Chapter).unwrap().key.id,
            "ch2"
        );
        assert_eq!(ch2.tree_number(), "2");
    }

    #[test]
    fn test_new_chapter_clears_sections() {
        let labels = linked(vec![
            content("ch1", &["heading", "chapter"], "One"),
            content("s1", &["heading", "section"], "A"),
            content("ch2", &["heading", "chapter"], "Two"),
            content("tab", &["table"], "Numbers"),
        ]);
        let tab = &labels[3];
        assert_eq!(tab.chapter_number(), Some(2));
        assert_eq!(tab.section_number(), None);
        assert_eq!(tab.tree_number(), "2");
    }

    #[test]
    fn test_part_survives_chapters() {
        let labels = linked(vec![
            content("p1", &["heading", "part"], "Basics"),
            content("ch1", &["heading", "chapter"], "One"),
            content("ss", &["heading", "subsection"], "Deep"),
        ]);
        let ss = &labels[2];
        assert_eq!(ss.part_title(), Some("Basics"));
        assert_eq!(ss.section_number(), None);
        assert_eq!(ss.tree_number(), "1.1.1");
    }

    #[test]
    fn test_non_content_labels_untouched() {
        let mut labels = vec![
            content("ch1", &["heading", "chapter"], "One"),
            Label::new("main", "eq", vec!["equation".to_string()], LabelVariant::Plain),
        ];
        assign_orders(&mut labels, &Settings::default_label_resets());
        link_content_labels(&mut labels);
        assert_eq!(labels[1].variant, LabelVariant::Plain);
        assert_eq!(labels[1].chapter_number(), None);
    }

    #[test]
    fn test_relinking_recomputes() {
        let mut labels = linked(vec![
            content("s1", &["heading", "section"], "A"),
            content("fig", &["figure"], "Plot"),
        ]);
        assert_eq!(labels[1].section_title(), Some("A"));

        labels.remove(0);
        link_content_labels(&mut labels);
        assert_eq!(labels[0].section_title(), None);
    }
}
