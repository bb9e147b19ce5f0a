//! Search highlight render plans
//!
//! Highlighting is computed as a pure function from the page's items, the
//! converted matches and the current selection to a [`MatchRenderPlan`]:
//! for each affected item, the list of spans it should display. Applying
//! the plan to on-screen nodes is the overlay's job.

use crate::find::FindController;
use crate::matching::{MatchPosition, TextMatch};
use crate::text_content::{char_slice, TextItem};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which part of a match a highlight covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightPart {
    /// The whole match lies in one item
    Single,
    /// First item of a multi-item match
    Begin,
    /// Item fully inside a multi-item match
    Middle,
    /// Last item of a multi-item match
    End,
}

/// Highlight styling for a span or a whole node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightClass {
    pub part: HighlightPart,
    pub selected: bool,
}

impl HighlightClass {
    pub fn new(part: HighlightPart, selected: bool) -> Self {
        Self { part, selected }
    }

    /// Space-separated class list, e.g. `"highlight begin selected"`
    pub fn class_name(&self) -> String {
        let mut name = String::from("highlight");
        match self.part {
            HighlightPart::Single => {}
            HighlightPart::Begin => name.push_str(" begin"),
            HighlightPart::Middle => name.push_str(" middle"),
            HighlightPart::End => name.push_str(" end"),
        }
        if self.selected {
            name.push_str(" selected");
        }
        name
    }
}

/// A run of an item's text, optionally highlighted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanDescriptor {
    /// Start offset in `char`s within the item
    pub start: usize,
    /// Exclusive end offset in `char`s
    pub end: usize,
    pub text: String,
    pub class: Option<HighlightClass>,
}

/// How one item is displayed while matches are shown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FragmentRender {
    /// The item's text split into plain and highlighted spans
    Spans { spans: Vec<SpanDescriptor> },
    /// The item's full text with a class on the node itself
    Whole { class: HighlightClass },
}

impl FragmentRender {
    /// Text this render displays for `item`
    pub fn display_text(&self, item: &TextItem) -> String {
        match self {
            FragmentRender::Spans { spans } => spans.iter().map(|span| span.text.as_str()).collect(),
            FragmentRender::Whole { .. } => item.text.clone(),
        }
    }

    /// Highlighted spans only
    pub fn highlighted(&self) -> Vec<&SpanDescriptor> {
        match self {
            FragmentRender::Spans { spans } => {
                spans.iter().filter(|span| span.class.is_some()).collect()
            }
            FragmentRender::Whole { .. } => Vec::new(),
        }
    }
}

/// Which matches to show on a page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchSelection {
    /// This page holds the selected match
    pub is_selected_page: bool,
    /// Index of the selected match within this page's matches
    pub selected_match: Option<usize>,
    pub highlight_all: bool,
    /// Suppress scroll-into-view
    pub presentation_mode: bool,
}

impl MatchSelection {
    /// Selection for `page_index` as seen by a find controller
    pub fn for_page(controller: &dyn FindController, page_index: usize, presentation_mode: bool) -> Self {
        let selected = controller.selected();
        let is_selected_page = selected.is_some_and(|s| s.page_index == page_index);

        Self {
            is_selected_page,
            selected_match: selected.filter(|_| is_selected_page).map(|s| s.match_index),
            highlight_all: controller.highlight_all(),
            presentation_mode,
        }
    }
}

/// Per-item spans for the matches being shown, plus a scroll request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRenderPlan {
    /// Render instructions keyed by item index; absent items stay plain
    pub items: BTreeMap<usize, FragmentRender>,
    /// Item to scroll into view (begin of the selected match)
    pub scroll_to: Option<usize>,
}

impl MatchRenderPlan {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.scroll_to.is_none()
    }
}

/// Build the render plan for a page's matches
///
/// With `highlight_all` off only the selected match is shown, and only on
/// the selected page; any other page gets an empty plan. Matches that start
/// before the previous shown match ended are skipped.
pub fn plan_matches(
    items: &[TextItem],
    matches: &[TextMatch],
    selection: &MatchSelection,
) -> MatchRenderPlan {
    let mut plan = PlanBuilder { items, plan: MatchRenderPlan::default() };
    if matches.is_empty() {
        return plan.plan;
    }

    let range = if selection.highlight_all {
        0..matches.len()
    } else if selection.is_selected_page {
        match selection.selected_match {
            Some(index) if index < matches.len() => index..index + 1,
            _ => return plan.plan,
        }
    } else {
        return plan.plan;
    };

    let mut previous_end: Option<MatchPosition> = None;

    for index in range {
        let TextMatch { begin, end } = matches[index];

        if begin.item_index >= items.len() || previous_end.is_some_and(|previous| begin < previous) {
            tracing::debug!(match_index = index, "skipping overlapping or misplaced match");
            continue;
        }
        let end = end.min(MatchPosition::new(items.len() - 1, usize::MAX));

        let selected = selection.is_selected_page && selection.selected_match == Some(index);
        if selected && !selection.presentation_mode {
            plan.plan.scroll_to = Some(begin.item_index);
        }

        match previous_end {
            Some(previous) if previous.item_index == begin.item_index => {
                plan.append(begin.item_index, previous.offset, begin.offset, None);
            }
            Some(previous) => {
                plan.append(previous.item_index, previous.offset, usize::MAX, None);
                plan.restart(begin.item_index, begin.offset, None);
            }
            None => plan.restart(begin.item_index, begin.offset, None),
        }

        if begin.item_index == end.item_index {
            let class = HighlightClass::new(HighlightPart::Single, selected);
            plan.append(begin.item_index, begin.offset, end.offset, Some(class));
        } else {
            let class = HighlightClass::new(HighlightPart::Begin, selected);
            plan.append(begin.item_index, begin.offset, usize::MAX, Some(class));

            for middle in begin.item_index + 1..end.item_index {
                plan.whole(middle, HighlightClass::new(HighlightPart::Middle, selected));
            }

            let class = HighlightClass::new(HighlightPart::End, selected);
            plan.restart(end.item_index, end.offset, Some(class));
        }

        previous_end = Some(end);
    }

    if let Some(previous) = previous_end {
        plan.append(previous.item_index, previous.offset, usize::MAX, None);
    }

    plan.plan
}

struct PlanBuilder<'a> {
    items: &'a [TextItem],
    plan: MatchRenderPlan,
}

impl PlanBuilder<'_> {
    /// Reset an item to a single span covering `0..upto`
    fn restart(&mut self, item_index: usize, upto: usize, class: Option<HighlightClass>) {
        self.plan.items.insert(item_index, FragmentRender::Spans { spans: Vec::new() });
        self.append(item_index, 0, upto, class);
    }

    /// Append `from..to` of an item's text; `to` is clamped to the item
    fn append(&mut self, item_index: usize, from: usize, to: usize, class: Option<HighlightClass>) {
        let Some(item) = self.items.get(item_index) else {
            return;
        };

        let to = to.min(item.char_len());
        if class.is_none() && from >= to {
            return;
        }
        let from = from.min(to);

        let span = SpanDescriptor {
            start: from,
            end: to,
            text: char_slice(&item.text, from, to).to_string(),
            class,
        };

        let entry = self
            .plan
            .items
            .entry(item_index)
            .or_insert_with(|| FragmentRender::Spans { spans: Vec::new() });

        match entry {
            FragmentRender::Spans { spans } => spans.push(span),
            FragmentRender::Whole { .. } => *entry = FragmentRender::Spans { spans: vec![span] },
        }
    }

    fn whole(&mut self, item_index: usize, class: HighlightClass) {
        if item_index < self.items.len() {
            self.plan.items.insert(item_index, FragmentRender::Whole { class });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::find::{FindState, SelectedMatch};
    use crate::geometry::Transform;
    use crate::matching::convert_matches;

    fn items(parts: &[&str]) -> Vec<TextItem> {
        parts.iter().map(|p| TextItem::new(*p, Transform::IDENTITY, "f1")).collect()
    }

    fn selected(index: usize) -> MatchSelection {
        MatchSelection {
            is_selected_page: true,
            selected_match: Some(index),
            highlight_all: false,
            presentation_mode: false,
        }
    }

    fn span(start: usize, end: usize, text: &str, class: Option<HighlightClass>) -> SpanDescriptor {
        SpanDescriptor { start, end, text: text.to_string(), class }
    }

    #[test]
    fn test_class_names() {
        assert_eq!(HighlightClass::new(HighlightPart::Single, false).class_name(), "highlight");
        assert_eq!(
            HighlightClass::new(HighlightPart::Begin, true).class_name(),
            "highlight begin selected"
        );
        assert_eq!(HighlightClass::new(HighlightPart::Middle, false).class_name(), "highlight middle");
        assert_eq!(HighlightClass::new(HighlightPart::End, false).class_name(), "highlight end");
    }

    #[test]
    fn test_match_across_two_items() {
        let items = items(&["Hello ", "World"]);
        let converted = convert_matches(&items, &[4], 3);
        let plan = plan_matches(&items, &converted.matches, &selected(0));

        let begin = HighlightClass::new(HighlightPart::Begin, true);
        let end = HighlightClass::new(HighlightPart::End, true);

        assert_eq!(
            plan.items[&0],
            FragmentRender::Spans {
                spans: vec![span(0, 4, "Hell", None), span(4, 6, "o ", Some(begin))]
            }
        );
        assert_eq!(
            plan.items[&1],
            FragmentRender::Spans {
                spans: vec![span(0, 1, "W", Some(end)), span(1, 5, "orld", None)]
            }
        );
        assert_eq!(plan.scroll_to, Some(0));
    }

    #[test]
    fn test_single_item_match() {
        let items = items(&["Hello World"]);
        let converted = convert_matches(&items, &[6], 5);
        let plan = plan_matches(&items, &converted.matches, &selected(0));

        let class = HighlightClass::new(HighlightPart::Single, true);
        assert_eq!(
            plan.items[&0],
            FragmentRender::Spans {
                spans: vec![span(0, 6, "Hello ", None), span(6, 11, "World", Some(class))]
            }
        );
    }

    #[test]
    fn test_middle_items_get_whole_class() {
        let items = items(&["ab", "cd", "ef", "gh"]);
        let converted = convert_matches(&items, &[1], 6);
        let plan = plan_matches(&items, &converted.matches, &selected(0));

        let middle = HighlightClass::new(HighlightPart::Middle, true);
        assert_eq!(plan.items[&1], FragmentRender::Whole { class: middle });
        assert_eq!(plan.items[&2], FragmentRender::Whole { class: middle });
        assert_eq!(plan.items[&3].highlighted()[0].text, "g");
        assert_eq!(plan.items[&0].highlighted()[0].text, "b");
    }

    #[test]
    fn test_highlight_all_marks_only_selected() {
        let items = items(&["one two one two one"]);
        let converted = convert_matches(&items, &[0, 8, 16], 3);
        let selection = MatchSelection { highlight_all: true, ..selected(1) };
        let plan = plan_matches(&items, &converted.matches, &selection);

        let rendered = &plan.items[&0];
        let highlighted = rendered.highlighted();
        assert_eq!(highlighted.len(), 3);
        assert_eq!(
            highlighted.iter().map(|s| s.class.unwrap().selected).collect::<Vec<_>>(),
            vec![false, true, false]
        );
        assert_eq!(rendered.display_text(&items[0]), items[0].text);
    }

    #[test]
    fn test_display_text_is_preserved_for_every_item() {
        let parts = ["The quick ", "brown", " fox jumps ", "over the ", "lazy dog."];
        let items = items(&parts);
        let full: String = parts.concat();
        let offsets = crate::find::find_offsets(&full, "o", true);
        let converted = convert_matches(&items, &offsets, 1);

        let selection = MatchSelection { highlight_all: true, ..MatchSelection::default() };
        let plan = plan_matches(&items, &converted.matches, &selection);

        for (index, render) in &plan.items {
            assert_eq!(render.display_text(&items[*index]), items[*index].text);
        }
        assert_eq!(plan.scroll_to, None);
    }

    #[test]
    fn test_not_selected_page_without_highlight_all_is_empty() {
        let items = items(&["Hello World"]);
        let converted = convert_matches(&items, &[0], 5);
        let selection = MatchSelection {
            is_selected_page: false,
            selected_match: None,
            highlight_all: false,
            presentation_mode: false,
        };

        assert!(plan_matches(&items, &converted.matches, &selection).is_empty());
    }

    #[test]
    fn test_presentation_mode_suppresses_scroll() {
        let items = items(&["Hello World"]);
        let converted = convert_matches(&items, &[0], 5);
        let selection = MatchSelection { presentation_mode: true, ..selected(0) };

        let plan = plan_matches(&items, &converted.matches, &selection);
        assert_eq!(plan.scroll_to, None);
        assert!(!plan.items.is_empty());
    }

    #[test]
    fn test_selection_from_controller() {
        let state = FindState {
            active: true,
            highlight_all: false,
            query: "x".to_string(),
            page_matches: vec![vec![0], vec![1, 2]],
            selected: Some(SelectedMatch { page_index: 1, match_index: 1 }),
        };

        let other = MatchSelection::for_page(&state, 0, false);
        assert!(!other.is_selected_page);
        assert_eq!(other.selected_match, None);

        let this = MatchSelection::for_page(&state, 1, false);
        assert!(this.is_selected_page);
        assert_eq!(this.selected_match, Some(1));
    }

    #[test]
    fn test_overlapping_match_is_skipped() {
        let items = items(&["aaaa"]);
        let matches = vec![
            TextMatch { begin: MatchPosition::new(0, 0), end: MatchPosition::new(0, 3) },
            TextMatch { begin: MatchPosition::new(0, 1), end: MatchPosition::new(0, 4) },
        ];
        let selection = MatchSelection { highlight_all: true, ..MatchSelection::default() };

        let plan = plan_matches(&items, &matches, &selection);
        assert_eq!(plan.items[&0].highlighted().len(), 1);
        assert_eq!(plan.items[&0].display_text(&items[0]), "aaaa");
    }
}
