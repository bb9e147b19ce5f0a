//! Conversion from search offsets to text item positions
//!
//! Search results arrive as start offsets into the page's concatenated text.
//! The overlay needs them as `(item index, char offset)` pairs. Both the
//! match list and the item walk move forward only, so a single pass over the
//! items converts all matches.
//!
//! Boundary rule: a begin offset equal to an item's end belongs to the next
//! item, while an end offset equal to an item's end stays in that item with
//! `offset == item length`.

use crate::error::Anomaly;
use crate::text_content::TextItem;
use serde::{Deserialize, Serialize};

/// Position inside one text item
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MatchPosition {
    pub item_index: usize,
    /// Offset in `char`s within the item
    pub offset: usize,
}

impl MatchPosition {
    pub fn new(item_index: usize, offset: usize) -> Self {
        Self { item_index, offset }
    }
}

/// A contiguous matched range over the page's items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMatch {
    pub begin: MatchPosition,
    /// Exclusive end
    pub end: MatchPosition,
}

/// Matches converted for one page plus any inconsistencies found
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvertedMatches {
    pub matches: Vec<TextMatch>,
    pub anomalies: Vec<Anomaly>,
}

/// Convert page-level match offsets into item positions
///
/// Offsets past the end of the page text clamp to the last item and are
/// reported as [`Anomaly::OffsetOutOfRange`]. An offset smaller than the
/// previous one is reported as [`Anomaly::OutOfOrder`]; the walk never
/// moves backwards, so such a match is converted relative to the current
/// item and the plan stage skips it.
pub fn convert_matches(items: &[TextItem], offsets: &[usize], query_len: usize) -> ConvertedMatches {
    let mut converted = ConvertedMatches::default();
    if items.is_empty() {
        return converted;
    }

    let lengths: Vec<usize> = items.iter().map(TextItem::char_len).collect();
    let text_len: usize = lengths.iter().sum();
    let last = items.len() - 1;

    let mut item_index = 0;
    let mut consumed = 0;
    let mut previous_offset: Option<usize> = None;

    for (match_index, &match_offset) in offsets.iter().enumerate() {
        if previous_offset.is_some_and(|previous| match_offset < previous) {
            tracing::warn!(match_index, match_offset, "search match out of order");
            converted.anomalies.push(Anomaly::OutOfOrder { match_index });
        }
        previous_offset = Some(match_offset);

        while item_index != last && match_offset >= consumed + lengths[item_index] {
            consumed += lengths[item_index];
            item_index += 1;
        }

        if match_offset > text_len {
            tracing::warn!(match_index, match_offset, text_len, "search match begins past page text");
            converted.anomalies.push(Anomaly::OffsetOutOfRange {
                match_index,
                offset: match_offset,
                text_len,
            });
        }

        let begin = MatchPosition::new(item_index, match_offset.saturating_sub(consumed));

        let end_offset = match_offset + query_len;
        while item_index != last && end_offset > consumed + lengths[item_index] {
            consumed += lengths[item_index];
            item_index += 1;
        }

        if end_offset > text_len && match_offset <= text_len {
            tracing::warn!(match_index, end_offset, text_len, "search match ends past page text");
            converted.anomalies.push(Anomaly::OffsetOutOfRange {
                match_index,
                offset: end_offset,
                text_len,
            });
        }

        let end = MatchPosition::new(item_index, end_offset.saturating_sub(consumed));
        converted.matches.push(TextMatch { begin, end });
    }

    converted
}

/// Text covered by a converted match, read back from the items
pub fn matched_text(items: &[TextItem], text_match: &TextMatch) -> String {
    let TextMatch { begin, end } = *text_match;
    let mut text = String::new();

    for index in begin.item_index..=end.item_index {
        let Some(item) = items.get(index) else {
            break;
        };
        let from = if index == begin.item_index { begin.offset } else { 0 };
        let to = if index == end.item_index { end.offset } else { item.char_len() };
        text.push_str(crate::text_content::char_slice(&item.text, from, to));
    }

    text
}
