//! Spatial grounding: tie an extracted value back to where it sits on the
//! page.
//!
//! Matching is a cascade of five strategies, cheapest first. Each strategy
//! either produces a plausible normalized location or yields to the next;
//! a field that no strategy can place simply has no location. Coordinates
//! are never invented.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::config;
use crate::models::{FieldLocation, OcrLayout, TextBlock};

/// Which rung of the cascade produced a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroundingStrategy {
    Exact,
    Fuzzy,
    Partial,
    Pattern,
    Contextual,
}

impl GroundingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroundingStrategy::Exact => "exact",
            GroundingStrategy::Fuzzy => "fuzzy",
            GroundingStrategy::Partial => "partial",
            GroundingStrategy::Pattern => "pattern",
            GroundingStrategy::Contextual => "contextual",
        }
    }
}

static DATE_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,4}[-/.]\d{1,2}[-/.]\d{1,4}$").unwrap());
static AMOUNT_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[$€£¥]?\s?\d[\d,]*(\.\d+)?$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueShape {
    Date,
    Percentage,
    Phone,
    Amount,
    Identifier,
}

/// Locate `value` within the OCR layout, trying each strategy in order.
///
/// Returns `None` when the layout is empty, the image dimensions are
/// degenerate, or no strategy finds a plausible placement.
pub fn locate_field(
    field_name: &str,
    value: &str,
    layout: &OcrLayout,
) -> Option<(FieldLocation, GroundingStrategy)> {
    let value = value.trim();
    let (img_w, img_h) = layout.image_dimensions;
    if value.is_empty() || layout.text_blocks.is_empty() || img_w == 0 || img_h == 0 {
        return None;
    }

    let strategies: [(GroundingStrategy, fn(&str, &str, &OcrLayout) -> Option<usize>); 5] = [
        (GroundingStrategy::Exact, match_exact),
        (GroundingStrategy::Fuzzy, match_fuzzy),
        (GroundingStrategy::Partial, match_partial),
        (GroundingStrategy::Pattern, match_pattern),
        (GroundingStrategy::Contextual, match_contextual),
    ];

    for (strategy, matcher) in strategies {
        if let Some(index) = matcher(field_name, value, layout) {
            let block = &layout.text_blocks[index];
            if let Some(location) = normalize_block(block, value, (img_w, img_h)) {
                debug!(
                    field = field_name,
                    strategy = strategy.as_str(),
                    "grounded field to text block"
                );
                return Some((location, strategy));
            }
            // Implausible placement: let the next strategy try.
        }
    }

    None
}

// ── cascade strategies ──────────────────────────────────────────────────

/// Case-insensitive equality on trimmed text.
fn match_exact(_field: &str, value: &str, layout: &OcrLayout) -> Option<usize> {
    let needle = value.to_lowercase();
    layout
        .text_blocks
        .iter()
        .position(|b| b.text.trim().to_lowercase() == needle)
}

/// Best normalized edit-distance similarity at or above the threshold.
/// Ties go to the earliest block.
fn match_fuzzy(_field: &str, value: &str, layout: &OcrLayout) -> Option<usize> {
    let needle = value.to_lowercase();
    let mut best: Option<(usize, f32)> = None;
    for (i, block) in layout.text_blocks.iter().enumerate() {
        let candidate = block.text.trim().to_lowercase();
        if candidate.is_empty() {
            continue;
        }
        let sim = similarity(&needle, &candidate);
        if sim >= config::FUZZY_MATCH_THRESHOLD && best.map_or(true, |(_, s)| sim > s) {
            best = Some((i, sim));
        }
    }
    best.map(|(i, _)| i)
}

/// Containment matching. Long values match a block carrying at least half
/// of their significant tokens; short values need a mutual substring with
/// a minimum length so tiny fragments don't latch onto everything.
fn match_partial(_field: &str, value: &str, layout: &OcrLayout) -> Option<usize> {
    let needle = value.to_lowercase();
    if needle.chars().count() > config::PARTIAL_LONG_VALUE_LEN {
        let tokens: Vec<&str> = needle
            .split_whitespace()
            .filter(|t| t.chars().count() > 3)
            .collect();
        if tokens.is_empty() {
            return None;
        }
        return layout.text_blocks.iter().position(|b| {
            let text = b.text.to_lowercase();
            let hits = tokens.iter().filter(|t| text.contains(*t)).count();
            hits * 2 >= tokens.len()
        });
    }

    layout.text_blocks.iter().position(|b| {
        let text = b.text.trim().to_lowercase();
        let shorter = needle.chars().count().min(text.chars().count());
        shorter >= config::PARTIAL_MIN_SUBSTRING_LEN
            && (text.contains(&needle) || needle.contains(&text))
    })
}

/// Same value shape (date, amount, phone, ...) plus a shared alphanumeric
/// run, so "1,240.00" can land on "$1,240.00" even after symbol drift.
fn match_pattern(_field: &str, value: &str, layout: &OcrLayout) -> Option<usize> {
    let shape = classify_shape(value)?;
    let needle_runs = alphanumeric_only(value);
    layout.text_blocks.iter().position(|b| {
        let text = b.text.trim();
        classify_shape(text) == Some(shape) && shares_run(&needle_runs, &alphanumeric_only(text), 3)
    })
}

/// Semantic label categories the contextual strategy can anchor on.
const LABEL_KEYWORDS: &[&str] = &["total", "amount", "date", "number", "name", "address"];

/// Label-anchored fallback: find a block carrying one of the field's
/// category keywords, then take the first of the next few blocks in
/// reading order whose text actually matches the value. A label with only
/// unrelated neighbors grounds nothing.
fn match_contextual(field: &str, value: &str, layout: &OcrLayout) -> Option<usize> {
    let field_lower = field.to_lowercase();
    let categories: Vec<&str> = LABEL_KEYWORDS
        .iter()
        .copied()
        .filter(|k| field_lower.contains(k))
        .collect();
    if categories.is_empty() {
        return None;
    }

    let mut order: Vec<usize> = (0..layout.text_blocks.len()).collect();
    order.sort_by_key(|&i| {
        let b = &layout.text_blocks[i].bounding_box;
        (b.y1, b.x1)
    });

    let needle = value.to_lowercase();
    for (pos, &i) in order.iter().enumerate() {
        let text = layout.text_blocks[i].text.to_lowercase();
        if !categories.iter().any(|k| text.contains(k)) {
            continue;
        }
        for &j in order
            .iter()
            .skip(pos + 1)
            .take(config::CONTEXT_SCAN_WINDOW)
        {
            let candidate = layout.text_blocks[j].text.trim().to_lowercase();
            if candidate.is_empty() {
                continue;
            }
            if candidate.contains(&needle) || needle.contains(&candidate) {
                return Some(j);
            }
        }
    }
    None
}

// ── shape classification ────────────────────────────────────────────────

fn classify_shape(value: &str) -> Option<ValueShape> {
    let value = value.trim();
    if DATE_SHAPE.is_match(value) {
        return Some(ValueShape::Date);
    }
    if value.contains('%') && value.chars().any(|c| c.is_ascii_digit()) {
        return Some(ValueShape::Percentage);
    }
    // Amount outranks the bare digit-count phone test so "1234567.89"
    // stays an amount.
    if AMOUNT_SHAPE.is_match(value) {
        return Some(ValueShape::Amount);
    }
    let digits = value.chars().filter(|c| c.is_ascii_digit()).count();
    if (config::PHONE_MIN_DIGITS..=config::PHONE_MAX_DIGITS).contains(&digits)
        && value
            .chars()
            .all(|c| c.is_ascii_digit() || " ()+-.".contains(c))
    {
        return Some(ValueShape::Phone);
    }
    if digits > 0 && value.chars().any(|c| c.is_alphabetic() || c == '-') {
        return Some(ValueShape::Identifier);
    }
    None
}

fn alphanumeric_only(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

/// Whether any `min_len`-character window of `a` occurs inside `b`.
fn shares_run(a: &str, b: &str, min_len: usize) -> bool {
    let chars: Vec<char> = a.chars().collect();
    if chars.len() < min_len || b.is_empty() {
        return false;
    }
    chars
        .windows(min_len)
        .any(|w| b.contains(&w.iter().collect::<String>()))
}

// ── similarity ──────────────────────────────────────────────────────────

fn similarity(a: &str, b: &str) -> f32 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - edit_distance(a, b) as f32 / max_len as f32
}

fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

// ── normalization and refinement ────────────────────────────────────────

/// Convert a pixel bounding box into page-relative coordinates, widen it
/// to a legible minimum for the value's length, clamp to the page, and
/// reject implausible placements.
fn normalize_block(
    block: &TextBlock,
    value: &str,
    (img_w, img_h): (u32, u32),
) -> Option<FieldLocation> {
    let bb = &block.bounding_box;
    let mut location = FieldLocation {
        x: bb.x1 as f32 / img_w as f32,
        y: bb.y1 as f32 / img_h as f32,
        width: bb.width() as f32 / img_w as f32,
        height: bb.height() as f32 / img_h as f32,
    };

    let min_width = config::MIN_LEGIBLE_WIDTH
        .max(config::LEGIBLE_WIDTH_PER_CHAR * value.chars().count() as f32);
    location.width = location.width.max(min_width).min(1.0);
    location.height = location.height.max(config::MIN_LEGIBLE_HEIGHT).min(1.0);
    location.x = location.x.min(1.0 - location.width).max(0.0);
    location.y = location.y.min(1.0 - location.height).max(0.0);

    location.is_plausible().then_some(location)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BoundingBox;

    fn block(text: &str, x1: u32, y1: u32, x2: u32, y2: u32) -> TextBlock {
        TextBlock {
            text: text.to_string(),
            confidence: 0.9,
            bounding_box: BoundingBox { x1, y1, x2, y2 },
            font_size: 12,
            line_number: 0,
        }
    }

    fn layout(blocks: Vec<TextBlock>) -> OcrLayout {
        let full_text = blocks
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        OcrLayout {
            text_blocks: blocks,
            image_dimensions: (1000, 1200),
            full_text,
            overall_confidence: 0.9,
        }
    }

    #[test]
    fn exact_match_normalizes_coordinates() {
        let layout = layout(vec![
            block("Invoice", 50, 40, 200, 70),
            block("INV-2025-001", 100, 200, 300, 220),
        ]);

        let (loc, strategy) = locate_field("invoice_number", "INV-2025-001", &layout)
            .expect("should ground exactly");
        assert_eq!(strategy, GroundingStrategy::Exact);
        assert!((loc.x - 0.10).abs() < 1e-4);
        assert!((loc.y - 0.1667).abs() < 1e-3);
        assert!((loc.width - 0.20).abs() < 1e-4);
        assert!((loc.height - 0.0167).abs() < 1e-3);
    }

    #[test]
    fn exact_match_is_case_insensitive() {
        let layout = layout(vec![block("ACME CORP", 100, 100, 400, 130)]);
        let (_, strategy) = locate_field("vendor_name", "Acme Corp", &layout).unwrap();
        assert_eq!(strategy, GroundingStrategy::Exact);
    }

    #[test]
    fn fuzzy_catches_ocr_noise() {
        let layout = layout(vec![block("INV-2O25-001", 100, 200, 300, 220)]);
        let (_, strategy) = locate_field("invoice_number", "INV-2025-001", &layout).unwrap();
        assert_eq!(strategy, GroundingStrategy::Fuzzy);
    }

    #[test]
    fn fuzzy_rejects_below_threshold() {
        let layout = layout(vec![block("completely different", 100, 200, 300, 220)]);
        assert!(locate_field("invoice_number", "INV-2025-001", &layout).is_none());
    }

    #[test]
    fn partial_matches_long_values_by_tokens() {
        let layout = layout(vec![block(
            "Remit to: Acme Industrial Supplies Incorporated",
            50,
            300,
            700,
            330,
        )]);
        let (_, strategy) = locate_field(
            "vendor_name",
            "Acme Industrial Supplies Incorporated West",
            &layout,
        )
        .unwrap();
        assert_eq!(strategy, GroundingStrategy::Partial);
    }

    #[test]
    fn partial_short_values_need_minimum_overlap() {
        // "42" appearing inside another block must not ground.
        let layout = layout(vec![block("Order 4217 pending", 50, 300, 400, 330)]);
        assert!(locate_field("quantity", "42", &layout).is_none());
    }

    #[test]
    fn pattern_matches_amount_despite_symbol_drift() {
        let layout = layout(vec![
            block("Subtotal", 50, 500, 200, 530),
            block("$1,240.00", 600, 500, 760, 530),
        ]);
        let (_, strategy) = locate_field("total_amount", "1240.00", &layout).unwrap();
        assert_eq!(strategy, GroundingStrategy::Pattern);
    }

    #[test]
    fn identifier_shape_is_not_a_date() {
        assert_eq!(classify_shape("INV-2025-001"), Some(ValueShape::Identifier));
        assert_eq!(classify_shape("01-15-2024"), Some(ValueShape::Date));
        assert_eq!(classify_shape("95%"), Some(ValueShape::Percentage));
        assert_eq!(classify_shape("+1 555 123 4567"), Some(ValueShape::Phone));
        assert_eq!(classify_shape("$99.50"), Some(ValueShape::Amount));
        // Long unsymboled amounts are amounts, not phone numbers.
        assert_eq!(classify_shape("1234567.89"), Some(ValueShape::Amount));
        assert_eq!(classify_shape("hello"), None);
    }

    #[test]
    fn contextual_grounds_value_next_to_its_label() {
        let layout = layout(vec![
            block("Total Due", 50, 900, 250, 930),
            block("42.00 USD", 600, 900, 760, 930),
        ]);
        // Too short for the partial substring guard, too different for
        // fuzzy; the label anchors the containment check on its neighbor.
        let (_, strategy) = locate_field("total_amount", "42.00", &layout).unwrap();
        assert_eq!(strategy, GroundingStrategy::Contextual);
    }

    #[test]
    fn contextual_requires_a_value_match_not_just_digits() {
        // A phone number sitting next to the label must not claim the
        // amount; with no real match anywhere the location stays absent.
        let layout = layout(vec![
            block("Total Due", 50, 900, 250, 930),
            block("Call us: 555-867-5309", 600, 900, 900, 930),
        ]);
        assert!(locate_field("total_amount", "1850.00", &layout).is_none());
    }

    #[test]
    fn contextual_needs_a_semantic_category() {
        // "quantity" matches no label category, so even an adjacent block
        // containing the value does not ground contextually.
        let layout = layout(vec![
            block("Quantity", 50, 500, 200, 530),
            block("7 pcs", 600, 500, 700, 530),
        ]);
        assert!(locate_field("quantity", "7", &layout).is_none());
    }

    #[test]
    fn empty_layout_grounds_nothing() {
        let empty = OcrLayout::empty((1000, 1200));
        assert!(locate_field("total_amount", "42.00", &empty).is_none());
    }

    #[test]
    fn zero_dimensions_ground_nothing() {
        let mut l = layout(vec![block("42.00", 100, 100, 200, 130)]);
        l.image_dimensions = (0, 0);
        assert!(locate_field("total_amount", "42.00", &l).is_none());
    }

    #[test]
    fn tiny_boxes_widened_to_legible_minimum() {
        let l = layout(vec![block("INV-2025-001", 100, 200, 105, 202)]);
        let (loc, _) = locate_field("invoice_number", "INV-2025-001", &l).unwrap();
        // 12 chars * 0.008 = 0.096 beats the 0.02 floor.
        assert!((loc.width - 0.096).abs() < 1e-4);
        assert!((loc.height - 0.015).abs() < 1e-4);
    }

    #[test]
    fn oversized_boxes_are_rejected_not_fabricated() {
        // A block spanning the whole page is not a plausible field home.
        let l = layout(vec![block("INV-2025-001", 0, 0, 1000, 1200)]);
        assert!(locate_field("invoice_number", "INV-2025-001", &l).is_none());
    }

    #[test]
    fn grounding_is_deterministic() {
        let l = layout(vec![
            block("Invoice", 50, 40, 200, 70),
            block("INV-2025-001", 100, 200, 300, 220),
            block("INV-2025-001", 100, 600, 300, 620),
        ]);
        let first = locate_field("invoice_number", "INV-2025-001", &l);
        for _ in 0..5 {
            assert_eq!(locate_field("invoice_number", "INV-2025-001", &l), first);
        }
    }

    #[test]
    fn edit_distance_basics() {
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("same", "same"), 0);
    }
}
