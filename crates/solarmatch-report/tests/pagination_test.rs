//! Pagination invariants over arbitrary block sequences

use proptest::prelude::*;
use solarmatch_report::{Block, DrawItem, HeadingLevel, LayoutEngine, Metric, Page, PageGeometry};

fn words(max: usize) -> impl Strategy<Value = String> {
    prop::collection::vec("[a-zA-Z]{1,14}", 0..max).prop_map(|w| w.join(" "))
}

fn block_strategy() -> impl Strategy<Value = Block> {
    prop_oneof![
        (
            words(12),
            prop_oneof![
                Just(HeadingLevel::Title),
                Just(HeadingLevel::Section),
                Just(HeadingLevel::Subsection)
            ]
        )
            .prop_map(|(text, level)| Block::heading(text, level)),
        words(600).prop_map(Block::paragraph),
        words(80).prop_map(Block::fine_print),
        prop::collection::vec(words(60), 0..8).prop_map(Block::Bullets),
        prop::collection::vec((words(10), words(6)), 0..9).prop_map(|cells| {
            Block::MetricGrid(
                cells
                    .into_iter()
                    .map(|(label, value)| Metric::new(label, value))
                    .collect(),
            )
        }),
        (1u32..4000, 1u32..4000, words(20)).prop_map(|(w, h, caption)| Block::Image {
            image: 0,
            pixel_width: w,
            pixel_height: h,
            caption,
        }),
        (words(8), words(120)).prop_map(|(title, reason)| Block::placeholder(title, reason)),
    ]
}

fn layout(blocks: Vec<Block>) -> Vec<Page> {
    let mut engine = LayoutEngine::new(PageGeometry::A4);
    for block in blocks {
        engine.place(block);
    }
    engine.finish()
}

proptest! {
    #[test]
    fn blocks_never_cross_the_margins(blocks in prop::collection::vec(block_strategy(), 0..30)) {
        let geometry = PageGeometry::A4;
        let pages = layout(blocks);

        for page in &pages {
            for block in &page.blocks {
                prop_assert!(block.rect.y >= geometry.top());
                prop_assert!(block.rect.bottom() <= geometry.bottom());

                for item in &block.items {
                    match item {
                        DrawItem::Text { baseline, .. } => {
                            prop_assert!(*baseline <= geometry.bottom());
                        }
                        DrawItem::Image { rect, .. } | DrawItem::Box { rect, .. } => {
                            prop_assert!(rect.y >= geometry.top());
                            prop_assert!(rect.bottom() <= geometry.bottom() + 1e-9);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn content_taller_than_a_page_spans_pages(blocks in prop::collection::vec(block_strategy(), 1..30)) {
        let geometry = PageGeometry::A4;
        let pages = layout(blocks);

        let total: f64 = pages
            .iter()
            .flat_map(|p| p.blocks.iter())
            .map(|b| b.rect.height)
            .sum();
        if total > geometry.content_height() {
            prop_assert!(pages.len() > 1);
        }
    }

    #[test]
    fn pages_are_numbered_in_order(blocks in prop::collection::vec(block_strategy(), 0..20)) {
        let pages = layout(blocks);
        for (i, page) in pages.iter().enumerate() {
            prop_assert_eq!(page.index, i);
        }
    }
}

#[test]
fn many_placeholders_paginate() {
    let blocks: Vec<Block> = (0..12)
        .map(|i| Block::placeholder(format!("Slot {}", i), "not available"))
        .collect();
    let pages = layout(blocks);

    assert!(pages.len() > 1);
    assert_eq!(pages.iter().map(|p| p.blocks.len()).sum::<usize>(), 12);
}
