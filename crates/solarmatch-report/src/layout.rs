//! Block layout and pagination
//!
//! Positions are in points measured from the top-left corner of the page;
//! the PDF writer flips them into PDF user space. The engine keeps a cursor
//! `(page, y)` and never places anything below the bottom margin: a block
//! that does not fit on the current page moves to a fresh one, and text
//! taller than a whole page is split between lines.

use serde::Serialize;

use crate::text::{self, Font};

/// Page size, margins and spacing
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageGeometry {
    pub width: f64,
    pub height: f64,
    pub margin: f64,
    pub block_spacing: f64,
    /// Cap on image height as a fraction of the page height
    pub max_image_fraction: f64,
}

impl PageGeometry {
    /// A4 portrait
    pub const A4: PageGeometry = PageGeometry {
        width: 595.28,
        height: 841.89,
        margin: 40.0,
        block_spacing: 10.0,
        max_image_fraction: 0.45,
    };

    pub fn content_width(&self) -> f64 {
        self.width - 2.0 * self.margin
    }

    pub fn content_height(&self) -> f64 {
        self.height - 2.0 * self.margin
    }

    pub fn top(&self) -> f64 {
        self.margin
    }

    /// Lowest y any block may reach
    pub fn bottom(&self) -> f64 {
        self.height - self.margin
    }

    pub fn max_image_height(&self) -> f64 {
        self.height * self.max_image_fraction
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::A4
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub const TEXT: Color = Color::rgb(0.13, 0.15, 0.18);
    pub const MUTED: Color = Color::rgb(0.42, 0.45, 0.50);
    pub const PANEL: Color = Color::rgb(0.96, 0.97, 0.98);
    pub const BORDER: Color = Color::rgb(0.82, 0.84, 0.87);
}

/// Primitive drawing operation with absolute coordinates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DrawItem {
    Text {
        x: f64,
        /// Baseline, measured from the top of the page
        baseline: f64,
        size: f64,
        font: Font,
        color: Color,
        text: String,
    },
    Image {
        rect: Rect,
        /// Index into the document's embedded images
        image: usize,
    },
    Box {
        rect: Rect,
        fill: Option<Color>,
        stroke: Option<Color>,
    },
}

/// Report sections, in the order they appear
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Summary,
    Financials,
    Imagery,
    NextSteps,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadingLevel {
    Title,
    Section,
    Subsection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParagraphStyle {
    Body,
    /// Small muted print for notes and disclaimers
    Fine,
}

/// A labelled value in a metric grid
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub label: String,
    pub value: String,
}

impl Metric {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Content to be laid out
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading { text: String, level: HeadingLevel },
    MetricGrid(Vec<Metric>),
    Paragraph { text: String, style: ParagraphStyle },
    Bullets(Vec<String>),
    Image {
        /// Index into the document's embedded images
        image: usize,
        pixel_width: u32,
        pixel_height: u32,
        caption: String,
    },
    Placeholder { title: String, reason: String },
}

impl Block {
    pub fn heading(text: impl Into<String>, level: HeadingLevel) -> Self {
        Block::Heading {
            text: text.into(),
            level,
        }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Block::Paragraph {
            text: text.into(),
            style: ParagraphStyle::Body,
        }
    }

    pub fn fine_print(text: impl Into<String>) -> Self {
        Block::Paragraph {
            text: text.into(),
            style: ParagraphStyle::Fine,
        }
    }

    pub fn placeholder(title: impl Into<String>, reason: impl Into<String>) -> Self {
        Block::Placeholder {
            title: title.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> BlockKind {
        match self {
            Block::Heading { .. } => BlockKind::Heading,
            Block::MetricGrid(_) => BlockKind::MetricGrid,
            Block::Paragraph { .. } => BlockKind::Paragraph,
            Block::Bullets(_) => BlockKind::Bullets,
            Block::Image { .. } => BlockKind::Image,
            Block::Placeholder { .. } => BlockKind::Placeholder,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Heading,
    MetricGrid,
    Paragraph,
    Bullets,
    Image,
    Placeholder,
}

/// A block (or a page-sized piece of one) fixed at its final position
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedBlock {
    pub kind: BlockKind,
    pub rect: Rect,
    pub items: Vec<DrawItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub index: usize,
    pub section: Section,
    pub blocks: Vec<PlacedBlock>,
}

impl Page {
    fn new(index: usize, section: Section) -> Self {
        Self {
            index,
            section,
            blocks: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
struct TextStyle {
    size: f64,
    line_height: f64,
    font: Font,
    color: Color,
}

impl TextStyle {
    const BODY: TextStyle = TextStyle {
        size: 10.5,
        line_height: 14.0,
        font: Font::Regular,
        color: Color::TEXT,
    };
    const FINE: TextStyle = TextStyle {
        size: 8.5,
        line_height: 11.0,
        font: Font::Regular,
        color: Color::MUTED,
    };
    const LABEL: TextStyle = TextStyle {
        size: 8.5,
        line_height: 11.0,
        font: Font::Regular,
        color: Color::MUTED,
    };
    const VALUE: TextStyle = TextStyle {
        size: 13.0,
        line_height: 17.0,
        font: Font::Bold,
        color: Color::TEXT,
    };

    fn heading(level: HeadingLevel) -> Self {
        let (size, line_height) = match level {
            HeadingLevel::Title => (22.0, 28.0),
            HeadingLevel::Section => (16.0, 21.0),
            HeadingLevel::Subsection => (12.5, 17.0),
        };
        TextStyle {
            size,
            line_height,
            font: Font::Bold,
            color: Color::TEXT,
        }
    }

    fn wrap(&self, text: &str, width: f64) -> Vec<String> {
        text::wrap(text, self.size, self.font, width)
    }

    /// Draw item for a line whose box starts at `top`
    fn line(&self, x: f64, top: f64, text: String) -> DrawItem {
        DrawItem::Text {
            x,
            baseline: top + (self.line_height - self.size) / 2.0 + self.size * 0.8,
            size: self.size,
            font: self.font,
            color: self.color,
            text,
        }
    }
}

const GRID_COLUMNS: usize = 2;
const GRID_GAP: f64 = 12.0;
const CELL_PADDING: f64 = 8.0;
const BULLET_INDENT: f64 = 14.0;
const CAPTION_GAP: f64 = 4.0;
const PLACEHOLDER_MIN_HEIGHT: f64 = 80.0;
const MAX_CAPTION_LINES: usize = 3;

/// Cursor-driven layout of blocks onto pages
#[derive(Debug)]
pub struct LayoutEngine {
    geometry: PageGeometry,
    pages: Vec<Page>,
    y: f64,
}

impl LayoutEngine {
    pub fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            pages: vec![Page::new(0, Section::Summary)],
            y: geometry.top(),
        }
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    /// Current `(page index, y)` cursor
    pub fn cursor(&self) -> (usize, f64) {
        (self.pages.len() - 1, self.y)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Start `section` on a fresh page
    ///
    /// An untouched current page is reused rather than left blank.
    pub fn begin_section(&mut self, section: Section) {
        match self.pages.last_mut() {
            Some(page) if page.is_empty() => page.section = section,
            _ => self.new_page(section),
        }
    }

    pub fn place(&mut self, block: Block) {
        match block {
            Block::Heading { text, level } => {
                self.place_text(BlockKind::Heading, &text, TextStyle::heading(level), 0.0)
            }
            Block::Paragraph { text, style } => {
                let style = match style {
                    ParagraphStyle::Body => TextStyle::BODY,
                    ParagraphStyle::Fine => TextStyle::FINE,
                };
                self.place_text(BlockKind::Paragraph, &text, style, 0.0);
            }
            Block::Bullets(items) => {
                for item in items {
                    self.place_bullet(&item);
                }
            }
            Block::MetricGrid(metrics) => self.place_grid(&metrics),
            Block::Image {
                image,
                pixel_width,
                pixel_height,
                caption,
            } => self.place_image(image, pixel_width, pixel_height, &caption),
            Block::Placeholder { title, reason } => self.place_placeholder(&title, &reason),
        }
    }

    pub fn finish(self) -> Vec<Page> {
        self.pages
    }

    fn current_section(&self) -> Section {
        self.pages
            .last()
            .map(|page| page.section)
            .unwrap_or(Section::Summary)
    }

    fn new_page(&mut self, section: Section) {
        let index = self.pages.len();
        tracing::trace!(index, ?section, "Starting page");
        self.pages.push(Page::new(index, section));
        self.y = self.geometry.top();
    }

    /// Move to a new page if `height` does not fit below the cursor
    fn reserve(&mut self, height: f64) {
        let fits = self.y + height <= self.geometry.bottom();
        let page_empty = self.pages.last().map(Page::is_empty).unwrap_or(true);
        if !fits && !(page_empty && self.y <= self.geometry.top()) {
            let section = self.current_section();
            self.new_page(section);
        }
    }

    fn push(&mut self, kind: BlockKind, x: f64, width: f64, height: f64, items: Vec<DrawItem>) {
        let rect = Rect {
            x,
            y: self.y,
            width,
            height,
        };
        if let Some(page) = self.pages.last_mut() {
            page.blocks.push(PlacedBlock { kind, rect, items });
        }
        self.y += height + self.geometry.block_spacing;
    }

    /// Lay out wrapped lines, keeping them together when they fit on one page
    fn place_text(&mut self, kind: BlockKind, text: &str, style: TextStyle, indent: f64) {
        let x = self.geometry.margin + indent;
        let width = self.geometry.content_width() - indent;
        let lines = style.wrap(text, width);
        if lines.is_empty() {
            return;
        }
        self.flow_lines(kind, x, width, style, lines, |_| None);
    }

    /// Place `lines`, splitting them across pages when taller than a page
    ///
    /// `marker` may add a leading draw item to the first piece (bullets).
    fn flow_lines(
        &mut self,
        kind: BlockKind,
        x: f64,
        width: f64,
        style: TextStyle,
        lines: Vec<String>,
        marker: impl Fn(f64) -> Option<DrawItem>,
    ) {
        let total = lines.len() as f64 * style.line_height;
        if total <= self.geometry.content_height() {
            self.reserve(total);
        }

        let mut remaining = lines.into_iter().peekable();
        let mut first = true;
        while remaining.peek().is_some() {
            let mut fit = self.lines_that_fit(style.line_height);
            if fit == 0 {
                let section = self.current_section();
                self.new_page(section);
                fit = self.lines_that_fit(style.line_height).max(1);
            }

            let top = self.y;
            let mut items = Vec::new();
            if first {
                items.extend(marker(top));
                first = false;
            }
            let mut count = 0usize;
            for line in remaining.by_ref().take(fit) {
                let line_top = top + count as f64 * style.line_height;
                items.push(style.line(x, line_top, line));
                count += 1;
            }
            self.push(kind, x, width, count as f64 * style.line_height, items);
        }
    }

    fn lines_that_fit(&self, line_height: f64) -> usize {
        let bottom = self.geometry.bottom();
        let available = bottom - self.y;
        if available < line_height {
            return 0;
        }
        let mut fit = (available / line_height + 1e-9).floor() as usize;
        while fit > 0 && self.y + fit as f64 * line_height > bottom {
            fit -= 1;
        }
        fit
    }

    fn place_bullet(&mut self, item: &str) {
        let style = TextStyle::BODY;
        let x = self.geometry.margin + BULLET_INDENT;
        let width = self.geometry.content_width() - BULLET_INDENT;
        let lines = style.wrap(item, width);
        if lines.is_empty() {
            return;
        }

        let bullet_x = self.geometry.margin + 3.0;
        self.flow_lines(BlockKind::Bullets, x, width, style, lines, |top| {
            Some(style.line(bullet_x, top, "•".to_string()))
        });
    }

    fn place_grid(&mut self, metrics: &[Metric]) {
        if metrics.is_empty() {
            return;
        }

        let geometry = self.geometry;
        let column_width =
            (geometry.content_width() - GRID_GAP * (GRID_COLUMNS as f64 - 1.0)) / GRID_COLUMNS as f64;
        let text_width = column_width - 2.0 * CELL_PADDING;

        let cells: Vec<(Vec<String>, Vec<String>)> = metrics
            .iter()
            .map(|m| {
                let label = TextStyle::LABEL.wrap(&m.label, text_width);
                let value = TextStyle::VALUE.wrap(&m.value, text_width);
                clamp_cell(label, value, geometry.content_height())
            })
            .collect();

        // One uniform row height, from the tallest cell in the grid
        let row_height = cells
            .iter()
            .map(|(label, value)| cell_height(label.len(), value.len()))
            .fold(0.0, f64::max);

        for row in cells.chunks(GRID_COLUMNS) {
            self.reserve(row_height);
            let top = self.y;
            let mut items = Vec::new();

            for (column, (label, value)) in row.iter().enumerate() {
                let x = geometry.margin + column as f64 * (column_width + GRID_GAP);
                items.push(DrawItem::Box {
                    rect: Rect {
                        x,
                        y: top,
                        width: column_width,
                        height: row_height,
                    },
                    fill: Some(Color::PANEL),
                    stroke: Some(Color::BORDER),
                });

                let text_x = x + CELL_PADDING;
                let mut line_top = top + CELL_PADDING;
                for line in label {
                    items.push(TextStyle::LABEL.line(text_x, line_top, line.clone()));
                    line_top += TextStyle::LABEL.line_height;
                }
                line_top += 2.0;
                for line in value {
                    items.push(TextStyle::VALUE.line(text_x, line_top, line.clone()));
                    line_top += TextStyle::VALUE.line_height;
                }
            }

            self.push(
                BlockKind::MetricGrid,
                geometry.margin,
                geometry.content_width(),
                row_height,
                items,
            );
        }
    }

    fn place_image(&mut self, image: usize, pixel_width: u32, pixel_height: u32, caption: &str) {
        let geometry = self.geometry;
        let mut caption_lines = TextStyle::FINE.wrap(caption, geometry.content_width());
        caption_lines.truncate(MAX_CAPTION_LINES);
        let caption_height = if caption_lines.is_empty() {
            0.0
        } else {
            CAPTION_GAP + caption_lines.len() as f64 * TextStyle::FINE.line_height
        };

        let (width, height) = fit_image(
            pixel_width,
            pixel_height,
            geometry.content_width(),
            geometry.max_image_height(),
        );

        self.reserve(height + caption_height);
        let top = self.y;
        let x = geometry.margin + (geometry.content_width() - width) / 2.0;

        let mut items = vec![DrawItem::Image {
            rect: Rect {
                x,
                y: top,
                width,
                height,
            },
            image,
        }];
        let mut line_top = top + height + CAPTION_GAP;
        for line in caption_lines {
            items.push(TextStyle::FINE.line(geometry.margin, line_top, line));
            line_top += TextStyle::FINE.line_height;
        }

        self.push(
            BlockKind::Image,
            geometry.margin,
            geometry.content_width(),
            height + caption_height,
            items,
        );
    }

    fn place_placeholder(&mut self, title: &str, reason: &str) {
        let geometry = self.geometry;
        let text_width = geometry.content_width() - 2.0 * CELL_PADDING;
        let title_style = TextStyle::heading(HeadingLevel::Subsection);
        let title_lines = title_style.wrap(title, text_width);
        let mut reason_lines = TextStyle::BODY.wrap(reason, text_width);

        let max_height = geometry.max_image_height();
        let fixed = 2.0 * CELL_PADDING + title_lines.len() as f64 * title_style.line_height;
        let max_reason = ((max_height - fixed) / TextStyle::BODY.line_height).floor().max(0.0) as usize;
        reason_lines.truncate(max_reason);

        let content = fixed + reason_lines.len() as f64 * TextStyle::BODY.line_height;
        let height = content.max(PLACEHOLDER_MIN_HEIGHT).min(max_height);

        self.reserve(height);
        let top = self.y;
        let mut items = vec![DrawItem::Box {
            rect: Rect {
                x: geometry.margin,
                y: top,
                width: geometry.content_width(),
                height,
            },
            fill: Some(Color::PANEL),
            stroke: Some(Color::BORDER),
        }];

        let text_x = geometry.margin + CELL_PADDING;
        let mut line_top = top + (height - content) / 2.0 + CELL_PADDING;
        for line in title_lines {
            items.push(title_style.line(text_x, line_top, line));
            line_top += title_style.line_height;
        }
        for line in reason_lines {
            items.push(TextStyle::BODY.line(text_x, line_top, line));
            line_top += TextStyle::BODY.line_height;
        }

        self.push(
            BlockKind::Placeholder,
            geometry.margin,
            geometry.content_width(),
            height,
            items,
        );
    }
}

fn cell_height(label_lines: usize, value_lines: usize) -> f64 {
    2.0 * CELL_PADDING
        + label_lines as f64 * TextStyle::LABEL.line_height
        + 2.0
        + value_lines as f64 * TextStyle::VALUE.line_height
}

/// Drop trailing lines until the cell fits within one page
fn clamp_cell(
    mut label: Vec<String>,
    mut value: Vec<String>,
    max_height: f64,
) -> (Vec<String>, Vec<String>) {
    while cell_height(label.len(), value.len()) > max_height {
        if value.len() > 1 {
            value.pop();
        } else if label.len() > 1 {
            label.pop();
        } else {
            break;
        }
    }
    (label, value)
}

/// Display size of an image: full content width, height from the aspect
/// ratio, shrunk proportionally when taller than `max_height`
pub fn fit_image(pixel_width: u32, pixel_height: u32, max_width: f64, max_height: f64) -> (f64, f64) {
    if pixel_width == 0 || pixel_height == 0 {
        return (max_width, 0.0);
    }
    let aspect = f64::from(pixel_height) / f64::from(pixel_width);
    let height = max_width * aspect;
    if height <= max_height {
        (max_width, height)
    } else {
        (max_height / aspect, max_height)
    }
}
