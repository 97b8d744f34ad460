//! SolarMatch Report - Paginated PDF rendering of solar viability reports
//!
//! Content is described as a sequence of typed blocks, laid out onto A4
//! pages by a cursor that breaks pages before any block would cross the
//! bottom margin, and finally serialised to PDF.

pub mod document;
pub mod error;
pub mod layout;
pub mod pdf;
pub mod render;
pub mod text;

pub use document::{EmbeddedImage, ReportDocument};
pub use error::{ReportError, Result};
pub use layout::{
    Block, BlockKind, DrawItem, HeadingLevel, LayoutEngine, Metric, Page, PageGeometry,
    ParagraphStyle, PlacedBlock, Rect, Section,
};
pub use render::{render, render_with, ImageSlot, ReportImages, ReportOptions};
