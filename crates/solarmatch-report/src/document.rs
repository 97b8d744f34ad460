use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::Path;
use uuid::Uuid;

use crate::error::Result;
use crate::layout::{BlockKind, Page, PageGeometry, PlacedBlock, Section};
use crate::pdf;

/// Decoded image pixels ready to embed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedImage {
    pub width: u32,
    pub height: u32,
    /// Packed 8-bit RGB samples, row-major
    pub rgb: Vec<u8>,
}

/// A fully laid out report
///
/// Built once by the renderer and never modified afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct ReportDocument {
    id: Uuid,
    title: String,
    created_at: DateTime<Utc>,
    geometry: PageGeometry,
    pages: Vec<Page>,
    #[serde(skip)]
    images: Vec<EmbeddedImage>,
}

impl ReportDocument {
    pub(crate) fn new(
        title: String,
        created_at: DateTime<Utc>,
        geometry: PageGeometry,
        pages: Vec<Page>,
        images: Vec<EmbeddedImage>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            created_at,
            geometry,
            pages,
            images,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn images(&self) -> &[EmbeddedImage] {
        &self.images
    }

    /// Sections in the order they appear, each listed once
    pub fn sections(&self) -> Vec<Section> {
        let mut sections: Vec<Section> = Vec::new();
        for page in &self.pages {
            if sections.last() != Some(&page.section) {
                sections.push(page.section);
            }
        }
        sections
    }

    /// Number of pages belonging to `section`
    pub fn pages_in(&self, section: Section) -> usize {
        self.pages.iter().filter(|p| p.section == section).count()
    }

    /// Every placed block of a given kind, with the page it sits on
    pub fn blocks_of(&self, kind: BlockKind) -> Vec<(usize, &PlacedBlock)> {
        self.pages
            .iter()
            .flat_map(|page| {
                page.blocks
                    .iter()
                    .filter(move |block| block.kind == kind)
                    .map(move |block| (page.index, block))
            })
            .collect()
    }

    /// Serialise to PDF
    pub fn to_pdf_bytes(&self) -> Result<Vec<u8>> {
        pdf::write_pdf(self)
    }

    /// Write the PDF to `path`
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.to_pdf_bytes()?;
        fs::write(path.as_ref(), bytes)?;
        tracing::info!(path = %path.as_ref().display(), pages = self.page_count(), "Report saved");
        Ok(())
    }
}
