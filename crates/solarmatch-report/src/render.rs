//! Report assembly
//!
//! Turns a [`FinancialSummary`] and up to two image handles into a
//! [`ReportDocument`]. Sections always appear in the same order: summary,
//! financial detail, imagery (only when imagery was requested) and next
//! steps. Each starts on a new page.

use chrono::{DateTime, Utc};
use solarmatch_acquire::{AcquisitionState, ImageHandle, ImagePayload, Orchestrator};
use solarmatch_core::models::{
    CapacitySource, Coordinates, FinancialSummary, PaybackStatus, RoofAreaSource, SuitabilityTier,
};

use crate::document::{EmbeddedImage, ReportDocument};
use crate::layout::{Block, HeadingLevel, LayoutEngine, Metric, PageGeometry, Section};

/// An image slot as seen by the renderer
#[derive(Debug, Clone, Copy)]
pub enum ImageSlot<'a> {
    /// Borrowed for the duration of the render call only
    Present(&'a ImageHandle),
    Absent { reason: &'a str },
}

impl<'a> ImageSlot<'a> {
    /// View an orchestrator image slot
    pub fn from_state(state: &'a AcquisitionState<ImagePayload>) -> Self {
        match state {
            AcquisitionState::Ready(ImagePayload::Available(handle)) => ImageSlot::Present(handle),
            AcquisitionState::Ready(ImagePayload::Unavailable { reason }) => {
                ImageSlot::Absent { reason }
            }
            AcquisitionState::Failed(reason) => ImageSlot::Absent { reason },
            AcquisitionState::Pending => ImageSlot::Absent {
                reason: "The image was still loading when the report was generated.",
            },
            AcquisitionState::Idle => ImageSlot::Absent {
                reason: "The image was not requested.",
            },
        }
    }
}

/// Images handed to the renderer
#[derive(Debug, Clone, Copy)]
pub struct ReportImages<'a> {
    pub primary: ImageSlot<'a>,
    pub heatmap: ImageSlot<'a>,
    /// Whether imagery was asked for at all; when false the imagery section is omitted
    pub requested: bool,
}

impl<'a> ReportImages<'a> {
    pub fn not_requested() -> Self {
        let absent = ImageSlot::Absent {
            reason: "The image was not requested.",
        };
        Self {
            primary: absent,
            heatmap: absent,
            requested: false,
        }
    }

    /// Borrow the current image slots of an orchestrator
    pub fn from_orchestrator(orchestrator: &'a Orchestrator) -> Self {
        Self {
            primary: ImageSlot::from_state(orchestrator.primary()),
            heatmap: ImageSlot::from_state(orchestrator.heatmap()),
            requested: orchestrator.options().include_imagery,
        }
    }
}

/// Presentation settings for a report
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub title: String,
    pub location: Option<Coordinates>,
    pub address: Option<String>,
    /// Symbol prefixed to monetary values
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub geometry: PageGeometry,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            title: "Solar Viability Report".to_string(),
            location: None,
            address: None,
            currency: "€".to_string(),
            created_at: Utc::now(),
            geometry: PageGeometry::A4,
        }
    }
}

/// Render with default options
pub fn render(summary: &FinancialSummary, images: ReportImages<'_>) -> ReportDocument {
    render_with(summary, images, &ReportOptions::default())
}

/// Lay out a complete report
///
/// Never fails: missing or undecodable images become placeholder blocks.
pub fn render_with(
    summary: &FinancialSummary,
    images: ReportImages<'_>,
    options: &ReportOptions,
) -> ReportDocument {
    let mut report = ReportBuilder {
        engine: LayoutEngine::new(options.geometry),
        images: Vec::new(),
        currency: &options.currency,
    };

    report.summary_section(summary, options);
    report.financial_section(summary);
    if images.requested {
        report.imagery_section(images);
    }
    report.next_steps_section(summary);

    let ReportBuilder { engine, images, .. } = report;
    let pages = engine.finish();
    tracing::info!(
        pages = pages.len(),
        images = images.len(),
        score = summary.suitability.score,
        "Rendered report"
    );

    ReportDocument::new(
        options.title.clone(),
        options.created_at,
        options.geometry,
        pages,
        images,
    )
}

struct ReportBuilder<'a> {
    engine: LayoutEngine,
    images: Vec<EmbeddedImage>,
    currency: &'a str,
}

impl ReportBuilder<'_> {
    fn money(&self, amount: f64) -> String {
        format!("{}{}", self.currency, group_thousands(amount))
    }

    fn summary_section(&mut self, summary: &FinancialSummary, options: &ReportOptions) {
        let engine = &mut self.engine;
        engine.begin_section(Section::Summary);
        engine.place(Block::heading(&options.title, HeadingLevel::Title));

        let mut prepared = format!("Prepared {}", options.created_at.format("%-d %B %Y"));
        if let Some(address) = &options.address {
            prepared.push_str(&format!(" for {}", address));
        }
        if let Some(location) = &options.location {
            prepared.push_str(&format!(" ({})", location));
        }
        engine.place(Block::fine_print(prepared));

        engine.place(Block::heading("At a glance", HeadingLevel::Section));
        let metrics = vec![
            Metric::new(
                "Suitability",
                format!("{}/100 ({})", summary.suitability.score, summary.suitability.tier),
            ),
            Metric::new("Annual solar flux", format!("{:.0} kWh/kWp", summary.mean_flux)),
            Metric::new("System size", format!("{:.1} kWp", summary.capacity_kwp)),
            Metric::new(
                "Annual generation",
                format!("{} kWh", group_thousands(summary.annual_energy_kwh)),
            ),
            Metric::new("Net cost after grant", self.money(summary.cost.net_cost)),
            Metric::new("Payback", payback_label(summary)),
        ];
        let engine = &mut self.engine;
        engine.place(Block::MetricGrid(metrics));
        engine.place(Block::paragraph(verdict(summary.suitability.tier)));

        engine.place(Block::fine_print(format!(
            "Data source: {}.",
            summary.data_source.label()
        )));
        if let Some(note) = &summary.note {
            engine.place(Block::fine_print(note));
        }
    }

    fn financial_section(&mut self, summary: &FinancialSummary) {
        let cost = &summary.cost;
        let savings = &summary.savings;

        self.engine.begin_section(Section::Financials);
        self.engine
            .place(Block::heading("Cost and savings", HeadingLevel::Section));

        let metrics = vec![
            Metric::new("Gross installation cost", self.money(cost.gross_cost)),
            Metric::new(
                "Pricing tier",
                format!("{} at {}/kWp", cost.pricing_tier, self.money(cost.rate_per_kwp)),
            ),
            Metric::new("Grant", self.money(cost.grant)),
            Metric::new("Net cost", self.money(cost.net_cost)),
            Metric::new(
                "Self-consumption savings",
                format!("{} / year", self.money(savings.self_consumption_savings)),
            ),
            Metric::new(
                "Export income",
                format!("{} / year", self.money(savings.export_income)),
            ),
            Metric::new("Total annual savings", self.money(savings.total)),
            Metric::new("Payback period", payback_label(summary)),
        ];
        self.engine.place(Block::MetricGrid(metrics));

        if summary.payback.status == PaybackStatus::NoSavings {
            self.engine.place(Block::fine_print(
                "No annual savings were projected, so payback is shown as 0 years. \
                 This does not indicate an immediate return on the investment.",
            ));
        }

        self.engine
            .place(Block::heading("Grant breakdown", HeadingLevel::Subsection));
        if cost.grant_bands.is_empty() {
            self.engine
                .place(Block::paragraph("No grant applies to a system of this size."));
        } else {
            let mut lines: Vec<String> = cost
                .grant_bands
                .iter()
                .map(|band| {
                    format!(
                        "{:.1} to {:.1} kWp at {}/kWp: {}",
                        band.from_kwp,
                        band.to_kwp,
                        self.money(band.rate_per_kwp),
                        self.money(band.amount)
                    )
                })
                .collect();
            if cost.grant_capped {
                lines.push(format!("Total limited to the maximum grant of {}", self.money(cost.grant)));
            }
            self.engine.place(Block::Bullets(lines));
        }

        self.engine.place(Block::heading("Energy", HeadingLevel::Subsection));
        let energy = vec![
            Metric::new(
                "Used in the home",
                format!("{} kWh / year", group_thousands(savings.self_consumed_kwh)),
            ),
            Metric::new(
                "Exported to the grid",
                format!("{} kWh / year", group_thousands(savings.exported_kwh)),
            ),
            Metric::new(
                "Roof area",
                format!("{:.0} m²", summary.roof_area_sq_meters),
            ),
            Metric::new("System size basis", capacity_basis(summary.capacity_source)),
        ];
        self.engine.place(Block::MetricGrid(energy));

        self.engine
            .place(Block::heading("Environmental impact", HeadingLevel::Subsection));
        let emissions = &summary.emissions;
        self.engine.place(Block::MetricGrid(vec![
            Metric::new("CO2 avoided per year", format!("{} kg", group_thousands(emissions.annual_kg))),
            Metric::new(
                "CO2 avoided over system life",
                format!("{:.1} tonnes", emissions.lifetime_kg / 1000.0),
            ),
            Metric::new(
                "Equivalent trees planted",
                group_thousands(f64::from(emissions.equivalent_trees)),
            ),
        ]));
    }

    fn imagery_section(&mut self, images: ReportImages<'_>) {
        self.engine.begin_section(Section::Imagery);
        self.engine.place(Block::heading("Roof imagery", HeadingLevel::Section));
        self.engine.place(Block::paragraph(
            "The aerial view shows the property as captured from above. The heatmap \
             colours each part of the roof by the solar energy it receives over a year.",
        ));

        self.image_block(
            images.primary,
            "Aerial view",
            "Aerial view of the property",
        );
        self.image_block(
            images.heatmap,
            "Solar heatmap",
            "Annual solar flux: brighter areas receive more sunlight",
        );
    }

    /// Place an image, or a placeholder when it is missing or cannot be decoded
    fn image_block(&mut self, slot: ImageSlot<'_>, title: &str, caption: &str) {
        let handle = match slot {
            ImageSlot::Present(handle) => handle,
            ImageSlot::Absent { reason } => {
                tracing::debug!(title, reason, "Image absent, placing placeholder");
                self.engine
                    .place(Block::placeholder(format!("{} not available", title), reason));
                return;
            }
        };

        match image::load_from_memory(handle.bytes()) {
            Ok(decoded) => {
                let rgb = decoded.to_rgb8();
                let (width, height) = rgb.dimensions();
                let index = self.images.len();
                self.images.push(EmbeddedImage {
                    width,
                    height,
                    rgb: rgb.into_raw(),
                });
                self.engine.place(Block::Image {
                    image: index,
                    pixel_width: width,
                    pixel_height: height,
                    caption: caption.to_string(),
                });
            }
            Err(e) => {
                tracing::warn!(title, handle = %handle.id(), "Image failed to decode: {}", e);
                self.engine.place(Block::placeholder(
                    format!("{} could not be displayed", title),
                    "The image data could not be decoded, so it has been left out of this report.",
                ));
            }
        }
    }

    fn next_steps_section(&mut self, summary: &FinancialSummary) {
        self.engine.begin_section(Section::NextSteps);
        self.engine.place(Block::heading("Next steps", HeadingLevel::Section));
        if !summary.recommendations.is_empty() {
            self.engine
                .place(Block::Bullets(summary.recommendations.clone()));
        }

        self.engine
            .place(Block::heading("About this report", HeadingLevel::Subsection));
        self.engine.place(Block::fine_print(DISCLAIMER));
    }
}

const DISCLAIMER: &str = "This report is an automated estimate based on satellite and modeled \
     solar data. Actual generation, costs and savings depend on the installer's survey, \
     equipment, shading, electricity prices and how much of the generated energy is used \
     in the home. Grant amounts and export tariffs are subject to change by the schemes that \
     offer them. Obtain quotes from registered installers before making any decision.";

fn verdict(tier: SuitabilityTier) -> &'static str {
    match tier {
        SuitabilityTier::Excellent => {
            "This roof receives excellent sunlight and is a strong candidate for solar panels."
        }
        SuitabilityTier::Good => {
            "This roof receives good sunlight; solar panels should perform well here."
        }
        SuitabilityTier::Fair => {
            "This roof receives moderate sunlight. Solar can still pay off, but a site \
             survey is recommended before committing."
        }
        SuitabilityTier::Poor => {
            "This roof receives limited sunlight. Solar panels are unlikely to be \
             cost-effective without further assessment."
        }
    }
}

fn payback_label(summary: &FinancialSummary) -> String {
    match summary.payback.status {
        PaybackStatus::Computed => format!("{:.1} years", summary.payback.years),
        PaybackStatus::NoSavings => "0 years (no savings)".to_string(),
    }
}

fn capacity_basis(source: CapacitySource) -> String {
    match source {
        CapacitySource::Reported => "Measured roof analysis".to_string(),
        CapacitySource::DerivedFromArea(RoofAreaSource::Usable) => {
            "Usable roof area".to_string()
        }
        CapacitySource::DerivedFromArea(RoofAreaSource::Estimated) => {
            "Estimated roof area".to_string()
        }
        CapacitySource::DerivedFromArea(RoofAreaSource::Missing) | CapacitySource::Unknown => {
            "Not available".to_string()
        }
    }
}

/// Round to a whole number and group digits in thousands
fn group_thousands(value: f64) -> String {
    let rounded = if value.is_finite() { value.round() as i64 } else { 0 };
    let digits = rounded.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if rounded < 0 {
        format!("-{}", out)
    } else {
        out
    }
}
