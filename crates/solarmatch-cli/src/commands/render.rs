use super::finance::read_analysis;
use crate::cli::RenderArgs;
use crate::config_loader::load_pricing;
use crate::output::OutputWriter;
use anyhow::Result;
use solarmatch_acquire::{probe_image, HandleRegistry, ImageHandle};
use solarmatch_core::config::LayeredConfig;
use solarmatch_core::derive_financials;
use solarmatch_report::{render_with, ImageSlot, ReportImages, ReportOptions};
use std::fs;
use std::path::Path;

/// An image read from disk for an offline render
enum LocalImage {
    Loaded(ImageHandle),
    Missing(String),
}

impl LocalImage {
    fn load(registry: &mut HandleRegistry, path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return LocalImage::Missing("No image file was supplied.".to_string());
        };

        let probed = fs::read(path)
            .map_err(|e| format!("Could not read {}: {}", path.display(), e))
            .and_then(|bytes| probe_image(bytes).map_err(|e| e.to_string()));

        match probed {
            Ok(asset) => LocalImage::Loaded(registry.mint(asset)),
            Err(reason) => {
                tracing::warn!(path = %path.display(), %reason, "Image left out of the report");
                LocalImage::Missing(reason)
            }
        }
    }

    fn slot(&self) -> ImageSlot<'_> {
        match self {
            LocalImage::Loaded(handle) => ImageSlot::Present(handle),
            LocalImage::Missing(reason) => ImageSlot::Absent { reason },
        }
    }

    fn release(self, registry: &mut HandleRegistry) -> Result<()> {
        if let LocalImage::Loaded(handle) = self {
            registry.release(handle)?;
        }
        Ok(())
    }
}

/// Render a report from a saved analysis and local image files
pub fn execute(args: RenderArgs, config: &LayeredConfig, output: &OutputWriter) -> Result<()> {
    let pricing = load_pricing(config)?;
    let raw = read_analysis(&args.input)?;
    let summary = derive_financials(&raw, &pricing);

    let mut registry = HandleRegistry::new();
    let requested = !args.no_imagery;
    let (primary, heatmap) = if requested {
        (
            LocalImage::load(&mut registry, args.primary.as_deref()),
            LocalImage::load(&mut registry, args.heatmap.as_deref()),
        )
    } else {
        let skipped = || LocalImage::Missing("The image was not requested.".to_string());
        (skipped(), skipped())
    };

    let options = ReportOptions {
        address: args.address.clone(),
        currency: pricing.currency.clone(),
        ..Default::default()
    };
    let images = ReportImages {
        primary: primary.slot(),
        heatmap: heatmap.slot(),
        requested,
    };
    let document = render_with(&summary, images, &options);

    primary.release(&mut registry)?;
    heatmap.release(&mut registry)?;
    tracing::debug!(stats = ?registry.stats(), "Released local images");

    document.save(&args.out)?;

    if output.is_json() {
        output.result(serde_json::json!({
            "output": args.out.display().to_string(),
            "report_id": document.id().to_string(),
            "pages": document.page_count(),
            "images": document.images().len(),
        }))?;
    } else {
        output.success(format!(
            "Report written to {} ({} pages)",
            args.out.display(),
            document.page_count()
        ));
    }

    Ok(())
}
