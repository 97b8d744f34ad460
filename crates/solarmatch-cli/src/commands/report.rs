use super::finance::print_summary;
use crate::cli::ReportArgs;
use crate::config_loader::load_pricing;
use crate::output::OutputWriter;
use crate::progress::AcquisitionProgress;
use anyhow::{bail, Result};
use serde::Serialize;
use solarmatch_acquire::{
    AcquisitionOptions, AcquisitionState, HandleStats, HttpSolarSource, ImagePayload, Orchestrator,
    Slot, SlotEvent, SlotStatus,
};
use solarmatch_core::config::LayeredConfig;
use solarmatch_core::derive_financials;
use solarmatch_core::models::{Coordinates, FinancialSummary};
use solarmatch_core::PricingConfig;
use solarmatch_report::{render_with, ReportDocument, ReportImages, ReportOptions};
use std::sync::Arc;
use std::time::Duration;

#[derive(Serialize)]
struct ReportResult<'a> {
    output: String,
    report_id: String,
    pages: usize,
    primary: SlotStatus,
    heatmap: SlotStatus,
    events: &'a [SlotEvent],
    handles: HandleStats,
    summary: &'a FinancialSummary,
}

/// Fetch everything for a location and write the PDF report
pub async fn execute(args: ReportArgs, config: &LayeredConfig, output: &OutputWriter) -> Result<()> {
    let coords = Coordinates::new(args.lat, args.lon)?;
    let pricing = load_pricing(config)?;

    let source = HttpSolarSource::new(
        config.api_base_url.value.clone(),
        Duration::from_secs(config.request_timeout_secs.value),
    )?;
    let options = AcquisitionOptions {
        radius_meters: config.radius_meters.value,
        heatmap_scheme: config.heatmap_scheme.value,
        include_imagery: !args.no_imagery,
    };

    tracing::info!(
        location = %coords,
        api = %source.base_url(),
        imagery = options.include_imagery,
        "Requesting solar analysis"
    );

    let mut orchestrator = Orchestrator::new(Arc::new(source), options);
    orchestrator.request(coords);

    let slots: &[Slot] = if options.include_imagery {
        &Slot::ALL
    } else {
        &[Slot::Analysis]
    };
    let progress = AcquisitionProgress::new(slots, output.is_json());

    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    let mut events = Vec::new();
    let mut interrupted = false;
    loop {
        tokio::select! {
            event = orchestrator.next_completion() => match event {
                Some(event) => {
                    if let SlotEvent::Applied { slot, status } = event {
                        progress.update(slot, status, &slot_detail(&orchestrator, slot));
                    }
                    events.push(event);
                }
                None => break,
            },
            _ = &mut interrupt => {
                interrupted = true;
                break;
            }
        }
    }
    progress.finish();

    if interrupted {
        orchestrator.abort_in_flight();
        orchestrator.release_all();
        bail!("Interrupted before all data arrived");
    }

    let report_options = ReportOptions {
        location: Some(coords),
        address: args.address.clone(),
        currency: pricing.currency.clone(),
        ..Default::default()
    };
    let built = build_report(&orchestrator, &pricing, &report_options);
    let primary = orchestrator.status(Slot::Primary);
    let heatmap = orchestrator.status(Slot::Heatmap);

    orchestrator.release_all();
    let handles = orchestrator.handle_stats();
    if handles.live != 0 {
        tracing::warn!(?handles, "Image handles still live after teardown");
    }

    let (summary, document) = built?;
    document.save(&args.out)?;

    if output.is_json() {
        output.result(ReportResult {
            output: args.out.display().to_string(),
            report_id: document.id().to_string(),
            pages: document.page_count(),
            primary,
            heatmap,
            events: &events,
            handles,
            summary: &summary,
        })?;
    } else {
        print_summary(output, &summary, &pricing.currency);
        for (slot, status) in [(Slot::Primary, primary), (Slot::Heatmap, heatmap)] {
            if status == SlotStatus::Failed {
                output.warning(format!("{} missing from the report", slot));
            }
        }
        output.success(format!(
            "Report written to {} ({} pages)",
            args.out.display(),
            document.page_count()
        ));
    }

    Ok(())
}

/// Derive the summary and lay out the document while the handles are still held
fn build_report(
    orchestrator: &Orchestrator,
    pricing: &PricingConfig,
    options: &ReportOptions,
) -> Result<(FinancialSummary, ReportDocument)> {
    let raw = match orchestrator.analysis() {
        AcquisitionState::Ready(raw) => raw,
        AcquisitionState::Failed(reason) => bail!("Solar analysis failed: {}", reason),
        AcquisitionState::Idle | AcquisitionState::Pending => {
            bail!("Solar analysis did not complete")
        }
    };

    let summary = derive_financials(raw, pricing);
    let document = render_with(&summary, ReportImages::from_orchestrator(orchestrator), options);
    Ok((summary, document))
}

fn slot_detail(orchestrator: &Orchestrator, slot: Slot) -> String {
    match slot {
        Slot::Analysis => match orchestrator.analysis() {
            AcquisitionState::Ready(raw) => format!("{:.0} kWh/kWp/yr", raw.mean_flux()),
            AcquisitionState::Failed(reason) => reason.clone(),
            _ => "waiting".to_string(),
        },
        Slot::Primary | Slot::Heatmap => {
            let state = if slot == Slot::Primary {
                orchestrator.primary()
            } else {
                orchestrator.heatmap()
            };
            match state {
                AcquisitionState::Ready(ImagePayload::Available(handle)) => {
                    format!("{}x{} {}", handle.width(), handle.height(), handle.mime_type())
                }
                AcquisitionState::Ready(ImagePayload::Unavailable { reason }) => {
                    format!("not available ({})", reason)
                }
                AcquisitionState::Failed(reason) => reason.clone(),
                _ => "waiting".to_string(),
            }
        }
    }
}
