pub mod analysis;
pub mod financial;
pub mod imagery;
pub mod location;

pub use analysis::{DataSource, FluxStats, PanelConfig, RawAnalysis, RoofArea, RoofAreaSource};
pub use financial::{
    AnnualSavings, CapacitySource, CostBreakdown, EmissionsReduction, FinancialSummary,
    GrantBandContribution, Payback, PaybackStatus, Suitability, SuitabilityTier,
};
pub use imagery::HeatmapScheme;
pub use location::Coordinates;
