mod engine;
mod error;
mod types;

pub use engine::{
    compare_totals, cumulative, deduction_active, inflation_multiplier, loan_active,
    monthly_payment, project_costs, repair_due, run_comparison,
};
pub use error::ProjectionError;
pub use types::{
    Cheaper, ComparisonResult, ComparisonSettings, ComparisonSummary, CostSeries,
    CumulativeSeries, FlowDirection, Granularity, HousingKind, HousingOption, LoanTerms, MAN_YEN,
    MAX_HORIZON_YEARS, MAX_INFLATION_RATE_PERCENT, MAX_LOAN_TERM_YEARS, MIN_HORIZON_YEARS,
    OneTimeRepair, OptionProjection, RecurringExpense, RecurringItem, ScenarioConfig,
    TaxDeduction, YearBreakdown, man_yen_to_yen, yen_to_man_yen,
};
