use serde::Serialize;

use super::error::ProjectionError;

/// Yen per man-yen, the unit every money input and the summary are expressed in.
pub const MAN_YEN: f64 = 10_000.0;

pub const MIN_HORIZON_YEARS: u32 = 10;
pub const MAX_HORIZON_YEARS: u32 = 50;
pub const MAX_INFLATION_RATE_PERCENT: f64 = 5.0;
pub const MAX_LOAN_TERM_YEARS: u32 = 100;

pub fn man_yen_to_yen(amount: f64) -> f64 {
    amount * MAN_YEN
}

pub fn yen_to_man_yen(amount: f64) -> f64 {
    amount / MAN_YEN
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HousingKind {
    Apartment,
    DetachedHouse,
}

impl HousingKind {
    pub fn label(self) -> &'static str {
        match self {
            HousingKind::Apartment => "Apartment",
            HousingKind::DetachedHouse => "Detached house",
        }
    }
}

/// How each yearly entry of a cost series is expressed.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Granularity {
    /// Entry `y` is the monthly outlay during year `y`.
    #[default]
    Monthly,
    /// Entry `y` is the total outlay over year `y`.
    Annual,
}

impl Granularity {
    pub fn periods_per_entry(self) -> f64 {
        match self {
            Granularity::Monthly => 1.0,
            Granularity::Annual => 12.0,
        }
    }

    /// Divisor that spreads a yearly amount (deduction, repair) over one entry.
    pub fn yearly_divisor(self) -> f64 {
        match self {
            Granularity::Monthly => 12.0,
            Granularity::Annual => 1.0,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LoanTerms {
    principal: f64,
    annual_rate_percent: f64,
    term_years: u32,
}

impl LoanTerms {
    /// `principal` is in yen.
    pub fn new(
        principal: f64,
        annual_rate_percent: f64,
        term_years: u32,
    ) -> Result<Self, ProjectionError> {
        if !principal.is_finite() || principal <= 0.0 {
            return Err(ProjectionError::invalid("principal", "must be > 0"));
        }
        require_non_negative("annual_rate_percent", annual_rate_percent)?;
        if term_years == 0 {
            return Err(ProjectionError::invalid("term_years", "must be > 0"));
        }
        if term_years > MAX_LOAN_TERM_YEARS {
            return Err(ProjectionError::invalid(
                "term_years",
                format!("must be <= {MAX_LOAN_TERM_YEARS}"),
            ));
        }
        Ok(Self {
            principal,
            annual_rate_percent,
            term_years,
        })
    }

    pub fn principal(&self) -> f64 {
        self.principal
    }

    pub fn annual_rate_percent(&self) -> f64 {
        self.annual_rate_percent
    }

    pub fn term_years(&self) -> u32 {
        self.term_years
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FlowDirection {
    Cost,
    Credit,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecurringExpense {
    label: String,
    monthly_amount: f64,
    direction: FlowDirection,
}

impl RecurringExpense {
    pub fn cost(label: impl Into<String>, monthly_amount: f64) -> Result<Self, ProjectionError> {
        Self::new(label.into(), monthly_amount, FlowDirection::Cost)
    }

    /// Income that offsets housing cost, e.g. solar sell-back.
    pub fn credit(label: impl Into<String>, monthly_amount: f64) -> Result<Self, ProjectionError> {
        Self::new(label.into(), monthly_amount, FlowDirection::Credit)
    }

    fn new(
        label: String,
        monthly_amount: f64,
        direction: FlowDirection,
    ) -> Result<Self, ProjectionError> {
        require_non_negative("monthly_amount", monthly_amount)?;
        Ok(Self {
            label,
            monthly_amount,
            direction,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn monthly_amount(&self) -> f64 {
        self.monthly_amount
    }

    pub fn direction(&self) -> FlowDirection {
        self.direction
    }

    pub fn item(&self) -> RecurringItem {
        RecurringItem {
            label: self.label.clone(),
            monthly_amount: self.monthly_amount,
            direction: self.direction,
        }
    }

    pub fn signed_monthly_amount(&self) -> f64 {
        match self.direction {
            FlowDirection::Cost => self.monthly_amount,
            FlowDirection::Credit => -self.monthly_amount,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TaxDeduction {
    years: u32,
    rate_percent: f64,
}

impl TaxDeduction {
    pub fn new(years: u32, rate_percent: f64) -> Result<Self, ProjectionError> {
        require_non_negative("deduction_rate_percent", rate_percent)?;
        Ok(Self {
            years,
            rate_percent,
        })
    }

    pub fn years(&self) -> u32 {
        self.years
    }

    pub fn rate_percent(&self) -> f64 {
        self.rate_percent
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct OneTimeRepair {
    year: u32,
    cost: f64,
}

impl OneTimeRepair {
    /// `cost` is in yen and lands entirely in `year`.
    pub fn new(year: u32, cost: f64) -> Result<Self, ProjectionError> {
        require_non_negative("repair_cost", cost)?;
        Ok(Self { year, cost })
    }

    pub fn year(&self) -> u32 {
        self.year
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }
}

/// Everything that shapes the cost trajectory of one housing option.
#[derive(Clone, Debug, PartialEq)]
pub struct HousingOption {
    pub kind: HousingKind,
    pub loan: Option<LoanTerms>,
    pub recurring: Vec<RecurringExpense>,
    pub tax_deduction: Option<TaxDeduction>,
    pub repair: Option<OneTimeRepair>,
}

impl HousingOption {
    pub fn new(kind: HousingKind) -> Self {
        Self {
            kind,
            loan: None,
            recurring: Vec::new(),
            tax_deduction: None,
            repair: None,
        }
    }

    pub fn with_loan(mut self, loan: LoanTerms) -> Self {
        self.loan = Some(loan);
        self
    }

    pub fn with_expense(mut self, expense: RecurringExpense) -> Self {
        self.recurring.push(expense);
        self
    }

    pub fn with_tax_deduction(mut self, deduction: TaxDeduction) -> Self {
        self.tax_deduction = Some(deduction);
        self
    }

    pub fn with_repair(mut self, repair: OneTimeRepair) -> Self {
        self.repair = Some(repair);
        self
    }

    /// Net monthly recurring amount before inflation; credits count negative.
    pub fn net_monthly_recurring(&self) -> f64 {
        self.recurring
            .iter()
            .map(RecurringExpense::signed_monthly_amount)
            .sum()
    }

    pub fn original_principal(&self) -> f64 {
        self.loan.map(|loan| loan.principal()).unwrap_or(0.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonSettings {
    horizon_years: u32,
    inflation_rate_percent: f64,
    granularity: Granularity,
}

impl ComparisonSettings {
    pub fn new(
        horizon_years: u32,
        inflation_rate_percent: f64,
        granularity: Granularity,
    ) -> Result<Self, ProjectionError> {
        if !(MIN_HORIZON_YEARS..=MAX_HORIZON_YEARS).contains(&horizon_years) {
            return Err(ProjectionError::invalid(
                "horizon_years",
                format!("must be between {MIN_HORIZON_YEARS} and {MAX_HORIZON_YEARS}"),
            ));
        }
        if !inflation_rate_percent.is_finite()
            || !(0.0..=MAX_INFLATION_RATE_PERCENT).contains(&inflation_rate_percent)
        {
            return Err(ProjectionError::invalid(
                "inflation_rate_percent",
                format!("must be between 0 and {MAX_INFLATION_RATE_PERCENT}"),
            ));
        }
        Ok(Self {
            horizon_years,
            inflation_rate_percent,
            granularity,
        })
    }

    pub fn horizon_years(&self) -> u32 {
        self.horizon_years
    }

    pub fn inflation_rate_percent(&self) -> f64 {
        self.inflation_rate_percent
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScenarioConfig {
    pub apartment: HousingOption,
    pub detached_house: HousingOption,
    pub settings: ComparisonSettings,
}

/// Net cost per year, index 0 holding year 1.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CostSeries(Vec<f64>);

impl CostSeries {
    pub(crate) fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Value for 1-based `year`.
    pub fn year(&self, year: u32) -> Option<f64> {
        year.checked_sub(1)
            .and_then(|idx| self.0.get(idx as usize))
            .copied()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CumulativeSeries(Vec<f64>);

impl CumulativeSeries {
    pub(crate) fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn year(&self, year: u32) -> Option<f64> {
        year.checked_sub(1)
            .and_then(|idx| self.0.get(idx as usize))
            .copied()
    }

    pub fn final_total(&self) -> f64 {
        self.0.last().copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearBreakdown {
    pub year: u32,
    pub loan: f64,
    pub recurring: f64,
    pub deduction: f64,
    pub repair: f64,
    pub net: f64,
    pub cumulative: f64,
}

/// One recurring line as configured, before inflation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringItem {
    pub label: String,
    pub monthly_amount: f64,
    pub direction: FlowDirection,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionProjection {
    pub kind: HousingKind,
    pub monthly_loan_payment: f64,
    pub recurring_items: Vec<RecurringItem>,
    pub costs: CostSeries,
    pub cumulative: CumulativeSeries,
    pub years: Vec<YearBreakdown>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Cheaper {
    Apartment,
    DetachedHouse,
    Tie,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonSummary {
    pub cheaper: Cheaper,
    pub apartment_total: f64,
    pub detached_house_total: f64,
    pub difference: f64,
    pub difference_man_yen: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub settings: ComparisonSettings,
    pub apartment: OptionProjection,
    pub detached_house: OptionProjection,
    pub summary: ComparisonSummary,
}

pub(crate) fn require_non_negative(field: &'static str, value: f64) -> Result<(), ProjectionError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ProjectionError::invalid(field, "must be >= 0"));
    }
    Ok(())
}
