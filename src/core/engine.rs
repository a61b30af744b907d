use log::debug;

use super::error::ProjectionError;
use super::types::{
    Cheaper, ComparisonResult, ComparisonSummary, CostSeries, CumulativeSeries, Granularity,
    HousingOption, LoanTerms, OptionProjection, RecurringExpense, ScenarioConfig, YearBreakdown,
    require_non_negative, yen_to_man_yen,
};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct YearComponents {
    loan: f64,
    recurring: f64,
    deduction: f64,
    repair: f64,
}

impl YearComponents {
    fn net(self) -> f64 {
        self.loan + self.recurring - self.deduction + self.repair
    }
}

/// Level monthly payment that amortizes `principal` over `term_years * 12` months.
pub fn monthly_payment(
    principal: f64,
    annual_rate_percent: f64,
    term_years: u32,
) -> Result<f64, ProjectionError> {
    let loan = LoanTerms::new(principal, annual_rate_percent, term_years)?;
    Ok(level_payment(&loan))
}

pub(crate) fn level_payment(loan: &LoanTerms) -> f64 {
    let monthly_rate = loan.annual_rate_percent() / 100.0 / 12.0;
    let periods = loan.term_years() * 12;
    annuity_payment(loan.principal(), monthly_rate, periods)
}

fn annuity_payment(principal: f64, periodic_rate: f64, periods: u32) -> f64 {
    if periodic_rate == 0.0 {
        return principal / periods as f64;
    }
    let growth = (1.0 + periodic_rate).powi(periods as i32);
    principal * periodic_rate * growth / (growth - 1.0)
}

/// Price level of `year` relative to year 1.
pub fn inflation_multiplier(inflation_rate_percent: f64, year: u32) -> f64 {
    (1.0 + inflation_rate_percent / 100.0).powi(year.saturating_sub(1) as i32)
}

pub fn loan_active(year: u32, term_years: u32) -> bool {
    year >= 1 && year <= term_years
}

pub fn deduction_active(year: u32, deduction_years: u32) -> bool {
    year >= 1 && year <= deduction_years
}

pub fn repair_due(year: u32, trigger_year: u32) -> bool {
    year == trigger_year
}

/// Net cost of `option` for years `1..=horizon_years`.
pub fn project_costs(
    option: &HousingOption,
    horizon_years: u32,
    inflation_rate_percent: f64,
    granularity: Granularity,
) -> Result<CostSeries, ProjectionError> {
    let components = project_components(option, horizon_years, inflation_rate_percent, granularity)?;
    Ok(CostSeries::new(
        components.into_iter().map(YearComponents::net).collect(),
    ))
}

fn project_components(
    option: &HousingOption,
    horizon_years: u32,
    inflation_rate_percent: f64,
    granularity: Granularity,
) -> Result<Vec<YearComponents>, ProjectionError> {
    if horizon_years == 0 {
        return Err(ProjectionError::invalid("horizon_years", "must be > 0"));
    }
    require_non_negative("inflation_rate_percent", inflation_rate_percent)?;

    let payment = option.loan.as_ref().map(level_payment).unwrap_or(0.0);
    let term_years = option.loan.map(|loan| loan.term_years()).unwrap_or(0);
    let net_recurring = option.net_monthly_recurring();
    let principal = option.original_principal();
    let per_entry = granularity.periods_per_entry();
    let divisor = granularity.yearly_divisor();

    let components = (1..=horizon_years)
        .map(|year| {
            let mut components = YearComponents::default();
            if loan_active(year, term_years) {
                components.loan = payment * per_entry;
            }
            components.recurring =
                net_recurring * inflation_multiplier(inflation_rate_percent, year) * per_entry;
            if let Some(deduction) = option.tax_deduction {
                if deduction_active(year, deduction.years()) {
                    components.deduction = principal * deduction.rate_percent() / 100.0 / divisor;
                }
            }
            if let Some(repair) = option.repair {
                if repair_due(year, repair.year()) {
                    components.repair = repair.cost() / divisor;
                }
            }
            components
        })
        .collect();
    Ok(components)
}

pub fn cumulative(costs: &CostSeries) -> CumulativeSeries {
    let mut running = 0.0;
    CumulativeSeries::new(
        costs
            .values()
            .iter()
            .map(|cost| {
                running += cost;
                running
            })
            .collect(),
    )
}

/// Totals are compared at whole-yen resolution; equal rounded totals tie.
pub fn compare_totals(apartment_total: f64, detached_house_total: f64) -> ComparisonSummary {
    let apartment_rounded = apartment_total.round();
    let house_rounded = detached_house_total.round();
    let cheaper = if apartment_rounded < house_rounded {
        Cheaper::Apartment
    } else if house_rounded < apartment_rounded {
        Cheaper::DetachedHouse
    } else {
        Cheaper::Tie
    };
    let difference = (apartment_rounded - house_rounded).abs();

    ComparisonSummary {
        cheaper,
        apartment_total,
        detached_house_total,
        difference,
        difference_man_yen: yen_to_man_yen(difference),
    }
}

pub fn run_comparison(config: &ScenarioConfig) -> Result<ComparisonResult, ProjectionError> {
    let settings = config.settings;
    let apartment = project_option(
        &config.apartment,
        settings.horizon_years(),
        settings.inflation_rate_percent(),
        settings.granularity(),
    )?;
    let detached_house = project_option(
        &config.detached_house,
        settings.horizon_years(),
        settings.inflation_rate_percent(),
        settings.granularity(),
    )?;
    let summary = compare_totals(
        apartment.cumulative.final_total(),
        detached_house.cumulative.final_total(),
    );
    debug!(
        "compared {} years: apartment {:.0}, detached house {:.0}, cheaper {:?}",
        settings.horizon_years(),
        summary.apartment_total,
        summary.detached_house_total,
        summary.cheaper
    );

    Ok(ComparisonResult {
        settings,
        apartment,
        detached_house,
        summary,
    })
}

fn project_option(
    option: &HousingOption,
    horizon_years: u32,
    inflation_rate_percent: f64,
    granularity: Granularity,
) -> Result<OptionProjection, ProjectionError> {
    let components = project_components(option, horizon_years, inflation_rate_percent, granularity)?;
    let costs = CostSeries::new(components.iter().map(|c| c.net()).collect());
    let cumulative = cumulative(&costs);
    let years = components
        .iter()
        .zip(costs.values())
        .zip(cumulative.values())
        .enumerate()
        .map(|(idx, ((c, &net), &running))| YearBreakdown {
            year: idx as u32 + 1,
            loan: c.loan,
            recurring: c.recurring,
            deduction: c.deduction,
            repair: c.repair,
            net,
            cumulative: running,
        })
        .collect();
    debug!(
        "projected {:?} over {} years ({:?})",
        option.kind, horizon_years, granularity
    );

    Ok(OptionProjection {
        kind: option.kind,
        monthly_loan_payment: option.loan.as_ref().map(level_payment).unwrap_or(0.0),
        recurring_items: option.recurring.iter().map(RecurringExpense::item).collect(),
        costs,
        cumulative,
        years,
    })
}
