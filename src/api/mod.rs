use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Args, ValueEnum};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    Cheaper, ComparisonResult, ComparisonSettings, ComparisonSummary, Granularity, HousingKind,
    HousingOption, LoanTerms, OneTimeRepair, OptionProjection, ProjectionError, RecurringExpense,
    ScenarioConfig, TaxDeduction, man_yen_to_yen, run_comparison,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliGranularity {
    Monthly,
    Annual,
}

impl From<CliGranularity> for Granularity {
    fn from(value: CliGranularity) -> Self {
        match value {
            CliGranularity::Monthly => Granularity::Monthly,
            CliGranularity::Annual => Granularity::Annual,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiGranularity {
    Monthly,
    #[serde(alias = "yearly")]
    Annual,
}

impl From<ApiGranularity> for CliGranularity {
    fn from(value: ApiGranularity) -> Self {
        match value {
            ApiGranularity::Monthly => CliGranularity::Monthly,
            ApiGranularity::Annual => CliGranularity::Annual,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ComparePayload {
    years: Option<u32>,
    inflation_rate: Option<f64>,
    granularity: Option<ApiGranularity>,

    apt_loan: Option<f64>,
    apt_loan_years: Option<u32>,
    apt_loan_rate: Option<f64>,
    apt_management_fee: Option<f64>,
    apt_repair_reserve: Option<f64>,
    apt_parking: Option<f64>,
    apt_utilities: Option<f64>,
    apt_deduction_years: Option<u32>,
    apt_deduction_rate: Option<f64>,

    house_loan: Option<f64>,
    house_loan_years: Option<u32>,
    house_loan_rate: Option<f64>,
    house_utilities: Option<f64>,
    house_solar_income: Option<f64>,
    house_repair_year: Option<u32>,
    house_repair_cost: Option<f64>,
    house_deduction_years: Option<u32>,
    house_deduction_rate: Option<f64>,
}

/// Comparison parameters. Money is in man-yen (10,000 yen), rates in percent.
#[derive(Args, Debug, Clone)]
pub struct CompareArgs {
    #[arg(long, default_value_t = 35, help = "Comparison horizon in years (10-50)")]
    pub years: u32,
    #[arg(
        long,
        default_value_t = 1.0,
        help = "Annual inflation applied to recurring costs in percent (0-5)"
    )]
    pub inflation_rate: f64,
    #[arg(
        long,
        value_enum,
        default_value_t = CliGranularity::Monthly,
        help = "Report each year as a monthly cost or as the year's total"
    )]
    pub granularity: CliGranularity,

    #[arg(long, default_value_t = 3000.0, help = "Apartment outstanding loan")]
    pub apt_loan: f64,
    #[arg(long, default_value_t = 25, help = "Apartment remaining loan term in years")]
    pub apt_loan_years: u32,
    #[arg(long, default_value_t = 1.2, help = "Apartment loan rate in percent")]
    pub apt_loan_rate: f64,
    #[arg(long, default_value_t = 1.8, help = "Apartment management fee per month")]
    pub apt_management_fee: f64,
    #[arg(long, default_value_t = 2.0, help = "Apartment repair reserve per month")]
    pub apt_repair_reserve: f64,
    #[arg(long, default_value_t = 1.0, help = "Apartment parking per month")]
    pub apt_parking: f64,
    #[arg(long, default_value_t = 2.0, help = "Apartment utilities per month")]
    pub apt_utilities: f64,
    #[arg(long, default_value_t = 10, help = "Apartment mortgage deduction period in years")]
    pub apt_deduction_years: u32,
    #[arg(
        long,
        default_value_t = 0.7,
        help = "Apartment mortgage deduction rate in percent of the loan"
    )]
    pub apt_deduction_rate: f64,

    #[arg(long, default_value_t = 5000.0, help = "Detached house loan amount")]
    pub house_loan: f64,
    #[arg(long, default_value_t = 35, help = "Detached house loan term in years")]
    pub house_loan_years: u32,
    #[arg(long, default_value_t = 0.8, help = "Detached house loan rate in percent")]
    pub house_loan_rate: f64,
    #[arg(long, default_value_t = 0.5, help = "Detached house utilities per month")]
    pub house_utilities: f64,
    #[arg(
        long,
        default_value_t = 2.0,
        help = "Detached house solar sell-back income per month"
    )]
    pub house_solar_income: f64,
    #[arg(long, default_value_t = 20, help = "Year of the scheduled house repair")]
    pub house_repair_year: u32,
    #[arg(long, default_value_t = 100.0, help = "Cost of the scheduled house repair")]
    pub house_repair_cost: f64,
    #[arg(
        long,
        default_value_t = 15,
        help = "Detached house mortgage deduction period in years"
    )]
    pub house_deduction_years: u32,
    #[arg(
        long,
        default_value_t = 0.75,
        help = "Detached house mortgage deduction rate in percent of the loan"
    )]
    pub house_deduction_rate: f64,
}

impl Default for CompareArgs {
    fn default() -> Self {
        Self {
            years: 35,
            inflation_rate: 1.0,
            granularity: CliGranularity::Monthly,
            apt_loan: 3000.0,
            apt_loan_years: 25,
            apt_loan_rate: 1.2,
            apt_management_fee: 1.8,
            apt_repair_reserve: 2.0,
            apt_parking: 1.0,
            apt_utilities: 2.0,
            apt_deduction_years: 10,
            apt_deduction_rate: 0.7,
            house_loan: 5000.0,
            house_loan_years: 35,
            house_loan_rate: 0.8,
            house_utilities: 0.5,
            house_solar_income: 2.0,
            house_repair_year: 20,
            house_repair_cost: 100.0,
            house_deduction_years: 15,
            house_deduction_rate: 0.75,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompareResponse {
    currency: &'static str,
    horizon_years: u32,
    inflation_rate: f64,
    granularity: Granularity,
    years: Vec<u32>,
    apartment: OptionProjection,
    detached_house: OptionProjection,
    summary: ComparisonSummary,
    verdict: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

fn flagged<T>(flag: &str, result: Result<T, ProjectionError>) -> Result<T, String> {
    result.map_err(|e| format!("{flag}: {e}"))
}

/// A zero loan amount means the option carries no loan at all.
fn loan_terms(
    flag: &str,
    amount_man_yen: f64,
    rate_percent: f64,
    years: u32,
) -> Result<Option<LoanTerms>, String> {
    if amount_man_yen == 0.0 {
        return Ok(None);
    }
    flagged(
        flag,
        LoanTerms::new(man_yen_to_yen(amount_man_yen), rate_percent, years).map(Some),
    )
}

fn monthly_cost(flag: &str, label: &str, amount_man_yen: f64) -> Result<RecurringExpense, String> {
    flagged(flag, RecurringExpense::cost(label, man_yen_to_yen(amount_man_yen)))
}

pub fn build_config(args: &CompareArgs) -> Result<ScenarioConfig, String> {
    let settings = flagged(
        "--years/--inflation-rate",
        ComparisonSettings::new(args.years, args.inflation_rate, args.granularity.into()),
    )?;

    let mut apartment = HousingOption::new(HousingKind::Apartment)
        .with_expense(monthly_cost(
            "--apt-management-fee",
            "management fee",
            args.apt_management_fee,
        )?)
        .with_expense(monthly_cost(
            "--apt-repair-reserve",
            "repair reserve",
            args.apt_repair_reserve,
        )?)
        .with_expense(monthly_cost("--apt-parking", "parking", args.apt_parking)?)
        .with_expense(monthly_cost(
            "--apt-utilities",
            "utilities",
            args.apt_utilities,
        )?)
        .with_tax_deduction(flagged(
            "--apt-deduction-rate",
            TaxDeduction::new(args.apt_deduction_years, args.apt_deduction_rate),
        )?);
    apartment.loan = loan_terms(
        "--apt-loan",
        args.apt_loan,
        args.apt_loan_rate,
        args.apt_loan_years,
    )?;

    let mut detached_house = HousingOption::new(HousingKind::DetachedHouse)
        .with_expense(monthly_cost(
            "--house-utilities",
            "utilities",
            args.house_utilities,
        )?)
        .with_expense(flagged(
            "--house-solar-income",
            RecurringExpense::credit("solar income", man_yen_to_yen(args.house_solar_income)),
        )?)
        .with_tax_deduction(flagged(
            "--house-deduction-rate",
            TaxDeduction::new(args.house_deduction_years, args.house_deduction_rate),
        )?)
        .with_repair(flagged(
            "--house-repair-cost",
            OneTimeRepair::new(args.house_repair_year, man_yen_to_yen(args.house_repair_cost)),
        )?);
    detached_house.loan = loan_terms(
        "--house-loan",
        args.house_loan,
        args.house_loan_rate,
        args.house_loan_years,
    )?;

    Ok(ScenarioConfig {
        apartment,
        detached_house,
        settings,
    })
}

/// Runs one comparison and renders the response as pretty JSON.
pub fn run_compare(args: &CompareArgs) -> Result<String, String> {
    let config = build_config(args)?;
    let result = run_comparison(&config).map_err(|e| e.to_string())?;
    info!(
        "{} over {} years",
        verdict(&result.summary),
        config.settings.horizon_years()
    );
    serde_json::to_string_pretty(&build_compare_response(result))
        .map_err(|e| format!("failed to serialize comparison: {e}"))
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/compare",
            get(compare_get_handler).post(compare_post_handler),
        )
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!("housing cost API listening on http://{addr}");

    axum::serve(listener, app).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn compare_get_handler(Query(payload): Query<ComparePayload>) -> Response {
    compare_handler_impl(payload).await
}

async fn compare_post_handler(Json(payload): Json<ComparePayload>) -> Response {
    compare_handler_impl(payload).await
}

async fn compare_handler_impl(payload: ComparePayload) -> Response {
    let config = match build_config(&args_from_payload(payload)) {
        Ok(config) => config,
        Err(msg) => {
            warn!("rejected comparison request: {msg}");
            return error_response(StatusCode::BAD_REQUEST, &msg);
        }
    };

    match run_comparison(&config) {
        Ok(result) => json_response(StatusCode::OK, build_compare_response(result)),
        Err(e) => {
            warn!("comparison failed: {e}");
            error_response(StatusCode::BAD_REQUEST, &e.to_string())
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn args_from_json(json: &str) -> Result<CompareArgs, String> {
    let payload = serde_json::from_str::<ComparePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    Ok(args_from_payload(payload))
}

fn args_from_payload(payload: ComparePayload) -> CompareArgs {
    let mut args = CompareArgs::default();

    if let Some(v) = payload.years {
        args.years = v;
    }
    if let Some(v) = payload.inflation_rate {
        args.inflation_rate = v;
    }
    if let Some(v) = payload.granularity {
        args.granularity = v.into();
    }

    if let Some(v) = payload.apt_loan {
        args.apt_loan = v;
    }
    if let Some(v) = payload.apt_loan_years {
        args.apt_loan_years = v;
    }
    if let Some(v) = payload.apt_loan_rate {
        args.apt_loan_rate = v;
    }
    if let Some(v) = payload.apt_management_fee {
        args.apt_management_fee = v;
    }
    if let Some(v) = payload.apt_repair_reserve {
        args.apt_repair_reserve = v;
    }
    if let Some(v) = payload.apt_parking {
        args.apt_parking = v;
    }
    if let Some(v) = payload.apt_utilities {
        args.apt_utilities = v;
    }
    if let Some(v) = payload.apt_deduction_years {
        args.apt_deduction_years = v;
    }
    if let Some(v) = payload.apt_deduction_rate {
        args.apt_deduction_rate = v;
    }

    if let Some(v) = payload.house_loan {
        args.house_loan = v;
    }
    if let Some(v) = payload.house_loan_years {
        args.house_loan_years = v;
    }
    if let Some(v) = payload.house_loan_rate {
        args.house_loan_rate = v;
    }
    if let Some(v) = payload.house_utilities {
        args.house_utilities = v;
    }
    if let Some(v) = payload.house_solar_income {
        args.house_solar_income = v;
    }
    if let Some(v) = payload.house_repair_year {
        args.house_repair_year = v;
    }
    if let Some(v) = payload.house_repair_cost {
        args.house_repair_cost = v;
    }
    if let Some(v) = payload.house_deduction_years {
        args.house_deduction_years = v;
    }
    if let Some(v) = payload.house_deduction_rate {
        args.house_deduction_rate = v;
    }

    args
}

fn verdict(summary: &ComparisonSummary) -> String {
    match summary.cheaper {
        Cheaper::Tie => "Both options cost the same".to_string(),
        Cheaper::Apartment => cheaper_by(HousingKind::Apartment, summary),
        Cheaper::DetachedHouse => cheaper_by(HousingKind::DetachedHouse, summary),
    }
}

fn cheaper_by(kind: HousingKind, summary: &ComparisonSummary) -> String {
    format!(
        "{} is cheaper by {:.1} man-yen ({:.0} yen)",
        kind.label(),
        summary.difference_man_yen,
        summary.difference
    )
}

fn build_compare_response(result: ComparisonResult) -> CompareResponse {
    let settings = result.settings;
    CompareResponse {
        currency: "JPY",
        horizon_years: settings.horizon_years(),
        inflation_rate: settings.inflation_rate_percent(),
        granularity: settings.granularity(),
        years: (1..=settings.horizon_years()).collect(),
        verdict: verdict(&result.summary),
        apartment: result.apartment,
        detached_house: result.detached_house,
        summary: result.summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_args() -> CompareArgs {
        CompareArgs::default()
    }

    #[test]
    fn build_config_normalizes_man_yen_once() {
        let config = build_config(&sample_args()).expect("valid config");

        let apt_loan = config.apartment.loan.expect("apartment loan");
        assert_approx(apt_loan.principal(), 30_000_000.0);
        assert_eq!(apt_loan.term_years(), 25);
        assert_approx(config.apartment.net_monthly_recurring(), 68_000.0);

        assert_approx(config.detached_house.original_principal(), 50_000_000.0);
        assert_approx(config.detached_house.net_monthly_recurring(), -15_000.0);
        let repair = config.detached_house.repair.expect("house repair");
        assert_eq!(repair.year(), 20);
        assert_approx(repair.cost(), 1_000_000.0);

        assert_eq!(config.settings.horizon_years(), 35);
        assert_eq!(config.settings.granularity(), Granularity::Monthly);
    }

    #[test]
    fn build_config_treats_zero_loan_as_no_loan() {
        let mut args = sample_args();
        args.apt_loan = 0.0;
        args.apt_loan_years = 0;

        let config = build_config(&args).expect("valid config");
        assert!(config.apartment.loan.is_none());
    }

    #[test]
    fn build_config_rejects_zero_term_with_loan() {
        let mut args = sample_args();
        args.house_loan_years = 0;

        let err = build_config(&args).expect_err("must reject zero term");
        assert!(err.contains("--house-loan"));
        assert!(err.contains("term_years"));
    }

    #[test]
    fn build_config_rejects_out_of_range_horizon_and_inflation() {
        let mut args = sample_args();
        args.years = 9;
        let err = build_config(&args).expect_err("must reject short horizon");
        assert!(err.contains("horizon_years"));

        let mut args = sample_args();
        args.years = 51;
        assert!(build_config(&args).is_err());

        let mut args = sample_args();
        args.inflation_rate = 5.5;
        let err = build_config(&args).expect_err("must reject high inflation");
        assert!(err.contains("inflation_rate_percent"));
    }

    #[test]
    fn build_config_rejects_negative_expense() {
        let mut args = sample_args();
        args.apt_parking = -1.0;

        let err = build_config(&args).expect_err("must reject negative parking");
        assert!(err.contains("--apt-parking"));
    }

    #[test]
    fn args_from_json_parses_web_keys() {
        let json = r#"{
          "years": 40,
          "inflationRate": 2.5,
          "granularity": "yearly",
          "aptLoan": 2800,
          "aptLoanYears": 20,
          "aptLoanRate": 1.5,
          "aptParking": 0,
          "houseLoan": 4500,
          "houseSolarIncome": 1.5,
          "houseRepairYear": 25,
          "houseDeductionYears": 13
        }"#;
        let args = args_from_json(json).expect("json should parse");

        assert_eq!(args.years, 40);
        assert_approx(args.inflation_rate, 2.5);
        assert_eq!(args.granularity, CliGranularity::Annual);
        assert_approx(args.apt_loan, 2800.0);
        assert_eq!(args.apt_loan_years, 20);
        assert_approx(args.apt_loan_rate, 1.5);
        assert_approx(args.apt_parking, 0.0);
        assert_approx(args.apt_management_fee, 1.8);
        assert_approx(args.house_loan, 4500.0);
        assert_approx(args.house_solar_income, 1.5);
        assert_eq!(args.house_repair_year, 25);
        assert_eq!(args.house_deduction_years, 13);
        assert_approx(args.house_deduction_rate, 0.75);
    }

    #[test]
    fn args_from_json_rejects_unknown_granularity() {
        let err = args_from_json(r#"{"granularity": "weekly"}"#).expect_err("must reject");
        assert!(err.contains("Invalid API JSON payload"));
    }

    #[test]
    fn compare_response_serialization_contains_expected_fields() {
        let config = build_config(&sample_args()).expect("valid config");
        let result = run_comparison(&config).expect("valid comparison");
        let response = build_compare_response(result);

        assert_eq!(response.years.len(), 35);
        assert_eq!(response.apartment.costs.len(), 35);
        assert_eq!(response.detached_house.cumulative.len(), 35);

        let json = serde_json::to_string(&response).expect("response should serialize");
        assert!(json.contains("\"horizonYears\":35"));
        assert!(json.contains("\"granularity\":\"monthly\""));
        assert!(json.contains("\"detachedHouse\""));
        assert!(json.contains("\"monthlyLoanPayment\""));
        assert!(json.contains("\"recurringItems\""));
        assert!(json.contains("\"label\":\"solar income\""));
        assert!(json.contains("\"direction\":\"credit\""));
        assert!(json.contains("\"cumulative\""));
        assert!(json.contains("\"differenceManYen\""));
        assert!(json.contains("\"cheaper\""));
        assert!(json.contains("\"verdict\""));
    }

    #[test]
    fn default_scenario_first_year_matches_hand_calculation() {
        let config = build_config(&sample_args()).expect("valid config");
        let result = run_comparison(&config).expect("valid comparison");

        // 115,798.50 loan + 68,000 fees - 17,500 deduction
        let apt_year_one = result.apartment.costs.year(1).expect("year 1");
        assert!((apt_year_one - 166_298.496).abs() < 0.01);

        // 136,530.47 loan - 15,000 net utilities - 31,250 deduction
        let house_year_one = result.detached_house.costs.year(1).expect("year 1");
        assert!((house_year_one - 90_280.469).abs() < 0.01);
    }

    #[test]
    fn verdict_reports_tie_explicitly() {
        let mut args = sample_args();
        args.apt_loan = 0.0;
        args.house_loan = 0.0;
        args.apt_management_fee = 0.0;
        args.apt_repair_reserve = 0.0;
        args.apt_parking = 0.0;
        args.apt_utilities = 0.0;
        args.house_utilities = 0.0;
        args.house_solar_income = 0.0;
        args.house_repair_cost = 0.0;

        let config = build_config(&args).expect("valid config");
        let result = run_comparison(&config).expect("valid comparison");
        assert_eq!(result.summary.cheaper, Cheaper::Tie);
        assert_eq!(verdict(&result.summary), "Both options cost the same");
    }

    #[test]
    fn verdict_shows_yen_for_small_differences() {
        let summary = crate::core::compare_totals(1_000_300.0, 1_000_000.0);
        assert_eq!(summary.cheaper, Cheaper::DetachedHouse);
        assert_eq!(
            verdict(&summary),
            "Detached house is cheaper by 0.0 man-yen (300 yen)"
        );

        let summary = crate::core::compare_totals(2_000_000.0, 3_500_000.0);
        assert_eq!(
            verdict(&summary),
            "Apartment is cheaper by 150.0 man-yen (1500000 yen)"
        );
    }

    #[test]
    fn build_config_rejects_oversized_loan_term() {
        let args = args_from_json(r#"{"houseLoanYears": 400000000}"#).expect("json should parse");
        let err = build_config(&args).expect_err("must reject oversized term");
        assert!(err.contains("--house-loan"));
        assert!(err.contains("term_years"));
    }

    #[test]
    fn run_compare_renders_pretty_json() {
        let json = run_compare(&sample_args()).expect("comparison should render");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(value["currency"], "JPY");
        assert_eq!(value["years"].as_array().map(Vec::len), Some(35));
    }
}
