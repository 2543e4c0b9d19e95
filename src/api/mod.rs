use axum::{
    Router,
    extract::{
        Json, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{HeaderValue, StatusCode, header},
    middleware,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::core::{
    DEFAULT_AMOUNT, DEFAULT_RATE, DEFAULT_YEARS, DisplayCurrency, InvestmentInput, InvestmentMode,
    MAX_PROJECTION_YEARS, Projection, ProjectionError, ProjectionSummary, YEAR_CHOICES,
    YearlyProjection, format_currency, parse_input, run_projection,
};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliInvestmentMode {
    Periodic,
    LumpSum,
}

impl From<CliInvestmentMode> for InvestmentMode {
    fn from(value: CliInvestmentMode) -> Self {
        match value {
            CliInvestmentMode::Periodic => InvestmentMode::Periodic,
            CliInvestmentMode::LumpSum => InvestmentMode::LumpSum,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliCurrency {
    Inr,
    Usd,
}

impl From<CliCurrency> for DisplayCurrency {
    fn from(value: CliCurrency) -> Self {
        match value {
            CliCurrency::Inr => DisplayCurrency::Inr,
            CliCurrency::Usd => DisplayCurrency::Usd,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiInvestmentMode {
    #[serde(alias = "sip")]
    Periodic,
    #[serde(
        alias = "lumpsum",
        alias = "lump_sum",
        alias = "lumpSum",
        alias = "one-time"
    )]
    LumpSum,
}

impl From<ApiInvestmentMode> for InvestmentMode {
    fn from(value: ApiInvestmentMode) -> Self {
        match value {
            ApiInvestmentMode::Periodic => InvestmentMode::Periodic,
            ApiInvestmentMode::LumpSum => InvestmentMode::LumpSum,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ApiCurrency {
    #[serde(alias = "INR")]
    Inr,
    #[serde(alias = "USD")]
    Usd,
}

impl From<ApiCurrency> for DisplayCurrency {
    fn from(value: ApiCurrency) -> Self {
        match value {
            ApiCurrency::Inr => DisplayCurrency::Inr,
            ApiCurrency::Usd => DisplayCurrency::Usd,
        }
    }
}

/// Form fields arrive as text from query strings and as either text or numbers
/// from JSON bodies. Both are kept as text until `parse_input` coerces them.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
enum RawField {
    Number(f64),
    Text(String),
}

impl RawField {
    fn into_text(self) -> String {
        match self {
            RawField::Number(v) => v.to_string(),
            RawField::Text(s) => s,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectPayload {
    #[serde(alias = "investmentType")]
    mode: Option<ApiInvestmentMode>,
    amount: Option<RawField>,
    years: Option<RawField>,
    #[serde(alias = "returnRate")]
    rate: Option<RawField>,
    currency: Option<ApiCurrency>,
}

#[derive(Parser, Debug)]
#[command(
    name = "sipcalc",
    about = "Projects systematic (monthly) or lump-sum investments year by year"
)]
struct Cli {
    #[arg(long, value_enum, default_value_t = CliInvestmentMode::Periodic)]
    mode: CliInvestmentMode,
    #[arg(
        long,
        default_value = DEFAULT_AMOUNT,
        help = "Monthly contribution (periodic) or one-time principal (lump-sum)"
    )]
    amount: String,
    #[arg(long, default_value = DEFAULT_YEARS, help = "Investment period in whole years")]
    years: String,
    #[arg(
        long,
        default_value = DEFAULT_RATE,
        help = "Expected annual return in percent, e.g. 12"
    )]
    rate: String,
    #[arg(long, value_enum, default_value_t = CliCurrency::Inr)]
    currency: CliCurrency,
    #[arg(long, help = "Print the API response body instead of a table")]
    json: bool,
}

#[derive(Debug)]
struct ApiRequest {
    input: InvestmentInput,
    currency: DisplayCurrency,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FormattedSummary {
    total_investment: String,
    total_returns: String,
    total_amount: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResponse {
    mode: InvestmentMode,
    currency: DisplayCurrency,
    years: Vec<YearlyProjection>,
    summary: ProjectionSummary,
    formatted: FormattedSummary,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DefaultsResponse {
    amount: &'static str,
    years: &'static str,
    rate: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OptionsResponse {
    year_choices: &'static [u32],
    max_years: u32,
    defaults: DefaultsResponse,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Parses the process arguments and prints a one-off projection.
pub fn run_cli() -> Result<(), String> {
    let cli = Cli::parse();
    let output = render_cli(cli)?;
    print!("{output}");
    Ok(())
}

fn render_cli(cli: Cli) -> Result<String, String> {
    let request = api_request_from_cli(cli.mode, &cli.amount, &cli.years, &cli.rate, cli.currency)
        .map_err(|e| e.to_string())?;
    let projection = run_projection(&request.input).map_err(|e| e.to_string())?;

    if cli.json {
        let response = build_project_response(&projection, request.currency);
        let body = serde_json::to_string_pretty(&response)
            .map_err(|e| format!("failed to serialize projection: {e}"))?;
        return Ok(format!("{body}\n"));
    }
    Ok(render_table(&projection, request.currency))
}

fn api_request_from_cli(
    mode: CliInvestmentMode,
    amount: &str,
    years: &str,
    rate: &str,
    currency: CliCurrency,
) -> Result<ApiRequest, ProjectionError> {
    let input = parse_input(mode.into(), amount, years, rate)?;
    Ok(ApiRequest {
        input,
        currency: currency.into(),
    })
}

fn render_table(projection: &Projection, currency: DisplayCurrency) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>4}  {:>18}  {:>18}  {:>18}",
        "Year", "Investment", "Returns", "Total value"
    );
    for year in &projection.years {
        let _ = writeln!(
            out,
            "{:>4}  {:>18}  {:>18}  {:>18}",
            year.year,
            format_currency(year.cumulative_investment, currency),
            format_currency(year.cumulative_returns, currency),
            format_currency(year.total_value, currency),
        );
    }
    let summary = &projection.summary;
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Total investment: {}",
        format_currency(summary.total_investment, currency)
    );
    let _ = writeln!(
        out,
        "Total returns:    {}",
        format_currency(summary.total_returns, currency)
    );
    let _ = writeln!(
        out,
        "Total amount:     {}",
        format_currency(summary.total_amount, currency)
    );
    out
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "SIP calculator listening");
    info!("Local access: http://127.0.0.1:{port}/");

    axum::serve(listener, router()).await
}

fn router() -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route("/api/health", get(health_handler))
        .route("/api/options", get(options_handler))
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .fallback(not_found_handler)
        .layer(middleware::map_response(no_store))
}

async fn index_handler() -> impl IntoResponse {
    Html(INDEX_HTML)
}

async fn styles_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    )
}

async fn app_js_handler() -> impl IntoResponse {
    (
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    )
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn options_handler() -> Response {
    json_response(StatusCode::OK, options_response())
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn project_get_handler(payload: Result<Query<ProjectPayload>, QueryRejection>) -> Response {
    match payload {
        Ok(Query(payload)) => project_handler_impl(payload),
        Err(rejection) => payload_rejected(&rejection.body_text()),
    }
}

async fn project_post_handler(payload: Result<Json<ProjectPayload>, JsonRejection>) -> Response {
    match payload {
        Ok(Json(payload)) => project_handler_impl(payload),
        Err(rejection) => payload_rejected(&rejection.body_text()),
    }
}

fn payload_rejected(msg: &str) -> Response {
    warn!("rejected projection payload: {msg}");
    error_response(StatusCode::BAD_REQUEST, msg)
}

fn project_handler_impl(payload: ProjectPayload) -> Response {
    let result = api_request_from_payload(payload).and_then(|request| {
        run_projection(&request.input).map(|projection| (projection, request.currency))
    });

    match result {
        Ok((projection, currency)) => {
            debug!(
                mode = ?projection.input.mode,
                years = projection.input.years,
                total = projection.summary.total_amount,
                "projection computed"
            );
            json_response(StatusCode::OK, build_project_response(&projection, currency))
        }
        Err(err) => {
            warn!(field = err.field(), "rejected projection request: {err}");
            error_response(StatusCode::BAD_REQUEST, &err.to_string())
        }
    }
}

async fn no_store(response: Response) -> Response {
    with_cache_control(response)
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    (status, Json(body)).into_response()
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
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<ProjectPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload).map_err(|e| e.to_string())
}

fn api_request_from_payload(payload: ProjectPayload) -> Result<ApiRequest, ProjectionError> {
    let mode = payload.mode.map(InvestmentMode::from).unwrap_or_default();
    let currency = payload.currency.map(DisplayCurrency::from).unwrap_or_default();
    let amount = payload
        .amount
        .map(RawField::into_text)
        .unwrap_or_else(|| DEFAULT_AMOUNT.to_string());
    let years = payload
        .years
        .map(RawField::into_text)
        .unwrap_or_else(|| DEFAULT_YEARS.to_string());
    let rate = payload
        .rate
        .map(RawField::into_text)
        .unwrap_or_else(|| DEFAULT_RATE.to_string());

    let input = parse_input(mode, &amount, &years, &rate)?;
    Ok(ApiRequest { input, currency })
}

fn build_project_response(projection: &Projection, currency: DisplayCurrency) -> ProjectResponse {
    let summary = projection.summary;
    ProjectResponse {
        mode: projection.input.mode,
        currency,
        years: projection.years.clone(),
        summary,
        formatted: FormattedSummary {
            total_investment: format_currency(summary.total_investment, currency),
            total_returns: format_currency(summary.total_returns, currency),
            total_amount: format_currency(summary.total_amount, currency),
        },
    }
}

fn options_response() -> OptionsResponse {
    OptionsResponse {
        year_choices: &YEAR_CHOICES,
        max_years: MAX_PROJECTION_YEARS,
        defaults: DefaultsResponse {
            amount: DEFAULT_AMOUNT,
            years: DEFAULT_YEARS,
            rate: DEFAULT_RATE,
        },
    }
}
