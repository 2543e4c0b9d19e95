use serde::Serialize;

/// Investment periods offered by the year selector on the web page.
pub const YEAR_CHOICES: [u32; 10] = [1, 2, 3, 4, 5, 10, 15, 20, 25, 30];

/// Upper bound for free-entry durations.
pub const MAX_PROJECTION_YEARS: u32 = 100;

pub const DEFAULT_AMOUNT: &str = "1000";
pub const DEFAULT_YEARS: &str = "5";
pub const DEFAULT_RATE: &str = "12";

pub const MONTHS_PER_YEAR: u32 = 12;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InvestmentMode {
    /// Fixed contribution at the start of every month.
    #[default]
    Periodic,
    /// Single contribution at the start of the horizon.
    LumpSum,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct InvestmentInput {
    pub mode: InvestmentMode,
    /// Monthly contribution for `Periodic`, principal for `LumpSum`.
    pub amount: f64,
    pub years: u32,
    /// Expected annual return in percent, e.g. 12 for 12%.
    pub annual_rate_percent: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyProjection {
    pub year: u32,
    pub cumulative_investment: f64,
    pub cumulative_returns: f64,
    pub total_value: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionSummary {
    pub total_investment: f64,
    pub total_returns: f64,
    pub total_amount: f64,
}

impl ProjectionSummary {
    /// Headline figures taken from the final projected year.
    pub fn from_years(years: &[YearlyProjection]) -> Option<Self> {
        years.last().map(|last| Self {
            total_investment: last.cumulative_investment,
            total_returns: last.cumulative_returns,
            total_amount: last.total_value,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Projection {
    pub input: InvestmentInput,
    pub years: Vec<YearlyProjection>,
    pub summary: ProjectionSummary,
}
