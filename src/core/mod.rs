mod engine;
mod error;
mod format;
mod types;

pub use engine::{parse_input, project, run_projection};
pub use error::ProjectionError;
pub use format::{DisplayCurrency, format_amount, format_currency};
pub use types::{
    DEFAULT_AMOUNT, DEFAULT_RATE, DEFAULT_YEARS, InvestmentInput, InvestmentMode,
    MAX_PROJECTION_YEARS, MONTHS_PER_YEAR, Projection, ProjectionSummary, YEAR_CHOICES,
    YearlyProjection,
};
