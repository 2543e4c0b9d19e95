use tracing::debug;

use super::error::ProjectionError;
use super::types::{
    InvestmentInput, InvestmentMode, MAX_PROJECTION_YEARS, MONTHS_PER_YEAR, Projection,
    ProjectionSummary, YearlyProjection,
};

/// Coerces the raw text fields collected from a form or query string into an
/// [`InvestmentInput`]. Nothing is computed here.
pub fn parse_input(
    mode: InvestmentMode,
    amount: &str,
    years: &str,
    annual_rate_percent: &str,
) -> Result<InvestmentInput, ProjectionError> {
    let input = InvestmentInput {
        mode,
        amount: parse_finite("amount", amount)?,
        years: parse_years(years)?,
        annual_rate_percent: parse_finite("rate", annual_rate_percent)?,
    };
    Ok(input)
}

/// Year-by-year projection for `input`, one entry per elapsed year starting at 1.
///
/// Periodic mode treats `amount` as a monthly contribution paid at the start of
/// each month and values the stream as an annuity-due compounded monthly. Lump
/// sum mode compounds a single principal annually. Sign and magnitude of
/// `amount` and the rate are not range-checked; only finiteness and the year
/// bounds are. A year whose figures leave the `f64` range is rejected rather
/// than reported as `inf`/`NaN`.
pub fn project(input: &InvestmentInput) -> Result<Vec<YearlyProjection>, ProjectionError> {
    validate_input(input)?;

    if input.mode == InvestmentMode::Periodic && is_zero_rate(monthly_rate(input)) {
        debug!(
            rate = input.annual_rate_percent,
            "zero monthly rate, valuing contributions at face value"
        );
    }

    let years = (1..=input.years)
        .map(|year| {
            let point = match input.mode {
                InvestmentMode::Periodic => periodic_year(input, year),
                InvestmentMode::LumpSum => lump_sum_year(input, year),
            };
            ensure_representable(input, point)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(years)
}

/// Projection plus the headline summary taken from its final year.
pub fn run_projection(input: &InvestmentInput) -> Result<Projection, ProjectionError> {
    let years = project(input)?;
    let summary = ProjectionSummary::from_years(&years)
        .ok_or_else(|| ProjectionError::invalid("years", input.years, "must be at least 1"))?;
    Ok(Projection {
        input: *input,
        years,
        summary,
    })
}

fn periodic_year(input: &InvestmentInput, year: u32) -> YearlyProjection {
    let invested = input.amount * f64::from(year) * f64::from(MONTHS_PER_YEAR);
    let months = year * MONTHS_PER_YEAR;
    let value = annuity_due_future_value(input.amount, monthly_rate(input), months);
    year_point(year, invested, value)
}

fn lump_sum_year(input: &InvestmentInput, year: u32) -> YearlyProjection {
    let growth = 1.0 + input.annual_rate_percent / 100.0;
    let value = input.amount * growth.powi(year as i32);
    year_point(year, input.amount, value)
}

fn monthly_rate(input: &InvestmentInput) -> f64 {
    input.annual_rate_percent / 100.0 / f64::from(MONTHS_PER_YEAR)
}

// A rate that vanishes against 1.0 would turn the closed form into 0/0.
fn is_zero_rate(rate: f64) -> bool {
    rate == 0.0 || 1.0 + rate == 1.0
}

fn annuity_due_future_value(payment: f64, rate: f64, periods: u32) -> f64 {
    if is_zero_rate(rate) {
        return payment * f64::from(periods);
    }
    let growth = (1.0 + rate).powi(periods as i32);
    payment * ((growth - 1.0) / rate) * (1.0 + rate)
}

// Returns are derived first so that investment + returns reproduces the stored
// total bit for bit.
fn year_point(year: u32, invested: f64, value: f64) -> YearlyProjection {
    let cumulative_returns = value - invested;
    YearlyProjection {
        year,
        cumulative_investment: invested,
        cumulative_returns,
        total_value: invested + cumulative_returns,
    }
}

fn ensure_representable(
    input: &InvestmentInput,
    point: YearlyProjection,
) -> Result<YearlyProjection, ProjectionError> {
    if point.cumulative_investment.is_finite()
        && point.cumulative_returns.is_finite()
        && point.total_value.is_finite()
    {
        return Ok(point);
    }
    let reason = format!("projection exceeds the representable range in year {}", point.year);
    if point.cumulative_investment.is_finite() {
        Err(ProjectionError::invalid(
            "rate",
            input.annual_rate_percent,
            reason,
        ))
    } else {
        Err(ProjectionError::invalid("amount", input.amount, reason))
    }
}

fn validate_input(input: &InvestmentInput) -> Result<(), ProjectionError> {
    if !input.amount.is_finite() {
        return Err(ProjectionError::invalid(
            "amount",
            input.amount,
            "must be a finite number",
        ));
    }
    if !input.annual_rate_percent.is_finite() {
        return Err(ProjectionError::invalid(
            "rate",
            input.annual_rate_percent,
            "must be a finite number",
        ));
    }
    validate_years(input.years)
}

fn validate_years(years: u32) -> Result<(), ProjectionError> {
    if years == 0 || years > MAX_PROJECTION_YEARS {
        return Err(ProjectionError::invalid(
            "years",
            years,
            format!("must be between 1 and {MAX_PROJECTION_YEARS}"),
        ));
    }
    Ok(())
}

fn parse_finite(field: &'static str, raw: &str) -> Result<f64, ProjectionError> {
    let value = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| ProjectionError::invalid(field, raw, "must be a number"))?;
    if !value.is_finite() {
        return Err(ProjectionError::invalid(
            field,
            raw,
            "must be a finite number",
        ));
    }
    Ok(value)
}

fn parse_years(raw: &str) -> Result<u32, ProjectionError> {
    let years = raw
        .trim()
        .parse::<u32>()
        .map_err(|_| ProjectionError::invalid("years", raw, "must be a whole number of years"))?;
    validate_years(years)?;
    Ok(years)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn input(mode: InvestmentMode, amount: f64, years: u32, rate: f64) -> InvestmentInput {
        InvestmentInput {
            mode,
            amount,
            years,
            annual_rate_percent: rate,
        }
    }

    #[test]
    fn lump_sum_single_year_at_twelve_percent() {
        let years = project(&input(InvestmentMode::LumpSum, 1000.0, 1, 12.0)).expect("valid");
        assert_eq!(years.len(), 1);
        assert_eq!(years[0].year, 1);
        assert_approx(years[0].cumulative_investment, 1000.0);
        assert_approx(years[0].total_value, 1120.0);
        assert_approx(years[0].cumulative_returns, 120.0);
    }

    #[test]
    fn lump_sum_compounds_annually() {
        let years = project(&input(InvestmentMode::LumpSum, 1000.0, 2, 12.0)).expect("valid");
        assert_eq!(years.len(), 2);
        assert_approx(years[1].cumulative_investment, 1000.0);
        assert_approx(years[1].total_value, 1254.4);
        assert_approx(years[1].cumulative_returns, 254.4);
    }

    #[test]
    fn periodic_one_year_matches_annuity_due() {
        let years = project(&input(InvestmentMode::Periodic, 1000.0, 1, 12.0)).expect("valid");
        let expected = 1000.0 * ((1.01_f64.powi(12) - 1.0) / 0.01) * 1.01;
        assert_approx(years[0].cumulative_investment, 12_000.0);
        assert_approx(years[0].total_value, expected);
        assert!((years[0].total_value - 12_809.33).abs() < 0.01);
        assert!((years[0].cumulative_returns - 809.33).abs() < 0.01);
    }

    #[test]
    fn periodic_zero_rate_equals_sum_of_contributions() {
        let years = project(&input(InvestmentMode::Periodic, 500.0, 3, 0.0)).expect("valid");
        for entry in &years {
            let months = f64::from(entry.year * 12);
            assert!(entry.total_value.is_finite());
            assert_eq!(entry.total_value, 500.0 * months);
            assert_eq!(entry.cumulative_returns, 0.0);
        }
    }

    #[test]
    fn periodic_vanishing_rate_is_treated_as_zero() {
        let years = project(&input(InvestmentMode::Periodic, 100.0, 1, 1e-300)).expect("valid");
        assert_eq!(years[0].total_value, 1200.0);
    }

    #[test]
    fn lump_sum_zero_rate_holds_principal() {
        let years = project(&input(InvestmentMode::LumpSum, 2500.0, 4, 0.0)).expect("valid");
        assert!(years.iter().all(|y| y.total_value == 2500.0));
    }

    #[test]
    fn negative_rate_propagates_as_loss() {
        let years = project(&input(InvestmentMode::LumpSum, 1000.0, 1, -10.0)).expect("valid");
        assert_approx(years[0].total_value, 900.0);
        assert_approx(years[0].cumulative_returns, -100.0);
    }

    #[test]
    fn overflowing_contributions_are_rejected() {
        let err = project(&input(InvestmentMode::Periodic, 1e307, 100, 12.0))
            .expect_err("principal overflows f64");
        assert_eq!(err.field(), "amount");
        assert!(err.to_string().contains("representable range"));
    }

    #[test]
    fn overflowing_growth_is_rejected() {
        let err = project(&input(InvestmentMode::LumpSum, 1e300, 100, 1_000.0))
            .expect_err("compounded value overflows f64");
        assert_eq!(err.field(), "rate");
    }

    #[test]
    fn large_but_representable_projection_keeps_sum_invariant() {
        let years = project(&input(InvestmentMode::Periodic, 1e250, 30, 12.0)).expect("valid");
        for entry in &years {
            assert!(entry.total_value.is_finite());
            assert_eq!(
                entry.total_value,
                entry.cumulative_investment + entry.cumulative_returns
            );
        }
    }

    #[test]
    fn summary_comes_from_final_year() {
        let projection =
            run_projection(&input(InvestmentMode::LumpSum, 1000.0, 2, 12.0)).expect("valid");
        let last = projection.years[1];
        assert_eq!(projection.summary.total_investment, last.cumulative_investment);
        assert_eq!(projection.summary.total_returns, last.cumulative_returns);
        assert_eq!(projection.summary.total_amount, last.total_value);
    }

    #[test]
    fn summary_of_empty_sequence_is_none() {
        assert_eq!(ProjectionSummary::from_years(&[]), None);
    }

    #[test]
    fn parse_input_accepts_padded_numbers() {
        let parsed = parse_input(InvestmentMode::Periodic, " 1500.5 ", "10", "8.25 ")
            .expect("valid input");
        assert_approx(parsed.amount, 1500.5);
        assert_eq!(parsed.years, 10);
        assert_approx(parsed.annual_rate_percent, 8.25);
    }

    #[test]
    fn parse_input_rejects_non_numeric_amount() {
        let err = parse_input(InvestmentMode::Periodic, "abc", "5", "12").expect_err("must reject");
        assert_eq!(err.field(), "amount");
        assert!(err.to_string().contains("\"abc\""));
    }

    #[test]
    fn parse_input_rejects_non_finite_values() {
        for raw in ["NaN", "inf", "-infinity"] {
            let err =
                parse_input(InvestmentMode::LumpSum, "1000", "5", raw).expect_err("must reject");
            assert_eq!(err.field(), "rate");
        }
    }

    #[test]
    fn parse_input_rejects_bad_years() {
        for raw in ["", "0", "-3", "2.5", "101", "ten"] {
            let err =
                parse_input(InvestmentMode::Periodic, "1000", raw, "12").expect_err("must reject");
            assert_eq!(err.field(), "years", "raw years {raw:?}");
        }
    }

    #[test]
    fn project_rejects_non_finite_typed_input() {
        let err = project(&input(InvestmentMode::Periodic, f64::NAN, 5, 12.0)).expect_err("nan");
        assert_eq!(err.field(), "amount");
        let err = project(&input(InvestmentMode::LumpSum, 1000.0, 0, 12.0)).expect_err("zero");
        assert_eq!(err.field(), "years");
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_years_are_consecutive_and_sum_invariant_holds(
            lump_sum in proptest::bool::ANY,
            amount_cents in -5_000_000i64..50_000_000,
            years in 1u32..=40,
            rate_bp in -5_000i32..5_000
        ) {
            let mode = if lump_sum { InvestmentMode::LumpSum } else { InvestmentMode::Periodic };
            let amount = amount_cents as f64 / 100.0;
            let rate = f64::from(rate_bp) / 100.0;
            let out = project(&input(mode, amount, years, rate)).expect("valid");

            prop_assert_eq!(out.len(), years as usize);
            for (idx, entry) in out.iter().enumerate() {
                prop_assert_eq!(entry.year, idx as u32 + 1);
                prop_assert_eq!(
                    entry.total_value,
                    entry.cumulative_investment + entry.cumulative_returns
                );
            }
        }

        #[test]
        fn prop_principal_follows_mode(
            amount_cents in 1i64..50_000_000,
            years in 1u32..=30,
            rate_bp in 0i32..3_000
        ) {
            let amount = amount_cents as f64 / 100.0;
            let rate = f64::from(rate_bp) / 100.0;

            let lump = project(&input(InvestmentMode::LumpSum, amount, years, rate))
                .expect("valid");
            prop_assert!(lump.iter().all(|y| y.cumulative_investment == amount));

            let periodic = project(&input(InvestmentMode::Periodic, amount, years, rate))
                .expect("valid");
            for entry in &periodic {
                prop_assert_eq!(entry.cumulative_investment, amount * f64::from(entry.year) * 12.0);
            }
        }

        #[test]
        fn prop_total_value_strictly_increases_for_positive_rate(
            lump_sum in proptest::bool::ANY,
            amount_cents in 100i64..50_000_000,
            years in 2u32..=30,
            rate_bp in 1i32..4_000
        ) {
            let mode = if lump_sum { InvestmentMode::LumpSum } else { InvestmentMode::Periodic };
            let amount = amount_cents as f64 / 100.0;
            let rate = f64::from(rate_bp) / 100.0;
            let out = project(&input(mode, amount, years, rate)).expect("valid");
            for pair in out.windows(2) {
                prop_assert!(pair[1].total_value > pair[0].total_value);
            }
        }

        #[test]
        fn prop_projection_is_idempotent(
            lump_sum in proptest::bool::ANY,
            amount_cents in -5_000_000i64..50_000_000,
            years in 1u32..=30,
            rate_bp in -3_000i32..6_000
        ) {
            let mode = if lump_sum { InvestmentMode::LumpSum } else { InvestmentMode::Periodic };
            let amount = amount_cents as f64 / 100.0;
            let request = input(mode, amount, years, f64::from(rate_bp) / 100.0);
            let first = project(&request).expect("valid");
            let second = project(&request).expect("valid");
            for (a, b) in first.iter().zip(&second) {
                prop_assert_eq!(a.total_value.to_bits(), b.total_value.to_bits());
                prop_assert_eq!(a.cumulative_returns.to_bits(), b.cumulative_returns.to_bits());
                prop_assert_eq!(
                    a.cumulative_investment.to_bits(),
                    b.cumulative_investment.to_bits()
                );
            }
        }
    }
}
