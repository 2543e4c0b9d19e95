use serde::Serialize;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayCurrency {
    /// Rupees with lakh/crore digit grouping.
    #[default]
    Inr,
    Usd,
}

impl DisplayCurrency {
    pub fn symbol(self) -> &'static str {
        match self {
            DisplayCurrency::Inr => "₹",
            DisplayCurrency::Usd => "$",
        }
    }
}

/// Currency string with exactly two fractional digits, e.g. `₹12,34,567.89`.
pub fn format_currency(value: f64, currency: DisplayCurrency) -> String {
    let (sign, body) = split_sign(value, currency);
    format!("{sign}{}{body}", currency.symbol())
}

/// Same grouping as [`format_currency`] without the symbol, for chart ticks.
pub fn format_amount(value: f64, currency: DisplayCurrency) -> String {
    let (sign, body) = split_sign(value, currency);
    format!("{sign}{body}")
}

fn split_sign(value: f64, currency: DisplayCurrency) -> (&'static str, String) {
    if value.is_nan() {
        return ("", "NaN".to_string());
    }
    if value.is_infinite() {
        let sign = if value < 0.0 { "-" } else { "" };
        return (sign, "∞".to_string());
    }

    let fixed = format!("{:.2}", value.abs());
    // A tiny negative that rounds to zero is displayed unsigned.
    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let grouped = match currency {
        DisplayCurrency::Inr => group_indian(whole),
        DisplayCurrency::Usd => group_thousands(whole),
    };
    (sign, format!("{grouped}.{cents}"))
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

// Last three digits form one group, every group before that has two.
fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }
    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut out = String::with_capacity(digits.len() + digits.len() / 2);
    for (idx, ch) in head.chars().enumerate() {
        if idx > 0 && (head.len() - idx) % 2 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out.push(',');
    out.push_str(tail);
    out
}
