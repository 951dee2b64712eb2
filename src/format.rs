//! Numeric display formatting shared by every chart and card.

/// Compact magnitude label: `1.2M`, `35K`, `742`.
///
/// `None` and non-finite values render as `"0"`.
pub fn format_compact(value: Option<f64>) -> String {
    let Some(value) = value.filter(|v| v.is_finite()) else {
        return "0".to_string();
    };

    if value >= 1_000_000.0 {
        return format!("{:.1}M", round_half_up(value / 1_000_000.0, 1));
    }
    if value >= 1_000.0 {
        return format!("{:.0}K", round_half_up(value / 1_000.0, 0));
    }

    format!("{:.0}", round_to_integer(value))
}

pub fn format_currency_compact(value: Option<f64>) -> String {
    format!("$ {}", format_compact(value))
}

/// Whole-dollar amount with thousands separators, e.g. `$12,345`.
pub fn format_usd_whole(value: f64) -> String {
    if !value.is_finite() {
        return "$0".to_string();
    }

    let rounded = round_to_integer(value);
    let sign = if rounded < 0.0 { "-" } else { "" };
    format!("{sign}${}", group_thousands(&format!("{:.0}", rounded.abs())))
}

pub fn format_percent(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return "0%".to_string();
    }
    format!("{:.*}%", decimals, round_half_up(value, decimals as i32))
}

/// Renders a float without a trailing `.0` for whole numbers.
pub fn format_js_number(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    // normalizes -0.0
    format!("{}", value + 0.0)
}

fn round_half_up(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor + 0.5).floor() / factor
}

/// Ties toward +inf. Stays in `f64` so huge magnitudes are not clamped.
fn round_to_integer(value: f64) -> f64 {
    (value + 0.5).floor() + 0.0
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
