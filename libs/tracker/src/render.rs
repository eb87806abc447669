use crate::price_client::GasTiers;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
}

impl Trend {
    /// Strictly greater is up; an unchanged value counts as down.
    pub fn between(previous: f64, current: f64) -> Self {
        if current > previous {
            Trend::Up
        } else {
            Trend::Down
        }
    }

    pub fn arrow(self) -> &'static str {
        match self {
            Trend::Up => "↗️",
            Trend::Down => "↘️",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Green,
    Red,
}

impl Color {
    pub fn emoji(self) -> &'static str {
        match self {
            Color::Green => "🟢",
            Color::Red => "🔴",
        }
    }
}

/// Indicator and label computed for one display slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub color: Color,
    pub trend: Trend,
    pub label: String,
}

/// Render a spot price, comparing against the previous observation.
pub fn render_spot(asset: &str, previous: f64, current: f64) -> Rendered {
    let trend = Trend::between(previous, current);
    let color = match trend {
        Trend::Up => Color::Green,
        Trend::Down => Color::Red,
    };
    spot(asset, color, trend, current)
}

/// Render the first observation of a spot price, shown as rising.
pub fn render_spot_first(asset: &str, current: f64) -> Rendered {
    spot(asset, Color::Green, Trend::Up, current)
}

fn spot(asset: &str, color: Color, trend: Trend, value: f64) -> Rendered {
    Rendered {
        color,
        trend,
        label: format!(
            "{} {} {}: ${}",
            color.emoji(),
            trend.arrow(),
            asset,
            format_thousands(value)
        ),
    }
}

/// Render the gas fee from the oracle tiers.
///
/// The medium tier is the displayed value. At or above the high tier it is
/// red/up; anything below that, including below the low tier, is green/down.
pub fn render_gas(tiers: &GasTiers) -> Rendered {
    let value = tiers.medium;
    let (color, trend) = if value >= tiers.high {
        (Color::Red, Trend::Up)
    } else {
        (Color::Green, Trend::Down)
    };

    Rendered {
        color,
        trend,
        label: format!(
            "{} {} GAS: {:.2} Gwei",
            color.emoji(),
            trend.arrow(),
            value
        ),
    }
}

/// Two decimals with comma thousands separators: `65000.0` -> `65,000.00`.
pub fn format_thousands(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && fixed.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        "-"
    } else {
        ""
    };
    format!("{sign}{grouped}.{frac_part}")
}
