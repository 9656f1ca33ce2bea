//! Per-column numeric output formats and the tolerances derived from them.
//!
//! Every output column carries a printf-style format specifier which is used
//! both to serialize the column and, mechanically, to decide the comparison
//! tolerance when a previously written file is checked against a new grid.

use serde::{Deserialize, Serialize};

use crate::errors::{DataError, FgResult};

/// Default format for frequency-evolution (Doppler) parameters.
pub const DOPPLER_FORMAT: &str = "%.16g";
/// Default format for detection statistics.
pub const DETSTAT_FORMAT: &str = "%.9g";
/// Format for integer-valued columns such as transient times.
pub const INTEGER_FORMAT: &str = "%d";

/// A parsed printf-style format specifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormatSpec {
    /// `%d`: integer rendering, exact-match comparison.
    Integer,
    /// `%.Df`: fixed decimals, absolute tolerance `10^-D`.
    Fixed(usize),
    /// `%.Pg`: significant digits, relative tolerance `10^(1-P)`.
    Sig(usize),
}

impl FormatSpec {
    /// Parse a `%d` / `%.Df` / `%.Pg` specifier. Anything else is a
    /// configuration error.
    pub fn parse(fmt: &str) -> FgResult<Self> {
        let malformed = || DataError::MalformedFormat {
            fmt: fmt.to_string(),
        };
        let body = fmt.strip_prefix('%').ok_or_else(malformed)?;
        if body == "d" {
            return Ok(Self::Integer);
        }
        let rest = body.strip_prefix('.').ok_or_else(malformed)?;
        let suffix = rest.chars().last().ok_or_else(malformed)?;
        let n: usize = rest[..rest.len() - suffix.len_utf8()]
            .parse()
            .map_err(|_| malformed())?;
        match suffix {
            'f' => Ok(Self::Fixed(n)),
            'g' => Ok(Self::Sig(n.max(1))),
            _ => Err(malformed().into()),
        }
    }

    /// Serialize one value with this format.
    pub fn render(&self, value: f64) -> String {
        match self {
            Self::Integer => format!("{}", value.round() as i64),
            Self::Fixed(decimals) => format!("{:.*}", *decimals, value),
            Self::Sig(digits) => render_sig(value, *digits),
        }
    }

    /// The (relative, absolute) comparison tolerance implied by this format.
    pub fn tolerance(&self) -> (f64, f64) {
        match self {
            Self::Integer => (0.0, 0.0),
            Self::Fixed(decimals) => (0.0, 10f64.powi(-(*decimals as i32))),
            Self::Sig(digits) => (10f64.powi(1 - *digits as i32), 0.0),
        }
    }
}

/// C-style `%g`: `digits` significant digits, trailing zeros trimmed,
/// scientific notation outside [1e-4, 10^digits).
fn render_sig(value: f64, digits: usize) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return format!("{value}");
    }
    let exp = value.abs().log10().floor() as i32;
    if exp < -4 || exp >= digits as i32 {
        let s = format!("{:.*e}", digits.saturating_sub(1), value);
        match s.split_once('e') {
            Some((mantissa, exponent)) => {
                format!("{}e{}", trim_trailing_zeros(mantissa), exponent)
            }
            None => s,
        }
    } else {
        let decimals = (digits as i32 - 1 - exp).max(0) as usize;
        trim_trailing_zeros(&format!("{:.*}", decimals, value))
    }
}

fn trim_trailing_zeros(s: &str) -> String {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s.to_string()
    }
}

/// Elementwise closeness test with numpy semantics:
/// `|a - b| <= atol + rtol * |b|`.
pub fn allclose(a: &[f64], b: &[f64], rtol: f64, atol: f64) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b.iter())
            .all(|(x, y)| (x - y).abs() <= atol + rtol * y.abs())
}

/// The ordered output column list with per-column formats.
///
/// Computed once before execution begins; the column set is immutable for
/// the whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSchema {
    entries: Vec<(String, FormatSpec)>,
}

impl OutputSchema {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append a column with a printf-style format string.
    pub fn push(&mut self, column: impl Into<String>, fmt: &str) -> FgResult<()> {
        self.entries.push((column.into(), FormatSpec::parse(fmt)?));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn columns(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn format_for(&self, column: &str) -> Option<FormatSpec> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, fmt)| *fmt)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, FormatSpec)> {
        self.entries.iter()
    }
}

impl Default for OutputSchema {
    fn default() -> Self {
        Self::new()
    }
}
