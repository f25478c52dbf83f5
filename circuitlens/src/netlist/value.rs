//! Component value lexer
//!
//! Turns strings such as `"10k"`, `"100nF"`, `"4k7"`, `"2.2 µF"`, `"1MEG"` or
//! `"5V"` into a mantissa, an engineering multiplier and an optional unit.
//! The lexer is total: any input yields either [`ParsedValue::Parsed`] or
//! [`ParsedValue::Unparsed`], never a panic or an error.
//!
//! Multipliers are case-sensitive where it matters: `m` is milli, `M` and
//! `meg` (any case) are mega. Output text uses SPICE suffixes, so mega is
//! written `Meg`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Multiplier {
    Pico,
    Nano,
    Micro,
    Milli,
    Unit,
    Kilo,
    Mega,
    Giga,
}

impl Multiplier {
    pub fn factor(&self) -> f64 {
        match self {
            Multiplier::Pico => 1e-12,
            Multiplier::Nano => 1e-9,
            Multiplier::Micro => 1e-6,
            Multiplier::Milli => 1e-3,
            Multiplier::Unit => 1.0,
            Multiplier::Kilo => 1e3,
            Multiplier::Mega => 1e6,
            Multiplier::Giga => 1e9,
        }
    }

    pub fn spice_suffix(&self) -> &'static str {
        match self {
            Multiplier::Pico => "p",
            Multiplier::Nano => "n",
            Multiplier::Micro => "u",
            Multiplier::Milli => "m",
            Multiplier::Unit => "",
            Multiplier::Kilo => "k",
            Multiplier::Mega => "Meg",
            Multiplier::Giga => "G",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "" => Some(Multiplier::Unit),
            "p" | "P" => Some(Multiplier::Pico),
            "n" | "N" => Some(Multiplier::Nano),
            "u" | "U" => Some(Multiplier::Micro),
            "m" => Some(Multiplier::Milli),
            "k" | "K" => Some(Multiplier::Kilo),
            "M" => Some(Multiplier::Mega),
            "g" | "G" => Some(Multiplier::Giga),
            t if t.eq_ignore_ascii_case("meg") => Some(Multiplier::Mega),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Ohm,
    Farad,
    Henry,
    Volt,
    Ampere,
    Hertz,
}

/// Unit symbols matched against the lowercased tail, longest first.
const UNIT_SUFFIXES: &[(&str, Unit)] = &[
    ("ohms", Unit::Ohm),
    ("ohm", Unit::Ohm),
    ("hz", Unit::Hertz),
    ("ω", Unit::Ohm),
    ("r", Unit::Ohm),
    ("f", Unit::Farad),
    ("h", Unit::Henry),
    ("v", Unit::Volt),
    ("a", Unit::Ampere),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ParsedValue {
    Parsed {
        mantissa: f64,
        multiplier: Multiplier,
        unit: Option<Unit>,
    },
    Unparsed {
        raw: String,
    },
}

impl ParsedValue {
    pub fn is_parsed(&self) -> bool {
        matches!(self, ParsedValue::Parsed { .. })
    }

    /// Numeric value in base units.
    pub fn magnitude(&self) -> Option<f64> {
        match self {
            ParsedValue::Parsed {
                mantissa, multiplier, ..
            } => Some(mantissa * multiplier.factor()),
            ParsedValue::Unparsed { .. } => None,
        }
    }

    pub fn unit(&self) -> Option<Unit> {
        match self {
            ParsedValue::Parsed { unit, .. } => *unit,
            ParsedValue::Unparsed { .. } => None,
        }
    }

    /// SPICE text for the value, unit symbols stripped (`"100nF"` → `"100n"`).
    pub fn spice_text(&self) -> Option<String> {
        match self {
            ParsedValue::Parsed {
                mantissa, multiplier, ..
            } => Some(format!("{}{}", format_mantissa(*mantissa), multiplier.spice_suffix())),
            ParsedValue::Unparsed { .. } => None,
        }
    }
}

fn format_mantissa(value: f64) -> String {
    if value == 0.0 {
        // avoids "-0"
        return "0".to_string();
    }
    format!("{}", value)
}

/// Lex a component value string.
pub fn parse_value(input: &str) -> ParsedValue {
    let unparsed = || ParsedValue::Unparsed {
        raw: input.to_string(),
    };

    let cleaned: String = input
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            'µ' | 'μ' => 'u',
            '\u{2126}' => 'Ω',
            other => other,
        })
        .collect();
    if cleaned.is_empty() {
        return unparsed();
    }

    let Some((number, rest)) = split_number(&cleaned) else {
        return unparsed();
    };

    // RKM notation: "4k7", "2R2", "1M5" put the multiplier in place of the point.
    let (number, rest) = match rkm_split(&number, rest) {
        Some((joined, tail)) => (joined, tail),
        None => (number, rest.to_string()),
    };

    let Ok(mantissa) = number.parse::<f64>() else {
        return unparsed();
    };
    if !mantissa.is_finite() {
        return unparsed();
    }

    let (prefix, unit) = strip_unit(&rest);
    match Multiplier::from_token(prefix) {
        Some(multiplier) => ParsedValue::Parsed {
            mantissa,
            multiplier,
            unit,
        },
        None => unparsed(),
    }
}

/// Split a leading decimal number (sign, digits, point, exponent) from the rest.
fn split_number(s: &str) -> Option<(String, &str)> {
    let bytes = s.as_bytes();
    let mut i = 0;
    if i < bytes.len() && (bytes[i] == b'-' || bytes[i] == b'+') {
        i += 1;
    }
    let digits_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut saw_digits = i > digits_start;
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        saw_digits |= i > frac_start;
    }
    if !saw_digits {
        return None;
    }
    // Exponent only when digits follow, so "1e" is left for the suffix check.
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'-' || bytes[j] == b'+') {
            j += 1;
        }
        let exp_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }
    Some((s[..i].to_string(), &s[i..]))
}

fn rkm_split(number: &str, rest: &str) -> Option<(String, String)> {
    if number.contains(['.', 'e', 'E']) {
        return None;
    }
    let mut chars = rest.char_indices();
    let (_, marker) = chars.next()?;
    let multiplier = match marker {
        'r' | 'R' => "",
        'p' | 'n' | 'u' | 'm' | 'k' | 'K' | 'M' | 'G' => &rest[..marker.len_utf8()],
        _ => return None,
    };
    let after = &rest[marker.len_utf8()..];
    let frac_len = after.bytes().take_while(|b| b.is_ascii_digit()).count();
    if frac_len == 0 {
        return None;
    }
    let joined = format!("{}.{}", number, &after[..frac_len]);
    let tail = format!("{}{}", multiplier, &after[frac_len..]);
    Some((joined, tail))
}

/// Strip the longest matching unit suffix (case-insensitive).
fn strip_unit(rest: &str) -> (&str, Option<Unit>) {
    let lower = rest.to_lowercase();
    for (suffix, unit) in UNIT_SUFFIXES {
        if lower.ends_with(suffix) && lower.len() == rest.len() {
            let cut = rest.len() - suffix.len();
            if rest.is_char_boundary(cut) {
                return (&rest[..cut], Some(*unit));
            }
        }
    }
    (rest, None)
}
