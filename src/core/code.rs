//! Stock code normalization
//!
//! Every identifier that enters the cache is rewritten into one canonical,
//! exchange-prefixed form (`SH600000`, `SZ000001`, `BJ830799`).
//! Pure functions, no state.

use std::fmt;

/// Exchange a canonical code is prefixed with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Exchange {
    Shanghai,
    Shenzhen,
    Beijing,
}

impl Exchange {
    /// Two-letter canonical prefix
    #[inline]
    pub const fn prefix(&self) -> &'static str {
        match self {
            Exchange::Shanghai => "SH",
            Exchange::Shenzhen => "SZ",
            Exchange::Beijing => "BJ",
        }
    }

    /// Parse an uppercase two-letter prefix
    #[inline]
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "SH" => Some(Exchange::Shanghai),
            "SZ" => Some(Exchange::Shenzhen),
            "BJ" => Some(Exchange::Beijing),
            _ => None,
        }
    }

    /// Infer the listing exchange from a bare 6-digit code
    ///
    /// Shanghai: 60xxxx, 68xxxx (605xxx included)
    /// Shenzhen: 00xxxx, 300xxx
    /// Beijing: 8xxxxx, 43xxxx (83/87 fall under the leading 8)
    pub fn infer(digits: &str) -> Option<Self> {
        if !is_six_digits(digits) {
            return None;
        }

        if digits.starts_with("60") || digits.starts_with("68") || digits.starts_with("605") {
            Some(Exchange::Shanghai)
        } else if digits.starts_with("00") || digits.starts_with("300") {
            Some(Exchange::Shenzhen)
        } else if digits.starts_with('8')
            || digits.starts_with("43")
            || digits.starts_with("83")
            || digits.starts_with("87")
        {
            Some(Exchange::Beijing)
        } else {
            None
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// True when `s` is exactly six ASCII digits
#[inline]
pub fn is_six_digits(s: &str) -> bool {
    s.len() == 6 && s.bytes().all(|b| b.is_ascii_digit())
}

/// Split an already uppercased code into its exchange prefix and remainder
#[inline]
fn split_prefix(upper: &str) -> Option<(Exchange, &str)> {
    if upper.len() <= 2 || !upper.is_char_boundary(2) {
        return None;
    }
    let (prefix, rest) = upper.split_at(2);
    Exchange::from_prefix(prefix).map(|ex| (ex, rest))
}

/// Normalize an arbitrary stock identifier into canonical form
///
/// Never fails. Empty input is returned unchanged; input whose exchange
/// cannot be inferred is returned trimmed and uppercased.
pub fn normalize(code: &str) -> String {
    if code.is_empty() {
        return String::new();
    }

    let upper = code.trim().to_uppercase();

    if split_prefix(&upper).is_some() {
        return upper;
    }

    match Exchange::infer(&upper) {
        Some(exchange) => {
            let mut out = String::with_capacity(8);
            out.push_str(exchange.prefix());
            out.push_str(&upper);
            out
        }
        None => upper,
    }
}

/// Keys to try, in order, when resolving a name for `code`
///
/// 1. the uppercased input as-is
/// 2. its normalized form
/// 3. the digits with an `SH`/`SZ`/`BJ` prefix stripped
/// 4. for bare 6-digit input, the digits with the inferred prefix added
///
/// Duplicates are removed while keeping the first position.
pub fn lookup_candidates(code: &str) -> Vec<String> {
    let upper = code.trim().to_uppercase();
    if upper.is_empty() {
        return Vec::new();
    }

    let mut candidates: Vec<String> = Vec::with_capacity(4);
    let mut push = |key: String| {
        if !key.is_empty() && !candidates.contains(&key) {
            candidates.push(key);
        }
    };

    push(upper.clone());
    push(normalize(&upper));

    if let Some((_, rest)) = split_prefix(&upper) {
        push(rest.to_string());
    }

    if let Some(exchange) = Exchange::infer(&upper) {
        push(format!("{}{}", exchange.prefix(), upper));
    }

    candidates
}
