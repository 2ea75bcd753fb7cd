//! Number and name formatting shared by adapters.

/// `+1.23%`, `-0.50%`, or `N/A` when absent / not a number.
pub fn fmt_pct(value: Option<f64>) -> String {
    match value {
        Some(n) if n.is_finite() => {
            // avoid "+-0.00%"
            let n = if n == 0.0 { 0.0 } else { n };
            let sign = if n >= 0.0 { "+" } else { "" };
            format!("{sign}{n:.2}%")
        }
        _ => "N/A".to_string(),
    }
}

/// Normalize a team name for favorite matching: lowercase, fold Turkish
/// letters to ASCII, drop everything but `[a-z0-9 ]`, collapse spaces.
pub fn normalize_team(name: &str) -> String {
    let folded: String = name
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'ı' => 'i',
            'ş' => 's',
            'ğ' => 'g',
            'ü' => 'u',
            'ö' => 'o',
            'ç' => 'c',
            other => other,
        })
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace())
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}
