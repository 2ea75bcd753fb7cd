//! Digest layout.

use crate::aggregator::Sections;

/// Lay out the digest:
///
/// ```text
/// 📌 16.10.2026 Cuma 08:00
///
/// <weather>
/// <metals>
/// <crypto>
///
/// <matches>
/// ```
///
/// With `include_debug`, a `DEBUG: sources` block listing every source's
/// status is appended after a `---` separator.
pub fn compose(timestamp: &str, sections: &Sections, include_debug: bool) -> String {
    let mut lines = vec![
        format!("📌 {timestamp}"),
        String::new(),
        sections.weather.clone(),
        sections.metals.clone(),
        sections.crypto.clone(),
        String::new(),
        sections.matches.clone(),
    ];

    if include_debug {
        lines.push(String::new());
        lines.push("---".into());
        lines.push("DEBUG: sources".into());
        for report in &sections.reports {
            let mark = if report.status.is_ok() { "✅" } else { "❌" };
            lines.push(format!("- {mark} {}: {}", report.label, report.status));
        }
    }

    lines.join("\n")
}
