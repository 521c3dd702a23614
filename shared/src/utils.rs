// Text helpers for the values the game renders on its mining tab.
// The gauge shows energy with '.' or NBSP as thousand separators ("8.500"),
// the balance uses ',' as a thousand separator ("1,234.5678").

pub mod gauge_format {
    use anyhow::{anyhow, Result};

    const NBSP: char = '\u{00A0}';

    /// Parses energy text such as "8.500", "8 500" or "8500 / 9000" into whole units.
    /// Anything after the leading number is ignored.
    pub fn parse_energy(s: &str) -> Result<i64> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != NBSP && *c != ' ' && *c != '.' && *c != ',')
            .collect();
        let number = leading_number(&normalized, false);
        number
            .parse::<i64>()
            .map_err(|e| anyhow!("Failed to parse energy '{}': {}", s, e))
    }

    /// Parses balance text such as "1,234.5678" into a float.
    pub fn parse_balance(s: &str) -> Result<f64> {
        let normalized: String = s.trim().chars().filter(|c| *c != ',' && *c != NBSP).collect();
        let number = leading_number(&normalized, true);
        number
            .parse::<f64>()
            .map_err(|e| anyhow!("Failed to parse balance '{}': {}", s, e))
    }

    /// Parses a percentage gauge such as "87.5%" or "87,5 %".
    pub fn parse_percent(s: &str) -> Result<f64> {
        let normalized: String = s
            .trim()
            .trim_end_matches('%')
            .chars()
            .filter(|c| *c != NBSP && *c != ' ')
            .map(|c| if c == ',' { '.' } else { c })
            .collect();
        let number = leading_number(&normalized, true);
        number
            .parse::<f64>()
            .map_err(|e| anyhow!("Failed to parse percentage '{}': {}", s, e))
    }

    /// Formats whole units with ',' thousand separators ("9,000").
    pub fn format_thousands(value: i64) -> String {
        let digits = value.unsigned_abs().to_string();
        let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
        if value < 0 {
            out.push('-');
        }
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                out.push(',');
            }
            out.push(c);
        }
        out
    }

    // Longest prefix that looks like a number: optional sign, digits, one optional '.'.
    fn leading_number(s: &str, allow_fraction: bool) -> &str {
        let s = s.trim_start();
        let mut end = 0;
        let mut seen_dot = false;
        for (i, c) in s.char_indices() {
            match c {
                '-' | '+' if i == 0 => {}
                '0'..='9' => {}
                '.' if allow_fraction && !seen_dot => seen_dot = true,
                _ => break,
            }
            end = i + c.len_utf8();
        }
        &s[..end]
    }

}
