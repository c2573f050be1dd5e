//! Shortest-form numeric literal rendering.
//!
//! Every finite number has several equivalent spellings: plain decimal,
//! normalized scientific notation, and a scientific form obtained by
//! trimming the trailing zeros of an integral decimal (`12000000000` →
//! `12e9`). The printer picks the shortest, preferring the scientific
//! spelling on ties when the option asks for it, and reduces a leading
//! `0.` to a bare dot (`.5`) wherever the grammar allows.

/// Render `value` in its shortest textual form. `scientific` breaks length
/// ties in favour of exponent spellings.
pub fn format_number(value: f64, scientific: bool) -> String {
    pick(value, scientific, true)
}

/// Like [`format_number`] but never produces a leading-dot form. The right
/// operand of `..` must not start with a dot: `x .. .5` would lex the dots
/// as part of a longer token.
pub fn format_number_no_leading_dot(value: f64, scientific: bool) -> String {
    pick(value, scientific, false)
}

fn pick(value: f64, scientific: bool, allow_leading_dot: bool) -> String {
    if !value.is_finite() {
        // Unreachable through the parser; render something stable anyway.
        return format!("{}", value);
    }
    let mut best: Option<String> = None;
    for candidate in candidates(value) {
        let candidate = if allow_leading_dot {
            reduce_leading_zero(candidate)
        } else {
            candidate
        };
        best = Some(match best {
            None => candidate,
            Some(current) => {
                let shorter = candidate.len() < current.len();
                let tie_to_sci = candidate.len() == current.len()
                    && scientific
                    && candidate.contains('e')
                    && !current.contains('e');
                if shorter || tie_to_sci {
                    candidate
                } else {
                    current
                }
            }
        });
    }
    best.unwrap_or_default()
}

fn candidates(value: f64) -> Vec<String> {
    let plain = format!("{}", value);
    let mut out = vec![plain.clone()];

    let sci = format!("{:e}", value);
    if sci != plain {
        out.push(sci);
    }

    // Integral decimals with a run of trailing zeros: 12000000000 -> 12e9.
    if !plain.contains('.') && !plain.contains('e') {
        let (sign, digits) = match plain.strip_prefix('-') {
            Some(rest) => ("-", rest),
            None => ("", plain.as_str()),
        };
        let trimmed = digits.trim_end_matches('0');
        let zeros = digits.len() - trimmed.len();
        if zeros > 0 && !trimmed.is_empty() {
            out.push(format!("{}{}e{}", sign, trimmed, zeros));
        }
    }

    out
}

fn reduce_leading_zero(text: String) -> String {
    if let Some(rest) = text.strip_prefix("0.") {
        return format!(".{}", rest);
    }
    if let Some(rest) = text.strip_prefix("-0.") {
        return format!("-.{}", rest);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_fraction_prefers_scientific_on_tie() {
        assert_eq!(format_number(0.00012, true), "1.2e-4");
        assert_eq!(format_number(0.00012, false), ".00012");
    }

    #[test]
    fn trailing_zeros_become_an_exponent() {
        assert_eq!(format_number(12000000000.0, true), "12e9");
        assert_eq!(format_number(12000000000.0, false), "12e9");
    }

    #[test]
    fn plain_integers_stay_plain() {
        assert_eq!(format_number(42.0, true), "42");
        assert_eq!(format_number(0.0, true), "0");
        assert_eq!(format_number(-7.0, true), "-7");
    }

    #[test]
    fn leading_dot_reduction() {
        assert_eq!(format_number(0.5, true), ".5");
        assert_eq!(format_number(-0.5, true), "-.5");
    }

    #[test]
    fn concat_right_operand_keeps_the_zero() {
        assert_eq!(format_number_no_leading_dot(0.5, true), "0.5");
        assert_eq!(format_number_no_leading_dot(-0.5, true), "-0.5");
    }
}
