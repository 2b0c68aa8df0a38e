use crate::text_metrics;

/// Everything needed to measure a label.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font_size: f64,
    pub font_family: String,
    pub fast_metrics: bool,
}

impl TextStyle {
    pub fn new(font_size: f64, font_family: impl Into<String>, fast_metrics: bool) -> Self {
        Self {
            font_size,
            font_family: font_family.into(),
            fast_metrics,
        }
    }

    pub fn width(&self, text: &str) -> f64 {
        text_width(text, self.font_size, &self.font_family, self.fast_metrics)
    }
}

pub fn text_width(text: &str, font_size: f64, font_family: &str, fast_metrics: bool) -> f64 {
    if text.is_empty() || font_size <= 0.0 {
        return 0.0;
    }
    if fast_metrics {
        return table_text_width(text, font_size);
    }
    text_metrics::measure_text_width(text, font_size, font_family)
        .unwrap_or_else(|| table_text_width(text, font_size))
}

fn table_text_width(text: &str, font_size: f64) -> f64 {
    text.chars().map(char_width_factor).sum::<f64>() * font_size
}

/// Whole percent at or above 1, one significant digit below.
pub fn format_percentage(percent: f64) -> String {
    if !percent.is_finite() || percent == 0.0 {
        return "0".to_string();
    }
    if percent.abs() >= 1.0 {
        return format!("{percent:.0}");
    }
    let exponent = percent.abs().log10().floor() as i32;
    let decimals = (-exponent).max(0) as usize;
    let scale = 10f64.powi(-exponent);
    let rounded = (percent * scale).round() / scale;
    if rounded.abs() >= 1.0 {
        format!("{rounded:.0}")
    } else {
        format!("{rounded:.decimals$}")
    }
}

fn char_width_factor(ch: char) -> f64 {
    // Advance widths in ems for a generic sans-serif face.
    match ch {
        ' ' => 0.306,
        '\\' | '.' | ',' | ':' | ';' | '|' | '!' | '(' | ')' | '[' | ']' | '{' | '}' => 0.321,
        'A' => 0.652,
        'B' => 0.648,
        'C' => 0.734,
        'D' => 0.723,
        'E' => 0.594,
        'F' => 0.575,
        'G' | 'H' => 0.742,
        'I' => 0.272,
        'J' => 0.557,
        'K' => 0.648,
        'L' => 0.559,
        'M' => 0.903,
        'N' => 0.763,
        'O' => 0.754,
        'P' => 0.623,
        'Q' => 0.755,
        'R' => 0.637,
        'S' => 0.633,
        'T' => 0.599,
        'U' => 0.746,
        'V' => 0.661,
        'W' => 0.958,
        'X' => 0.655,
        'Y' => 0.646,
        'Z' => 0.621,
        'a' => 0.550,
        'b' => 0.603,
        'c' => 0.547,
        'd' => 0.609,
        'e' => 0.570,
        'f' => 0.340,
        'g' | 'h' => 0.600,
        'i' => 0.235,
        'j' => 0.227,
        'k' => 0.522,
        'l' => 0.239,
        'm' => 0.867,
        'n' => 0.585,
        'o' => 0.574,
        'p' => 0.595,
        'q' => 0.585,
        'r' => 0.364,
        's' => 0.523,
        't' => 0.305,
        'u' => 0.585,
        'v' => 0.545,
        'w' => 0.811,
        'x' => 0.538,
        'y' => 0.556,
        'z' => 0.550,
        '0' => 0.613,
        '1' => 0.396,
        '2' => 0.609,
        '3' => 0.597,
        '4' => 0.614,
        '5' => 0.586,
        '6' => 0.608,
        '7' => 0.559,
        '8' => 0.611,
        '9' => 0.595,
        '@' | '#' | '%' | '&' => 0.946,
        _ => 0.568,
    }
}
