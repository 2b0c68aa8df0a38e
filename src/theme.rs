use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f64,
    pub background: String,
    pub text_color: String,
    pub line_color: String,
    pub unclassified_color: String,
    pub highlight_fill: String,
    pub search_highlight: String,
    pub pattern_color: String,
}

impl Theme {
    pub fn krona() -> Self {
        Self {
            font_family: "sans-serif".to_string(),
            font_size: 11.0,
            background: "#FFFFFF".to_string(),
            text_color: "#000000".to_string(),
            line_color: "#000000".to_string(),
            unclassified_color: "rgb(220,220,220)".to_string(),
            highlight_fill: "rgba(255,255,255,0.3)".to_string(),
            search_highlight: "rgb(255,255,100)".to_string(),
            pattern_color: "rgb(200,200,200)".to_string(),
        }
    }

    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 12.0,
            background: "#FFFFFF".to_string(),
            text_color: "#1C2430".to_string(),
            line_color: "#7A8AA6".to_string(),
            unclassified_color: "#E4E8EF".to_string(),
            highlight_fill: "rgba(255,255,255,0.35)".to_string(),
            search_highlight: "#FFF3A3".to_string(),
            pattern_color: "#C7D2E5".to_string(),
        }
    }
}

/// HSL (all components in `[0, 1]`) to integer-valued RGB channels.
pub fn hsl_to_rgb(hue: f64, saturation: f64, lightness: f64) -> [f64; 3] {
    if saturation == 0.0 {
        let gray = (lightness * 255.0).floor();
        return [gray, gray, gray];
    }
    let m2 = if lightness <= 0.5 {
        lightness * (saturation + 1.0)
    } else {
        lightness + saturation - lightness * saturation
    };
    let m1 = lightness * 2.0 - m2;
    [
        (hue_to_rgb(m1, m2, hue + 1.0 / 3.0) * 255.0).floor(),
        (hue_to_rgb(m1, m2, hue) * 255.0).floor(),
        (hue_to_rgb(m1, m2, hue - 1.0 / 3.0) * 255.0).floor(),
    ]
}

fn hue_to_rgb(m1: f64, m2: f64, hue: f64) -> f64 {
    let hue = if hue < 0.0 {
        hue + 1.0
    } else if hue > 1.0 {
        hue - 1.0
    } else {
        hue
    };
    if hue * 6.0 < 1.0 {
        m1 + (m2 - m1) * hue * 6.0
    } else if hue * 2.0 < 1.0 {
        m2
    } else if hue * 3.0 < 2.0 {
        m1 + (m2 - m1) * (2.0 / 3.0 - hue) * 6.0
    } else {
        m1
    }
}

pub fn rgb_string(r: f64, g: f64, b: f64) -> String {
    let channel = |value: f64| value.round().clamp(0.0, 255.0) as u8;
    format!("rgb({},{},{})", channel(r), channel(g), channel(b))
}

pub fn hue_string(hue: f64, saturation: f64, lightness: f64) -> String {
    let [r, g, b] = hsl_to_rgb(hue, saturation, lightness);
    rgb_string(r, g, b)
}
