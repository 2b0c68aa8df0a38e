use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub tween_length_ms: f64,
    pub tween_curvature: f64,
    pub tick_interval_ms: f64,
    pub quick_look_hold_ms: f64,
    /// Rings narrower than `font_size * min_ring_width_factor` are not
    /// worth drawing when radii are uniform.
    pub min_ring_width_factor: f64,
    /// Wedges narrower than `font_size * min_width_factor` pixels get
    /// hidden or keyed.
    pub min_width_factor: f64,
    pub history_spacing_factor: f64,
    pub label_width_fudge: f64,
    pub max_label_offsets: usize,
    pub max_key_size_factor: f64,
    pub buffer_factor: f64,
    pub margin_factor: f64,
    pub saturation: f64,
    pub lightness_base: f64,
    pub lightness_max: f64,
    pub compress: bool,
    pub shorten: bool,
    pub fast_text_metrics: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            tween_length_ms: 850.0,
            tween_curvature: 13.0,
            tick_interval_ms: 20.0,
            quick_look_hold_ms: 200.0,
            min_ring_width_factor: 5.0,
            min_width_factor: 2.3,
            history_spacing_factor: 1.6,
            label_width_fudge: 1.05,
            max_label_offsets: 5,
            max_key_size_factor: 2.0,
            buffer_factor: 0.1,
            margin_factor: 0.015,
            saturation: 0.5,
            lightness_base: 0.6,
            lightness_max: 0.8,
            compress: true,
            shorten: true,
            fast_text_metrics: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f64,
    pub height: f64,
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1000.0,
            height: 700.0,
            background: "#FFFFFF".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        let theme = Theme::krona();
        let render = RenderConfig {
            background: theme.background.clone(),
            ..Default::default()
        };
        Self {
            theme,
            layout: LayoutConfig::default(),
            render,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f64>,
    background: Option<String>,
    text_color: Option<String>,
    line_color: Option<String>,
    unclassified_color: Option<String>,
    highlight_fill: Option<String>,
    search_highlight: Option<String>,
    pattern_color: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnimationConfigFile {
    tween_length: Option<f64>,
    curvature: Option<f64>,
    tick_interval: Option<f64>,
    quick_look_hold: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    min_ring_width_factor: Option<f64>,
    min_width_factor: Option<f64>,
    history_spacing_factor: Option<f64>,
    label_width_fudge: Option<f64>,
    max_label_offsets: Option<usize>,
    max_key_size_factor: Option<f64>,
    buffer_factor: Option<f64>,
    margin_factor: Option<f64>,
    saturation: Option<f64>,
    lightness_base: Option<f64>,
    lightness_max: Option<f64>,
    compress: Option<bool>,
    shorten: Option<bool>,
    fast_text_metrics: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderConfigFile {
    width: Option<f64>,
    height: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    animation: Option<AnimationConfigFile>,
    layout: Option<LayoutConfigFile>,
    render: Option<RenderConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    let parsed: ConfigFile = serde_json::from_str(&contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        if theme_name == "modern" {
            config.theme = Theme::modern();
        } else if theme_name == "default" || theme_name == "krona" || theme_name == "classic" {
            config.theme = Theme::krona();
        } else {
            log::warn!("unknown theme '{theme_name}', keeping the default");
        }
        config.render.background = config.theme.background.clone();
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            config.theme.font_size = v.max(1.0);
        }
        if let Some(v) = vars.background {
            config.render.background = v.clone();
            config.theme.background = v;
        }
        if let Some(v) = vars.text_color {
            config.theme.text_color = v;
        }
        if let Some(v) = vars.line_color {
            config.theme.line_color = v;
        }
        if let Some(v) = vars.unclassified_color {
            config.theme.unclassified_color = v;
        }
        if let Some(v) = vars.highlight_fill {
            config.theme.highlight_fill = v;
        }
        if let Some(v) = vars.search_highlight {
            config.theme.search_highlight = v;
        }
        if let Some(v) = vars.pattern_color {
            config.theme.pattern_color = v;
        }
    }

    if let Some(animation) = parsed.animation {
        if let Some(v) = animation.tween_length {
            config.layout.tween_length_ms = v.max(0.0);
        }
        if let Some(v) = animation.curvature {
            config.layout.tween_curvature = v;
        }
        if let Some(v) = animation.tick_interval {
            config.layout.tick_interval_ms = v.max(1.0);
        }
        if let Some(v) = animation.quick_look_hold {
            config.layout.quick_look_hold_ms = v.max(0.0);
        }
    }

    if let Some(layout) = parsed.layout {
        let target = &mut config.layout;
        if let Some(v) = layout.min_ring_width_factor {
            target.min_ring_width_factor = v;
        }
        if let Some(v) = layout.min_width_factor {
            target.min_width_factor = v;
        }
        if let Some(v) = layout.history_spacing_factor {
            target.history_spacing_factor = v;
        }
        if let Some(v) = layout.label_width_fudge {
            target.label_width_fudge = v;
        }
        if let Some(v) = layout.max_label_offsets {
            target.max_label_offsets = v.max(1);
        }
        if let Some(v) = layout.max_key_size_factor {
            target.max_key_size_factor = v;
        }
        if let Some(v) = layout.buffer_factor {
            target.buffer_factor = v;
        }
        if let Some(v) = layout.margin_factor {
            target.margin_factor = v;
        }
        if let Some(v) = layout.saturation {
            target.saturation = v.clamp(0.0, 1.0);
        }
        if let Some(v) = layout.lightness_base {
            target.lightness_base = v.clamp(0.0, 1.0);
        }
        if let Some(v) = layout.lightness_max {
            target.lightness_max = v.clamp(0.0, 1.0);
        }
        if let Some(v) = layout.compress {
            target.compress = v;
        }
        if let Some(v) = layout.shorten {
            target.shorten = v;
        }
        if let Some(v) = layout.fast_text_metrics {
            target.fast_text_metrics = v;
        }
    }

    if let Some(render) = parsed.render {
        if let Some(v) = render.width {
            config.render.width = v;
        }
        if let Some(v) = render.height {
            config.render.height = v;
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_yields_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config.layout.tween_length_ms, 850.0);
        assert_eq!(config.theme.font_size, 11.0);
    }

    #[test]
    fn overlays_only_present_fields() {
        let dir = std::env::temp_dir().join(format!("sunburst-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(
            &path,
            r#"{"theme":"modern","themeVariables":{"fontSize":14},"animation":{"tweenLength":400},"layout":{"compress":false}}"#,
        )
        .unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.theme.font_size, 14.0);
        assert_eq!(config.theme.text_color, Theme::modern().text_color);
        assert_eq!(config.layout.tween_length_ms, 400.0);
        assert!(!config.layout.compress);
        assert!(config.layout.shorten);
        let _ = std::fs::remove_dir_all(dir);
    }
}
