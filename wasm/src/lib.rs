use serde::Deserialize;
use sunburst_rs::config::Config;
use sunburst_rs::theme::Theme;
use sunburst_rs::{Intent, Sunburst, render_snapshot};
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SunburstRenderOptions {
    theme: Option<String>,
    font_family: Option<String>,
    font_size: Option<f64>,
    width: Option<f64>,
    height: Option<f64>,
    /// View state query string, as produced by the viewer's link button.
    link: Option<String>,
}

fn build_config(options: &SunburstRenderOptions) -> Config {
    let mut config = Config::default();
    if options.theme.as_deref() == Some("modern") {
        config.theme = Theme::modern();
        config.render.background = config.theme.background.clone();
    }
    if let Some(font_family) = &options.font_family {
        config.theme.font_family = font_family.clone();
    }
    if let Some(font_size) = options.font_size {
        config.theme.font_size = font_size;
    }
    if let Some(width) = options.width {
        config.render.width = width;
    }
    if let Some(height) = options.height {
        config.render.height = height;
    }
    config
}

fn render(document: &str, options: SunburstRenderOptions) -> Result<String, String> {
    let config = build_config(&options);
    let mut session = Sunburst::from_document(document, config).map_err(|error| error.to_string())?;
    if let Some(link) = options.link {
        session.push(Intent::ApplyLink(link));
    }
    session.settle();
    Ok(render_snapshot(&session))
}

#[wasm_bindgen]
pub fn render_sunburst_svg(document: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let options = if let Some(raw_options) = options_json {
        serde_json::from_str::<SunburstRenderOptions>(&raw_options)
            .map_err(|error| JsValue::from_str(&error.to_string()))?
    } else {
        SunburstRenderOptions::default()
    };
    render(document, options).map_err(|error| JsValue::from_str(&error))
}

#[cfg(test)]
mod tests {
    use crate::{SunburstRenderOptions, build_config, render};

    const DOCUMENT: &str = r#"{
        magnitude: "count",
        node: { name: "all", count: 10, children: [
            { name: "left", count: 6, children: [{ name: "inner", count: 4 }] },
            { name: "right", count: 4 },
        ] },
    }"#;

    #[test]
    fn renders_a_linked_view() {
        let options = SunburstRenderOptions {
            link: Some("node=1".to_string()),
            ..Default::default()
        };
        let svg = render(DOCUMENT, options).expect("document should render");
        assert!(svg.contains("<svg"));
        assert!(svg.contains("<title>Sunburst (snapshot) - left</title>"));
    }

    #[test]
    fn options_override_the_theme() {
        let options: SunburstRenderOptions =
            serde_json::from_str(r#"{"theme":"modern","fontSize":14,"width":400}"#).unwrap();
        let config = build_config(&options);
        assert_eq!(config.theme.font_size, 14.0);
        assert_eq!(config.render.width, 400.0);
        assert!(config.theme.font_family.starts_with("Inter"));
    }

    #[test]
    fn bad_documents_are_reported() {
        assert!(render("{ node: ", SunburstRenderOptions::default()).is_err());
    }
}
