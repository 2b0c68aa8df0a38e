use crate::config::load_config;
use crate::layout_dump::write_layout_dump;
use crate::render::{render_snapshot, write_output_png, write_output_svg};
use crate::session::{Intent, Sunburst};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "sunburst", version, about = "Sunburst snapshots of weighted hierarchies")]
pub struct Args {
    /// Input tree document (JSON/JSON5) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file (svg/png). Defaults to stdout for SVG if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON file (theme and layout overrides)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Width
    #[arg(short = 'w', long = "width")]
    pub width: Option<f64>,

    /// Height
    #[arg(short = 'H', long = "height")]
    pub height: Option<f64>,

    /// View state as a query string, e.g. "node=4&depth=3&color=true"
    #[arg(short = 'l', long = "link")]
    pub link: Option<String>,

    /// Node id to select
    #[arg(short = 'n', long = "node")]
    pub node: Option<usize>,

    /// Rings below the root to show
    #[arg(short = 'd', long = "depth")]
    pub depth: Option<usize>,

    /// Font size in pixels
    #[arg(short = 'f', long = "font")]
    pub font: Option<f64>,

    /// Dataset index
    #[arg(long = "dataset")]
    pub dataset: Option<usize>,

    /// Highlight nodes whose name contains this text
    #[arg(short = 's', long = "search")]
    pub search: Option<String>,

    /// Colour by the document's hue attribute
    #[arg(long = "color")]
    pub color: bool,

    /// Draw single-child chains as separate rings
    #[arg(long = "no-collapse")]
    pub no_collapse: bool,

    /// Leave narrow wedges out of the key
    #[arg(long = "no-key")]
    pub no_key: bool,

    /// Also write the settled layout as JSON
    #[arg(long = "dump")]
    pub dump: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Svg,
    Png,
}

pub fn run() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    if let Some(width) = args.width {
        config.render.width = width;
    }
    if let Some(height) = args.height {
        config.render.height = height;
    }

    let input = read_input(args.input.as_deref())?;
    let mut session = Sunburst::from_document(&input, config)?;
    for intent in intents(&args) {
        session.push(intent);
    }
    session.settle();
    log::info!(
        "selected {} after {} layout pass(es)",
        session.tree().node(session.state().selected).name,
        session.layout_passes()
    );

    if let Some(path) = args.dump.as_deref() {
        write_layout_dump(path, &session)?;
    }

    let svg = render_snapshot(&session);
    match args.output_format {
        OutputFormat::Svg => {
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            let config = session.config();
            write_output_png(&svg, &output, &config.render, &config.theme)?;
        }
    }
    Ok(())
}

/// Intents in the order a viewer would apply them: the link first, then
/// explicit flags on top.
fn intents(args: &Args) -> Vec<Intent> {
    let mut intents = Vec::new();
    if let Some(link) = &args.link {
        intents.push(Intent::ApplyLink(link.clone()));
    }
    if args.no_collapse {
        intents.push(Intent::SetCollapse(false));
    }
    if args.no_key {
        intents.push(Intent::SetShowKeys(false));
    }
    if args.color {
        intents.push(Intent::SetUseHue(true));
    }
    if let Some(dataset) = args.dataset {
        intents.push(Intent::SetDataset(dataset));
    }
    if let Some(font) = args.font {
        intents.push(Intent::SetFontSize(font));
    }
    if let Some(depth) = args.depth {
        intents.push(Intent::SetMaxDepth(depth.saturating_add(1)));
    }
    if let Some(node) = args.node {
        intents.push(Intent::Select(node));
    }
    if let Some(search) = &args.search {
        intents.push(Intent::Search(search.clone()));
    }
    intents
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return Ok(std::fs::read_to_string(path)?);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_follow_the_link() {
        let args = Args::parse_from([
            "sunburst", "-l", "node=3&depth=2", "--depth", "4", "--no-collapse", "-s", "coli",
        ]);
        let intents = intents(&args);
        assert_eq!(intents[0], Intent::ApplyLink("node=3&depth=2".to_string()));
        assert_eq!(intents[1], Intent::SetCollapse(false));
        assert!(intents.contains(&Intent::SetMaxDepth(5)));
        assert_eq!(intents.last(), Some(&Intent::Search("coli".to_string())));
    }

    #[test]
    fn png_needs_an_output_path() {
        assert!(ensure_output(&None, "png").is_err());
        let path = PathBuf::from("chart.png");
        assert_eq!(ensure_output(&Some(path.clone()), "png").unwrap(), path);
    }
}
