use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::executor::block_on;
use pdf_overlay_core::{
    find_offsets, matched_text, AnnotationContainer, AnnotationDescriptor,
    AnnotationOverlayFactory, AnnotationRenderOutcome, AnnotationSource, CommitOutcome,
    DefaultAnnotationOverlayFactory, FindState, FixedAdvanceMeasurer, FragmentRender, NodeState,
    OverlayConfig, RecordingSurface, RenderIntent, SourceError, SurfaceEvent, TextContent,
    TextMatch, TextOverlayBuilder, Viewport,
};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "pdf_overlay_core=info,pdf_overlay_scheduler=info,pdf_overlay_cli=info";

#[derive(Debug, Parser)]
#[command(name = "pdf-overlay")]
#[command(about = "Inspect text and annotation overlays for PDF pages")]
pub struct Cli {
    /// Overlay config file (TOML); defaults to environment settings.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print text node geometry after the layout commit.
    Layout {
        #[arg(value_name = "PAGE_JSON")]
        page: PathBuf,
        #[arg(long, default_value_t = 1.0)]
        scale: f64,
        #[arg(long, default_value_t = 0)]
        rotation: i32,
    },
    /// Search a page and print the highlight render plan.
    Highlight {
        #[arg(value_name = "PAGE_JSON")]
        page: PathBuf,
        #[arg(long)]
        query: String,
        #[arg(long)]
        case_sensitive: bool,
        #[arg(long)]
        highlight_all: bool,
        /// Match to select, 0-based.
        #[arg(long, default_value_t = 0)]
        select: usize,
    },
    /// Build the annotation layer for a page.
    Annotations {
        #[arg(value_name = "PAGE_JSON")]
        page: PathBuf,
        #[arg(long, default_value_t = 1.0)]
        scale: f64,
        #[arg(long)]
        print: bool,
    },
    /// Print CLI version.
    Version,
}

/// Page fixture: geometry plus what the engine reports for the page.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInput {
    view_box: [f64; 4],
    #[serde(default)]
    rotate: i32,
    #[serde(default)]
    text_content: TextContent,
    #[serde(default)]
    annotations: Vec<AnnotationDescriptor>,
}

#[derive(Debug, Serialize)]
struct LayoutOutput {
    status: &'static str,
    node_count: usize,
    attached: usize,
    dropped: usize,
    nodes: Vec<NodeOutput>,
}

#[derive(Debug, Serialize)]
struct NodeOutput {
    index: usize,
    text: String,
    state: NodeState,
    #[serde(skip_serializing_if = "Option::is_none")]
    left: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    font: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    transform: Option<String>,
}

#[derive(Debug, Serialize)]
struct HighlightOutput {
    query: String,
    match_count: usize,
    matches: Vec<MatchOutput>,
    highlighted: Vec<HighlightedNode>,
    scroll_to: Option<usize>,
    anomalies: Vec<String>,
}

#[derive(Debug, Serialize)]
struct MatchOutput {
    #[serde(flatten)]
    range: TextMatch,
    text: String,
}

#[derive(Debug, Serialize)]
struct HighlightedNode {
    index: usize,
    render: FragmentRender,
}

#[derive(Debug, Serialize)]
struct AnnotationsOutput {
    outcome: &'static str,
    container: Option<AnnotationContainer>,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    init_logging();

    match cli.command {
        Commands::Layout { page, scale, rotation } => {
            let config = load_config(cli.config.as_deref())?;
            run_layout(&page, scale, rotation, config)
        }
        Commands::Highlight { page, query, case_sensitive, highlight_all, select } => {
            let config = load_config(cli.config.as_deref())?;
            run_highlight(&page, &query, case_sensitive, highlight_all, select, config)
        }
        Commands::Annotations { page, scale, print } => {
            let config = load_config(cli.config.as_deref())?;
            run_annotations(&page, scale, print, config)
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    // Already installed when `run` is called more than once in a process.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

fn load_config(path: Option<&Path>) -> Result<OverlayConfig> {
    match path {
        Some(path) => OverlayConfig::from_file(path).context("failed to load overlay config"),
        None => OverlayConfig::from_env().context("invalid overlay settings in environment"),
    }
}

fn read_page(path: &Path) -> Result<PageInput> {
    if !path.is_file() {
        anyhow::bail!("page file does not exist: {}", path.display());
    }

    tracing::debug!(path = %path.display(), "loading page");
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read page file {}", path.display()))?;

    serde_json::from_str(&raw).with_context(|| format!("invalid page JSON in {}", path.display()))
}

fn print_json<T: Serialize>(payload: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(payload)?;
    println!("{json}");
    Ok(())
}

fn run_layout(path: &Path, scale: f64, rotation: i32, config: OverlayConfig) -> Result<()> {
    if scale <= 0.0 {
        anyhow::bail!("--scale must be positive");
    }

    let page = read_page(path)?;
    let viewport = Viewport::new(page.view_box, scale, page.rotate + rotation);

    // No scroll activity is tracked, so the commit runs immediately.
    let mut builder =
        TextOverlayBuilder::new(0, viewport, Arc::new(FixedAdvanceMeasurer::default()), config);
    let mut surface = RecordingSurface::new();
    let outcome = builder.set_content(page.text_content, Instant::now(), &mut surface)?;

    let (status, attached, dropped) = match outcome {
        CommitOutcome::Committed { attached, dropped, .. } => ("committed", attached, dropped),
        CommitOutcome::SkippedOverCap { .. } => ("skipped_over_cap", 0, 0),
        CommitOutcome::Deferred { .. } => ("deferred", 0, 0),
    };

    let nodes = builder
        .nodes()
        .iter()
        .map(|node| {
            let layout = node.layout.as_ref();
            NodeOutput {
                index: node.index,
                text: node.text.clone(),
                state: node.state,
                left: layout.map(|l| l.left),
                top: layout.map(|l| l.top),
                font: layout.map(|l| l.font.css()),
                transform: layout.and_then(|l| l.css_transform()),
            }
        })
        .collect();

    print_json(&LayoutOutput { status, node_count: builder.nodes().len(), attached, dropped, nodes })
}

fn run_highlight(
    path: &Path,
    query: &str,
    case_sensitive: bool,
    highlight_all: bool,
    select: usize,
    config: OverlayConfig,
) -> Result<()> {
    let page = read_page(path)?;
    let viewport = Viewport::new(page.view_box, 1.0, page.rotate);

    let state = FindState::search(&[&page.text_content], query, case_sensitive)
        .with_highlight_all(highlight_all);
    let state = match state.selected {
        Some(mut selected) => {
            if select >= state.match_count() {
                anyhow::bail!("--select {select} is out of range ({} matches)", state.match_count());
            }
            selected.match_index = select;
            state.with_selected(Some(selected))
        }
        None => state,
    };

    let mut builder =
        TextOverlayBuilder::new(0, viewport, Arc::new(FixedAdvanceMeasurer::default()), config)
            .with_find_controller(Arc::new(state));
    let mut surface = RecordingSurface::new();
    let outcome = builder.set_content(page.text_content, Instant::now(), &mut surface)?;

    let anomalies = match outcome {
        CommitOutcome::Committed { matches, .. } => {
            matches.anomalies().iter().map(ToString::to_string).collect()
        }
        CommitOutcome::SkippedOverCap { node_count } => {
            anyhow::bail!("page has {node_count} text nodes, more than the configured maximum")
        }
        CommitOutcome::Deferred { .. } => Vec::new(),
    };

    let items = &builder.content().items;
    let matches = builder
        .matches()
        .iter()
        .map(|range| MatchOutput { range: *range, text: matched_text(items, range) })
        .collect();

    let highlighted = builder
        .nodes()
        .iter()
        .filter_map(|node| {
            node.render.clone().map(|render| HighlightedNode { index: node.index, render })
        })
        .collect();

    let scroll_to = surface.events.iter().find_map(|event| match event {
        SurfaceEvent::ScrollIntoView(index, _) => Some(*index),
        _ => None,
    });

    let match_count = find_offsets(&builder.content().full_text(), query, case_sensitive).len();

    print_json(&HighlightOutput {
        query: query.to_string(),
        match_count,
        matches,
        highlighted,
        scroll_to,
        anomalies,
    })
}

/// Serves the annotations embedded in a page fixture.
struct FixtureAnnotations(Vec<AnnotationDescriptor>);

#[async_trait::async_trait]
impl AnnotationSource for FixtureAnnotations {
    async fn annotations(&self, _intent: RenderIntent) -> Result<Vec<AnnotationDescriptor>, SourceError> {
        Ok(self.0.clone())
    }
}

fn run_annotations(path: &Path, scale: f64, print: bool, config: OverlayConfig) -> Result<()> {
    let page = read_page(path)?;
    let viewport = Viewport::new(page.view_box, scale, page.rotate);

    let source = Arc::new(FixtureAnnotations(page.annotations));
    let mut builder = DefaultAnnotationOverlayFactory::default().create_annotation_overlay_builder(
        0,
        source,
        config.render_interactive_forms,
    );

    let intent = print.then_some(RenderIntent::Print);
    let outcome = block_on(builder.render(&viewport, intent))?;

    let outcome = match outcome {
        AnnotationRenderOutcome::Empty => "empty",
        AnnotationRenderOutcome::Created { .. } => "created",
        AnnotationRenderOutcome::Updated => "updated",
    };

    print_json(&AnnotationsOutput { outcome, container: builder.container().cloned() })
}
