//! PDF Overlay Core Library
//!
//! Interactive overlays for rendered PDF pages: a transparent, selectable
//! text layer aligned with the page image (with search highlights), and an
//! annotation layer for links and form widgets.
//!
//! The crate is UI agnostic. Overlays talk to the host through small traits
//! ([`OverlaySurface`], [`TextMeasurer`], [`FindController`],
//! [`AnnotationSource`], [`AnnotationRenderer`]) and the host drives time
//! explicitly, so everything can run headless.

pub mod annotation_overlay;
pub mod config;
pub mod error;
pub mod find;
pub mod geometry;
pub mod highlight;
pub mod matching;
pub mod text_content;
pub mod text_node;
pub mod text_overlay;

pub use annotation_overlay::{
    AnnotationContainer, AnnotationDescriptor, AnnotationElement, AnnotationLayerParams,
    AnnotationOverlayBuilder, AnnotationOverlayFactory, AnnotationRenderOutcome,
    AnnotationRenderer, AnnotationSource, BasicAnnotationRenderer,
    DefaultAnnotationOverlayFactory, DownloadManager, LinkService, Localizer, RenderIntent,
    SimpleLinkService, ANNOTATION_LAYER_CLASS,
};
pub use config::{ConfigError, OverlayConfig, MAX_TEXT_NODES, RENDER_DELAY_MS};
pub use error::{Anomaly, OverlayError, OverlayResult, RenderOutcome, SourceError};
pub use find::{find_offsets, FindController, FindState, SelectedMatch};
pub use geometry::{ScrollMargin, Transform, Viewport};
pub use highlight::{
    plan_matches, FragmentRender, HighlightClass, HighlightPart, MatchRenderPlan, MatchSelection,
    SpanDescriptor,
};
pub use matching::{convert_matches, matched_text, ConvertedMatches, MatchPosition, TextMatch};
pub use text_content::{FontStyle, TextContent, TextItem};
pub use text_node::{FixedAdvanceMeasurer, FontSpec, NodeLayout, NodeState, TextMeasurer, TextNode};
pub use text_overlay::{
    CommitOutcome, OverlaySurface, RecordingSurface, SurfaceEvent, TextOverlayBuilder,
};

pub use pdf_overlay_scheduler::ActivityTracker;
