//! Annotation overlay builder
//!
//! Fetches a page's annotation descriptors and hands them, together with
//! the viewport and the page's link and download services, to an
//! [`AnnotationRenderer`] that builds the interactive elements (links, form
//! widgets, popups). The builder only owns the layer container and decides
//! whether the renderer should build it from scratch or just refresh it.

use crate::error::{OverlayError, OverlayResult, SourceError};
use crate::geometry::{Transform, Viewport};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Class name of the layer container
pub const ANNOTATION_LAYER_CLASS: &str = "annotationLayer";

/// What the annotations are fetched for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderIntent {
    #[default]
    Display,
    Print,
}

/// Engine data for one annotation
///
/// Only the fields the overlay looks at are typed; everything else the
/// engine reports is kept in `data` for the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationDescriptor {
    pub id: String,
    /// PDF annotation subtype, e.g. `"Link"` or `"Widget"`
    pub subtype: String,
    /// `[x1, y1, x2, y2]` in PDF user space
    pub rect: [f64; 4],
    #[serde(flatten)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl AnnotationDescriptor {
    pub fn new(id: impl Into<String>, subtype: impl Into<String>, rect: [f64; 4]) -> Self {
        Self { id: id.into(), subtype: subtype.into(), rect, data: serde_json::Map::new() }
    }
}

/// Page data source for annotations
#[async_trait]
pub trait AnnotationSource: Send + Sync {
    async fn annotations(&self, intent: RenderIntent) -> Result<Vec<AnnotationDescriptor>, SourceError>;
}

/// Navigation used by link annotations
pub trait LinkService: Send + Sync {
    fn page_count(&self) -> usize;

    /// Current page, 1-based; 0 when unknown
    fn current_page(&self) -> usize;

    /// URL fragment for an explicit or named destination
    fn destination_hash(&self, destination: &serde_json::Value) -> String;

    fn navigate_to(&self, destination: &serde_json::Value);

    fn execute_named_action(&self, action: &str);
}

/// Link service for viewers without navigation
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleLinkService;

impl LinkService for SimpleLinkService {
    fn page_count(&self) -> usize {
        0
    }

    fn current_page(&self) -> usize {
        0
    }

    fn destination_hash(&self, _destination: &serde_json::Value) -> String {
        "#".to_string()
    }

    fn navigate_to(&self, _destination: &serde_json::Value) {}

    fn execute_named_action(&self, _action: &str) {}
}

/// Saves file attachments
pub trait DownloadManager: Send + Sync {
    fn download(&self, content: &[u8], filename: &str);
}

/// Translates user-visible strings inside a freshly built layer
pub trait Localizer: Send + Sync {
    fn translate(&self, container: &mut AnnotationContainer);
}

/// One element built by the renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationElement {
    pub id: String,
    pub subtype: String,
    /// Normalized `[left, top, right, bottom]` in viewport pixels
    pub bounds: [f64; 4],
    /// Viewport transform the element was last positioned with
    pub transform: Transform,
    /// Set once a localizer ran over the element
    #[serde(default)]
    pub localized: bool,
}

/// The layer element holding all annotation elements of a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationContainer {
    pub class_name: String,
    pub hidden: bool,
    pub elements: Vec<AnnotationElement>,
}

impl AnnotationContainer {
    fn new() -> Self {
        Self { class_name: ANNOTATION_LAYER_CLASS.to_string(), hidden: false, elements: Vec::new() }
    }
}

/// Everything a renderer needs to build or refresh a layer
#[derive(Clone)]
pub struct AnnotationLayerParams {
    /// Page viewport cloned with `dont_flip` set
    pub viewport: Viewport,
    pub annotations: Vec<AnnotationDescriptor>,
    pub render_interactive_forms: bool,
    pub link_service: Arc<dyn LinkService>,
    pub download_manager: Option<Arc<dyn DownloadManager>>,
}

/// Builds annotation elements into a container
pub trait AnnotationRenderer: Send + Sync {
    /// Populate an empty container
    fn render(&self, params: &AnnotationLayerParams, container: &mut AnnotationContainer);

    /// Refresh transforms of an existing container
    fn update(&self, params: &AnnotationLayerParams, container: &mut AnnotationContainer);
}

/// Renderer that lays out one positioned box per annotation
///
/// Widget annotations are skipped unless interactive forms are enabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicAnnotationRenderer;

impl BasicAnnotationRenderer {
    fn bounds(viewport: &Viewport, rect: [f64; 4]) -> [f64; 4] {
        let transform = viewport.transform();
        let (x1, y1) = transform.apply(rect[0], rect[1]);
        let (x2, y2) = transform.apply(rect[2], rect[3]);
        [x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2)]
    }

    fn is_rendered(annotation: &AnnotationDescriptor, params: &AnnotationLayerParams) -> bool {
        params.render_interactive_forms || annotation.subtype != "Widget"
    }
}

impl AnnotationRenderer for BasicAnnotationRenderer {
    fn render(&self, params: &AnnotationLayerParams, container: &mut AnnotationContainer) {
        let transform = params.viewport.transform();
        container.elements = params
            .annotations
            .iter()
            .filter(|annotation| Self::is_rendered(annotation, params))
            .map(|annotation| AnnotationElement {
                id: annotation.id.clone(),
                subtype: annotation.subtype.clone(),
                bounds: Self::bounds(&params.viewport, annotation.rect),
                transform,
                localized: false,
            })
            .collect();
    }

    fn update(&self, params: &AnnotationLayerParams, container: &mut AnnotationContainer) {
        let transform = params.viewport.transform();
        for element in container.elements.iter_mut() {
            if let Some(annotation) = params.annotations.iter().find(|a| a.id == element.id) {
                element.bounds = Self::bounds(&params.viewport, annotation.rect);
            }
            element.transform = transform;
        }
    }
}

/// What a render call did to the layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationRenderOutcome {
    /// The page has no annotations; no container was created
    Empty,
    /// A container was created with this many annotations
    Created { count: usize },
    /// The existing container was refreshed
    Updated,
}

/// Builds and maintains the annotation layer of one page
pub struct AnnotationOverlayBuilder {
    page_index: usize,
    source: Arc<dyn AnnotationSource>,
    renderer: Arc<dyn AnnotationRenderer>,
    render_interactive_forms: bool,
    link_service: Arc<dyn LinkService>,
    download_manager: Option<Arc<dyn DownloadManager>>,
    localizer: Option<Arc<dyn Localizer>>,
    container: Option<AnnotationContainer>,
    disposed: bool,
}

impl AnnotationOverlayBuilder {
    pub fn new(
        page_index: usize,
        source: Arc<dyn AnnotationSource>,
        renderer: Arc<dyn AnnotationRenderer>,
        link_service: Arc<dyn LinkService>,
    ) -> Self {
        Self {
            page_index,
            source,
            renderer,
            render_interactive_forms: false,
            link_service,
            download_manager: None,
            localizer: None,
            container: None,
            disposed: false,
        }
    }

    pub fn with_interactive_forms(mut self, enabled: bool) -> Self {
        self.render_interactive_forms = enabled;
        self
    }

    pub fn with_download_manager(mut self, manager: Arc<dyn DownloadManager>) -> Self {
        self.download_manager = Some(manager);
        self
    }

    pub fn with_localizer(mut self, localizer: Arc<dyn Localizer>) -> Self {
        self.localizer = Some(localizer);
        self
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn renders_interactive_forms(&self) -> bool {
        self.render_interactive_forms
    }

    /// The layer container, once one was created
    pub fn container(&self) -> Option<&AnnotationContainer> {
        self.container.as_ref()
    }

    /// Fetch annotations and build or refresh the layer
    ///
    /// `intent` defaults to [`RenderIntent::Display`]. Dropping the returned
    /// future before it completes leaves the layer untouched.
    pub async fn render(
        &mut self,
        viewport: &Viewport,
        intent: Option<RenderIntent>,
    ) -> OverlayResult<AnnotationRenderOutcome> {
        if self.disposed {
            return Err(OverlayError::Disposed(self.page_index));
        }

        let intent = intent.unwrap_or_default();
        let source = Arc::clone(&self.source);
        let annotations = source.annotations(intent).await.map_err(|source| {
            tracing::warn!(page = self.page_index, error = %source, "annotation fetch failed");
            OverlayError::AnnotationFetch { page_index: self.page_index, source }
        })?;

        let params = AnnotationLayerParams {
            viewport: viewport.clone_with(true),
            annotations,
            render_interactive_forms: self.render_interactive_forms,
            link_service: Arc::clone(&self.link_service),
            download_manager: self.download_manager.clone(),
        };

        if let Some(container) = self.container.as_mut() {
            self.renderer.update(&params, container);
            tracing::debug!(page = self.page_index, "refreshed annotation layer");
            return Ok(AnnotationRenderOutcome::Updated);
        }

        if params.annotations.is_empty() {
            return Ok(AnnotationRenderOutcome::Empty);
        }

        let mut container = AnnotationContainer::new();
        self.renderer.render(&params, &mut container);
        if let Some(localizer) = &self.localizer {
            localizer.translate(&mut container);
        }

        let count = params.annotations.len();
        tracing::debug!(page = self.page_index, count, "created annotation layer");
        self.container = Some(container);

        Ok(AnnotationRenderOutcome::Created { count })
    }

    /// Hide the layer; no-op when none was created
    pub fn hide(&mut self) {
        if let Some(container) = self.container.as_mut() {
            container.hidden = true;
        }
    }

    pub fn show(&mut self) {
        if let Some(container) = self.container.as_mut() {
            container.hidden = false;
        }
    }

    /// Tear down with the page view; later renders fail with `Disposed`
    pub fn dispose(&mut self) {
        self.container = None;
        self.disposed = true;
    }
}

/// Creates annotation overlay builders for page views
pub trait AnnotationOverlayFactory {
    fn create_annotation_overlay_builder(
        &self,
        page_index: usize,
        source: Arc<dyn AnnotationSource>,
        render_interactive_forms: bool,
    ) -> AnnotationOverlayBuilder;
}

/// Factory wiring builders to a [`SimpleLinkService`] and no download manager
#[derive(Clone)]
pub struct DefaultAnnotationOverlayFactory {
    renderer: Arc<dyn AnnotationRenderer>,
}

impl DefaultAnnotationOverlayFactory {
    pub fn new(renderer: Arc<dyn AnnotationRenderer>) -> Self {
        Self { renderer }
    }
}

impl Default for DefaultAnnotationOverlayFactory {
    fn default() -> Self {
        Self::new(Arc::new(BasicAnnotationRenderer))
    }
}

impl AnnotationOverlayFactory for DefaultAnnotationOverlayFactory {
    fn create_annotation_overlay_builder(
        &self,
        page_index: usize,
        source: Arc<dyn AnnotationSource>,
        render_interactive_forms: bool,
    ) -> AnnotationOverlayBuilder {
        AnnotationOverlayBuilder::new(
            page_index,
            source,
            Arc::clone(&self.renderer),
            Arc::new(SimpleLinkService),
        )
        .with_interactive_forms(render_interactive_forms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use futures::FutureExt;
    use std::sync::Mutex;

    struct StaticSource {
        result: Result<Vec<AnnotationDescriptor>, SourceError>,
        intents: Mutex<Vec<RenderIntent>>,
    }

    impl StaticSource {
        fn new(result: Result<Vec<AnnotationDescriptor>, SourceError>) -> Arc<Self> {
            Arc::new(Self { result, intents: Mutex::new(Vec::new()) })
        }
    }

    #[async_trait]
    impl AnnotationSource for StaticSource {
        async fn annotations(&self, intent: RenderIntent) -> Result<Vec<AnnotationDescriptor>, SourceError> {
            self.intents.lock().unwrap().push(intent);
            self.result.clone()
        }
    }

    struct NeverSource;

    #[async_trait]
    impl AnnotationSource for NeverSource {
        async fn annotations(&self, _intent: RenderIntent) -> Result<Vec<AnnotationDescriptor>, SourceError> {
            futures::future::pending().await
        }
    }

    #[derive(Default)]
    struct RecordingRenderer {
        calls: Mutex<Vec<(&'static str, bool)>>,
    }

    impl AnnotationRenderer for RecordingRenderer {
        fn render(&self, params: &AnnotationLayerParams, container: &mut AnnotationContainer) {
            self.calls.lock().unwrap().push(("render", params.viewport.dont_flip));
            BasicAnnotationRenderer.render(params, container);
        }

        fn update(&self, params: &AnnotationLayerParams, container: &mut AnnotationContainer) {
            self.calls.lock().unwrap().push(("update", params.viewport.dont_flip));
            BasicAnnotationRenderer.update(params, container);
        }
    }

    struct MarkLocalized;

    impl Localizer for MarkLocalized {
        fn translate(&self, container: &mut AnnotationContainer) {
            for element in container.elements.iter_mut() {
                element.localized = true;
            }
        }
    }

    fn link(id: &str) -> AnnotationDescriptor {
        AnnotationDescriptor::new(id, "Link", [72.0, 700.0, 172.0, 720.0])
    }

    fn page() -> Viewport {
        Viewport::new([0.0, 0.0, 612.0, 792.0], 1.0, 0)
    }

    fn builder(source: Arc<dyn AnnotationSource>, renderer: Arc<RecordingRenderer>) -> AnnotationOverlayBuilder {
        AnnotationOverlayBuilder::new(0, source, renderer, Arc::new(SimpleLinkService))
    }

    #[test]
    fn test_first_render_creates_container() {
        let source = StaticSource::new(Ok(vec![link("1R"), link("2R")]));
        let renderer = Arc::new(RecordingRenderer::default());
        let mut builder = builder(source.clone(), renderer.clone());

        let outcome = block_on(builder.render(&page(), None)).unwrap();

        assert_eq!(outcome, AnnotationRenderOutcome::Created { count: 2 });
        let container = builder.container().unwrap();
        assert_eq!(container.class_name, "annotationLayer");
        assert!(!container.hidden);
        assert_eq!(container.elements.len(), 2);
        assert_eq!(*source.intents.lock().unwrap(), vec![RenderIntent::Display]);
        assert_eq!(*renderer.calls.lock().unwrap(), vec![("render", true)]);
    }

    #[test]
    fn test_second_render_updates_existing_container() {
        let source = StaticSource::new(Ok(vec![link("1R")]));
        let renderer = Arc::new(RecordingRenderer::default());
        let mut builder = builder(source.clone(), renderer.clone());

        block_on(builder.render(&page(), None)).unwrap();
        let zoomed = Viewport::new([0.0, 0.0, 612.0, 792.0], 2.0, 0);
        let outcome = block_on(builder.render(&zoomed, Some(RenderIntent::Print))).unwrap();

        assert_eq!(outcome, AnnotationRenderOutcome::Updated);
        assert_eq!(*renderer.calls.lock().unwrap(), vec![("render", true), ("update", true)]);
        assert_eq!(
            *source.intents.lock().unwrap(),
            vec![RenderIntent::Display, RenderIntent::Print]
        );
        let element = &builder.container().unwrap().elements[0];
        assert_eq!(element.transform, zoomed.clone_with(true).transform());
    }

    #[test]
    fn test_no_annotations_creates_nothing() {
        let source = StaticSource::new(Ok(Vec::new()));
        let renderer = Arc::new(RecordingRenderer::default());
        let mut builder = builder(source, renderer.clone());

        let outcome = block_on(builder.render(&page(), None)).unwrap();

        assert_eq!(outcome, AnnotationRenderOutcome::Empty);
        assert!(builder.container().is_none());
        assert!(renderer.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_fetch_failure_is_fatal() {
        let source = StaticSource::new(Err(SourceError::new("page gone")));
        let mut builder = builder(source, Arc::new(RecordingRenderer::default()));

        let err = block_on(builder.render(&page(), None)).unwrap_err();

        assert!(matches!(err, OverlayError::AnnotationFetch { page_index: 0, .. }));
        assert_eq!(err.to_string(), "failed to fetch annotations for page 0: page gone");
        assert!(builder.container().is_none());
    }

    #[test]
    fn test_dropped_render_leaves_layer_untouched() {
        let renderer = Arc::new(RecordingRenderer::default());
        let mut builder = builder(Arc::new(NeverSource), renderer.clone());

        assert!(builder.render(&page(), None).now_or_never().is_none());
        assert!(builder.container().is_none());
        assert!(renderer.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_hide_and_show() {
        let source = StaticSource::new(Ok(vec![link("1R")]));
        let mut builder = builder(source, Arc::new(RecordingRenderer::default()));

        // No container yet: nothing to hide.
        builder.hide();
        assert!(builder.container().is_none());

        block_on(builder.render(&page(), None)).unwrap();
        builder.hide();
        assert!(builder.container().unwrap().hidden);
        builder.show();
        assert!(!builder.container().unwrap().hidden);
    }

    #[test]
    fn test_localizer_runs_on_create() {
        let source = StaticSource::new(Ok(vec![link("1R")]));
        let mut builder =
            builder(source, Arc::new(RecordingRenderer::default())).with_localizer(Arc::new(MarkLocalized));

        block_on(builder.render(&page(), None)).unwrap();
        assert!(builder.container().unwrap().elements[0].localized);
    }

    #[test]
    fn test_basic_renderer_bounds_and_widgets() {
        let widget = AnnotationDescriptor::new("3R", "Widget", [100.0, 100.0, 200.0, 120.0]);
        let params = AnnotationLayerParams {
            viewport: page().clone_with(true),
            annotations: vec![link("1R"), widget],
            render_interactive_forms: false,
            link_service: Arc::new(SimpleLinkService),
            download_manager: None,
        };

        let mut container = AnnotationContainer::new();
        BasicAnnotationRenderer.render(&params, &mut container);
        assert_eq!(container.elements.len(), 1);
        assert_eq!(container.elements[0].bounds, [72.0, 700.0, 172.0, 720.0]);

        let params = AnnotationLayerParams { render_interactive_forms: true, ..params };
        BasicAnnotationRenderer.render(&params, &mut container);
        assert_eq!(container.elements.len(), 2);
    }

    #[test]
    fn test_default_factory() {
        let source = StaticSource::new(Ok(vec![link("1R")]));
        let builder = DefaultAnnotationOverlayFactory::default().create_annotation_overlay_builder(4, source, true);

        assert_eq!(builder.page_index(), 4);
        assert!(builder.renders_interactive_forms());
        assert!(builder.container().is_none());
    }

    #[test]
    fn test_dispose() {
        let source = StaticSource::new(Ok(vec![link("1R")]));
        let mut builder = builder(source, Arc::new(RecordingRenderer::default()));
        block_on(builder.render(&page(), None)).unwrap();

        builder.dispose();
        assert!(builder.container().is_none());
        assert!(matches!(block_on(builder.render(&page(), None)), Err(OverlayError::Disposed(0))));
    }

    #[test]
    fn test_descriptor_keeps_engine_fields() {
        let json = r#"{"id": "12R", "subtype": "Link", "annotationType": 2, "rect": [1, 2, 3, 4], "url": "https://example.com"}"#;
        let descriptor: AnnotationDescriptor = serde_json::from_str(json).unwrap();

        assert_eq!(descriptor.subtype, "Link");
        assert_eq!(descriptor.rect, [1.0, 2.0, 3.0, 4.0]);
        assert_eq!(descriptor.data["url"], "https://example.com");
        assert_eq!(descriptor.data["annotationType"], 2);
    }
}
