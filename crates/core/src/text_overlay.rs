//! Text overlay builder
//!
//! Builds the transparent, selectable text layer for one page view and keeps
//! its search highlights in sync with the find controller.
//!
//! Lifecycle:
//! 1. [`TextOverlayBuilder::set_content`] creates one node per text item and
//!    schedules the layout commit.
//! 2. The commit measures every node and appends it to the surface. It runs
//!    immediately unless the user scrolled within the render delay, in which
//!    case the host calls [`TextOverlayBuilder::poll`] until it happens.
//! 3. After the commit, and whenever search state changes,
//!    [`TextOverlayBuilder::update_matches`] re-renders highlights.

use crate::config::OverlayConfig;
use crate::error::{OverlayError, OverlayResult, RenderOutcome};
use crate::find::FindController;
use crate::geometry::{ScrollMargin, Viewport};
use crate::highlight::{plan_matches, MatchSelection};
use crate::matching::{convert_matches, TextMatch};
use crate::text_content::TextContent;
use crate::text_node::{NodeState, TextMeasurer, TextNode};
use pdf_overlay_scheduler::{ActivityTracker, CancellationToken, QuietTimer, Scheduled, Supersession};
use std::sync::Arc;
use std::time::Instant;

/// UI binding that displays the overlay
///
/// The builder owns node state; the surface mirrors it on screen.
pub trait OverlaySurface {
    /// Append a measured node to the live layer
    fn append(&mut self, node: &TextNode);

    /// A node's content or class changed
    fn refresh(&mut self, node: &TextNode);

    /// Scroll so `node` is visible, offset by `margin`
    fn scroll_into_view(&mut self, node: &TextNode, margin: ScrollMargin);

    /// Remove every node (content was replaced)
    fn clear(&mut self);
}

/// Surface call, as recorded by [`RecordingSurface`]
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    Append(usize),
    Refresh(usize),
    ScrollIntoView(usize, ScrollMargin),
    Clear,
}

/// Headless surface that records every call
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    pub events: Vec<SurfaceEvent>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indices of appended nodes, in order
    pub fn appended(&self) -> Vec<usize> {
        self.events
            .iter()
            .filter_map(|event| match event {
                SurfaceEvent::Append(index) => Some(*index),
                _ => None,
            })
            .collect()
    }

    pub fn take_events(&mut self) -> Vec<SurfaceEvent> {
        std::mem::take(&mut self.events)
    }
}

impl OverlaySurface for RecordingSurface {
    fn append(&mut self, node: &TextNode) {
        self.events.push(SurfaceEvent::Append(node.index));
    }

    fn refresh(&mut self, node: &TextNode) {
        self.events.push(SurfaceEvent::Refresh(node.index));
    }

    fn scroll_into_view(&mut self, node: &TextNode, margin: ScrollMargin) {
        self.events.push(SurfaceEvent::ScrollIntoView(node.index, margin));
    }

    fn clear(&mut self) {
        self.events.push(SurfaceEvent::Clear);
    }
}

/// Result of scheduling or running the layout commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Nodes were measured and appended
    Committed {
        attached: usize,
        dropped: usize,
        matches: RenderOutcome,
    },
    /// Too many nodes; nothing was committed
    SkippedOverCap { node_count: usize },
    /// Waiting for scrolling to go quiet
    Deferred { until: Instant },
}

#[derive(Debug)]
struct PendingCommit {
    generation: u64,
    token: CancellationToken,
}

/// Builds and maintains the text overlay of one page
pub struct TextOverlayBuilder {
    page_index: usize,
    viewport: Viewport,
    config: OverlayConfig,
    measurer: Arc<dyn TextMeasurer>,
    activity: Option<Arc<ActivityTracker>>,
    find_controller: Option<Arc<dyn FindController>>,
    content: TextContent,
    nodes: Vec<TextNode>,
    matches: Vec<TextMatch>,
    timer: QuietTimer<PendingCommit>,
    supersession: Supersession,
    rendered: bool,
    disposed: bool,
}

impl TextOverlayBuilder {
    pub fn new(
        page_index: usize,
        viewport: Viewport,
        measurer: Arc<dyn TextMeasurer>,
        config: OverlayConfig,
    ) -> Self {
        let timer = QuietTimer::new(config.render_delay());

        Self {
            page_index,
            viewport,
            config,
            measurer,
            activity: None,
            find_controller: None,
            content: TextContent::default(),
            nodes: Vec::new(),
            matches: Vec::new(),
            timer,
            supersession: Supersession::new(),
            rendered: false,
            disposed: false,
        }
    }

    /// Source of scroll activity used to debounce the commit
    pub fn with_activity(mut self, activity: Arc<ActivityTracker>) -> Self {
        self.activity = Some(activity);
        self
    }

    pub fn with_find_controller(mut self, controller: Arc<dyn FindController>) -> Self {
        self.find_controller = Some(controller);
        self
    }

    /// Replace (or remove) the find controller; call `update_matches` after
    pub fn set_find_controller(&mut self, controller: Option<Arc<dyn FindController>>) {
        self.find_controller = controller;
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn nodes(&self) -> &[TextNode] {
        &self.nodes
    }

    pub fn content(&self) -> &TextContent {
        &self.content
    }

    /// Matches currently rendered, in item positions
    pub fn matches(&self) -> &[TextMatch] {
        &self.matches
    }

    /// Whether the layout commit has run for the current content
    pub fn is_rendered(&self) -> bool {
        self.rendered
    }

    pub fn has_pending_commit(&self) -> bool {
        self.timer.is_pending()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Store new content, create its nodes and schedule the layout commit
    ///
    /// A commit still pending for earlier content is cancelled.
    pub fn set_content(
        &mut self,
        content: TextContent,
        now: Instant,
        surface: &mut dyn OverlaySurface,
    ) -> OverlayResult<CommitOutcome> {
        self.ensure_live()?;

        let (generation, token) = self.supersession.begin();
        if self.timer.cancel().is_some() {
            tracing::debug!(page = self.page_index, "superseded pending text layout commit");
        }
        if self.rendered || !self.nodes.is_empty() {
            surface.clear();
        }

        self.rendered = false;
        self.matches.clear();
        self.nodes = content
            .items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let style = content.style_for(&item.font_name);
                TextNode::from_item(index, item, &style, &self.viewport)
            })
            .collect();
        self.content = content;

        let last_activity = self.last_activity();
        match self.timer.schedule(PendingCommit { generation, token }, last_activity, now) {
            Scheduled::Ready { .. } => Ok(self.commit(surface)),
            Scheduled::Deferred { until, .. } => {
                tracing::debug!(page = self.page_index, "text layout commit deferred while scrolling");
                Ok(CommitOutcome::Deferred { until })
            }
        }
    }

    /// Run the deferred commit if its quiet period has elapsed
    pub fn poll(
        &mut self,
        now: Instant,
        surface: &mut dyn OverlaySurface,
    ) -> OverlayResult<Option<CommitOutcome>> {
        self.ensure_live()?;

        let last_activity = self.last_activity();
        let Some(pending) = self.timer.poll(last_activity, now) else {
            return Ok(None);
        };

        if pending.token.is_cancelled() || !self.supersession.is_current(pending.generation) {
            return Ok(None);
        }

        Ok(Some(self.commit(surface)))
    }

    /// Re-render search highlights from the find controller's current state
    ///
    /// Previously highlighted nodes are restored to plain text first. Does
    /// nothing before the layout commit.
    pub fn update_matches(&mut self, surface: &mut dyn OverlaySurface) -> OverlayResult<RenderOutcome> {
        self.ensure_live()?;

        if !self.rendered {
            return Ok(RenderOutcome::Complete);
        }

        for node in self.nodes.iter_mut().filter(|node| node.render.is_some()) {
            node.render = None;
            if node.is_attached() {
                surface.refresh(node);
            }
        }
        self.matches.clear();

        let Some(controller) = self.find_controller.as_ref() else {
            return Ok(RenderOutcome::Complete);
        };
        if !controller.is_active() {
            return Ok(RenderOutcome::Complete);
        }

        let offsets = controller.page_matches(self.page_index);
        let converted = convert_matches(&self.content.items, &offsets, controller.query_len());
        let selection = MatchSelection::for_page(
            controller.as_ref(),
            self.page_index,
            self.config.presentation_mode,
        );
        let plan = plan_matches(&self.content.items, &converted.matches, &selection);

        for (index, render) in plan.items {
            if let Some(node) = self.nodes.get_mut(index) {
                node.render = Some(render);
                if node.is_attached() {
                    surface.refresh(node);
                }
            }
        }

        if let Some(node) = plan.scroll_to.and_then(|index| self.nodes.get(index)) {
            surface.scroll_into_view(node, self.config.scroll_margin);
        }

        self.matches = converted.matches;

        if !converted.anomalies.is_empty() {
            tracing::warn!(
                page = self.page_index,
                anomalies = converted.anomalies.len(),
                "search matches do not line up with page text; highlights may be off"
            );
        }

        Ok(RenderOutcome::from_anomalies(converted.anomalies))
    }

    /// Tear down with the page view; later calls fail with `Disposed`
    pub fn dispose(&mut self) {
        self.supersession.cancel_current();
        self.timer.cancel();
        self.nodes.clear();
        self.matches.clear();
        self.rendered = false;
        self.disposed = true;
    }

    fn commit(&mut self, surface: &mut dyn OverlaySurface) -> CommitOutcome {
        let node_count = self.nodes.len();
        if node_count > self.config.max_text_nodes {
            tracing::debug!(
                page = self.page_index,
                node_count,
                max = self.config.max_text_nodes,
                "too many text nodes; skipping text layer"
            );
            return CommitOutcome::SkippedOverCap { node_count };
        }

        let mut attached = 0;
        let mut dropped = 0;

        for node in self.nodes.iter_mut() {
            let Some(layout) = node.layout.as_mut() else {
                continue;
            };

            let width = self.measurer.measure(&node.text, &layout.font);
            if width > 0.0 {
                layout.scale_x = Some(layout.canvas_width / width);
                node.state = NodeState::Attached;
                surface.append(node);
                attached += 1;
            } else {
                node.state = NodeState::Dropped;
                dropped += 1;
            }
        }

        self.rendered = true;
        tracing::debug!(page = self.page_index, attached, dropped, "committed text layer");

        // `ensure_live` already passed for the caller, so this cannot fail.
        let matches = self.update_matches(surface).unwrap_or_default();

        CommitOutcome::Committed { attached, dropped, matches }
    }

    fn last_activity(&self) -> Option<Instant> {
        self.activity.as_ref().and_then(|activity| activity.last_activity())
    }

    fn ensure_live(&self) -> OverlayResult<()> {
        if self.disposed {
            Err(OverlayError::Disposed(self.page_index))
        } else {
            Ok(())
        }
    }
}
