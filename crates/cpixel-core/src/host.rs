#![forbid(unsafe_code)]

//! The host page, seen through a narrow read-only trait.
//!
//! Probes and producers never touch a DOM directly. They ask a
//! [`HostEnvironment`] for the handful of facts they need: whether an element
//! exists, which marker attributes/classes it carries, its layout box, the URL
//! query string, page visibility and the pointer position.
//!
//! [`ScriptedHost`] is an in-memory implementation driven explicitly by tests
//! and by the headless demo.

use std::collections::{BTreeSet, HashMap};

use crate::error::HostError;

/// Lifecycle state of a host element as seen by a producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementState {
    /// Not created yet. Producers retry after a short delay.
    Missing,
    /// Present and attached to the page.
    Attached,
    /// Was attached, has since been removed from its parent. Producers stop.
    Detached,
}

/// Where a marker attribute/class is looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerScope<'a> {
    /// The document body.
    Body,
    /// A specific element, by id.
    Element(&'a str),
}

/// A point in stage coordinates (CSS pixels).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f32,
    /// Vertical coordinate.
    pub y: f32,
}

impl Point {
    /// Create a point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Point) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Layout box of an element, as the host last computed it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LayoutBox {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

impl LayoutBox {
    /// Create a layout box.
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Largest absolute per-edge difference between two boxes.
    #[must_use]
    pub fn max_delta(&self, other: &LayoutBox) -> f32 {
        [
            (self.x - other.x).abs(),
            (self.y - other.y).abs(),
            (self.width - other.width).abs(),
            (self.height - other.height).abs(),
        ]
        .into_iter()
        .fold(0.0, f32::max)
    }
}

/// Read-only view of the host page.
pub trait HostEnvironment {
    /// Lifecycle state of the element with the given id.
    fn element_state(&self, id: &str) -> ElementState;

    /// Whether `name` is present as an attribute or class in `scope`.
    ///
    /// Errors when the scoped element does not exist.
    fn has_marker(&self, scope: MarkerScope<'_>, name: &str) -> Result<bool, HostError>;

    /// Value of a URL query parameter, if present.
    fn query_param(&self, key: &str) -> Option<String>;

    /// Current layout box of an element.
    fn layout_box(&self, id: &str) -> Result<LayoutBox, HostError>;

    /// Whether the page is foregrounded.
    fn is_visible(&self) -> bool;

    /// Pointer position over the stage, if the pointer is inside it.
    fn pointer(&self) -> Option<Point> {
        None
    }
}

// ---------------------------------------------------------------------------
// ScriptedHost
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
struct ElementEntry {
    state: Option<ElementState>,
    markers: BTreeSet<String>,
    layout: Option<LayoutBox>,
}

/// In-memory host whose every fact is set explicitly.
#[derive(Debug, Clone)]
pub struct ScriptedHost {
    elements: HashMap<String, ElementEntry>,
    body_markers: BTreeSet<String>,
    query: HashMap<String, String>,
    visible: bool,
    pointer: Option<Point>,
}

impl Default for ScriptedHost {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedHost {
    /// An empty, visible page with no elements.
    #[must_use]
    pub fn new() -> Self {
        Self {
            elements: HashMap::new(),
            body_markers: BTreeSet::new(),
            query: HashMap::new(),
            visible: true,
            pointer: None,
        }
    }

    /// Create the element `id` attached to the page with the given layout.
    #[must_use]
    pub fn with_element(mut self, id: &str, layout: LayoutBox) -> Self {
        self.attach(id, layout);
        self
    }

    /// Parse the query string of `url` (`?a=b&c=d`) into query parameters.
    #[must_use]
    pub fn with_url(mut self, url: &str) -> Self {
        self.set_url(url);
        self
    }

    /// Attach (or re-attach) the element `id`.
    pub fn attach(&mut self, id: &str, layout: LayoutBox) {
        let entry = self.elements.entry(id.to_owned()).or_default();
        entry.state = Some(ElementState::Attached);
        entry.layout = Some(layout);
    }

    /// Remove the element `id` from its parent.
    pub fn detach(&mut self, id: &str) {
        if let Some(entry) = self.elements.get_mut(id) {
            entry.state = Some(ElementState::Detached);
        }
    }

    /// Update the layout box of an existing element.
    pub fn set_layout(&mut self, id: &str, layout: LayoutBox) {
        if let Some(entry) = self.elements.get_mut(id) {
            entry.layout = Some(layout);
        }
    }

    /// Add a marker attribute/class in `scope`.
    pub fn add_marker(&mut self, scope: MarkerScope<'_>, name: &str) {
        match scope {
            MarkerScope::Body => {
                self.body_markers.insert(name.to_owned());
            }
            MarkerScope::Element(id) => {
                self.elements
                    .entry(id.to_owned())
                    .or_default()
                    .markers
                    .insert(name.to_owned());
            }
        }
    }

    /// Remove a marker attribute/class from `scope`.
    pub fn remove_marker(&mut self, scope: MarkerScope<'_>, name: &str) {
        match scope {
            MarkerScope::Body => {
                self.body_markers.remove(name);
            }
            MarkerScope::Element(id) => {
                if let Some(entry) = self.elements.get_mut(id) {
                    entry.markers.remove(name);
                }
            }
        }
    }

    /// Replace the query parameters with those of `url`.
    pub fn set_url(&mut self, url: &str) {
        self.query.clear();
        let Some((_, query)) = url.split_once('?') else {
            return;
        };
        let query = query.split('#').next().unwrap_or_default();
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            self.query.insert(key.to_owned(), value.to_owned());
        }
    }

    /// Set page visibility.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Move the pointer (`None` = pointer left the stage).
    pub fn set_pointer(&mut self, pointer: Option<Point>) {
        self.pointer = pointer;
    }

    fn attached(&self, id: &str) -> Result<&ElementEntry, HostError> {
        match self.elements.get(id) {
            Some(entry) if entry.state == Some(ElementState::Attached) => Ok(entry),
            _ => Err(HostError::NodeMissing(id.to_owned())),
        }
    }
}

impl HostEnvironment for ScriptedHost {
    fn element_state(&self, id: &str) -> ElementState {
        self.elements
            .get(id)
            .and_then(|e| e.state)
            .unwrap_or(ElementState::Missing)
    }

    fn has_marker(&self, scope: MarkerScope<'_>, name: &str) -> Result<bool, HostError> {
        match scope {
            MarkerScope::Body => Ok(self.body_markers.contains(name)),
            MarkerScope::Element(id) => Ok(self.attached(id)?.markers.contains(name)),
        }
    }

    fn query_param(&self, key: &str) -> Option<String> {
        self.query.get(key).cloned()
    }

    fn layout_box(&self, id: &str) -> Result<LayoutBox, HostError> {
        self.attached(id)?
            .layout
            .ok_or_else(|| HostError::LayoutUnavailable(id.to_owned()))
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn pointer(&self) -> Option<Point> {
        self.pointer
    }
}
