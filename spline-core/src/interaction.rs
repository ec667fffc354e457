//! Pointer interaction
//!
//! Turns one pointer stream into edits on a [`Document`]: picking layers,
//! dragging them, resizing them by their control points and panning the
//! viewport with a fling on release.
//!
//! Event positions are in view coordinates. The document point under the
//! pointer is the view position minus the viewport offset.

use crate::config::InteractionConfig;
use crate::document::Document;
use crate::fling::{Fling, VelocityTracker};
use crate::geometry::ControlPoint;
use crate::hit_test;
use crate::selection;
use kurbo::Point;
use std::time::Duration;
use uuid::Uuid;

/// Observable state of the interaction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// No gesture in progress
    Default,
    /// Pressed outside the current layer; a tap picks, a drag pans
    Selecting,
    /// Pressed inside the current layer; a drag moves it
    PreDrag,
    /// Moving the current layer
    Dragging,
    /// Resizing the current layer by a control point
    TransformDragging,
    /// Panning the viewport
    ViewportDragging,
}

/// A single pointer sample
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerEvent {
    /// Position in view coordinates
    pub position: Point,
    /// Time since an arbitrary fixed origin
    pub time: Duration,
    /// Multi-select / axis-lock modifier
    pub shift: bool,
}

impl PointerEvent {
    pub fn new(x: f64, y: f64, time: Duration) -> Self {
        Self {
            position: Point::new(x, y),
            time,
            shift: false,
        }
    }

    pub fn with_shift(mut self, shift: bool) -> Self {
        self.shift = shift;
        self
    }
}

/// Cursor the host should show at a hover position
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CursorHint {
    Default,
    Grab,
    Grabbing,
    /// Top-left or bottom-right handle
    ResizeNwSe,
    /// Top-right or bottom-left handle
    ResizeNeSw,
    ResizeVertical,
    ResizeHorizontal,
}

impl CursorHint {
    fn for_control_point(point: ControlPoint) -> Self {
        use ControlPoint::*;
        match point {
            TopLeft | BottomRight => CursorHint::ResizeNwSe,
            TopRight | BottomLeft => CursorHint::ResizeNeSw,
            MidTop | MidBottom => CursorHint::ResizeVertical,
            MidLeft | MidRight => CursorHint::ResizeHorizontal,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum State {
    Default,
    Selecting { candidate: Option<Uuid> },
    PreDrag,
    Dragging { layer: Uuid, start: Point },
    TransformDragging { layer: Uuid, point: ControlPoint },
    ViewportDragging,
}

impl State {
    fn mode(&self) -> Mode {
        match self {
            State::Default => Mode::Default,
            State::Selecting { .. } => Mode::Selecting,
            State::PreDrag => Mode::PreDrag,
            State::Dragging { .. } => Mode::Dragging,
            State::TransformDragging { .. } => Mode::TransformDragging,
            State::ViewportDragging => Mode::ViewportDragging,
        }
    }

    /// Still undecided between a tap and a drag
    fn is_pending(&self) -> bool {
        matches!(
            self,
            State::Default | State::Selecting { .. } | State::PreDrag
        )
    }
}

/// Positions recorded for the gesture in progress
#[derive(Clone, Copy, Debug)]
struct Gesture {
    /// Pointer-down point in document coordinates
    down: Point,
    /// Previous event in document coordinates
    prev: Point,
    /// Previous event in view coordinates
    prev_raw: Point,
    /// Pending gestures fall back to [`Mode::Default`] after this
    long_press_deadline: Duration,
}

/// Pointer state machine for one document view
#[derive(Clone, Debug)]
pub struct Interaction {
    config: InteractionConfig,
    state: State,
    gesture: Option<Gesture>,
    touch_down_in_current: bool,
    tracker: VelocityTracker,
    fling: Fling,
}

impl Interaction {
    pub fn new(config: InteractionConfig) -> Self {
        let fling = Fling::new(&config);
        let tracker = VelocityTracker::new(config.velocity_window());
        Self {
            config,
            state: State::Default,
            gesture: None,
            touch_down_in_current: false,
            tracker,
            fling,
        }
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.state.mode()
    }

    /// Control point being dragged, if resizing
    pub fn active_control_point(&self) -> Option<ControlPoint> {
        match self.state {
            State::TransformDragging { point, .. } => Some(point),
            _ => None,
        }
    }

    pub fn is_flinging(&self) -> bool {
        self.fling.is_active()
    }

    /// Whether the last pointer-down landed on the current layer
    pub fn touch_down_in_current(&self) -> bool {
        self.touch_down_in_current
    }

    /// True until the gesture turns into a drag, resize or pan
    pub fn should_show_context_menu(&self) -> bool {
        self.state.is_pending()
    }

    fn set_state(&mut self, state: State) {
        if state.mode() != self.state.mode() {
            log::debug!("interaction {:?} -> {:?}", self.state.mode(), state.mode());
        }
        self.state = state;
    }

    /// Begin a gesture
    pub fn pointer_down(&mut self, doc: &mut Document, event: PointerEvent) {
        self.fling.abort();
        self.tracker.clear();
        self.tracker.add(event.time, event.position);

        let down = event.position - doc.viewport();
        self.gesture = Some(Gesture {
            down,
            prev: down,
            prev_raw: event.position,
            long_press_deadline: event.time + self.config.long_press_timeout(),
        });

        let radius = self.config.touch_radius_px();
        let current = doc.current();
        let mut state = State::Selecting { candidate: None };
        self.touch_down_in_current = false;

        if let Some(layer) = current {
            let tree = doc.tree();
            self.touch_down_in_current = hit_test::in_shape_bounds(tree, &layer, down);

            // Inside the inset box no control point can be within reach
            if hit_test::in_inset_bounds(tree, &layer, down, radius) {
                state = State::PreDrag;
            } else if let Some(bounds) = tree.bounds(&layer) {
                let (point, distance) = bounds.closest_control_point(down);
                if distance < radius {
                    doc.tree_mut().start_resize(&layer);
                    state = State::TransformDragging { layer, point };
                } else if bounds.contains(down) {
                    state = State::PreDrag;
                }
            }
        }

        if let State::Selecting { candidate } = &mut state {
            let tree = doc.tree();
            let scope = hit_test::hit_scope(tree, current.as_ref());
            *candidate = hit_test::top_layer_hit(tree, down, scope, current.as_ref());
        }

        self.set_state(state);
    }

    /// Continue a gesture
    pub fn pointer_move(&mut self, doc: &mut Document, event: PointerEvent) {
        self.expire_long_press(event.time);
        let Some(gesture) = self.gesture else {
            return;
        };
        self.tracker.add(event.time, event.position);

        let point = event.position - doc.viewport();
        let delta = point - gesture.down;

        if self.state.is_pending()
            && !matches!(self.state, State::Default)
            && delta.hypot() > self.config.touch_slop_px()
        {
            let next = match self.state {
                State::PreDrag => match doc.current().and_then(|l| Some((l, doc.tree().bounds(&l)?))) {
                    Some((layer, bounds)) => State::Dragging {
                        layer,
                        start: Point::new(bounds.x, bounds.y),
                    },
                    None => State::Default,
                },
                _ => State::ViewportDragging,
            };
            self.set_state(next);
        }

        match self.state {
            State::ViewportDragging => {
                let pan = event.position - gesture.prev_raw;
                doc.set_viewport(doc.viewport() + pan);
            }
            State::Dragging { layer, start } => {
                let dx = delta.x.round();
                let dy = delta.y.round();
                let (x, y) = if !event.shift {
                    (start.x + dx, start.y + dy)
                } else if dx.abs() > dy.abs() {
                    (start.x + dx, start.y)
                } else {
                    (start.x, start.y + dy)
                };
                let tree = doc.tree_mut();
                tree.set_x(&layer, x);
                tree.set_y(&layer, y);
            }
            State::TransformDragging { layer, point: handle } => {
                let dx = (point.x - gesture.prev.x).round();
                let dy = (point.y - gesture.prev.y).round();
                doc.tree_mut().resize(&layer, handle, dx, dy);
            }
            _ => {}
        }

        self.record_prev(doc, event);
    }

    /// Finish a gesture
    pub fn pointer_up(&mut self, doc: &mut Document, event: PointerEvent) {
        self.expire_long_press(event.time);
        let Some(gesture) = self.gesture else {
            self.set_state(State::Default);
            return;
        };
        self.tracker.add(event.time, event.position);

        match self.state {
            State::TransformDragging { layer, .. } => {
                doc.tree_mut().end_resize(&layer);
            }
            State::ViewportDragging => {
                let velocity = self.tracker.velocity();
                self.fling.start(doc.viewport(), velocity, event.time);
            }
            State::PreDrag => {
                if let Some(candidate) = self.tap_through(doc, gesture.down) {
                    self.set_state(State::Selecting { candidate });
                }
            }
            _ => {}
        }

        if let State::Selecting { candidate } = self.state {
            let point = event.position - doc.viewport();
            if (point - gesture.down).hypot() < self.config.touch_slop_px() {
                let current = doc.current();
                let picked =
                    selection::selection_from(doc.tree_mut(), current, candidate, event.shift);
                doc.set_current(picked);
            }
        }

        self.record_prev(doc, event);
        self.set_state(State::Default);
    }

    /// Abandon the gesture without committing a selection
    pub fn cancel(&mut self, doc: &mut Document) {
        if let State::TransformDragging { layer, .. } = self.state {
            doc.tree_mut().end_resize(&layer);
        }
        self.set_state(State::Default);
    }

    /// Advance timers to `now`
    ///
    /// Applies the long-press timeout and moves the viewport along an active
    /// fling. Returns true while another refresh is needed.
    pub fn tick(&mut self, doc: &mut Document, now: Duration) -> bool {
        self.expire_long_press(now);
        if let Some(viewport) = self.fling.tick(now) {
            doc.set_viewport(viewport);
        }
        self.fling.is_active()
    }

    /// Cursor for a hover at `position` (view coordinates)
    pub fn cursor_at(&self, doc: &Document, position: Point) -> CursorHint {
        if matches!(self.state, State::PreDrag | State::Dragging { .. }) {
            return CursorHint::Grabbing;
        }
        let Some(layer) = doc.current() else {
            return CursorHint::Default;
        };
        let Some(bounds) = doc.tree().bounds(&layer) else {
            return CursorHint::Default;
        };

        let point = position - doc.viewport();
        let (handle, distance) = bounds.closest_control_point(point);
        if distance < self.config.touch_radius_px() {
            CursorHint::for_control_point(handle)
        } else if bounds.contains(point) {
            CursorHint::Grab
        } else {
            CursorHint::Default
        }
    }

    /// On a tap inside the current layer, decide whether the layer under the
    /// pointer should be picked instead
    ///
    /// Returns the candidate (possibly none) when selection should proceed.
    fn tap_through(&self, doc: &Document, down: Point) -> Option<Option<Uuid>> {
        let tree = doc.tree();
        let current = doc.current();
        let scope = hit_test::hit_scope(tree, current.as_ref());
        let hit = hit_test::top_layer_hit(tree, down, scope, current.as_ref());
        if hit == current {
            return None;
        }

        let above = match (hit, current) {
            (Some(h), Some(c)) => hit_test::is_stacked_above(tree, &h, &c),
            _ => false,
        };
        let outside_current = match current {
            Some(c) if tree.get(&c).is_some_and(|l| l.as_shape().is_some()) => {
                !hit_test::in_shape_bounds(tree, &c, down)
            }
            _ => true,
        };

        (above || outside_current).then_some(hit)
    }

    fn expire_long_press(&mut self, now: Duration) {
        let Some(gesture) = self.gesture else {
            return;
        };
        if now >= gesture.long_press_deadline && self.state.is_pending() {
            if !matches!(self.state, State::Default) {
                log::debug!("long press timed out");
            }
            self.set_state(State::Default);
        }
    }

    fn record_prev(&mut self, doc: &Document, event: PointerEvent) {
        if let Some(gesture) = self.gesture.as_mut() {
            gesture.prev = event.position - doc.viewport();
            gesture.prev_raw = event.position;
        }
    }
}

impl Default for Interaction {
    fn default() -> Self {
        Self::new(InteractionConfig::default())
    }
}
