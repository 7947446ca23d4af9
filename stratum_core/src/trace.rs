// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the compositing loop.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that
//! the stacking order, scene graph and paint pipeline call at each stage. All
//! method bodies default to no-ops, so implementing only the events you care
//! about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! [`FrameSummaryBuilder`] collects phase timestamps during a frame and
//! produces a [`FrameSummary`] at the end.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`): gates [`NodeChange`] and [`DamageRect`]
//!   events plus the corresponding `TraceSink` methods.

use crate::model::{OutputId, SurfaceId, WindowId};
use crate::pixmap::PixmapError;
use crate::time::{Duration, HostTime};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which phase of a frame is being measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Scene update, screen and window pre-paint.
    PrePaint,
    /// Screen and window painting through the effect chain.
    Paint,
    /// Window and screen post-paint.
    PostPaint,
    /// Handing the frame to the backend.
    Present,
}

/// Why a window contributed nothing to a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// Painting was disabled (minimized, other desktop, effect request, ...).
    PaintingDisabled,
    /// The window's paint region was empty after occlusion culling.
    Occluded,
    /// A closed window that must not be animated out.
    SkipsCloseAnimation,
    /// The session is locked and the window is not part of the locker.
    ScreenLocked,
    /// The window hosts the desktop preview currently being painted.
    Recursion,
}

/// Which attribute of a scene node changed.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeField {
    /// Position or size.
    Geometry,
    /// Pixel-space shape.
    Shape,
    /// Visibility flag.
    Visibility,
    /// Window quads.
    Quads,
    /// Bound pixel source.
    PixelSource,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a frame starts.
#[derive(Clone, Copy, Debug)]
pub struct FrameBeginEvent {
    /// Monotonic frame counter.
    pub frame_index: u64,
    /// Output being painted.
    pub output: OutputId,
    /// Host time at the start of the frame.
    pub now: HostTime,
    /// Time since the previous painting pass.
    pub time_diff: Duration,
}

/// Marks the beginning of a frame phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBeginEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which phase is starting.
    pub phase: PhaseKind,
    /// Host time at the start of the phase.
    pub timestamp: HostTime,
}

/// Marks the end of a frame phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseEndEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which phase is ending.
    pub phase: PhaseKind,
    /// Host time at the end of the phase.
    pub timestamp: HostTime,
}

/// Emitted when a stacking-order rebuild changed the window order.
#[derive(Clone, Copy, Debug)]
pub struct StackingChangedEvent {
    /// Number of stacked windows.
    pub window_count: u32,
    /// Number of live constraints.
    pub constraint_count: u32,
}

/// Emitted after a window's scene tree was reconciled.
#[derive(Clone, Copy, Debug)]
pub struct ReconcileEvent {
    /// The reconciled window.
    pub window: WindowId,
    /// Surface nodes created.
    pub created: u32,
    /// Surface nodes found and kept (possibly relinked).
    pub reused: u32,
    /// Nodes deleted.
    pub removed: u32,
}

/// Emitted when a pixel source could not be created.
#[derive(Clone, Copy, Debug)]
pub struct PixmapFailureEvent {
    /// Window owning the surface.
    pub window: WindowId,
    /// The surface left without pixels.
    pub surface: SurfaceId,
    /// What went wrong.
    pub error: PixmapError,
}

/// Emitted when a window is left out of a frame.
#[derive(Clone, Copy, Debug)]
pub struct WindowSkippedEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// The skipped window.
    pub window: WindowId,
    /// Why it was skipped.
    pub reason: SkipReason,
}

/// Per-frame summary produced by [`FrameSummaryBuilder`].
#[derive(Clone, Copy, Debug)]
pub struct FrameSummary {
    /// Frame counter.
    pub frame_index: u64,
    /// Output painted.
    pub output: OutputId,
    /// Host time at the start of the frame.
    pub now: HostTime,
    /// Windows in the stacking order.
    pub window_count: u32,
    /// Windows that reached the backend.
    pub painted_windows: u32,
    /// Whether the generic (transformed) strategy was used.
    pub transformed: bool,
    /// Whether the whole output was repainted.
    pub full_repaint: bool,
    /// Pre-paint duration in ticks (0 if not measured).
    pub pre_paint_ticks: u64,
    /// Paint duration in ticks (0 if not measured).
    pub paint_ticks: u64,
    /// Post-paint duration in ticks (0 if not measured).
    pub post_paint_ticks: u64,
    /// Present duration in ticks (0 if not measured).
    pub present_ticks: u64,
}

/// A per-frame scene node change record.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct NodeChange {
    /// Slot index of the node that changed.
    pub node_index: u32,
    /// Which attribute changed.
    pub field: NodeField,
}

/// An axis-aligned damage rectangle in output coordinates.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct DamageRect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

#[cfg(feature = "trace-rich")]
impl From<kurbo::Rect> for DamageRect {
    fn from(r: kurbo::Rect) -> Self {
        Self {
            x: r.x0,
            y: r.y0,
            width: r.width(),
            height: r.height(),
        }
    }
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the compositing loop.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a frame starts.
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        _ = e;
    }

    /// Called at the beginning of a frame phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a frame phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called when a rebuild changed the stacking order.
    fn on_stacking_changed(&mut self, e: &StackingChangedEvent) {
        _ = e;
    }

    /// Called after a window's scene tree was reconciled.
    fn on_reconcile(&mut self, e: &ReconcileEvent) {
        _ = e;
    }

    /// Called when a pixel source could not be created.
    fn on_pixmap_failure(&mut self, e: &PixmapFailureEvent) {
        _ = e;
    }

    /// Called when a window is left out of a frame.
    fn on_window_skipped(&mut self, e: &WindowSkippedEvent) {
        _ = e;
    }

    /// Called with a per-frame summary.
    fn on_frame_summary(&mut self, s: &FrameSummary) {
        _ = s;
    }

    /// Called with per-frame node changes (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    fn on_node_changes(&mut self, frame_index: u64, changes: &[NodeChange]) {
        _ = (frame_index, changes);
    }

    /// Called with the frame's update region (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    fn on_damage_rects(&mut self, frame_index: u64, rects: &[DamageRect]) {
        _ = (frame_index, rects);
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

/// Expands to a `Tracer` method that forwards one event to the sink.
macro_rules! forward {
    ($(#[$doc:meta])* $name:ident => $hook:ident($ty:ty)) => {
        $(#[$doc])*
        #[inline]
        pub fn $name(&mut self, e: &$ty) {
            #[cfg(feature = "trace")]
            if let Some(s) = &mut self.sink {
                s.$hook(e);
            }
            #[cfg(not(feature = "trace"))]
            {
                _ = e;
            }
        }
    };
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    forward!(
        /// Emits a [`FrameBeginEvent`].
        frame_begin => on_frame_begin(FrameBeginEvent)
    );
    forward!(
        /// Emits a [`PhaseBeginEvent`].
        phase_begin => on_phase_begin(PhaseBeginEvent)
    );
    forward!(
        /// Emits a [`PhaseEndEvent`].
        phase_end => on_phase_end(PhaseEndEvent)
    );
    forward!(
        /// Emits a [`StackingChangedEvent`].
        stacking_changed => on_stacking_changed(StackingChangedEvent)
    );
    forward!(
        /// Emits a [`ReconcileEvent`].
        reconcile => on_reconcile(ReconcileEvent)
    );
    forward!(
        /// Emits a [`PixmapFailureEvent`].
        pixmap_failure => on_pixmap_failure(PixmapFailureEvent)
    );
    forward!(
        /// Emits a [`WindowSkippedEvent`].
        window_skipped => on_window_skipped(WindowSkippedEvent)
    );
    forward!(
        /// Emits a [`FrameSummary`].
        frame_summary => on_frame_summary(FrameSummary)
    );

    /// Emits node changes (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn node_changes(&mut self, frame_index: u64, changes: &[NodeChange]) {
        if let Some(s) = &mut self.sink {
            s.on_node_changes(frame_index, changes);
        }
    }

    /// Emits damage rectangles (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn damage_rects(&mut self, frame_index: u64, rects: &[DamageRect]) {
        if let Some(s) = &mut self.sink {
            s.on_damage_rects(frame_index, rects);
        }
    }
}

// ---------------------------------------------------------------------------
// FrameSummaryBuilder
// ---------------------------------------------------------------------------

/// Collects phase timestamps during a frame and produces a [`FrameSummary`].
#[derive(Debug)]
pub struct FrameSummaryBuilder {
    begin: FrameBeginEvent,
    phase_starts: [Option<HostTime>; 4],
    phase_ends: [Option<HostTime>; 4],
    window_count: u32,
    painted_windows: u32,
    transformed: bool,
    full_repaint: bool,
}

impl FrameSummaryBuilder {
    /// Starts building a summary for the given frame.
    #[must_use]
    pub fn new(begin: &FrameBeginEvent) -> Self {
        Self {
            begin: *begin,
            phase_starts: [None; 4],
            phase_ends: [None; 4],
            window_count: 0,
            painted_windows: 0,
            transformed: false,
            full_repaint: false,
        }
    }

    /// Records the start of a phase.
    pub fn phase_begin(&mut self, phase: PhaseKind, t: HostTime) {
        self.phase_starts[phase_index(phase)] = Some(t);
    }

    /// Records the end of a phase.
    pub fn phase_end(&mut self, phase: PhaseKind, t: HostTime) {
        self.phase_ends[phase_index(phase)] = Some(t);
    }

    /// Records how many windows were stacked and how many were painted.
    pub fn set_window_counts(&mut self, stacked: u32, painted: u32) {
        self.window_count = stacked;
        self.painted_windows = painted;
    }

    /// Records the painting strategy outcome.
    pub fn set_repaint(&mut self, transformed: bool, full_repaint: bool) {
        self.transformed = transformed;
        self.full_repaint = full_repaint;
    }

    /// Consumes the builder and produces the final [`FrameSummary`].
    #[must_use]
    pub fn finish(self) -> FrameSummary {
        FrameSummary {
            frame_index: self.begin.frame_index,
            output: self.begin.output,
            now: self.begin.now,
            window_count: self.window_count,
            painted_windows: self.painted_windows,
            transformed: self.transformed,
            full_repaint: self.full_repaint,
            pre_paint_ticks: self.phase_duration(PhaseKind::PrePaint),
            paint_ticks: self.phase_duration(PhaseKind::Paint),
            post_paint_ticks: self.phase_duration(PhaseKind::PostPaint),
            present_ticks: self.phase_duration(PhaseKind::Present),
        }
    }

    fn phase_duration(&self, phase: PhaseKind) -> u64 {
        let idx = phase_index(phase);
        match (self.phase_starts[idx], self.phase_ends[idx]) {
            (Some(start), Some(end)) => end.saturating_duration_since(start).ticks(),
            _ => 0,
        }
    }
}

/// Maps a [`PhaseKind`] to an array index.
const fn phase_index(phase: PhaseKind) -> usize {
    match phase {
        PhaseKind::PrePaint => 0,
        PhaseKind::Paint => 1,
        PhaseKind::PostPaint => 2,
        PhaseKind::Present => 3,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_begin() -> FrameBeginEvent {
        FrameBeginEvent {
            frame_index: 42,
            output: OutputId(0),
            now: HostTime(1_000_000),
            time_diff: Duration(16_666_667),
        }
    }

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_frame_begin(&sample_begin());
        sink.on_window_skipped(&WindowSkippedEvent {
            frame_index: 0,
            window: WindowId(1),
            reason: SkipReason::Occluded,
        });
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.frame_begin(&sample_begin());
        tracer.stacking_changed(&StackingChangedEvent {
            window_count: 3,
            constraint_count: 1,
        });
    }

    #[test]
    fn summary_builder_computes_durations() {
        let mut builder = FrameSummaryBuilder::new(&sample_begin());

        builder.phase_begin(PhaseKind::PrePaint, HostTime(1_000_000));
        builder.phase_end(PhaseKind::PrePaint, HostTime(1_000_100));
        builder.phase_begin(PhaseKind::Paint, HostTime(1_000_100));
        builder.phase_end(PhaseKind::Paint, HostTime(1_000_500));
        builder.phase_begin(PhaseKind::PostPaint, HostTime(1_000_500));
        builder.phase_end(PhaseKind::PostPaint, HostTime(1_000_550));
        builder.phase_begin(PhaseKind::Present, HostTime(1_000_550));
        builder.phase_end(PhaseKind::Present, HostTime(1_002_000));
        builder.set_window_counts(5, 3);
        builder.set_repaint(false, true);

        let summary = builder.finish();
        assert_eq!(summary.pre_paint_ticks, 100);
        assert_eq!(summary.paint_ticks, 400);
        assert_eq!(summary.post_paint_ticks, 50);
        assert_eq!(summary.present_ticks, 1450);
        assert_eq!(summary.window_count, 5);
        assert_eq!(summary.painted_windows, 3);
        assert!(summary.full_repaint);
        assert!(!summary.transformed);
        assert_eq!(summary.frame_index, 42);
    }

    #[test]
    fn summary_builder_missing_phases_are_zero() {
        let summary = FrameSummaryBuilder::new(&sample_begin()).finish();
        assert_eq!(summary.pre_paint_ticks, 0);
        assert_eq!(summary.paint_ticks, 0);
        assert_eq!(summary.post_paint_ticks, 0);
        assert_eq!(summary.present_ticks, 0);
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        use alloc::vec::Vec;

        struct RecordingSink {
            skipped: Vec<(WindowId, SkipReason)>,
        }
        impl TraceSink for RecordingSink {
            fn on_window_skipped(&mut self, e: &WindowSkippedEvent) {
                self.skipped.push((e.window, e.reason));
            }
        }

        let mut sink = RecordingSink {
            skipped: Vec::new(),
        };
        let mut tracer = Tracer::new(&mut sink);
        tracer.window_skipped(&WindowSkippedEvent {
            frame_index: 1,
            window: WindowId(7),
            reason: SkipReason::ScreenLocked,
        });
        drop(tracer);
        assert_eq!(sink.skipped, &[(WindowId(7), SkipReason::ScreenLocked)]);
    }
}
