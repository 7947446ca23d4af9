// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Timestamps
//! are converted to microseconds using a [`Timebase`].

use std::io::Write;

use stratum_core::time::{HostTime, Timebase};
use stratum_core::trace::{
    DamageRect, FrameBeginEvent, FrameSummary, NodeChange, PhaseBeginEvent, PhaseEndEvent,
    PhaseKind, PixmapFailureEvent, ReconcileEvent, SkipReason, StackingChangedEvent, TraceSink,
    WindowSkippedEvent,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    timebase: Timebase,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("timebase", &self.timebase)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr(timebase: Timebase) -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
            timebase,
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>, timebase: Timebase) -> Self {
        Self { writer, timebase }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W, timebase: Timebase) -> Self {
        Self { writer, timebase }
    }

    /// Consumes the sink and returns the destination.
    #[must_use]
    pub fn into_writer(self) -> W {
        self.writer
    }

    fn ticks_to_us(&self, ticks: u64) -> f64 {
        self.timebase.ticks_to_nanos(ticks) as f64 / 1000.0
    }

    fn host_us(&self, t: HostTime) -> f64 {
        self.ticks_to_us(t.ticks())
    }
}

fn phase_name(phase: PhaseKind) -> &'static str {
    match phase {
        PhaseKind::PrePaint => "pre-paint",
        PhaseKind::Paint => "paint",
        PhaseKind::PostPaint => "post-paint",
        PhaseKind::Present => "present",
    }
}

fn skip_name(reason: SkipReason) -> &'static str {
    match reason {
        SkipReason::PaintingDisabled => "disabled",
        SkipReason::Occluded => "occluded",
        SkipReason::SkipsCloseAnimation => "no-close-animation",
        SkipReason::ScreenLocked => "locked",
        SkipReason::Recursion => "recursion",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[frame] frame={} output={} now={:.1}µs diff={:.1}µs",
            e.frame_index,
            e.output.0,
            self.host_us(e.now),
            self.ticks_to_us(e.time_diff.ticks()),
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:begin] frame={} {} at {:.1}µs",
            e.frame_index,
            phase_name(e.phase),
            self.host_us(e.timestamp),
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:end] frame={} {} at {:.1}µs",
            e.frame_index,
            phase_name(e.phase),
            self.host_us(e.timestamp),
        );
    }

    fn on_stacking_changed(&mut self, e: &StackingChangedEvent) {
        let _ = writeln!(
            self.writer,
            "[stacking] windows={} constraints={}",
            e.window_count, e.constraint_count,
        );
    }

    fn on_reconcile(&mut self, e: &ReconcileEvent) {
        let _ = writeln!(
            self.writer,
            "[reconcile] window={} created={} reused={} removed={}",
            e.window.0, e.created, e.reused, e.removed,
        );
    }

    fn on_pixmap_failure(&mut self, e: &PixmapFailureEvent) {
        let _ = writeln!(
            self.writer,
            "[pixmap] window={} surface={} error: {}",
            e.window.0, e.surface.0, e.error,
        );
    }

    fn on_window_skipped(&mut self, e: &WindowSkippedEvent) {
        let _ = writeln!(
            self.writer,
            "[skip] frame={} window={} {}",
            e.frame_index,
            e.window.0,
            skip_name(e.reason),
        );
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        let strategy = if s.transformed { "generic" } else { "simple" };
        let repaint = if s.full_repaint { "full" } else { "partial" };
        let _ = writeln!(
            self.writer,
            "[summary] frame={} windows={}/{} {strategy} {repaint} \
             pre={:.1}µs paint={:.1}µs post={:.1}µs present={:.1}µs",
            s.frame_index,
            s.painted_windows,
            s.window_count,
            self.ticks_to_us(s.pre_paint_ticks),
            self.ticks_to_us(s.paint_ticks),
            self.ticks_to_us(s.post_paint_ticks),
            self.ticks_to_us(s.present_ticks),
        );
    }

    fn on_node_changes(&mut self, frame_index: u64, changes: &[NodeChange]) {
        let _ = writeln!(
            self.writer,
            "[nodes] frame={frame_index} changes={}",
            changes.len(),
        );
    }

    fn on_damage_rects(&mut self, frame_index: u64, rects: &[DamageRect]) {
        let area: f64 = rects.iter().map(|r| r.width * r.height).sum();
        let _ = writeln!(
            self.writer,
            "[damage] frame={frame_index} rects={} area={area:.0}",
            rects.len(),
        );
    }
}
