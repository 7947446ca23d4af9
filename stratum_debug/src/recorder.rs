// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records. [`decode`] reads them back
//! as an iterator of [`RecordedEvent`].
//!
//! Rich events ([`on_node_changes`](TraceSink::on_node_changes),
//! [`on_damage_rects`](TraceSink::on_damage_rects)) store only the count.

use stratum_core::model::{OutputId, SurfaceId, WindowId};
use stratum_core::pixmap::{PixelSourceKind, PixmapError};
use stratum_core::time::{Duration, HostTime};
use stratum_core::trace::{
    DamageRect, FrameBeginEvent, FrameSummary, NodeChange, PhaseBeginEvent, PhaseEndEvent,
    PhaseKind, PixmapFailureEvent, ReconcileEvent, SkipReason, StackingChangedEvent, TraceSink,
    WindowSkippedEvent,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_FRAME_BEGIN: u8 = 1;
const TAG_PHASE_BEGIN: u8 = 2;
const TAG_PHASE_END: u8 = 3;
const TAG_STACKING_CHANGED: u8 = 4;
const TAG_RECONCILE: u8 = 5;
const TAG_PIXMAP_FAILURE: u8 = 6;
const TAG_WINDOW_SKIPPED: u8 = 7;
const TAG_FRAME_SUMMARY: u8 = 8;
const TAG_NODE_CHANGES_COUNT: u8 = 9;
const TAG_DAMAGE_RECTS_COUNT: u8 = 10;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_count(&mut self, len: usize) {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "event counts capped at u32::MAX for recording"
        )]
        self.write_u32(len.min(u32::MAX as usize) as u32);
    }

    fn write_phase(&mut self, p: PhaseKind) {
        self.write_u8(match p {
            PhaseKind::PrePaint => 0,
            PhaseKind::Paint => 1,
            PhaseKind::PostPaint => 2,
            PhaseKind::Present => 3,
        });
    }

    fn write_skip(&mut self, r: SkipReason) {
        self.write_u8(match r {
            SkipReason::PaintingDisabled => 0,
            SkipReason::Occluded => 1,
            SkipReason::SkipsCloseAnimation => 2,
            SkipReason::ScreenLocked => 3,
            SkipReason::Recursion => 4,
        });
    }

    fn write_kind(&mut self, k: PixelSourceKind) {
        self.write_u8(match k {
            PixelSourceKind::Platform => 0,
            PixelSourceKind::SharedBuffer => 1,
            PixelSourceKind::Offscreen => 2,
        });
    }

    /// Errors take two bytes: the variant, then the pixel source kind (0 when
    /// the variant carries none).
    fn write_error(&mut self, e: PixmapError) {
        match e {
            PixmapError::EmptySize => {
                self.write_u8(0);
                self.write_u8(0);
            }
            PixmapError::Unavailable => {
                self.write_u8(1);
                self.write_u8(0);
            }
            PixmapError::UnsupportedKind(kind) => {
                self.write_u8(2);
                self.write_kind(kind);
            }
        }
    }
}

impl TraceSink for RecorderSink {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        self.write_u8(TAG_FRAME_BEGIN);
        self.write_u64(e.frame_index);
        self.write_u32(e.output.0);
        self.write_u64(e.now.ticks());
        self.write_u64(e.time_diff.ticks());
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.write_u8(TAG_PHASE_BEGIN);
        self.write_u64(e.frame_index);
        self.write_phase(e.phase);
        self.write_u64(e.timestamp.ticks());
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.write_u8(TAG_PHASE_END);
        self.write_u64(e.frame_index);
        self.write_phase(e.phase);
        self.write_u64(e.timestamp.ticks());
    }

    fn on_stacking_changed(&mut self, e: &StackingChangedEvent) {
        self.write_u8(TAG_STACKING_CHANGED);
        self.write_u32(e.window_count);
        self.write_u32(e.constraint_count);
    }

    fn on_reconcile(&mut self, e: &ReconcileEvent) {
        self.write_u8(TAG_RECONCILE);
        self.write_u32(e.window.0);
        self.write_u32(e.created);
        self.write_u32(e.reused);
        self.write_u32(e.removed);
    }

    fn on_pixmap_failure(&mut self, e: &PixmapFailureEvent) {
        self.write_u8(TAG_PIXMAP_FAILURE);
        self.write_u32(e.window.0);
        self.write_u32(e.surface.0);
        self.write_error(e.error);
    }

    fn on_window_skipped(&mut self, e: &WindowSkippedEvent) {
        self.write_u8(TAG_WINDOW_SKIPPED);
        self.write_u64(e.frame_index);
        self.write_u32(e.window.0);
        self.write_skip(e.reason);
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.write_u8(TAG_FRAME_SUMMARY);
        self.write_u64(s.frame_index);
        self.write_u32(s.output.0);
        self.write_u64(s.now.ticks());
        self.write_u32(s.window_count);
        self.write_u32(s.painted_windows);
        self.write_u8(u8::from(s.transformed));
        self.write_u8(u8::from(s.full_repaint));
        self.write_u64(s.pre_paint_ticks);
        self.write_u64(s.paint_ticks);
        self.write_u64(s.post_paint_ticks);
        self.write_u64(s.present_ticks);
    }

    fn on_node_changes(&mut self, frame_index: u64, changes: &[NodeChange]) {
        self.write_u8(TAG_NODE_CHANGES_COUNT);
        self.write_u64(frame_index);
        self.write_count(changes.len());
    }

    fn on_damage_rects(&mut self, frame_index: u64, rects: &[DamageRect]) {
        self.write_u8(TAG_DAMAGE_RECTS_COUNT);
        self.write_u64(frame_index);
        self.write_count(rects.len());
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`FrameBeginEvent`].
    FrameBegin(FrameBeginEvent),
    /// A [`PhaseBeginEvent`].
    PhaseBegin(PhaseBeginEvent),
    /// A [`PhaseEndEvent`].
    PhaseEnd(PhaseEndEvent),
    /// A [`StackingChangedEvent`].
    StackingChanged(StackingChangedEvent),
    /// A [`ReconcileEvent`].
    Reconcile(ReconcileEvent),
    /// A [`PixmapFailureEvent`].
    PixmapFailure(PixmapFailureEvent),
    /// A [`WindowSkippedEvent`].
    WindowSkipped(WindowSkippedEvent),
    /// A [`FrameSummary`].
    FrameSummary(FrameSummary),
    /// Node-change count for a frame.
    NodeChangesCount {
        /// Frame counter.
        frame_index: u64,
        /// Number of node changes.
        count: u32,
    },
    /// Damage-rect count for a frame.
    DamageRectsCount {
        /// Frame counter.
        frame_index: u64,
        /// Number of damage rects.
        count: u32,
    },
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
///
/// Iteration stops at the first truncated record or unknown tag.
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?;
        self.pos += N;
        bytes.try_into().ok()
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[v]| v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_bool(&mut self) -> Option<bool> {
        Some(self.read_u8()? != 0)
    }

    fn read_phase(&mut self) -> Option<PhaseKind> {
        Some(match self.read_u8()? {
            0 => PhaseKind::PrePaint,
            1 => PhaseKind::Paint,
            2 => PhaseKind::PostPaint,
            _ => PhaseKind::Present,
        })
    }

    fn read_skip(&mut self) -> Option<SkipReason> {
        Some(match self.read_u8()? {
            0 => SkipReason::PaintingDisabled,
            1 => SkipReason::Occluded,
            2 => SkipReason::SkipsCloseAnimation,
            3 => SkipReason::ScreenLocked,
            _ => SkipReason::Recursion,
        })
    }

    fn read_error(&mut self) -> Option<PixmapError> {
        let variant = self.read_u8()?;
        let kind = match self.read_u8()? {
            0 => PixelSourceKind::Platform,
            1 => PixelSourceKind::SharedBuffer,
            _ => PixelSourceKind::Offscreen,
        };
        Some(match variant {
            0 => PixmapError::EmptySize,
            1 => PixmapError::Unavailable,
            _ => PixmapError::UnsupportedKind(kind),
        })
    }

    fn decode_frame_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameBegin(FrameBeginEvent {
            frame_index: self.read_u64()?,
            output: OutputId(self.read_u32()?),
            now: HostTime(self.read_u64()?),
            time_diff: Duration(self.read_u64()?),
        }))
    }

    fn decode_phase_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseBegin(PhaseBeginEvent {
            frame_index: self.read_u64()?,
            phase: self.read_phase()?,
            timestamp: HostTime(self.read_u64()?),
        }))
    }

    fn decode_phase_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseEnd(PhaseEndEvent {
            frame_index: self.read_u64()?,
            phase: self.read_phase()?,
            timestamp: HostTime(self.read_u64()?),
        }))
    }

    fn decode_stacking_changed(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::StackingChanged(StackingChangedEvent {
            window_count: self.read_u32()?,
            constraint_count: self.read_u32()?,
        }))
    }

    fn decode_reconcile(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Reconcile(ReconcileEvent {
            window: WindowId(self.read_u32()?),
            created: self.read_u32()?,
            reused: self.read_u32()?,
            removed: self.read_u32()?,
        }))
    }

    fn decode_pixmap_failure(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PixmapFailure(PixmapFailureEvent {
            window: WindowId(self.read_u32()?),
            surface: SurfaceId(self.read_u32()?),
            error: self.read_error()?,
        }))
    }

    fn decode_window_skipped(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::WindowSkipped(WindowSkippedEvent {
            frame_index: self.read_u64()?,
            window: WindowId(self.read_u32()?),
            reason: self.read_skip()?,
        }))
    }

    fn decode_frame_summary(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameSummary(FrameSummary {
            frame_index: self.read_u64()?,
            output: OutputId(self.read_u32()?),
            now: HostTime(self.read_u64()?),
            window_count: self.read_u32()?,
            painted_windows: self.read_u32()?,
            transformed: self.read_bool()?,
            full_repaint: self.read_bool()?,
            pre_paint_ticks: self.read_u64()?,
            paint_ticks: self.read_u64()?,
            post_paint_ticks: self.read_u64()?,
            present_ticks: self.read_u64()?,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_FRAME_BEGIN => self.decode_frame_begin(),
            TAG_PHASE_BEGIN => self.decode_phase_begin(),
            TAG_PHASE_END => self.decode_phase_end(),
            TAG_STACKING_CHANGED => self.decode_stacking_changed(),
            TAG_RECONCILE => self.decode_reconcile(),
            TAG_PIXMAP_FAILURE => self.decode_pixmap_failure(),
            TAG_WINDOW_SKIPPED => self.decode_window_skipped(),
            TAG_FRAME_SUMMARY => self.decode_frame_summary(),
            TAG_NODE_CHANGES_COUNT => {
                let frame_index = self.read_u64()?;
                let count = self.read_u32()?;
                Some(RecordedEvent::NodeChangesCount { frame_index, count })
            }
            TAG_DAMAGE_RECTS_COUNT => {
                let frame_index = self.read_u64()?;
                let count = self.read_u32()?;
                Some(RecordedEvent::DamageRectsCount { frame_index, count })
            }
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
