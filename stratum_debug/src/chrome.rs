// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! Phases become duration slices on the output's track. Skipped windows and
//! pixmap failures become instant events on a track per window, so a
//! window that keeps getting culled is easy to spot.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use stratum_core::time::Timebase;

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
///
/// Timestamps are converted to microseconds using the provided [`Timebase`].
/// Events without a timestamp of their own use the start of the frame that
/// precedes them in the recording.
pub fn export(bytes: &[u8], timebase: Timebase, writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    let mut output = 0;
    let mut frame_ts = 0.0;

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::FrameBegin(e) => {
                output = e.output.0;
                frame_ts = ticks_to_us(e.now.ticks(), timebase);
                events.push(json!({
                    "ph": "i",
                    "name": "FrameBegin",
                    "cat": "Frame",
                    "ts": frame_ts,
                    "pid": output,
                    "tid": 0,
                    "s": "p",
                    "args": {
                        "frame_index": e.frame_index,
                        "time_diff_us": ticks_to_us(e.time_diff.ticks(), timebase),
                    }
                }));
            }
            RecordedEvent::PhaseBegin(e) => {
                events.push(json!({
                    "ph": "B",
                    "name": format!("{:?}", e.phase),
                    "cat": "Frame",
                    "ts": ticks_to_us(e.timestamp.ticks(), timebase),
                    "pid": output,
                    "tid": 0,
                    "args": {
                        "frame_index": e.frame_index,
                    }
                }));
            }
            RecordedEvent::PhaseEnd(e) => {
                events.push(json!({
                    "ph": "E",
                    "name": format!("{:?}", e.phase),
                    "cat": "Frame",
                    "ts": ticks_to_us(e.timestamp.ticks(), timebase),
                    "pid": output,
                    "tid": 0,
                    "args": {
                        "frame_index": e.frame_index,
                    }
                }));
            }
            RecordedEvent::StackingChanged(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "StackingChanged",
                    "cat": "Stacking",
                    "ts": frame_ts,
                    "pid": output,
                    "tid": 0,
                    "s": "p",
                    "args": {
                        "windows": e.window_count,
                        "constraints": e.constraint_count,
                    }
                }));
            }
            RecordedEvent::Reconcile(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Reconcile",
                    "cat": "Scene",
                    "ts": frame_ts,
                    "pid": output,
                    "tid": window_track(e.window.0),
                    "s": "t",
                    "args": {
                        "created": e.created,
                        "reused": e.reused,
                        "removed": e.removed,
                    }
                }));
            }
            RecordedEvent::PixmapFailure(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "PixmapFailure",
                    "cat": "Scene",
                    "ts": frame_ts,
                    "pid": output,
                    "tid": window_track(e.window.0),
                    "s": "t",
                    "args": {
                        "surface": e.surface.0,
                        "error": e.error.to_string(),
                    }
                }));
            }
            RecordedEvent::WindowSkipped(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "WindowSkipped",
                    "cat": "Paint",
                    "ts": frame_ts,
                    "pid": output,
                    "tid": window_track(e.window.0),
                    "s": "t",
                    "args": {
                        "frame_index": e.frame_index,
                        "reason": format!("{:?}", e.reason),
                    }
                }));
            }
            RecordedEvent::FrameSummary(s) => {
                events.push(json!({
                    "ph": "i",
                    "name": "FrameSummary",
                    "cat": "Summary",
                    "ts": ticks_to_us(s.now.ticks(), timebase),
                    "pid": s.output.0,
                    "tid": 0,
                    "s": "p",
                    "args": {
                        "frame_index": s.frame_index,
                        "windows": s.window_count,
                        "painted_windows": s.painted_windows,
                        "transformed": s.transformed,
                        "full_repaint": s.full_repaint,
                        "pre_paint_us": ticks_to_us(s.pre_paint_ticks, timebase),
                        "paint_us": ticks_to_us(s.paint_ticks, timebase),
                        "post_paint_us": ticks_to_us(s.post_paint_ticks, timebase),
                        "present_us": ticks_to_us(s.present_ticks, timebase),
                    }
                }));
            }
            RecordedEvent::NodeChangesCount { frame_index, count } => {
                events.push(json!({
                    "ph": "C",
                    "name": "NodeChanges",
                    "cat": "Rich",
                    "ts": frame_ts,
                    "pid": output,
                    "args": {
                        "frame_index": frame_index,
                        "count": count,
                    }
                }));
            }
            RecordedEvent::DamageRectsCount { frame_index, count } => {
                events.push(json!({
                    "ph": "C",
                    "name": "DamageRects",
                    "cat": "Rich",
                    "ts": frame_ts,
                    "pid": output,
                    "args": {
                        "frame_index": frame_index,
                        "count": count,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

/// Thread id for a window's track; 0 is the frame track.
fn window_track(window: u32) -> u64 {
    u64::from(window) + 1
}

fn ticks_to_us(ticks: u64, timebase: Timebase) -> f64 {
    timebase.ticks_to_nanos(ticks) as f64 / 1000.0
}
