// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-frame paint pipeline.
//!
//! [`Compositor::paint`] runs one frame: it brings the scene up to date,
//! negotiates the screen mask and region with the effects, pre-paints every
//! stacked window, paints the screen with the strategy the mask selects,
//! runs post-paint and hands the resulting regions to the backend.
//!
//! Window previews are painted after the window hosting them. Desktop
//! previews re-enter the screen paint with a transformed mask while the
//! host is on a recursion stack, so a host never appears in its own preview.

use alloc::vec::Vec;
use core::fmt;
use core::mem;

use kurbo::{Affine, Rect};
use stratum_core::model::{OutputId, WindowId, WindowModel, WindowState};
use stratum_core::quad::WindowQuadList;
use stratum_core::region::Region;
use stratum_core::scene::{PaintDisabled, SceneGraph, SceneWindow};
use stratum_core::stack::StackingOrder;
use stratum_core::time::{Duration, FrameClock, HostClock, Timebase};
use stratum_core::trace::{
    FrameBeginEvent, FrameSummaryBuilder, PhaseBeginEvent, PhaseEndEvent, PhaseKind, SkipReason,
    Tracer, WindowSkippedEvent,
};

use crate::backend::Backend;
use crate::data::{ScreenPaintData, ScreenPrePaintData, WindowPaintData, WindowPrePaintData};
use crate::effect::{Effect, EffectChain, EffectWindow, Next, PaintHandler};
use crate::mask::{PaintMask, PaintStrategy};
use crate::thumbnail::{DesktopThumbnailPlacement, WindowThumbnailPlacement};

/// Static configuration of a [`Compositor`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompositorConfig {
    /// The output painted.
    pub output: OutputId,
    /// Output rectangle.
    pub display: Rect,
    /// Timebase of the [`HostClock`] passed to each frame.
    pub timebase: Timebase,
}

impl CompositorConfig {
    /// Configuration for `output` covering `display`, with a nanosecond
    /// clock.
    #[must_use]
    pub fn new(output: OutputId, display: Rect) -> Self {
        Self {
            output,
            display,
            timebase: Timebase::NANOS,
        }
    }
}

/// Everything a frame reads or writes besides the compositor itself.
pub struct FrameContext<'a> {
    /// Window state.
    pub model: &'a dyn WindowModel,
    /// Scene graph, updated at the start of the frame.
    pub scene: &'a mut SceneGraph,
    /// Stacking order, bottom to top.
    pub stacking: &'a StackingOrder,
    /// Effects, in hook order.
    pub effects: &'a EffectChain,
    /// Rendering backend.
    pub backend: &'a mut dyn Backend,
    /// Monotonic clock.
    pub clock: &'a dyn HostClock,
}

impl fmt::Debug for FrameContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameContext")
            .field("scene", &self.scene)
            .field("stacking", &self.stacking)
            .field("effects", &self.effects)
            .finish_non_exhaustive()
    }
}

/// The result of painting one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameOutput {
    /// Index of the frame.
    pub frame_index: u64,
    /// Screen mask after negotiation.
    pub mask: PaintMask,
    /// Strategy used for the top-level screen.
    pub strategy: PaintStrategy,
    /// Whether the whole output was repainted.
    pub full_repaint: bool,
    /// Area that changed on screen.
    pub update_region: Region,
    /// Area of the back buffer that is now up to date.
    pub valid_region: Region,
    /// Window draws issued to the backend, previews included.
    pub painted_windows: u32,
    /// Time since the previous frame, as seen by effects.
    pub time_diff: Duration,
    /// Whether repaints were scheduled for the next frame.
    pub repaint_requested: bool,
}

/// Paints frames for one output.
#[derive(Debug)]
pub struct Compositor {
    config: CompositorConfig,
    clock: FrameClock,
    frame_index: u64,
    pending: Region,
}

impl Compositor {
    /// Creates a compositor. The first frame reports a minimal time step.
    #[must_use]
    pub fn new(config: CompositorConfig) -> Self {
        Self {
            clock: FrameClock::new(config.timebase),
            config,
            frame_index: 0,
            pending: Region::new(),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    /// Index the next frame will have.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Screen area scheduled for the next frame by effects.
    #[must_use]
    pub fn pending_repaints(&self) -> &Region {
        &self.pending
    }

    /// Changes the output rectangle. The next frame repaints everything.
    pub fn set_display(&mut self, display: Rect) {
        self.config.display = display;
        self.pending = Region::from_rect(display);
    }

    /// Records that no frame was painted for a while, so the next frame's
    /// time step is not inflated.
    pub fn idle(&mut self) {
        self.clock.idle();
    }

    /// Paints one frame. `damage` is the screen area known to have changed,
    /// in output coordinates.
    ///
    /// # Panics
    ///
    /// Panics if the backend renders a different output than the one
    /// configured.
    pub fn paint(&mut self, damage: &Region, ctx: FrameContext<'_>) -> FrameOutput {
        self.paint_traced(damage, ctx, &mut Tracer::none())
    }

    /// Like [`paint`](Self::paint), reporting frame events to `tracer`.
    pub fn paint_traced(
        &mut self,
        damage: &Region,
        ctx: FrameContext<'_>,
        tracer: &mut Tracer<'_>,
    ) -> FrameOutput {
        let FrameContext {
            model,
            scene,
            stacking,
            effects,
            backend,
            clock,
        } = ctx;
        assert_eq!(
            backend.output(),
            self.config.output,
            "backend renders a different output than the compositor"
        );
        let now = clock.now();
        let time_diff = self.clock.advance(now);
        let frame_index = self.frame_index;
        self.frame_index += 1;
        let begin = FrameBeginEvent {
            frame_index,
            output: self.config.output,
            now,
            time_diff,
        };
        tracer.frame_begin(&begin);

        scene.update_traced(model, frame_index, tracer);
        scene.update_pixmaps(model, &mut *backend, tracer);

        let display = self.config.display;
        let display_region = Region::from_rect(display);
        let mut damage = damage.clone();
        damage |= &mem::take(&mut self.pending);

        let snapshots: Vec<EffectWindow> = stacking
            .windows()
            .iter()
            .copied()
            .filter(|&w| scene.contains(w))
            .map(|w| EffectWindow::snapshot(model, scene, w))
            .collect();
        let active = effects.active();
        let repaint = backend.prepare_rendering_frame();

        let mut painter = Painter {
            model,
            scene: &mut *scene,
            backend: &mut *backend,
            tracer: &mut *tracer,
            clock,
            effects: &active,
            windows: &snapshots,
            summary: FrameSummaryBuilder::new(&begin),
            output: self.config.output,
            display,
            frame_index,
            time_diff,
            screen_locked: model.is_screen_locked(),
            screen_transform: Affine::IDENTITY,
            painted_region: Region::new(),
            damaged_region: Region::new(),
            repaint_region: repaint,
            screen_repaints: Region::new(),
            prepared: None,
            recursion: Vec::new(),
            rendering_desktop: None,
            opaque_fullscreen: false,
            strategy: PaintStrategy::Simple,
            full_repaint: false,
            painted_windows: 0,
        };

        painter.phase_begin(PhaseKind::PrePaint);
        let mut pre = ScreenPrePaintData {
            mask: if damage == display_region {
                PaintMask::empty()
            } else {
                PaintMask::SCREEN_REGION
            },
            paint: damage,
        };
        painter.chain().pre_paint_screen(&mut pre, time_diff);
        let mut mask = pre.mask;
        let region = if mask.is_transformed() {
            mask -= PaintMask::SCREEN_REGION;
            Region::infinite()
        } else if mask.contains(PaintMask::SCREEN_REGION) {
            let mut region = pre.paint;
            region &= display;
            region
        } else {
            display_region.clone()
        };
        let strategy = mask.strategy();
        let prepared = painter.pre_paint_windows(strategy, mask, &region);
        painter.prepared = Some((strategy, prepared));
        painter.phase_end(PhaseKind::PrePaint);

        painter.phase_begin(PhaseKind::Paint);
        painter.painted_region = region.clone();
        if mask.contains(PaintMask::SCREEN_BACKGROUND_FIRST) {
            painter.backend.paint_background(&(&region & &display_region));
        }
        let mut screen = ScreenPaintData::new(self.config.output, display);
        painter.chain().paint_screen(mask, &region, &mut screen);
        painter.phase_end(PhaseKind::Paint);

        painter.phase_begin(PhaseKind::PostPaint);
        for window in &snapshots {
            painter.chain().post_paint_window(window);
        }
        painter.chain().post_paint_screen();
        let update = mem::take(&mut painter.damaged_region);
        let mut valid = &region | &painter.painted_region;
        valid &= display;
        painter.phase_end(PhaseKind::PostPaint);

        painter.phase_begin(PhaseKind::Present);
        painter.backend.end_rendering_frame(&valid, &update);
        painter.backend.present();
        painter.phase_end(PhaseKind::Present);

        let Painter {
            mut summary,
            screen_repaints,
            strategy,
            full_repaint,
            painted_windows,
            ..
        } = painter;
        summary.set_window_counts(count(snapshots.len()), painted_windows);
        summary.set_repaint(strategy == PaintStrategy::Generic, full_repaint);
        tracer.frame_summary(&summary.finish());
        #[cfg(feature = "trace-rich")]
        {
            use stratum_core::trace::DamageRect;

            let rects: Vec<DamageRect> = update.rects().iter().map(|&r| r.into()).collect();
            tracer.damage_rects(frame_index, &rects);
        }

        self.pending = screen_repaints;
        let repaint_requested =
            !self.pending.is_empty() || scene.windows().any(|(_, w)| !w.repaints().is_empty());
        FrameOutput {
            frame_index,
            mask,
            strategy,
            full_repaint,
            update_region: update,
            valid_region: valid,
            painted_windows,
            time_diff,
            repaint_requested,
        }
    }
}

/// A window scheduled for painting after pre-paint.
struct Phase2 {
    window: EffectWindow,
    region: Region,
    clip: Region,
    mask: PaintMask,
    quads: WindowQuadList,
}

/// Frame-scoped painting state; the end of every effect hook.
struct Painter<'p, 't> {
    model: &'p dyn WindowModel,
    scene: &'p mut SceneGraph,
    backend: &'p mut dyn Backend,
    tracer: &'p mut Tracer<'t>,
    clock: &'p dyn HostClock,
    effects: &'p [&'p dyn Effect],
    windows: &'p [EffectWindow],
    summary: FrameSummaryBuilder,
    output: OutputId,
    display: Rect,
    frame_index: u64,
    time_diff: Duration,
    screen_locked: bool,
    screen_transform: Affine,
    /// Area painted this frame, screen region included.
    painted_region: Region,
    /// Area that changed on screen this frame.
    damaged_region: Region,
    /// Area the back buffer is missing, from its age.
    repaint_region: Region,
    screen_repaints: Region,
    prepared: Option<(PaintStrategy, Vec<Phase2>)>,
    /// Hosts of the desktop previews being painted.
    recursion: Vec<WindowId>,
    rendering_desktop: Option<u32>,
    opaque_fullscreen: bool,
    strategy: PaintStrategy,
    full_repaint: bool,
    painted_windows: u32,
}

impl Painter<'_, '_> {
    fn chain(&mut self) -> Next<'_> {
        let effects = self.effects;
        Next::new(effects, self)
    }

    fn phase_begin(&mut self, phase: PhaseKind) {
        let timestamp = self.clock.now();
        self.summary.phase_begin(phase, timestamp);
        self.tracer.phase_begin(&PhaseBeginEvent {
            frame_index: self.frame_index,
            phase,
            timestamp,
        });
    }

    fn phase_end(&mut self, phase: PhaseKind) {
        let timestamp = self.clock.now();
        self.summary.phase_end(phase, timestamp);
        self.tracer.phase_end(&PhaseEndEvent {
            frame_index: self.frame_index,
            phase,
            timestamp,
        });
    }

    fn skip(&mut self, window: WindowId, reason: SkipReason) {
        self.tracer.window_skipped(&WindowSkippedEvent {
            frame_index: self.frame_index,
            window,
            reason,
        });
    }

    /// Runs window pre-paint for every stacked window, bottom to top, and
    /// returns those still enabled.
    fn pre_paint_windows(
        &mut self,
        strategy: PaintStrategy,
        mask: PaintMask,
        region: &Region,
    ) -> Vec<Phase2> {
        let windows = self.windows;
        let model = self.model;
        let time = self.time_diff;
        let mut phase2 = Vec::with_capacity(windows.len());
        let mut opaque_fullscreen = false;
        for window in windows {
            let id = window.id;
            self.scene
                .reset_painting_enabled(model, id, self.rendering_desktop);
            let disabled = self
                .scene
                .window(id)
                .map_or(PaintDisabled::empty(), SceneWindow::painting_disabled);
            let opacity = if window.opaque {
                PaintMask::WINDOW_OPAQUE
            } else {
                PaintMask::WINDOW_TRANSLUCENT
            };
            let mut data = WindowPrePaintData::new(mask | opacity, disabled);
            let repaints = self.scene.take_repaints(id);
            match strategy {
                PaintStrategy::Generic => data.paint = Region::infinite(),
                PaintStrategy::Simple => {
                    data.paint = region | &repaints;
                    data.clip = self.opaque_clip(window);
                    opaque_fullscreen =
                        window.opaque && window.state.contains(WindowState::FULLSCREEN);
                }
            }
            data.quads = self.scene.build_quads(id);

            self.chain().pre_paint_window(window, &mut data, time);
            debug_assert!(
                !data.quads.is_transformed(),
                "pre-paint calls are not allowed to transform quads"
            );

            let disabled = data.painting_disabled();
            self.scene.set_painting_disabled(id, disabled);
            if !disabled.is_empty() {
                self.skip(id, SkipReason::PaintingDisabled);
                continue;
            }
            phase2.push(Phase2 {
                window: *window,
                region: data.paint,
                clip: data.clip,
                mask: data.mask,
                quads: data.quads,
            });
        }
        if strategy == PaintStrategy::Simple {
            self.opaque_fullscreen = opaque_fullscreen;
        }
        phase2
    }

    /// Area of `window` known to be opaque, output coordinates.
    fn opaque_clip(&self, window: &EffectWindow) -> Region {
        let origin = window.frame.origin().to_vec2();
        let model = self.model;
        if window.opaque {
            let decoration_alpha = model.decoration(window.id).is_some_and(|d| d.has_alpha);
            if decoration_alpha {
                self.scene.client_shape(model, window.id).translated(origin)
            } else if window.state.contains(WindowState::SHADED) {
                Region::new()
            } else {
                self.scene.shape(window.id).translated(origin)
            }
        } else if window.has_alpha && window.opacity >= 1.0 {
            let client_offset = model.client_geometry(window.id).origin() - window.frame.origin();
            let opaque = model.opaque_region(window.id).translated(client_offset);
            let mut clip = self.scene.client_shape(model, window.id);
            clip &= &opaque;
            clip.translate(origin);
            clip
        } else {
            Region::new()
        }
    }

    /// Paints every window whole, back to front.
    fn paint_generic(&mut self, mask: PaintMask, region: &Region, phase2: Vec<Phase2>) {
        let display = Region::from_rect(self.display);
        if !mask.contains(PaintMask::SCREEN_BACKGROUND_FIRST) {
            self.backend.paint_background(&display);
        }
        for p in phase2 {
            self.paint_window(&p.window, p.mask, region.clone(), p.quads);
        }
        if self.recursion.is_empty() {
            self.full_repaint = true;
            self.damaged_region = display;
        }
    }

    /// Paints damaged areas only, culling what opaque windows cover.
    fn paint_simple(&mut self, mask: PaintMask, region: &Region, mut phase2: Vec<Phase2>) {
        let display = Region::from_rect(self.display);
        let mut dirty = region.clone();
        for p in &phase2 {
            dirty |= &p.region;
        }
        // Repainted only to bring an old back buffer up to date; not damage.
        let repaint_clip = &self.repaint_region - &dirty;
        dirty |= &self.repaint_region;

        let mut full = dirty == display;
        if !full {
            self.backend
                .extend_paint_region(&mut dirty, self.opaque_fullscreen);
            full = dirty == display;
        }

        let mut all_clips = Region::new();
        let mut upper_translucent = self.repaint_region.clone();
        for p in phase2.iter_mut().rev() {
            if full {
                p.region = display.clone();
            } else {
                p.region |= &upper_translucent;
            }
            p.region -= &all_clips;
            if !p.clip.is_empty() && !p.mask.contains(PaintMask::WINDOW_TRANSFORMED) {
                all_clips |= &p.clip;
                if !full {
                    upper_translucent |= &(&p.region - &p.clip);
                }
            } else if !full {
                upper_translucent |= &p.region;
            }
        }

        let mut painted = Region::new();
        if !mask.contains(PaintMask::SCREEN_BACKGROUND_FIRST) {
            painted = &dirty - &all_clips;
            if !painted.is_empty() {
                self.backend.paint_background(&painted);
            }
        }
        for p in phase2 {
            painted |= &p.region;
            self.paint_window(&p.window, p.mask, painted.clone(), p.quads);
        }

        if self.recursion.is_empty() {
            self.full_repaint = full;
            if full {
                self.painted_region = display.clone();
                self.damaged_region = display;
            } else {
                self.painted_region |= &painted;
                self.damaged_region = &painted - &repaint_clip;
            }
        }
    }

    /// Paints one window through the chain, then the previews it hosts.
    fn paint_window(
        &mut self,
        window: &EffectWindow,
        mask: PaintMask,
        mut region: Region,
        quads: WindowQuadList,
    ) {
        region &= self.display;
        if region.is_empty() {
            self.skip(window.id, SkipReason::Occluded);
            return;
        }
        if window
            .state
            .contains(WindowState::DELETED | WindowState::SKIPS_CLOSE_ANIMATION)
        {
            self.skip(window.id, SkipReason::SkipsCloseAnimation);
            return;
        }
        if self.recursion.contains(&window.id) {
            self.skip(window.id, SkipReason::Recursion);
            return;
        }
        let mut data = WindowPaintData::new(window.opacity, quads, self.screen_transform);
        self.chain().paint_window(window, mask, &region, &mut data);
        self.paint_window_thumbnails(window, &region, &data);
        self.paint_desktop_thumbnails(window);
    }

    fn paint_window_thumbnails(
        &mut self,
        host: &EffectWindow,
        region: &Region,
        host_data: &WindowPaintData,
    ) {
        let model = self.model;
        let origin = host.frame.origin().to_vec2();
        for item in model.window_thumbnails(host.id) {
            if !item.visible {
                continue;
            }
            let Some(target) = item.target else {
                continue;
            };
            if target == host.id || !self.scene.contains(target) {
                continue;
            }
            let thumb = EffectWindow::snapshot(model, self.scene, target);
            let Some(placement) =
                WindowThumbnailPlacement::fit(item.rect + origin, thumb.frame, thumb.expanded)
            else {
                continue;
            };
            let mut clip = region.clone();
            clip &= host.frame;
            if let Some(item_clip) = item.clip {
                clip &= item_clip + origin;
            }
            if clip.is_empty() {
                continue;
            }

            let quads = self.scene.build_quads(target);
            let mut data = WindowPaintData::new(host_data.opacity, quads, self.screen_transform);
            data.brightness = item.brightness * host_data.brightness;
            data.saturation = item.saturation * host_data.saturation;
            data.x_scale = placement.x_scale;
            data.y_scale = placement.y_scale;
            data.translation = placement.translation;
            let mut mask = PaintMask::WINDOW_TRANSFORMED | PaintMask::WINDOW_LANCZOS;
            mask |= if data.opacity >= 1.0 {
                PaintMask::WINDOW_OPAQUE
            } else {
                PaintMask::WINDOW_TRANSLUCENT
            };
            self.chain().draw_window(&thumb, mask, &clip, &mut data);
        }
    }

    fn paint_desktop_thumbnails(&mut self, host: &EffectWindow) {
        let model = self.model;
        let origin = host.frame.origin().to_vec2();
        for item in model.desktop_thumbnails(host.id) {
            if !item.visible {
                continue;
            }
            let item_rect = item.rect + origin;
            let Some(placement) = DesktopThumbnailPlacement::fit(self.display, item_rect) else {
                continue;
            };
            let mut clip = Region::from_rect(item_rect);
            clip &= host.frame;
            if let Some(item_clip) = item.clip {
                clip &= item_clip + origin;
            }
            let mut data = ScreenPaintData::new(self.output, self.display);
            data.transform = self.screen_transform * placement.transform;
            let mask = PaintMask::SCREEN_TRANSFORMED
                | PaintMask::WINDOW_TRANSFORMED
                | PaintMask::SCREEN_BACKGROUND_FIRST;

            self.recursion.push(host.id);
            let previous = self.rendering_desktop.replace(item.desktop);
            self.chain().paint_screen(mask, &clip, &mut data);
            self.rendering_desktop = previous;
            self.recursion.pop();
        }
    }
}

impl PaintHandler for Painter<'_, '_> {
    fn final_pre_paint_screen(&mut self, data: &mut ScreenPrePaintData, time: Duration) {
        _ = (data, time);
    }

    fn final_paint_screen(&mut self, mask: PaintMask, region: &Region, data: &mut ScreenPaintData) {
        let strategy = mask.strategy();
        let phase2 = match self.prepared.take() {
            Some((prepared_for, phase2)) if prepared_for == strategy => phase2,
            _ => self.pre_paint_windows(strategy, mask, region),
        };
        if self.recursion.is_empty() {
            self.strategy = strategy;
        }
        let previous = mem::replace(&mut self.screen_transform, data.transform);
        match strategy {
            PaintStrategy::Generic => self.paint_generic(mask, region, phase2),
            PaintStrategy::Simple => self.paint_simple(mask, region, phase2),
        }
        self.screen_transform = previous;
    }

    fn final_post_paint_screen(&mut self) {}

    fn final_pre_paint_window(
        &mut self,
        window: &EffectWindow,
        data: &mut WindowPrePaintData,
        time: Duration,
    ) {
        _ = (window, data, time);
    }

    fn final_paint_window(
        &mut self,
        window: &EffectWindow,
        mask: PaintMask,
        region: &Region,
        data: &mut WindowPaintData,
    ) {
        self.chain().draw_window(window, mask, region, data);
    }

    fn final_post_paint_window(&mut self, window: &EffectWindow) {
        _ = window;
    }

    fn final_draw_window(
        &mut self,
        window: &EffectWindow,
        mask: PaintMask,
        region: &Region,
        data: &mut WindowPaintData,
    ) {
        if self.screen_locked
            && !window
                .state
                .intersects(WindowState::LOCK_SCREEN | WindowState::INPUT_METHOD)
        {
            self.skip(window.id, SkipReason::ScreenLocked);
            return;
        }
        self.backend
            .perform_paint(self.scene, window, mask, region, data);
        self.painted_windows += 1;
    }

    fn add_repaint(&mut self, region: &Region) {
        self.screen_repaints |= region;
    }

    fn add_window_repaint(&mut self, window: WindowId, region: &Region) {
        self.scene.add_repaint(window, region);
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "window counts are far below u32::MAX"
)]
fn count(n: usize) -> u32 {
    n as u32
}

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::collections::BTreeMap;
    use alloc::rc::Rc;
    use alloc::vec;
    use core::cell::{Cell, RefCell};

    use kurbo::{Point, Size, Vec2};
    use stratum_core::model::{DesktopThumbnail, SurfaceId, WindowThumbnail};
    use stratum_core::pixmap::{
        PixelSource, PixelSourceRequest, PixmapError, PixmapFactory, ResourceKey,
    };
    use stratum_core::time::HostTime;

    use super::*;

    const DISPLAY: Rect = Rect::new(0.0, 0.0, 1000.0, 1000.0);

    struct Win {
        frame: Rect,
        opacity: f64,
        alpha: bool,
        state: WindowState,
        desktop: u32,
        thumbnails: Vec<WindowThumbnail>,
        desktops: Vec<DesktopThumbnail>,
    }

    #[derive(Default)]
    struct Model {
        windows: BTreeMap<WindowId, Win>,
        locked: bool,
    }

    impl Model {
        fn win(&self, window: WindowId) -> &Win {
            &self.windows[&window]
        }
    }

    impl WindowModel for Model {
        fn frame_geometry(&self, window: WindowId) -> Rect {
            self.win(window).frame
        }
        fn buffer_geometry(&self, window: WindowId) -> Rect {
            self.win(window).frame
        }
        fn client_geometry(&self, window: WindowId) -> Rect {
            self.win(window).frame
        }
        fn opacity(&self, window: WindowId) -> f64 {
            self.win(window).opacity
        }
        fn has_alpha(&self, window: WindowId) -> bool {
            self.win(window).alpha
        }
        fn state(&self, window: WindowId) -> WindowState {
            self.win(window).state
        }
        fn is_on_desktop(&self, window: WindowId, desktop: u32) -> bool {
            self.win(window).desktop == desktop
        }
        fn surface(&self, window: WindowId) -> SurfaceId {
            SurfaceId(window.0)
        }
        fn surface_size(&self, surface: SurfaceId) -> Size {
            self.win(WindowId(surface.0)).frame.size()
        }
        fn is_screen_locked(&self) -> bool {
            self.locked
        }
        fn window_thumbnails(&self, window: WindowId) -> &[WindowThumbnail] {
            &self.win(window).thumbnails
        }
        fn desktop_thumbnails(&self, window: WindowId) -> &[DesktopThumbnail] {
            &self.win(window).desktops
        }
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Draw {
        window: WindowId,
        mask: PaintMask,
        region: Region,
        scale: (f64, f64),
        screen_transformed: bool,
    }

    #[derive(Default)]
    struct Recorder {
        output: OutputId,
        draws: Vec<Draw>,
        backgrounds: Vec<Region>,
        frames: Vec<(Region, Region)>,
        presents: u32,
        repaint: Region,
        next_key: u64,
    }

    impl PixmapFactory for Recorder {
        fn create_pixel_source(
            &mut self,
            request: &PixelSourceRequest,
        ) -> Result<PixelSource, PixmapError> {
            self.next_key += 1;
            Ok(PixelSource {
                key: ResourceKey(self.next_key),
                kind: request.kind,
                size: request.size,
            })
        }
    }

    impl Backend for Recorder {
        fn output(&self) -> OutputId {
            self.output
        }
        fn buffer_age(&self) -> u32 {
            1
        }
        fn prepare_rendering_frame(&mut self) -> Region {
            self.repaint.clone()
        }
        fn paint_background(&mut self, region: &Region) {
            self.backgrounds.push(region.clone());
        }
        fn perform_paint(
            &mut self,
            scene: &SceneGraph,
            window: &EffectWindow,
            mask: PaintMask,
            region: &Region,
            data: &WindowPaintData,
        ) {
            assert!(scene.contains(window.id), "painting a window outside the scene");
            self.draws.push(Draw {
                window: window.id,
                mask,
                region: region.clone(),
                scale: (data.x_scale, data.y_scale),
                screen_transformed: data.screen_transform != Affine::IDENTITY,
            });
        }
        fn end_rendering_frame(&mut self, valid: &Region, update: &Region) {
            self.frames.push((valid.clone(), update.clone()));
        }
        fn present(&mut self) {
            self.presents += 1;
        }
    }

    struct World {
        model: Model,
        scene: SceneGraph,
        stacking: StackingOrder,
        effects: EffectChain,
        backend: Recorder,
        compositor: Compositor,
        now: u64,
    }

    impl World {
        fn new() -> Self {
            Self {
                model: Model::default(),
                scene: SceneGraph::new(),
                stacking: StackingOrder::new(),
                effects: EffectChain::new(),
                backend: Recorder::default(),
                compositor: Compositor::new(CompositorConfig::new(OutputId(0), DISPLAY)),
                now: 0,
            }
        }

        /// Adds an opaque window on desktop 1 at the top of the stack.
        fn add(&mut self, id: u32, frame: Rect) -> WindowId {
            let window = WindowId(id);
            self.model.windows.insert(
                window,
                Win {
                    frame,
                    opacity: 1.0,
                    alpha: false,
                    state: WindowState::NORMAL,
                    desktop: 1,
                    thumbnails: Vec::new(),
                    desktops: Vec::new(),
                },
            );
            self.scene.add_window(window);
            self.stacking.add(window);
            window
        }

        fn win_mut(&mut self, window: WindowId) -> &mut Win {
            self.model.windows.get_mut(&window).unwrap()
        }

        fn paint(&mut self, damage: Region) -> FrameOutput {
            self.backend.draws.clear();
            self.backend.backgrounds.clear();
            let now = HostTime(self.now);
            let clock = move || now;
            self.compositor.paint(
                &damage,
                FrameContext {
                    model: &self.model,
                    scene: &mut self.scene,
                    stacking: &self.stacking,
                    effects: &self.effects,
                    backend: &mut self.backend,
                    clock: &clock,
                },
            )
        }

        fn drawn(&self) -> Vec<WindowId> {
            self.backend.draws.iter().map(|d| d.window).collect()
        }
    }

    fn full() -> Region {
        Region::from_rect(DISPLAY)
    }

    fn region(x0: f64, y0: f64, x1: f64, y1: f64) -> Region {
        Region::from_rect(Rect::new(x0, y0, x1, y1))
    }

    // -- Effects used by the tests --

    struct Transform;

    impl Effect for Transform {
        fn name(&self) -> &str {
            "transform"
        }
        fn pre_paint_screen(&self, data: &mut ScreenPrePaintData, time: Duration, next: Next<'_>) {
            data.mask |= PaintMask::SCREEN_TRANSFORMED;
            next.pre_paint_screen(data, time);
        }
    }

    struct ShowMinimized;

    impl Effect for ShowMinimized {
        fn name(&self) -> &str {
            "show-minimized"
        }
        fn pre_paint_window(
            &self,
            window: &EffectWindow,
            data: &mut WindowPrePaintData,
            time: Duration,
            next: Next<'_>,
        ) {
            data.enable_painting(PaintDisabled::BY_MINIMIZE);
            next.pre_paint_window(window, data, time);
        }
    }

    struct Order(Rc<RefCell<Vec<WindowId>>>);

    impl Effect for Order {
        fn name(&self) -> &str {
            "order"
        }
        fn pre_paint_window(
            &self,
            window: &EffectWindow,
            data: &mut WindowPrePaintData,
            time: Duration,
            next: Next<'_>,
        ) {
            self.0.borrow_mut().push(window.id);
            next.pre_paint_window(window, data, time);
        }
    }

    struct RepaintOnce(Cell<bool>);

    impl Effect for RepaintOnce {
        fn name(&self) -> &str {
            "repaint-once"
        }
        fn post_paint_screen(&self, mut next: Next<'_>) {
            if !self.0.replace(true) {
                next.schedule_repaint(&region(0.0, 0.0, 10.0, 10.0));
            }
            next.post_paint_screen();
        }
    }

    /// Keeps closed windows enabled so they reach the close-animation check.
    struct KeepDeleted;

    impl Effect for KeepDeleted {
        fn name(&self) -> &str {
            "keep-deleted"
        }
        fn pre_paint_window(
            &self,
            window: &EffectWindow,
            data: &mut WindowPrePaintData,
            time: Duration,
            next: Next<'_>,
        ) {
            data.enable_painting(PaintDisabled::BY_DELETE);
            next.pre_paint_window(window, data, time);
        }
    }

    struct MoveQuads;

    impl Effect for MoveQuads {
        fn name(&self) -> &str {
            "move-quads"
        }
        fn pre_paint_window(
            &self,
            window: &EffectWindow,
            data: &mut WindowPrePaintData,
            time: Duration,
            next: Next<'_>,
        ) {
            data.quads.translate(Vec2::new(5.0, 0.0));
            next.pre_paint_window(window, data, time);
        }
    }

    // -- Tests --

    #[test]
    fn fully_covered_window_is_culled() {
        let mut world = World::new();
        let below = world.add(0, Rect::new(0.0, 0.0, 100.0, 100.0));
        let above = world.add(1, Rect::new(0.0, 0.0, 200.0, 200.0));
        let damage = region(50.0, 50.0, 80.0, 80.0);

        let out = world.paint(damage.clone());

        assert_eq!(out.strategy, PaintStrategy::Simple);
        assert!(out.mask.contains(PaintMask::SCREEN_REGION));
        assert_eq!(world.drawn(), vec![above]);
        assert!(!world.drawn().contains(&below));
        assert_eq!(world.backend.draws[0].region, damage);
        assert_eq!(out.update_region, damage);
        assert!(world.backend.backgrounds.is_empty());
    }

    #[test]
    fn full_damage_paints_bottom_to_top() {
        let mut world = World::new();
        let below = world.add(0, Rect::new(0.0, 0.0, 500.0, 500.0));
        let above = world.add(1, Rect::new(100.0, 100.0, 200.0, 200.0));

        let out = world.paint(full());

        assert!(out.full_repaint);
        assert_eq!(out.mask, PaintMask::empty());
        assert_eq!(world.drawn(), vec![below, above]);
        let below_draw = &world.backend.draws[0].region;
        assert!(!below_draw.contains_point(Point::new(150.0, 150.0)));
        assert!(below_draw.contains_point(Point::new(50.0, 50.0)));
        assert_eq!(world.backend.draws[1].region, full());
        assert_eq!(out.update_region, full());
        assert_eq!(out.valid_region, full());
        assert_eq!(world.backend.presents, 1);
    }

    #[test]
    fn translucent_window_does_not_occlude() {
        let mut world = World::new();
        let below = world.add(0, Rect::new(0.0, 0.0, 100.0, 100.0));
        let above = world.add(1, Rect::new(0.0, 0.0, 200.0, 200.0));
        world.win_mut(above).opacity = 0.5;

        world.paint(region(50.0, 50.0, 80.0, 80.0));

        assert_eq!(world.drawn(), vec![below, above]);
        assert!(world.backend.draws[1].mask.contains(PaintMask::WINDOW_TRANSLUCENT));
    }

    #[test]
    fn transformed_screen_paints_everything() {
        let mut world = World::new();
        let below = world.add(0, Rect::new(0.0, 0.0, 100.0, 100.0));
        let above = world.add(1, Rect::new(0.0, 0.0, 200.0, 200.0));
        world.effects.push(Box::new(Transform));

        let out = world.paint(region(50.0, 50.0, 80.0, 80.0));

        assert_eq!(out.strategy, PaintStrategy::Generic);
        assert!(!out.mask.contains(PaintMask::SCREEN_REGION));
        assert_eq!(world.drawn(), vec![below, above]);
        assert_eq!(out.update_region, full());
        assert_eq!(world.backend.backgrounds, vec![full()]);
    }

    #[test]
    fn minimized_window_is_skipped() {
        let mut world = World::new();
        let shown = world.add(0, Rect::new(0.0, 0.0, 100.0, 100.0));
        let minimized = world.add(1, Rect::new(200.0, 0.0, 300.0, 100.0));
        world.win_mut(minimized).state |= WindowState::MINIMIZED;

        world.paint(full());

        assert_eq!(world.drawn(), vec![shown]);
        assert!(!world.scene.is_painting_enabled(minimized));
    }

    #[test]
    fn effect_can_reenable_painting() {
        let mut world = World::new();
        let minimized = world.add(0, Rect::new(0.0, 0.0, 100.0, 100.0));
        world.win_mut(minimized).state |= WindowState::MINIMIZED;
        world.effects.push(Box::new(ShowMinimized));

        world.paint(full());

        assert_eq!(world.drawn(), vec![minimized]);
    }

    #[test]
    fn closed_window_without_animation_is_skipped() {
        let mut world = World::new();
        let closed = world.add(0, Rect::new(0.0, 0.0, 100.0, 100.0));
        world.win_mut(closed).state |= WindowState::DELETED | WindowState::SKIPS_CLOSE_ANIMATION;
        world.effects.push(Box::new(KeepDeleted));

        let out = world.paint(full());

        assert!(world.drawn().is_empty());
        assert_eq!(out.painted_windows, 0);
    }

    #[test]
    fn locked_screen_draws_only_the_locker() {
        let mut world = World::new();
        world.add(0, Rect::new(0.0, 0.0, 100.0, 100.0));
        let locker = world.add(1, Rect::new(200.0, 0.0, 300.0, 100.0));
        world.win_mut(locker).state |= WindowState::LOCK_SCREEN;
        world.model.locked = true;

        world.paint(full());

        assert_eq!(world.drawn(), vec![locker]);
    }

    #[test]
    fn window_preview_draws_target_scaled() {
        let mut world = World::new();
        let target = world.add(0, Rect::new(500.0, 500.0, 700.0, 600.0));
        let host = world.add(1, Rect::new(0.0, 0.0, 400.0, 400.0));
        world.win_mut(host).thumbnails.push(WindowThumbnail {
            target: Some(target),
            rect: Rect::new(0.0, 0.0, 100.0, 100.0),
            clip: None,
            visible: true,
            brightness: 1.0,
            saturation: 1.0,
        });

        world.paint(full());

        assert_eq!(world.drawn(), vec![target, host, target]);
        let preview = &world.backend.draws[2];
        let expected =
            PaintMask::WINDOW_TRANSFORMED | PaintMask::WINDOW_LANCZOS | PaintMask::WINDOW_OPAQUE;
        assert!(preview.mask.contains(expected));
        assert_eq!(preview.scale, (0.5, 0.5));
        assert_eq!(preview.region, region(0.0, 0.0, 400.0, 400.0));
    }

    #[test]
    fn hidden_or_dangling_previews_are_ignored() {
        let mut world = World::new();
        let host = world.add(0, Rect::new(0.0, 0.0, 400.0, 400.0));
        let item = WindowThumbnail {
            target: None,
            rect: Rect::new(0.0, 0.0, 100.0, 100.0),
            clip: None,
            visible: true,
            brightness: 1.0,
            saturation: 1.0,
        };
        world.win_mut(host).thumbnails.push(item);
        world.win_mut(host).thumbnails.push(WindowThumbnail {
            target: Some(host),
            visible: false,
            ..item
        });

        world.paint(full());

        assert_eq!(world.drawn(), vec![host]);
    }

    #[test]
    fn window_never_previews_itself() {
        let mut world = World::new();
        let host = world.add(0, Rect::new(0.0, 0.0, 400.0, 400.0));
        world.win_mut(host).thumbnails.push(WindowThumbnail {
            target: Some(host),
            rect: Rect::new(0.0, 0.0, 100.0, 100.0),
            clip: None,
            visible: true,
            brightness: 1.0,
            saturation: 1.0,
        });

        world.paint(full());

        assert_eq!(world.drawn(), vec![host]);
    }

    #[test]
    fn desktop_preview_never_contains_its_host() {
        let mut world = World::new();
        let other = world.add(0, Rect::new(500.0, 500.0, 600.0, 600.0));
        let host = world.add(1, Rect::new(0.0, 0.0, 400.0, 400.0));
        world.win_mut(host).desktops.push(DesktopThumbnail {
            desktop: 1,
            rect: Rect::new(0.0, 0.0, 200.0, 200.0),
            clip: None,
            visible: true,
        });

        let out = world.paint(full());

        assert_eq!(world.drawn(), vec![other, host, other]);
        let nested = &world.backend.draws[2];
        assert!(nested.screen_transformed);
        assert!(nested.mask.contains(PaintMask::WINDOW_TRANSFORMED));
        assert_eq!(nested.region, region(0.0, 0.0, 200.0, 200.0));
        assert_eq!(out.strategy, PaintStrategy::Simple);
        assert_eq!(out.update_region, full());
    }

    #[test]
    fn desktop_preview_shows_the_previewed_desktop() {
        let mut world = World::new();
        let here = world.add(0, Rect::new(500.0, 500.0, 600.0, 600.0));
        let elsewhere = world.add(1, Rect::new(500.0, 0.0, 600.0, 100.0));
        world.win_mut(elsewhere).desktop = 2;
        world.win_mut(elsewhere).state -= WindowState::ON_CURRENT_DESKTOP;
        let host = world.add(2, Rect::new(0.0, 0.0, 400.0, 400.0));
        world.win_mut(host).desktops.push(DesktopThumbnail {
            desktop: 2,
            rect: Rect::new(0.0, 0.0, 200.0, 200.0),
            clip: None,
            visible: true,
        });

        world.paint(full());

        assert_eq!(world.drawn(), vec![here, host, elsewhere]);
        assert!(world.backend.draws[2].screen_transformed);
    }

    #[test]
    fn effects_see_windows_bottom_to_top() {
        let mut world = World::new();
        let a = world.add(0, Rect::new(0.0, 0.0, 10.0, 10.0));
        let b = world.add(1, Rect::new(0.0, 0.0, 10.0, 10.0));
        let c = world.add(2, Rect::new(0.0, 0.0, 10.0, 10.0));
        world.stacking.restack(c, a);
        let seen = Rc::new(RefCell::new(Vec::new()));
        world.effects.push(Box::new(Order(Rc::clone(&seen))));

        world.paint(full());

        assert_eq!(seen.borrow().as_slice(), &[b, c, a]);
        assert_eq!(world.drawn(), vec![b, c, a]);
    }

    #[test]
    fn post_paint_repaint_carries_into_next_frame() {
        let mut world = World::new();
        world.add(0, Rect::new(0.0, 0.0, 100.0, 100.0));
        world.effects.push(Box::new(RepaintOnce(Cell::new(false))));

        let first = world.paint(full());
        assert!(first.repaint_requested);
        assert_eq!(
            world.compositor.pending_repaints(),
            &region(0.0, 0.0, 10.0, 10.0)
        );

        let second = world.paint(Region::new());
        assert!(!second.repaint_requested);
        assert_eq!(second.update_region, region(0.0, 0.0, 10.0, 10.0));
        assert_eq!(world.backend.draws[0].region, region(0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn buffer_age_repaint_is_valid_but_not_damage() {
        let mut world = World::new();
        world.add(0, Rect::new(0.0, 0.0, 100.0, 100.0));
        world.backend.repaint = region(500.0, 500.0, 600.0, 600.0);
        let damage = region(0.0, 0.0, 10.0, 10.0);

        let out = world.paint(damage.clone());

        assert_eq!(out.update_region, damage);
        let mut valid = damage.clone();
        valid |= &world.backend.repaint;
        assert_eq!(out.valid_region, valid);
        assert_eq!(world.backend.backgrounds, vec![world.backend.repaint.clone()]);
        assert_eq!(world.backend.frames.last(), Some(&(valid, damage)));
    }

    #[test]
    fn window_repaints_widen_the_painted_area() {
        let mut world = World::new();
        let window = world.add(0, Rect::new(0.0, 0.0, 100.0, 100.0));
        world.paint(full());

        world
            .scene
            .add_repaint(window, &region(20.0, 20.0, 30.0, 30.0));
        let out = world.paint(Region::new());

        assert_eq!(out.update_region, region(20.0, 20.0, 30.0, 30.0));
        assert!(world.scene.window(window).unwrap().repaints().is_empty());
    }

    #[test]
    #[should_panic(expected = "pre-paint calls are not allowed to transform quads")]
    fn pre_paint_must_not_transform_quads() {
        let mut world = World::new();
        world.add(0, Rect::new(0.0, 0.0, 100.0, 100.0));
        world.effects.push(Box::new(MoveQuads));
        world.paint(full());
    }

    #[test]
    fn first_frame_after_idle_reports_one_millisecond() {
        let mut world = World::new();
        world.add(0, Rect::new(0.0, 0.0, 100.0, 100.0));

        let first = world.paint(full());
        assert_eq!(first.time_diff, Duration(1_000_000));

        world.now = 16_000_000;
        let second = world.paint(full());
        assert_eq!(second.time_diff, Duration(16_000_000));
        assert_eq!(second.frame_index, 1);

        world.compositor.idle();
        world.now = 5_000_000_000;
        let third = world.paint(full());
        assert_eq!(third.time_diff, Duration(1_000_000));
    }

    #[test]
    fn set_display_forces_full_repaint() {
        let mut world = World::new();
        world.add(0, Rect::new(0.0, 0.0, 100.0, 100.0));
        world.paint(full());

        world.compositor.set_display(DISPLAY);
        let out = world.paint(Region::new());

        assert!(out.full_repaint);
        assert_eq!(out.update_region, full());
    }

    #[test]
    #[should_panic(expected = "backend renders a different output")]
    fn backend_must_render_the_configured_output() {
        let mut world = World::new();
        world.backend.output = OutputId(3);
        world.paint(full());
    }

    #[cfg(feature = "trace")]
    #[test]
    fn skipped_windows_are_traced() {
        use stratum_core::trace::TraceSink;

        #[derive(Default)]
        struct Skips(Vec<(WindowId, SkipReason)>);
        impl TraceSink for Skips {
            fn on_window_skipped(&mut self, e: &WindowSkippedEvent) {
                self.0.push((e.window, e.reason));
            }
        }

        let mut world = World::new();
        let below = world.add(0, Rect::new(0.0, 0.0, 100.0, 100.0));
        world.add(1, Rect::new(0.0, 0.0, 200.0, 200.0));
        let mut sink = Skips::default();
        let now = HostTime(0);
        let clock = move || now;
        world.compositor.paint_traced(
            &region(10.0, 10.0, 20.0, 20.0),
            FrameContext {
                model: &world.model,
                scene: &mut world.scene,
                stacking: &world.stacking,
                effects: &world.effects,
                backend: &mut world.backend,
                clock: &clock,
            },
            &mut Tracer::new(&mut sink),
        );

        assert_eq!(sink.0, vec![(below, SkipReason::Occluded)]);
    }
}
