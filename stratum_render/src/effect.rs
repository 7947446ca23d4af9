// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Effects and the effect chain.
//!
//! Every paint hook is delivered to the active effects in chain order. An
//! effect receives a [`Next`] cursor and forwards the call by consuming it;
//! the last cursor dispatches to the compositor's own implementation. An
//! effect that does not forward suppresses the call for everything after it.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use kurbo::Rect;
use stratum_core::model::{WindowId, WindowModel, WindowState};
use stratum_core::region::Region;
use stratum_core::scene::SceneGraph;
use stratum_core::time::Duration;

use crate::data::{ScreenPaintData, ScreenPrePaintData, WindowPaintData, WindowPrePaintData};
use crate::mask::PaintMask;

/// A window as seen by effects: a snapshot taken when the frame starts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EffectWindow {
    /// Window id.
    pub id: WindowId,
    /// Frame geometry, output coordinates.
    pub frame: Rect,
    /// Frame geometry extended by the shadow.
    pub expanded: Rect,
    /// Window opacity.
    pub opacity: f64,
    /// State bits.
    pub state: WindowState,
    /// Whether the window content has an alpha channel.
    pub has_alpha: bool,
    /// Whether the window is fully opaque.
    pub opaque: bool,
}

impl EffectWindow {
    pub(crate) fn snapshot<M: WindowModel + ?Sized>(
        model: &M,
        scene: &SceneGraph,
        id: WindowId,
    ) -> Self {
        Self {
            id,
            frame: model.frame_geometry(id),
            expanded: scene.expanded_geometry(id),
            opacity: model.opacity(id),
            state: model.state(id),
            has_alpha: model.has_alpha(id),
            opaque: scene.is_opaque(model, id),
        }
    }
}

/// A paint-time effect.
///
/// All hooks forward to the next effect by default, so an effect only
/// overrides what it changes.
pub trait Effect {
    /// Name used for lookup and diagnostics.
    fn name(&self) -> &str;

    /// Whether the effect takes part in the current frame.
    fn is_active(&self) -> bool {
        true
    }

    /// Negotiates the screen paint mask and region.
    fn pre_paint_screen(&self, data: &mut ScreenPrePaintData, time: Duration, next: Next<'_>) {
        next.pre_paint_screen(data, time);
    }

    /// Paints the screen.
    fn paint_screen(
        &self,
        mask: PaintMask,
        region: &Region,
        data: &mut ScreenPaintData,
        next: Next<'_>,
    ) {
        next.paint_screen(mask, region, data);
    }

    /// Called once painting of the frame is done.
    fn post_paint_screen(&self, next: Next<'_>) {
        next.post_paint_screen();
    }

    /// Negotiates how a window is painted.
    fn pre_paint_window(
        &self,
        window: &EffectWindow,
        data: &mut WindowPrePaintData,
        time: Duration,
        next: Next<'_>,
    ) {
        next.pre_paint_window(window, data, time);
    }

    /// Paints a window. Previews it hosts are drawn after this hook returns.
    fn paint_window(
        &self,
        window: &EffectWindow,
        mask: PaintMask,
        region: &Region,
        data: &mut WindowPaintData,
        next: Next<'_>,
    ) {
        next.paint_window(window, mask, region, data);
    }

    /// Called for every stacked window once painting of the frame is done.
    fn post_paint_window(&self, window: &EffectWindow, next: Next<'_>) {
        next.post_paint_window(window);
    }

    /// Draws a window's contents. Also used for window previews.
    fn draw_window(
        &self,
        window: &EffectWindow,
        mask: PaintMask,
        region: &Region,
        data: &mut WindowPaintData,
        next: Next<'_>,
    ) {
        next.draw_window(window, mask, region, data);
    }
}

/// The compositor's own implementation of each hook, reached once every
/// effect has forwarded.
pub(crate) trait PaintHandler {
    fn final_pre_paint_screen(&mut self, data: &mut ScreenPrePaintData, time: Duration);
    fn final_paint_screen(&mut self, mask: PaintMask, region: &Region, data: &mut ScreenPaintData);
    fn final_post_paint_screen(&mut self);
    fn final_pre_paint_window(
        &mut self,
        window: &EffectWindow,
        data: &mut WindowPrePaintData,
        time: Duration,
    );
    fn final_paint_window(
        &mut self,
        window: &EffectWindow,
        mask: PaintMask,
        region: &Region,
        data: &mut WindowPaintData,
    );
    fn final_post_paint_window(&mut self, window: &EffectWindow);
    fn final_draw_window(
        &mut self,
        window: &EffectWindow,
        mask: PaintMask,
        region: &Region,
        data: &mut WindowPaintData,
    );
    fn add_repaint(&mut self, region: &Region);
    fn add_window_repaint(&mut self, window: WindowId, region: &Region);
}

/// Cursor to the rest of the effect chain.
///
/// Consuming it forwards the current hook. Repaints for the next frame can
/// be scheduled before forwarding.
pub struct Next<'a> {
    effects: &'a [&'a dyn Effect],
    handler: &'a mut dyn PaintHandler,
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.effects.len())
            .finish_non_exhaustive()
    }
}

impl<'a> Next<'a> {
    pub(crate) fn new(effects: &'a [&'a dyn Effect], handler: &'a mut dyn PaintHandler) -> Self {
        Self { effects, handler }
    }

    /// Number of effects still ahead in the chain.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.effects.len()
    }

    /// Schedules `region` of the screen for repaint.
    pub fn schedule_repaint(&mut self, region: &Region) {
        self.handler.add_repaint(region);
    }

    /// Schedules `region` of `window` for repaint.
    pub fn schedule_window_repaint(&mut self, window: WindowId, region: &Region) {
        self.handler.add_window_repaint(window, region);
    }

    /// Forwards [`Effect::pre_paint_screen`].
    pub fn pre_paint_screen(self, data: &mut ScreenPrePaintData, time: Duration) {
        let Self { effects, handler } = self;
        match effects.split_first() {
            Some((effect, rest)) => effect.pre_paint_screen(data, time, Next::new(rest, handler)),
            None => handler.final_pre_paint_screen(data, time),
        }
    }

    /// Forwards [`Effect::paint_screen`].
    pub fn paint_screen(self, mask: PaintMask, region: &Region, data: &mut ScreenPaintData) {
        let Self { effects, handler } = self;
        match effects.split_first() {
            Some((effect, rest)) => {
                effect.paint_screen(mask, region, data, Next::new(rest, handler));
            }
            None => handler.final_paint_screen(mask, region, data),
        }
    }

    /// Forwards [`Effect::post_paint_screen`].
    pub fn post_paint_screen(self) {
        let Self { effects, handler } = self;
        match effects.split_first() {
            Some((effect, rest)) => effect.post_paint_screen(Next::new(rest, handler)),
            None => handler.final_post_paint_screen(),
        }
    }

    /// Forwards [`Effect::pre_paint_window`].
    pub fn pre_paint_window(
        self,
        window: &EffectWindow,
        data: &mut WindowPrePaintData,
        time: Duration,
    ) {
        let Self { effects, handler } = self;
        match effects.split_first() {
            Some((effect, rest)) => {
                effect.pre_paint_window(window, data, time, Next::new(rest, handler));
            }
            None => handler.final_pre_paint_window(window, data, time),
        }
    }

    /// Forwards [`Effect::paint_window`].
    pub fn paint_window(
        self,
        window: &EffectWindow,
        mask: PaintMask,
        region: &Region,
        data: &mut WindowPaintData,
    ) {
        let Self { effects, handler } = self;
        match effects.split_first() {
            Some((effect, rest)) => {
                effect.paint_window(window, mask, region, data, Next::new(rest, handler));
            }
            None => handler.final_paint_window(window, mask, region, data),
        }
    }

    /// Forwards [`Effect::post_paint_window`].
    pub fn post_paint_window(self, window: &EffectWindow) {
        let Self { effects, handler } = self;
        match effects.split_first() {
            Some((effect, rest)) => effect.post_paint_window(window, Next::new(rest, handler)),
            None => handler.final_post_paint_window(window),
        }
    }

    /// Forwards [`Effect::draw_window`].
    pub fn draw_window(
        self,
        window: &EffectWindow,
        mask: PaintMask,
        region: &Region,
        data: &mut WindowPaintData,
    ) {
        let Self { effects, handler } = self;
        match effects.split_first() {
            Some((effect, rest)) => {
                effect.draw_window(window, mask, region, data, Next::new(rest, handler));
            }
            None => handler.final_draw_window(window, mask, region, data),
        }
    }
}

/// An ordered list of effects.
///
/// Effects earlier in the list see each hook first.
#[derive(Default)]
pub struct EffectChain {
    effects: Vec<Box<dyn Effect>>,
}

impl fmt::Debug for EffectChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.effects.iter().map(|e| e.name()))
            .finish()
    }
}

impl EffectChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an effect at the end of the chain.
    pub fn push(&mut self, effect: Box<dyn Effect>) {
        self.effects.push(effect);
    }

    /// Inserts an effect at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert(&mut self, index: usize, effect: Box<dyn Effect>) {
        self.effects.insert(index, effect);
    }

    /// Removes the first effect named `name`.
    pub fn remove(&mut self, name: &str) -> Option<Box<dyn Effect>> {
        let index = self.effects.iter().position(|e| e.name() == name)?;
        Some(self.effects.remove(index))
    }

    /// Returns the first effect named `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn Effect> {
        self.effects
            .iter()
            .find(|e| e.name() == name)
            .map(|e| &**e)
    }

    /// Number of effects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    /// Returns `true` if the chain has no effects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Effect names in chain order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.effects.iter().map(|e| e.name())
    }

    /// The effects active for the current frame, in chain order.
    pub(crate) fn active(&self) -> Vec<&dyn Effect> {
        self.effects
            .iter()
            .map(|e| &**e)
            .filter(|e| e.is_active())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::vec;
    use core::cell::RefCell;

    use super::*;

    #[derive(Default)]
    struct Log {
        calls: Vec<String>,
        repaints: Region,
    }

    impl PaintHandler for Log {
        fn final_pre_paint_screen(&mut self, data: &mut ScreenPrePaintData, _time: Duration) {
            self.calls.push(alloc::format!("final pre {:?}", data.mask));
        }
        fn final_paint_screen(&mut self, _: PaintMask, _: &Region, _: &mut ScreenPaintData) {
            self.calls.push("final paint".into());
        }
        fn final_post_paint_screen(&mut self) {
            self.calls.push("final post".into());
        }
        fn final_pre_paint_window(
            &mut self,
            _: &EffectWindow,
            _: &mut WindowPrePaintData,
            _: Duration,
        ) {
        }
        fn final_paint_window(
            &mut self,
            _: &EffectWindow,
            _: PaintMask,
            _: &Region,
            _: &mut WindowPaintData,
        ) {
        }
        fn final_post_paint_window(&mut self, _: &EffectWindow) {}
        fn final_draw_window(
            &mut self,
            _: &EffectWindow,
            _: PaintMask,
            _: &Region,
            _: &mut WindowPaintData,
        ) {
        }
        fn add_repaint(&mut self, region: &Region) {
            self.repaints |= region;
        }
        fn add_window_repaint(&mut self, _: WindowId, _: &Region) {}
    }

    struct Tag {
        name: &'static str,
        flag: PaintMask,
        seen: RefCell<Vec<PaintMask>>,
    }

    impl Tag {
        fn new(name: &'static str, flag: PaintMask) -> Self {
            Self {
                name,
                flag,
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl Effect for Tag {
        fn name(&self) -> &str {
            self.name
        }

        fn pre_paint_screen(&self, data: &mut ScreenPrePaintData, time: Duration, next: Next<'_>) {
            self.seen.borrow_mut().push(data.mask);
            data.mask |= self.flag;
            next.pre_paint_screen(data, time);
        }
    }

    struct Swallow;

    impl Effect for Swallow {
        fn name(&self) -> &str {
            "swallow"
        }

        fn paint_screen(&self, _: PaintMask, _: &Region, _: &mut ScreenPaintData, mut next: Next<'_>) {
            next.schedule_repaint(&Region::from_rect(Rect::new(0.0, 0.0, 5.0, 5.0)));
        }
    }

    struct Inactive;

    impl Effect for Inactive {
        fn name(&self) -> &str {
            "inactive"
        }

        fn is_active(&self) -> bool {
            false
        }
    }

    #[test]
    fn hooks_run_in_chain_order_then_final() {
        let a = Tag::new("a", PaintMask::SCREEN_TRANSFORMED);
        let b = Tag::new("b", PaintMask::SCREEN_BACKGROUND_FIRST);
        let effects: Vec<&dyn Effect> = vec![&a, &b];
        let mut log = Log::default();
        let mut data = ScreenPrePaintData::default();
        Next::new(&effects, &mut log).pre_paint_screen(&mut data, Duration::ZERO);

        assert_eq!(a.seen.borrow().as_slice(), &[PaintMask::empty()]);
        assert_eq!(b.seen.borrow().as_slice(), &[PaintMask::SCREEN_TRANSFORMED]);
        assert_eq!(
            data.mask,
            PaintMask::SCREEN_TRANSFORMED | PaintMask::SCREEN_BACKGROUND_FIRST
        );
        assert_eq!(log.calls.len(), 1);
    }

    #[test]
    fn effect_that_does_not_forward_suppresses_the_rest() {
        let swallow = Swallow;
        let effects: Vec<&dyn Effect> = vec![&swallow];
        let mut log = Log::default();
        let mut data = ScreenPaintData::new(
            stratum_core::model::OutputId(0),
            Rect::new(0.0, 0.0, 100.0, 100.0),
        );
        Next::new(&effects, &mut log).paint_screen(PaintMask::empty(), &Region::new(), &mut data);

        assert!(log.calls.is_empty());
        assert_eq!(
            log.repaints,
            Region::from_rect(Rect::new(0.0, 0.0, 5.0, 5.0))
        );
    }

    #[test]
    fn empty_chain_reaches_final_directly() {
        let mut log = Log::default();
        Next::new(&[], &mut log).post_paint_screen();
        assert_eq!(log.calls, vec![String::from("final post")]);
    }

    #[test]
    fn chain_lookup_and_activity() {
        let mut chain = EffectChain::new();
        chain.push(Box::new(Swallow));
        chain.insert(0, Box::new(Inactive));
        assert_eq!(chain.names().collect::<Vec<_>>(), vec!["inactive", "swallow"]);
        assert_eq!(chain.active().len(), 1);
        assert!(chain.get("swallow").is_some());
        assert!(chain.remove("inactive").is_some());
        assert!(chain.remove("inactive").is_none());
        assert_eq!(chain.len(), 1);
    }
}
