//! Retained store of visual proxies.
//!
//! The gameplay core never draws anything: it keeps one [`VisualProxy`] per
//! sprite up to date (position, rotation, visibility, animation coefficients)
//! and a renderer consumes the store each frame. Fade/blink effects are a
//! small per-proxy animation-state record plus a pure time function — no
//! sprite-class hierarchy.

use std::collections::HashMap;

use glam::Vec2;

use crate::tuning::{
    BLINK_FREQ, EXPLOSION_DELAY, FADEIN_DELAY, FADEIN_OVERSHOOT, FADEOUT_DELAY, FADE_SIZE,
};

/// Handle to a visual proxy owned by a Fruit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpriteId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Normal,
    Hidden,
}

/// Animation timers for one proxy. Fade-in and fade-out are mutually
/// exclusive; blink composes multiplicatively with either.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnimState {
    pub fade_in_start: Option<f64>,
    pub fade_out_start: Option<f64>,
    pub blink_start: Option<f64>,
}

impl AnimState {
    pub fn start_fade_in(&mut self, now: f64) {
        if self.fade_in_start.is_none() {
            self.fade_in_start = Some(now);
            self.fade_out_start = None;
        }
    }

    pub fn start_fade_out(&mut self, now: f64) {
        if self.fade_out_start.is_none() {
            self.fade_in_start = None;
            self.fade_out_start = Some(now);
        }
    }

    pub fn set_blink(&mut self, active: bool, now: f64) {
        match (active, self.blink_start) {
            (true, None) => self.blink_start = Some(now),
            (false, _) => self.blink_start = None,
            _ => {}
        }
    }

    /// Drop the fade-in once it has run its course. The fade-out timer is
    /// deliberately kept after completion, otherwise the sprite would pop
    /// back to full size.
    pub fn settle(&mut self, now: f64) {
        if let Some(t0) = self.fade_in_start {
            let t = (now - t0) as f32;
            let a = t * (1.0 - FADE_SIZE) / FADEIN_DELAY as f32 + FADE_SIZE;
            if a >= FADEIN_OVERSHOOT {
                self.fade_in_start = None;
            }
        }
    }
}

/// Pure animation math: `(size_coef, opacity_coef)` for a proxy at `now`.
pub fn coefficients(state: &AnimState, now: f64) -> (f32, f32) {
    let mut size = 1.0_f32;
    let mut opacity = 1.0_f32;

    if let Some(t0) = state.fade_in_start {
        debug_assert!(state.fade_out_start.is_none());
        let t = (now - t0) as f32;
        let a = t * (1.0 - FADE_SIZE) / FADEIN_DELAY as f32 + FADE_SIZE;
        size = a.min(FADEIN_OVERSHOOT);
        opacity = a.min(1.0);
    }

    if let Some(t0) = state.fade_out_start {
        debug_assert!(state.fade_in_start.is_none());
        let t = (now - t0) as f32;
        let a = (FADEOUT_DELAY as f32 - t) / FADEOUT_DELAY as f32;
        size = a.max(0.2);
        opacity = a.max(0.0);
    }

    if let Some(t0) = state.blink_start {
        let dt = now - t0;
        if dt > 0.0 {
            opacity *= 0.5 + (((BLINK_FREQ * dt) % 1.0) - 0.5).abs() as f32;
        }
    }

    (size, opacity)
}

/// One renderable proxy: a fruit image or an explosion sequence.
#[derive(Debug, Clone)]
pub struct VisualProxy {
    /// Asset name, e.g. `cherry.png`.
    pub image: String,
    /// Base radius the image is scaled to.
    pub radius: f32,
    pub pos: Vec2,
    pub rotation_deg: f32,
    pub visibility: Visibility,
    pub anim: AnimState,
    /// Output of the animation math, refreshed by [`Stage::update`].
    pub size_coef: f32,
    pub opacity_coef: f32,
    /// Set for explosion proxies: when the one-shot sequence started.
    pub explosion_started: Option<f64>,
}

impl VisualProxy {
    fn new(image: String, radius: f32) -> Self {
        Self {
            image,
            radius,
            pos: Vec2::ZERO,
            rotation_deg: 0.0,
            visibility: Visibility::Normal,
            anim: AnimState::default(),
            size_coef: 1.0,
            opacity_coef: 1.0,
            explosion_started: None,
        }
    }
}

/// All live visual proxies, keyed by [`SpriteId`].
#[derive(Debug, Default)]
pub struct Stage {
    proxies: HashMap<SpriteId, VisualProxy>,
    next_id: u32,
}

impl Stage {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, proxy: VisualProxy) -> SpriteId {
        let id = SpriteId(self.next_id);
        self.next_id += 1;
        self.proxies.insert(id, proxy);
        id
    }

    /// Create a fruit proxy bound to a kind's image by name.
    pub fn create_fruit_sprite(&mut self, name: &str, radius: f32) -> SpriteId {
        self.insert(VisualProxy::new(format!("{}.png", name), radius))
    }

    /// Create an explosion proxy anchored at `pos`, playing a one-shot
    /// sequence starting at `now`.
    pub fn create_explosion_sprite(&mut self, radius: f32, pos: Vec2, now: f64) -> SpriteId {
        let mut proxy = VisualProxy::new("explosion.png".to_string(), radius);
        proxy.pos = pos;
        proxy.explosion_started = Some(now);
        self.insert(proxy)
    }

    pub fn destroy(&mut self, id: SpriteId) {
        self.proxies.remove(&id);
    }

    pub fn set_visibility(&mut self, id: SpriteId, visibility: Visibility) {
        if let Some(proxy) = self.proxies.get_mut(&id) {
            proxy.visibility = visibility;
        }
    }

    /// Push a new transform into a proxy and refresh its animation outputs.
    pub fn update(&mut self, id: SpriteId, pos: Vec2, rotation_deg: f32, now: f64) {
        if let Some(proxy) = self.proxies.get_mut(&id) {
            proxy.pos = pos;
            proxy.rotation_deg = rotation_deg;
            proxy.anim.settle(now);
            let (size, opacity) = coefficients(&proxy.anim, now);
            proxy.size_coef = size;
            proxy.opacity_coef = opacity;
        }
    }

    pub fn start_fade_in(&mut self, id: SpriteId, now: f64) {
        if let Some(proxy) = self.proxies.get_mut(&id) {
            proxy.anim.start_fade_in(now);
        }
    }

    pub fn start_fade_out(&mut self, id: SpriteId, now: f64) {
        if let Some(proxy) = self.proxies.get_mut(&id) {
            proxy.anim.start_fade_out(now);
        }
    }

    pub fn set_blink(&mut self, id: SpriteId, active: bool, now: f64) {
        if let Some(proxy) = self.proxies.get_mut(&id) {
            proxy.anim.set_blink(active, now);
        }
    }

    pub fn is_blinking(&self, id: SpriteId) -> bool {
        self.proxies
            .get(&id)
            .map(|p| p.anim.blink_start.is_some())
            .unwrap_or(false)
    }

    /// Whether an explosion proxy's one-shot sequence has finished.
    pub fn explosion_finished(&self, id: SpriteId, now: f64) -> bool {
        self.proxies
            .get(&id)
            .and_then(|p| p.explosion_started)
            .map(|started| now - started >= EXPLOSION_DELAY)
            .unwrap_or(false)
    }

    pub fn get(&self, id: SpriteId) -> Option<&VisualProxy> {
        self.proxies.get(&id)
    }

    pub fn contains(&self, id: SpriteId) -> bool {
        self.proxies.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    /// Iterate over all proxies, for the renderer.
    pub fn iter(&self) -> impl Iterator<Item = (&SpriteId, &VisualProxy)> {
        self.proxies.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_state_has_unit_coefficients() {
        let state = AnimState::default();
        assert_eq!(coefficients(&state, 12.5), (1.0, 1.0));
    }

    #[test]
    fn fade_in_ramps_up_from_fade_size() {
        let mut state = AnimState::default();
        state.start_fade_in(0.0);

        let (size0, opacity0) = coefficients(&state, 0.0);
        assert!((size0 - FADE_SIZE).abs() < 1e-5);
        assert!((opacity0 - FADE_SIZE).abs() < 1e-5);

        let (size1, opacity1) = coefficients(&state, FADEIN_DELAY / 2.0);
        assert!(size1 > size0);
        assert!(opacity1 > opacity0);

        // Past the ramp the size clamps at the overshoot, opacity at 1.
        let (size2, opacity2) = coefficients(&state, FADEIN_DELAY * 2.0);
        assert!((size2 - FADEIN_OVERSHOOT).abs() < 1e-5);
        assert!((opacity2 - 1.0).abs() < 1e-5);
    }

    #[test]
    fn fade_out_shrinks_and_clamps() {
        let mut state = AnimState::default();
        state.start_fade_out(0.0);

        let (size0, opacity0) = coefficients(&state, 0.0);
        assert!((size0 - 1.0).abs() < 1e-5);
        assert!((opacity0 - 1.0).abs() < 1e-5);

        let (size1, opacity1) = coefficients(&state, FADEOUT_DELAY * 2.0);
        assert!((size1 - 0.2).abs() < 1e-5, "size floors at 0.2: {}", size1);
        assert!(opacity1.abs() < 1e-5, "opacity floors at 0: {}", opacity1);
    }

    #[test]
    fn fades_are_mutually_exclusive() {
        let mut state = AnimState::default();
        state.start_fade_in(0.0);
        state.start_fade_out(1.0);
        assert!(state.fade_in_start.is_none());
        assert!(state.fade_out_start.is_some());

        state.start_fade_in(2.0);
        assert!(state.fade_in_start.is_some());
        assert!(state.fade_out_start.is_none());
    }

    #[test]
    fn blink_modulates_opacity() {
        let mut state = AnimState::default();
        state.set_blink(true, 0.0);
        // Opacity oscillates within [0.5, 1.0] and never exceeds the base.
        let mut saw_dip = false;
        for i in 1..40 {
            let now = i as f64 * 0.05;
            let (_, opacity) = coefficients(&state, now);
            assert!((0.5..=1.0).contains(&opacity), "opacity {}", opacity);
            if opacity < 0.95 {
                saw_dip = true;
            }
        }
        assert!(saw_dip, "blink should visibly dip the opacity");
    }

    #[test]
    fn settle_clears_completed_fade_in_only() {
        let mut state = AnimState::default();
        state.start_fade_in(0.0);
        state.settle(FADEIN_DELAY / 4.0);
        assert!(state.fade_in_start.is_some());
        state.settle(FADEIN_DELAY * 2.0);
        assert!(state.fade_in_start.is_none());

        state.start_fade_out(0.0);
        state.settle(FADEOUT_DELAY * 10.0);
        assert!(state.fade_out_start.is_some(), "fade-out must persist");
    }

    #[test]
    fn stage_update_refreshes_outputs() {
        let mut stage = Stage::new();
        let id = stage.create_fruit_sprite("cherry", 30.0);
        stage.start_fade_in(id, 0.0);
        stage.update(id, Vec2::new(10.0, 20.0), 45.0, 0.0);

        let proxy = stage.get(id).unwrap();
        assert_eq!(proxy.image, "cherry.png");
        assert_eq!(proxy.pos, Vec2::new(10.0, 20.0));
        assert!((proxy.size_coef - FADE_SIZE).abs() < 1e-5);
    }

    #[test]
    fn explosion_reports_completion() {
        let mut stage = Stage::new();
        let id = stage.create_explosion_sprite(30.0, Vec2::ZERO, 1.0);
        assert!(!stage.explosion_finished(id, 1.0));
        assert!(!stage.explosion_finished(id, 1.0 + EXPLOSION_DELAY / 2.0));
        assert!(stage.explosion_finished(id, 1.0 + EXPLOSION_DELAY));
    }

    #[test]
    fn destroy_forgets_the_proxy() {
        let mut stage = Stage::new();
        let id = stage.create_fruit_sprite("plum", 55.0);
        assert!(stage.contains(id));
        stage.destroy(id);
        assert!(!stage.contains(id));
        assert!(!stage.explosion_finished(id, 100.0));
    }
}
