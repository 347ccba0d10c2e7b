use std::ops::RangeInclusive;
use std::time::Duration;

use eframe::egui::{Pos2, Vec2};

use crate::config::EngineConfig;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
    pub translation: Vec2,
    pub scale: f32,
}

impl ViewTransform {
    pub const IDENTITY: Self = Self {
        translation: Vec2::ZERO,
        scale: 1.0,
    };

    pub fn world_to_screen(&self, world: Vec2) -> Pos2 {
        (self.translation + world * self.scale).to_pos2()
    }

    pub fn screen_to_world(&self, screen: Pos2) -> Vec2 {
        (screen.to_vec2() - self.translation) / self.scale
    }

    fn lerp(self, to: Self, t: f32) -> Self {
        Self {
            translation: self.translation + (to.translation - self.translation) * t,
            scale: self.scale + (to.scale - self.scale) * t,
        }
    }
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Clone, Copy, Debug)]
struct Transition {
    from: ViewTransform,
    to: ViewTransform,
    elapsed: Duration,
}

fn ease_cubic_out(t: f32) -> f32 {
    let inverse = 1.0 - t.clamp(0.0, 1.0);
    1.0 - inverse * inverse * inverse
}

#[derive(Clone, Debug)]
pub struct Viewport {
    size: Vec2,
    current: ViewTransform,
    transition: Option<Transition>,
    duration: Duration,
    extent: RangeInclusive<f32>,
}

impl Viewport {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            size: Vec2::ZERO,
            current: ViewTransform::IDENTITY,
            transition: None,
            duration: config.transition,
            extent: config.scale_extent.clone(),
        }
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn set_size(&mut self, size: Vec2) {
        self.size = size.max(Vec2::ZERO);
    }

    pub fn transform(&self) -> ViewTransform {
        self.current
    }

    pub fn target(&self) -> ViewTransform {
        self.transition.map_or(self.current, |transition| transition.to)
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        let mut target = self.settle();
        target.translation += delta;
        self.current = target;
    }

    pub fn zoom(&mut self, factor: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let anchor = (self.size * 0.5).to_pos2();
        let target = self.scaled_about(self.target(), anchor, factor);
        self.animate_to(target);
    }

    pub fn zoom_at(&mut self, anchor: Pos2, factor: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let settled = self.settle();
        self.current = self.scaled_about(settled, anchor, factor);
    }

    pub fn reset(&mut self) {
        self.animate_to(ViewTransform::IDENTITY);
    }

    pub fn center_on(&mut self, world: Vec2) {
        let scale = self.target().scale;
        self.animate_to(ViewTransform {
            translation: self.size * 0.5 - world * scale,
            scale,
        });
    }

    pub fn advance(&mut self, dt: Duration) -> bool {
        let Some(mut transition) = self.transition else {
            return false;
        };

        transition.elapsed += dt;
        if transition.elapsed >= self.duration {
            self.current = transition.to;
            self.transition = None;
            return false;
        }

        let t = transition.elapsed.as_secs_f32() / self.duration.as_secs_f32();
        self.current = transition.from.lerp(transition.to, ease_cubic_out(t));
        self.transition = Some(transition);
        true
    }

    fn clamp_scale(&self, scale: f32) -> f32 {
        scale.clamp(*self.extent.start(), *self.extent.end())
    }

    fn scaled_about(&self, from: ViewTransform, anchor: Pos2, factor: f32) -> ViewTransform {
        let scale = self.clamp_scale(from.scale * factor);
        let world = from.screen_to_world(anchor);
        ViewTransform {
            translation: anchor.to_vec2() - world * scale,
            scale,
        }
    }

    fn animate_to(&mut self, to: ViewTransform) {
        if self.duration.is_zero() {
            self.current = to;
            self.transition = None;
            return;
        }
        self.transition = Some(Transition {
            from: self.current,
            to,
            elapsed: Duration::ZERO,
        });
    }

    fn settle(&mut self) -> ViewTransform {
        if let Some(transition) = self.transition.take() {
            self.current = transition.to;
        }
        self.current
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::{pos2, vec2};

    use super::*;

    fn viewport() -> Viewport {
        let mut viewport = Viewport::new(&EngineConfig::default());
        viewport.set_size(vec2(800.0, 600.0));
        viewport
    }

    fn finish(viewport: &mut Viewport) {
        while viewport.advance(Duration::from_millis(16)) {}
    }

    #[test]
    fn transforms_round_trip() {
        let transform = ViewTransform {
            translation: vec2(30.0, -12.0),
            scale: 2.0,
        };
        let world = vec2(5.0, 7.5);
        let screen = transform.world_to_screen(world);
        assert_eq!(screen, pos2(40.0, 3.0));
        assert_eq!(transform.screen_to_world(screen), world);
    }

    #[test]
    fn zoom_stays_inside_the_scale_extent() {
        let mut viewport = viewport();
        for _ in 0..40 {
            viewport.zoom(1.2);
        }
        finish(&mut viewport);
        assert_eq!(viewport.transform().scale, 3.0);

        for _ in 0..60 {
            viewport.zoom(0.8);
        }
        finish(&mut viewport);
        assert_eq!(viewport.transform().scale, 0.2);
    }

    #[test]
    fn zoom_keeps_the_viewport_center_fixed() {
        let mut viewport = viewport();
        let center = pos2(400.0, 300.0);
        let before = viewport.transform().screen_to_world(center);
        viewport.zoom(1.2);
        finish(&mut viewport);
        let after = viewport.transform().screen_to_world(center);
        assert!((before - after).length() < 1e-3);
        assert!((viewport.transform().scale - 1.2).abs() < 1e-6);
    }

    #[test]
    fn invalid_factors_are_ignored() {
        let mut viewport = viewport();
        viewport.zoom(f32::NAN);
        viewport.zoom(0.0);
        viewport.zoom_at(pos2(10.0, 10.0), f32::INFINITY);
        assert_eq!(viewport.target(), ViewTransform::IDENTITY);
        assert_eq!(viewport.transform(), ViewTransform::IDENTITY);
    }

    #[test]
    fn reset_animates_back_to_identity() {
        let mut viewport = viewport();
        viewport.pan_by(vec2(120.0, -40.0));
        viewport.zoom_at(pos2(0.0, 0.0), 2.0);
        viewport.reset();
        assert_eq!(viewport.target(), ViewTransform::IDENTITY);
        assert!(viewport.advance(Duration::from_millis(100)));
        assert_ne!(viewport.transform(), ViewTransform::IDENTITY);
        assert!(!viewport.advance(Duration::from_millis(400)));
        assert_eq!(viewport.transform(), ViewTransform::IDENTITY);
    }

    #[test]
    fn center_on_keeps_scale() {
        let mut viewport = viewport();
        viewport.zoom_at(pos2(400.0, 300.0), 2.0);
        viewport.center_on(vec2(50.0, 25.0));
        finish(&mut viewport);
        let transform = viewport.transform();
        assert_eq!(transform.scale, 2.0);
        assert_eq!(transform.world_to_screen(vec2(50.0, 25.0)), pos2(400.0, 300.0));
    }
}
