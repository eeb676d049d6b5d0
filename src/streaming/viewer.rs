//! Viewer tracking for the streamer

use glam::{Vec2, Vec3};

use crate::core::StreamerConfig;

/// Viewer position and the position of the last full recompute.
///
/// Positions are stored in chunk space (world position divided by the world
/// scale).
#[derive(Clone, Debug)]
pub struct ViewerState {
    position: Vec2,
    last_update: Option<Vec2>,
    world_scale: f32,
    sqr_threshold: f32,
}

impl ViewerState {
    pub fn new(config: &StreamerConfig) -> Self {
        Self {
            position: Vec2::ZERO,
            last_update: None,
            world_scale: config.world_scale,
            sqr_threshold: config.sqr_move_threshold(),
        }
    }

    /// Set the viewer from a world-space ground position (x, z)
    pub fn set_world_position(&mut self, world: Vec2) {
        self.position = world / self.world_scale;
    }

    /// Set the viewer from a world-space 3D position; height is ignored
    pub fn set_world_position_3d(&mut self, world: Vec3) {
        self.set_world_position(Vec2::new(world.x, world.z));
    }

    /// Position in chunk space
    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn world_position(&self) -> Vec2 {
        self.position * self.world_scale
    }

    /// Position at the last recompute, if any
    pub fn last_update(&self) -> Option<Vec2> {
        self.last_update
    }

    /// True before the first recompute and whenever the viewer moved further
    /// than the threshold since the last one
    pub fn needs_update(&self) -> bool {
        match self.last_update {
            None => true,
            Some(last) => last.distance_squared(self.position) > self.sqr_threshold,
        }
    }

    pub fn mark_updated(&mut self) {
        self.last_update = Some(self.position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewer_with(world_scale: f32, move_threshold: f32) -> ViewerState {
        ViewerState::new(&StreamerConfig {
            world_scale,
            viewer_move_threshold: move_threshold,
            ..Default::default()
        })
    }

    #[test]
    fn test_first_update_always_needed() {
        let viewer = viewer_with(1.0, 10.0);
        assert!(viewer.needs_update());
        assert_eq!(viewer.last_update(), None);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let mut viewer = viewer_with(1.0, 10.0);
        viewer.mark_updated();

        viewer.set_world_position(Vec2::new(10.0, 0.0));
        assert!(!viewer.needs_update());

        viewer.set_world_position(Vec2::new(7.0, 7.5));
        assert!(viewer.needs_update());

        viewer.mark_updated();
        assert!(!viewer.needs_update());
        assert_eq!(viewer.last_update(), Some(Vec2::new(7.0, 7.5)));
    }

    #[test]
    fn test_world_scale_applied() {
        let mut viewer = viewer_with(2.5, 4.0);
        viewer.set_world_position_3d(Vec3::new(25.0, 100.0, -5.0));
        assert_eq!(viewer.position(), Vec2::new(10.0, -2.0));
        assert_eq!(viewer.world_position(), Vec2::new(25.0, -5.0));

        viewer.mark_updated();
        // 9 world units = 3.6 chunk units, under the threshold of 4
        viewer.set_world_position(Vec2::new(34.0, -5.0));
        assert!(!viewer.needs_update());
        viewer.set_world_position(Vec2::new(36.0, -5.0));
        assert!(viewer.needs_update());
    }
}
