use std::time::Duration;

/// Weight of the newest frame in the smoothed frame rate.
const FPS_SMOOTHING: f32 = 0.1;

/// Statistics published for the UI layer.
///
/// Ray-hit counts are read back from the GPU asynchronously, so they usually
/// lag a frame or two behind the frame time.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Stats {
    pub frame_time: Duration,
    pub fps: f32,

    /// Number of camera rays that hit something
    pub camera_ray_hits: u32,

    /// Number of occlusion rays that hit something
    pub ao_ray_hits: u32,

    pub rays_per_second: f32,
}

/// Category of rays whose hits get counted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HitCategory {
    Camera,
    AmbientOcclusion,
}

impl HitCategory {
    pub const ALL: [Self; 2] = [Self::Camera, Self::AmbientOcclusion];

    pub fn name(&self) -> &'static str {
        match self {
            HitCategory::Camera => "camera",
            HitCategory::AmbientOcclusion => "ao",
        }
    }
}

impl Stats {
    /// Records a frame that took `frame_time` and cast `rays` rays.
    pub(crate) fn record_frame(&mut self, frame_time: Duration, rays: u64) {
        self.frame_time = frame_time;

        let secs = frame_time.as_secs_f32();

        if secs <= 0.0 {
            return;
        }

        let fps = 1.0 / secs;

        self.fps = if self.fps > 0.0 {
            self.fps + (fps - self.fps) * FPS_SMOOTHING
        } else {
            fps
        };

        self.rays_per_second = (rays as f32) * self.fps;
    }

    pub(crate) fn record_hits(&mut self, category: HitCategory, hits: u32) {
        match category {
            HitCategory::Camera => self.camera_ray_hits = hits,
            HitCategory::AmbientOcclusion => self.ao_ray_hits = hits,
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn fps_is_smoothed() {
        let mut target = Stats::default();

        target.record_frame(Duration::from_millis(10), 1000);

        assert_relative_eq!(target.fps, 100.0, epsilon = 0.01);
        assert_relative_eq!(target.rays_per_second, 100_000.0, epsilon = 1.0);

        target.record_frame(Duration::from_millis(20), 1000);

        assert_relative_eq!(target.fps, 95.0, epsilon = 0.01);
        assert_eq!(Duration::from_millis(20), target.frame_time);
    }

    #[test]
    fn zero_frame_time_is_ignored() {
        let mut target = Stats::default();

        target.record_frame(Duration::ZERO, 1000);

        assert_eq!(0.0, target.fps);
    }

    #[test]
    fn hits_are_recorded_per_category() {
        let mut target = Stats::default();

        target.record_hits(HitCategory::Camera, 10);
        target.record_hits(HitCategory::AmbientOcclusion, 20);

        assert_eq!(10, target.camera_ray_hits);
        assert_eq!(20, target.ao_ray_hits);
    }
}
