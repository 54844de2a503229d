//! Recursive ray tracer driving a sensor.
//!
//! Every primary ray is traced depth first: on a hit the material model
//! produces child rays which are traced in turn, and rays escaping the scene
//! pick up the background before they are reported to the sensor. Batches of
//! primary rays are traced in parallel with rayon.

use parking_lot::Mutex;
use rayon::prelude::*;
use spekt_core::{Instance, Intersection};
use spekt_math::Ray;

use crate::background::Background;
use crate::error::{RenderError, RenderResult};
use crate::material_model::MaterialModel;
use crate::sensor::Sensor;

/// Render configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    /// Bounces allowed after the primary ray; the only bound on recursion depth
    pub max_bounces: u32,
    /// Paths whose mean radiance drops to this value or below are dropped
    pub min_radiance: f32,
    /// Report every bounced ray instead of background-lit escapes
    pub raycaster: bool,
    /// Log the first hit of every primary ray
    pub verbose: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_bounces: 50,
            min_radiance: 0.1,
            raycaster: false,
            verbose: false,
        }
    }
}

impl RenderConfig {
    /// Settings for visualizing what the camera hits directly.
    pub fn raycaster() -> Self {
        Self {
            max_bounces: 1,
            min_radiance: 0.0,
            raycaster: true,
            verbose: false,
        }
    }
}

/// Traces rays against one instance with one material model.
pub struct Renderer<'a> {
    instance: &'a Instance,
    material_model: &'a dyn MaterialModel,
    background: Option<&'a dyn Background>,
    config: RenderConfig,
    /// Keeps multi-line diagnostics from different threads apart
    diagnostics: Mutex<()>,
}

impl<'a> Renderer<'a> {
    pub fn new(
        instance: &'a Instance,
        material_model: &'a dyn MaterialModel,
        background: Option<&'a dyn Background>,
        config: RenderConfig,
    ) -> Self {
        Self {
            instance,
            material_model,
            background,
            config,
            diagnostics: Mutex::new(()),
        }
    }

    pub fn instance(&self) -> &'a Instance {
        self.instance
    }

    pub fn material_model(&self) -> &'a dyn MaterialModel {
        self.material_model
    }

    pub fn background(&self) -> Option<&'a dyn Background> {
        self.background
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    fn log_hit(&self, ray: &Ray, intersection: &Intersection<'_>) {
        let _guard = self.diagnostics.lock();
        log::info!("=========== Hit of ray {} ===========", ray.id);
        log::info!("  intersection point = {}", intersection.point());
        log::info!("  ray origin = {}, direction = {}", ray.origin(), ray.direction());
        match intersection.material() {
            Some(material) => log::info!(
                "  material = {}, temperature = {} K, ior = {}",
                material.name,
                material.temperature,
                material.ior.title
            ),
            None => log::info!("  material = none"),
        }
    }

    /// Trace `ray` and everything it spawns.
    pub fn trace(&self, sensor: &dyn Sensor, ray: &mut Ray) -> RenderResult<()> {
        let mut intersection = Intersection::new(ray);
        let hit = self
            .instance
            .intersect_ray(ray, &mut intersection, 0.0, f32::INFINITY);

        let radiance = if sensor.call_sensor() {
            if !sensor.hook(self, ray, &intersection)? {
                return Ok(());
            }
            1.0
        } else {
            ray.spectrum()
                .ok_or(RenderError::MissingPayload {
                    id: ray.id,
                    found: ray.payload.name(),
                })?
                .lock()
                .mean()
        };

        if hit && ray.bounces < self.config.max_bounces && radiance > self.config.min_radiance {
            if self.config.verbose && ray.bounces == 0 {
                self.log_hit(ray, &intersection);
            }

            let bounced = self.material_model.bounce(ray, &intersection, sensor, self)?;
            for mut child in bounced {
                self.trace(sensor, &mut child)?;
                if self.config.raycaster {
                    sensor.report_primary_ray(&child)?;
                }
            }
        } else if !hit && !self.config.raycaster {
            if let Some(background) = self.background {
                background.hit(ray)?;
                sensor.report_primary_ray(ray)?;
            }
        }

        Ok(())
    }

    /// Trace every batch of primary rays the sensor hands out.
    pub fn render(&self, sensor: &mut dyn Sensor) -> RenderResult<()> {
        let kind = self.material_model.kind();
        if !sensor.is_compatible(kind) {
            return Err(RenderError::Incompatible { model: kind.name() });
        }

        let start = std::time::Instant::now();
        let mut traced = 0;

        loop {
            let mut rays = sensor.primary_rays();
            if rays.is_empty() {
                break;
            }

            log::info!("Tracing batch of {} primary rays", rays.len());
            {
                let sensor: &dyn Sensor = &*sensor;
                rays.par_iter_mut().try_for_each(|ray| self.trace(sensor, ray))?;
            }
            traced += rays.len();

            sensor.cleanup_primary_rays(&rays);
        }

        log::info!(
            "Traced {} primary rays in {:.2}s",
            traced,
            start.elapsed().as_secs_f64()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::{FatalBackground, HdrBackground};
    use crate::camera::Camera;
    use crate::material_model::{fresnel_reflection, MaterialModelKind, SpecularConfig, SpecularModel};
    use crate::tonemap::ToneMapping;
    use num_complex::Complex32;
    use spekt_core::{GeometryAsset, Material, MaterialIor, Mesh};
    use spekt_math::{Transformation, Vec3};
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
    use std::sync::Arc;

    const N: f32 = 1.5;
    const WIDTH: u32 = 24;
    const HEIGHT: u32 = 20;

    /// Unit cube at the origin; only the face at z = -0.5 is modelled, as a
    /// pair of triangles facing -z.
    fn cube_face() -> Instance {
        cube_face_with_normals(None)
    }

    fn cube_face_with_normals(normals: Option<Vec<Vec3>>) -> Instance {
        let material = Arc::new(Material::new("glass", 300.0, Arc::new(MaterialIor::constant(N, 0.0))));
        let mesh = Mesh::new(
            "cube_front",
            vec![
                Vec3::new(-0.5, -0.5, -0.5),
                Vec3::new(-0.5, 0.5, -0.5),
                Vec3::new(0.5, 0.5, -0.5),
                Vec3::new(0.5, -0.5, -0.5),
            ],
            vec![0, 1, 2, 0, 2, 3],
            normals,
            material,
        )
        .unwrap();

        let mut asset = GeometryAsset::new("cube");
        let mesh = asset.add_mesh(mesh);
        let node = asset.add_node("cube");
        asset.set_mesh(node, mesh).unwrap();
        asset.set_scene_roots(vec![node]).unwrap();
        asset.build_spatial_index();
        Instance::new(Arc::new(asset), Transformation::IDENTITY)
    }

    fn front_camera() -> Camera {
        Camera::new(Vec3::new(0.0, 0.0, -4.0), Vec3::Z, Vec3::Y)
            .with_resolution(WIDTH, HEIGHT)
            .with_field_of_view(30.0, 1.0)
    }

    /// Whether the primary ray hits the face, or `None` when it passes too
    /// close to the silhouette to call.
    fn inside_silhouette(ray: &Ray) -> Option<bool> {
        let t = (-0.5 - ray.origin().z) / ray.direction().z;
        let p = ray.at(t);
        let margin = 0.5 - p.x.abs().max(p.y.abs());
        if margin.abs() < 1e-3 {
            None
        } else {
            Some(margin > 0.0)
        }
    }

    /// Counts reports per pixel while forwarding them to a camera.
    struct CountingSensor {
        camera: Camera,
        primaries: Vec<Ray>,
        reports: Vec<AtomicU32>,
        cleanups: usize,
    }

    impl CountingSensor {
        fn new(camera: Camera) -> Self {
            let pixels = camera.pixel_count();
            Self {
                camera,
                primaries: Vec::new(),
                reports: (0..pixels).map(|_| AtomicU32::new(0)).collect(),
                cleanups: 0,
            }
        }
    }

    impl Sensor for CountingSensor {
        fn primary_rays(&mut self) -> Vec<Ray> {
            let rays = self.camera.primary_rays();
            self.primaries.extend(rays.iter().cloned());
            rays
        }

        fn cleanup_primary_rays(&mut self, _rays: &[Ray]) {
            self.cleanups += 1;
        }

        fn report_primary_ray(&self, ray: &Ray) -> RenderResult<()> {
            self.reports[ray.id].fetch_add(1, Ordering::Relaxed);
            self.camera.report_primary_ray(ray)
        }

        fn is_compatible(&self, kind: MaterialModelKind) -> bool {
            self.camera.is_compatible(kind)
        }
    }

    #[test]
    fn test_raycaster_reports_one_hit_per_covered_pixel() {
        let instance = cube_face();
        let model = SpecularModel::default();
        let background = FatalBackground;
        let renderer = Renderer::new(&instance, &model, Some(&background), RenderConfig::raycaster());

        let mut sensor = CountingSensor::new(front_camera());
        renderer.render(&mut sensor).unwrap();
        assert_eq!(sensor.cleanups, 1);

        let expected = fresnel_reflection(Complex32::new(N, 0.0), 1.0);
        let mut covered = 0;
        for ray in &sensor.primaries {
            let reports = sensor.reports[ray.id].load(Ordering::Relaxed);
            let pixel = sensor.camera.pixel(ray.id).unwrap();
            match inside_silhouette(ray) {
                Some(true) => {
                    covered += 1;
                    assert_eq!(reports, 1, "pixel {}", ray.id);
                    // Near-normal incidence on glass reflects about 4%
                    assert!(pixel[0] > 0.0 && pixel[0] < 2.0 * expected.0);
                }
                Some(false) => {
                    assert_eq!(reports, 0, "pixel {}", ray.id);
                    assert_eq!(pixel, [0.0, 0.0, 0.0]);
                }
                None => {}
            }
        }
        assert!(covered > 0);
        assert!(covered < sensor.primaries.len());
    }

    #[test]
    fn test_escaping_ray_hits_fatal_background() {
        let instance = cube_face();
        let model = SpecularModel::default();
        let background = FatalBackground;
        let renderer = Renderer::new(&instance, &model, Some(&background), RenderConfig::default());

        let mut camera = front_camera();
        assert!(matches!(
            renderer.render(&mut camera),
            Err(RenderError::BackgroundHit { .. })
        ));
    }

    #[test]
    fn test_environment_lights_escaping_paths() {
        let instance = cube_face();
        let model = SpecularModel::default();
        let background = HdrBackground::from_pixels(2, 2, vec![2.0; 12]).unwrap();
        let config = RenderConfig {
            min_radiance: 0.0,
            ..RenderConfig::default()
        };
        let renderer = Renderer::new(&instance, &model, Some(&background), config);

        let mut sensor = CountingSensor::new(front_camera());
        renderer.render(&mut sensor).unwrap();

        let (rp, rs) = fresnel_reflection(Complex32::new(N, 0.0), 1.0);
        for ray in &sensor.primaries {
            // Every path ends in exactly one background hit
            assert_eq!(sensor.reports[ray.id].load(Ordering::Relaxed), 1);

            let pixel = sensor.camera.pixel(ray.id).unwrap();
            match inside_silhouette(ray) {
                Some(true) => {
                    assert!(pixel[1] < 2.0 * (rp + rs));
                    assert!(pixel[1] > 2.0 * (rp + rs) / 2.0 * 0.9);
                }
                Some(false) => assert!((pixel[1] - 2.0).abs() < 1e-6),
                None => {}
            }
        }
    }

    #[test]
    fn test_dim_or_exhausted_paths_are_dropped() {
        let instance = cube_face();
        let model = SpecularModel::default();
        let background = HdrBackground::from_pixels(1, 1, vec![1.0; 3]).unwrap();
        let center = (HEIGHT / 2 * WIDTH + WIDTH / 2) as usize;

        // Below the radiance cutoff a hit ends the path silently
        let renderer = Renderer::new(&instance, &model, Some(&background), RenderConfig::default());
        let mut camera = front_camera();
        let mut ray = camera.primary_rays().swap_remove(center);
        ray.spectrum().unwrap().lock().multiply(0.05, 0.05, 0.05);
        renderer.trace(&camera, &mut ray).unwrap();
        assert_eq!(camera.pixel(center), Some([0.0, 0.0, 0.0]));

        // So does a hit with no bounces left
        let config = RenderConfig {
            max_bounces: 0,
            ..RenderConfig::default()
        };
        let renderer = Renderer::new(&instance, &model, Some(&background), config);
        let mut camera = front_camera();
        let mut ray = camera.primary_rays().swap_remove(center);
        renderer.trace(&camera, &mut ray).unwrap();
        assert_eq!(camera.pixel(center), Some([0.0, 0.0, 0.0]));

        // Without a cutoff the dim path reflects and escapes
        let config = RenderConfig {
            min_radiance: 0.0,
            ..RenderConfig::default()
        };
        let renderer = Renderer::new(&instance, &model, Some(&background), config);
        let mut camera = front_camera();
        let mut ray = camera.primary_rays().swap_remove(center);
        ray.spectrum().unwrap().lock().multiply(0.05, 0.05, 0.05);
        renderer.trace(&camera, &mut ray).unwrap();
        let pixel = camera.pixel(center).unwrap();
        assert!(pixel[0] > 0.0 && pixel[0] < 0.005);
    }

    #[test]
    fn test_hook_can_stop_processing() {
        struct Stopper {
            camera: Camera,
            hooked: AtomicUsize,
            hits: AtomicUsize,
        }

        impl Sensor for Stopper {
            fn primary_rays(&mut self) -> Vec<Ray> {
                self.camera.primary_rays()
            }

            fn report_primary_ray(&self, ray: &Ray) -> RenderResult<()> {
                self.camera.report_primary_ray(ray)
            }

            fn is_compatible(&self, kind: MaterialModelKind) -> bool {
                self.camera.is_compatible(kind)
            }

            fn call_sensor(&self) -> bool {
                true
            }

            fn hook(&self, _renderer: &Renderer<'_>, _ray: &mut Ray, intersection: &Intersection<'_>) -> RenderResult<bool> {
                self.hooked.fetch_add(1, Ordering::Relaxed);
                if intersection.hit {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                }
                Ok(false)
            }
        }

        let instance = cube_face();
        let model = SpecularModel::default();
        let background = FatalBackground;
        let renderer = Renderer::new(&instance, &model, Some(&background), RenderConfig::default());

        let mut sensor = Stopper {
            camera: front_camera(),
            hooked: AtomicUsize::new(0),
            hits: AtomicUsize::new(0),
        };
        // The fatal background is never reached
        renderer.render(&mut sensor).unwrap();
        assert_eq!(sensor.hooked.load(Ordering::Relaxed), (WIDTH * HEIGHT) as usize);
        assert!(sensor.hits.load(Ordering::Relaxed) > 0);
    }

    #[test]
    fn test_incompatible_sensor_fails_before_tracing() {
        struct Blind;

        impl Sensor for Blind {
            fn primary_rays(&mut self) -> Vec<Ray> {
                panic!("no rays should be requested");
            }

            fn report_primary_ray(&self, _ray: &Ray) -> RenderResult<()> {
                Ok(())
            }

            fn is_compatible(&self, _kind: MaterialModelKind) -> bool {
                false
            }
        }

        let instance = cube_face();
        let model = SpecularModel::default();
        let renderer = Renderer::new(&instance, &model, None, RenderConfig::default());
        assert!(matches!(
            renderer.render(&mut Blind),
            Err(RenderError::Incompatible { model: "specular" })
        ));
    }

    #[test]
    fn test_back_facing_shading_normals_fall_back_to_flat_normal() {
        // Vertex normals point along the rays instead of against them
        let instance = cube_face_with_normals(Some(vec![Vec3::Z; 4]));
        let model = SpecularModel::new(SpecularConfig {
            flip_negative_normals: false,
            warn_negative_cosine: false,
        });
        let background = HdrBackground::from_pixels(1, 1, vec![2.0; 3]).unwrap();
        let config = RenderConfig {
            min_radiance: 0.0,
            ..RenderConfig::default()
        };
        let renderer = Renderer::new(&instance, &model, Some(&background), config);

        let mut sensor = CountingSensor::new(front_camera());
        renderer.render(&mut sensor).unwrap();

        let (rp, rs) = fresnel_reflection(Complex32::new(N, 0.0), 1.0);
        let mut covered = 0;
        for ray in &sensor.primaries {
            assert_eq!(sensor.reports[ray.id].load(Ordering::Relaxed), 1, "pixel {}", ray.id);
            if inside_silhouette(ray) == Some(true) {
                covered += 1;
                let pixel = sensor.camera.pixel(ray.id).unwrap();
                assert!(pixel[1] < 2.0 * (rp + rs));
                assert!(pixel[1] > 2.0 * (rp + rs) / 2.0 * 0.9);
            }
        }
        assert!(covered > 0);
    }

    #[test]
    fn test_reversed_hits_follow_negative_cosine_policy() {
        /// Turns every hit ray around before it bounces, so both normals
        /// face away from it.
        struct Reverser {
            inner: CountingSensor,
        }

        impl Sensor for Reverser {
            fn primary_rays(&mut self) -> Vec<Ray> {
                self.inner.primary_rays()
            }

            fn report_primary_ray(&self, ray: &Ray) -> RenderResult<()> {
                self.inner.report_primary_ray(ray)
            }

            fn is_compatible(&self, kind: MaterialModelKind) -> bool {
                self.inner.is_compatible(kind)
            }

            fn call_sensor(&self) -> bool {
                true
            }

            fn hook(&self, _renderer: &Renderer<'_>, ray: &mut Ray, intersection: &Intersection<'_>) -> RenderResult<bool> {
                if intersection.hit && ray.bounces == 0 {
                    ray.set_direction(-ray.direction());
                }
                Ok(true)
            }
        }

        let instance = cube_face();
        let background = FatalBackground;
        let total_reports = |model: &SpecularModel| {
            let renderer = Renderer::new(&instance, model, Some(&background), RenderConfig::raycaster());
            let mut sensor = Reverser {
                inner: CountingSensor::new(front_camera()),
            };
            renderer.render(&mut sensor).unwrap();
            sensor
                .inner
                .reports
                .iter()
                .map(|count| count.load(Ordering::Relaxed))
                .collect::<Vec<_>>()
        };

        let strict = SpecularModel::new(SpecularConfig {
            flip_negative_normals: false,
            warn_negative_cosine: false,
        });
        assert!(total_reports(&strict).iter().all(|&count| count == 0));

        let flipped = total_reports(&SpecularModel::default());
        assert!(flipped.iter().all(|&count| count <= 1));
        assert!(flipped.iter().any(|&count| count == 1));
    }

    #[test]
    fn test_pinhole_camera_ignores_extra_samples() {
        let instance = cube_face();
        let model = SpecularModel::default();
        let background = HdrBackground::from_pixels(1, 1, vec![1.0; 3]).unwrap();
        let config = RenderConfig {
            min_radiance: 0.0,
            ..RenderConfig::default()
        };
        let renderer = Renderer::new(&instance, &model, Some(&background), config);

        let mut single = CountingSensor::new(front_camera());
        let mut many = CountingSensor::new(front_camera().with_samples(8));
        assert_eq!(many.camera.samples(), 1);
        renderer.render(&mut single).unwrap();
        renderer.render(&mut many).unwrap();

        assert_eq!(many.primaries.len(), (WIDTH * HEIGHT) as usize);
        for ray in &many.primaries {
            assert_eq!(many.reports[ray.id].load(Ordering::Relaxed), 1, "pixel {}", ray.id);
        }

        // Saved values are divided by one sample, not eight
        let tone_mapping = ToneMapping::new(0.1);
        let mut expected = Vec::new();
        let mut written = Vec::new();
        single.camera.write_ppm(&mut expected, &tone_mapping).unwrap();
        many.camera.write_ppm(&mut written, &tone_mapping).unwrap();
        assert_eq!(String::from_utf8(written).unwrap(), String::from_utf8(expected).unwrap());
    }
}
