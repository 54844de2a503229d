//! Thin-lens camera sensor.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use spekt_math::{sample_concentric_disk, Mat3, Payload, Ray, SpectrumRgb, Transformation, Vec3};

use crate::error::{RenderError, RenderResult};
use crate::material_model::MaterialModelKind;
use crate::sensor::Sensor;
use crate::tonemap::ToneMapping;

/// Optics and film settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraConfig {
    pub width: u32,
    pub height: u32,
    /// Distance from the lens to the film (meters)
    pub focal_length: f32,
    /// Zero for a pinhole camera
    pub lens_radius: f32,
    /// Distance to the plane in focus
    pub focal_distance: f32,
    /// Film width over film height
    pub aspect_ratio: f32,
    /// Vertical field of view in degrees
    pub y_field_of_view: f32,
    /// Rays per pixel; only used with a lens
    pub samples: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: 500,
            height: 500,
            focal_length: 0.5,
            lens_radius: 0.0,
            focal_distance: 4.0,
            aspect_ratio: 1.0,
            y_field_of_view: 120.0,
            samples: 1,
        }
    }
}

/// Atomically add `value` to the f32 stored in `slot`.
fn atomic_add(slot: &AtomicU32, value: f32) {
    let mut current = slot.load(Ordering::Relaxed);
    loop {
        let updated = (f32::from_bits(current) + value).to_bits();
        match slot.compare_exchange_weak(current, updated, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => break,
            Err(actual) => current = actual,
        }
    }
}

/// Camera producing one primary ray per pixel and sample.
///
/// The film is accumulated lock-free: every pixel owns three atomic slots
/// (red, green, blue) addressed by the ray id.
#[derive(Debug)]
pub struct Camera {
    position: Vec3,
    direction: Vec3,
    up: Vec3,
    camera_to_world: Transformation,
    config: CameraConfig,
    seed: Option<u64>,
    buffer: Vec<AtomicU32>,
    done: bool,
}

impl Camera {
    /// Camera at `position` looking along `direction`.
    pub fn new(position: Vec3, direction: Vec3, up: Vec3) -> Self {
        let mut camera = Self {
            position,
            direction: Vec3::Z,
            up: Vec3::Y,
            camera_to_world: Transformation::IDENTITY,
            config: CameraConfig::default(),
            seed: None,
            buffer: Vec::new(),
            done: false,
        };
        camera.set_position(position, direction, up);
        camera.reset_buffer();
        camera
    }

    pub fn with_config(mut self, config: CameraConfig) -> Self {
        self.config = config;
        self.reset_buffer();
        self
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.config.width = width;
        self.config.height = height;
        self.reset_buffer();
        self
    }

    pub fn with_field_of_view(mut self, y_field_of_view: f32, aspect_ratio: f32) -> Self {
        self.config.y_field_of_view = y_field_of_view;
        self.config.aspect_ratio = aspect_ratio;
        self
    }

    pub fn with_focal_length(mut self, focal_length: f32) -> Self {
        self.config.focal_length = focal_length;
        self
    }

    /// Thin lens of radius `lens_radius` focused at `focal_distance`.
    pub fn with_lens(mut self, lens_radius: f32, focal_distance: f32) -> Self {
        self.config.lens_radius = lens_radius;
        self.config.focal_distance = focal_distance;
        self
    }

    pub fn with_samples(mut self, samples: u32) -> Self {
        self.config.samples = samples;
        self
    }

    /// Deterministic lens sampling.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Place the camera. `up` need not be orthogonal to `direction`.
    pub fn set_position(&mut self, position: Vec3, direction: Vec3, up: Vec3) {
        let forward = direction.normalize();
        let right = up.cross(forward).normalize();
        let true_up = forward.cross(right);

        self.position = position;
        self.direction = forward;
        self.up = true_up;
        // Camera space looks down -z with +y up
        self.camera_to_world = Transformation::new(Mat3::from_cols(right, true_up, -forward), position);
    }

    fn reset_buffer(&mut self) {
        let slots = 3 * self.pixel_count();
        self.buffer = (0..slots).map(|_| AtomicU32::new(0)).collect();
        self.done = false;
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    pub fn width(&self) -> u32 {
        self.config.width
    }

    pub fn height(&self) -> u32 {
        self.config.height
    }

    pub fn pixel_count(&self) -> usize {
        self.config.width as usize * self.config.height as usize
    }

    /// Rays per pixel actually generated: a pinhole takes a single sample.
    pub fn samples(&self) -> u32 {
        if self.config.lens_radius == 0.0 {
            1
        } else {
            self.config.samples.max(1)
        }
    }

    /// Accumulated RGB of pixel `id`.
    pub fn pixel(&self, id: usize) -> Option<[f32; 3]> {
        let slots = self.buffer.get(3 * id..3 * id + 3)?;
        Some([
            f32::from_bits(slots[0].load(Ordering::Relaxed)),
            f32::from_bits(slots[1].load(Ordering::Relaxed)),
            f32::from_bits(slots[2].load(Ordering::Relaxed)),
        ])
    }

    /// Clear the film and allow another batch of primary rays.
    pub fn reset(&mut self) {
        self.reset_buffer();
    }

    /// Film size `(width, height)` at the thin-lens image distance.
    fn film_size(&self) -> (f32, f32) {
        let f = self.config.focal_length;
        let zf = self.config.focal_distance;
        let image_distance = f * zf / (f + zf);

        let height = 2.0 * image_distance * (self.config.y_field_of_view.to_radians() / 2.0).tan();
        (height * self.config.aspect_ratio, height)
    }

    /// Pinhole ray through pixel `(i, j)` in camera space.
    fn pinhole_ray(&self, id: usize, i: u32, j: u32, film_origin: Vec3, dw: Vec3, dh: Vec3) -> Ray {
        let film_point = film_origin + i as f32 * dw + j as f32 * dh;
        Ray::new(id, Vec3::ZERO, (-film_point).normalize())
    }

    fn lens_ray(&self, pinhole: &Ray, rng: &mut impl Rng) -> Ray {
        let disk = sample_concentric_disk(rng.gen(), rng.gen());
        let lens_point = Vec3::new(disk.x, disk.y, 0.0) * self.config.lens_radius;

        let t = self.config.focal_distance / -pinhole.direction().z;
        let focal_point = pinhole.at(t);

        Ray::new(pinhole.id, lens_point, (focal_point - lens_point).normalize())
    }

    fn write_header(&self, writer: &mut impl Write, max_value: u32) -> RenderResult<()> {
        writeln!(writer, "P3")?;
        writeln!(writer, "{} {}", self.config.width, self.config.height)?;
        writeln!(writer, "{max_value}")?;
        Ok(())
    }

    fn write_values(&self, writer: &mut impl Write, value: impl Fn(f32) -> i32) -> RenderResult<()> {
        let samples = self.samples() as f32;
        let row = 3 * self.config.width as usize;

        for (i, slot) in self.buffer.iter().enumerate() {
            if i > 0 && i % row == 0 {
                writeln!(writer)?;
            }
            let v = f32::from_bits(slot.load(Ordering::Relaxed)) / samples;
            write!(writer, "{} ", value(v))?;
        }
        writeln!(writer)?;
        Ok(())
    }

    /// Tone-mapped 16 bit PPM.
    pub fn write_ppm(&self, writer: &mut impl Write, tone_mapping: &ToneMapping) -> RenderResult<()> {
        let max_value = 65535;
        self.write_header(writer, max_value)?;
        self.write_values(writer, |v| (max_value as f32 * tone_mapping.apply(v)) as i32)
    }

    /// 8 bit PPM scaled so the brightest value maps to 255.
    ///
    /// An all-black film is written as zeros.
    pub fn write_ppm_raycaster(&self, writer: &mut impl Write) -> RenderResult<()> {
        let max_value = 255;
        let samples = self.samples() as f32;
        let maximum = self
            .buffer
            .iter()
            .map(|slot| f32::from_bits(slot.load(Ordering::Relaxed)) / samples)
            .fold(0.0_f32, f32::max);
        let factor = if maximum > 0.0 { max_value as f32 / maximum } else { 0.0 };

        self.write_header(writer, max_value)?;
        self.write_values(writer, |v| (factor * v) as i32)
    }

    pub fn save(&self, path: impl AsRef<Path>, tone_mapping: &ToneMapping) -> RenderResult<()> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        self.write_ppm(&mut writer, tone_mapping)?;
        writer.flush()?;
        log::info!("Saved image to {}", path.as_ref().display());
        Ok(())
    }

    pub fn save_raycaster(&self, path: impl AsRef<Path>) -> RenderResult<()> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        self.write_ppm_raycaster(&mut writer)?;
        writer.flush()?;
        log::info!("Saved raycaster image to {}", path.as_ref().display());
        Ok(())
    }
}

impl Sensor for Camera {
    /// Every pixel and sample in a single batch.
    fn primary_rays(&mut self) -> Vec<Ray> {
        if self.done {
            return Vec::new();
        }
        self.done = true;

        let (width, height) = (self.config.width, self.config.height);
        if width == 0 || height == 0 {
            return Vec::new();
        }

        let (film_width, film_height) = self.film_size();
        let film_origin = Vec3::new(-film_width / 2.0, -film_height / 2.0, self.config.focal_length);
        let dw = Vec3::new(film_width / width.saturating_sub(1).max(1) as f32, 0.0, 0.0);
        let dh = Vec3::new(0.0, film_height / height.saturating_sub(1).max(1) as f32, 0.0);

        let samples = self.samples();
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut rays = Vec::with_capacity(self.pixel_count() * samples as usize);
        for j in 0..height {
            for i in 0..width {
                let id = (j * width + i) as usize;
                let pinhole = self.pinhole_ray(id, i, j, film_origin, dw, dh);

                for _ in 0..samples {
                    let local = if self.config.lens_radius == 0.0 {
                        pinhole.clone()
                    } else {
                        self.lens_ray(&pinhole, &mut rng)
                    };
                    let payload = Payload::rgb(SpectrumRgb::new(1.0, 1.0, 1.0));
                    rays.push(self.camera_to_world.ray_to_world(&local).with_payload(payload));
                }
            }
        }

        log::debug!("Generated {} primary rays ({} per pixel)", rays.len(), samples);
        rays
    }

    fn report_primary_ray(&self, ray: &Ray) -> RenderResult<()> {
        let spectrum = ray.spectrum().ok_or(RenderError::MissingPayload {
            id: ray.id,
            found: ray.payload.name(),
        })?;
        let slots = self
            .buffer
            .get(3 * ray.id..3 * ray.id + 3)
            .ok_or(RenderError::InvalidRayId {
                id: ray.id,
                pixels: self.pixel_count(),
            })?;

        let rgb = spectrum.lock().to_rgb();
        for (slot, value) in slots.iter().zip(rgb) {
            atomic_add(slot, value);
        }
        Ok(())
    }

    fn is_compatible(&self, kind: MaterialModelKind) -> bool {
        matches!(kind, MaterialModelKind::Specular)
    }
}
