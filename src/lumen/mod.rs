use std::path::Path;
use std::time::Duration;

use bytemuck::cast_slice;
use cfg_if::cfg_if;
use log::info;
use nalgebra::{Point3, Unit, Vector2, Vector3, Vector4};
use rand::rngs::ThreadRng;
use rand::Rng;
use rayon::prelude::*;

use crate::camera::CameraUniform;
use crate::geometry::{intersect_plane, Ray};
use crate::picking::pick;
use crate::render_loop::{FramePass, PassMode, PassProgress, RenderBackend};
use crate::scene::{Material, PointLight, Quality, SceneSnapshot};
use crate::util::{mix_vec, random_in_unit_sphere, vec4_to_rgba};

pub use capture::{frame_path, save_png, CaptureError};
pub use skybox::{ResourceError, Skybox};

mod capture;
mod skybox;

cfg_if! {
    if #[cfg(target_arch = "wasm32")] {
        use web_time::Instant;
    } else {
        use std::time::Instant;
    }
}

const SURFACE_OFFSET: f32 = 1e-3;
// 이 간격으로 줄을 건너뛰며 그림. 패스가 중간에 끊겨도 화면 전체가 골고루 갱신됨
const ROW_STRIDE: u32 = 8;
const SELECTION_TINT: f32 = 0.2;

// 누적 패스 안에서 줄을 그리는 순서. 0, 8, 16, ..., 1, 9, 17, ...
#[derive(Debug, Clone, Copy)]
struct RowOrder {
    height: u32,
}

impl RowOrder {
    fn rows_in_phase(&self, phase: u32) -> u32 {
        if phase >= self.height {
            0
        } else {
            (self.height - phase + ROW_STRIDE - 1) / ROW_STRIDE
        }
    }

    fn position(&self, y: u32) -> u32 {
        let phase = y % ROW_STRIDE;
        let earlier: u32 = (0..phase).map(|p| self.rows_in_phase(p)).sum();
        earlier + y / ROW_STRIDE
    }
}

// CPU 경로 추적기. accumulation의 w에는 픽셀마다 더해진 패스 수가 들어감
pub struct Lumen {
    width: u32,
    height: u32,
    accumulation: Vec<Vector4<f32>>,
    // 첫 교차 오브젝트 번호. 선택 표시용, 아무것도 없으면 -1
    primary_hits: Vec<i32>,
    pub final_image_data: Vec<u32>,
    skybox: Option<Skybox>,
    // 한 번의 누적 제출에 쓸 수 있는 시간. None이면 패스를 끝까지 그림
    frame_budget: Option<Duration>,
    // 시간을 확인하기 전에 한 번에 그리는 줄 수
    band_rows: u32,
    // 진행 중인 패스에서 다음에 그릴 줄의 RowOrder 위치
    pass_cursor: u32,
}

impl Lumen {
    pub fn new(width: u32, height: u32) -> Self {
        let pixels = (width * height) as usize;
        Self {
            width,
            height,
            accumulation: vec![Vector4::zeros(); pixels],
            primary_hits: vec![-1; pixels],
            // 불투명한 검은색
            final_image_data: vec![0xFF00_0000; pixels],
            skybox: None,
            frame_budget: None,
            band_rows: rayon::current_num_threads().max(1) as u32,
            pass_cursor: 0,
        }
    }

    pub fn with_frame_budget(mut self, frame_budget: Option<Duration>) -> Self {
        self.frame_budget = frame_budget;
        self
    }

    pub fn rgba(&self) -> &[u8] {
        cast_slice(&self.final_image_data)
    }

    pub fn skybox(&self) -> Option<&Skybox> {
        self.skybox.as_ref()
    }

    pub fn set_skybox(&mut self, skybox: Option<Skybox>) {
        self.skybox = skybox;
    }

    fn accumulate(&mut self, scene: &SceneSnapshot<'_>, pass: &FramePass) -> PassProgress {
        if pass.discard {
            self.accumulation.iter_mut().for_each(|color| *color = Vector4::zeros());
            self.primary_hits.iter_mut().for_each(|hit| *hit = -1);
            self.pass_cursor = 0;
        }

        let tracer = Tracer {
            scene,
            skybox: self.skybox.as_ref(),
            camera: &pass.camera,
            width: self.width,
            height: self.height,
            samples: pass.samples.max(1),
        };
        let width = self.width as usize;
        let order = RowOrder { height: self.height };
        let started = Instant::now();

        while self.pass_cursor < self.height {
            let band = self.pass_cursor..(self.pass_cursor + self.band_rows).min(self.height);

            self.accumulation
                .par_chunks_mut(width)
                .zip(self.primary_hits.par_chunks_mut(width))
                .enumerate()
                .filter(|(y, _)| band.contains(&order.position(*y as u32)))
                .for_each(|(y, (colors, hits))| {
                    let mut rng = rand::thread_rng();
                    for (x, (color, hit)) in colors.iter_mut().zip(hits.iter_mut()).enumerate() {
                        let (sample, first_hit) = tracer.per_pixel(x as u32, y as u32, &mut rng);
                        *color += sample;
                        *hit = first_hit;
                    }
                });

            self.pass_cursor = band.end;
            if self.frame_budget.map_or(false, |budget| started.elapsed() >= budget) {
                break;
            }
        }

        if self.pass_cursor < self.height {
            return PassProgress::Partial;
        }
        self.pass_cursor = 0;
        PassProgress::Complete
    }

    fn composite(&mut self, scene: &SceneSnapshot<'_>) -> PassProgress {
        let selected = scene.selected_index();
        let quality = scene.quality;

        // 아직 한 번도 안 그린 픽셀은 None. 화면엔 이전 값을 그대로 둠
        let averaged: Vec<Option<Vector3<f32>>> = self
            .accumulation
            .par_iter()
            .map(|sum| (sum.w > 0.0).then(|| sum.xyz() / sum.w))
            .collect();
        let glow = self.bloom(&averaged, quality);

        self.final_image_data
            .par_iter_mut()
            .zip(averaged.par_iter())
            .zip(self.primary_hits.par_iter())
            .enumerate()
            .for_each(|(index, ((pixel, average), hit))| {
                let Some(average) = average else {
                    return;
                };

                let mut color = *average;
                if let Some(glow) = &glow {
                    color += glow[index] * quality.bloom_intensity;
                }
                if selected >= 0 && *hit == selected {
                    color = mix_vec(&color, &Vector3::new(1.0, 0.55, 0.1), SELECTION_TINT);
                }
                *pixel = vec4_to_rgba(&Vector4::new(color.x, color.y, color.z, 1.0));
            });

        PassProgress::Complete
    }

    // 1보다 밝은 부분만 뽑아서 가로, 세로로 번지게 함
    fn bloom(&self, averaged: &[Option<Vector3<f32>>], quality: &Quality) -> Option<Vec<Vector3<f32>>> {
        let radius = (quality.bloom_radius * self.width as f32).round() as usize;
        if quality.bloom_intensity <= 0.0 || radius == 0 {
            return None;
        }

        let bright: Vec<Vector3<f32>> = averaged
            .par_iter()
            .map(|average| average.map_or(Vector3::zeros(), |color| color.map(|channel| (channel - 1.0).max(0.0))))
            .collect();
        if bright.par_iter().all(|color| color.max() <= 0.0) {
            return None;
        }

        let (width, height) = (self.width as usize, self.height as usize);
        let window = (2 * radius + 1) as f32;

        let mut horizontal = vec![Vector3::zeros(); bright.len()];
        horizontal
            .par_chunks_mut(width)
            .zip(bright.par_chunks(width))
            .for_each(|(out, row)| {
                for (x, target) in out.iter_mut().enumerate() {
                    let span = x.saturating_sub(radius)..=(x + radius).min(width - 1);
                    *target = row[span].iter().fold(Vector3::zeros(), |sum, color| sum + color) / window;
                }
            });

        let mut glow = vec![Vector3::zeros(); bright.len()];
        glow.par_chunks_mut(width).enumerate().for_each(|(y, out)| {
            let rows = y.saturating_sub(radius)..=(y + radius).min(height - 1);
            for (x, target) in out.iter_mut().enumerate() {
                let sum = rows
                    .clone()
                    .fold(Vector3::zeros(), |sum, row| sum + horizontal[row * width + x]);
                *target = sum / window;
            }
        });

        Some(glow)
    }
}

impl RenderBackend for Lumen {
    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 || (self.width, self.height) == (width, height) {
            return;
        }

        *self = Self {
            skybox: self.skybox.take(),
            frame_budget: self.frame_budget,
            ..Self::new(width, height)
        };
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn submit(&mut self, scene: &SceneSnapshot<'_>, pass: &FramePass) -> PassProgress {
        if self.accumulation.is_empty() {
            return PassProgress::Complete;
        }

        match pass.mode {
            PassMode::Accumulate => self.accumulate(scene, pass),
            PassMode::DirectOutput => self.composite(scene),
        }
    }

    fn capture(&self, accumulated_passes: u32, path: &Path) -> Result<(), CaptureError> {
        save_png(&self.accumulation, self.width, self.height, accumulated_passes, path)?;
        info!("Saved {}", path.display());
        Ok(())
    }

    fn load_skybox(&mut self, path: &Path) -> Result<(), ResourceError> {
        let skybox = Skybox::from_path(path)?;
        let (width, height) = skybox.size();
        info!("Loaded skybox {} ({}x{})", skybox.name, width, height);
        self.skybox = Some(skybox);
        Ok(())
    }
}

// Cherno씨와 같은 디자인 선택, Hit는 빛의 경로에 대한 정보만 담고
// 이를 이용해 색상을 알아내는건 나중에 함
struct Hit<'a> {
    distance: f32,
    position: Point3<f32>,
    normal: Unit<Vector3<f32>>,
    material: &'a Material,
    object: Option<usize>,
}

struct Tracer<'a> {
    scene: &'a SceneSnapshot<'a>,
    skybox: Option<&'a Skybox>,
    camera: &'a CameraUniform,
    width: u32,
    height: u32,
    samples: u32,
}

impl Tracer<'_> {
    // DirectX의 RayGen 쉐이더와 같음
    fn per_pixel(&self, x: u32, y: u32, rng: &mut ThreadRng) -> (Vector4<f32>, i32) {
        let blur = self.scene.quality.blur;
        let mut color = Vector3::zeros();
        let mut first_hit = -1;

        for sample in 0..self.samples {
            let jitter = Vector2::new(rng.gen_range(-1.0f32..=1.0), rng.gen_range(-1.0f32..=1.0)) * blur;
            let uv = Vector2::new(
                (x as f32 + 0.5) / self.width as f32,
                1.0 - (y as f32 + 0.5) / self.height as f32,
            ) * 2.0
                - Vector2::new(1.0, 1.0)
                + jitter;

            let (radiance, hit) = self.trace_path(self.camera.ray(uv), rng);
            if sample == 0 {
                first_hit = hit.map_or(-1, |index| index as i32);
            }
            color += radiance;
        }

        color /= self.samples as f32;
        (Vector4::new(color.x, color.y, color.z, 1.0), first_hit)
    }

    fn trace_path(&self, mut ray: Ray, rng: &mut ThreadRng) -> (Vector3<f32>, Option<usize>) {
        let mut radiance = Vector3::zeros();
        let mut throughput = Vector3::repeat(1.0);
        let mut first_hit = None;

        for bounce in 0..self.scene.quality.light_bounces.max(1) {
            let Some(hit) = self.closest_hit(&ray) else {
                radiance += throughput.component_mul(&self.sky(&ray.direction));
                break;
            };
            if bounce == 0 {
                first_hit = hit.object;
            }

            let material = hit.material;
            let specular_chance = material.specular.mean().clamp(0.0, 1.0);

            radiance += throughput.component_mul(&material.emitted());
            // 그림자 샘플은 첫 교차에서만 여러 개 씀
            let shadow_samples = if bounce == 0 {
                self.scene.quality.shadow_resolution.max(1)
            } else {
                1
            };
            radiance += throughput.component_mul(&self.direct_light(&hit, &ray, specular_chance, shadow_samples, rng));

            // 표면에 딱 붙은 점에서 다시 쏘면 자기 자신과 부딪히니 조금 띄움
            let origin = hit.position + hit.normal.as_ref() * SURFACE_OFFSET;
            let diffuse = {
                let scattered = hit.normal.as_ref() + random_in_unit_sphere(rng);
                if scattered.magnitude_squared() < 1e-8 {
                    hit.normal.into_inner()
                } else {
                    scattered.normalize()
                }
            };

            if specular_chance > 0.0 && rng.gen::<f32>() < specular_chance {
                let reflected = reflect(&ray.direction, &hit.normal);
                let roughness = material.roughness * material.roughness;
                ray = Ray::new(origin, mix_vec(&reflected, &diffuse, roughness));
                throughput = throughput.component_mul(&material.specular) / specular_chance;
            } else {
                ray = Ray::new(origin, diffuse);
                throughput = throughput.component_mul(&material.albedo);
            }

            if throughput.max() < 1e-4 {
                break;
            }
        }

        (radiance, first_hit)
    }

    fn direct_light(
        &self,
        hit: &Hit<'_>,
        ray: &Ray,
        specular_chance: f32,
        shadow_samples: u32,
        rng: &mut ThreadRng,
    ) -> Vector3<f32> {
        let material = hit.material;
        let origin = hit.position + hit.normal.as_ref() * SURFACE_OFFSET;
        let mut light_sum = Vector3::zeros();

        for light in self.scene.lights {
            let to_light = light.position - origin;
            let distance = to_light.magnitude();
            if distance <= 0.0 || distance > light.reach {
                continue;
            }

            let direction = to_light / distance;
            let incidence = hit.normal.dot(&direction);
            if incidence <= 0.0 {
                continue;
            }

            let visibility = self.visibility(&origin, light, shadow_samples, rng);
            if visibility <= 0.0 {
                continue;
            }

            let falloff = light.power * (1.0 - distance / light.reach) * visibility;
            let diffuse = material.albedo * incidence * (1.0 - specular_chance);
            let reflected = reflect(&Unit::new_unchecked(-direction), &hit.normal);
            let highlight = material.specular_highlight
                * reflected.dot(&-ray.direction.into_inner()).max(0.0).powf(material.specular_exponent);

            light_sum += light.color.component_mul(&(diffuse + Vector3::repeat(highlight))) * falloff;
        }

        light_sum
    }

    // 광원 구 안의 임의의 점들을 겨눠서 가려지지 않은 비율을 구함. 부드러운 그림자
    fn visibility(&self, origin: &Point3<f32>, light: &PointLight, samples: u32, rng: &mut ThreadRng) -> f32 {
        let unblocked = (0..samples)
            .filter(|_| {
                let target = light.position + random_in_unit_sphere(rng) * light.radius;
                let to_target = target - origin;
                let distance = to_target.magnitude();
                if distance <= 0.0 {
                    return true;
                }

                let shadow_ray = Ray::new(*origin, to_target / distance);
                !self
                    .closest_hit(&shadow_ray)
                    .map_or(false, |blocker| blocker.distance < distance)
            })
            .count();

        unblocked as f32 / samples as f32
    }

    fn closest_hit(&self, ray: &Ray) -> Option<Hit<'_>> {
        let object_hit = pick(self.scene.objects, ray).map(|(index, distance)| {
            let object = &self.scene.objects[index];
            let position = ray.at(distance);
            Hit {
                distance,
                position,
                normal: object.normal_at(&position),
                material: &object.material,
                object: Some(index),
            }
        });

        let plane = self.scene.plane;
        let plane_hit = plane
            .visible
            .then(|| intersect_plane(&Vector3::y(), &Point3::origin(), ray))
            .flatten()
            .map(|distance| {
                // 바닥 아래에서 보면 법선을 뒤집음
                let normal = if ray.direction.y > 0.0 {
                    Unit::new_unchecked(-Vector3::y())
                } else {
                    Vector3::y_axis()
                };
                Hit {
                    distance,
                    position: ray.at(distance),
                    normal,
                    material: &plane.material,
                    object: None,
                }
            });

        match (object_hit, plane_hit) {
            (Some(object), Some(plane)) if plane.distance < object.distance => Some(plane),
            (Some(object), _) => Some(object),
            (None, plane) => plane,
        }
    }

    fn sky(&self, direction: &Unit<Vector3<f32>>) -> Vector3<f32> {
        let quality = self.scene.quality;
        match self.skybox {
            Some(skybox) => {
                skybox
                    .sample(direction)
                    .map(|channel| channel.max(0.0).powf(quality.skybox_gamma).min(quality.skybox_ceiling))
                    * quality.skybox_strength
            }
            None => {
                let t = 0.5 * (direction.y + 1.0);
                mix_vec(&Vector3::repeat(1.0), &Vector3::new(0.6, 0.7, 0.9), t) * quality.skybox_strength
            }
        }
    }
}

fn reflect(direction: &Unit<Vector3<f32>>, normal: &Unit<Vector3<f32>>) -> Vector3<f32> {
    let direction = direction.into_inner();
    let normal = normal.into_inner();
    direction - normal * (2.0 * direction.dot(&normal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraPose;
    use crate::config::Config;
    use crate::render_loop::RenderLoop;
    use crate::scene::{Object, Preset, Scene};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn pass(mode: PassMode, accumulated_passes: u32, aspect_ratio: f32) -> FramePass {
        FramePass {
            mode,
            accumulated_passes,
            discard: mode == PassMode::Accumulate && accumulated_passes == 0,
            samples: 1,
            camera: CameraPose::default().uniform(aspect_ratio),
            time: 0.0,
        }
    }

    fn lit_scene() -> Scene {
        let mut scene = Scene::new();
        scene.add_object(Object::sphere(Point3::new(0.0, 1.0, -1.0), 1.0, Material::default()));
        scene.add_light(PointLight::new(Point3::new(0.0, 5.0, 0.0), 0.5, Vector3::repeat(1.0), 1.0, 100.0));
        scene.edit_quality(|quality| quality.light_bounces = 2);
        scene
    }

    #[test]
    fn accumulate_then_composite_fills_the_display() {
        let scene = lit_scene();
        let mut lumen = Lumen::new(8, 6);

        lumen.submit(&scene.snapshot(), &pass(PassMode::Accumulate, 0, 8.0 / 6.0));
        lumen.submit(&scene.snapshot(), &pass(PassMode::DirectOutput, 1, 8.0 / 6.0));

        assert_eq!(lumen.rgba().len(), 8 * 6 * 4);
        assert!(lumen.final_image_data.iter().all(|pixel| pixel >> 24 == 0xFF));
        // 화면 가운데는 구
        assert_eq!(lumen.primary_hits[3 * 8 + 4], 0);
    }

    #[test]
    fn zero_accumulated_passes_discards_history() {
        let mut scene = Scene::new();
        scene.edit_plane(|plane| plane.visible = false);
        let mut lumen = Lumen::new(4, 4);

        for accumulated in 0..3 {
            lumen.submit(&scene.snapshot(), &pass(PassMode::Accumulate, accumulated, 1.0));
        }
        let after_three = lumen.accumulation[5];

        lumen.submit(&scene.snapshot(), &pass(PassMode::Accumulate, 0, 1.0));
        let restarted = lumen.accumulation[5];

        // 빈 하늘만 보이니 매 패스 같은 색이 더해짐
        assert!((after_three.w - 3.0).abs() < 1e-5);
        assert!((restarted.w - 1.0).abs() < 1e-5);
    }

    #[test]
    fn selected_object_is_tinted_in_composite() {
        let mut scene = lit_scene();
        let mut lumen = Lumen::new(8, 6);
        lumen.submit(&scene.snapshot(), &pass(PassMode::Accumulate, 0, 8.0 / 6.0));

        lumen.submit(&scene.snapshot(), &pass(PassMode::DirectOutput, 1, 8.0 / 6.0));
        let plain = lumen.final_image_data[3 * 8 + 4];

        scene.select(Some(0)).unwrap();
        lumen.submit(&scene.snapshot(), &pass(PassMode::DirectOutput, 1, 8.0 / 6.0));
        let tinted = lumen.final_image_data[3 * 8 + 4];

        assert_ne!(plain, tinted);
    }

    #[test]
    fn resize_keeps_skybox_and_clears_buffers() {
        let mut lumen = Lumen::new(4, 4);
        let sky = Skybox::from_pixels(1, 1, vec![Vector3::repeat(0.5)], "flat").unwrap();
        lumen.set_skybox(Some(sky));

        lumen.resize(6, 2);
        assert_eq!(lumen.size(), (6, 2));
        assert_eq!(lumen.accumulation.len(), 12);
        assert!(lumen.skybox().is_some());

        lumen.resize(0, 10);
        assert_eq!(lumen.size(), (6, 2));
    }

    #[test]
    fn flat_skybox_is_scaled_by_strength_and_ceiling() {
        let mut scene = Scene::new();
        scene.edit_plane(|plane| plane.visible = false);
        scene.edit_quality(|quality| {
            quality.skybox_gamma = 1.0;
            quality.skybox_strength = 0.5;
            quality.skybox_ceiling = 0.8;
        });
        let mut lumen = Lumen::new(2, 2);
        lumen.set_skybox(Some(Skybox::from_pixels(1, 1, vec![Vector3::new(0.4, 2.0, 1.0)], "flat").unwrap()));

        lumen.submit(&scene.snapshot(), &pass(PassMode::Accumulate, 0, 1.0));
        let color = lumen.accumulation[0];

        assert!((color.x - 0.2).abs() < 1e-5);
        assert!((color.y - 0.4).abs() < 1e-5);
        assert!((color.z - 0.4).abs() < 1e-5);
    }

    #[test]
    fn row_order_visits_every_row_once() {
        for height in [1, 7, 8, 10, 37] {
            let order = RowOrder { height };
            let mut positions: Vec<_> = (0..height).map(|y| order.position(y)).collect();
            positions.sort_unstable();
            assert_eq!(positions, (0..height).collect::<Vec<_>>());
        }

        let order = RowOrder { height: 10 };
        assert_eq!(order.position(0), 0);
        assert_eq!(order.position(8), 1);
        assert_eq!(order.position(1), 2);
        assert_eq!(order.position(9), 3);
    }

    #[test]
    fn exhausted_budget_stops_after_one_band() {
        let mut scene = Scene::new();
        scene.edit_plane(|plane| plane.visible = false);
        let mut lumen = Lumen::new(4, 10).with_frame_budget(Some(Duration::ZERO));
        lumen.band_rows = 3;

        let mut progress = vec![lumen.submit(&scene.snapshot(), &pass(PassMode::Accumulate, 0, 0.4))];
        let traced_rows = (0..10)
            .filter(|y| lumen.accumulation[*y as usize * 4].w > 0.0)
            .count();
        assert_eq!(traced_rows, 3);

        for _ in 0..3 {
            progress.push(lumen.submit(&scene.snapshot(), &pass(PassMode::Accumulate, 1, 0.4)));
        }
        assert_eq!(
            progress,
            vec![
                PassProgress::Partial,
                PassProgress::Partial,
                PassProgress::Partial,
                PassProgress::Complete
            ]
        );
        assert!(lumen.accumulation.iter().all(|color| (color.w - 1.0).abs() < 1e-6));
    }

    #[test]
    fn untraced_pixels_keep_their_last_color() {
        let mut scene = Scene::new();
        scene.edit_plane(|plane| plane.visible = false);
        let mut lumen = Lumen::new(2, 16).with_frame_budget(Some(Duration::ZERO));
        lumen.band_rows = 1;
        let stale = 0xFF12_3456;
        lumen.final_image_data.iter_mut().for_each(|pixel| *pixel = stale);

        lumen.submit(&scene.snapshot(), &pass(PassMode::Accumulate, 0, 0.125));
        lumen.submit(&scene.snapshot(), &pass(PassMode::DirectOutput, 0, 0.125));

        // 첫 줄만 그려짐
        assert_ne!(lumen.final_image_data[0], stale);
        assert!(lumen.final_image_data[2..].iter().all(|pixel| *pixel == stale));
    }

    #[test]
    fn default_budget_keeps_every_preset_frame_under_the_stall_threshold() {
        let config = Config::default();
        for preset in [Preset::Basic, Preset::MirrorSpheres, Preset::RandomSpheres] {
            let mut scene = Scene::from_preset(preset, &mut StdRng::seed_from_u64(3));
            let mut lumen = Lumen::new(160, 90).with_frame_budget(Some(config.frame_budget));
            let mut render_loop = RenderLoop::default();

            for _ in 0..2 {
                let started = std::time::Instant::now();
                render_loop.render(&mut scene, &mut lumen, 0.0);
                assert!(
                    started.elapsed() < config.stall_threshold,
                    "{:?} frame took {:?}",
                    preset,
                    started.elapsed()
                );
            }
        }
    }

    #[test]
    fn bloom_spreads_only_overexposed_light() {
        let mut quality = Quality {
            bloom_radius: 0.25,
            ..Default::default()
        };
        let lumen = Lumen::new(8, 8);

        let mut averaged = vec![Some(Vector3::repeat(0.5)); 64];
        assert!(lumen.bloom(&averaged, &quality).is_none());

        averaged[3 * 8 + 3] = Some(Vector3::repeat(6.0));
        let glow = lumen.bloom(&averaged, &quality).unwrap();
        // 반지름 2, 5x5 창
        assert!((glow[3 * 8 + 3].x - 5.0 / 25.0).abs() < 1e-5);
        assert!((glow[5 * 8 + 5].x - 5.0 / 25.0).abs() < 1e-5);
        assert_eq!(glow[7 * 8 + 7], Vector3::zeros());

        quality.bloom_intensity = 0.0;
        assert!(lumen.bloom(&averaged, &quality).is_none());
    }

    #[test]
    fn blocked_light_gives_zero_visibility() {
        let mut scene = Scene::new();
        scene.add_object(Object::sphere(Point3::new(0.0, 2.0, 0.0), 0.5, Material::default()));
        let light = PointLight::new(Point3::new(0.0, 5.0, 0.0), 0.1, Vector3::repeat(1.0), 1.0, 100.0);
        let snapshot = scene.snapshot();
        let camera = CameraPose::default().uniform(1.0);
        let tracer = Tracer {
            scene: &snapshot,
            skybox: None,
            camera: &camera,
            width: 1,
            height: 1,
            samples: 1,
        };
        let mut rng = rand::thread_rng();

        assert_eq!(tracer.visibility(&Point3::origin(), &light, 20, &mut rng), 0.0);
        assert_eq!(tracer.visibility(&Point3::new(3.0, 0.0, 0.0), &light, 20, &mut rng), 1.0);
    }

    #[test]
    fn reflect_flips_normal_component() {
        let reflected = reflect(&Unit::new_normalize(Vector3::new(1.0, -1.0, 0.0)), &Vector3::y_axis());
        assert!((reflected - Vector3::new(1.0, 1.0, 0.0).normalize()).magnitude() < 1e-6);
    }
}
