use std::fmt;
use std::str::FromStr;

use log::{info, warn};
use nalgebra::{Point3, Vector3};
use rand::Rng;

use super::{Material, Object, PointLight, Scene};
use crate::util::random_vec;

const RANDOM_SPHERE_COUNT: usize = 64;
const RANDOM_SHELL_RADIUS: f32 = 5.0;
// 자리가 안 나오면 무한히 돌지 않도록
const RANDOM_MAX_ATTEMPTS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Preset {
    #[default]
    Basic,
    MirrorSpheres,
    RandomSpheres,
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "basic" => Ok(Preset::Basic),
            "mirrors" | "mirror" => Ok(Preset::MirrorSpheres),
            "random" => Ok(Preset::RandomSpheres),
            other => Err(format!("unknown scene preset `{other}`")),
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Preset::Basic => "basic",
            Preset::MirrorSpheres => "mirrors",
            Preset::RandomSpheres => "random",
        };
        f.write_str(name)
    }
}

fn white() -> Vector3<f32> {
    Vector3::new(1.0, 1.0, 1.0)
}

fn reflective_floor() -> Material {
    Material::new(white(), Vector3::repeat(0.75), Vector3::zeros(), 0.0, 0.0, 0.0, 0.0)
}

fn overhead_light() -> PointLight {
    PointLight::new(Point3::new(0.0, 5.0, 0.0), 0.5, white(), 1.0, 100.0)
}

impl Scene {
    pub fn from_preset<R: Rng + ?Sized>(preset: Preset, rng: &mut R) -> Scene {
        let mut scene = Scene::new();
        match preset {
            Preset::Basic => scene.place_basic(),
            Preset::MirrorSpheres => scene.place_mirror_spheres(),
            Preset::RandomSpheres => scene.place_random_spheres(rng),
        }
        info!(
            "Loaded `{}` scene: {} objects, {} lights",
            preset,
            scene.objects().len(),
            scene.lights().len()
        );
        scene
    }

    fn place_basic(&mut self) {
        self.add_object(Object::sphere(
            Point3::new(0.0, 0.5, 0.0),
            0.5,
            Material::new(white(), Vector3::zeros(), Vector3::zeros(), 0.0, 1.0, 0.0, 0.0),
        ));
        self.edit_plane(|plane| plane.material = reflective_floor());
        self.add_light(overhead_light());
    }

    fn place_mirror_spheres(&mut self) {
        let mirror = Material::new(Vector3::zeros(), white(), Vector3::zeros(), 0.0, 0.2, 0.0, 0.0);
        for x in -4..=3 {
            for z in -4..=3 {
                self.add_object(Object::sphere(Point3::new(x as f32, 1.0, z as f32), 0.5, mirror));
            }
        }
        self.edit_plane(|plane| plane.material = reflective_floor());
        self.add_light(overhead_light());
    }

    // 반지름 5 정도의 껍질 위에 서로 겹치지 않는 구들을 흩뿌림
    fn place_random_spheres<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut placed = 0;
        let mut attempts = 0;

        while placed < RANDOM_SPHERE_COUNT && attempts < RANDOM_MAX_ATTEMPTS {
            attempts += 1;

            let radius = rng.gen_range(0.0..1.0f32);
            let direction = random_vec(rng, -0.5..0.5f32);
            if direction.magnitude_squared() < 1e-6 {
                continue;
            }
            let position = Point3::from(direction.normalize() * RANDOM_SHELL_RADIUS);

            let collides = self
                .objects()
                .iter()
                .any(|other| (other.position - position).magnitude() < radius + other.scale().x);
            if collides {
                continue;
            }

            let material = Material::new(
                random_vec(rng, 0.0..1.0f32),
                random_vec(rng, 0.0..1.0f32),
                Vector3::zeros(),
                0.0,
                rng.gen_range(0.0..1.0),
                0.0,
                0.0,
            );
            self.add_object(Object::sphere(position, radius, material));
            placed += 1;
        }

        if placed < RANDOM_SPHERE_COUNT {
            warn!("Only placed {placed}/{RANDOM_SPHERE_COUNT} random spheres");
        }

        self.add_object(Object::sphere(Point3::new(0.0, 1.0, 0.0), 1.0, Material::diffuse(white())));
        self.add_light(overhead_light());
        self.edit_plane(|plane| plane.visible = false);
    }
}
