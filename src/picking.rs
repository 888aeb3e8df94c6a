use std::str::FromStr;

use log::info;
use nalgebra::{Point3, Vector2, Vector3};

use crate::camera::CameraPose;
use crate::geometry::{intersect_plane, Ray};
use crate::scene::{Material, Object, Scene, Shape};

// 복제한 오브젝트를 바닥 위 어디에 둘지 정하는 규칙
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlacementRule {
    // 중심을 세로 크기만큼 띄워서 바닥에 올려놓음
    #[default]
    RestOnGround,
    // 옛날 동작: (hit.y + type == 1) ? scale.x : scale.y / 2 를 그대로 높이로 씀
    Legacy,
}

impl PlacementRule {
    pub fn resting_height(self, hit_y: f32, shape: &Shape) -> f32 {
        match self {
            PlacementRule::RestOnGround => hit_y + shape.vertical_extent(),
            PlacementRule::Legacy => {
                let scale = shape.scale();
                if hit_y + shape.kind().tag() as f32 == 1.0 {
                    scale.x
                } else {
                    scale.y / 2.0
                }
            }
        }
    }
}

impl FromStr for PlacementRule {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "rest" => Ok(PlacementRule::RestOnGround),
            "legacy" => Ok(PlacementRule::Legacy),
            other => Err(format!("unknown placement rule `{other}`")),
        }
    }
}

// 이미지 좌표는 y가 아래로 자라고 월드는 위로 자라서 y를 뒤집음
pub fn screen_to_ray(mouse_x: f32, mouse_y: f32, screen_width: u32, screen_height: u32, camera: &CameraPose) -> Ray {
    let relative = Vector2::new(
        mouse_x / screen_width as f32,
        1.0 - mouse_y / screen_height as f32,
    );
    let centered = relative * 2.0 - Vector2::new(1.0, 1.0);
    let aspect_ratio = screen_width as f32 / screen_height as f32;

    camera.uniform(aspect_ratio).ray(centered)
}

// 거리가 같으면 번호가 작은 물체가 이김
pub fn pick(objects: &[Object], ray: &Ray) -> Option<(usize, f32)> {
    let mut closest: Option<(usize, f32)> = None;

    for (index, object) in objects.iter().enumerate() {
        let Some(distance) = object.intersect(ray) else {
            continue;
        };
        if distance <= 0.0 {
            continue;
        }

        match closest {
            Some((_, best)) if best <= distance => {}
            _ => closest = Some((index, distance)),
        }
    }

    closest
}

pub fn select_hovered(scene: &mut Scene, mouse_x: f32, mouse_y: f32, screen_width: u32, screen_height: u32) -> Option<usize> {
    let ray = screen_to_ray(mouse_x, mouse_y, screen_width, screen_height, scene.camera());
    let selection = pick(scene.objects(), &ray).map(|(index, _)| index);

    // pick이 돌려준 인덱스는 항상 범위 안이라 실패하지 않음
    scene.select(selection).ok()?;
    selection
}

fn default_placed_material() -> Material {
    Material::new(Vector3::repeat(1.0), Vector3::zeros(), Vector3::zeros(), 0.0, 1.0, 0.0, 0.0)
}

// 바닥 평면에 레이를 쏘고 맞은 자리에 새 오브젝트를 만듦
pub fn place_at_cursor(
    scene: &mut Scene,
    mouse_x: f32,
    mouse_y: f32,
    screen_width: u32,
    screen_height: u32,
    rule: PlacementRule,
) -> Option<usize> {
    let ray = screen_to_ray(mouse_x, mouse_y, screen_width, screen_height, scene.camera());
    let distance = intersect_plane(&Vector3::y(), &Point3::origin(), &ray)?;
    let hit = ray.at(distance);

    let object = match scene.selected_object() {
        Some(template) => {
            let mut clone = *template;
            clone.position = Point3::new(hit.x, rule.resting_height(hit.y, &template.shape), hit.z);
            clone
        }
        None => Object::sphere(Point3::new(hit.x, hit.y + 1.0, hit.z), 1.0, default_placed_material()),
    };

    let index = scene.add_object(object);
    info!(
        "Placed {:?} #{} at ({:.2}, {:.2}, {:.2})",
        object.kind(),
        index,
        object.position.x,
        object.position.y,
        object.position.z
    );
    Some(index)
}
