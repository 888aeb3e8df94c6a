use log::debug;
use thiserror::Error;

use crate::camera::CameraPose;

pub use object::{Material, Object, ObjectKind, Plane, PointLight, Shape};
pub use presets::Preset;

mod object;
pub mod presets;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SceneError {
    #[error("Object index {index} is out of range ({len} objects)")]
    ObjectOutOfRange { index: usize, len: usize },
    #[error("Light index {index} is out of range ({len} lights)")]
    LightOutOfRange { index: usize, len: usize },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quality {
    pub shadow_resolution: u32,
    pub light_bounces: u32,
    // 한 번의 패스에서 픽셀마다 뽑는 샘플 수
    pub frame_passes: u32,
    // 1픽셀도 안되는 살짝의 흐림 = 안티 에일리어싱
    pub blur: f32,
    pub bloom_radius: f32,
    pub bloom_intensity: f32,
    pub skybox_strength: f32,
    pub skybox_gamma: f32,
    pub skybox_ceiling: f32,
}

impl Default for Quality {
    fn default() -> Self {
        Self {
            shadow_resolution: 20,
            light_bounces: 5,
            frame_passes: 4,
            blur: 0.002,
            bloom_radius: 0.02,
            bloom_intensity: 0.5,
            skybox_strength: 1.0,
            skybox_gamma: 2.2,
            skybox_ceiling: 10.0,
        }
    }
}

// 장면 쓰기는 전부 여기 메서드를 거치고, 그림이 바뀌면 새로고침 플래그를 올림
#[derive(Debug, Clone)]
pub struct Scene {
    objects: Vec<Object>,
    lights: Vec<PointLight>,
    plane: Plane,
    quality: Quality,
    camera: CameraPose,
    selected: Option<usize>,
    refresh_required: bool,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            objects: vec![],
            lights: vec![],
            plane: Plane::default(),
            quality: Quality::default(),
            camera: CameraPose::default(),
            selected: None,
            // 첫 프레임은 무조건 버퍼를 비우고 시작
            refresh_required: true,
        }
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn objects(&self) -> &[Object] {
        &self.objects
    }

    pub fn lights(&self) -> &[PointLight] {
        &self.lights
    }

    pub fn plane(&self) -> &Plane {
        &self.plane
    }

    pub fn quality(&self) -> &Quality {
        &self.quality
    }

    pub fn camera(&self) -> &CameraPose {
        &self.camera
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_object(&self) -> Option<&Object> {
        self.selected.and_then(|index| self.objects.get(index))
    }

    // 추가만 되고 삭제는 없으니 기존 인덱스는 그대로 유효함
    pub fn add_object(&mut self, object: Object) -> usize {
        self.objects.push(object);
        self.refresh_required = true;
        self.objects.len() - 1
    }

    pub fn add_light(&mut self, light: PointLight) -> usize {
        self.lights.push(light);
        self.refresh_required = true;
        self.lights.len() - 1
    }

    // 선택은 렌더러의 선택 표시만 바꾸고 누적 버퍼는 건드리지 않음
    pub fn select(&mut self, selection: Option<usize>) -> Result<(), SceneError> {
        if let Some(index) = selection {
            self.check_object(index)?;
        }

        if self.selected != selection {
            debug!("Selection changed: {:?} -> {:?}", self.selected, selection);
        }
        self.selected = selection;
        Ok(())
    }

    pub fn edit_object<R>(&mut self, index: usize, edit: impl FnOnce(&mut Object) -> R) -> Result<R, SceneError> {
        self.check_object(index)?;
        let result = edit(&mut self.objects[index]);
        self.refresh_required = true;
        Ok(result)
    }

    pub fn toggle_shape(&mut self, index: usize) -> Result<ObjectKind, SceneError> {
        self.edit_object(index, |object| {
            object.shape = object.shape.toggled();
            object.kind()
        })
    }

    pub fn edit_light<R>(&mut self, index: usize, edit: impl FnOnce(&mut PointLight) -> R) -> Result<R, SceneError> {
        let len = self.lights.len();
        let light = self
            .lights
            .get_mut(index)
            .ok_or(SceneError::LightOutOfRange { index, len })?;
        let result = edit(light);
        self.refresh_required = true;
        Ok(result)
    }

    pub fn edit_plane<R>(&mut self, edit: impl FnOnce(&mut Plane) -> R) -> R {
        let result = edit(&mut self.plane);
        self.refresh_required = true;
        result
    }

    pub fn edit_quality<R>(&mut self, edit: impl FnOnce(&mut Quality) -> R) -> R {
        let result = edit(&mut self.quality);
        self.refresh_required = true;
        result
    }

    // 실제로 바뀌었을 때만 누적을 초기화함. 애니메이션이 같은 pose를 여러 패스 동안 유지하기 때문
    pub fn set_camera(&mut self, pose: CameraPose) {
        if self.camera != pose {
            self.camera = pose;
            self.refresh_required = true;
        }
    }

    pub fn request_refresh(&mut self) {
        self.refresh_required = true;
    }

    pub fn is_refresh_required(&self) -> bool {
        self.refresh_required
    }

    // 렌더 루프만 부름. 한 프레임 동안 쌓인 변경은 초기화 한 번으로 합쳐짐
    pub fn take_refresh(&mut self) -> bool {
        std::mem::take(&mut self.refresh_required)
    }

    pub fn snapshot(&self) -> SceneSnapshot<'_> {
        SceneSnapshot {
            objects: &self.objects,
            lights: &self.lights,
            plane: &self.plane,
            quality: &self.quality,
            camera: &self.camera,
            selected: self.selected,
        }
    }

    fn check_object(&self, index: usize) -> Result<(), SceneError> {
        if index < self.objects.len() {
            Ok(())
        } else {
            Err(SceneError::ObjectOutOfRange {
                index,
                len: self.objects.len(),
            })
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SceneSnapshot<'a> {
    pub objects: &'a [Object],
    pub lights: &'a [PointLight],
    pub plane: &'a Plane,
    pub quality: &'a Quality,
    pub camera: &'a CameraPose,
    pub selected: Option<usize>,
}

impl SceneSnapshot<'_> {
    // 셰이더는 아무것도 선택 안 됐을 때 -1을 받음
    pub fn selected_index(&self) -> i32 {
        self.selected.map_or(-1, |index| index as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Point3, Vector3};

    fn scene_with_sphere() -> Scene {
        let mut scene = Scene::new();
        scene.add_object(Object::sphere(Point3::new(0.0, 0.5, 0.0), 0.5, Material::default()));
        scene.take_refresh();
        scene
    }

    #[test]
    fn add_object_returns_sequential_indices() {
        let mut scene = Scene::new();
        let first = scene.add_object(Object::sphere(Point3::origin(), 1.0, Material::default()));
        let second = scene.add_object(Object::cuboid(Point3::origin(), Vector3::repeat(1.0), Material::default()));
        assert_eq!((first, second), (0, 1));
        assert_eq!(scene.objects()[1].kind(), ObjectKind::Box);
    }

    #[test]
    fn selection_rejects_bad_index_without_mutation() {
        let mut scene = scene_with_sphere();
        scene.select(Some(0)).unwrap();

        assert_eq!(scene.select(Some(3)), Err(SceneError::ObjectOutOfRange { index: 3, len: 1 }));
        assert_eq!(scene.selected(), Some(0));

        scene.select(None).unwrap();
        assert_eq!(scene.snapshot().selected_index(), -1);
    }

    #[test]
    fn selection_does_not_request_refresh() {
        let mut scene = scene_with_sphere();
        scene.select(Some(0)).unwrap();
        assert!(!scene.is_refresh_required());
    }

    #[test]
    fn every_edit_path_requests_refresh() {
        let mut scene = scene_with_sphere();
        scene.add_light(PointLight::new(Point3::origin(), 0.5, Vector3::repeat(1.0), 1.0, 100.0));
        assert!(scene.take_refresh());

        scene.edit_object(0, |object| object.material.roughness = 0.3).unwrap();
        assert!(scene.take_refresh());

        scene.edit_light(0, |light| light.power = 2.0).unwrap();
        assert!(scene.take_refresh());

        scene.edit_plane(|plane| plane.visible = false);
        assert!(scene.take_refresh());

        scene.edit_quality(|quality| quality.light_bounces = 2);
        assert!(scene.take_refresh());
        assert!(!scene.take_refresh());
    }

    #[test]
    fn failed_edit_leaves_flag_alone() {
        let mut scene = scene_with_sphere();
        assert!(scene.edit_object(5, |_| ()).is_err());
        assert!(scene.edit_light(0, |_| ()).is_err());
        assert!(!scene.is_refresh_required());
    }

    #[test]
    fn unchanged_camera_is_not_a_refresh() {
        let mut scene = scene_with_sphere();
        scene.set_camera(*scene.camera());
        assert!(!scene.is_refresh_required());

        let mut moved = *scene.camera();
        moved.yaw += 0.1;
        scene.set_camera(moved);
        assert!(scene.is_refresh_required());
    }

    #[test]
    fn toggle_shape_round_trip_is_min_based() {
        let mut scene = scene_with_sphere();
        assert_eq!(scene.toggle_shape(0), Ok(ObjectKind::Box));
        assert_eq!(scene.objects()[0].scale(), Vector3::new(1.0, 1.0, 1.0));
        assert_eq!(scene.toggle_shape(0), Ok(ObjectKind::Sphere));
        assert_eq!(scene.objects()[0].scale(), Vector3::new(0.5, 0.5, 0.5));
    }

    #[test]
    fn snapshot_reflects_latest_state() {
        let mut scene = scene_with_sphere();
        scene.edit_object(0, |object| object.position.x = 3.0).unwrap();
        let snapshot = scene.snapshot();
        assert_eq!(snapshot.objects[0].position.x, 3.0);
        assert_eq!(snapshot.camera, scene.camera());
    }
}
