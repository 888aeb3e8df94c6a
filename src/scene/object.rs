use nalgebra::{Point3, Unit, Vector3};

use crate::geometry::{box_normal, intersect_box, intersect_sphere, sphere_normal, Ray};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub albedo: Vector3<f32>,
    pub specular: Vector3<f32>,
    pub emission: Vector3<f32>,
    pub emission_strength: f32,
    pub roughness: f32,
    pub specular_highlight: f32,
    pub specular_exponent: f32,
}

impl Material {
    pub fn new(
        albedo: Vector3<f32>,
        specular: Vector3<f32>,
        emission: Vector3<f32>,
        emission_strength: f32,
        roughness: f32,
        specular_highlight: f32,
        specular_exponent: f32,
    ) -> Self {
        Self {
            albedo,
            specular,
            emission,
            emission_strength,
            roughness,
            specular_highlight,
            specular_exponent,
        }
    }

    // 색만 정하고 나머지는 거친 확산면
    pub fn diffuse(albedo: Vector3<f32>) -> Self {
        Self::new(albedo, Vector3::zeros(), Vector3::zeros(), 1.0, 1.0, 0.0, 0.5)
    }

    pub fn emitted(&self) -> Vector3<f32> {
        self.emission * self.emission_strength
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::diffuse(Vector3::new(1.0, 1.0, 1.0))
    }
}

// 셰이더 쪽 오브젝트 타입 번호와 같음. 0은 빈 슬롯이라 안 씀
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Sphere = 1,
    Box = 2,
}

impl ObjectKind {
    pub fn tag(self) -> u32 {
        self as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Sphere { radius: f32 },
    Box { half_extents: Vector3<f32> },
}

impl Shape {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Shape::Sphere { .. } => ObjectKind::Sphere,
            Shape::Box { .. } => ObjectKind::Box,
        }
    }

    // 셰이더에 넘기는 3칸짜리 scale. 구는 세 칸 모두 반지름, 박스는 전체 크기
    pub fn scale(&self) -> Vector3<f32> {
        match self {
            Shape::Sphere { radius } => Vector3::repeat(*radius),
            Shape::Box { half_extents } => half_extents * 2.0,
        }
    }

    // 구 -> 상자는 크기 2배, 상자 -> 구는 가장 작은 변의 절반. 직육면체는 되돌릴 수 없음
    pub fn toggled(&self) -> Shape {
        match self {
            Shape::Sphere { radius } => Shape::Box {
                half_extents: Vector3::repeat(*radius),
            },
            Shape::Box { .. } => Shape::Sphere {
                radius: self.scale().min() / 2.0,
            },
        }
    }

    // 바닥에 올려놓을 때 중심을 얼마나 띄워야 하는지
    pub fn vertical_extent(&self) -> f32 {
        match self {
            Shape::Sphere { radius } => *radius,
            Shape::Box { half_extents } => half_extents.y,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Object {
    pub position: Point3<f32>,
    pub shape: Shape,
    pub material: Material,
}

impl Object {
    pub fn sphere(position: Point3<f32>, radius: f32, material: Material) -> Self {
        Self {
            position,
            shape: Shape::Sphere { radius },
            material,
        }
    }

    pub fn cuboid(position: Point3<f32>, size: Vector3<f32>, material: Material) -> Self {
        Self {
            position,
            shape: Shape::Box {
                half_extents: size / 2.0,
            },
            material,
        }
    }

    pub fn kind(&self) -> ObjectKind {
        self.shape.kind()
    }

    pub fn scale(&self) -> Vector3<f32> {
        self.shape.scale()
    }

    pub fn intersect(&self, ray: &Ray) -> Option<f32> {
        match self.shape {
            Shape::Sphere { radius } => intersect_sphere(&self.position, radius, ray),
            Shape::Box { .. } => intersect_box(&self.position, &self.scale(), ray),
        }
    }

    pub fn normal_at(&self, point: &Point3<f32>) -> Unit<Vector3<f32>> {
        match self.shape {
            Shape::Sphere { .. } => sphere_normal(&self.position, point),
            Shape::Box { .. } => box_normal(&self.position, &self.scale(), point),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Point3<f32>,
    // 부드러운 그림자용 광원 크기
    pub radius: f32,
    pub color: Vector3<f32>,
    pub power: f32,
    // 이 거리 밖은 빛이 안 닿음
    pub reach: f32,
}

impl PointLight {
    pub fn new(position: Point3<f32>, radius: f32, color: Vector3<f32>, power: f32, reach: f32) -> Self {
        Self {
            position,
            radius,
            color,
            power,
            reach,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub material: Material,
    pub visible: bool,
}

impl Default for Plane {
    fn default() -> Self {
        Self {
            material: Material::default(),
            visible: true,
        }
    }
}
