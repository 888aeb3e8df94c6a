use nalgebra::{Point3, Unit, Vector3};

// 평면과 거의 평행한 레이, 그리고 시작점에 딱 붙은 교차는 무시함
pub const PLANE_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point3<f32>,
    pub direction: Unit<Vector3<f32>>,
}

impl Ray {
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Self {
        Self {
            origin,
            direction: Unit::new_normalize(direction),
        }
    }

    pub fn at(&self, distance: f32) -> Point3<f32> {
        self.origin + self.direction.into_inner() * distance
    }
}

// 중심을 레이 위로 투영해서 레이와 중심 사이의 수직 거리를 구함.
// 그 거리가 반지름보다 작으면 가까운 쪽 교점까지의 거리를 돌려줌.
pub fn intersect_sphere(center: &Point3<f32>, radius: f32, ray: &Ray) -> Option<f32> {
    let t = (center - ray.origin).dot(&ray.direction.into_inner());
    let projected = ray.at(t);

    let y = (center - projected).magnitude();
    if y >= radius {
        return None;
    }

    let x = (radius * radius - y * y).sqrt();
    let near = t - x;

    // 교점이 시작점 뒤에 있으면 안 맞은걸로 침
    (near > 0.0).then_some(near)
}

// center ± size / 2 상자와의 (진입, 탈출) 거리. 원점이 안에 있으면 진입이 음수
pub fn slab_interval(center: &Point3<f32>, size: &Vector3<f32>, ray: &Ray) -> (f32, f32) {
    let half = size / 2.0;
    let box_min = center - half;
    let box_max = center + half;

    let direction = ray.direction.into_inner();
    let t0s = (box_min - ray.origin).component_div(&direction);
    let t1s = (box_max - ray.origin).component_div(&direction);

    let smaller = t0s.zip_map(&t1s, f32::min);
    let bigger = t0s.zip_map(&t1s, f32::max);

    let entry = smaller.iter().fold(f32::NEG_INFINITY, |acc, &t| acc.max(t));
    let exit = bigger.iter().fold(f32::INFINITY, |acc, &t| acc.min(t));

    (entry, exit)
}

pub fn intersect_box(center: &Point3<f32>, size: &Vector3<f32>, ray: &Ray) -> Option<f32> {
    let (entry, exit) = slab_interval(center, size, ray);
    (entry >= 0.0 && entry <= exit).then_some(entry)
}

pub fn intersect_plane(normal: &Vector3<f32>, point: &Point3<f32>, ray: &Ray) -> Option<f32> {
    let denominator = normal.dot(&ray.direction.into_inner());
    if denominator.abs() <= PLANE_EPSILON {
        return None;
    }

    let distance = (point - ray.origin).dot(normal) / denominator;
    (distance >= PLANE_EPSILON).then_some(distance)
}

// 교점이 어느 면 위에 있는지는 중심에서 가장 멀리 떨어진 축으로 판단
pub fn box_normal(center: &Point3<f32>, size: &Vector3<f32>, point: &Point3<f32>) -> Unit<Vector3<f32>> {
    let local = (point - center).component_div(&(size / 2.0));
    let axis = local.iamax();

    let mut normal = Vector3::zeros();
    normal[axis] = local[axis].signum();
    Unit::new_unchecked(normal)
}

pub fn sphere_normal(center: &Point3<f32>, point: &Point3<f32>) -> Unit<Vector3<f32>> {
    Unit::new_normalize(point - center)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sphere_hit_through_center_is_distance_minus_radius() {
        let center = Point3::origin();
        let origins = [
            Point3::new(0.0, 0.0, 5.0),
            Point3::new(-3.0, 0.0, 0.0),
            Point3::new(2.0, 2.0, 1.0),
            Point3::new(-1.5, 4.0, -2.5),
        ];

        for origin in origins {
            let ray = Ray::new(origin, center - origin);
            let distance = intersect_sphere(&center, 0.75, &ray).unwrap();
            assert_relative_eq!(distance, (center - origin).magnitude() - 0.75, epsilon = 1e-5);
        }
    }

    #[test]
    fn sphere_behind_origin_misses() {
        let ray = Ray::new(Point3::new(0.0, 0.0, 5.0), Vector3::z());
        assert_eq!(intersect_sphere(&Point3::origin(), 1.0, &ray), None);
    }

    #[test]
    fn sphere_grazing_ray_misses() {
        let ray = Ray::new(Point3::new(1.0, 0.0, 5.0), -Vector3::z());
        assert_eq!(intersect_sphere(&Point3::origin(), 1.0, &ray), None);
    }

    #[test]
    fn origin_inside_sphere_is_rejected() {
        let ray = Ray::new(Point3::origin(), Vector3::x());
        assert_eq!(intersect_sphere(&Point3::origin(), 1.0, &ray), None);
    }

    #[test]
    fn box_entry_is_distance_to_near_face_along_each_axis() {
        let center = Point3::new(1.0, 2.0, 3.0);
        let size = Vector3::new(2.0, 4.0, 6.0);

        let cases = [
            (Vector3::x(), 10.0, 1.0),
            (Vector3::y(), 10.0, 2.0),
            (Vector3::z(), 10.0, 3.0),
            (-Vector3::x(), 7.0, 1.0),
        ];

        for (axis, offset, half) in cases {
            let origin = center + axis * offset;
            let ray = Ray::new(origin, -axis);
            let entry = intersect_box(&center, &size, &ray).unwrap();
            assert_relative_eq!(entry, offset - half, epsilon = 1e-5);
        }
    }

    #[test]
    fn box_reports_negative_entry_from_inside_but_no_hit() {
        let center = Point3::origin();
        let size = Vector3::new(2.0, 2.0, 2.0);
        let ray = Ray::new(Point3::origin(), Vector3::x());

        let (entry, exit) = slab_interval(&center, &size, &ray);
        assert_relative_eq!(entry, -1.0);
        assert_relative_eq!(exit, 1.0);
        assert_eq!(intersect_box(&center, &size, &ray), None);
    }

    #[test]
    fn box_miss_beside_the_box() {
        let ray = Ray::new(Point3::new(5.0, 0.0, 5.0), -Vector3::z());
        assert_eq!(intersect_box(&Point3::origin(), &Vector3::repeat(1.0), &ray), None);
    }

    #[test]
    fn plane_parallel_ray_is_no_intersection() {
        let ray = Ray::new(Point3::new(0.0, 1.0, 0.0), Vector3::x());
        assert_eq!(intersect_plane(&Vector3::y(), &Point3::origin(), &ray), None);
    }

    #[test]
    fn plane_hit_distance() {
        let ray = Ray::new(Point3::new(0.0, 2.0, 0.0), Vector3::new(0.0, -1.0, 1.0));
        let distance = intersect_plane(&Vector3::y(), &Point3::origin(), &ray).unwrap();
        assert_relative_eq!(ray.at(distance).y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(distance, 2.0 * 2.0f32.sqrt(), epsilon = 1e-5);
    }

    #[test]
    fn plane_behind_or_at_origin_misses() {
        let away = Ray::new(Point3::new(0.0, 1.0, 0.0), Vector3::y());
        assert_eq!(intersect_plane(&Vector3::y(), &Point3::origin(), &away), None);

        let touching = Ray::new(Point3::origin(), -Vector3::y());
        assert_eq!(intersect_plane(&Vector3::y(), &Point3::origin(), &touching), None);
    }

    #[test]
    fn box_normal_picks_dominant_face() {
        let normal = box_normal(&Point3::origin(), &Vector3::new(2.0, 2.0, 2.0), &Point3::new(0.2, -1.0, 0.3));
        assert_eq!(normal.into_inner(), -Vector3::y());
    }
}
