use nalgebra::{Vector3, Vector4};
use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::Rng;
use std::ops::RangeBounds;

pub fn random_vec<T, R, G>(rng: &mut G, range: R) -> Vector3<T>
where
    T: SampleUniform,
    R: RangeBounds<T> + SampleRange<T> + Clone,
    G: Rng + ?Sized,
{
    Vector3::new(
        rng.gen_range(range.clone()),
        rng.gen_range(range.clone()),
        rng.gen_range(range),
    )
}

// 단위 구 안의 임의의 점. 확산 반사 방향 뽑을 때 씀
pub fn random_in_unit_sphere<G: Rng + ?Sized>(rng: &mut G) -> Vector3<f32> {
    loop {
        let candidate = random_vec(rng, -1.0f32..1.0);
        if candidate.magnitude_squared() < 1.0 {
            return candidate;
        }
    }
}

// glm::mix와 같음. a == b면 t와 상관없이 정확히 a가 나옴
pub fn mix(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

pub fn mix_vec(a: &Vector3<f32>, b: &Vector3<f32>, t: f32) -> Vector3<f32> {
    a + (b - a) * t
}

// RGBA8을 u32 하나에 담음. little endian 기준으로 바이트 순서가 r, g, b, a
pub fn vec4_to_rgba(color: &Vector4<f32>) -> u32 {
    let channel = |value: f32| (value.clamp(0.0, 1.0) * 255.0) as u32;

    channel(color.x)
        | (channel(color.y) << 8)
        | (channel(color.z) << 16)
        | (channel(color.w) << 24)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn mix_of_equal_endpoints_is_exact() {
        for t in [0.0, 0.25, 0.5, 0.999, 1.0, 7.3] {
            assert_eq!(mix(1.2345, 1.2345, t), 1.2345);
        }
        let a = Vector3::new(0.1, 1.0, 2.0);
        assert_eq!(mix_vec(&a, &a, 0.37), a);
    }

    #[test]
    fn rgba_packing_clamps_channels() {
        let packed = vec4_to_rgba(&Vector4::new(1.0, 0.0, 2.0, -1.0));
        assert_eq!(packed.to_le_bytes(), [255, 0, 255, 0]);
    }

    #[test]
    fn unit_sphere_samples_stay_inside() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..256 {
            assert!(random_in_unit_sphere(&mut rng).magnitude() < 1.0);
        }
    }
}
