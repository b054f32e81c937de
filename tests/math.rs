use approx::{assert_abs_diff_eq, assert_relative_eq};

use hikari::math::{
    simd::{hit_slab_reference, Bounds3x4, Bounds3x8, RayPack4, RayPack8},
    Bounds3, Matrix4x4, Onb, Ray, Vector3, XorShift128,
};

fn random_vector(rng: &mut XorShift128, scale: f32) -> Vector3 {
    Vector3::new(
        (rng.next_f32() - 0.5) * scale,
        (rng.next_f32() - 0.5) * scale,
        (rng.next_f32() - 0.5) * scale,
    )
}

fn random_bounds(rng: &mut XorShift128) -> Bounds3 {
    Bounds3::new(random_vector(rng, 10.0), random_vector(rng, 10.0))
}

fn random_ray(rng: &mut XorShift128) -> Ray {
    let mut dir = random_vector(rng, 2.0);
    if dir.len() < 1e-3 {
        dir = Vector3::new(1.0, 0.0, 0.0);
    }
    Ray::new(random_vector(rng, 20.0), dir.normalized())
}

#[test]
fn bounds_default_is_merge_identity() {
    let empty = Bounds3::default();
    assert!(empty.is_empty());

    let b = Bounds3::new(Vector3::new(-1.0, 0.0, 2.0), Vector3::new(3.0, 1.0, 4.0));
    assert_eq!(empty.union_b(b), b);
    assert_eq!(b.union_b(empty), b);
    assert!(empty.union_b(empty).is_empty());
    assert!(!b.is_empty());
}

#[test]
fn bounds_union_point() {
    let b = Bounds3::default()
        .union_p(Vector3::new(1.0, 2.0, 3.0))
        .union_p(Vector3::new(-1.0, 0.0, 5.0));
    assert_eq!(b.mini, Vector3::new(-1.0, 0.0, 3.0));
    assert_eq!(b.maxi, Vector3::new(1.0, 2.0, 5.0));
}

#[test]
fn bounds_surface_area() {
    let b = Bounds3::new(Vector3::zeros(), Vector3::new(1.0, 2.0, 3.0));
    // 2 * (1*2 + 1*3 + 2*3)
    assert_abs_diff_eq!(b.surface_area(), 22.0);
}

#[test]
fn bounds_slab_hits() {
    let b = Bounds3::new(Vector3::new(-1.0, -1.0, -1.0), Vector3::new(1.0, 1.0, 1.0));

    let ray = Ray::new(Vector3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
    let inv_dir = Vector3::new(1.0 / ray.dir.x, 1.0 / ray.dir.y, 1.0 / ray.dir.z);
    assert!(b.intersect(ray, inv_dir));

    let (tmin, tmax) = b.intersections(ray).unwrap();
    assert_abs_diff_eq!(tmin, 4.0);
    assert_abs_diff_eq!(tmax, 6.0);

    // Axis-parallel ray outside the box divides by zero and still misses
    let ray = Ray::new(Vector3::new(5.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
    let inv_dir = Vector3::new(1.0 / ray.dir.x, 1.0 / ray.dir.y, 1.0 / ray.dir.z);
    assert!(!b.intersect(ray, inv_dir));

    // And inside the slab it hits
    let ray = Ray::new(Vector3::new(0.5, 0.5, 5.0), Vector3::new(0.0, 0.0, -1.0));
    let inv_dir = Vector3::new(1.0 / ray.dir.x, 1.0 / ray.dir.y, 1.0 / ray.dir.z);
    assert!(b.intersect(ray, inv_dir));
}

#[test]
fn packed_slab_matches_reference_4_wide() {
    let mut rng = XorShift128::new(0xb4da55);

    for _ in 0..1000 {
        let bounds = [
            random_bounds(&mut rng),
            random_bounds(&mut rng),
            random_bounds(&mut rng),
            random_bounds(&mut rng),
        ];
        let ray = random_ray(&mut rng);

        let mask = Bounds3x4::from_bounds(bounds).hit(&RayPack4::splat(ray));
        for (lane, b) in bounds.iter().enumerate() {
            assert_eq!(
                mask & (1 << lane) != 0,
                hit_slab_reference(*b, ray),
                "lane {} disagrees for {:?} {:?}",
                lane,
                b,
                ray
            );
        }
    }
}

#[test]
fn packed_slab_matches_reference_8_wide() {
    let mut rng = XorShift128::new(0x8b17);

    for _ in 0..1000 {
        let bounds = [
            random_bounds(&mut rng),
            random_bounds(&mut rng),
            random_bounds(&mut rng),
            random_bounds(&mut rng),
            random_bounds(&mut rng),
            random_bounds(&mut rng),
            random_bounds(&mut rng),
            random_bounds(&mut rng),
        ];
        let ray = random_ray(&mut rng);

        let mask = Bounds3x8::from_bounds(bounds).hit(&RayPack8::splat(ray));
        for (lane, b) in bounds.iter().enumerate() {
            assert_eq!(
                mask & (1 << lane) != 0,
                hit_slab_reference(*b, ray),
                "lane {} disagrees for {:?} {:?}",
                lane,
                b,
                ray
            );
        }
    }
}

#[test]
fn packed_slab_axis_parallel_lanes() {
    // Zero direction components exercise the infinity handling in every lane
    let bounds = [
        Bounds3::new(Vector3::new(-1.0, -1.0, -1.0), Vector3::new(1.0, 1.0, 1.0)),
        Bounds3::new(Vector3::new(4.0, -1.0, -1.0), Vector3::new(6.0, 1.0, 1.0)),
        Bounds3::new(Vector3::new(-1.0, 4.0, -1.0), Vector3::new(1.0, 6.0, 1.0)),
        Bounds3::new(Vector3::new(-6.0, -1.0, -1.0), Vector3::new(-4.0, 1.0, 1.0)),
    ];
    let ray = Ray::new(Vector3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));

    let mask = Bounds3x4::from_bounds(bounds).hit(&RayPack4::splat(ray));
    for (lane, b) in bounds.iter().enumerate() {
        assert_eq!(mask & (1 << lane) != 0, hit_slab_reference(*b, ray));
    }
    assert_eq!(mask & 0b1, 0b1);
    assert_eq!(mask & 0b1110, 0);
}

#[test]
fn onb_is_orthonormal() {
    let mut rng = XorShift128::new(7);
    let mut axes = vec![
        Vector3::new(1.0, 0.0, 0.0),
        Vector3::new(0.0, 1.0, 0.0),
        Vector3::new(0.0, 0.0, 1.0),
        // The near-parallel band that broke the old fixed fallback axis
        Vector3::new(1.0, 0.005, 0.0),
        Vector3::new(-1.0, 0.0, 0.005),
    ];
    for _ in 0..100 {
        axes.push(random_vector(&mut rng, 2.0).normalized());
    }

    for w in axes {
        let onb = Onb::from_w(w);
        assert_abs_diff_eq!(onb.u.len(), 1.0, epsilon = 1e-3);
        assert_abs_diff_eq!(onb.v.len(), 1.0, epsilon = 1e-3);
        assert_abs_diff_eq!(onb.w.len(), 1.0, epsilon = 1e-3);
        assert_abs_diff_eq!(onb.u.dot(onb.v), 0.0, epsilon = 1e-3);
        assert_abs_diff_eq!(onb.u.dot(onb.w), 0.0, epsilon = 1e-3);
        assert_abs_diff_eq!(onb.v.dot(onb.w), 0.0, epsilon = 1e-3);
        // Right-handed
        let cross = onb.u.cross(onb.v);
        assert_abs_diff_eq!(cross.x, onb.w.x, epsilon = 1e-3);
        assert_abs_diff_eq!(cross.y, onb.w.y, epsilon = 1e-3);
        assert_abs_diff_eq!(cross.z, onb.w.z, epsilon = 1e-3);
    }
}

#[test]
fn matrix_inverse_roundtrip() {
    let m = Matrix4x4::new([
        [0.0, 2.0, 0.0, 0.0],
        [-1.0, 0.0, 0.0, 0.0],
        [0.0, 0.0, 3.0, 0.0],
        [4.0, 5.0, 6.0, 1.0],
    ]);
    let inv = m.inverted().unwrap();
    let id = m.mul(&inv);
    for (i, row) in id.m.iter().enumerate() {
        for (j, &value) in row.iter().enumerate() {
            let expected = if i == j { 1.0 } else { 0.0 };
            assert_abs_diff_eq!(value, expected, epsilon = 1e-5);
        }
    }

    let singular = Matrix4x4::new([
        [1.0, 0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]);
    assert!(singular.inverted().is_none());
}

#[test]
fn matrix_transforms() {
    // Row-vector convention, translation on the last row
    let translation = Matrix4x4::translation(Vector3::new(1.0, 2.0, 3.0));
    let p = translation.transform_coord(Vector3::new(1.0, 1.0, 1.0));
    assert_eq!(p, Vector3::new(2.0, 3.0, 4.0));

    // Directions ignore translation
    let d = translation.transform_dir(Vector3::new(0.0, 0.0, 1.0));
    assert_eq!(d, Vector3::new(0.0, 0.0, 1.0));

    // Quarter turn around y swings +x onto -z
    let rotation = Matrix4x4::rotation_y(std::f32::consts::FRAC_PI_2);
    let d = rotation.transform_dir(Vector3::new(1.0, 0.0, 0.0));
    assert_abs_diff_eq!(d.x, 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(d.z, -1.0, epsilon = 1e-6);

    let s = Matrix4x4::scaling(Vector3::new(2.0, 3.0, 4.0))
        .transform_coord(Vector3::new(1.0, 1.0, 1.0));
    assert_eq!(s, Vector3::new(2.0, 3.0, 4.0));
}

#[test]
fn xorshift_uniform() {
    for seed in [1u32, 123_456, 0xdead_beef, 0] {
        let mut rng = XorShift128::new(seed);
        let mut sum = 0.0f64;
        const N: usize = 100_000;
        for _ in 0..N {
            let v = rng.next_f32();
            assert!((0.0..1.0).contains(&v), "{} out of [0,1)", v);
            sum += v as f64;
        }
        let mean = sum / N as f64;
        assert_relative_eq!(mean, 0.5, epsilon = 1e-2);
    }
}

#[test]
fn xorshift_streams_differ() {
    let mut a = XorShift128::new(1);
    let mut b = XorShift128::new(1001);
    let matches = (0..100).filter(|_| a.next_u32() == b.next_u32()).count();
    assert!(matches < 100);
}
