use approx::{assert_abs_diff_eq, assert_relative_eq};

use hikari::{
    materials::{Lambert, Material, Mirror, Phong, Refract, ShadingArg},
    math::{reflect, Vector2, Vector3, XorShift128},
};

fn random_direction(rng: &mut XorShift128) -> Vector3 {
    loop {
        let v = Vector3::new(
            rng.next_f32() * 2.0 - 1.0,
            rng.next_f32() * 2.0 - 1.0,
            rng.next_f32() * 2.0 - 1.0,
        );
        if v.len_sqr() > 1e-4 && v.len_sqr() < 1.0 {
            return v.normalized();
        }
    }
}

fn materials() -> Vec<Box<dyn Material>> {
    let albedo = Vector3::new(0.7, 0.5, 0.3);
    let black = Vector3::zeros();
    vec![
        Box::new(Lambert::new(albedo, black, None)),
        Box::new(Mirror::new(albedo, black, None)),
        Box::new(Refract::new(albedo, black, 1.5, None)),
        Box::new(Phong::new(albedo, black, 32.0, None)),
    ]
}

#[test]
fn shade_weights_are_non_negative() {
    let mut rng = XorShift128::new(0xfeed);

    for material in materials() {
        for _ in 0..10_000 {
            let normal = random_direction(&mut rng);
            let input = random_direction(&mut rng);
            let mut arg = ShadingArg::new(input, normal, Vector2::zeros(), &mut rng);
            let weight = material.shade(&mut arg);

            assert!(
                weight.x >= 0.0 && weight.y >= 0.0 && weight.z >= 0.0,
                "negative weight {:?}",
                weight
            );
            assert!(arg.pdf >= 0.0);
            assert_abs_diff_eq!(arg.output.len(), 1.0, epsilon = 1e-3);
        }
    }
}

#[test]
fn lambert_integrates_to_albedo() {
    // The shade weight of a cosine-sampled Lambert lobe is an unbiased
    // one-sample estimate of the directional-hemispherical reflectance
    let albedo = Vector3::new(0.6, 0.4, 0.2);
    let material = Lambert::new(albedo, Vector3::zeros(), None);
    let normal = Vector3::new(0.0, 1.0, 0.0);
    let input = Vector3::new(0.3, -0.8, 0.1).normalized();

    let mut rng = XorShift128::new(42);
    let mut sum = Vector3::zeros();
    const N: usize = 1_000_000;
    for _ in 0..N {
        let mut arg = ShadingArg::new(input, normal, Vector2::zeros(), &mut rng);
        sum += material.shade(&mut arg);
        // The sampled direction stays in the upper hemisphere
        assert!(arg.output.dot(normal) >= 0.0);
    }
    let mean = sum / N as f32;

    assert_relative_eq!(mean.x, albedo.x, max_relative = 0.01);
    assert_relative_eq!(mean.y, albedo.y, max_relative = 0.01);
    assert_relative_eq!(mean.z, albedo.z, max_relative = 0.01);
}

#[test]
fn lambert_pdf_is_cosine_over_pi() {
    let material = Lambert::new(Vector3::ones(), Vector3::zeros(), None);
    let normal = Vector3::new(0.0, 0.0, 1.0);
    let input = Vector3::new(0.0, 0.5, -1.0).normalized();

    let mut rng = XorShift128::new(7);
    for _ in 0..1000 {
        let mut arg = ShadingArg::new(input, normal, Vector2::zeros(), &mut rng);
        material.shade(&mut arg);
        let cos_theta = arg.output.dot(normal);
        assert_relative_eq!(
            arg.pdf,
            cos_theta * std::f32::consts::FRAC_1_PI,
            epsilon = 1e-4
        );
    }
}

#[test]
fn mirror_reflects() {
    let albedo = Vector3::new(0.9, 0.9, 0.9);
    let material = Mirror::new(albedo, Vector3::zeros(), None);
    assert!(material.is_delta());

    let normal = Vector3::new(0.0, 1.0, 0.0);
    let input = Vector3::new(1.0, -1.0, 0.0).normalized();

    let mut rng = XorShift128::new(1);
    let mut arg = ShadingArg::new(input, normal, Vector2::zeros(), &mut rng);
    let weight = material.shade(&mut arg);

    let expected = Vector3::new(1.0, 1.0, 0.0).normalized();
    assert_abs_diff_eq!(arg.output.x, expected.x, epsilon = 1e-6);
    assert_abs_diff_eq!(arg.output.y, expected.y, epsilon = 1e-6);
    assert_abs_diff_eq!(arg.output.z, expected.z, epsilon = 1e-6);
    assert_eq!(weight, albedo);
    assert_eq!(arg.pdf, 1.0);

    // Incoming and outgoing angles match against the surface
    assert_abs_diff_eq!(input.dot(normal), -arg.output.dot(normal), epsilon = 1e-6);
}

#[test]
fn refract_total_internal_reflection() {
    let albedo = Vector3::new(0.99, 0.99, 0.99);
    let material = Refract::new(albedo, Vector3::zeros(), 1.5, None);
    assert!(material.is_delta());

    // Grazing exit at 85 degrees from the inside, well past the critical
    // angle of a 1.5 ior medium
    let normal = Vector3::new(0.0, 1.0, 0.0);
    let theta = 85.0f32.to_radians();
    let input = Vector3::new(theta.sin(), theta.cos(), 0.0).normalized();

    let mut rng = XorShift128::new(1);
    let mut arg = ShadingArg::new(input, normal, Vector2::zeros(), &mut rng);
    let weight = material.shade(&mut arg);

    // The TIR branch is a pure reflection with the full albedo
    let expected = reflect(input, normal);
    assert_abs_diff_eq!(arg.output.x, expected.x, epsilon = 1e-6);
    assert_abs_diff_eq!(arg.output.y, expected.y, epsilon = 1e-6);
    assert_abs_diff_eq!(arg.output.z, expected.z, epsilon = 1e-6);
    assert_eq!(weight, albedo);
}

#[test]
fn refract_splits_both_ways() {
    let material = Refract::new(Vector3::ones(), Vector3::zeros(), 1.5, None);
    let normal = Vector3::new(0.0, 1.0, 0.0);
    let input = Vector3::new(0.3, -1.0, 0.0).normalized();

    let mut rng = XorShift128::new(0xa5a5);
    let mut reflected = 0;
    let mut transmitted = 0;
    for _ in 0..10_000 {
        let mut arg = ShadingArg::new(input, normal, Vector2::zeros(), &mut rng);
        material.shade(&mut arg);
        if arg.output.y > 0.0 {
            reflected += 1;
        } else {
            transmitted += 1;
        }
    }

    // Near-normal incidence on glass mostly transmits but the roulette
    // keeps a healthy reflected share
    assert!(reflected > 1000, "reflected {}", reflected);
    assert!(transmitted > 5000, "transmitted {}", transmitted);
}

#[test]
fn phong_lobe_hugs_the_reflection() {
    let material = Phong::new(Vector3::ones(), Vector3::zeros(), 1000.0, None);
    let normal = Vector3::new(0.0, 1.0, 0.0);
    let input = Vector3::new(1.0, -1.0, 0.0).normalized();
    let mirror_dir = reflect(input, normal);

    let mut rng = XorShift128::new(5);
    for _ in 0..1000 {
        let mut arg = ShadingArg::new(input, normal, Vector2::zeros(), &mut rng);
        material.shade(&mut arg);
        // With a huge exponent every sample lands close to the mirror
        // direction
        assert!(arg.output.dot(mirror_dir) > 0.9);
        assert!(arg.pdf > 0.0);
    }
}

#[test]
fn roulette_thresholds() {
    let black = Vector3::zeros();
    assert_abs_diff_eq!(
        Lambert::new(black, black, None).threshold(),
        1e-3,
        epsilon = 1e-9
    );
    assert_abs_diff_eq!(
        Lambert::new(Vector3::new(0.2, 0.9, 0.4), black, None).threshold(),
        0.9
    );
    // Clamped into a probability
    assert_abs_diff_eq!(
        Lambert::new(Vector3::new(3.0, 0.0, 0.0), black, None).threshold(),
        1.0
    );
}
