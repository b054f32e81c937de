use hikari::{
    bvh::BvhSettings,
    math::{Ray, Vector3},
    shapes::{HitRecord, Mesh, Shape},
};

fn push_u32(bytes: &mut Vec<u8>, value: u32) {
    bytes.extend_from_slice(&value.to_le_bytes());
}

fn push_f32(bytes: &mut Vec<u8>, value: f32) {
    bytes.extend_from_slice(&value.to_le_bytes());
}

fn push_vertex(bytes: &mut Vec<u8>, pos: [f32; 3], nrm: [f32; 3], uv: [f32; 2]) {
    for v in pos.into_iter().chain(nrm).chain(uv) {
        push_f32(bytes, v);
    }
}

/// A two-triangle quad in the xy plane with one lambert material.
fn quad_mesh_bytes() -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"SMD0");
    push_u32(&mut bytes, 1); // version
    push_u32(&mut bytes, 6); // vertices
    push_u32(&mut bytes, 1); // materials
    push_u32(&mut bytes, 0); // textures
    push_u32(&mut bytes, 2); // triangles

    let nrm = [0.0, 0.0, 1.0];
    push_vertex(&mut bytes, [-1.0, -1.0, 0.0], nrm, [0.0, 0.0]);
    push_vertex(&mut bytes, [1.0, -1.0, 0.0], nrm, [1.0, 0.0]);
    push_vertex(&mut bytes, [1.0, 1.0, 0.0], nrm, [1.0, 1.0]);
    push_vertex(&mut bytes, [-1.0, -1.0, 0.0], nrm, [0.0, 0.0]);
    push_vertex(&mut bytes, [1.0, 1.0, 0.0], nrm, [1.0, 1.0]);
    push_vertex(&mut bytes, [-1.0, 1.0, 0.0], nrm, [0.0, 1.0]);

    // Lambert material
    push_u32(&mut bytes, 0);
    for v in [0.75f32, 0.5, 0.25] {
        push_f32(&mut bytes, v);
    }
    for _ in 0..3 {
        push_f32(&mut bytes, 0.0);
    }
    push_f32(&mut bytes, 1.5); // ior, unused by lambert
    push_f32(&mut bytes, 32.0); // shininess, unused by lambert
    push_u32(&mut bytes, 0); // no texture

    // Triangles, three consecutive vertices from the offset
    push_u32(&mut bytes, 0);
    push_u32(&mut bytes, 0);
    push_u32(&mut bytes, 3);
    push_u32(&mut bytes, 0);

    bytes
}

#[test]
fn loads_and_intersects_quad() {
    let path = std::env::temp_dir().join("hikari_mesh_test.smd");
    std::fs::write(&path, quad_mesh_bytes()).unwrap();

    let mesh = Mesh::load(&path, BvhSettings::default()).unwrap();
    assert_eq!(mesh.triangles().len(), 2);
    assert_eq!(mesh.materials().len(), 1);

    // Straight down the z axis into the quad
    let ray = Ray::new(Vector3::new(0.2, 0.3, 5.0), Vector3::new(0.0, 0.0, -1.0));
    let mut record = HitRecord::new();
    assert!(mesh.hit(&ray, &mut record));
    assert!((record.dist - 5.0).abs() < 1e-4);
    assert!((record.nrm.z - 1.0).abs() < 1e-4);
    // Barycentric uv interpolation maps the quad corners to [0,1]
    assert!((record.uv.x - 0.6).abs() < 1e-4);
    assert!((record.uv.y - 0.65).abs() < 1e-4);

    // And past the edge it misses
    let ray = Ray::new(Vector3::new(2.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
    let mut record = HitRecord::new();
    assert!(!mesh.hit(&ray, &mut record));

    std::fs::remove_file(&path).ok();
}

#[test]
fn rejects_bad_magic_and_version() {
    let path = std::env::temp_dir().join("hikari_mesh_bad_magic.smd");
    let mut bytes = quad_mesh_bytes();
    bytes[0] = b'X';
    std::fs::write(&path, &bytes).unwrap();
    assert!(Mesh::load(&path, BvhSettings::default()).is_err());

    let mut bytes = quad_mesh_bytes();
    bytes[4] = 99;
    std::fs::write(&path, &bytes).unwrap();
    assert!(Mesh::load(&path, BvhSettings::default()).is_err());

    std::fs::remove_file(&path).ok();
}

#[test]
fn missing_file_is_an_error() {
    let path = std::env::temp_dir().join("hikari_mesh_does_not_exist.smd");
    assert!(Mesh::load(&path, BvhSettings::default()).is_err());
}
