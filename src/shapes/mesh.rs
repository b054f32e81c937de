use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
    sync::Arc,
};

use log::{error, info};

use super::{HitRecord, MeshData, ShadowRecord, Shape, SurfaceSample, Triangle, Vertex};
use crate::{
    bvh::{BvhSettings, TriangleBvh},
    materials::{Lambert, Material, Mirror, Phong, Refract},
    math::{Vector2, Vector3, XorShift128},
};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

const MESH_MAGIC: [u8; 4] = *b"SMD0";
const MESH_VERSION: u32 = 1;

/// A triangle mesh with its own materials and acceleration structure.
pub struct Mesh {
    bvh: TriangleBvh,
    materials: Vec<Arc<dyn Material>>,
}

impl Mesh {
    /// Loads a binary mesh stream and builds its BVH.
    pub fn load(path: &Path, bvh_settings: BvhSettings) -> Result<Self> {
        let file = File::open(path).map_err(|why| {
            error!("Mesh file open failed. path = {}", path.display());
            why
        })?;
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != MESH_MAGIC {
            return Err("Invalid mesh file".into());
        }

        let version = read_u32(&mut reader)?;
        if version != MESH_VERSION {
            return Err(format!("Invalid mesh file version {}", version).into());
        }

        let vertex_count = read_u32(&mut reader)? as usize;
        let material_count = read_u32(&mut reader)? as usize;
        let texture_count = read_u32(&mut reader)? as usize;
        let triangle_count = read_u32(&mut reader)? as usize;
        if triangle_count == 0 {
            return Err("Mesh has no triangles".into());
        }

        let mut vertices = Vec::with_capacity(vertex_count);
        for _ in 0..vertex_count {
            vertices.push(Vertex {
                pos: read_vector3(&mut reader)?,
                nrm: read_vector3(&mut reader)?,
                uv: read_vector2(&mut reader)?,
            });
        }

        // Auxiliary textures are allowed to be missing, the materials fall
        // back to their flat colors
        let mut textures = Vec::with_capacity(texture_count);
        for _ in 0..texture_count {
            let tex_path = read_fixed_path(&mut reader)?;
            textures.push(match crate::textures::Texture::load(Path::new(&tex_path)) {
                Ok(texture) => Some(Arc::new(texture)),
                Err(why) => {
                    error!("Texture load failed. path = {} ({})", tex_path, why);
                    None
                }
            });
        }

        let mut materials: Vec<Arc<dyn Material>> = Vec::with_capacity(material_count);
        for _ in 0..material_count {
            let kind = read_u32(&mut reader)?;
            let color = read_vector3(&mut reader)?;
            let emissive = read_vector3(&mut reader)?;
            let ior = read_f32(&mut reader)?;
            let shininess = read_f32(&mut reader)?;
            let texture_index = read_u32(&mut reader)?;

            let texture = if texture_index == 0 {
                None
            } else {
                textures
                    .get(texture_index as usize - 1)
                    .cloned()
                    .flatten()
            };

            materials.push(match kind {
                0 => Arc::new(Lambert::new(color, emissive, texture)),
                1 => Arc::new(Mirror::new(color, emissive, texture)),
                2 => Arc::new(Refract::new(color, emissive, ior, texture)),
                3 => Arc::new(Phong::new(color, emissive, shininess, texture)),
                _ => return Err(format!("Unknown mesh material type {}", kind).into()),
            });
        }

        let data = Arc::new(MeshData { vertices });
        let mut triangles = Vec::with_capacity(triangle_count);
        for _ in 0..triangle_count {
            let vertex_offset = read_u32(&mut reader)?;
            let material_id = read_u32(&mut reader)? as usize;

            if vertex_offset as usize + 3 > data.vertices.len() {
                return Err(format!("Mesh triangle references vertex {}", vertex_offset).into());
            }
            let material = materials
                .get(material_id)
                .ok_or_else(|| format!("Mesh triangle references material {}", material_id))?;
            triangles.push(Triangle::new(
                Arc::clone(&data),
                [vertex_offset, vertex_offset + 1, vertex_offset + 2],
                Arc::clone(material),
            ));
        }

        info!(
            "Mesh: Loaded {} vertices, {} triangles from {}",
            vertex_count,
            triangle_count,
            path.display()
        );

        Ok(Self {
            bvh: TriangleBvh::new(triangles, bvh_settings),
            materials,
        })
    }

    /// Builds a mesh straight from parts, without the file roundtrip.
    pub fn from_parts(
        materials: Vec<Arc<dyn Material>>,
        triangles: Vec<Triangle>,
        bvh_settings: BvhSettings,
    ) -> Self {
        Self {
            bvh: TriangleBvh::new(triangles, bvh_settings),
            materials,
        }
    }

    pub fn materials(&self) -> &[Arc<dyn Material>] {
        &self.materials
    }

    pub fn triangles(&self) -> &[Triangle] {
        self.bvh.triangles()
    }
}

impl Shape for Mesh {
    fn hit<'a>(&'a self, ray: &crate::math::Ray, record: &mut HitRecord<'a>) -> bool {
        self.bvh.hit(ray, record)
    }

    fn shadow_hit<'a>(&'a self, ray: &crate::math::Ray, record: &mut ShadowRecord<'a>) -> bool {
        self.bvh.shadow_hit(ray, record)
    }

    fn sample(&self, rng: &mut XorShift128) -> SurfaceSample {
        let triangles = self.bvh.triangles();
        let index = (rng.next_u32() as usize) % triangles.len();
        let sample = triangles[index].sample(rng);
        SurfaceSample {
            pdf: sample.pdf / triangles.len() as f32,
            ..sample
        }
    }
}

fn read_u32<R: Read>(reader: &mut R) -> std::io::Result<u32> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes)?;
    Ok(u32::from_le_bytes(bytes))
}

fn read_f32<R: Read>(reader: &mut R) -> std::io::Result<f32> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes)?;
    Ok(f32::from_le_bytes(bytes))
}

fn read_vector2<R: Read>(reader: &mut R) -> std::io::Result<Vector2> {
    Ok(Vector2::new(read_f32(reader)?, read_f32(reader)?))
}

fn read_vector3<R: Read>(reader: &mut R) -> std::io::Result<Vector3> {
    Ok(Vector3::new(
        read_f32(reader)?,
        read_f32(reader)?,
        read_f32(reader)?,
    ))
}

fn read_fixed_path<R: Read>(reader: &mut R) -> Result<String> {
    let mut bytes = [0u8; 256];
    reader.read_exact(&mut bytes)?;
    let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    Ok(String::from_utf8(bytes[..len].to_vec())?)
}
