use std::{
    collections::HashMap,
    io::Read,
    path::{Path, PathBuf},
    sync::Arc,
};

use log::{debug, error, trace, warn};
use xml::{
    attribute::OwnedAttribute,
    reader::{EventReader, XmlEvent},
};

use super::{Result, Scene, SceneLoadSettings};
use crate::{
    camera::{Camera, CameraParameters, LensParameters},
    materials::{Lambert, Material, Mirror, Phong, Refract},
    math::{Matrix4x4, Vector3},
    shapes::{Mesh, Shape, ShapeInstance, Sphere},
    textures::Texture,
};

macro_rules! find_attr {
    ($attributes:expr, $name:expr) => {
        $attributes
            .iter()
            .find(|a| a.name.local_name == $name)
            .map(|a| a.value.as_str())
            .ok_or_else(|| format!("Missing attribute '{}'", $name))
    };
}

macro_rules! parse_attr {
    ($attributes:expr, $name:expr) => {
        find_attr!($attributes, $name)?
            .parse()
            .map_err(|_| format!("Malformed attribute '{}'", $name))
    };
}

macro_rules! parse_attr_or {
    ($attributes:expr, $name:expr, $default:expr) => {
        match $attributes.iter().find(|a| a.name.local_name == $name) {
            Some(a) => a
                .value
                .parse()
                .map_err(|_| format!("Malformed attribute '{}'", $name))?,
            None => $default,
        }
    };
}

#[derive(Default)]
struct TextureRec {
    id: u32,
    path: String,
}

struct MaterialRec {
    id: u32,
    color: Vector3,
    emissive: Vector3,
    ior: f32,
    shininess: f32,
    texture_id: u32,
}

struct SphereRec {
    id: u32,
    pos: Vector3,
    radius: f32,
    material_id: u32,
}

struct InstanceRec {
    world: Matrix4x4,
    shape_id: u32,
}

struct MeshRec {
    id: u32,
    path: String,
}

#[derive(Copy, Clone)]
enum MaterialVariant {
    Lambert,
    Mirror,
    Refract,
    Phong,
}

pub fn load(settings: &SceneLoadSettings) -> Result<Scene> {
    let dir_path = settings
        .path
        .parent()
        .map_or_else(PathBuf::new, Path::to_path_buf);
    let file = std::fs::File::open(&settings.path)
        .map_err(|why| format!("Opening '{}' failed: {}", settings.path.display(), why))?;
    let file_buf = std::io::BufReader::new(file);

    let mut width = 320u32;
    let mut height = 240u32;
    let mut samples = 512u32;
    let mut bvh_settings = settings.bvh;
    let mut ibl_path: Option<String> = None;
    let mut textures: Vec<TextureRec> = Vec::new();
    let mut materials: Vec<(MaterialVariant, MaterialRec)> = Vec::new();
    let mut spheres: Vec<SphereRec> = Vec::new();
    let mut instances: Vec<InstanceRec> = Vec::new();
    let mut meshes: Vec<MeshRec> = Vec::new();
    let mut camera_params: Option<CameraParameters> = None;

    let mut parser = EventReader::new(file_buf);
    let mut ignore_level: Option<u32> = None;
    loop {
        match parser.next()? {
            XmlEvent::StartElement {
                name, attributes, ..
            } => {
                trace!("Scene: Begin {}", name);

                if let Some(level) = ignore_level {
                    ignore_level = Some(level + 1);
                    continue;
                }

                match name.local_name.as_str() {
                    "scene" => {
                        width = parse_attr_or!(&attributes, "width", width);
                        height = parse_attr_or!(&attributes, "height", height);
                        samples = parse_attr_or!(&attributes, "samples", samples);
                        ibl_path = attributes
                            .iter()
                            .find(|a| a.name.local_name == "ibl_path")
                            .map(|a| a.value.clone());
                        // The document may pin the acceleration structure
                        bvh_settings.width =
                            parse_attr_or!(&attributes, "bvh_width", bvh_settings.width);
                        bvh_settings.split_method = parse_attr_or!(
                            &attributes,
                            "bvh_split",
                            bvh_settings.split_method
                        );
                        debug!(
                            "Scene: {} BVH with {} splits",
                            bvh_settings.width, bvh_settings.split_method
                        );
                    }
                    // Transparent grouping containers
                    "textures" | "lamberts" | "mirrors" | "refracts" | "phongs"
                    | "sphere_shapes" | "instance_shapes" | "mesh_shapes" | "cameras"
                    | "thin_lens_cameras" => (),
                    "texture" => {
                        textures.push(TextureRec {
                            id: parse_attr!(&attributes, "id")?,
                            path: find_attr!(&attributes, "path")?.into(),
                        });
                    }
                    "lambert" => {
                        materials.push((
                            MaterialVariant::Lambert,
                            parse_material(&mut parser, &name.local_name, &attributes)?,
                        ));
                    }
                    "mirror" => {
                        materials.push((
                            MaterialVariant::Mirror,
                            parse_material(&mut parser, &name.local_name, &attributes)?,
                        ));
                    }
                    "refract" => {
                        materials.push((
                            MaterialVariant::Refract,
                            parse_material(&mut parser, &name.local_name, &attributes)?,
                        ));
                    }
                    "phong" => {
                        materials.push((
                            MaterialVariant::Phong,
                            parse_material(&mut parser, &name.local_name, &attributes)?,
                        ));
                    }
                    "sphere" => {
                        spheres.push(parse_sphere(&mut parser, &attributes)?);
                    }
                    "instance" => {
                        instances.push(parse_instance(&mut parser, &attributes)?);
                    }
                    "mesh" => {
                        meshes.push(MeshRec {
                            id: parse_attr!(&attributes, "id")?,
                            path: find_attr!(&attributes, "path")?.into(),
                        });
                    }
                    "camera" | "thin_lens_camera" => {
                        let params = parse_camera(&mut parser, &name.local_name, &attributes)?;
                        // Only the first camera is used
                        if camera_params.is_none() {
                            camera_params = Some(params);
                        }
                    }
                    other => {
                        trace!("Scene: Ignoring unknown element '{}'", other);
                        ignore_level = Some(0);
                    }
                }
            }
            XmlEvent::EndElement { name } => {
                trace!("Scene: End {}", name);

                if let Some(level) = ignore_level {
                    ignore_level = level.checked_sub(1);
                }
            }
            XmlEvent::EndDocument => break,
            _ => (),
        }
    }

    // Resolve the parsed records into live resources
    let mut texture_map: HashMap<u32, Option<Arc<Texture>>> = HashMap::new();
    let mut scene_textures = Vec::new();
    for rec in &textures {
        if texture_map.contains_key(&rec.id) {
            return Err(format!("Duplicate texture id {}", rec.id).into());
        }
        // A broken auxiliary texture only costs its modulation
        match Texture::load(&dir_path.join(&rec.path)) {
            Ok(texture) => {
                let texture = Arc::new(texture);
                scene_textures.push(Arc::clone(&texture));
                texture_map.insert(rec.id, Some(texture));
            }
            Err(why) => {
                warn!("Texture load failed. path = {} ({})", rec.path, why);
                texture_map.insert(rec.id, None);
            }
        }
    }

    let mut material_map: HashMap<u32, Arc<dyn Material>> = HashMap::new();
    for (variant, rec) in &materials {
        let texture = if rec.texture_id == 0 {
            None
        } else {
            texture_map
                .get(&rec.texture_id)
                .ok_or_else(|| format!("Material references unknown texture {}", rec.texture_id))?
                .clone()
        };
        let material: Arc<dyn Material> = match variant {
            MaterialVariant::Lambert => Arc::new(Lambert::new(rec.color, rec.emissive, texture)),
            MaterialVariant::Mirror => Arc::new(Mirror::new(rec.color, rec.emissive, texture)),
            MaterialVariant::Refract => {
                Arc::new(Refract::new(rec.color, rec.emissive, rec.ior, texture))
            }
            MaterialVariant::Phong => {
                Arc::new(Phong::new(rec.color, rec.emissive, rec.shininess, texture))
            }
        };
        if material_map.insert(rec.id, material).is_some() {
            return Err(format!("Duplicate material id {}", rec.id).into());
        }
    }

    let mut shape_map: HashMap<u32, Arc<dyn Shape>> = HashMap::new();
    let mut scene_shapes: Vec<Arc<dyn Shape>> = Vec::new();
    for rec in &spheres {
        let material = material_map
            .get(&rec.material_id)
            .ok_or_else(|| format!("Sphere references unknown material {}", rec.material_id))?;
        let sphere: Arc<dyn Shape> =
            Arc::new(Sphere::new(rec.radius, rec.pos, Arc::clone(material)));
        if shape_map.insert(rec.id, Arc::clone(&sphere)).is_some() {
            return Err(format!("Duplicate shape id {}", rec.id).into());
        }
        scene_shapes.push(sphere);
    }
    for rec in &meshes {
        let mesh: Arc<dyn Shape> = Arc::new(
            Mesh::load(&dir_path.join(&rec.path), bvh_settings).map_err(|why| {
                error!("Mesh load failed. path = {}", rec.path);
                why
            })?,
        );
        if shape_map.insert(rec.id, Arc::clone(&mesh)).is_some() {
            return Err(format!("Duplicate shape id {}", rec.id).into());
        }
        scene_shapes.push(mesh);
    }
    for rec in &instances {
        let child = shape_map
            .get(&rec.shape_id)
            .ok_or_else(|| format!("Instance references unknown shape {}", rec.shape_id))?;
        let instance = ShapeInstance::new(Arc::clone(child), rec.world)
            .ok_or("Instance world transform is singular")?;
        scene_shapes.push(Arc::new(instance));
    }

    let ibl = match &ibl_path {
        // A missing environment is a hole in the lighting, not worth a partial render
        Some(path) => Some(Arc::new(Texture::load(&dir_path.join(path)).map_err(
            |why| format!("IBL load failed. path = {} ({})", path, why),
        )?)),
        None => None,
    };

    let camera_params = camera_params.ok_or("Scene has no camera")?;
    let camera = Camera::new(&camera_params, width, height);

    Ok(Scene {
        textures: scene_textures,
        materials: material_map.into_values().collect(),
        shapes: scene_shapes,
        camera,
        ibl,
        width,
        height,
        samples,
    })
}

/// Consumes events until the end tag of `element`, collecting `color` and
/// `emissive` child vectors.
fn parse_material<R: Read>(
    parser: &mut EventReader<R>,
    element: &str,
    attributes: &[OwnedAttribute],
) -> Result<MaterialRec> {
    let mut rec = MaterialRec {
        id: parse_attr!(attributes, "id")?,
        color: Vector3::zeros(),
        emissive: Vector3::zeros(),
        ior: parse_attr_or!(attributes, "ior", 1.5),
        shininess: parse_attr_or!(attributes, "shininess", 32.0),
        texture_id: parse_attr_or!(attributes, "texture_id", 0),
    };

    loop {
        match parser.next()? {
            XmlEvent::StartElement {
                name, attributes, ..
            } => match name.local_name.as_str() {
                "color" => rec.color = parse_vector3(&attributes)?,
                "emissive" => rec.emissive = parse_vector3(&attributes)?,
                _ => (),
            },
            XmlEvent::EndElement { name } => {
                if name.local_name == element {
                    break;
                }
            }
            XmlEvent::EndDocument => return Err("Unexpected end of scene document".into()),
            _ => (),
        }
    }

    Ok(rec)
}

fn parse_sphere<R: Read>(
    parser: &mut EventReader<R>,
    attributes: &[OwnedAttribute],
) -> Result<SphereRec> {
    let mut rec = SphereRec {
        id: parse_attr!(attributes, "id")?,
        pos: Vector3::zeros(),
        radius: parse_attr!(attributes, "radius")?,
        material_id: parse_attr!(attributes, "material_id")?,
    };

    loop {
        match parser.next()? {
            XmlEvent::StartElement {
                name, attributes, ..
            } => {
                if name.local_name == "pos" {
                    rec.pos = parse_vector3(&attributes)?;
                }
            }
            XmlEvent::EndElement { name } => {
                if name.local_name == "sphere" {
                    break;
                }
            }
            XmlEvent::EndDocument => return Err("Unexpected end of scene document".into()),
            _ => (),
        }
    }

    Ok(rec)
}

fn parse_instance<R: Read>(
    parser: &mut EventReader<R>,
    attributes: &[OwnedAttribute],
) -> Result<InstanceRec> {
    let mut rec = InstanceRec {
        world: Matrix4x4::identity(),
        shape_id: parse_attr!(attributes, "shape_id")?,
    };

    let mut in_world = false;
    loop {
        match parser.next()? {
            XmlEvent::StartElement { name, .. } => {
                in_world = name.local_name == "world";
            }
            XmlEvent::Characters(text) => {
                if in_world {
                    rec.world = parse_matrix(&text)?;
                }
            }
            XmlEvent::EndElement { name } => match name.local_name.as_str() {
                "world" => in_world = false,
                "instance" => break,
                _ => (),
            },
            XmlEvent::EndDocument => return Err("Unexpected end of scene document".into()),
            _ => (),
        }
    }

    Ok(rec)
}

fn parse_camera<R: Read>(
    parser: &mut EventReader<R>,
    element: &str,
    attributes: &[OwnedAttribute],
) -> Result<CameraParameters> {
    let lens = if element == "thin_lens_camera" {
        Some(LensParameters {
            radius: parse_attr!(attributes, "radius")?,
            focal_dist: parse_attr!(attributes, "focal_dist")?,
        })
    } else {
        None
    };

    let mut params = CameraParameters {
        fov: parse_attr!(attributes, "fov_deg")?,
        near_clip: parse_attr_or!(attributes, "znear", 1.0),
        lens,
        ..CameraParameters::default()
    };

    loop {
        match parser.next()? {
            XmlEvent::StartElement {
                name, attributes, ..
            } => match name.local_name.as_str() {
                "pos" => params.position = parse_vector3(&attributes)?,
                "dir" => params.direction = parse_vector3(&attributes)?,
                "upward" => params.up = parse_vector3(&attributes)?,
                _ => (),
            },
            XmlEvent::EndElement { name } => {
                if name.local_name == element {
                    break;
                }
            }
            XmlEvent::EndDocument => return Err("Unexpected end of scene document".into()),
            _ => (),
        }
    }

    Ok(params)
}

fn parse_vector3(attributes: &[OwnedAttribute]) -> Result<Vector3> {
    Ok(Vector3::new(
        parse_attr!(attributes, "x")?,
        parse_attr!(attributes, "y")?,
        parse_attr!(attributes, "z")?,
    ))
}

/// Parses 16 whitespace separated floats into a row-major matrix.
fn parse_matrix(text: &str) -> Result<Matrix4x4> {
    let values: Vec<f32> = text
        .split_whitespace()
        .map(str::parse)
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| "Malformed world matrix")?;
    if values.len() != 16 {
        return Err(format!("World matrix has {} elements, expected 16", values.len()).into());
    }

    let mut m = [[0.0f32; 4]; 4];
    for (i, row) in m.iter_mut().enumerate() {
        for (j, value) in row.iter_mut().enumerate() {
            *value = values[i * 4 + j];
        }
    }
    Ok(Matrix4x4::new(m))
}
