//! Object set files (`*_obj.bin`): models, meshes, submeshes and vertex data.
//!
//! Vertex attributes are stored structure-of-arrays: each attribute selected
//! by the mesh's [`VertexFormat`] has its own run of `vertex_count` elements
//! at `model_base + offset[bit]`. Every other offset inside a model is also
//! relative to the model base.

use crate::{Error, OffsetCursor};
use std::collections::HashMap;

pub const OBJECT_SET_VERSION: u32 = 0x0506_2500;

/// Index value that restarts a strip, whatever width the indices were stored in.
pub const PRIMITIVE_RESTART: u32 = 0xFFFF_FFFF;

const MESH_RECORD_SIZE: usize = 0xD8;
const SUBMESH_RECORD_SIZE: usize = 0x5C;
const VERTEX_ATTRIBUTE_SLOTS: usize = 20;
const MESH_NAME_LEN: usize = 64;

#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct BoundingSphere {
    pub center: [f32; 3],
    pub radius: f32,
}

impl BoundingSphere {
    fn read(c: &mut OffsetCursor<'_>) -> Result<Self, Error> {
        Ok(Self {
            center: c.read_vec3()?,
            radius: c.read_f32()?,
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub enum IndexFormat {
    U8,
    U16,
    U32,
}

impl IndexFormat {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::U8),
            1 => Some(Self::U16),
            2 => Some(Self::U32),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub enum Primitive {
    Points,
    Lines,
    LineStrip,
    LineLoop,
    Triangles,
    TriangleStrip,
    TriangleFan,
    Quads,
    QuadStrip,
    Polygon,
}

impl Primitive {
    pub fn from_u32(value: u32) -> Option<Self> {
        Some(match value {
            0 => Self::Points,
            1 => Self::Lines,
            2 => Self::LineStrip,
            3 => Self::LineLoop,
            4 => Self::Triangles,
            5 => Self::TriangleStrip,
            6 => Self::TriangleFan,
            7 => Self::Quads,
            8 => Self::QuadStrip,
            9 => Self::Polygon,
            _ => return None,
        })
    }

    /// Host topology for this primitive, if the host can draw it directly.
    pub fn surface_primitive(self) -> Option<SurfacePrimitive> {
        match self {
            Self::Points => Some(SurfacePrimitive::Points),
            Self::Lines => Some(SurfacePrimitive::Lines),
            Self::LineStrip => Some(SurfacePrimitive::LineStrip),
            Self::Triangles => Some(SurfacePrimitive::Triangles),
            Self::TriangleStrip => Some(SurfacePrimitive::TriangleStrip),
            Self::LineLoop | Self::TriangleFan | Self::Quads | Self::QuadStrip | Self::Polygon => {
                None
            }
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SurfacePrimitive {
    Points,
    Lines,
    LineStrip,
    Triangles,
    TriangleStrip,
}

/// Per-mesh attribute bitmask; bit `n` selects vertex offset slot `n`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct VertexFormat(pub u32);

impl VertexFormat {
    pub const POSITION: u32 = 1 << 0;
    pub const NORMAL: u32 = 1 << 1;
    pub const TANGENT: u32 = 1 << 2;
    pub const BINORMAL: u32 = 1 << 3;
    pub const TEXCOORD0: u32 = 1 << 4;
    pub const TEXCOORD1: u32 = 1 << 5;
    pub const TEXCOORD2: u32 = 1 << 6;
    pub const TEXCOORD3: u32 = 1 << 7;
    pub const COLOR0: u32 = 1 << 8;
    pub const COLOR1: u32 = 1 << 9;
    pub const BONE_WEIGHT: u32 = 1 << 10;
    pub const BONE_INDEX: u32 = 1 << 11;
    pub const UNKNOWN: u32 = 1 << 12;

    pub fn contains(self, bits: u32) -> bool {
        self.0 & bits == bits
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct VertexAttributes {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub tangents: Vec<[f32; 4]>,
    pub binormals: Vec<[f32; 3]>,
    pub texcoords: [Vec<[f32; 2]>; 4],
    pub colors: [Vec<[f32; 4]>; 2],
    pub bone_weights: Vec<[f32; 4]>,
    /// Skin palette indices; `-1` marks an unused influence.
    pub bone_indices: Vec<[i16; 4]>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct Submesh {
    pub flags: u32,
    pub bounding_sphere: BoundingSphere,
    pub material: u32,
    pub uv_indices: [u8; 8],
    pub bones_per_vertex: u32,
    pub primitive: Primitive,
    pub index_format: IndexFormat,
    pub bone_indices: Vec<u16>,
    pub indices: Vec<u32>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct Mesh {
    pub name: String,
    pub flags: u32,
    pub bounding_sphere: BoundingSphere,
    pub vertex_format: VertexFormat,
    pub vertex_count: u32,
    pub vertices: VertexAttributes,
    pub submeshes: Vec<Submesh>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct Object {
    pub name: String,
    pub id: u32,
    pub flags: u32,
    pub bounding_sphere: BoundingSphere,
    pub material_count: u32,
    pub meshes: Vec<Mesh>,
}

/// Host mesh resource that decoded geometry is handed to.
pub trait MeshBuilder {
    type Output;

    fn begin_mesh(&mut self, name: &str, vertices: &VertexAttributes);
    fn add_surface(&mut self, primitive: SurfacePrimitive, indices: &[u32]);
    fn end_mesh(&mut self) -> Self::Output;
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct ObjectSet {
    pub last_object_id: u32,
    pub objects: Vec<Object>,
    pub texture_ids: Vec<u32>,
    #[cfg_attr(feature = "json", serde(skip))]
    object_index_by_name: HashMap<String, usize>,
}

#[cfg(feature = "json")]
impl crate::JsonDump for ObjectSet {}

impl ObjectSet {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let mut c = OffsetCursor::new(bytes);

        let version = c.read_u32()?;
        if version != OBJECT_SET_VERSION {
            return Err(Error::InvalidMagic {
                format: "object set",
                expected: OBJECT_SET_VERSION,
                found: version,
            });
        }

        let object_count = c.read_offset()?;
        let last_object_id = c.read_u32()?;
        let object_datas_offset = c.read_offset()?;
        let _object_skins_offset = c.read_offset()?;
        let object_names_offset = c.read_offset()?;
        let object_ids_offset = c.read_offset()?;
        let texture_ids_offset = c.read_offset()?;
        let texture_id_count = c.read_offset()?;
        c.skip(8)?;

        let mut objects = Vec::with_capacity(object_count.min(c.len() / 4));
        for i in 0..object_count {
            let base = c.with_position(object_datas_offset + 4 * i, |c| c.read_offset())?;
            let name_offset = c.with_position(object_names_offset + 4 * i, |c| c.read_offset())?;
            let id = if object_ids_offset != 0 {
                c.with_position(object_ids_offset + 4 * i, |c| c.read_u32())?
            } else {
                i as u32
            };

            let mut object = c.with_position(base, |c| read_model(c, base, i))?;
            object.name = c.read_string_at(name_offset)?;
            object.id = id;
            objects.push(object);
        }

        let texture_ids = if texture_ids_offset != 0 {
            c.with_position(texture_ids_offset, |c| {
                (0..texture_id_count).map(|_| c.read_u32()).collect::<Result<Vec<_>, _>>()
            })?
        } else {
            Vec::new()
        };

        let mut object_index_by_name = HashMap::with_capacity(objects.len());
        for (i, object) in objects.iter().enumerate() {
            if object_index_by_name.insert(object.name.clone(), i).is_some() {
                log::warn!("object set: duplicate object name '{}'; later object {i} wins", object.name);
            }
        }

        Ok(Self {
            last_object_id,
            objects,
            texture_ids,
            object_index_by_name,
        })
    }

    pub fn object(&self, name: &str) -> Option<&Object> {
        self.object_index_by_name
            .get(name)
            .map(|&i| &self.objects[i])
    }

    /// Hands every mesh of object `name` to `builder`, one surface per drawable submesh.
    ///
    /// Returns `None` if the set has no object with that name.
    pub fn build_meshes<B: MeshBuilder + ?Sized>(
        &self,
        name: &str,
        builder: &mut B,
    ) -> Option<Vec<B::Output>> {
        let object = self.object(name)?;
        let mut out = Vec::with_capacity(object.meshes.len());
        for mesh in &object.meshes {
            builder.begin_mesh(&mesh.name, &mesh.vertices);
            for (i, submesh) in mesh.submeshes.iter().enumerate() {
                match submesh.primitive.surface_primitive() {
                    Some(primitive) => builder.add_surface(primitive, &submesh.indices),
                    None => log::warn!(
                        "object set: '{}' mesh '{}' submesh {i} uses {:?}, which has no host equivalent; skipping",
                        object.name,
                        mesh.name,
                        submesh.primitive
                    ),
                }
            }
            out.push(builder.end_mesh());
        }
        Some(out)
    }
}

fn read_model(c: &mut OffsetCursor<'_>, base: usize, object: usize) -> Result<Object, Error> {
    let _signature = c.read_u32()?;
    let flags = c.read_u32()?;
    let bounding_sphere = BoundingSphere::read(c)?;
    let mesh_count = c.read_offset()?;
    let meshes_offset = c.read_offset()?;
    let material_count = c.read_u32()?;
    let _materials_offset = c.read_offset()?;
    c.skip(40)?;

    let mut meshes = Vec::with_capacity(mesh_count.min(c.len() / MESH_RECORD_SIZE));
    for i in 0..mesh_count {
        let at = base + meshes_offset + MESH_RECORD_SIZE * i;
        meshes.push(c.with_position(at, |c| read_mesh(c, base, object, i))?);
    }

    Ok(Object {
        name: String::new(),
        id: 0,
        flags,
        bounding_sphere,
        material_count,
        meshes,
    })
}

fn read_mesh(
    c: &mut OffsetCursor<'_>,
    base: usize,
    object: usize,
    mesh: usize,
) -> Result<Mesh, Error> {
    let flags = c.read_u32()?;
    let bounding_sphere = BoundingSphere::read(c)?;
    let submesh_count = c.read_offset()?;
    let submesh_offset = c.read_offset()?;
    let vertex_format = VertexFormat(c.read_u32()?);
    let _vertex_size = c.read_u32()?;
    let vertex_count = c.read_u32()?;
    let mut vertex_offsets = [0usize; VERTEX_ATTRIBUTE_SLOTS];
    for slot in vertex_offsets.iter_mut() {
        *slot = c.read_offset()?;
    }
    let _attributes = c.read_u32()?;
    let _vertex_format_index = c.read_u32()?;
    c.skip(6 * 4)?;
    let name = fixed_string(c.read_bytes(MESH_NAME_LEN)?);

    let mut submeshes = Vec::new();
    if submesh_offset != 0 {
        submeshes.reserve(submesh_count.min(c.len() / SUBMESH_RECORD_SIZE));
        for i in 0..submesh_count {
            let at = base + submesh_offset + SUBMESH_RECORD_SIZE * i;
            submeshes.push(c.with_position(at, |c| read_submesh(c, base, (object, mesh, i)))?);
        }
    }

    let vertices = read_vertex_attributes(
        c,
        base,
        &vertex_offsets,
        vertex_count as usize,
        vertex_format,
        &name,
    )?;

    Ok(Mesh {
        name,
        flags,
        bounding_sphere,
        vertex_format,
        vertex_count,
        vertices,
        submeshes,
    })
}

fn read_submesh(
    c: &mut OffsetCursor<'_>,
    base: usize,
    (object, mesh, submesh): (usize, usize, usize),
) -> Result<Submesh, Error> {
    let flags = c.read_u32()?;
    let bounding_sphere = BoundingSphere::read(c)?;
    let material = c.read_u32()?;
    let mut uv_indices = [0u8; 8];
    uv_indices.copy_from_slice(c.read_bytes(8)?);
    let bone_index_count = c.read_offset()?;
    let bone_indices_offset = c.read_offset()?;
    let bones_per_vertex = c.read_u32()?;
    let primitive_value = c.read_u32()?;
    let index_format_value = c.read_u32()?;
    let index_count = c.read_offset()?;
    let indices_offset = c.read_offset()?;
    let _unknown = c.read_u32()?;

    let primitive = Primitive::from_u32(primitive_value).ok_or(Error::UnknownPrimitive {
        value: primitive_value,
        object,
        mesh,
        submesh,
    })?;
    let index_format = IndexFormat::from_u32(index_format_value).ok_or(Error::UnknownIndexFormat {
        value: index_format_value,
        object,
        mesh,
        submesh,
    })?;

    let bone_indices = if bones_per_vertex == 4 && bone_indices_offset != 0 {
        c.with_position(base + bone_indices_offset, |c| {
            (0..bone_index_count).map(|_| c.read_u16()).collect::<Result<Vec<_>, _>>()
        })?
    } else {
        Vec::new()
    };

    let indices = c.with_position(base + indices_offset, |c| {
        read_indices(c, index_format, primitive, index_count)
    })?;

    Ok(Submesh {
        flags,
        bounding_sphere,
        material,
        uv_indices,
        bones_per_vertex,
        primitive,
        index_format,
        bone_indices,
        indices,
    })
}

/// Widens stored indices to u32. Strip-restart sentinels of narrow triangle
/// strips become [`PRIMITIVE_RESTART`].
pub fn read_indices(
    c: &mut OffsetCursor<'_>,
    format: IndexFormat,
    primitive: Primitive,
    count: usize,
) -> Result<Vec<u32>, Error> {
    let strip = primitive == Primitive::TriangleStrip;
    let mut indices = Vec::with_capacity(count.min(c.remaining()));
    for _ in 0..count {
        let index = match format {
            IndexFormat::U8 => match c.read_u8()? {
                0xFF if strip => PRIMITIVE_RESTART,
                v => v as u32,
            },
            IndexFormat::U16 => match c.read_u16()? {
                0xFFFF if strip => PRIMITIVE_RESTART,
                v => v as u32,
            },
            IndexFormat::U32 => c.read_u32()?,
        };
        indices.push(index);
    }
    Ok(indices)
}

fn read_vertex_attributes(
    c: &mut OffsetCursor<'_>,
    base: usize,
    offsets: &[usize; VERTEX_ATTRIBUTE_SLOTS],
    count: usize,
    format: VertexFormat,
    mesh_name: &str,
) -> Result<VertexAttributes, Error> {
    let mut out = VertexAttributes::default();

    for (bit, &offset) in offsets.iter().enumerate() {
        if format.0 & (1 << bit) == 0 {
            continue;
        }
        c.with_position(base + offset, |c| {
            match bit {
                0 => out.positions = read_run(c, count, OffsetCursor::read_vec3)?,
                1 => out.normals = read_run(c, count, OffsetCursor::read_vec3)?,
                2 => out.tangents = read_run(c, count, OffsetCursor::read_vec4)?,
                3 => out.binormals = read_run(c, count, OffsetCursor::read_vec3)?,
                4..=7 => out.texcoords[bit - 4] = read_run(c, count, read_vec2)?,
                8 | 9 => out.colors[bit - 8] = read_run(c, count, OffsetCursor::read_vec4)?,
                10 => out.bone_weights = read_run(c, count, OffsetCursor::read_vec4)?,
                11 => out.bone_indices = read_run(c, count, read_bone_index_quad)?,
                12 => {
                    read_run(c, count, OffsetCursor::read_vec4)?;
                }
                _ => log::debug!(
                    "object set: mesh '{mesh_name}' has reserved vertex attribute bit {bit}; ignoring"
                ),
            }
            Ok(())
        })?;
    }

    Ok(out)
}

fn read_run<'a, T>(
    c: &mut OffsetCursor<'a>,
    count: usize,
    mut read: impl FnMut(&mut OffsetCursor<'a>) -> Result<T, Error>,
) -> Result<Vec<T>, Error> {
    let mut out = Vec::with_capacity(count.min(c.remaining()));
    for _ in 0..count {
        out.push(read(c)?);
    }
    Ok(out)
}

fn read_vec2(c: &mut OffsetCursor<'_>) -> Result<[f32; 2], Error> {
    Ok([c.read_f32()?, c.read_f32()?])
}

/// Bone indices are stored as floats holding three times the palette index.
fn read_bone_index_quad(c: &mut OffsetCursor<'_>) -> Result<[i16; 4], Error> {
    let mut out = [0i16; 4];
    for slot in out.iter_mut() {
        *slot = bone_index_from_raw(c.read_f32()?);
    }
    Ok(out)
}

pub(crate) fn bone_index_from_raw(raw: f32) -> i16 {
    let raw = raw as i32;
    if raw >= 0 { (raw / 3) as i16 } else { -1 }
}

fn fixed_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
