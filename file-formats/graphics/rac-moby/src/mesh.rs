//! Conversion of regular submeshes into a flat triangle mesh
//!
//! The VU program keeps vertices in a 512 slot intermediate buffer that
//! survives from one submesh to the next, which is how duplicate vertices
//! refer back to earlier ones. Strips are decoded the way the program
//! builds its GS packets, so the faces come out with the same winding.

use std::collections::HashMap;

use glam::{Vec2, Vec3};

use crate::error::{MobyError, Result};
use crate::submesh::{MOBY_TEX_NONE, MobySubMesh, MobyTexCoord, MobyVertex};

const INTERMEDIATE_BUFFER_SIZE: usize = 512;
const POSITION_SCALE: f32 = 16384.0;
const TEX_COORD_SCALE: f32 = i16::MAX as f32 / 8.0;

/// Material of faces drawn without a texture
pub const MATERIAL_NONE: usize = 0;
/// Material of faces whose texture is outside the class texture list
pub const MATERIAL_DUMMY: usize = 1;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeshVertex {
    pub pos: Vec3,
    pub tex_coord: Vec2,
}

/// Faces sharing a material
///
/// Materials 0 and 1 are [`MATERIAL_NONE`] and [`MATERIAL_DUMMY`], texture
/// `i` of the class maps to material `i + 2`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeshSubMesh {
    pub material: usize,
    pub faces: Vec<[usize; 3]>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub name: String,
    pub vertices: Vec<MeshVertex>,
    pub submeshes: Vec<MeshSubMesh>,
}

/// Lift a list of submeshes drawn one after the other into a single mesh
pub fn lift_submeshes(name: &str, submeshes: &[MobySubMesh], texture_count: usize) -> Result<Mesh> {
    let mut mesh = Mesh {
        name: name.to_string(),
        ..Default::default()
    };
    let mut intermediate_buffer: [Option<MobyVertex>; INTERMEDIATE_BUFFER_SIZE] =
        [None; INTERMEDIATE_BUFFER_SIZE];
    let mut dest = MeshSubMesh::default();

    for (submesh_index, src) in submeshes.iter().enumerate() {
        let bad = |what: &str| {
            MobyError::format(format!("Submesh {submesh_index} of {name} has a bad {what}"))
        };
        let vertex_base = mesh.vertices.len();
        let st = |emitted: usize| {
            src.sts
                .get(emitted)
                .copied()
                .ok_or_else(|| bad("ST unpack (too few texture coordinates)"))
        };

        for vertex in &src.vertices {
            let tex_coord = st(mesh.vertices.len() - vertex_base)?;
            mesh.vertices.push(lift_vertex(vertex, tex_coord));
            intermediate_buffer[usize::from(vertex.index())] = Some(*vertex);
        }
        for &duplicate in &src.duplicate_vertices {
            if duplicate & 0x7f != 0 {
                return Err(bad("duplicate vertex entry"));
            }
            let vertex = intermediate_buffer
                .get(usize::from(duplicate >> 7))
                .copied()
                .flatten()
                .ok_or_else(|| bad("duplicate vertex reference"))?;
            let tex_coord = st(mesh.vertices.len() - vertex_base)?;
            mesh.vertices.push(lift_vertex(&vertex, tex_coord));
        }

        let submesh_count = mesh.submeshes.len();
        let face_count = dest.faces.len();
        let mut queue = [0usize; 3];
        let mut pos = 0;
        let mut reverse_winding = true;
        let mut texture_index = 0;
        for &stored in &src.index_buffer.indices {
            let mut index = stored;
            if index == 0x80 {
                log::warn!("Submesh {submesh_index} of {name} has index 0x80, skipping it");
                // Strips started by this submesh may already have been pushed.
                if let Some(first) = mesh.submeshes.drain(submesh_count..).next() {
                    dest = first;
                }
                dest.faces.truncate(face_count);
                mesh.vertices.truncate(vertex_base);
                break;
            }
            if index == 0 {
                let secret = src
                    .index_buffer
                    .secret_indices
                    .get(texture_index)
                    .ok_or_else(|| bad("index buffer (ran out of secret indices)"))?;
                let secret = *secret as u8;
                if secret == 0 {
                    // These faces are still in flight on the VU when the
                    // strip ends and never reach the GS.
                    if dest.faces.len() < 3 {
                        return Err(bad("index buffer (strip ends before three faces)"));
                    }
                    dest.faces.truncate(dest.faces.len() - 3);
                    break;
                }
                index = secret.wrapping_add(0x80);
                if !dest.faces.is_empty() {
                    mesh.submeshes.push(std::mem::take(&mut dest));
                }
                let texture = src
                    .index_buffer
                    .textures
                    .get(texture_index)
                    .ok_or_else(|| bad("index buffer (more strips than textures)"))?
                    .texture();
                dest = MeshSubMesh {
                    material: material(texture, texture_count).ok_or_else(|| bad("texture index"))?,
                    faces: Vec::new(),
                };
                texture_index += 1;
            }

            let (offset, draws) = if index < 0x80 { (1, true) } else { (0x81, false) };
            queue[pos] = (vertex_base + usize::from(index))
                .checked_sub(offset)
                .filter(|&v| v < mesh.vertices.len())
                .ok_or_else(|| bad("index buffer (index out of range)"))?;
            if draws {
                dest.faces.push(if reverse_winding {
                    [queue[pos], queue[(pos + 2) % 3], queue[(pos + 1) % 3]]
                } else {
                    [queue[(pos + 1) % 3], queue[(pos + 2) % 3], queue[pos]]
                });
            }
            pos = (pos + 1) % 3;
            reverse_winding = !reverse_winding;
        }
    }
    if !dest.faces.is_empty() {
        mesh.submeshes.push(dest);
    }
    Ok(deduplicate_vertices(mesh))
}

fn material(texture: i32, texture_count: usize) -> Option<usize> {
    match texture {
        MOBY_TEX_NONE => Some(MATERIAL_NONE),
        t if t < MOBY_TEX_NONE => None,
        t if t as usize >= texture_count => Some(MATERIAL_DUMMY),
        t => Some(2 + t as usize),
    }
}

fn lift_vertex(vertex: &MobyVertex, st: MobyTexCoord) -> MeshVertex {
    MeshVertex {
        pos: Vec3::new(
            f32::from(vertex.x) / POSITION_SCALE,
            f32::from(vertex.y) / POSITION_SCALE,
            f32::from(vertex.z) / POSITION_SCALE,
        ),
        tex_coord: Vec2::new(
            wrap(f32::from(st.s) / TEX_COORD_SCALE),
            wrap(-f32::from(st.t) / TEX_COORD_SCALE),
        ),
    }
}

fn wrap(value: f32) -> f32 {
    if value < 0.0 { value - value.floor() } else { value }
}

/// Merge vertices with identical positions and texture coordinates
fn deduplicate_vertices(mesh: Mesh) -> Mesh {
    let key = |v: &MeshVertex| {
        [
            v.pos.x.to_bits(),
            v.pos.y.to_bits(),
            v.pos.z.to_bits(),
            v.tex_coord.x.to_bits(),
            v.tex_coord.y.to_bits(),
        ]
    };
    let mut seen = HashMap::new();
    let mut vertices = Vec::new();
    let remap: Vec<usize> = mesh
        .vertices
        .iter()
        .map(|vertex| {
            *seen.entry(key(vertex)).or_insert_with(|| {
                vertices.push(*vertex);
                vertices.len() - 1
            })
        })
        .collect();
    let submeshes = mesh
        .submeshes
        .into_iter()
        .map(|submesh| MeshSubMesh {
            material: submesh.material,
            faces: submesh
                .faces
                .into_iter()
                .map(|face| face.map(|v| remap[v]))
                .collect(),
        })
        .collect();
    Mesh {
        name: mesh.name,
        vertices,
        submeshes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submesh::{GsAdData, MobyIndexBuffer, MobyTexturePrimitive};
    use test_case::test_case;

    fn vertex(index: u16, x: i16) -> MobyVertex {
        MobyVertex {
            low_word: index,
            x,
            y: 0x4000,
            z: 0,
            ..Default::default()
        }
    }

    fn textured(texture: i32) -> MobyTexturePrimitive {
        MobyTexturePrimitive {
            d3_tex0: GsAdData { data_lo: texture, ..Default::default() },
            ..Default::default()
        }
    }

    /// Four vertices drawn as one strip with texture 0
    fn quad() -> MobySubMesh {
        MobySubMesh {
            sts: (0..4).map(|i| MobyTexCoord { s: i * 0x100, t: 0 }).collect(),
            index_buffer: MobyIndexBuffer {
                indices: vec![0x00, 0x82, 0x03, 0x04, 0x00],
                secret_indices: vec![0x01, 0x00],
                textures: vec![textured(0)],
                ..Default::default()
            },
            vertices: (0..4).map(|i| vertex(i, i as i16 * 0x100)).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_strip_winding_alternates() {
        // The strip end drops the three faces still in flight, so the strip
        // is padded out past the quad.
        let mut submesh = quad();
        submesh.index_buffer.indices = vec![0x00, 0x82, 0x03, 0x04, 0x03, 0x04, 0x03, 0x00];
        let mesh = lift_submeshes("high_lod", &[submesh], 1).unwrap();
        assert_eq!(mesh.name, "high_lod");
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.vertices[1].pos, Vec3::new(0x100 as f32 / 16384.0, 1.0, 0.0));
        assert_eq!(mesh.submeshes.len(), 1);
        assert_eq!(mesh.submeshes[0].material, 2);
        assert_eq!(mesh.submeshes[0].faces, vec![[2, 1, 0], [1, 2, 3]]);
    }

    #[test]
    fn test_strip_end_needs_three_faces() {
        let err = lift_submeshes("high_lod", &[quad()], 1).unwrap_err();
        assert!(matches!(err, MobyError::Format(_)));
    }

    #[test_case(vec![0x81, 0x82, 0x03, 0x80, 0x04]; "after one face")]
    #[test_case(vec![0x00, 0x82, 0x03, 0x04, 0x05, 0x80, 0x03, 0x00]; "after a strip start")]
    #[test_case(vec![0x80]; "first index")]
    fn test_index_0x80_skips_the_submesh(indices: Vec<u8>) {
        let mut skipped = quad();
        skipped.sts.push(MobyTexCoord::default());
        skipped.vertices.push(vertex(4, 0x400));
        skipped.index_buffer.indices = indices;
        let mut kept = quad();
        kept.index_buffer.indices = vec![0x00, 0x82, 0x03, 0x04, 0x03, 0x04, 0x03, 0x00];

        let mesh = lift_submeshes("low_lod", &[kept.clone(), skipped], 1).unwrap();
        let expected = lift_submeshes("low_lod", &[kept], 1).unwrap();
        assert_eq!(mesh, expected);
    }

    #[test]
    fn test_index_0x80_keeps_earlier_faces_of_the_strip() {
        // Faces from an earlier submesh drawn in the same strip survive.
        let mut first = quad();
        first.index_buffer.indices = vec![0x00, 0x82, 0x03, 0x04, 0x03, 0x04, 0x03, 0x04];
        first.index_buffer.secret_indices = vec![0x01];
        let mut second = quad();
        second.index_buffer.indices = vec![0x83, 0x84, 0x03, 0x80];
        second.index_buffer.textures.clear();

        let mesh = lift_submeshes("high_lod", &[first, second], 1).unwrap();
        assert_eq!(mesh.submeshes.len(), 1);
        assert_eq!(mesh.submeshes[0].material, 2);
        assert_eq!(mesh.submeshes[0].faces.len(), 6);
        assert_eq!(mesh.vertices.len(), 4);
    }

    #[test]
    fn test_duplicates_come_from_the_intermediate_buffer() {
        let first = MobySubMesh {
            sts: vec![MobyTexCoord::default(); 2],
            vertices: vec![vertex(0x10, 1), vertex(0x11, 2)],
            index_buffer: MobyIndexBuffer {
                indices: vec![0x81, 0x82],
                secret_indices: vec![0],
                ..Default::default()
            },
            ..Default::default()
        };
        let second = MobySubMesh {
            sts: vec![MobyTexCoord { s: 0x200, t: 0 }],
            duplicate_vertices: vec![0x11 << 7],
            index_buffer: MobyIndexBuffer {
                indices: vec![0x81],
                secret_indices: vec![0],
                ..Default::default()
            },
            ..Default::default()
        };
        let mesh = lift_submeshes("high_lod", &[first.clone(), second.clone()], 0).unwrap();
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.vertices[2].pos.x, 2.0 / 16384.0);

        let err = lift_submeshes("high_lod", &[second], 0).unwrap_err();
        assert!(err.to_string().contains("duplicate vertex reference"));
    }

    #[test]
    fn test_identical_vertices_are_merged() {
        let mut submesh = quad();
        submesh.vertices[3].x = submesh.vertices[0].x;
        submesh.sts[3] = submesh.sts[0];
        submesh.index_buffer.indices = vec![0x00, 0x82, 0x03, 0x04, 0x03, 0x04, 0x03, 0x00];
        let mesh = lift_submeshes("high_lod", &[submesh], 1).unwrap();
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.submeshes[0].faces[1], [1, 2, 0]);
    }

    #[test_case(-1, 4 => Some(MATERIAL_NONE))]
    #[test_case(4, 4 => Some(MATERIAL_DUMMY))]
    #[test_case(3, 4 => Some(5))]
    #[test_case(-2, 4 => None)]
    fn test_material_mapping(texture: i32, texture_count: usize) -> Option<usize> {
        material(texture, texture_count)
    }

    #[test]
    fn test_negative_tex_coords_wrap() {
        assert_eq!(wrap(-0.25), 0.75);
        assert_eq!(wrap(-1.0), 0.0);
        assert_eq!(wrap(0.5), 0.5);
    }
}
