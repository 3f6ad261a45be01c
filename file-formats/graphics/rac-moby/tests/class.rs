//! Whole class encode/decode tests

use glam::{Mat4, Vec3, Vec4};
use pretty_assertions::assert_eq;
use rac_data::{Buffer, Game};
use rac_moby::chunks::{BANGLE_COUNT, CORNCOB_KERNEL_COUNT, MobyCornKernel};
use rac_moby::header::{MobyClassHeader, MobyGifUsageEntry};
use rac_moby::submesh::{GsAdData, MOBY_TEX_CHROME, MOBY_TEX_NONE};
use rac_moby::{
    MobyBangle, MobyBangles, MobyClass, MobyCollision, MobyCornCob, MobyError, MobyFormat,
    MobyFrame, MobyIndexBuffer, MobyMetalSubMesh, MobyMetalVertex, MobySequence, MobySoundDef,
    MobySubMesh, MobyTexCoord, MobyTexturePrimitive, MobyTriggerData, MobyVertex,
    MobyVertexPosition, StructuralWarning, SubMeshTable,
};
use test_case::test_case;

fn primitive(texture: i32) -> MobyTexturePrimitive {
    MobyTexturePrimitive {
        d1_xyzf2: GsAdData { address: 0x04, ..Default::default() },
        d2_clamp: GsAdData { address: 0x08, data_lo: 0x1, ..Default::default() },
        d3_tex0: GsAdData { address: 0x06, data_lo: texture, ..Default::default() },
        d4_xyzf2: GsAdData { address: 0x34, ..Default::default() },
    }
}

/// A strip of `vertex_count` vertices using `texture`
fn submesh(vertex_count: usize, texture: i32, format: MobyFormat) -> MobySubMesh {
    MobySubMesh {
        sts: (0..vertex_count)
            .map(|i| MobyTexCoord { s: (i * 0x80) as i16, t: -((i * 0x40) as i16) })
            .collect(),
        index_buffer: MobyIndexBuffer {
            unknown_0: 0x10,
            indices: vec![0x00, 0x82, 0x03, 0x04, 0x03, 0x04, 0x03, 0x00],
            secret_indices: vec![0x01, 0x00],
            textures: vec![primitive(texture)],
        },
        vertices: (0..vertex_count)
            .map(|i| MobyVertex {
                low_word: (i as u16 * 5 + 2) & 0x1ff,
                unknown_2: [0x11, 0x22, 0x33, 0x44, 0, 0, 0, i as u8],
                x: (i as i16) * 0x200,
                y: 0x100,
                z: -(i as i16),
            })
            .collect(),
        vertex_count_2: 1,
        vertex_count_4: 2,
        unknowns: vec![0x1234; vertex_count % 3],
        duplicate_vertices: Vec::new(),
        unknown_e: if format == MobyFormat::Rac1 { 0 } else { 0xe0 },
        unknown_e_data: if format == MobyFormat::Rac1 { vec![0xee; 0x20] } else { Vec::new() },
    }
}

fn metal_submesh() -> MobyMetalSubMesh {
    MobyMetalSubMesh {
        index_buffer: MobyIndexBuffer {
            unknown_0: 0,
            indices: vec![0x81, 0x82, 0x03, 0x00],
            secret_indices: vec![0x00, 0x03],
            textures: vec![primitive(MOBY_TEX_CHROME)],
        },
        vertices: (0..5u8).map(|i| MobyMetalVertex { data: [i; 16] }).collect(),
        unknown_4: 0x40,
        unknown_8: 0,
        unknown_c: -1,
    }
}

fn sequence(seed: u8) -> MobySequence {
    MobySequence {
        bounding_sphere: Vec4::new(0.0, 0.5, 1.0, 4.0),
        frames: (0..3)
            .map(|i| MobyFrame {
                unknown_0: 0.5 * f32::from(i),
                unknown_4: 0x10,
                unknown_8: 0xdead,
                unknown_c: 1,
                unknown_d: 2,
                unknown_e: 0x30,
                pointer_flags: i,
                data: vec![seed.wrapping_add(i); 0x10 * usize::from(i + 1)],
            })
            .collect(),
        sound_count: 1,
        triggers: vec![0x100, 0x200],
        trigger_data: Some(MobyTriggerData { words: [u32::from(seed); 8] }),
        animation_info: 0x8000_0001,
    }
}

fn corncob() -> MobyCornCob {
    let mut kernels: [Option<MobyCornKernel>; CORNCOB_KERNEL_COUNT] = Default::default();
    kernels[0] = Some(MobyCornKernel {
        vec: Vec4::new(1.0, 2.0, 3.0, 4.0),
        // The vertex count is stored over the w of the first vertex.
        vertices: vec![
            MobyVertexPosition { x: 1, y: 2, z: 3, w: 2 },
            MobyVertexPosition { x: 4, y: 5, z: 6, w: 7 },
        ],
    });
    kernels[3] = Some(MobyCornKernel {
        vec: Vec4::ZERO,
        vertices: Vec::new(),
    });
    MobyCornCob { kernels }
}

fn full_class(game: Game, force_rac1_format: bool) -> MobyClass {
    let format = MobyFormat::for_game(game, force_rac1_format);
    let high = vec![submesh(6, 0, format), submesh(9, MOBY_TEX_NONE, format)];
    let low = vec![submesh(4, 1, format)];
    let metal = vec![metal_submesh()];
    let bangle_submeshes = vec![submesh(5, 2, format)];
    let rac1_layout = format == MobyFormat::Rac1;
    // Unused slots are read back as empty bangles, so all of them are listed.
    let mut bangles = vec![MobyBangle::default(); BANGLE_COUNT];
    bangles[0] = MobyBangle {
        submesh_begin: (high.len() + low.len() + metal.len()) as u8,
        submesh_count: bangle_submeshes.len() as u8,
        ..Default::default()
    };
    bangles[1] = MobyBangle { submesh_begin: 0, submesh_count: 1, unknown_2: 5, unknown_3: 0 };

    MobyClass {
        force_rac1_format,
        unknown_9: 3,
        rac1_byte_a: if rac1_layout { 0x0a } else { 0 },
        rac1_byte_b: if rac1_layout && game == Game::Rac2 { 0x0b } else { 0 },
        lod_trans: 0x20,
        shadow: 1,
        scale: 0.25,
        mip_dist: 0x40,
        bounding_sphere: Vec4::new(0.0, 0.0, 1.0, 2.5),
        glow_rgba: 0x7f7f7f7f,
        mode_bits: 0x1001,
        moby_type: 2,
        mode_bits2: 0x80,
        sequences: vec![Some(sequence(1)), None, Some(sequence(7))],
        bangles: Some(MobyBangles {
            bangles,
            vertices: vec![
                MobyVertexPosition { x: 1, y: 1, z: 1, w: 0 },
                MobyVertexPosition { x: -1, y: -1, z: -1, w: 0 },
            ],
            submeshes: bangle_submeshes,
        }),
        corncob: (game != Game::Rac1).then(corncob),
        rac1_short_2e: if game == Game::Rac1 { 0x2e } else { 0 },
        collision: Some(MobyCollision {
            unknown_0: 1,
            unknown_2: 2,
            first_part: vec![0xf1; 0x10],
            second_part: vec![Vec3::new(1.0, -0.5, 0.25), Vec3::new(0.0, 2.0, -3.0)],
            third_part: vec![0xf3; 0x8],
        }),
        skeleton: vec![Mat4::IDENTITY, Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0))],
        common_trans: (0..0x20).collect(),
        joints: vec![vec![0, 1], vec![], vec![1]],
        sound_defs: vec![MobySoundDef {
            min_range: 1.0,
            max_range: 30.0,
            min_volume: 0x400,
            max_volume: 0x800,
            is_loop: 1,
            index: 5,
            bank_index: -1,
            ..Default::default()
        }],
        submeshes: high,
        low_detail_submeshes: low,
        metal_submeshes: metal,
        mystery_data: vec![0x4d; 0x30],
        ..Default::default()
    }
}

/// Copy the fields a decoded class derives from the layout it was read from
fn with_layout_of(class: &MobyClass, read: &MobyClass, format: MobyFormat) -> MobyClass {
    let mut expected = MobyClass {
        header_end_offset: read.header_end_offset,
        submesh_table_offset: read.submesh_table_offset,
        has_submesh_table: read.has_submesh_table,
        ..class.clone()
    };
    if format == MobyFormat::Rac1 {
        let read_unknown_e = read
            .submeshes
            .iter()
            .chain(&read.low_detail_submeshes)
            .chain(read.bangles.iter().flat_map(|bangles| &bangles.submeshes))
            .map(|submesh| submesh.unknown_e);
        let expected_submeshes = expected
            .submeshes
            .iter_mut()
            .chain(&mut expected.low_detail_submeshes)
            .chain(expected.bangles.iter_mut().flat_map(|bangles| &mut bangles.submeshes));
        for (submesh, unknown_e) in expected_submeshes.zip(read_unknown_e) {
            submesh.unknown_e = unknown_e;
        }
    }
    expected
}

#[test_case(Game::Rac1, false ; "rac1")]
#[test_case(Game::Rac2, false ; "rac2")]
#[test_case(Game::Rac2, true ; "rac2 in rac1 layout")]
#[test_case(Game::Rac3, false ; "rac3")]
#[test_case(Game::Dl, false ; "deadlocked")]
fn test_class_round_trip(game: Game, force_rac1_format: bool) {
    let format = MobyFormat::for_game(game, force_rac1_format);
    let class = full_class(game, force_rac1_format);
    let data = class.write(game).unwrap();
    assert_eq!(data.len() % 0x10, 0);

    let (read, warnings) = MobyClass::read_with_warnings(&data, game).unwrap();
    assert_eq!(warnings, Vec::new());
    assert_eq!(read, with_layout_of(&class, &read, format));
    assert_eq!(read.write(game).unwrap(), data);
}

#[test]
fn test_header_fields() {
    let class = full_class(Game::Rac3, false);
    let data = class.write(Game::Rac3).unwrap();
    let header: MobyClassHeader = Buffer::new(&data).read(0, "header").unwrap();
    assert_eq!(header.submesh_count, 2);
    assert_eq!(header.low_detail_submesh_count, 1);
    assert_eq!(header.metal_submesh_count, 1);
    assert_eq!(header.metal_submesh_begin, 3);
    assert_eq!(header.joint_count, 2);
    assert_eq!(header.sequence_count, 3);
    assert_eq!(header.sound_count, 1);
    assert_eq!(header.submesh_table_offset % 0x10, 0);
    assert_ne!(header.corncob, 0);
    assert_ne!(header.bangles, 0);

    // One GIF usage entry per textured regular submesh, the last one tagged.
    let gif_usage: Vec<MobyGifUsageEntry> = Buffer::new(&data)
        .read_multiple(header.gif_usage as usize, 4, "gif usage")
        .unwrap();
    assert!(gif_usage[..3]
        .iter()
        .all(|entry| entry.offset_and_terminator & MobyGifUsageEntry::TERMINATOR == 0));
    assert_ne!(gif_usage[3].offset_and_terminator & MobyGifUsageEntry::TERMINATOR, 0);
    assert_eq!(gif_usage[0].texture_indices[0], 0);
    assert_eq!(gif_usage[1].texture_indices[0], 0xff);
    assert_eq!(gif_usage[3].texture_indices[0], 2);
    assert_eq!(data.len(), header.gif_usage as usize + 4 * 0x10);
}

#[test]
fn test_rac1_keeps_short_2e() {
    let class = full_class(Game::Rac1, false);
    let data = class.write(Game::Rac1).unwrap();
    let header: MobyClassHeader = Buffer::new(&data).read(0, "header").unwrap();
    assert_eq!(header.corncob, 0x2e);
    assert_eq!(header.rac1_byte_a, 0x0a);
    let read = MobyClass::read(&data, Game::Rac1).unwrap();
    assert_eq!(read.corncob, None);
    assert_eq!(read.rac1_short_2e, 0x2e);
}

#[test]
fn test_zero_sequences_fail_to_decode() {
    let mut data = full_class(Game::Rac2, false).write(Game::Rac2).unwrap();
    data[0xc] = 0;
    let err = MobyClass::read(&data, Game::Rac2).unwrap_err();
    assert!(err.is_corruption());
}

#[test]
fn test_submesh_count_limit() {
    let format = MobyFormat::Rac3Dl;
    let mut class = MobyClass {
        sequences: vec![Some(sequence(0))],
        has_submesh_table: true,
        submeshes: vec![submesh(4, 0, format); 255],
        ..Default::default()
    };
    let data = class.write(Game::Rac3).unwrap();
    let read = MobyClass::read(&data, Game::Rac3).unwrap();
    assert_eq!(read.submeshes.len(), 255);

    class.submeshes.push(submesh(4, 0, format));
    let err = class.write(Game::Rac3).unwrap_err();
    assert!(matches!(err, MobyError::EncodingConstraint(_)));
}

#[test]
fn test_bangles_follow_extra_high_submesh() {
    let mut class = full_class(Game::Rac3, false);
    class.submeshes.push(submesh(6, 0, MobyFormat::Rac3Dl));
    let data = class.write(Game::Rac3).unwrap();
    let header: MobyClassHeader = Buffer::new(&data).read(0, "header").unwrap();
    assert_eq!(header.metal_submesh_begin, 4);

    let (read, warnings) = MobyClass::read_with_warnings(&data, Game::Rac3).unwrap();
    assert_eq!(warnings, Vec::new());
    assert_eq!(read.submeshes, class.submeshes);
    let bangles = read.bangles.unwrap();
    assert_eq!(bangles.submeshes, class.bangles.unwrap().submeshes);
    assert_eq!(bangles.bangles[0].submesh_begin, 5);
    assert_eq!(bangles.bangles[0].submesh_count, 1);
}

#[test_case(Game::Rac1, 0x4, &u32::MAX.to_le_bytes() ; "rac1 vertex_count_2")]
#[test_case(Game::Rac1, 0x10, &u32::MAX.to_le_bytes() ; "rac1 duplicate_vertex_count")]
#[test_case(Game::Rac2, 0x6, &u16::MAX.to_le_bytes() ; "rac2 main_vertex_count")]
#[test_case(Game::Dl, 0x0, &u16::MAX.to_le_bytes() ; "deadlocked unknown_count_0")]
fn test_corrupt_vertex_count_is_an_error(game: Game, field: usize, value: &[u8]) {
    let mut data = full_class(game, false).write(game).unwrap();
    let header: MobyClassHeader = Buffer::new(&data).read(0, "header").unwrap();
    let entry = header.submesh_table_offset as usize;
    let vertex_offset = Buffer::new(&data).read_u32(entry + 8, "vertex offset").unwrap() as usize;
    let ofs = vertex_offset + field;
    data[ofs..ofs + value.len()].copy_from_slice(value);

    let err = MobyClass::read(&data, game).unwrap_err();
    assert!(err.is_corruption(), "{err}");
}

#[test_case(0x7fff_ffff ; "huge")]
#[test_case(0x10_0000 ; "past the end")]
fn test_corrupt_joint_count_is_an_error(count: i32) {
    let mut data = full_class(Game::Rac2, false).write(Game::Rac2).unwrap();
    let joints = Buffer::new(&data).read_u32(0x1c, "joints").unwrap() as usize;
    data[joints..joints + 4].copy_from_slice(&count.to_le_bytes());

    let err = MobyClass::read(&data, Game::Rac2).unwrap_err();
    assert!(err.is_corruption(), "{err}");
}

#[test]
fn test_bad_submesh_is_dropped_with_a_warning() {
    let class = full_class(Game::Dl, false);
    let mut data = class.write(Game::Dl).unwrap();
    let header: MobyClassHeader = Buffer::new(&data).read(0, "header").unwrap();
    let low_entry = header.submesh_table_offset as usize + 2 * 0x10;
    data[low_entry + 0xe] ^= 0x40;

    let (read, warnings) = MobyClass::read_with_warnings(&data, Game::Dl).unwrap();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].table, SubMeshTable::LowDetail);
    assert_eq!(warnings[0].index, 0);
    assert!(matches!(warnings[0].warning, StructuralWarning::UnknownE { .. }));
    assert!(read.low_detail_submeshes.is_empty());
    assert_eq!(read.submeshes, class.submeshes);
}

#[test]
fn test_lift_meshes() {
    let class = full_class(Game::Rac2, false);
    let meshes = class.lift_meshes(2).unwrap();
    let names: Vec<&str> = meshes.iter().map(|mesh| mesh.name.as_str()).collect();
    assert_eq!(names, ["high_lod", "low_lod", "bangles"]);

    let high = &meshes[0];
    // Texture 0 maps to material 2, the untextured strip to material 0.
    let materials: Vec<usize> = high.submeshes.iter().map(|submesh| submesh.material).collect();
    assert_eq!(materials, [2, 0]);
    assert!(high.submeshes.iter().all(|submesh| submesh.faces.len() == 2));
    // Texture 2 is past the end of the texture list.
    assert_eq!(meshes[2].submeshes[0].material, 1);
}

#[test]
fn test_index_0x80_drops_the_whole_submesh() {
    let mut class = full_class(Game::Rac2, false);
    class.submeshes[1].index_buffer.indices = vec![0x00, 0x82, 0x03, 0x04, 0x05, 0x80, 0x03, 0x00];
    let data = class.write(Game::Rac2).unwrap();
    let read = MobyClass::read(&data, Game::Rac2).unwrap();
    assert_eq!(read.submeshes, class.submeshes);

    let high = &read.lift_meshes(2).unwrap()[0];
    assert_eq!(high.submeshes.len(), 1);
    assert_eq!(high.submeshes[0].material, 2);
    assert_eq!(high.submeshes[0].faces.len(), 2);
    assert_eq!(high.vertices.len(), 6);
}
