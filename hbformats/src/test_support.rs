//! Little-endian fixture assembly for the decoder tests.

#![allow(dead_code)]

use byteorder::{ByteOrder, LittleEndian};

#[derive(Clone, Debug, Default)]
pub(crate) struct Blob {
    bytes: Vec<u8>,
}

impl Blob {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn pos(&self) -> usize {
        self.bytes.len()
    }

    pub(crate) fn u8(&mut self, v: u8) -> &mut Self {
        self.bytes.push(v);
        self
    }

    pub(crate) fn u16(&mut self, v: u16) -> &mut Self {
        let mut buf = [0u8; 2];
        LittleEndian::write_u16(&mut buf, v);
        self.bytes.extend_from_slice(&buf);
        self
    }

    pub(crate) fn i16(&mut self, v: i16) -> &mut Self {
        self.u16(v as u16)
    }

    pub(crate) fn u32(&mut self, v: u32) -> &mut Self {
        let mut buf = [0u8; 4];
        LittleEndian::write_u32(&mut buf, v);
        self.bytes.extend_from_slice(&buf);
        self
    }

    pub(crate) fn i32(&mut self, v: i32) -> &mut Self {
        self.u32(v as u32)
    }

    pub(crate) fn i64(&mut self, v: i64) -> &mut Self {
        let mut buf = [0u8; 8];
        LittleEndian::write_i64(&mut buf, v);
        self.bytes.extend_from_slice(&buf);
        self
    }

    pub(crate) fn f32(&mut self, v: f32) -> &mut Self {
        let mut buf = [0u8; 4];
        LittleEndian::write_f32(&mut buf, v);
        self.bytes.extend_from_slice(&buf);
        self
    }

    pub(crate) fn f32s(&mut self, values: &[f32]) -> &mut Self {
        for &v in values {
            self.f32(v);
        }
        self
    }

    pub(crate) fn bytes(&mut self, data: &[u8]) -> &mut Self {
        self.bytes.extend_from_slice(data);
        self
    }

    pub(crate) fn zeros(&mut self, count: usize) -> &mut Self {
        self.bytes.resize(self.bytes.len() + count, 0);
        self
    }

    pub(crate) fn pad_to(&mut self, offset: usize) -> &mut Self {
        if self.bytes.len() < offset {
            self.bytes.resize(offset, 0);
        }
        self
    }

    pub(crate) fn align(&mut self, alignment: usize) -> &mut Self {
        while self.bytes.len() % alignment != 0 {
            self.bytes.push(0);
        }
        self
    }

    /// Appends a null-terminated string and returns its offset.
    pub(crate) fn cstr(&mut self, s: &str) -> u32 {
        let at = self.pos() as u32;
        self.bytes.extend_from_slice(s.as_bytes());
        self.bytes.push(0);
        at
    }

    /// Reserves a u32 slot to be filled by [`patch_u32`](Self::patch_u32).
    pub(crate) fn placeholder(&mut self) -> usize {
        let at = self.pos();
        self.u32(0);
        at
    }

    pub(crate) fn patch_u32(&mut self, at: usize, v: u32) -> &mut Self {
        LittleEndian::write_u32(&mut self.bytes[at..at + 4], v);
        self
    }

    /// Points the slot at `at` to the current end of the blob.
    pub(crate) fn patch_here(&mut self, at: usize) -> &mut Self {
        let here = self.pos() as u32;
        self.patch_u32(at, here)
    }

    pub(crate) fn build(&self) -> Vec<u8> {
        self.bytes.clone()
    }
}

/// Writes the strings, then a table of their offsets. Returns the table offset.
pub(crate) fn name_table(b: &mut Blob, names: &[&str]) -> u32 {
    let offsets: Vec<u32> = names.iter().map(|n| b.cstr(n)).collect();
    b.align(4);
    let at = b.pos() as u32;
    for offset in offsets {
        b.u32(offset);
    }
    at
}

/// One skeleton: a root, a child, an IK bone and a bone that parents itself.
/// Only three rest positions are stored.
pub(crate) fn bone_db_blob() -> Vec<u8> {
    let mut b = Blob::new();
    b.u32(crate::BONE_DB_MAGIC).u32(1);
    let skeleton_offsets = b.placeholder();
    let skeleton_names = b.placeholder();
    b.zeros(0x14);

    let skeleton_name = b.cstr("CMN");
    let bone_names = [
        b.cstr("n_hara"),
        b.cstr("kl_kosi"),
        b.cstr("c_kata_l"),
        b.cstr("j_self"),
    ];
    let object_names = name_table(&mut b, &["n_hara", "kl_kosi"]);
    let motion_names = name_table(&mut b, &["gblctr", "kl_kosi"]);

    b.patch_here(skeleton_names);
    b.u32(skeleton_name);

    b.patch_here(skeleton_offsets);
    let skeleton = b.placeholder();

    b.patch_here(skeleton);
    let bones = b.placeholder();
    b.u32(3);
    let positions = b.placeholder();
    let heel = b.placeholder();
    b.u32(2).u32(object_names).u32(2).u32(motion_names);
    let parents = b.placeholder();
    b.zeros(0x14);

    b.patch_here(bones);
    // kind, has_parent, parent, pole target, mirror, flags
    let records: [[u8; 6]; 4] = [[0, 0, 0, 0, 0, 0], [2, 1, 0, 0, 0, 1], [5, 1, 1, 2, 0, 0], [0, 1, 3, 0, 0, 0]];
    for (record, name) in records.iter().zip(bone_names) {
        b.bytes(record).zeros(2).u32(name);
    }
    b.u8(0xFF).align(4);

    b.patch_here(positions);
    b.f32s(&[0.0, 1.0, 0.0, 0.0, 0.5, 0.1, 0.2, 0.0, 0.0]);
    b.patch_here(heel);
    b.f32(0.05);
    b.patch_here(parents);
    b.u16(0xFFFF).u16(0);
    b.build()
}

pub(crate) fn motion_db_blob() -> Vec<u8> {
    let mut b = Blob::new();
    b.u32(crate::MOTION_DB_MAGIC);
    let sets = b.placeholder();
    let set_ids = b.placeholder();
    b.u32(1);
    let bone_names = b.placeholder();
    b.u32(2);

    let set_name = b.cstr("PV001");
    let motion_names = name_table(&mut b, &["PV001_MIK_00", "PV001_MIK_01"]);
    let motion_ids = b.pos() as u32;
    b.u32(1200).u32(1201);
    let bones = name_table(&mut b, &["gblctr", "kg_ya_ex"]);
    b.patch_u32(bone_names, bones);

    b.patch_here(sets);
    b.u32(set_name).u32(motion_names).u32(2).u32(motion_ids);
    b.patch_here(set_ids);
    b.u32(17);
    b.build()
}

/// Four key sets, one of each kind, over a 120 frame motion.
pub(crate) fn motion_blob() -> Vec<u8> {
    let mut b = Blob::new();
    let info = b.placeholder();
    let types = b.placeholder();
    let key_sets = b.placeholder();
    let bone_info = b.placeholder();

    b.patch_here(info);
    b.u16(4 | 0x4000).u16(120);
    b.patch_here(types);
    b.u16(0b11_10_01_00).align(4);

    b.patch_here(key_sets);
    b.f32(1.5);
    b.u16(2).u16(0).u16(10).align(4).f32(0.25).f32(0.75);
    b.u16(1).u16(5).f32(2.0).f32(-1.0);

    b.patch_here(bone_info);
    b.u16(1).u16(2).u16(0);
    b.build()
}

/// Two sets; one sprite points at a set that doesn't exist.
pub(crate) fn sprite_db_blob() -> Vec<u8> {
    let mut b = Blob::new();
    b.u32(2);
    let sets = b.placeholder();
    b.u32(3);
    let sprites = b.placeholder();

    let set_names = [b.cstr("SPR_SEL_MD003"), b.cstr("SPR_SEL_MD003CMN")];
    let file_names = [b.cstr("spr_sel_md003.bin"), b.cstr("spr_sel_md003cmn.bin")];
    let sprite_names = [
        b.cstr("SPR_SEL_MD003_MD_IMG_003"),
        b.cstr("SPR_SEL_MD003_TEX"),
        b.cstr("SPR_ORPHAN"),
    ];
    b.align(4);

    b.patch_here(sets);
    b.u32(500).u32(set_names[0]).u32(file_names[0]).u32(0);
    b.u32(501).u32(set_names[1]).u32(file_names[1]).u32(1);

    b.patch_here(sprites);
    b.u32(9000).u32(sprite_names[0]).u32(0);
    b.u32(9001).u32(sprite_names[1]).u32(1 | (0x1000 << 16));
    b.u32(9002).u32(sprite_names[2]).u32(7 << 16);
    b.build()
}

/// Appends a texture set at the current position: an unrecognised texture
/// followed by a 2x2 RGBA8 texture whose header overstates its mipmap count.
pub(crate) fn write_texture_set(b: &mut Blob) {
    let start = b.pos();
    b.u32(crate::TXP_SET_MAGIC).u32(2).u32(0x0101_0002);
    let first = b.placeholder();
    let second = b.placeholder();

    let at = (b.pos() - start) as u32;
    b.patch_u32(first, at);
    b.u32(0xDEAD_BEEF);

    let texture_start = b.pos();
    b.patch_u32(second, (texture_start - start) as u32);
    b.u32(crate::TXP_TEXTURE_MAGIC).u32(1).u32(0x0000_0102);
    let mipmap = b.placeholder();

    let at = (b.pos() - texture_start) as u32;
    b.patch_u32(mipmap, at);
    b.u32(crate::TXP_MIPMAP_MAGIC).u32(2).u32(2).u32(2).u32(77).u32(16);
    b.bytes(&[0xAB; 16]);
}

pub(crate) fn texture_set_blob() -> Vec<u8> {
    let mut b = Blob::new();
    write_texture_set(&mut b);
    b.build()
}

pub(crate) fn sprite_set_blob() -> Vec<u8> {
    let mut b = Blob::new();
    b.u32(0);
    let textures = b.placeholder();
    b.u32(1).u32(1);
    let sprite_info = b.placeholder();
    let texture_names = b.placeholder();
    let sprite_names = b.placeholder();
    let sprite_data = b.placeholder();

    b.patch_here(sprite_info);
    b.u32(0).i32(0).f32s(&[0.0, 0.0, 0.5, 0.25]).f32s(&[4.0, 8.0]).f32s(&[64.0, 32.0]);
    b.patch_here(sprite_data);
    b.u32(3).u32(1);

    let at = name_table(&mut b, &["MERGE_BC5COMP_0"]);
    b.patch_u32(texture_names, at);
    let at = name_table(&mut b, &["SPR_SEL_MD003_MD_IMG_003"]);
    b.patch_u32(sprite_names, at);

    b.align(16);
    b.patch_here(textures);
    write_texture_set(&mut b);
    b.build()
}

/// Two sets and three objects, one of which names an unknown set id.
pub(crate) fn object_db_blob() -> Vec<u8> {
    let mut b = Blob::new();
    b.u32(2).u32(12);
    let sets = b.placeholder();
    b.u32(3);
    let objects = b.placeholder();

    let strings = [
        b.cstr("STGPV001"),
        b.cstr("stgpv001_obj.bin"),
        b.cstr("stgpv001_tex.bin"),
        b.cstr("stgpv001.farc"),
        b.cstr("CMNITM1001"),
        b.cstr("cmnitm1001_obj.bin"),
        b.cstr("cmnitm1001_tex.bin"),
        b.cstr("cmnitm1001.farc"),
    ];
    let object_names = [b.cstr("STGPV001_BG"), b.cstr("CMNITM1001_ATAM"), b.cstr("LOST")];
    b.align(4);

    b.patch_here(sets);
    b.u32(strings[0]).u32(11).u32(strings[1]).u32(strings[2]).u32(strings[3]).zeros(16);
    b.u32(strings[4]).u32(12).u32(strings[5]).u32(strings[6]).u32(strings[7]).zeros(16);

    b.patch_here(objects);
    b.u16(0).u16(11).u32(object_names[0]);
    b.u16(3).u16(12).u32(object_names[1]);
    b.u16(4).u16(99).u32(object_names[2]);
    b.build()
}

/// One object with one mesh of three vertices and one submesh of seven 8-bit
/// indices `[0, 1, 2, 0xFF, 2, 1, 0]`.
pub(crate) fn object_set_blob(primitive: u32, index_format: u32) -> Vec<u8> {
    let mut b = Blob::new();
    b.u32(crate::OBJECT_SET_VERSION).u32(1).u32(7);
    let datas = b.placeholder();
    b.u32(0);
    let names = b.placeholder();
    let ids = b.placeholder();
    let texture_ids = b.placeholder();
    b.u32(2).zeros(8);

    b.patch_here(datas);
    let data = b.placeholder();
    let name = b.cstr("STGTST001_OBJ");
    b.align(4);
    b.patch_here(names);
    b.u32(name);
    b.patch_here(ids);
    b.u32(42);
    b.patch_here(texture_ids);
    b.u32(100).u32(101);

    b.align(16);
    let base = b.pos();
    b.patch_here(data);
    let rel = |b: &Blob| (b.pos() - base) as u32;

    b.u32(0x0001_0000).u32(0).f32s(&[0.0, 1.0, 0.0, 2.0]).u32(1);
    let meshes = b.placeholder();
    b.u32(1).u32(0).zeros(40);

    let at = rel(&b);
    b.patch_u32(meshes, at);
    let vertex_format = crate::VertexFormat::POSITION
        | crate::VertexFormat::TEXCOORD0
        | crate::VertexFormat::BONE_INDEX;
    b.u32(0).f32s(&[0.0, 1.0, 0.0, 2.0]).u32(1);
    let submeshes = b.placeholder();
    b.u32(vertex_format).u32(0x2C).u32(3);
    let slots: Vec<usize> = (0..20).map(|_| b.placeholder()).collect();
    b.u32(0).u32(0).zeros(24);
    let mut mesh_name = [0u8; 64];
    mesh_name[..6].copy_from_slice(b"mesh_a");
    b.bytes(&mesh_name);

    let submesh_start = b.pos();
    let at = rel(&b);
    b.patch_u32(submeshes, at);
    b.u32(0).f32s(&[0.0, 1.0, 0.0, 2.0]).u32(3);
    b.bytes(&[0, 1, 0, 0, 0, 0, 0, 0]);
    b.u32(2);
    let bone_indices = b.placeholder();
    b.u32(4).u32(primitive).u32(index_format).u32(7);
    let indices = b.placeholder();
    b.u32(0);
    b.pad_to(submesh_start + 0x5C);

    let at = rel(&b);
    b.patch_u32(indices, at);
    b.bytes(&[0, 1, 2, 0xFF, 2, 1, 0]).align(4);
    let at = rel(&b);
    b.patch_u32(bone_indices, at);
    b.u16(5).u16(9);

    let at = rel(&b);
    b.patch_u32(slots[0], at);
    b.f32s(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
    let at = rel(&b);
    b.patch_u32(slots[4], at);
    b.f32s(&[0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
    let at = rel(&b);
    b.patch_u32(slots[11], at);
    b.f32s(&[0.0, 3.0, 6.0, -1.0, 3.0, -1.0, -1.0, -1.0, 9.0, 0.0, -1.0, -1.0]);
    b.build()
}
