//! Skeleton/bone database (`bone_data.bin`).

use crate::{Error, OffsetCursor};

pub const BONE_DB_MAGIC: u32 = 0x0910_2720;

const BONE_RECORD_SIZE: usize = 12;
const BONE_LIST_END: u8 = 0xFF;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub enum BoneType {
    Rotation,
    Type1,
    Position,
    PositionRotation,
    HeadIkRotation,
    ArmIkRotation,
    LegsIkRotation,
    Unknown(u8),
}

impl BoneType {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Rotation,
            1 => Self::Type1,
            2 => Self::Position,
            3 => Self::PositionRotation,
            4 => Self::HeadIkRotation,
            5 => Self::ArmIkRotation,
            6 => Self::LegsIkRotation,
            other => Self::Unknown(other),
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Rotation => 0,
            Self::Type1 => 1,
            Self::Position => 2,
            Self::PositionRotation => 3,
            Self::HeadIkRotation => 4,
            Self::ArmIkRotation => 5,
            Self::LegsIkRotation => 6,
            Self::Unknown(v) => v,
        }
    }

    /// IK chain bones (and anything after them) carry no rest transform of their own.
    pub fn is_ik(self) -> bool {
        self.as_u8() >= Self::HeadIkRotation.as_u8()
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct Bone {
    pub name: String,
    pub kind: BoneType,
    pub has_parent: bool,
    pub parent: u8,
    pub pole_target: u8,
    pub mirror: u8,
    pub flags: u8,
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct Skeleton {
    pub name: String,
    pub bones: Vec<Bone>,
    /// Rest positions, one per bone.
    pub positions: Vec<[f32; 3]>,
    pub heel_height: f32,
    pub object_bone_names: Vec<String>,
    pub motion_bone_names: Vec<String>,
    pub parent_indices: Vec<u16>,
}

impl Skeleton {
    pub fn bone(&self, name: &str) -> Option<(usize, &Bone)> {
        self.bones.iter().enumerate().find(|(_, b)| b.name == name)
    }

    /// Parent of bone `index`, or `None` for roots and for parents that
    /// point at the bone itself or past the bone list.
    pub fn parent_of(&self, index: usize) -> Option<usize> {
        let bone = self.bones.get(index)?;
        if !bone.has_parent {
            return None;
        }
        let parent = bone.parent as usize;
        (parent != index && parent < self.bones.len()).then_some(parent)
    }

    /// Rebuilds `target`'s bone hierarchy from this skeleton.
    pub fn apply_to<B: SkeletonBuilder + ?Sized>(&self, target: &mut B) {
        target.clear_bones();
        for bone in &self.bones {
            target.add_bone(&bone.name);
        }
        for (i, bone) in self.bones.iter().enumerate() {
            if bone.kind.is_ik() {
                continue;
            }
            if let Some(parent) = self.parent_of(i) {
                target.set_bone_parent(i, parent);
            }
            target.set_bone_rest(i, self.positions.get(i).copied().unwrap_or_default());
        }
    }
}

/// Host-side skeleton that decoded bone hierarchies are handed to.
pub trait SkeletonBuilder {
    fn clear_bones(&mut self);
    fn add_bone(&mut self, name: &str);
    fn set_bone_parent(&mut self, bone: usize, parent: usize);
    fn set_bone_rest(&mut self, bone: usize, position: [f32; 3]);
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct BoneDatabase {
    pub skeletons: Vec<Skeleton>,
}

#[cfg(feature = "json")]
impl crate::JsonDump for BoneDatabase {}

impl BoneDatabase {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let mut c = OffsetCursor::new(bytes);

        let magic = c.read_u32()?;
        if magic != BONE_DB_MAGIC {
            return Err(Error::InvalidMagic {
                format: "bone database",
                expected: BONE_DB_MAGIC,
                found: magic,
            });
        }

        let skeleton_count = c.read_offset()?;
        let skeleton_offsets_offset = c.read_offset()?;
        let skeleton_name_offsets_offset = c.read_offset()?;
        c.skip(0x14)?;

        let mut skeletons = Vec::with_capacity(skeleton_count.min(c.len() / 4));
        c.with_position(skeleton_offsets_offset, |c| {
            for i in 0..skeleton_count {
                let skeleton_offset = c.read_offset()?;
                let skeleton = c.with_position(skeleton_offset, |c| read_skeleton(c, i))?;
                skeletons.push(skeleton);
            }
            Ok(())
        })?;

        c.with_position(skeleton_name_offsets_offset, |c| {
            for skeleton in skeletons.iter_mut() {
                let name_offset = c.read_offset()?;
                skeleton.name = c.read_string_at(name_offset)?;
            }
            Ok(())
        })?;

        for skeleton in &skeletons {
            for (i, bone) in skeleton.bones.iter().enumerate() {
                if bone.has_parent && bone.parent as usize == i {
                    log::warn!(
                        "bone database: skeleton '{}' bone {i} ('{}') is its own parent; treating as root",
                        skeleton.name,
                        bone.name
                    );
                }
            }
        }

        Ok(Self { skeletons })
    }

    pub fn skeleton(&self, name: &str) -> Option<&Skeleton> {
        self.skeletons.iter().find(|s| s.name == name)
    }
}

fn read_skeleton(c: &mut OffsetCursor<'_>, index: usize) -> Result<Skeleton, Error> {
    let bones_offset = c.read_offset()?;
    let position_count = c.read_offset()?;
    let positions_offset = c.read_offset()?;
    let heel_height_offset = c.read_offset()?;
    let object_bone_count = c.read_offset()?;
    let object_bone_names_offset = c.read_offset()?;
    let motion_bone_count = c.read_offset()?;
    let motion_bone_names_offset = c.read_offset()?;
    let parent_indices_offset = c.read_offset()?;
    c.skip(0x14)?;

    let bone_count = c.with_position(bones_offset, |c| {
        let mut count = 0usize;
        while c.read_u8()? != BONE_LIST_END {
            c.skip(BONE_RECORD_SIZE - 1)?;
            count += 1;
        }
        Ok(count)
    })?;

    let bones = c.with_position(bones_offset, |c| {
        let mut bones = Vec::with_capacity(bone_count);
        for _ in 0..bone_count {
            let kind = BoneType::from_u8(c.read_u8()?);
            let has_parent = c.read_bool()?;
            let parent = c.read_u8()?;
            let pole_target = c.read_u8()?;
            let mirror = c.read_u8()?;
            let flags = c.read_u8()?;
            c.skip(2)?;
            let name_offset = c.read_offset()?;
            bones.push(Bone {
                name: c.read_string_at(name_offset)?,
                kind,
                has_parent,
                parent,
                pole_target,
                mirror,
                flags,
            });
        }
        Ok(bones)
    })?;

    let mut positions = c.with_position(positions_offset, |c| {
        (0..position_count).map(|_| c.read_vec3()).collect::<Result<Vec<_>, _>>()
    })?;
    if positions.len() != bones.len() {
        log::warn!(
            "bone database: skeleton {index} has {} positions for {} bones; resizing",
            positions.len(),
            bones.len()
        );
        positions.resize(bones.len(), [0.0; 3]);
    }

    let heel_height = c.with_position(heel_height_offset, |c| c.read_f32())?;
    let object_bone_names = read_name_table(c, object_bone_names_offset, object_bone_count)?;
    let motion_bone_names = read_name_table(c, motion_bone_names_offset, motion_bone_count)?;
    let parent_indices = c.with_position(parent_indices_offset, |c| {
        (0..motion_bone_count).map(|_| c.read_u16()).collect::<Result<Vec<_>, _>>()
    })?;

    for (i, bone) in bones.iter().enumerate() {
        if bone.has_parent && bone.parent as usize >= bones.len() {
            log::warn!(
                "bone database: skeleton {index} bone {i} ('{}') has parent {} out of range ({} bones); treating as root",
                bone.name,
                bone.parent,
                bones.len()
            );
        }
    }

    Ok(Skeleton {
        name: String::new(),
        bones,
        positions,
        heel_height,
        object_bone_names,
        motion_bone_names,
        parent_indices,
    })
}

/// Reads `count` string offsets at `offset` and resolves each one.
pub(crate) fn read_name_table(
    c: &mut OffsetCursor<'_>,
    offset: usize,
    count: usize,
) -> Result<Vec<String>, Error> {
    c.with_position(offset, |c| {
        let mut names = Vec::with_capacity(count.min(c.remaining() / 4));
        for _ in 0..count {
            let name_offset = c.read_offset()?;
            names.push(c.read_string_at(name_offset)?);
        }
        Ok(names)
    })
}
