//! Per-motion keyframe file (`mot_*.bin`, classic layout).

use crate::{Error, OffsetCursor};

const KEY_SET_NONE: u16 = 0;
const KEY_SET_STATIC: u16 = 1;
const KEY_SET_HERMITE: u16 = 2;

#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct Keyframe {
    pub frame: u16,
    pub value: f32,
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct TangentKeyframe {
    pub frame: u16,
    pub value: f32,
    pub tangent: f32,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub enum KeySet {
    None,
    Static(f32),
    Hermite(Vec<Keyframe>),
    HermiteTangent(Vec<TangentKeyframe>),
}

impl KeySet {
    pub fn keys_count(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Static(_) => 1,
            Self::Hermite(keys) => keys.len(),
            Self::HermiteTangent(keys) => keys.len(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct Motion {
    pub key_set_count: u16,
    pub skeleton_select: bool,
    pub high_bit: bool,
    pub frame_count: u16,
    /// Bone indices, including the terminating zero when present.
    pub bone_info: Vec<u16>,
    pub key_sets: Vec<KeySet>,
}

#[cfg(feature = "json")]
impl crate::JsonDump for Motion {}

impl Motion {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let mut c = OffsetCursor::new(bytes);

        let key_set_info_offset = c.read_offset()?;
        let key_set_types_offset = c.read_offset()?;
        let key_set_offset = c.read_offset()?;
        let bone_info_offset = c.read_offset()?;

        let (info, frame_count) =
            c.with_position(key_set_info_offset, |c| Ok((c.read_u16()?, c.read_u16()?)))?;
        let key_set_count = info & 0x3FFF;

        let bone_info = c.with_position(bone_info_offset, |c| {
            let mut indices = Vec::new();
            while c.remaining() >= 2 {
                let index = c.read_u16()?;
                indices.push(index);
                if index == 0 {
                    break;
                }
            }
            Ok(indices)
        })?;

        let types = c.with_position(key_set_types_offset, |c| {
            let mut types = Vec::with_capacity(key_set_count as usize);
            let mut packed = 0u16;
            for i in 0..key_set_count as usize {
                if i % 8 == 0 {
                    packed = c.read_u16()?;
                }
                types.push((packed >> (i % 8 * 2)) & 0x3);
            }
            Ok(types)
        })?;

        let key_sets = c.with_position(key_set_offset, |c| {
            types
                .iter()
                .map(|&ty| read_key_set(c, ty))
                .collect::<Result<Vec<_>, _>>()
        })?;

        Ok(Self {
            key_set_count,
            skeleton_select: info & 0x4000 != 0,
            high_bit: info & 0x8000 != 0,
            frame_count,
            bone_info,
            key_sets,
        })
    }
}

fn read_key_set(c: &mut OffsetCursor<'_>, ty: u16) -> Result<KeySet, Error> {
    match ty {
        KEY_SET_NONE => Ok(KeySet::None),
        KEY_SET_STATIC => Ok(KeySet::Static(c.read_f32()?)),
        _ => {
            let count = c.read_u16()? as usize;
            let frames = (0..count)
                .map(|_| c.read_u16())
                .collect::<Result<Vec<_>, _>>()?;
            c.align(4)?;
            if ty == KEY_SET_HERMITE {
                let keys = frames
                    .into_iter()
                    .map(|frame| -> Result<_, Error> {
                        Ok(Keyframe {
                            frame,
                            value: c.read_f32()?,
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(KeySet::Hermite(keys))
            } else {
                let keys = frames
                    .into_iter()
                    .map(|frame| -> Result<_, Error> {
                        Ok(TangentKeyframe {
                            frame,
                            value: c.read_f32()?,
                            tangent: c.read_f32()?,
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(KeySet::HermiteTangent(keys))
            }
        }
    }
}
