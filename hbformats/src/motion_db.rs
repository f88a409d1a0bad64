//! Motion database (`mot_db.bin`): motion sets and their motion ids.

use crate::bone_db::read_name_table;
use crate::{Error, OffsetCursor};

pub const MOTION_DB_MAGIC: u32 = 0x0000_0001;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct MotionInfo {
    pub id: u32,
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct MotionSet {
    pub id: u32,
    pub name: String,
    pub motions: Vec<MotionInfo>,
}

impl MotionSet {
    pub fn motion(&self, name: &str) -> Option<&MotionInfo> {
        self.motions.iter().find(|m| m.name == name)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct MotionDatabase {
    pub motion_sets: Vec<MotionSet>,
    pub bone_names: Vec<String>,
}

#[cfg(feature = "json")]
impl crate::JsonDump for MotionDatabase {}

impl MotionDatabase {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let mut c = OffsetCursor::new(bytes);

        let magic = c.read_u32()?;
        if magic != MOTION_DB_MAGIC {
            return Err(Error::InvalidMagic {
                format: "motion database",
                expected: MOTION_DB_MAGIC,
                found: magic,
            });
        }

        let motion_sets_offset = c.read_offset()?;
        let motion_set_ids_offset = c.read_offset()?;
        let motion_set_count = c.read_offset()?;
        let bone_name_offsets_offset = c.read_offset()?;
        let bone_name_count = c.read_offset()?;

        let mut motion_sets = c.with_position(motion_sets_offset, |c| {
            let mut sets = Vec::with_capacity(motion_set_count.min(c.remaining() / 16));
            for _ in 0..motion_set_count {
                let name_offset = c.read_offset()?;
                let motion_name_offsets_offset = c.read_offset()?;
                let motion_count = c.read_offset()?;
                let motion_ids_offset = c.read_offset()?;

                let names = read_name_table(c, motion_name_offsets_offset, motion_count)?;
                let ids = c.with_position(motion_ids_offset, |c| {
                    (0..motion_count).map(|_| c.read_u32()).collect::<Result<Vec<_>, _>>()
                })?;

                sets.push(MotionSet {
                    id: 0,
                    name: c.read_string_at(name_offset)?,
                    motions: ids
                        .into_iter()
                        .zip(names)
                        .map(|(id, name)| MotionInfo { id, name })
                        .collect(),
                });
            }
            Ok(sets)
        })?;

        // Set ids live in their own table, matched to sets by position.
        c.with_position(motion_set_ids_offset, |c| {
            for set in motion_sets.iter_mut() {
                set.id = c.read_u32()?;
            }
            Ok(())
        })?;

        let bone_names = read_name_table(&mut c, bone_name_offsets_offset, bone_name_count)?;

        Ok(Self {
            motion_sets,
            bone_names,
        })
    }

    pub fn motion_set(&self, name: &str) -> Option<&MotionSet> {
        self.motion_sets.iter().find(|s| s.name == name)
    }

    pub fn motion_set_by_id(&self, id: u32) -> Option<&MotionSet> {
        self.motion_sets.iter().find(|s| s.id == id)
    }
}
