//! Sprite database (`spr_db.bin`): sprite sets and the sprites they contain.

use crate::{Error, OffsetCursor};
use std::collections::{BTreeMap, HashMap};

const SET_INDEX_MASK: u32 = 0x0FFF;
const TEXTURE_FLAG: u32 = 0x1000;

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct SpriteInfo {
    pub id: u32,
    pub name: String,
    /// Position within the owning sprite set file.
    pub index: u16,
    /// Set when the entry names one of the set's textures instead of a sprite.
    pub texture: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct SpriteSetInfo {
    pub id: u32,
    pub name: String,
    pub file_name: String,
    pub index: u32,
    pub sprites: BTreeMap<String, SpriteInfo>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct SpriteDatabase {
    pub sprite_sets: Vec<SpriteSetInfo>,
    #[cfg_attr(feature = "json", serde(skip))]
    sets_by_name: HashMap<String, usize>,
}

#[cfg(feature = "json")]
impl crate::JsonDump for SpriteDatabase {}

impl SpriteDatabase {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let mut c = OffsetCursor::new(bytes);

        let sprite_set_count = c.read_offset()?;
        let sprite_sets_offset = c.read_offset()?;
        let sprite_count = c.read_offset()?;
        let sprites_offset = c.read_offset()?;

        let mut sprite_sets = c.with_position(sprite_sets_offset, |c| {
            let mut sets = Vec::with_capacity(sprite_set_count.min(c.remaining() / 16));
            for _ in 0..sprite_set_count {
                let id = c.read_u32()?;
                let name_offset = c.read_offset()?;
                let file_name_offset = c.read_offset()?;
                let index = c.read_u32()?;
                sets.push(SpriteSetInfo {
                    id,
                    name: c.read_string_at(name_offset)?,
                    file_name: c.read_string_at(file_name_offset)?,
                    index,
                    sprites: BTreeMap::new(),
                });
            }
            Ok(sets)
        })?;

        c.with_position(sprites_offset, |c| {
            for i in 0..sprite_count {
                let id = c.read_u32()?;
                let name_offset = c.read_offset()?;
                let info = c.read_u32()?;

                let index = (info & 0xFFFF) as u16;
                let set_index = ((info >> 16) & SET_INDEX_MASK) as usize;
                let texture = (info >> 16) & TEXTURE_FLAG != 0;
                let name = c.read_string_at(name_offset)?;

                let Some(set) = sprite_sets.get_mut(set_index) else {
                    log::warn!(
                        "sprite database: sprite {i} ('{name}') references set {set_index} but only {} sets exist; skipping",
                        sprite_set_count
                    );
                    continue;
                };
                set.sprites.insert(
                    name.clone(),
                    SpriteInfo {
                        id,
                        name,
                        index,
                        texture,
                    },
                );
            }
            Ok(())
        })?;

        let sets_by_name = sprite_sets
            .iter()
            .enumerate()
            .map(|(i, set)| (set.name.clone(), i))
            .collect();

        Ok(Self {
            sprite_sets,
            sets_by_name,
        })
    }

    pub fn sprite_set_index(&self, name: &str) -> Option<usize> {
        self.sets_by_name.get(name).copied()
    }

    pub fn sprite_set(&self, name: &str) -> Option<&SpriteSetInfo> {
        self.sprite_set_index(name).map(|i| &self.sprite_sets[i])
    }

    /// Index of `sprite_name` within the set file of set `set_index`.
    pub fn sprite_index(&self, set_index: usize, sprite_name: &str) -> Result<Option<u16>, Error> {
        let set = self
            .sprite_sets
            .get(set_index)
            .ok_or(Error::IndexOutOfRange {
                what: "sprite set",
                index: set_index,
                len: self.sprite_sets.len(),
            })?;
        Ok(set.sprites.get(sprite_name).map(|s| s.index))
    }
}
