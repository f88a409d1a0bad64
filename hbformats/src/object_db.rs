//! Object database (`obj_db.bin`): which object set file holds which object.

use crate::{Error, OffsetCursor};
use std::collections::HashMap;

const OBJECT_SET_RECORD_SIZE: usize = 0x24;

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct ObjectInfo {
    pub id: u32,
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct ObjectSetInfo {
    pub id: u32,
    pub name: String,
    pub object_file_name: String,
    pub texture_file_name: String,
    pub archive_file_name: String,
    pub objects: Vec<ObjectInfo>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct ObjectDatabase {
    pub max_object_set_id: u32,
    pub object_sets: Vec<ObjectSetInfo>,
    #[cfg_attr(feature = "json", serde(skip))]
    set_index_by_id: HashMap<u32, usize>,
}

#[cfg(feature = "json")]
impl crate::JsonDump for ObjectDatabase {}

impl ObjectDatabase {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let mut c = OffsetCursor::new(bytes);

        let object_set_count = c.read_offset()?;
        let max_object_set_id = c.read_u32()?;
        let object_sets_offset = c.read_offset()?;
        let object_count = c.read_offset()?;
        let objects_offset = c.read_offset()?;

        let mut object_sets = Vec::with_capacity(object_set_count.min(c.len() / OBJECT_SET_RECORD_SIZE));
        let mut set_index_by_id = HashMap::new();
        for i in 0..object_set_count {
            c.seek(object_sets_offset + OBJECT_SET_RECORD_SIZE * i)?;
            let name_offset = c.read_offset()?;
            let id = c.read_u32()?;
            let object_file_offset = c.read_offset()?;
            let texture_file_offset = c.read_offset()?;
            let archive_file_offset = c.read_offset()?;

            if set_index_by_id.insert(id, i).is_some() {
                log::warn!("object database: duplicate object set id {id}; later set {i} wins");
            }
            object_sets.push(ObjectSetInfo {
                id,
                name: c.read_string_at(name_offset)?,
                object_file_name: c.read_string_at(object_file_offset)?,
                texture_file_name: c.read_string_at(texture_file_offset)?,
                archive_file_name: c.read_string_at(archive_file_offset)?,
                objects: Vec::new(),
            });
        }

        c.with_position(objects_offset, |c| {
            for i in 0..object_count {
                let id = c.read_u16()? as u32;
                let set_id = c.read_u16()? as u32;
                let name_offset = c.read_offset()?;
                let name = c.read_string_at(name_offset)?;

                let Some(&set_index) = set_index_by_id.get(&set_id) else {
                    log::warn!(
                        "object database: object {i} ('{name}') references unknown object set {set_id}; skipping"
                    );
                    continue;
                };
                object_sets[set_index].objects.push(ObjectInfo { id, name });
            }
            Ok(())
        })?;

        Ok(Self {
            max_object_set_id,
            object_sets,
            set_index_by_id,
        })
    }

    pub fn object_set_by_id(&self, id: u32) -> Option<&ObjectSetInfo> {
        self.set_index_by_id
            .get(&id)
            .map(|&i| &self.object_sets[i])
    }

    pub fn object_set(&self, name: &str) -> Option<&ObjectSetInfo> {
        self.object_sets.iter().find(|s| s.name == name)
    }
}
