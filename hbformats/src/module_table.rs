//! Module (costume) table, `gm_module_tbl.txt`.

use crate::{Error, KvTable, SpriteDatabase};
use std::collections::BTreeMap;

const MODULE_ROOT: &str = "module";

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub enum Character {
    Miku,
    Rin,
    Len,
    Luka,
    Neru,
    Haku,
    Kaito,
    Meiko,
    Sakine,
    Teto,
}

impl Character {
    pub const ALL: [Character; 10] = [
        Character::Miku,
        Character::Rin,
        Character::Len,
        Character::Luka,
        Character::Neru,
        Character::Haku,
        Character::Kaito,
        Character::Meiko,
        Character::Sakine,
        Character::Teto,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "MIKU" => Self::Miku,
            "RIN" => Self::Rin,
            "LEN" => Self::Len,
            "LUKA" => Self::Luka,
            "NERU" => Self::Neru,
            "HAKU" => Self::Haku,
            "KAITO" => Self::Kaito,
            "MEIKO" => Self::Meiko,
            "SAKINE" => Self::Sakine,
            "TETO" => Self::Teto,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Miku => "MIKU",
            Self::Rin => "RIN",
            Self::Len => "LEN",
            Self::Luka => "LUKA",
            Self::Neru => "NERU",
            Self::Haku => "HAKU",
            Self::Kaito => "KAITO",
            Self::Meiko => "MEIKO",
            Self::Sakine => "SAKINE",
            Self::Teto => "TETO",
        }
    }
}

/// A select-screen sprite resolved against the sprite database.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct ModuleSprite {
    pub set_name: String,
    pub sprite_name: String,
    pub set_index: Option<usize>,
    pub sprite_index: Option<u16>,
}

impl ModuleSprite {
    fn resolve(set_name: String, sprite_name: String, sprite_db: Option<&SpriteDatabase>) -> Self {
        let set_index = sprite_db.and_then(|db| db.sprite_set_index(&set_name));
        let sprite_index = match (sprite_db, set_index) {
            (Some(db), Some(set)) => db.sprite_index(set, &sprite_name).ok().flatten(),
            _ => None,
        };
        Self {
            set_name,
            sprite_name,
            set_index,
            sprite_index,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct Module {
    pub id: i32,
    pub sort_index: i32,
    pub name: String,
    pub chara: Option<Character>,
    /// Zero-based costume number (`COS_001` is 0).
    pub cos: Option<i32>,
    pub select_sprite: ModuleSprite,
    pub select_sprite_common: ModuleSprite,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct ModuleTable {
    pub modules: BTreeMap<i32, Module>,
}

#[cfg(feature = "json")]
impl crate::JsonDump for ModuleTable {}

impl ModuleTable {
    pub fn parse(text: &str, sprite_db: Option<&SpriteDatabase>) -> Result<Self, Error> {
        Self::from_kv_table(&KvTable::parse(text)?, sprite_db)
    }

    pub fn from_kv_table(table: &KvTable, sprite_db: Option<&SpriteDatabase>) -> Result<Self, Error> {
        let mut modules = BTreeMap::new();

        for i in 0..table.get_children_count(MODULE_ROOT)? {
            let field = |key: &str| module_field(table, i, key);

            let Some(id) = field("id")? else {
                log::debug!("module table: child {i} has no id; skipping");
                continue;
            };
            let id = parse_int(id, "id", i);
            let sort_index = field("sort_index")?.map_or(0, |v| parse_int(v, "sort_index", i));
            let name = field("name")?.unwrap_or_default().to_string();
            let chara = match field("chara")? {
                Some(value) => {
                    let chara = Character::from_name(value);
                    if chara.is_none() {
                        log::warn!("module table: module {id} has unknown character '{value}'");
                    }
                    chara
                }
                None => None,
            };
            let cos = field("cos")?.and_then(parse_costume);

            let module = Module {
                id,
                sort_index,
                name,
                chara,
                cos,
                select_sprite: ModuleSprite::resolve(
                    format!("SPR_SEL_MD{id:03}"),
                    format!("SPR_SEL_MD{id:03}_MD_IMG_{id:03}"),
                    sprite_db,
                ),
                select_sprite_common: ModuleSprite::resolve(
                    format!("SPR_SEL_MD{id:03}CMN"),
                    format!("SPR_SEL_MD{id:03}CMN_MD_IMG"),
                    sprite_db,
                ),
            };
            if modules.insert(id, module).is_some() {
                log::warn!("module table: duplicate module id {id}; later entry wins");
            }
        }

        Ok(Self { modules })
    }

    pub fn module(&self, id: i32) -> Option<&Module> {
        self.modules.get(&id)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

fn module_field<'t>(table: &'t KvTable, child: usize, key: &str) -> Result<Option<&'t str>, Error> {
    if table.child_has_key(MODULE_ROOT, child, key)? {
        table.child_get_value(MODULE_ROOT, child, key).map(Some)
    } else {
        Ok(None)
    }
}

fn parse_int(value: &str, field: &str, child: usize) -> i32 {
    value.trim().parse().unwrap_or_else(|_| {
        log::warn!("module table: child {child} field '{field}' is not an integer: '{value}'");
        0
    })
}

/// `COS_001` -> `Some(0)`.
fn parse_costume(value: &str) -> Option<i32> {
    let digits = value.strip_prefix("COS_")?;
    let end = digits
        .char_indices()
        .take(3)
        .take_while(|(_, ch)| ch.is_ascii_digit())
        .last()
        .map(|(i, ch)| i + ch.len_utf8())?;
    digits[..end].parse::<i32>().ok().map(|n| n - 1)
}
