//! Sprite set files (`spr_*.bin`): sprite rectangles plus their TXP textures.

use crate::bone_db::read_name_table;
use crate::{Error, OffsetCursor, TextureSet};

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct Sprite {
    pub name: String,
    pub texture_id: u32,
    pub rotate: i32,
    /// Normalized `[x, y, width, height]` within the texture.
    pub rect: [f32; 4],
    pub position: [f32; 2],
    pub size: [f32; 2],
    pub attributes: u32,
    pub resolution_mode: u32,
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct SpriteSet {
    pub flags: u32,
    pub sprites: Vec<Sprite>,
    pub texture_names: Vec<String>,
    pub textures: TextureSet,
}

#[cfg(feature = "json")]
impl crate::JsonDump for SpriteSet {}

impl SpriteSet {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let mut c = OffsetCursor::new(bytes);

        let flags = c.read_u32()?;
        let textures_offset = c.read_offset()?;
        let texture_count = c.read_offset()?;
        let sprite_count = c.read_offset()?;
        let sprite_info_offset = c.read_offset()?;
        let texture_name_offset = c.read_offset()?;
        let sprite_name_offset = c.read_offset()?;
        let sprite_data_offset = c.read_offset()?;

        let mut sprites = c.with_position(sprite_info_offset, |c| {
            let mut sprites = Vec::with_capacity(sprite_count.min(c.remaining() / 40));
            for _ in 0..sprite_count {
                let texture_id = c.read_u32()?;
                let rotate = c.read_i32()?;
                let rect = c.read_vec4()?;
                let position = [c.read_f32()?, c.read_f32()?];
                let size = [c.read_f32()?, c.read_f32()?];
                sprites.push(Sprite {
                    texture_id,
                    rotate,
                    rect,
                    position,
                    size,
                    ..Sprite::default()
                });
            }
            Ok(sprites)
        })?;

        let names = read_name_table(&mut c, sprite_name_offset, sprite_count)?;
        for (sprite, name) in sprites.iter_mut().zip(names) {
            sprite.name = name;
        }

        c.with_position(sprite_data_offset, |c| {
            for sprite in sprites.iter_mut() {
                sprite.attributes = c.read_u32()?;
                sprite.resolution_mode = c.read_u32()?;
            }
            Ok(())
        })?;

        let texture_names = read_name_table(&mut c, texture_name_offset, texture_count)?;
        let textures = c.with_position(textures_offset, TextureSet::read)?;
        if textures.textures.len() != texture_count {
            log::warn!(
                "sprite set: header declares {texture_count} textures but the texture set holds {}",
                textures.textures.len()
            );
        }

        Ok(Self {
            flags,
            sprites,
            texture_names,
            textures,
        })
    }

    pub fn sprite(&self, name: &str) -> Option<&Sprite> {
        self.sprites.iter().find(|s| s.name == name)
    }
}
