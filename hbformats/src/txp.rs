//! TXP texture containers, embedded in sprite sets and object texture files.

use crate::{Error, OffsetCursor};

pub const TXP_SET_MAGIC: u32 = 0x0350_5854;
pub const TXP_TEXTURE_MAGIC: u32 = 0x0450_5854;
pub const TXP_CUBE_MAP_MAGIC: u32 = 0x0550_5854;
pub const TXP_MIPMAP_MAGIC: u32 = 0x0250_5854;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub enum TextureFormat {
    A8,
    Rgb8,
    Rgba8,
    Rgb5,
    Rgb5A1,
    Rgba4,
    Bc1,
    Bc1a,
    Bc2,
    Bc3,
    Bc4,
    Bc5,
    L8,
    L8A8,
    Unknown(u32),
}

/// Host image formats the TXP formats translate to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub enum PixelFormat {
    R8,
    Rgb8,
    Rgba8,
    Rgba4444,
    Dxt1,
    Dxt3,
    Dxt5,
    RgtcR,
    RgtcRg,
    L8,
    La8,
}

impl TextureFormat {
    pub fn from_u32(value: u32) -> Self {
        match value {
            0 => Self::A8,
            1 => Self::Rgb8,
            2 => Self::Rgba8,
            3 => Self::Rgb5,
            4 => Self::Rgb5A1,
            5 => Self::Rgba4,
            6 => Self::Bc1,
            7 => Self::Bc1a,
            8 => Self::Bc2,
            9 => Self::Bc3,
            10 => Self::Bc4,
            11 => Self::Bc5,
            12 => Self::L8,
            13 => Self::L8A8,
            other => Self::Unknown(other),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::A8 => "A8",
            Self::Rgb8 => "RGB8",
            Self::Rgba8 => "RGBA8",
            Self::Rgb5 => "RGB5",
            Self::Rgb5A1 => "RGB5A1",
            Self::Rgba4 => "RGBA4",
            Self::Bc1 => "BC1",
            Self::Bc1a => "BC1a",
            Self::Bc2 => "BC2",
            Self::Bc3 => "BC3",
            Self::Bc4 => "BC4",
            Self::Bc5 => "BC5",
            Self::L8 => "L8",
            Self::L8A8 => "L8A8",
            Self::Unknown(_) => "unknown",
        }
    }

    /// `None` means the host has no equivalent and the mipmap cannot be uploaded as-is.
    pub fn pixel_format(self) -> Option<PixelFormat> {
        match self {
            Self::A8 => Some(PixelFormat::R8),
            Self::Rgb8 => Some(PixelFormat::Rgb8),
            Self::Rgba8 => Some(PixelFormat::Rgba8),
            Self::Rgb5 | Self::Rgb5A1 => None,
            Self::Rgba4 => Some(PixelFormat::Rgba4444),
            Self::Bc1 | Self::Bc1a => Some(PixelFormat::Dxt1),
            Self::Bc2 => Some(PixelFormat::Dxt3),
            Self::Bc3 => Some(PixelFormat::Dxt5),
            Self::Bc4 => Some(PixelFormat::RgtcR),
            // Two channels packed as YA + CbCr rather than a true ATI2 normal map.
            Self::Bc5 => Some(PixelFormat::RgtcRg),
            Self::L8 => Some(PixelFormat::L8),
            Self::L8A8 => Some(PixelFormat::La8),
            Self::Unknown(_) => None,
        }
    }

    pub fn is_block_compressed(self) -> bool {
        matches!(
            self,
            Self::Bc1 | Self::Bc1a | Self::Bc2 | Self::Bc3 | Self::Bc4 | Self::Bc5
        )
    }

    /// Expected payload size in bytes for a `width` x `height` mipmap.
    ///
    /// `None` for unknown formats and for sizes that do not fit in memory.
    pub fn data_size(self, width: u32, height: u32) -> Option<usize> {
        let (w, h) = (u64::from(width), u64::from(height));
        let (w, h) = if self.is_block_compressed() {
            (w.next_multiple_of(4), h.next_multiple_of(4))
        } else {
            (w, h)
        };
        let size = w.checked_mul(h)?;
        let bytes = match self {
            Self::A8 | Self::L8 => Some(size),
            Self::Rgb8 => size.checked_mul(3),
            Self::Rgba8 => size.checked_mul(4),
            Self::Rgb5 | Self::Rgb5A1 | Self::Rgba4 | Self::L8A8 => size.checked_mul(2),
            Self::Bc1 | Self::Bc1a | Self::Bc4 => Some(size / 2),
            Self::Bc2 | Self::Bc3 | Self::Bc5 => Some(size),
            Self::Unknown(_) => None,
        }?;
        usize::try_from(bytes).ok()
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct Mipmap {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub id: u32,
    #[cfg_attr(feature = "json", serde(skip))]
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct Texture {
    pub cube_map: bool,
    pub array_size: u32,
    pub mipmap_count: u32,
    /// `array_size * mipmap_count` entries, slice-major.
    pub mipmaps: Vec<Mipmap>,
}

impl Texture {
    pub fn mipmap(&self, array_index: usize, level: usize) -> Option<&Mipmap> {
        if level >= self.mipmap_count as usize {
            return None;
        }
        self.mipmaps
            .get(array_index * self.mipmap_count as usize + level)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct TextureSet {
    pub textures: Vec<Texture>,
}

#[cfg(feature = "json")]
impl crate::JsonDump for TextureSet {}

impl TextureSet {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        Self::read(&mut OffsetCursor::new(bytes))
    }

    /// Decodes a texture set starting at the cursor position. Texture
    /// offsets are relative to that position.
    pub fn read(c: &mut OffsetCursor<'_>) -> Result<Self, Error> {
        let set_start = c.position();
        let magic = c.read_u32()?;
        if magic != TXP_SET_MAGIC {
            return Err(Error::InvalidMagic {
                format: "texture set",
                expected: TXP_SET_MAGIC,
                found: magic,
            });
        }

        let texture_count = c.read_offset()?;
        // Duplicate of the texture count with flag bits mixed in.
        c.read_u32()?;

        let mut textures = Vec::with_capacity(texture_count.min(c.remaining() / 4));
        for i in 0..texture_count {
            let texture_start = set_start + c.read_offset()?;
            if let Some(texture) = c.with_position(texture_start, |c| read_texture(c, texture_start, i))? {
                textures.push(texture);
            }
        }

        Ok(Self { textures })
    }
}

fn read_texture(
    c: &mut OffsetCursor<'_>,
    texture_start: usize,
    index: usize,
) -> Result<Option<Texture>, Error> {
    let signature = c.read_u32()?;
    if signature != TXP_TEXTURE_MAGIC && signature != TXP_CUBE_MAP_MAGIC {
        log::warn!(
            "texture set: texture {index} at {texture_start:#x} has unknown signature {signature:#010x}; skipping"
        );
        return Ok(None);
    }

    let subtex_count = c.read_u32()?;
    let info = c.read_u32()?;
    let array_size = (info >> 8) & 0xFF;
    let mut mipmap_count = info & 0xFF;
    if array_size == 1 && mipmap_count != subtex_count {
        log::warn!(
            "texture set: texture {index} declares {mipmap_count} mipmaps but has {subtex_count} subtextures; using the subtexture count"
        );
        mipmap_count = subtex_count & 0xFF;
    }

    let mut mipmaps = Vec::with_capacity((array_size * mipmap_count) as usize);
    for _ in 0..array_size * mipmap_count {
        let mipmap_offset = texture_start + c.read_offset()?;
        let mipmap = c.with_position(mipmap_offset, |c| read_mipmap(c, index))?;
        mipmaps.push(mipmap);
    }

    Ok(Some(Texture {
        cube_map: signature == TXP_CUBE_MAP_MAGIC,
        array_size,
        mipmap_count,
        mipmaps,
    }))
}

fn read_mipmap(c: &mut OffsetCursor<'_>, texture: usize) -> Result<Mipmap, Error> {
    let offset = c.position();
    let signature = c.read_u32()?;
    if signature != TXP_MIPMAP_MAGIC {
        return Err(Error::InvalidSignature {
            format: "texture set",
            what: "mipmap",
            found: signature,
            offset,
        });
    }

    let width = c.read_u32()?;
    let height = c.read_u32()?;
    let format = TextureFormat::from_u32(c.read_u32()?);
    let id = c.read_u32()?;
    let data_size = c.read_offset()?;
    let data = c.read_bytes(data_size)?.to_vec();

    let expected = format.data_size(width, height).unwrap_or(data_size);
    if expected != data_size {
        log::warn!(
            "texture set: texture {texture} {} mipmap {width}x{height} stores {data_size} bytes, expected {expected}",
            format.name()
        );
    }

    Ok(Mipmap {
        width,
        height,
        format,
        id,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_formats_round_up_to_whole_blocks() {
        assert_eq!(TextureFormat::Bc1.data_size(4, 4), Some(8));
        assert_eq!(TextureFormat::Bc1.data_size(1, 1), Some(8));
        assert_eq!(TextureFormat::Bc3.data_size(6, 2), Some(32));
        assert_eq!(TextureFormat::Bc4.data_size(8, 8), Some(32));
    }

    #[test]
    fn oversized_dimensions_do_not_overflow() {
        assert_eq!(
            TextureFormat::Bc1.data_size(u32::MAX, 4),
            usize::try_from(1u64 << 33).ok()
        );
        assert_eq!(TextureFormat::Rgba8.data_size(u32::MAX, u32::MAX), None);
    }

    #[test]
    fn uncompressed_sizes_scale_by_texel_width() {
        assert_eq!(TextureFormat::A8.data_size(3, 3), Some(9));
        assert_eq!(TextureFormat::Rgb8.data_size(2, 2), Some(12));
        assert_eq!(TextureFormat::Rgba8.data_size(2, 2), Some(16));
        assert_eq!(TextureFormat::L8A8.data_size(2, 2), Some(8));
        assert_eq!(TextureFormat::Unknown(99).data_size(2, 2), None);
    }

    #[test]
    fn unsupported_formats_have_no_pixel_format() {
        assert_eq!(TextureFormat::Rgb5.pixel_format(), None);
        assert_eq!(TextureFormat::Rgb5A1.pixel_format(), None);
        assert_eq!(TextureFormat::from_u32(14).pixel_format(), None);
        assert_eq!(TextureFormat::Bc1a.pixel_format(), Some(PixelFormat::Dxt1));
        assert_eq!(TextureFormat::from_u32(13), TextureFormat::L8A8);
    }
}
