//! Low-level primitives of the container format.
//!
//! Everything is big-endian. Arrays are a `u32` count followed by their elements; vectors are
//! stored as structure-of-arrays (all xs, then all ys, then all zs).

use nalgebra::{Vector2, Vector3};

use crate::{Error, LayerBitmask, Result, TypedIndex};

/// Read cursor over a byte slice. All reads are big-endian.
#[derive(Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current byte position.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Remaining bytes from current position.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Seek to an absolute position.
    ///
    /// # Errors
    /// * `pos` is past the end of the data
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(Error::corrupt(
                self.pos,
                format!("seek past end of data: {pos} > {}", self.data.len()),
            ));
        }
        self.pos = pos;
        Ok(())
    }

    /// Create a cursor positioned at an absolute offset into the same data.
    pub fn at_offset(&self, offset: usize) -> Result<Self> {
        let mut res = self.clone();
        res.seek(offset)?;
        Ok(res)
    }

    /// Read a slice of `n` bytes without copying.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.ensure(n)?;
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Read exactly `N` bytes into an array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut res = [0u8; N];
        res.copy_from_slice(self.read_bytes(N)?);
        Ok(res)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.read_array().map(u16::from_be_bytes)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_array().map(u32::from_be_bytes)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        self.read_array().map(f32::from_be_bytes)
    }

    /// Read an array length prefix, checking that `count` elements of at least `min_size` bytes
    /// each could actually follow it.
    pub fn read_len(&mut self, min_size: usize) -> Result<usize> {
        let offset = self.pos;
        let count = self.read_u32()? as usize;
        if count.saturating_mul(min_size) > self.remaining() {
            return Err(Error::corrupt(
                offset,
                format!(
                    "bad length prefix: {count} elements of {min_size} bytes, {} bytes remain",
                    self.remaining()
                ),
            ));
        }
        Ok(count)
    }

    /// Read a length-prefixed array of elements, each read with `f`.
    ///
    /// `min_size` is the smallest possible encoded size of an element, used to reject absurd
    /// length prefixes before allocating.
    pub fn read_vec<T>(
        &mut self,
        min_size: usize,
        mut f: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        let count = self.read_len(min_size)?;
        let mut res = Vec::with_capacity(count);
        for _ in 0..count {
            res.push(f(self)?);
        }
        Ok(res)
    }

    pub fn read_u16_vec(&mut self) -> Result<Vec<u16>> {
        self.read_vec(2, Self::read_u16)
    }

    pub fn read_u32_vec(&mut self) -> Result<Vec<u32>> {
        self.read_vec(4, Self::read_u32)
    }

    pub fn read_f32_vec(&mut self) -> Result<Vec<f32>> {
        self.read_vec(4, Self::read_f32)
    }

    /// Read an array of typed indices.
    pub fn read_index_vec<I: TypedIndex<Repr = u16>>(&mut self) -> Result<Vec<I>> {
        self.read_vec(2, |c| c.read_u16().map(I::from_raw))
    }

    /// Read a `u32` length followed by UTF-8 bytes.
    pub fn read_string(&mut self) -> Result<String> {
        let offset = self.pos;
        let len = self.read_len(1)?;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| Error::corrupt(offset, format!("invalid string: {e}")))
    }

    pub fn read_string_vec(&mut self) -> Result<Vec<String>> {
        self.read_vec(4, Self::read_string)
    }

    /// Read a `u16`-encoded enum.
    pub fn read_enum<E: TryFrom<u16, Error = u16>>(&mut self, name: &str) -> Result<E> {
        let offset = self.pos;
        let raw = self.read_u16()?;
        E::try_from(raw).map_err(|raw| Error::corrupt(offset, format!("unknown {name}: {raw}")))
    }

    /// Read a structure-of-arrays 3D vector array; every component array must have the same
    /// length.
    pub fn read_vector3_vec(&mut self) -> Result<Vec<Vector3<f32>>> {
        let offset = self.pos;
        let xs = self.read_f32_vec()?;
        let ys = self.read_f32_vec()?;
        let zs = self.read_f32_vec()?;
        if xs.len() != ys.len() || xs.len() != zs.len() {
            return Err(Error::corrupt(
                offset,
                format!(
                    "mismatched vector components: {}/{}/{}",
                    xs.len(),
                    ys.len(),
                    zs.len()
                ),
            ));
        }
        Ok(xs
            .into_iter()
            .zip(ys)
            .zip(zs)
            .map(|((x, y), z)| Vector3::new(x, y, z))
            .collect())
    }

    /// Read a structure-of-arrays 2D vector array.
    pub fn read_vector2_vec(&mut self) -> Result<Vec<Vector2<f32>>> {
        let offset = self.pos;
        let us = self.read_f32_vec()?;
        let vs = self.read_f32_vec()?;
        if us.len() != vs.len() {
            return Err(Error::corrupt(
                offset,
                format!("mismatched vector components: {}/{}", us.len(), vs.len()),
            ));
        }
        Ok(us
            .into_iter()
            .zip(vs)
            .map(|(u, v)| Vector2::new(u, v))
            .collect())
    }

    fn ensure(&self, n: usize) -> Result<()> {
        if self.pos.saturating_add(n) > self.data.len() {
            return Err(Error::corrupt(
                self.pos,
                format!(
                    "unexpected end of data: need {n} bytes, have {}",
                    self.remaining()
                ),
            ));
        }
        Ok(())
    }
}

/// Builds a byte buffer. All writes are big-endian.
#[derive(Debug, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.buf.len()
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    /// Write an array length prefix.
    ///
    /// # Errors
    /// * `len` doesn't fit in a `u32`
    pub fn write_len(&mut self, len: usize) -> Result<()> {
        let len = u32::try_from(len)
            .map_err(|_| Error::invalid(format!("array too long to encode: {len}")))?;
        self.write_u32(len);
        Ok(())
    }

    /// Write a length-prefixed array, each element written with `f`.
    pub fn write_vec<T>(
        &mut self,
        items: &[T],
        mut f: impl FnMut(&mut Self, &T) -> Result<()>,
    ) -> Result<()> {
        self.write_len(items.len())?;
        for item in items {
            f(self, item)?;
        }
        Ok(())
    }

    pub fn write_u16_vec(&mut self, items: &[u16]) -> Result<()> {
        self.write_vec(items, |w, &v| {
            w.write_u16(v);
            Ok(())
        })
    }

    pub fn write_u32_vec(&mut self, items: &[u32]) -> Result<()> {
        self.write_vec(items, |w, &v| {
            w.write_u32(v);
            Ok(())
        })
    }

    pub fn write_f32_vec(&mut self, items: &[f32]) -> Result<()> {
        self.write_vec(items, |w, &v| {
            w.write_f32(v);
            Ok(())
        })
    }

    pub fn write_index_vec<I: TypedIndex<Repr = u16>>(&mut self, items: &[I]) -> Result<()> {
        self.write_vec(items, |w, i| {
            w.write_u16(i.raw());
            Ok(())
        })
    }

    pub fn write_string(&mut self, s: &str) -> Result<()> {
        self.write_len(s.len())?;
        self.buf.extend_from_slice(s.as_bytes());
        Ok(())
    }

    pub fn write_string_vec(&mut self, items: &[String]) -> Result<()> {
        self.write_vec(items, |w, s| w.write_string(s))
    }

    pub fn write_enum(&mut self, v: impl Into<u16>) {
        self.write_u16(v.into());
    }

    pub fn write_vector3_vec(&mut self, items: &[Vector3<f32>]) -> Result<()> {
        for axis in 0..3 {
            self.write_vec(items, |w, v| {
                w.write_f32(v[axis]);
                Ok(())
            })?;
        }
        Ok(())
    }

    pub fn write_vector2_vec(&mut self, items: &[Vector2<f32>]) -> Result<()> {
        for axis in 0..2 {
            self.write_vec(items, |w, v| {
                w.write_f32(v[axis]);
                Ok(())
            })?;
        }
        Ok(())
    }

    /// Patch a u32 at a specific position (for backpatching offsets).
    ///
    /// # Errors
    /// * `value` doesn't fit in a `u32`
    pub fn patch_u32(&mut self, pos: usize, value: usize) -> Result<()> {
        let value = u32::try_from(value)
            .map_err(|_| Error::invalid(format!("offset too large to encode: {value}")))?;
        if let Some(slot) = self.buf.get_mut(pos..pos + 4) {
            slot.copy_from_slice(&value.to_be_bytes());
        }
        Ok(())
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Leading bytes of every container.
pub const MAGIC: &[u8; 3] = b"DNA";
/// Trailing bytes of every container.
pub const EOF_MAGIC: &[u8; 3] = b"AND";
pub const GENERATION: u16 = 2;
pub const VERSION: u16 = 1;
/// Versions of [GENERATION] this crate can read.
pub const SUPPORTED_VERSIONS: std::ops::RangeInclusive<u16> = 1..=1;
/// Encoded size of a [Header].
pub const HEADER_SIZE: usize = 3 + 2 + 2 + 2 + 4 * SECTION_COUNT;
pub const SECTION_COUNT: usize = 4;

/// Top-level sections of a container, in file order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Section {
    Descriptor = 0,
    Definition = 1,
    Behavior = 2,
    Geometry = 3,
}

impl Section {
    pub const ALL: [Section; SECTION_COUNT] = [
        Section::Descriptor,
        Section::Definition,
        Section::Behavior,
        Section::Geometry,
    ];

    /// Whether a file with `layers` contains this section.
    pub fn is_present(self, layers: LayerBitmask) -> bool {
        match self {
            Section::Descriptor => layers.contains(LayerBitmask::DESCRIPTOR),
            Section::Definition => layers.contains(LayerBitmask::DEFINITION),
            Section::Behavior => layers.contains(LayerBitmask::BEHAVIOR),
            Section::Geometry => layers.has_geometry(),
        }
    }

    /// Read a section tag, checking it against `self`.
    pub fn expect(self, cursor: &mut Cursor<'_>) -> Result<()> {
        let offset = cursor.position();
        let tag = cursor.read_u16()?;
        if tag != self as u16 {
            return Err(Error::corrupt(
                offset,
                format!("section order mismatch: expected {self:?} ({}), found tag {tag}", self as u16),
            ));
        }
        Ok(())
    }
}

/// Fixed-size container header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub generation: u16,
    pub version: u16,
    /// Layers present in the file.
    pub layers: LayerBitmask,
    /// Absolute offset of each [Section]; 0 if absent.
    pub offsets: [u32; SECTION_COUNT],
}

impl Header {
    /// Parse and validate the header of `data`, including its trailing magic.
    pub fn read(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);
        if cursor.read_array::<3>()? != *MAGIC {
            return Err(Error::corrupt(0, "missing container signature"));
        }
        let generation = cursor.read_u16()?;
        let version = cursor.read_u16()?;
        if generation != GENERATION || !SUPPORTED_VERSIONS.contains(&version) {
            return Err(Error::UnsupportedVersion {
                generation,
                version,
            });
        }
        let raw_layers = cursor.read_u16()?;
        let layers = LayerBitmask::from_bits(raw_layers).ok_or_else(|| {
            Error::corrupt(7, format!("unknown layer bits: {raw_layers:#06x}"))
        })?;
        let mut offsets = [0u32; SECTION_COUNT];
        for o in offsets.iter_mut() {
            *o = cursor.read_u32()?;
        }

        let footer = data.len().saturating_sub(EOF_MAGIC.len());
        if data.len() < HEADER_SIZE + EOF_MAGIC.len() || data[footer..] != EOF_MAGIC[..] {
            return Err(Error::corrupt(footer, "missing end-of-container signature"));
        }

        let mut prev = HEADER_SIZE - 1;
        for (section, &offset) in Section::ALL.iter().zip(&offsets) {
            let offset = offset as usize;
            match (section.is_present(layers), offset) {
                (false, 0) => continue,
                (true, 0) | (false, _) => {
                    return Err(Error::corrupt(
                        HEADER_SIZE - 4 * SECTION_COUNT,
                        format!("layer bits disagree with {section:?} section offset {offset}"),
                    ))
                }
                (true, _) if offset <= prev || offset >= footer => {
                    return Err(Error::corrupt(
                        HEADER_SIZE - 4 * SECTION_COUNT,
                        format!("section order mismatch: {section:?} at {offset}"),
                    ))
                }
                (true, _) => prev = offset,
            }
        }

        Ok(Self {
            generation,
            version,
            layers,
            offsets,
        })
    }

    pub fn write(&self, w: &mut ByteWriter) {
        w.write_bytes(MAGIC);
        w.write_u16(self.generation);
        w.write_u16(self.version);
        w.write_u16(self.layers.bits());
        for &o in self.offsets.iter() {
            w.write_u32(o);
        }
    }

    /// Offset of `section`, if present.
    #[inline]
    pub fn offset(&self, section: Section) -> Option<usize> {
        match self.offsets[section as usize] {
            0 => None,
            o => Some(o as usize),
        }
    }

    /// Where `section` must end: at the next present section, or at the trailing signature.
    pub fn section_end(&self, section: Section, data_len: usize) -> usize {
        self.offsets[section as usize + 1..]
            .iter()
            .find(|&&o| o != 0)
            .map(|&o| o as usize)
            .unwrap_or(data_len.saturating_sub(EOF_MAGIC.len()))
    }
}
