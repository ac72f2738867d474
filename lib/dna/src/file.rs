//! Reading containers from, and writing them to, the filesystem.

use std::{fs, ops::Deref, path::Path};

use crate::{de::binary::BinaryReader, ser, DataLayer, Dna, LayerBitmask, Result};

#[cfg(feature = "mmap")]
mod mapped {
    use std::{fs::File, io, path::Path};

    use memmap2::Mmap;

    #[derive(Debug)]
    pub struct MappedFile {
        _file: File,
        data: Option<Mmap>,
    }

    impl MappedFile {
        #[allow(unsafe_code)]
        pub fn new(file: File, path: &Path) -> Result<Self, io::Error> {
            tracing::trace!(path = path.as_os_str().to_str(), "memory-mapping container");
            Ok(Self {
                data: Some(unsafe { Mmap::map(&file)? }),
                _file: file,
            })
        }

        pub fn bytes(&self) -> &[u8] {
            self.data.as_deref().unwrap_or_default()
        }
    }

    impl Drop for MappedFile {
        fn drop(&mut self) {
            self.data.take(); // the mmap must be dropped before we close its associated file
        }
    }
}

/// The raw bytes of a container, either memory-mapped or owned.
#[derive(Debug)]
pub enum DnaFile {
    #[cfg(feature = "mmap")]
    Mapped(mapped::MappedFile),
    Owned(Vec<u8>),
}

impl DnaFile {
    /// Open the container at `path`, memory-mapping it where possible.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        #[cfg(feature = "mmap")]
        {
            let file = fs::File::options().read(true).write(false).open(path)?;
            // empty files can't be mapped on every platform
            if file.metadata()?.len() > 0 {
                return Ok(Self::Mapped(mapped::MappedFile::new(file, path)?));
            }
        }
        tracing::trace!(path = path.as_os_str().to_str(), "reading container");
        Ok(Self::Owned(fs::read(path)?))
    }

    #[inline]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self::Owned(bytes)
    }

    /// Parse the header, ready for selective reads.
    pub fn reader(&self) -> Result<BinaryReader<'_>> {
        BinaryReader::new(self)
    }
}

impl Deref for DnaFile {
    type Target = [u8];
    fn deref(&self) -> &Self::Target {
        match self {
            #[cfg(feature = "mmap")]
            Self::Mapped(file) => file.bytes(),
            Self::Owned(data) => data,
        }
    }
}

/// Load the layers of `mask` (and the layers they imply) from the container at `path`.
#[tracing::instrument(level = "debug", skip(path, mask), fields(path = ?path.as_ref()))]
pub fn load(path: impl AsRef<Path>, mask: impl Into<LayerBitmask>) -> Result<Dna> {
    let file = DnaFile::open(path)?;
    Dna::new().read(&file.reader()?, mask)
}

/// Persists a model, or a layer subset of one.
#[derive(Debug, Clone, Default)]
pub struct Writer {
    dna: Dna,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every loaded layer of `dna`.
    pub fn set_from(&mut self, dna: &Dna) -> &mut Self {
        self.set_from_masked(dna, DataLayer::All)
    }

    /// Take the layers of `dna` within `mask` (and the layers it implies).
    pub fn set_from_masked(&mut self, dna: &Dna, mask: impl Into<LayerBitmask>) -> &mut Self {
        self.dna = dna.restrict(mask);
        self
    }

    /// The layers that will be written.
    #[inline]
    pub fn layers(&self) -> LayerBitmask {
        self.dna.loaded()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        ser::binary::encode(&self.dna, DataLayer::All)
    }

    /// Encode and write to `path`, replacing any existing file.
    #[tracing::instrument(level = "debug", skip(self, path), fields(path = ?path.as_ref()))]
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.to_bytes()?;
        tracing::debug!(bytes = bytes.len(), layers = ?self.layers(), "writing container");
        fs::write(path, bytes)?;
        Ok(())
    }

    /// Write the JSON debug mirror to `path`.
    #[cfg(feature = "json")]
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = fs::File::create(path)?;
        ser::json::to_writer(std::io::BufWriter::new(file), &self.dna, DataLayer::All)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fixture;

    #[test]
    fn owned_bytes() {
        let mut writer = Writer::new();
        writer.set_from_masked(&fixture::rig(), DataLayer::Behavior);
        assert_eq!(writer.layers(), DataLayer::Behavior.mask());

        let file = DnaFile::from_bytes(writer.to_bytes().unwrap());
        let reader = file.reader().unwrap();
        assert_eq!(reader.layers(), DataLayer::Behavior.mask());
        let dna = Dna::new().read(&reader, DataLayer::All).unwrap();
        assert_eq!(dna, fixture::rig().restrict(DataLayer::Behavior));
    }
}
