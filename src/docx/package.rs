use super::document::Document;
use crate::error::DocxError;
use std::fs::File;
use std::io::{BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const DOCUMENT_PART: &str = "word/document.xml";

#[derive(Debug, Clone)]
struct PackagePart {
    name: String,
    data: Vec<u8>,
    compression: CompressionMethod,
}

/// Every part of a `.docx` container, held in memory in archive order.
#[derive(Debug, Clone)]
pub struct DocxPackage {
    parts: Vec<PackagePart>,
}

impl DocxPackage {
    pub fn open(path: &Path) -> Result<Self, DocxError> {
        Self::from_reader(File::open(path)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DocxError> {
        Self::from_reader(Cursor::new(bytes))
    }

    fn from_reader<R: Read + Seek>(reader: R) -> Result<Self, DocxError> {
        let mut archive = ZipArchive::new(reader)?;
        let mut parts = Vec::with_capacity(archive.len());
        for idx in 0..archive.len() {
            let mut file = archive.by_index(idx)?;
            if file.is_dir() {
                continue;
            }
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)?;
            parts.push(PackagePart {
                name: file.name().to_string(),
                data,
                compression: file.compression(),
            });
        }
        Ok(Self { parts })
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|part| part.name.as_str())
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|part| part.name == name)
            .map(|part| part.data.as_slice())
    }

    /// Parse the main document part.
    pub fn document(&self) -> Result<Document, DocxError> {
        let bytes = self
            .part(DOCUMENT_PART)
            .ok_or_else(|| DocxError::MissingPart(DOCUMENT_PART.to_string()))?;
        let xml =
            std::str::from_utf8(bytes).map_err(|_| DocxError::Encoding(DOCUMENT_PART.to_string()))?;
        Document::parse(xml)
    }

    /// Write the package with `document` standing in for the main document part.
    pub fn write_to<W: Write + Seek>(
        &self,
        writer: W,
        document: &Document,
    ) -> Result<(), DocxError> {
        let document_xml = document.to_bytes()?;
        let mut zip = ZipWriter::new(writer);
        for part in &self.parts {
            let options = FileOptions::default().compression_method(part.compression);
            zip.start_file(part.name.as_str(), options)?;
            if part.name == DOCUMENT_PART {
                zip.write_all(&document_xml)?;
            } else {
                zip.write_all(&part.data)?;
            }
        }
        let mut inner = zip.finish()?;
        inner.flush()?;
        Ok(())
    }

    pub fn save(&self, path: &Path, document: &Document) -> Result<(), DocxError> {
        let file = File::create(path)?;
        self.write_to(BufWriter::new(file), document)
    }
}

/// A parsed template. Documents handed out by [`Template::instantiate`] are
/// independent deep copies; the template itself is never mutated.
#[derive(Debug, Clone)]
pub struct Template {
    package: DocxPackage,
    document: Document,
}

impl Template {
    pub fn open(path: &Path) -> Result<Self, DocxError> {
        Self::from_package(DocxPackage::open(path)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DocxError> {
        Self::from_package(DocxPackage::from_bytes(bytes)?)
    }

    pub fn from_package(package: DocxPackage) -> Result<Self, DocxError> {
        let document = package.document()?;
        Ok(Self { package, document })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn instantiate(&self) -> Document {
        self.document.clone()
    }

    pub fn save(&self, path: &Path, document: &Document) -> Result<(), DocxError> {
        self.package.save(path, document)
    }

    pub fn write_to<W: Write + Seek>(
        &self,
        writer: W,
        document: &Document,
    ) -> Result<(), DocxError> {
        self.package.write_to(writer, document)
    }
}
