//! WordprocessingML (`.docx`) package access.

pub mod document;
pub mod package;
pub mod style;
pub mod xml;

pub use document::Document;
pub use package::{DOCUMENT_PART, DocxPackage, Template};
pub use style::{
    Alignment, CellFormat, CellWidth, FormattingSnapshot, ParagraphFormat, RunFont, Spacing,
    VerticalAlignment,
};
pub use xml::{XmlElement, XmlNode, XmlTree};
