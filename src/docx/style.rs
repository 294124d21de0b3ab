//! Typed paragraph, run and cell formatting.
//!
//! Properties are written through [`set_property`], which places each child
//! of `w:pPr` / `w:rPr` / `w:tcPr` at its schema position. Word rejects some
//! out-of-order property lists, so mutation order never leaks into output.

use super::xml::{XmlElement, XmlNode};
use serde::{Deserialize, Serialize};

pub const PARAGRAPH_PROPERTIES: &str = "w:pPr";
pub const RUN_PROPERTIES: &str = "w:rPr";
pub const CELL_PROPERTIES: &str = "w:tcPr";

const PPR_ORDER: &[&str] = &[
    "w:pStyle",
    "w:keepNext",
    "w:keepLines",
    "w:pageBreakBefore",
    "w:framePr",
    "w:widowControl",
    "w:numPr",
    "w:suppressLineNumbers",
    "w:pBdr",
    "w:shd",
    "w:tabs",
    "w:suppressAutoHyphens",
    "w:kinsoku",
    "w:wordWrap",
    "w:overflowPunct",
    "w:topLinePunct",
    "w:autoSpaceDE",
    "w:autoSpaceDN",
    "w:bidi",
    "w:adjustRightInd",
    "w:snapToGrid",
    "w:spacing",
    "w:ind",
    "w:contextualSpacing",
    "w:mirrorIndents",
    "w:suppressOverlap",
    "w:jc",
    "w:textDirection",
    "w:textAlignment",
    "w:textboxTightWrap",
    "w:outlineLvl",
    "w:divId",
    "w:cnfStyle",
    "w:rPr",
    "w:sectPr",
    "w:pPrChange",
];

const RPR_ORDER: &[&str] = &[
    "w:rStyle",
    "w:rFonts",
    "w:b",
    "w:bCs",
    "w:i",
    "w:iCs",
    "w:caps",
    "w:smallCaps",
    "w:strike",
    "w:dstrike",
    "w:outline",
    "w:shadow",
    "w:emboss",
    "w:imprint",
    "w:noProof",
    "w:snapToGrid",
    "w:vanish",
    "w:webHidden",
    "w:color",
    "w:spacing",
    "w:w",
    "w:kern",
    "w:position",
    "w:sz",
    "w:szCs",
    "w:highlight",
    "w:u",
    "w:effect",
    "w:bdr",
    "w:shd",
    "w:fitText",
    "w:vertAlign",
    "w:rtl",
    "w:cs",
    "w:em",
    "w:lang",
    "w:eastAsianLayout",
    "w:specVanish",
    "w:oMath",
];

const TCPR_ORDER: &[&str] = &[
    "w:cnfStyle",
    "w:tcW",
    "w:gridSpan",
    "w:hMerge",
    "w:vMerge",
    "w:tcBorders",
    "w:shd",
    "w:noWrap",
    "w:tcMar",
    "w:textDirection",
    "w:tcFitText",
    "w:vAlign",
    "w:hideMark",
    "w:headers",
    "w:cellIns",
    "w:cellDel",
    "w:cellMerge",
    "w:tcPrChange",
];

fn order_for(properties: &str) -> &'static [&'static str] {
    match properties {
        PARAGRAPH_PROPERTIES => PPR_ORDER,
        RUN_PROPERTIES => RPR_ORDER,
        CELL_PROPERTIES => TCPR_ORDER,
        _ => &[],
    }
}

/// Return the property container (`w:pPr`, `w:rPr`, `w:tcPr`) of `owner`,
/// creating it as the first child when absent.
pub fn properties_mut<'a>(owner: &'a mut XmlElement, properties: &str) -> &'a mut XmlElement {
    let idx = match owner
        .children
        .iter()
        .position(|node| matches!(node, XmlNode::Element(el) if el.name == properties))
    {
        Some(idx) => idx,
        None => {
            owner
                .children
                .insert(0, XmlNode::Element(XmlElement::new(properties)));
            0
        }
    };
    match &mut owner.children[idx] {
        XmlNode::Element(el) => el,
        _ => unreachable!("property container index points at an element"),
    }
}

pub fn properties<'a>(owner: &'a XmlElement, properties: &str) -> Option<&'a XmlElement> {
    owner.child(properties)
}

/// Replace every `property.name` child of `container` with `property`,
/// inserted at its schema position.
pub fn set_property(container: &mut XmlElement, property: XmlElement) {
    container.remove_children_named(&property.name);
    let order = order_for(&container.name);
    let rank = order.iter().position(|name| *name == property.name);

    let insert_at = rank.and_then(|rank| {
        container.children.iter().position(|node| match node {
            XmlNode::Element(el) => order
                .iter()
                .position(|name| *name == el.name)
                .is_some_and(|other| other > rank),
            _ => false,
        })
    });

    match insert_at {
        Some(idx) => container.children.insert(idx, XmlNode::Element(property)),
        None => container.push(property),
    }
}

fn val(element: &XmlElement) -> Option<&str> {
    element.attr("w:val")
}

// -----------------------------------------------------------------------------
// Paragraph formatting
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
    Right,
    Both,
    Distribute,
    Start,
    End,
    Other(String),
}

impl Alignment {
    pub fn from_val(value: &str) -> Self {
        match value {
            "left" => Alignment::Left,
            "center" => Alignment::Center,
            "right" => Alignment::Right,
            "both" => Alignment::Both,
            "distribute" => Alignment::Distribute,
            "start" => Alignment::Start,
            "end" => Alignment::End,
            other => Alignment::Other(other.to_string()),
        }
    }

    pub fn as_val(&self) -> &str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Both => "both",
            Alignment::Distribute => "distribute",
            Alignment::Start => "start",
            Alignment::End => "end",
            Alignment::Other(value) => value,
        }
    }

    pub fn read(paragraph: &XmlElement) -> Option<Self> {
        properties(paragraph, PARAGRAPH_PROPERTIES)
            .and_then(|ppr| ppr.child("w:jc"))
            .and_then(val)
            .map(Alignment::from_val)
    }

    /// Write `alignment` to the paragraph; `None` removes any explicit alignment.
    pub fn write(paragraph: &mut XmlElement, alignment: Option<&Alignment>) {
        match alignment {
            Some(alignment) => {
                let ppr = properties_mut(paragraph, PARAGRAPH_PROPERTIES);
                set_property(ppr, XmlElement::new("w:jc").with_attr("w:val", alignment.as_val()));
            }
            None => {
                if let Some(ppr) = paragraph.child_mut(PARAGRAPH_PROPERTIES) {
                    ppr.remove_children_named("w:jc");
                }
            }
        }
    }
}

/// Paragraph spacing before/after, in twentieths of a point.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Spacing {
    pub before: Option<String>,
    pub after: Option<String>,
}

impl Spacing {
    pub fn fixed(twips: u32) -> Self {
        Self {
            before: Some(twips.to_string()),
            after: Some(twips.to_string()),
        }
    }

    pub fn is_set(&self) -> bool {
        self.before.is_some() || self.after.is_some()
    }

    pub fn read(paragraph: &XmlElement) -> Self {
        let spacing =
            properties(paragraph, PARAGRAPH_PROPERTIES).and_then(|ppr| ppr.child("w:spacing"));
        match spacing {
            Some(el) => Self {
                before: el.attr("w:before").map(str::to_string),
                after: el.attr("w:after").map(str::to_string),
            },
            None => Self::default(),
        }
    }

    /// Write both values explicitly, `"0"` standing in for an unset side.
    /// Other attributes already on `w:spacing` (line, lineRule) are kept.
    pub fn write(&self, paragraph: &mut XmlElement) {
        let ppr = properties_mut(paragraph, PARAGRAPH_PROPERTIES);
        let mut spacing = ppr
            .child("w:spacing")
            .cloned()
            .unwrap_or_else(|| XmlElement::new("w:spacing"));
        spacing.set_attr("w:before", self.before.as_deref().unwrap_or("0"));
        spacing.set_attr("w:after", self.after.as_deref().unwrap_or("0"));
        set_property(ppr, spacing);
    }
}

/// Alignment and spacing of one paragraph, captured before its runs are rebuilt.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParagraphFormat {
    pub alignment: Option<Alignment>,
    pub spacing: Spacing,
}

impl ParagraphFormat {
    pub fn capture(paragraph: &XmlElement) -> Self {
        Self {
            alignment: Alignment::read(paragraph),
            spacing: Spacing::read(paragraph),
        }
    }

    pub fn restore(&self, paragraph: &mut XmlElement) {
        Alignment::write(paragraph, self.alignment.as_ref());
        if self.spacing.is_set() {
            self.spacing.write(paragraph);
        }
    }
}

// -----------------------------------------------------------------------------
// Run formatting
// -----------------------------------------------------------------------------

/// Font family and size applied to generated runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFont {
    pub family: String,
    pub size_half_points: u32,
}

impl Default for RunFont {
    fn default() -> Self {
        Self {
            family: "Times New Roman".to_string(),
            size_half_points: 24,
        }
    }
}

impl RunFont {
    pub fn apply(&self, run: &mut XmlElement) {
        let rpr = properties_mut(run, RUN_PROPERTIES);
        let mut fonts = rpr
            .child("w:rFonts")
            .cloned()
            .unwrap_or_else(|| XmlElement::new("w:rFonts"));
        fonts.set_attr("w:ascii", self.family.as_str());
        fonts.set_attr("w:hAnsi", self.family.as_str());
        set_property(rpr, fonts);
        set_property(
            rpr,
            XmlElement::new("w:sz").with_attr("w:val", self.size_half_points.to_string()),
        );
    }

    pub fn read(run: &XmlElement) -> Option<Self> {
        let rpr = properties(run, RUN_PROPERTIES)?;
        let family = rpr.child("w:rFonts")?.attr("w:ascii")?.to_string();
        let size_half_points = rpr.child("w:sz").and_then(val)?.parse().ok()?;
        Some(Self {
            family,
            size_half_points,
        })
    }
}

// -----------------------------------------------------------------------------
// Cell formatting
// -----------------------------------------------------------------------------

/// `w:tcW`: preferred cell width and its unit type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellWidth {
    pub width: Option<String>,
    pub kind: Option<String>,
}

impl CellWidth {
    pub fn dxa(twips: u32) -> Self {
        Self {
            width: Some(twips.to_string()),
            kind: Some("dxa".to_string()),
        }
    }

    fn to_element(&self) -> XmlElement {
        let mut el = XmlElement::new("w:tcW");
        if let Some(width) = &self.width {
            el.set_attr("w:w", width.as_str());
        }
        if let Some(kind) = &self.kind {
            el.set_attr("w:type", kind.as_str());
        }
        el
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAlignment {
    Top,
    Center,
    Bottom,
}

impl VerticalAlignment {
    pub fn as_val(&self) -> &'static str {
        match self {
            VerticalAlignment::Top => "top",
            VerticalAlignment::Center => "center",
            VerticalAlignment::Bottom => "bottom",
        }
    }

    pub fn read(cell: &XmlElement) -> Option<Self> {
        match properties(cell, CELL_PROPERTIES)?.child("w:vAlign").and_then(val)? {
            "top" => Some(VerticalAlignment::Top),
            "center" => Some(VerticalAlignment::Center),
            "bottom" => Some(VerticalAlignment::Bottom),
            _ => None,
        }
    }

    pub fn apply(&self, cell: &mut XmlElement) {
        let tcpr = properties_mut(cell, CELL_PROPERTIES);
        set_property(tcpr, XmlElement::new("w:vAlign").with_attr("w:val", self.as_val()));
    }
}

/// Width and column span of one cell.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CellFormat {
    pub width: Option<CellWidth>,
    pub grid_span: Option<String>,
}

impl CellFormat {
    pub fn capture(cell: &XmlElement) -> Self {
        let Some(tcpr) = properties(cell, CELL_PROPERTIES) else {
            return Self::default();
        };
        Self {
            width: tcpr.child("w:tcW").map(|el| CellWidth {
                width: el.attr("w:w").map(str::to_string),
                kind: el.attr("w:type").map(str::to_string),
            }),
            grid_span: tcpr.child("w:gridSpan").and_then(val).map(str::to_string),
        }
    }

    /// Reapply captured attributes. Uncaptured ones are left as they are.
    pub fn restore(&self, cell: &mut XmlElement) {
        if self.width.is_none() && self.grid_span.is_none() {
            return;
        }
        let tcpr = properties_mut(cell, CELL_PROPERTIES);
        if let Some(width) = &self.width {
            set_property(tcpr, width.to_element());
        }
        if let Some(span) = &self.grid_span {
            set_property(tcpr, XmlElement::new("w:gridSpan").with_attr("w:val", span.as_str()));
        }
    }

    pub fn span(&self) -> u32 {
        self.grid_span
            .as_deref()
            .and_then(|span| span.parse().ok())
            .unwrap_or(1)
    }
}

/// Formatting captured before a destructive text replacement inside a cell.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FormattingSnapshot {
    pub cell: CellFormat,
    pub paragraph: ParagraphFormat,
}

impl FormattingSnapshot {
    pub fn capture(cell: &XmlElement, paragraph: &XmlElement) -> Self {
        Self {
            cell: CellFormat::capture(cell),
            paragraph: ParagraphFormat::capture(paragraph),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(el: &XmlElement) -> Vec<&str> {
        el.elements().map(|child| child.name.as_str()).collect()
    }

    #[test]
    fn set_property_respects_schema_order() {
        let mut ppr = XmlElement::new(PARAGRAPH_PROPERTIES)
            .with_child(XmlElement::new("w:pStyle").with_attr("w:val", "Body"))
            .with_child(XmlElement::new("w:rPr"));

        set_property(&mut ppr, XmlElement::new("w:jc").with_attr("w:val", "center"));
        set_property(&mut ppr, XmlElement::new("w:spacing").with_attr("w:before", "101"));

        assert_eq!(names(&ppr), vec!["w:pStyle", "w:spacing", "w:jc", "w:rPr"]);
    }

    #[test]
    fn set_property_replaces_duplicates() {
        let mut tcpr = XmlElement::new(CELL_PROPERTIES)
            .with_child(XmlElement::new("w:vAlign").with_attr("w:val", "top"))
            .with_child(XmlElement::new("w:vAlign").with_attr("w:val", "bottom"));
        set_property(&mut tcpr, XmlElement::new("w:vAlign").with_attr("w:val", "center"));
        assert_eq!(tcpr.children_named("w:vAlign").count(), 1);
        assert_eq!(tcpr.child("w:vAlign").and_then(|el| el.attr("w:val")), Some("center"));
    }

    #[test]
    fn paragraph_format_round_trips_and_fills_missing_spacing() {
        let mut paragraph = XmlElement::new("w:p").with_child(
            XmlElement::new(PARAGRAPH_PROPERTIES)
                .with_child(
                    XmlElement::new("w:spacing")
                        .with_attr("w:before", "120")
                        .with_attr("w:line", "276"),
                )
                .with_child(XmlElement::new("w:jc").with_attr("w:val", "right")),
        );
        let format = ParagraphFormat::capture(&paragraph);
        assert_eq!(format.alignment, Some(Alignment::Right));
        assert_eq!(format.spacing.before.as_deref(), Some("120"));
        assert_eq!(format.spacing.after, None);

        paragraph.children.clear();
        format.restore(&mut paragraph);

        let ppr = paragraph.child(PARAGRAPH_PROPERTIES).expect("pPr");
        let spacing = ppr.child("w:spacing").expect("spacing");
        assert_eq!(spacing.attr("w:before"), Some("120"));
        assert_eq!(spacing.attr("w:after"), Some("0"));
        assert_eq!(Alignment::read(&paragraph), Some(Alignment::Right));
    }

    #[test]
    fn restoring_no_alignment_removes_jc() {
        let mut paragraph = XmlElement::new("w:p").with_child(
            XmlElement::new(PARAGRAPH_PROPERTIES)
                .with_child(XmlElement::new("w:jc").with_attr("w:val", "center")),
        );
        ParagraphFormat::default().restore(&mut paragraph);
        assert_eq!(Alignment::read(&paragraph), None);
        assert!(Spacing::read(&paragraph) == Spacing::default());
    }

    #[test]
    fn cell_format_restores_width_and_span() {
        let original = XmlElement::new("w:tc").with_child(
            XmlElement::new(CELL_PROPERTIES)
                .with_child(CellWidth::dxa(2400).to_element())
                .with_child(XmlElement::new("w:gridSpan").with_attr("w:val", "2")),
        );
        let format = CellFormat::capture(&original);
        assert_eq!(format.span(), 2);

        let mut cell = XmlElement::new("w:tc");
        format.restore(&mut cell);
        assert_eq!(CellFormat::capture(&cell), format);
        assert_eq!(names(cell.child(CELL_PROPERTIES).unwrap()), vec!["w:tcW", "w:gridSpan"]);
    }

    #[test]
    fn run_font_sets_family_and_size() {
        let mut run = XmlElement::new("w:r").with_child(
            XmlElement::new(RUN_PROPERTIES).with_child(XmlElement::new("w:b")),
        );
        RunFont::default().apply(&mut run);
        assert_eq!(RunFont::read(&run), Some(RunFont::default()));
        assert_eq!(
            names(run.child(RUN_PROPERTIES).unwrap()),
            vec!["w:rFonts", "w:b", "w:sz"]
        );
    }
}
