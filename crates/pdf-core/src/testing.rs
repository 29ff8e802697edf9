//! In-memory fixtures
//!
//! Blank documents and a tiny font for exercising the pipeline without
//! binary fixture files. Nothing here touches the filesystem.

use crate::{PdfError, Result};
use lopdf::{dictionary, Document, Object, Stream};

/// Build a PDF with `page_count` empty pages of the given size in points
pub fn blank_pdf(page_count: usize, width: f32, height: f32) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::with_capacity(page_count);
    for _ in 0..page_count {
        let contents_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), Object::Real(width), Object::Real(height)],
            "Resources" => dictionary! {},
            "Contents" => contents_id,
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PdfError::SaveError(e.to_string()))?;
    Ok(buffer)
}

/// Glyph used for every mapped printable character
pub const INK_GLYPH: u16 = 1;
/// Glyph used for U+0020
pub const SPACE_GLYPH: u16 = 2;

/// Build a minimal TrueType font
///
/// Three glyphs: an empty `.notdef`, a filled square (x 100..500,
/// y 0..700, advance 600) and an empty space (advance 300). Printable
/// ASCII, Latin-1 and the Gujarati block all map to the square. Metrics:
/// 1000 units per em, ascender 800, descender -200.
pub fn minimal_ttf() -> Vec<u8> {
    let tables: Vec<([u8; 4], Vec<u8>)> = vec![
        (*b"cmap", cmap_table()),
        (*b"glyf", glyf_table()),
        (*b"head", head_table()),
        (*b"hhea", hhea_table()),
        (*b"hmtx", hmtx_table()),
        (*b"loca", loca_table()),
        (*b"maxp", maxp_table()),
    ];

    let num_tables = tables.len() as u16;
    let mut font = Vec::new();
    push_u32(&mut font, 0x0001_0000);
    push_u16(&mut font, num_tables);
    push_u16(&mut font, 64); // searchRange
    push_u16(&mut font, 2); // entrySelector
    push_u16(&mut font, num_tables * 16 - 64); // rangeShift

    let mut offset = 12 + 16 * tables.len();
    let mut body = Vec::new();
    for (tag, data) in &tables {
        font.extend_from_slice(tag);
        push_u32(&mut font, 0); // checksum
        push_u32(&mut font, offset as u32);
        push_u32(&mut font, data.len() as u32);

        body.extend_from_slice(data);
        while body.len() % 4 != 0 {
            body.push(0);
        }
        offset = 12 + 16 * tables.len() + body.len();
    }

    font.extend_from_slice(&body);
    font
}

fn push_u16(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn push_i16(buf: &mut Vec<u8>, v: i16) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn push_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn head_table() -> Vec<u8> {
    let mut t = Vec::with_capacity(54);
    push_u16(&mut t, 1); // majorVersion
    push_u16(&mut t, 0); // minorVersion
    push_u32(&mut t, 0x0001_0000); // fontRevision
    push_u32(&mut t, 0); // checksumAdjustment
    push_u32(&mut t, 0x5F0F_3CF5); // magicNumber
    push_u16(&mut t, 0); // flags
    push_u16(&mut t, 1000); // unitsPerEm
    t.extend_from_slice(&[0u8; 16]); // created, modified
    push_i16(&mut t, 0); // xMin
    push_i16(&mut t, 0); // yMin
    push_i16(&mut t, 500); // xMax
    push_i16(&mut t, 700); // yMax
    push_u16(&mut t, 0); // macStyle
    push_u16(&mut t, 8); // lowestRecPPEM
    push_i16(&mut t, 2); // fontDirectionHint
    push_i16(&mut t, 1); // indexToLocFormat: long
    push_i16(&mut t, 0); // glyphDataFormat
    t
}

fn hhea_table() -> Vec<u8> {
    let mut t = Vec::with_capacity(36);
    push_u32(&mut t, 0x0001_0000);
    push_i16(&mut t, 800); // ascender
    push_i16(&mut t, -200); // descender
    push_i16(&mut t, 0); // lineGap
    push_u16(&mut t, 600); // advanceWidthMax
    push_i16(&mut t, 0); // minLeftSideBearing
    push_i16(&mut t, 0); // minRightSideBearing
    push_i16(&mut t, 500); // xMaxExtent
    push_i16(&mut t, 1); // caretSlopeRise
    push_i16(&mut t, 0); // caretSlopeRun
    push_i16(&mut t, 0); // caretOffset
    t.extend_from_slice(&[0u8; 8]); // reserved
    push_i16(&mut t, 0); // metricDataFormat
    push_u16(&mut t, 3); // numberOfHMetrics
    t
}

fn maxp_table() -> Vec<u8> {
    let mut t = Vec::with_capacity(32);
    push_u32(&mut t, 0x0001_0000);
    push_u16(&mut t, 3); // numGlyphs
    push_u16(&mut t, 4); // maxPoints
    push_u16(&mut t, 1); // maxContours
    push_u16(&mut t, 0); // maxCompositePoints
    push_u16(&mut t, 0); // maxCompositeContours
    push_u16(&mut t, 2); // maxZones
    t.extend_from_slice(&[0u8; 16]); // remaining limits
    t
}

fn hmtx_table() -> Vec<u8> {
    let mut t = Vec::with_capacity(12);
    for (advance, lsb) in [(500u16, 0i16), (600, 100), (300, 0)] {
        push_u16(&mut t, advance);
        push_i16(&mut t, lsb);
    }
    t
}

/// The square glyph, clockwise from the lower-left corner
fn square_glyph() -> Vec<u8> {
    let mut g = Vec::new();
    push_i16(&mut g, 1); // numberOfContours
    push_i16(&mut g, 100); // xMin
    push_i16(&mut g, 0); // yMin
    push_i16(&mut g, 500); // xMax
    push_i16(&mut g, 700); // yMax
    push_u16(&mut g, 3); // endPtsOfContours[0]
    push_u16(&mut g, 0); // instructionLength
    g.extend_from_slice(&[0x01; 4]); // on-curve, 16-bit deltas
    for dx in [100i16, 0, 400, 0] {
        push_i16(&mut g, dx);
    }
    for dy in [0i16, 700, 0, -700] {
        push_i16(&mut g, dy);
    }
    while g.len() % 4 != 0 {
        g.push(0);
    }
    g
}

fn glyf_table() -> Vec<u8> {
    square_glyph()
}

fn loca_table() -> Vec<u8> {
    let square_len = square_glyph().len() as u32;
    let mut t = Vec::with_capacity(16);
    for offset in [0, 0, square_len, square_len] {
        push_u32(&mut t, offset);
    }
    t
}

/// Format 12 cmap on platform 3 / encoding 10, one group per code point
fn cmap_table() -> Vec<u8> {
    let mut groups: Vec<(u32, u32)> = vec![(0x20, SPACE_GLYPH as u32)];
    groups.extend((0x21..=0x7E).map(|c| (c, INK_GLYPH as u32)));
    groups.extend((0xA1..=0xFF).map(|c| (c, INK_GLYPH as u32)));
    groups.extend((0x0A81..=0x0AFF).map(|c| (c, INK_GLYPH as u32)));

    let subtable_len = 16 + 12 * groups.len() as u32;

    let mut t = Vec::new();
    push_u16(&mut t, 0); // version
    push_u16(&mut t, 1); // numTables
    push_u16(&mut t, 3); // platformID
    push_u16(&mut t, 10); // encodingID
    push_u32(&mut t, 12); // subtable offset

    push_u16(&mut t, 12); // format
    push_u16(&mut t, 0); // reserved
    push_u32(&mut t, subtable_len);
    push_u32(&mut t, 0); // language
    push_u32(&mut t, groups.len() as u32);
    for (code, glyph) in groups {
        push_u32(&mut t, code);
        push_u32(&mut t, code);
        push_u32(&mut t, glyph);
    }
    t
}
