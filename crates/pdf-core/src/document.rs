//! PDF Document wrapper

use crate::image::{generate_image_operators, ImageXObject};
use crate::{PdfError, Result};
use image::RgbaImage;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// A4 page size in points, used when a page carries no usable box
const A4: (f32, f32) = (595.28, 841.89);

/// Visible page rectangle in PDF user space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    /// Lower-left x
    pub x0: f32,
    /// Lower-left y
    pub y0: f32,
    pub width: f32,
    pub height: f32,
}

/// PDF Document wrapper providing high-level operations
///
/// Pages are addressed by 0-based index throughout.
#[derive(Debug, Clone)]
pub struct PdfDocument {
    /// The underlying lopdf document
    inner: Document,
    /// Buffered content operators per page (page index -> operators)
    page_content_buffer: HashMap<usize, Vec<u8>>,
    /// Next overlay resource number
    next_image_resource: u32,
}

impl PdfDocument {
    /// Open a PDF document from a file path
    ///
    /// # Arguments
    /// * `path` - Path to the PDF file
    ///
    /// # Example
    /// ```ignore
    /// let doc = PdfDocument::open("template.pdf")?;
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let inner = Document::load(path).map_err(|e| PdfError::OpenError(e.to_string()))?;
        Self::from_document(inner)
    }

    /// Open a PDF document from bytes
    ///
    /// # Arguments
    /// * `data` - PDF file bytes
    pub fn open_from_bytes(data: &[u8]) -> Result<Self> {
        let inner = Document::load_mem(data).map_err(|e| PdfError::OpenError(e.to_string()))?;
        Self::from_document(inner)
    }

    fn from_document(inner: Document) -> Result<Self> {
        if inner.get_pages().is_empty() {
            return Err(PdfError::OpenError("document has no pages".to_string()));
        }

        Ok(Self {
            inner,
            page_content_buffer: HashMap::new(),
            next_image_resource: 1,
        })
    }

    /// Get the number of pages in the document
    pub fn page_count(&self) -> usize {
        self.inner.get_pages().len()
    }

    /// Get the visible rectangle of a page
    ///
    /// The CropBox clipped to the MediaBox, both inherited through the page
    /// tree. Falls back to the MediaBox when there is no CropBox or the two
    /// do not overlap, and to A4 when the page has no MediaBox either.
    pub fn page_box(&self, page_index: usize) -> Result<PageBox> {
        let page_id = self.page_id(page_index)?;
        let media_box = match self.get_inherited_box(page_id, b"MediaBox")? {
            Some(media_box) => extract_page_box(&media_box)?,
            None => PageBox {
                x0: 0.0,
                y0: 0.0,
                width: A4.0,
                height: A4.1,
            },
        };

        // A malformed CropBox is ignored rather than failing the page
        let crop_box = self
            .get_inherited_box(page_id, b"CropBox")
            .ok()
            .flatten()
            .and_then(|crop_box| extract_page_box(&crop_box).ok());

        Ok(crop_box
            .and_then(|crop| intersect_boxes(&crop, &media_box))
            .unwrap_or(media_box))
    }

    /// Get page size in points as (width, height)
    pub fn page_size(&self, page_index: usize) -> Result<(f32, f32)> {
        let page_box = self.page_box(page_index)?;
        Ok((page_box.width, page_box.height))
    }

    /// Composite a page-sized RGBA raster over a page
    ///
    /// The raster's top-left pixel maps to the page's top-left corner and
    /// the raster is stretched to cover the whole visible page. Transparent
    /// pixels leave the page content untouched.
    ///
    /// # Arguments
    /// * `page_index` - Page index (0-based)
    /// * `layer` - Overlay raster
    pub fn insert_overlay(&mut self, page_index: usize, layer: &RgbaImage) -> Result<()> {
        let page_box = self.page_box(page_index)?;

        let xobject = ImageXObject::from_rgba(layer)?;
        let smask_id = xobject
            .soft_mask
            .as_ref()
            .map(|mask| self.inner.add_object(mask.to_pdf_stream(None)));
        let image_id = self.inner.add_object(xobject.to_pdf_stream(smask_id));

        let resource_name = self.unused_xobject_name(page_index)?;
        self.add_image_to_page_resources(page_index, &resource_name, image_id)?;

        let operators = generate_image_operators(
            &resource_name,
            page_box.x0 as f64,
            page_box.y0 as f64,
            page_box.width as f64,
            page_box.height as f64,
        );
        self.buffer_content(page_index, &operators);

        debug!(
            page = page_index,
            resource = %resource_name,
            width = xobject.width,
            height = xobject.height,
            "overlay buffered"
        );
        Ok(())
    }

    /// Save the document to a file
    ///
    /// # Arguments
    /// * `path` - Output file path
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.flush_content_buffers()?;

        self.inner
            .save(path)
            .map_err(|e| PdfError::SaveError(e.to_string()))?;
        Ok(())
    }

    /// Save the document to bytes
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        self.flush_content_buffers()?;

        let mut buffer = Vec::new();
        self.inner
            .save_to(&mut buffer)
            .map_err(|e| PdfError::SaveError(e.to_string()))?;

        Ok(buffer)
    }

    /// Get the object id of a page
    pub fn page_id(&self, page_index: usize) -> Result<ObjectId> {
        let pages = self.inner.get_pages();
        // lopdf numbers pages from 1
        u32::try_from(page_index + 1)
            .ok()
            .and_then(|number| pages.get(&number).copied())
            .ok_or(PdfError::InvalidPage(page_index, pages.len()))
    }

    /// Get a page box entry (MediaBox, CropBox), following the parent
    /// inheritance chain if needed
    fn get_inherited_box(&self, page_id: ObjectId, key: &[u8]) -> Result<Option<Vec<Object>>> {
        let name = String::from_utf8_lossy(key);
        let mut current_id = page_id;

        // Follow parent chain up to 10 levels
        for _ in 0..10 {
            let obj = self.inner.get_object(current_id)?;
            let dict = obj
                .as_dict()
                .map_err(|_| PdfError::ParseError("Object is not a dictionary".to_string()))?;

            if let Ok(entry) = dict.get(key) {
                let box_array = match entry {
                    Object::Array(arr) => arr.clone(),
                    Object::Reference(ref_id) => self
                        .inner
                        .get_object(*ref_id)?
                        .as_array()
                        .map_err(|_| {
                            PdfError::ParseError(format!("{name} reference is not an array"))
                        })?
                        .clone(),
                    _ => return Err(PdfError::ParseError(format!("{name} is not an array"))),
                };
                return Ok(Some(box_array));
            }

            if let Ok(Object::Reference(parent_id)) = dict.get(b"Parent") {
                current_id = *parent_id;
                continue;
            }

            break;
        }

        Ok(None)
    }

    /// Buffer content operators for a page (written at save time)
    fn buffer_content(&mut self, page_index: usize, content: &[u8]) {
        self.page_content_buffer
            .entry(page_index)
            .or_default()
            .extend_from_slice(content);
    }

    /// Flush all buffered content to page streams
    fn flush_content_buffers(&mut self) -> Result<()> {
        let buffers: Vec<(usize, Vec<u8>)> = self.page_content_buffer.drain().collect();

        for (page_index, content) in buffers {
            if !content.is_empty() {
                self.append_to_content_stream(page_index, &content)?;
            }
        }

        Ok(())
    }

    /// Append content to a page's content stream
    ///
    /// The existing content is wrapped in `q ... Q` so a graphics state left
    /// dirty by the template cannot leak into the appended operators.
    fn append_to_content_stream(&mut self, page_index: usize, content: &[u8]) -> Result<()> {
        let page_id = self.page_id(page_index)?;

        let (existing_content, page_dict_clone) = {
            let page_dict = self
                .inner
                .get_object(page_id)?
                .as_dict()
                .map_err(|_| PdfError::ParseError("Page object is not a dictionary".to_string()))?;

            let existing_content = match page_dict.get(b"Contents") {
                Ok(contents) => self.collect_content(contents),
                Err(_) => Vec::new(),
            };

            (existing_content, page_dict.clone())
        };

        let mut new_content = Vec::with_capacity(existing_content.len() + content.len() + 8);
        if !existing_content.is_empty() {
            new_content.extend_from_slice(b"q\n");
            new_content.extend_from_slice(&existing_content);
            new_content.extend_from_slice(b"\nQ\n");
        }
        new_content.extend_from_slice(content);

        let stream_id = self
            .inner
            .add_object(Stream::new(Dictionary::new(), new_content));

        let mut new_page_dict = page_dict_clone;
        new_page_dict.set(b"Contents", Object::Reference(stream_id));
        self.inner.objects.insert(page_id, new_page_dict.into());

        Ok(())
    }

    /// Decompressed bytes of a Contents entry (stream, reference or array)
    fn collect_content(&self, contents: &Object) -> Vec<u8> {
        match contents {
            Object::Stream(stream) => stream
                .decompressed_content()
                .unwrap_or_else(|_| stream.content.clone()),
            Object::Reference(ref_id) => match self.inner.get_object(*ref_id) {
                Ok(Object::Stream(stream)) => stream
                    .decompressed_content()
                    .unwrap_or_else(|_| stream.content.clone()),
                Ok(Object::Array(arr)) => self.collect_content(&Object::Array(arr.clone())),
                _ => Vec::new(),
            },
            Object::Array(arr) => {
                let mut combined = Vec::new();
                for obj in arr {
                    let data = self.collect_content(obj);
                    if !data.is_empty() {
                        combined.extend_from_slice(&data);
                        combined.push(b'\n');
                    }
                }
                combined
            }
            _ => Vec::new(),
        }
    }

    /// The page's Resources dictionary, resolving references and
    /// inheritance from the page tree
    fn page_resources(&self, page_id: ObjectId) -> Result<Dictionary> {
        let mut current_id = page_id;

        for _ in 0..10 {
            let dict = self
                .inner
                .get_object(current_id)?
                .as_dict()
                .map_err(|_| PdfError::ParseError("Object is not a dictionary".to_string()))?;

            match dict.get(b"Resources") {
                Ok(Object::Dictionary(resources)) => return Ok(resources.clone()),
                Ok(Object::Reference(ref_id)) => {
                    return Ok(self
                        .inner
                        .get_object(*ref_id)?
                        .as_dict()
                        .map(|d| d.clone())
                        .unwrap_or_default());
                }
                _ => {}
            }

            match dict.get(b"Parent") {
                Ok(Object::Reference(parent_id)) => current_id = *parent_id,
                _ => break,
            }
        }

        Ok(Dictionary::new())
    }

    /// XObject subdictionary of a Resources dictionary
    fn xobject_dict(&self, resources: &Dictionary) -> Dictionary {
        match resources.get(b"XObject") {
            Ok(Object::Dictionary(dict)) => dict.clone(),
            Ok(Object::Reference(ref_id)) => self
                .inner
                .get_object(*ref_id)
                .and_then(|obj| obj.as_dict())
                .map(|d| d.clone())
                .unwrap_or_default(),
            _ => Dictionary::new(),
        }
    }

    /// Pick an XObject resource name not used by the page yet
    fn unused_xobject_name(&mut self, page_index: usize) -> Result<String> {
        let page_id = self.page_id(page_index)?;
        let existing = self.xobject_dict(&self.page_resources(page_id)?);

        loop {
            let name = format!("Ov{}", self.next_image_resource);
            self.next_image_resource += 1;
            if !existing.has(name.as_bytes()) {
                return Ok(name);
            }
        }
    }

    /// Add image to a specific page's Resources dictionary
    ///
    /// The resources are written directly onto the page, so pages sharing
    /// an inherited or referenced Resources dictionary stay independent.
    fn add_image_to_page_resources(
        &mut self,
        page_index: usize,
        resource_name: &str,
        object_id: ObjectId,
    ) -> Result<()> {
        let page_id = self.page_id(page_index)?;

        let mut resources = self.page_resources(page_id)?;
        let mut xobjects = self.xobject_dict(&resources);
        xobjects.set(resource_name.as_bytes(), Object::Reference(object_id));
        resources.set(b"XObject", Object::Dictionary(xobjects));

        let mut page_dict = self
            .inner
            .get_object(page_id)?
            .as_dict()
            .map_err(|_| PdfError::SaveError("Page object is not a dictionary".to_string()))?
            .clone();
        page_dict.set(b"Resources", Object::Dictionary(resources));
        self.inner.objects.insert(page_id, page_dict.into());

        Ok(())
    }
}

/// Read a number from a MediaBox entry
fn box_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Convert a MediaBox array into a normalized page box
fn extract_page_box(media_box: &[Object]) -> Result<PageBox> {
    if media_box.len() < 4 {
        return Err(PdfError::ParseError("Invalid MediaBox format".to_string()));
    }

    let mut coords = [0.0f32; 4];
    for (slot, obj) in coords.iter_mut().zip(media_box) {
        *slot = box_number(obj)
            .ok_or_else(|| PdfError::ParseError("Invalid MediaBox entry".to_string()))?;
    }
    let [ax, ay, bx, by] = coords;

    let width = (bx - ax).abs();
    let height = (by - ay).abs();
    if width <= 0.0 || height <= 0.0 {
        return Err(PdfError::ParseError(format!(
            "Degenerate MediaBox: {width} x {height}"
        )));
    }

    Ok(PageBox {
        x0: ax.min(bx),
        y0: ay.min(by),
        width,
        height,
    })
}

/// Overlap of two page boxes, `None` when they do not overlap
fn intersect_boxes(a: &PageBox, b: &PageBox) -> Option<PageBox> {
    let x0 = a.x0.max(b.x0);
    let y0 = a.y0.max(b.y0);
    let x1 = (a.x0 + a.width).min(b.x0 + b.width);
    let y1 = (a.y0 + a.height).min(b.y0 + b.height);

    (x1 > x0 && y1 > y0).then(|| PageBox {
        x0,
        y0,
        width: x1 - x0,
        height: y1 - y0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::blank_pdf;
    use image::Rgba;

    fn fixture(pages: usize, width: f32, height: f32) -> Vec<u8> {
        blank_pdf(pages, width, height).expect("Failed to build PDF")
    }

    #[test]
    fn test_open_counts_pages() {
        let doc = PdfDocument::open_from_bytes(&fixture(3, 300.0, 400.0))
            .expect("Failed to open PDF");
        assert_eq!(doc.page_count(), 3);
    }

    #[test]
    fn test_open_rejects_garbage() {
        let result = PdfDocument::open_from_bytes(b"not a pdf");
        assert!(matches!(result, Err(PdfError::OpenError(_))));
    }

    #[test]
    fn test_page_size() {
        let doc = PdfDocument::open_from_bytes(&fixture(2, 300.0, 400.0))
            .expect("Failed to open PDF");
        assert_eq!(doc.page_size(1).expect("Failed to read size"), (300.0, 400.0));
    }

    #[test]
    fn test_page_size_out_of_range() {
        let doc = PdfDocument::open_from_bytes(&fixture(2, 300.0, 400.0))
            .expect("Failed to open PDF");
        match doc.page_size(2) {
            Err(PdfError::InvalidPage(index, count)) => {
                assert_eq!(index, 2);
                assert_eq!(count, 2);
            }
            other => panic!("Expected InvalidPage error, got {other:?}"),
        }
    }

    /// A 600 x 800 page whose visible area is cropped to `crop_box`
    fn cropped_fixture(crop_box: [i64; 4]) -> Vec<u8> {
        let mut doc = lopdf::Document::load_mem(&fixture(1, 600.0, 800.0))
            .expect("Failed to load fixture");
        let page_id = *doc.get_pages().get(&1).expect("Missing page");
        let page = doc
            .get_object_mut(page_id)
            .and_then(|obj| obj.as_dict_mut())
            .expect("Page is not a dictionary");
        page.set(
            "CropBox",
            crop_box.iter().map(|v| Object::Integer(*v)).collect::<Vec<_>>(),
        );

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("Failed to save fixture");
        bytes
    }

    #[test]
    fn test_page_box_uses_crop_box() {
        let doc = PdfDocument::open_from_bytes(&cropped_fixture([100, 100, 400, 500]))
            .expect("Failed to open PDF");
        assert_eq!(
            doc.page_box(0).expect("Failed to read box"),
            PageBox {
                x0: 100.0,
                y0: 100.0,
                width: 300.0,
                height: 400.0
            }
        );
        assert_eq!(doc.page_size(0).expect("Failed to read size"), (300.0, 400.0));
    }

    #[test]
    fn test_crop_box_clipped_to_media_box() {
        let doc = PdfDocument::open_from_bytes(&cropped_fixture([-50, 700, 200, 900]))
            .expect("Failed to open PDF");
        assert_eq!(
            doc.page_box(0).expect("Failed to read box"),
            PageBox {
                x0: 0.0,
                y0: 700.0,
                width: 200.0,
                height: 100.0
            }
        );
    }

    #[test]
    fn test_disjoint_crop_box_falls_back_to_media_box() {
        let doc = PdfDocument::open_from_bytes(&cropped_fixture([700, 900, 800, 1000]))
            .expect("Failed to open PDF");
        assert_eq!(doc.page_size(0).expect("Failed to read size"), (600.0, 800.0));
    }

    #[test]
    fn test_overlay_covers_crop_box() {
        let mut doc = PdfDocument::open_from_bytes(&cropped_fixture([100, 100, 400, 500]))
            .expect("Failed to open PDF");
        doc.insert_overlay(0, &RgbaImage::new(600, 800))
            .expect("Failed to insert overlay");
        let bytes = doc.to_bytes().expect("Failed to save PDF");

        let reopened = lopdf::Document::load_mem(&bytes).expect("Failed to reload");
        let page_id = *reopened.get_pages().get(&1).expect("Missing page");
        let content = reopened.get_page_content(page_id).expect("Missing content");
        assert!(String::from_utf8_lossy(&content).contains("300 0 0 400 100 100 cm"));
    }

    #[test]
    fn test_extract_page_box_normalizes() {
        let media_box = vec![
            Object::Integer(612),
            Object::Integer(792),
            Object::Integer(0),
            Object::Real(0.0),
        ];
        let page_box = extract_page_box(&media_box).expect("Failed to parse box");
        assert_eq!(
            page_box,
            PageBox {
                x0: 0.0,
                y0: 0.0,
                width: 612.0,
                height: 792.0
            }
        );
    }

    #[test]
    fn test_extract_page_box_offset_origin() {
        let media_box = vec![
            Object::Integer(10),
            Object::Integer(20),
            Object::Integer(110),
            Object::Integer(220),
        ];
        let page_box = extract_page_box(&media_box).expect("Failed to parse box");
        assert_eq!((page_box.x0, page_box.y0), (10.0, 20.0));
        assert_eq!((page_box.width, page_box.height), (100.0, 200.0));
    }

    #[test]
    fn test_extract_page_box_rejects_short() {
        assert!(extract_page_box(&[Object::Integer(0)]).is_err());
    }

    #[test]
    fn test_insert_overlay_adds_xobject_and_operators() {
        let mut doc = PdfDocument::open_from_bytes(&fixture(1, 100.0, 50.0))
            .expect("Failed to open PDF");
        let mut layer = RgbaImage::new(200, 100);
        layer.put_pixel(5, 5, Rgba([255, 0, 0, 255]));

        doc.insert_overlay(0, &layer).expect("Failed to insert overlay");
        let bytes = doc.to_bytes().expect("Failed to save PDF");

        let reopened = lopdf::Document::load_mem(&bytes).expect("Failed to reload");
        let page_id = *reopened.get_pages().get(&1).expect("Missing page");
        let content = reopened.get_page_content(page_id).expect("Missing content");
        let content = String::from_utf8_lossy(&content);
        assert!(content.contains("100 0 0 50 0 0 cm"));
        assert!(content.contains("/Ov1 Do"));
    }

    #[test]
    fn test_insert_overlay_invalid_page() {
        let mut doc = PdfDocument::open_from_bytes(&fixture(1, 100.0, 50.0))
            .expect("Failed to open PDF");
        let layer = RgbaImage::new(10, 10);
        assert!(matches!(
            doc.insert_overlay(3, &layer),
            Err(PdfError::InvalidPage(3, 1))
        ));
    }

    #[test]
    fn test_sequential_overlays_get_distinct_names() {
        let mut doc = PdfDocument::open_from_bytes(&fixture(1, 100.0, 50.0))
            .expect("Failed to open PDF");
        let layer = RgbaImage::new(10, 10);

        doc.insert_overlay(0, &layer).expect("Failed to insert overlay");
        doc.insert_overlay(0, &layer).expect("Failed to insert overlay");
        let bytes = doc.to_bytes().expect("Failed to save PDF");

        let reopened = lopdf::Document::load_mem(&bytes).expect("Failed to reload");
        let page_id = *reopened.get_pages().get(&1).expect("Missing page");
        let content = reopened.get_page_content(page_id).expect("Missing content");
        let content = String::from_utf8_lossy(&content);
        let first = content.find("/Ov1 Do").expect("Missing first overlay");
        let second = content.find("/Ov2 Do").expect("Missing second overlay");
        assert!(first < second);
    }
}
