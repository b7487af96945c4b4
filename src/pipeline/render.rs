//! Page rendering: laid-out text and fitted images → standalone PDF fragments.
//!
//! Each call produces a self-contained [`lopdf::Document`] with its own page
//! tree, so the assembler treats rendered pages exactly like pages taken
//! from an input PDF. Pages are A4 portrait; content streams are left
//! uncompressed here and compressed (or not) once, at assembly.
//!
//! Text uses the standard Type1 fonts with `/WinAnsiEncoding`, so nothing
//! is embedded. Images are wrapped as `/DCTDecode` XObjects.

use crate::pipeline::encode::{encode_image, EncodedImage};
use crate::pipeline::layout::{
    encode_win_ansi, layout_blocks, PageGeometry, PageLayout, Rect, StandardFont, TextBlock,
    TextLayoutOptions,
};
use image::DynamicImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

const IMAGE_RESOURCE: &str = "Im1";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("PDF content encoding failed: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

/// A rendered fragment plus what layout had to drop.
#[derive(Debug)]
pub struct RenderedText {
    pub document: Document,
    pub page_count: usize,
    pub truncated_lines: usize,
    /// Dropped lines per input block.
    pub truncated_per_block: Vec<usize>,
}

/// Lay out `blocks` inside `rect` and render the resulting page(s).
///
/// Produces exactly one page unless `opts.paginate` is set. An empty block
/// list still yields one blank page.
pub fn render_text(
    blocks: &[TextBlock],
    page: PageGeometry,
    rect: Rect,
    opts: &TextLayoutOptions,
) -> Result<RenderedText, RenderError> {
    let layout = layout_blocks(blocks, rect, opts);
    let mut builder = FragmentBuilder::new(page);
    for p in &layout.pages {
        builder.add_text_page(p)?;
    }
    let page_count = builder.page_count();
    debug!(
        "Rendered {} text block(s) onto {} page(s), {} line(s) truncated",
        blocks.len(),
        page_count,
        layout.truncated_lines
    );
    Ok(RenderedText {
        document: builder.finish(),
        page_count,
        truncated_lines: layout.truncated_lines,
        truncated_per_block: layout.truncated_per_block,
    })
}

/// Render `img` scaled to fit, anchored top-left, on a page of its own.
pub fn render_image(
    img: &DynamicImage,
    page: PageGeometry,
    jpeg_quality: u8,
) -> Result<Document, RenderError> {
    let encoded = encode_image(img, page, jpeg_quality)?;
    let mut builder = FragmentBuilder::new(page);
    builder.add_image_page(encoded)?;
    Ok(builder.finish())
}

/// Accumulates pages into a fresh single-tree document.
struct FragmentBuilder {
    doc: Document,
    page: PageGeometry,
    pages_id: ObjectId,
    kids: Vec<Object>,
    fonts: BTreeMap<StandardFont, ObjectId>,
}

impl FragmentBuilder {
    fn new(page: PageGeometry) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            page,
            pages_id,
            kids: Vec::new(),
            fonts: BTreeMap::new(),
        }
    }

    fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Font dictionary for `font`, created on first use.
    fn font(&mut self, font: StandardFont) -> ObjectId {
        let doc = &mut self.doc;
        *self.fonts.entry(font).or_insert_with(|| {
            doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => font.base_font(),
                "Encoding" => "WinAnsiEncoding",
            })
        })
    }

    fn add_text_page(&mut self, layout: &PageLayout) -> Result<(), RenderError> {
        let mut operations = Vec::new();
        let mut font_resources = Dictionary::new();

        if !layout.lines.is_empty() {
            operations.push(Operation::new("BT", vec![]));
            let mut current: Option<(StandardFont, f32)> = None;
            for line in &layout.lines {
                if current != Some((line.font, line.size)) {
                    let font_id = self.font(line.font);
                    font_resources.set(line.font.resource_name(), font_id);
                    operations.push(Operation::new(
                        "Tf",
                        vec![line.font.resource_name().into(), line.size.into()],
                    ));
                    current = Some((line.font, line.size));
                }
                let y = self.page.height - line.baseline;
                operations.push(Operation::new(
                    "Tm",
                    vec![1.into(), 0.into(), 0.into(), 1.into(), line.x.into(), y.into()],
                ));
                operations.push(Operation::new(
                    "Tj",
                    vec![Object::string_literal(encode_win_ansi(&line.text))],
                ));
            }
            operations.push(Operation::new("ET", vec![]));
        }

        let resources = dictionary! { "Font" => font_resources };
        self.add_page(Content { operations }, resources)
    }

    fn add_image_page(&mut self, image: EncodedImage) -> Result<(), RenderError> {
        let (w, h) = (image.placement.width, image.placement.height);

        let mut stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(image.pixel_width),
                "Height" => i64::from(image.pixel_height),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            image.jpeg,
        );
        // already DCT-compressed; Flate on top only costs time
        stream.allows_compression = false;
        let image_id = self.doc.add_object(stream);

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        w.into(),
                        0.into(),
                        0.into(),
                        h.into(),
                        0.into(),
                        (self.page.height - h).into(),
                    ],
                ),
                Operation::new("Do", vec![IMAGE_RESOURCE.into()]),
                Operation::new("Q", vec![]),
            ],
        };
        let resources = dictionary! {
            "XObject" => dictionary! { IMAGE_RESOURCE => image_id },
        };
        self.add_page(content, resources)
    }

    fn add_page(&mut self, content: Content, resources: Dictionary) -> Result<(), RenderError> {
        let content_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), content.encode()?));
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![0.into(), 0.into(), self.page.width.into(), self.page.height.into()],
            "Contents" => content_id,
            "Resources" => resources,
        });
        self.kids.push(page_id.into());
        Ok(())
    }

    fn finish(mut self) -> Document {
        let count = self.kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => self.kids,
                "Count" => count,
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc
    }
}
