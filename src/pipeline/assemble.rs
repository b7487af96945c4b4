//! Document assembly: concatenate page fragments into one PDF.
//!
//! Every fragment is a complete [`lopdf::Document`], either a rendered page
//! set or an input PDF. Assembly renumbers each fragment into a disjoint id
//! range, lifts its pages out of their original page tree and hangs them,
//! in order, under a single new `/Pages` node.
//!
//! Pages may inherit `/Resources`, `/MediaBox`, `/CropBox` and `/Rotate`
//! from ancestors in their old tree. Those ancestors are dropped, so the
//! inherited values are copied onto each page first.

use crate::error::MergeError;
use crate::pipeline::layout::PageGeometry;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guards against `/Parent` cycles in malformed page trees.
const MAX_TREE_DEPTH: usize = 64;

/// How a fragment's pages were produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentKind {
    /// All text items flowed onto the front page.
    CombinedText,
    /// One text item rendered at its own position.
    Text,
    Image,
    /// Pages copied from an input PDF.
    Passthrough,
}

/// One contiguous run of pages in the output.
#[derive(Debug)]
pub struct Fragment {
    pub kind: FragmentKind,
    /// Where the pages came from, for logs.
    pub label: String,
    pub document: Document,
}

impl Fragment {
    pub fn new(kind: FragmentKind, label: impl Into<String>, document: Document) -> Self {
        Self {
            kind,
            label: label.into(),
            document,
        }
    }

    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }
}

/// The merged document.
#[derive(Debug)]
pub struct AssembledPdf {
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

/// Concatenate `fragments`, in order, into one serialised PDF.
pub fn assemble(fragments: Vec<Fragment>, compress: bool) -> Result<AssembledPdf, MergeError> {
    if fragments.is_empty() {
        return Err(MergeError::NothingToMerge {
            skipped: 0,
            first_error: "no pages to assemble".into(),
        });
    }

    let mut version = String::from("1.5");
    let mut max_id: u32 = 1;
    let mut pages: Vec<(ObjectId, Dictionary)> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for fragment in fragments {
        let Fragment {
            kind,
            label,
            document: mut doc,
        } = fragment;
        if doc.version > version {
            version = doc.version.clone();
        }

        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        for page_id in &page_ids {
            let dict = flatten_page(&doc, *page_id).ok_or_else(|| {
                MergeError::Internal(format!("{label}: page object {page_id:?} is missing"))
            })?;
            pages.push((*page_id, dict));
        }
        debug!("Fragment '{}' ({:?}): {} page(s)", label, kind, page_ids.len());

        for (id, object) in doc.objects {
            match object.type_name().unwrap_or(b"") {
                b"Catalog" | b"Pages" | b"Page" | b"Outlines" | b"Outline" => {}
                _ => {
                    objects.insert(id, object);
                }
            }
        }
    }

    let mut document = Document::with_version(version);
    document.objects = objects;
    document.max_id = max_id;

    let pages_id = document.new_object_id();
    let mut kids = Vec::with_capacity(pages.len());
    for (id, mut dict) in pages {
        dict.set("Parent", pages_id);
        document.objects.insert(id, Object::Dictionary(dict));
        kids.push(Object::Reference(id));
    }
    let page_count = kids.len();

    document.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
        }),
    );
    let catalog_id = document.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    document.trailer.set("Root", catalog_id);

    document.renumber_objects();
    if compress {
        document.compress();
    }

    let mut bytes = Vec::new();
    document
        .save_to(&mut bytes)
        .map_err(|e| MergeError::SerializeFailed {
            detail: e.to_string(),
        })?;

    info!("Assembled {} page(s), {} bytes", page_count, bytes.len());
    Ok(AssembledPdf { bytes, page_count })
}

/// Clone a page dictionary with inherited attributes made explicit.
fn flatten_page(doc: &Document, page_id: ObjectId) -> Option<Dictionary> {
    let mut dict = doc.get_dictionary(page_id).ok()?.clone();

    let mut parent = dict.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;
    while let Some(parent_id) = parent {
        if depth >= MAX_TREE_DEPTH {
            break;
        }
        depth += 1;
        let Ok(node) = doc.get_dictionary(parent_id) else {
            break;
        };
        for key in INHERITABLE {
            if !dict.has(key) {
                if let Ok(value) = node.get(key) {
                    dict.set(key.to_vec(), value.clone());
                }
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    if !dict.has(b"MediaBox") {
        let a4 = PageGeometry::A4;
        dict.set(
            "MediaBox",
            vec![0.into(), 0.into(), a4.width.into(), a4.height.into()],
        );
    }
    Some(dict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};

    /// A PDF whose pages each show their label, with MediaBox and
    /// Resources inherited from the root /Pages node.
    fn labelled_pdf(labels: &[&str]) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let mut kids = Vec::new();
        for label in labels {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*label)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(lopdf::Stream::new(
                Dictionary::new(),
                content.encode().unwrap(),
            ));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::from(page_id));
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => labels.len() as i64,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
            }),
        );
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);
        doc
    }

    fn page_texts(bytes: &[u8]) -> Vec<String> {
        let doc = Document::load_mem(bytes).unwrap();
        doc.get_pages()
            .values()
            .map(|id| {
                let content = Content::decode(&doc.get_page_content(*id).unwrap()).unwrap();
                content
                    .operations
                    .iter()
                    .filter(|op| op.operator == "Tj")
                    .filter_map(|op| op.operands.first()?.as_str().ok())
                    .map(|b| String::from_utf8_lossy(b).into_owned())
                    .collect::<String>()
            })
            .collect()
    }

    #[test]
    fn pages_concatenate_in_fragment_order() {
        let fragments = vec![
            Fragment::new(FragmentKind::Passthrough, "a", labelled_pdf(&["a1", "a2"])),
            Fragment::new(FragmentKind::Passthrough, "b", labelled_pdf(&["b1"])),
            Fragment::new(FragmentKind::Passthrough, "c", labelled_pdf(&["c1", "c2", "c3"])),
        ];
        let out = assemble(fragments, false).unwrap();
        assert_eq!(out.page_count, 6);
        assert_eq!(page_texts(&out.bytes), vec!["a1", "a2", "b1", "c1", "c2", "c3"]);
    }

    #[test]
    fn same_document_twice_is_independent() {
        let fragments = vec![
            Fragment::new(FragmentKind::Passthrough, "x", labelled_pdf(&["x1"])),
            Fragment::new(FragmentKind::Passthrough, "x", labelled_pdf(&["x1"])),
        ];
        let out = assemble(fragments, true).unwrap();
        assert_eq!(page_texts(&out.bytes), vec!["x1", "x1"]);
    }

    #[test]
    fn inherited_attributes_are_copied_onto_pages() {
        let fragment = Fragment::new(FragmentKind::Passthrough, "a", labelled_pdf(&["a1"]));
        let out = assemble(vec![fragment], false).unwrap();
        let doc = Document::load_mem(&out.bytes).unwrap();
        let page_id = doc.get_pages()[&1];
        let page = doc.get_dictionary(page_id).unwrap();
        assert!(page.has(b"Resources"));
        let media_box: Vec<f32> = page
            .get(b"MediaBox")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o.as_float().unwrap())
            .collect();
        assert_eq!(media_box, vec![0.0, 0.0, 612.0, 792.0]);
    }

    #[test]
    fn empty_fragment_list_is_nothing_to_merge() {
        let err = assemble(Vec::new(), true).unwrap_err();
        assert!(matches!(err, MergeError::NothingToMerge { .. }));
    }
}
