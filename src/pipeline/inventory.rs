//! What a PDF page can show: its image XObjects and the text drawn by its
//! Form XObjects.
//!
//! Resources are looked up on the page first and then up the `/Parent`
//! chain, so pages that inherit `/Resources` from a `/Pages` node are seen
//! the same as pages that carry their own. Form XObjects are walked
//! recursively: images they reference count towards the page, and strings
//! they show are returned as text. lopdf's `extract_text` only reads the
//! page's own content stream, so form text has to be gathered here.

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashSet;
use tracing::debug;

/// Parent links followed before giving up on inherited resources.
const MAX_TREE_DEPTH: usize = 64;

/// Form XObjects nested deeper than this are not opened.
const MAX_FORM_DEPTH: usize = 16;

/// Images and form text found for one page.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PageInventory {
    /// Distinct image XObjects, page resources first, then those reached
    /// through forms.
    pub images: Vec<ObjectId>,
    /// Strings shown by form content streams, one line per form.
    pub form_text: String,
}

/// Collect the images and form text of `page_id`.
///
/// Broken or missing objects are skipped; the result is whatever could be
/// read.
pub fn inventory_page(doc: &Document, page_id: ObjectId) -> PageInventory {
    let mut inventory = PageInventory::default();
    let mut visited = HashSet::new();
    match page_resources(doc, page_id) {
        Some(resources) => walk_resources(doc, resources, 0, &mut visited, &mut inventory),
        None => debug!("Page {:?} has no resources", page_id),
    }
    inventory
}

/// The page's `/Resources`, inherited from the page tree when absent.
pub fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(resources) = node.get(b"Resources") {
            return resolve(doc, resources).and_then(|o| o.as_dict().ok());
        }
        let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn walk_resources<'a>(
    doc: &'a Document,
    resources: &'a Dictionary,
    depth: usize,
    visited: &mut HashSet<ObjectId>,
    inventory: &mut PageInventory,
) {
    let Some(xobjects) = resources
        .get(b"XObject")
        .ok()
        .and_then(|o| resolve(doc, o))
        .and_then(|o| o.as_dict().ok())
    else {
        return;
    };

    for (_, entry) in xobjects.iter() {
        let Object::Reference(id) = entry else {
            continue;
        };
        if !visited.insert(*id) {
            continue;
        }
        let Ok(stream) = doc.get_object(*id).and_then(Object::as_stream) else {
            continue;
        };

        match stream.dict.get(b"Subtype").and_then(Object::as_name) {
            Ok(b"Image") => inventory.images.push(*id),
            Ok(b"Form") if depth < MAX_FORM_DEPTH => {
                let data = stream
                    .decompressed_content()
                    .unwrap_or_else(|_| stream.content.clone());
                match Content::decode(&data) {
                    Ok(content) => collect_shown_text(&content, &mut inventory.form_text),
                    Err(e) => debug!("Form {:?}: content not decodable ({})", id, e),
                }
                // A form without its own resources uses its parent's.
                let form_resources = stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|o| resolve(doc, o))
                    .and_then(|o| o.as_dict().ok())
                    .unwrap_or(resources);
                walk_resources(doc, form_resources, depth + 1, visited, inventory);
            }
            Ok(b"Form") => debug!("Form {:?} nested too deep, skipped", id),
            _ => {}
        }
    }
}

/// Append the string operands of text-showing operators.
///
/// Bytes map one-to-one onto chars. Two-byte fonts over-count, which only
/// pushes a page towards rasterisation.
fn collect_shown_text(content: &Content, out: &mut String) {
    let start = out.len();
    for op in &content.operations {
        match op.operator.as_str() {
            "Tj" | "'" | "\"" => {
                if let Some(Object::String(bytes, _)) = op.operands.last() {
                    push_bytes(bytes, out);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = op.operands.first() {
                    for item in items {
                        if let Object::String(bytes, _) = item {
                            push_bytes(bytes, out);
                        }
                    }
                }
            }
            _ => {}
        }
    }
    if out.len() > start {
        out.push('\n');
    }
}

fn push_bytes(bytes: &[u8], out: &mut String) {
    out.extend(bytes.iter().map(|&b| b as char));
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::Operation;
    use lopdf::{dictionary, Stream};

    fn image(doc: &mut Document) -> ObjectId {
        doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 1,
                "Height" => 1,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            vec![0],
        ))
    }

    fn form(doc: &mut Document, text: &str, resources: Option<Dictionary>) -> ObjectId {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 10.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new(
                    "TJ",
                    vec![Object::Array(vec![
                        Object::string_literal(" more"),
                        (-120).into(),
                        Object::string_literal(" words"),
                    ])],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => vec![0.into(), 0.into(), 100.into(), 100.into()],
        };
        if let Some(resources) = resources {
            dict.set("Resources", resources);
        }
        doc.add_object(Stream::new(dict, content.encode().unwrap()))
    }

    /// A one-page tree; `page_resources` goes on the page, `tree_resources`
    /// on the `/Pages` node.
    fn page_tree(
        doc: &mut Document,
        page_resources: Option<Dictionary>,
        tree_resources: Option<Dictionary>,
    ) -> ObjectId {
        let pages_id = doc.new_object_id();
        let mut page = dictionary! { "Type" => "Page", "Parent" => pages_id };
        if let Some(resources) = page_resources {
            page.set("Resources", resources);
        }
        let page_id = doc.add_object(page);
        let mut pages = dictionary! {
            "Type" => "Pages",
            "Count" => 1,
            "Kids" => vec![page_id.into()],
        };
        if let Some(resources) = tree_resources {
            pages.set("Resources", resources);
        }
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        page_id
    }

    #[test]
    fn own_resources_list_images() {
        let mut doc = Document::with_version("1.5");
        let im = image(&mut doc);
        let page = page_tree(
            &mut doc,
            Some(dictionary! { "XObject" => dictionary! { "Im0" => im } }),
            None,
        );
        let inventory = inventory_page(&doc, page);
        assert_eq!(inventory.images, vec![im]);
        assert!(inventory.form_text.is_empty());
    }

    #[test]
    fn resources_are_inherited_from_the_page_tree() {
        let mut doc = Document::with_version("1.5");
        let im = image(&mut doc);
        let page = page_tree(
            &mut doc,
            None,
            Some(dictionary! { "XObject" => dictionary! { "Im0" => im } }),
        );
        assert!(page_resources(&doc, page).is_some());
        assert_eq!(inventory_page(&doc, page).images, vec![im]);
    }

    #[test]
    fn page_resources_win_over_inherited_ones() {
        let mut doc = Document::with_version("1.5");
        let own = image(&mut doc);
        let inherited = image(&mut doc);
        let page = page_tree(
            &mut doc,
            Some(dictionary! { "XObject" => dictionary! { "Im0" => own } }),
            Some(dictionary! { "XObject" => dictionary! { "Im0" => inherited } }),
        );
        assert_eq!(inventory_page(&doc, page).images, vec![own]);
    }

    #[test]
    fn form_text_and_nested_images_are_collected() {
        let mut doc = Document::with_version("1.5");
        let im = image(&mut doc);
        let inner = form(
            &mut doc,
            "Caption",
            Some(dictionary! { "XObject" => dictionary! { "Im0" => im } }),
        );
        let outer = form(
            &mut doc,
            "This paragraph is real page content",
            Some(dictionary! { "XObject" => dictionary! { "Fm1" => inner } }),
        );
        let page = page_tree(
            &mut doc,
            Some(dictionary! { "XObject" => dictionary! { "Fm0" => outer } }),
            None,
        );

        let inventory = inventory_page(&doc, page);
        assert_eq!(inventory.images, vec![im]);
        assert!(inventory
            .form_text
            .contains("This paragraph is real page content more words"));
        assert!(inventory.form_text.contains("Caption"));
    }

    #[test]
    fn self_referencing_form_terminates() {
        let mut doc = Document::with_version("1.5");
        let fm = form(&mut doc, "loop", None);
        let resources = dictionary! { "XObject" => dictionary! { "Fm0" => fm } };
        if let Ok(Object::Stream(stream)) = doc.get_object_mut(fm) {
            stream.dict.set("Resources", resources.clone());
        }
        let page = page_tree(&mut doc, Some(resources), None);

        let inventory = inventory_page(&doc, page);
        assert!(inventory.images.is_empty());
        assert_eq!(inventory.form_text.matches("loop").count(), 1);
    }

    #[test]
    fn shared_image_counts_once() {
        let mut doc = Document::with_version("1.5");
        let im = image(&mut doc);
        let fm = form(
            &mut doc,
            "",
            Some(dictionary! { "XObject" => dictionary! { "Im0" => im } }),
        );
        let page = page_tree(
            &mut doc,
            Some(dictionary! { "XObject" => dictionary! { "Im0" => im, "Fm0" => fm } }),
            None,
        );
        assert_eq!(inventory_page(&doc, page).images, vec![im]);
    }
}
