//! Speaker notes from an Office Open XML (`.pptx`) package.
//!
//! Slide order comes from `ppt/presentation.xml` (`p:sldIdLst`), resolved
//! through the package relationships to each slide part, then to that
//! slide's notes part. The notes text is the body placeholder of the notes
//! slide: paragraphs joined by newlines, surrounding whitespace trimmed.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use slidecast_common::error::{SlidecastError, SlidecastResult};

const NS_PRESENTATION: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const NS_DRAWING: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_RELATIONSHIPS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const REL_TYPE_SLIDE: &str = "/slide";
const REL_TYPE_NOTES: &str = "/notesSlide";

/// Source of per-slide speaker notes, in deck order.
pub trait NotesReader: Send + Sync {
    /// One entry per slide; empty string when a slide has no notes.
    fn read_notes(&self, deck_path: &Path) -> SlidecastResult<Vec<String>>;
}

/// Reads notes straight out of a `.pptx` package.
#[derive(Debug, Default, Clone, Copy)]
pub struct PptxNotesReader;

impl NotesReader for PptxNotesReader {
    fn read_notes(&self, deck_path: &Path) -> SlidecastResult<Vec<String>> {
        let file = File::open(deck_path).map_err(|e| {
            SlidecastError::extraction(format!("cannot open deck {}: {e}", deck_path.display()))
        })?;
        let mut package = zip::ZipArchive::new(file).map_err(|e| {
            SlidecastError::extraction(format!(
                "{} is not a readable presentation package: {e}",
                deck_path.display()
            ))
        })?;

        let presentation = read_part(&mut package, "ppt/presentation.xml")?;
        let presentation_rels = read_part(&mut package, "ppt/_rels/presentation.xml.rels")?;

        let slide_rel_ids = slide_relationship_ids(&presentation)?;
        let rels = parse_relationships(&presentation_rels)?;

        let mut notes = Vec::with_capacity(slide_rel_ids.len());
        for rel_id in &slide_rel_ids {
            let rel = rels.get(rel_id.as_str()).ok_or_else(|| {
                SlidecastError::extraction(format!("slide relationship {rel_id} is missing"))
            })?;
            if !rel.kind.ends_with(REL_TYPE_SLIDE) {
                return Err(SlidecastError::extraction(format!(
                    "relationship {rel_id} is not a slide ({})",
                    rel.kind
                )));
            }
            let slide_part = resolve_target("ppt", &rel.target);
            notes.push(read_slide_notes(&mut package, &slide_part)?);
        }

        tracing::debug!(
            deck = %deck_path.display(),
            slides = notes.len(),
            with_notes = notes.iter().filter(|n| !n.is_empty()).count(),
            "Read speaker notes"
        );
        Ok(notes)
    }
}

#[derive(Debug)]
struct Relationship {
    kind: String,
    target: String,
}

fn read_part<R: Read + std::io::Seek>(
    package: &mut zip::ZipArchive<R>,
    name: &str,
) -> SlidecastResult<String> {
    let mut part = package
        .by_name(name)
        .map_err(|e| SlidecastError::extraction(format!("missing package part {name}: {e}")))?;
    let mut content = String::new();
    part.read_to_string(&mut content)
        .map_err(|e| SlidecastError::extraction(format!("cannot read {name}: {e}")))?;
    Ok(content)
}

fn try_read_part<R: Read + std::io::Seek>(
    package: &mut zip::ZipArchive<R>,
    name: &str,
) -> SlidecastResult<Option<String>> {
    if package.index_for_name(name).is_none() {
        return Ok(None);
    }
    read_part(package, name).map(Some)
}

fn parse_xml(xml: &str) -> SlidecastResult<roxmltree::Document<'_>> {
    roxmltree::Document::parse(xml)
        .map_err(|e| SlidecastError::extraction(format!("malformed XML part: {e}")))
}

/// `r:id` of every `p:sldId`, in presentation order.
fn slide_relationship_ids(presentation_xml: &str) -> SlidecastResult<Vec<String>> {
    let doc = parse_xml(presentation_xml)?;
    Ok(doc
        .descendants()
        .filter(|n| n.has_tag_name((NS_PRESENTATION, "sldId")))
        .filter_map(|n| n.attribute((NS_RELATIONSHIPS, "id")))
        .map(str::to_string)
        .collect())
}

fn parse_relationships(rels_xml: &str) -> SlidecastResult<HashMap<String, Relationship>> {
    let doc = parse_xml(rels_xml)?;
    let mut rels = HashMap::new();
    for node in doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "Relationship")
    {
        let (Some(id), Some(kind), Some(target)) = (
            node.attribute("Id"),
            node.attribute("Type"),
            node.attribute("Target"),
        ) else {
            continue;
        };
        rels.insert(
            id.to_string(),
            Relationship {
                kind: kind.to_string(),
                target: target.to_string(),
            },
        );
    }
    Ok(rels)
}

/// Resolve a relationship target against the directory of its source part.
fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// `ppt/slides/slide1.xml` -> (`ppt/slides`, `ppt/slides/_rels/slide1.xml.rels`)
fn rels_part_for(part: &str) -> (String, String) {
    match part.rsplit_once('/') {
        Some((dir, file)) => (dir.to_string(), format!("{dir}/_rels/{file}.rels")),
        None => (String::new(), format!("_rels/{part}.rels")),
    }
}

fn read_slide_notes<R: Read + std::io::Seek>(
    package: &mut zip::ZipArchive<R>,
    slide_part: &str,
) -> SlidecastResult<String> {
    let (slide_dir, rels_part) = rels_part_for(slide_part);
    let Some(rels_xml) = try_read_part(package, &rels_part)? else {
        return Ok(String::new());
    };

    let rels = parse_relationships(&rels_xml)?;
    let Some(notes_rel) = rels.values().find(|r| r.kind.ends_with(REL_TYPE_NOTES)) else {
        return Ok(String::new());
    };

    let notes_part = resolve_target(&slide_dir, &notes_rel.target);
    match try_read_part(package, &notes_part)? {
        Some(xml) => notes_body_text(&xml),
        None => {
            tracing::warn!(part = %notes_part, "Notes relationship points at a missing part");
            Ok(String::new())
        }
    }
}

/// Text of the body placeholder of a notes slide.
fn notes_body_text(notes_xml: &str) -> SlidecastResult<String> {
    let doc = parse_xml(notes_xml)?;

    let body = doc
        .descendants()
        .filter(|n| n.has_tag_name((NS_PRESENTATION, "sp")))
        .find(|sp| {
            sp.descendants().any(|n| {
                n.has_tag_name((NS_PRESENTATION, "ph")) && n.attribute("type") == Some("body")
            })
        });

    let Some(body) = body else {
        return Ok(String::new());
    };

    let paragraphs: Vec<String> = body
        .descendants()
        .filter(|n| n.has_tag_name((NS_DRAWING, "p")))
        .map(|p| {
            let mut text = String::new();
            for node in p.descendants() {
                if node.has_tag_name((NS_DRAWING, "t")) {
                    text.push_str(node.text().unwrap_or_default());
                } else if node.has_tag_name((NS_DRAWING, "br")) {
                    text.push('\n');
                }
            }
            text
        })
        .collect();

    Ok(paragraphs.join("\n").trim().to_string())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::io::Write;
    use std::path::Path;

    const PRESENTATION_HEAD: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:sldIdLst>"#;

    fn notes_xml(text: &str) -> String {
        let paragraphs: String = text
            .split('\n')
            .map(|line| format!("<a:p><a:r><a:t>{line}</a:t></a:r></a:p>"))
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:notes xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree>
<p:sp><p:nvSpPr><p:cNvPr id="2" name="Slide Image"/><p:cNvSpPr/><p:nvPr><p:ph type="sldImg"/></p:nvPr></p:nvSpPr></p:sp>
<p:sp><p:nvSpPr><p:cNvPr id="3" name="Notes"/><p:cNvSpPr/><p:nvPr><p:ph type="body" idx="1"/></p:nvPr></p:nvSpPr><p:txBody><a:bodyPr/>{paragraphs}</p:txBody></p:sp>
<p:sp><p:nvSpPr><p:cNvPr id="4" name="Slide Number"/><p:cNvSpPr/><p:nvPr><p:ph type="sldNum"/></p:nvPr></p:nvSpPr><p:txBody><a:p><a:r><a:t>9</a:t></a:r></a:p></p:txBody></p:sp>
</p:spTree></p:cSld></p:notes>"#
        )
    }

    /// Write a minimal `.pptx` whose slides carry the given notes
    /// (`None` = slide without a notes part).
    ///
    /// Slide parts are numbered in reverse so that deck order must come
    /// from `p:sldIdLst`, not from part names.
    pub(crate) fn write_pptx(path: &Path, notes: &[Option<&str>]) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        let count = notes.len();

        let mut presentation = String::from(PRESENTATION_HEAD);
        let mut rels = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for (i, slide_notes) in notes.iter().enumerate() {
            let part_no = count - i;
            presentation.push_str(&format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + i, i + 2));
            rels.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide{part_no}.xml"/>"#,
                i + 2
            ));

            zip.start_file(format!("ppt/slides/slide{part_no}.xml"), options)
                .unwrap();
            zip.write_all(br#"<?xml version="1.0"?><p:sld xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"/>"#)
                .unwrap();

            if let Some(text) = slide_notes {
                zip.start_file(format!("ppt/slides/_rels/slide{part_no}.xml.rels"), options)
                    .unwrap();
                zip.write_all(format!(
                    r#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesSlide" Target="../notesSlides/notesSlide{part_no}.xml"/></Relationships>"#
                ).as_bytes())
                .unwrap();

                zip.start_file(format!("ppt/notesSlides/notesSlide{part_no}.xml"), options)
                    .unwrap();
                zip.write_all(notes_xml(text).as_bytes()).unwrap();
            }
        }
        presentation.push_str("</p:sldIdLst></p:presentation>");
        rels.push_str("</Relationships>");

        zip.start_file("ppt/presentation.xml", options).unwrap();
        zip.write_all(presentation.as_bytes()).unwrap();
        zip.start_file("ppt/_rels/presentation.xml.rels", options)
            .unwrap();
        zip.write_all(rels.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("ppt", "slides/slide1.xml"), "ppt/slides/slide1.xml");
        assert_eq!(
            resolve_target("ppt/slides", "../notesSlides/notesSlide1.xml"),
            "ppt/notesSlides/notesSlide1.xml"
        );
        assert_eq!(resolve_target("ppt", "/ppt/slides/slide2.xml"), "ppt/slides/slide2.xml");
    }

    #[test]
    fn test_rels_part_for() {
        let (dir, rels) = rels_part_for("ppt/slides/slide3.xml");
        assert_eq!(dir, "ppt/slides");
        assert_eq!(rels, "ppt/slides/_rels/slide3.xml.rels");
    }

    #[test]
    fn test_reads_notes_in_deck_order() {
        let dir = tempfile::tempdir().unwrap();
        let deck = dir.path().join("talk.pptx");
        fixtures::write_pptx(
            &deck,
            &[Some("Hello there friend"), None, Some("  Thank you  ")],
        );

        let notes = PptxNotesReader.read_notes(&deck).unwrap();
        assert_eq!(notes, vec!["Hello there friend", "", "Thank you"]);
    }

    #[test]
    fn test_multi_paragraph_notes_join_with_newlines() {
        let dir = tempfile::tempdir().unwrap();
        let deck = dir.path().join("talk.pptx");
        fixtures::write_pptx(&deck, &[Some("First point\nSecond point")]);

        let notes = PptxNotesReader.read_notes(&deck).unwrap();
        assert_eq!(notes, vec!["First point\nSecond point"]);
    }

    #[test]
    fn test_missing_deck_is_extraction_error() {
        let err = PptxNotesReader
            .read_notes(Path::new("/nonexistent/deck.pptx"))
            .unwrap_err();
        assert!(matches!(err, SlidecastError::Extraction { .. }));
    }

    #[test]
    fn test_non_zip_deck_is_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        let deck = dir.path().join("fake.pptx");
        std::fs::write(&deck, b"not a zip").unwrap();

        let err = PptxNotesReader.read_notes(&deck).unwrap_err();
        assert!(matches!(err, SlidecastError::Extraction { .. }));
    }

    #[test]
    fn test_notes_body_ignores_other_placeholders() {
        let xml = r#"<p:notes xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree>
<p:sp><p:nvSpPr><p:nvPr><p:ph type="sldNum"/></p:nvPr></p:nvSpPr><p:txBody><a:p><a:r><a:t>12</a:t></a:r></a:p></p:txBody></p:sp>
</p:spTree></p:cSld></p:notes>"#;
        assert_eq!(notes_body_text(xml).unwrap(), "");
    }
}
