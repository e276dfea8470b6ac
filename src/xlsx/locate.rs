//! Locating the first worksheet entry of a workbook.

use crate::error::{Error, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Read, Seek};
use zip::ZipArchive;

/// Resolve the archive entry path of the workbook's first worksheet.
///
/// The workbook's own sheet list and relationship table are consulted
/// first; when either is missing or unusable, the archive is scanned for
/// `xl/worksheets/*.xml` entries and the lexicographically first one wins.
pub fn locate_first_worksheet<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<String> {
    if let Some(path) = relationship_target(archive) {
        if archive.file_names().any(|name| name == path) {
            return Ok(path);
        }
    }

    let mut candidates: Vec<String> = archive
        .file_names()
        .filter(|name| is_worksheet_entry(name))
        .map(String::from)
        .collect();
    candidates.sort();
    candidates.into_iter().next().ok_or(Error::SheetNotFound)
}

/// Follow workbook.xml → workbook.xml.rels to the first sheet's target.
/// Any failure along the way falls back to the directory scan.
fn relationship_target<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Option<String> {
    let workbook = read_part(archive, "xl/workbook.xml").ok()?;
    let rels = read_part(archive, "xl/_rels/workbook.xml.rels").ok()?;
    let rel_id = first_sheet_rel_id(&workbook)?;
    let target = target_for(&rels, &rel_id)?;
    Some(normalize_target(&target))
}

/// Read a small archive part into a string. Only ever used for the
/// workbook and relationship parts, which stay tiny.
fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<String> {
    let mut entry = archive.by_name(name)?;
    let mut content = String::new();
    entry.read_to_string(&mut content)?;
    Ok(content)
}

/// Relationship id of the first `<sheet>` element in workbook.xml.
fn first_sheet_rel_id(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event().ok()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                for attr in e.attributes().flatten() {
                    if attr.key.local_name().as_ref() == b"id" {
                        return Some(String::from_utf8_lossy(&attr.value).into_owned());
                    }
                }
                return None;
            }
            Event::Eof => return None,
            _ => {}
        }
    }
}

/// `Target` of the `<Relationship>` whose `Id` matches `rel_id`.
fn target_for(xml: &str, rel_id: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event().ok()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let mut id = String::new();
                let mut target = String::new();
                for attr in e.attributes().flatten() {
                    match attr.key.local_name().as_ref() {
                        b"Id" => id = String::from_utf8_lossy(&attr.value).into_owned(),
                        b"Target" => target = String::from_utf8_lossy(&attr.value).into_owned(),
                        _ => {}
                    }
                }
                if id == rel_id && !target.is_empty() {
                    return Some(target);
                }
            }
            Event::Eof => return None,
            _ => {}
        }
    }
}

/// Normalize a relationship target to an archive entry path.
fn normalize_target(target: &str) -> String {
    let cleaned = target.replace('\\', "/");
    let cleaned = cleaned.trim_start_matches('/');
    if cleaned.starts_with("xl/") {
        cleaned.to_string()
    } else {
        format!("xl/{}", cleaned)
    }
}

/// Matches `xl/worksheets/<name>.xml` (case-insensitive, no subdirectory).
fn is_worksheet_entry(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    match lower.strip_prefix("xl/worksheets/") {
        Some(rest) => rest.len() > 4 && rest.ends_with(".xml") && !rest.contains('/'),
        None => false,
    }
}
