//! End-to-end conversion tests.
//!
//! Workbook fixtures are synthesized in-test with `zip::ZipWriter`, so the
//! suite runs without any checked-in binary files.

use sheetpipe::{
    csv_to_xlsx, csv_to_xlsx_with_options, xlsx_to_csv, xlsx_to_csv_with_options, ConvertOptions,
    Error,
};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

const WORKBOOK_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#;

/// Write a minimal workbook with the given sheetData body.
fn build_xlsx(dir: &Path, name: &str, sheet_body: &str, shared_strings: Option<&str>) -> PathBuf {
    let path = dir.join(name);
    let file = File::create(&path).unwrap();
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

    zip.start_file("xl/workbook.xml", options).unwrap();
    zip.write_all(WORKBOOK_XML.as_bytes()).unwrap();

    zip.start_file("xl/_rels/workbook.xml.rels", options).unwrap();
    zip.write_all(WORKBOOK_RELS.as_bytes()).unwrap();

    if let Some(sst) = shared_strings {
        zip.start_file("xl/sharedStrings.xml", options).unwrap();
        zip.write_all(sst.as_bytes()).unwrap();
    }

    zip.start_file("xl/worksheets/sheet1.xml", options).unwrap();
    zip.write_all(
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{}</sheetData></worksheet>"#,
            sheet_body
        )
        .as_bytes(),
    )
    .unwrap();

    zip.finish().unwrap();
    path
}

fn read_entry(path: &Path, name: &str) -> String {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut entry = archive.by_name(name).unwrap();
    let mut content = String::new();
    entry.read_to_string(&mut content).unwrap();
    content
}

fn parse_csv(path: &Path) -> Vec<Vec<String>> {
    let mut reader = csv_reader(path);
    reader
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect()
}

fn csv_reader(path: &Path) -> csv::Reader<File> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(File::open(path).unwrap())
}

#[test]
fn simple_csv_to_xlsx() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.csv");
    fs::write(&input, "a,b,c\n1,2,3\n,,x\n").unwrap();
    let output = dir.path().join("out.xlsx");

    let stats = csv_to_xlsx(&input, &output).unwrap();
    assert_eq!(stats.rows, 3);
    assert_eq!(stats.cells, 7);

    let archive = ZipArchive::new(File::open(&output).unwrap()).unwrap();
    let mut names: Vec<String> = archive.file_names().map(String::from).collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "[Content_Types].xml",
            "_rels/.rels",
            "xl/_rels/workbook.xml.rels",
            "xl/workbook.xml",
            "xl/worksheets/sheet1.xml",
        ]
    );
    drop(archive);

    let sheet = read_entry(&output, "xl/worksheets/sheet1.xml");
    assert!(sheet.contains("<row r=\"1\">"));
    assert!(sheet.contains("<row r=\"2\">"));
    assert!(sheet.contains("<row r=\"3\">"));

    let row3_start = sheet.find("<row r=\"3\">").unwrap();
    let row3_end = sheet[row3_start..].find("</row>").unwrap() + row3_start;
    let row3 = &sheet[row3_start..row3_end];
    assert_eq!(row3.matches("<c ").count(), 1);
    assert!(row3.contains("<c r=\"C3\""));
    assert!(row3.contains(">x</t>"));
}

#[test]
fn delimiter_inference_and_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.csv");
    fs::write(&input, "name;age;city\nada;36;london\n").unwrap();
    let workbook = dir.path().join("mid.xlsx");
    let output = dir.path().join("out.csv");

    csv_to_xlsx(&input, &workbook).unwrap();
    xlsx_to_csv(&workbook, &output).unwrap();

    // The writer always emits the default comma dialect.
    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "name,age,city\nada,36,london\n"
    );
}

#[test]
fn sparse_sheet_preserves_row_alignment() {
    let dir = tempfile::tempdir().unwrap();
    let input = build_xlsx(
        dir.path(),
        "sparse.xlsx",
        r#"<row r="1"><c r="A1" t="inlineStr"><is><t>a</t></is></c><c r="B1" t="inlineStr"><is><t>b</t></is></c></row><row r="3"><c r="B3" t="inlineStr"><is><t>b3</t></is></c></row>"#,
        None,
    );
    let output = dir.path().join("out.csv");

    let stats = xlsx_to_csv(&input, &output).unwrap();
    assert_eq!(stats.rows, 3);
    assert_eq!(fs::read_to_string(&output).unwrap(), "a,b\n\n,b3\n");
}

#[test]
fn shared_strings_resolve_by_index() {
    let dir = tempfile::tempdir().unwrap();
    let input = build_xlsx(
        dir.path(),
        "shared.xlsx",
        r#"<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>2</v></c><c r="C1" t="s"><v>1</v></c></row>"#,
        Some(r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="3" uniqueCount="3"><si><t>foo</t></si><si><t>bar</t></si><si><t>baz</t></si></sst>"#),
    );
    let output = dir.path().join("out.csv");

    xlsx_to_csv(&input, &output).unwrap();
    assert_eq!(fs::read_to_string(&output).unwrap(), "foo,baz,bar\n");
}

#[test]
fn boolean_cells_become_text() {
    let dir = tempfile::tempdir().unwrap();
    let input = build_xlsx(
        dir.path(),
        "bools.xlsx",
        r#"<row r="1"><c r="A1" t="b"><v>1</v></c><c r="B1" t="b"><v>0</v></c></row>"#,
        None,
    );
    let output = dir.path().join("out.csv");

    xlsx_to_csv(&input, &output).unwrap();
    assert_eq!(fs::read_to_string(&output).unwrap(), "TRUE,FALSE\n");
}

#[test]
fn traversal_and_wrapper_paths_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.csv");
    let options = ConvertOptions::new().with_sandbox_root(dir.path());

    for input in ["../../../etc/passwd", "file:///etc/passwd"] {
        let result = xlsx_to_csv_with_options(input, &output, &options);
        assert!(matches!(result, Err(Error::InvalidPath(_))), "{}", input);
        assert!(!output.exists());
    }
}

#[test]
fn csv_roundtrip_preserves_rows_and_fields() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.csv");
    {
        let mut writer = csv::Writer::from_writer(File::create(&input).unwrap());
        writer
            .write_record(["plain", "with,comma", "with \"quotes\"", "semi;colon"])
            .unwrap();
        writer
            .write_record(["multi\nline", "tab\there", "한글 텍스트", ""])
            .unwrap();
        writer.write_record(["trailing space ", " leading", "", "end"]).unwrap();
        writer.flush().unwrap();
    }
    let workbook = dir.path().join("mid.xlsx");
    let output = dir.path().join("out.csv");

    csv_to_xlsx(&input, &workbook).unwrap();
    xlsx_to_csv(&workbook, &output).unwrap();

    let original = parse_csv(&input);
    let roundtripped = parse_csv(&output);
    assert_eq!(original.len(), roundtripped.len());
    for (before, after) in original.iter().zip(&roundtripped) {
        // Trailing empty fields collapse: the sheet omits empty cells, so a
        // row's width is its last non-empty column.
        let trimmed: Vec<&String> = before
            .iter()
            .take(before.iter().rposition(|f| !f.is_empty()).map_or(0, |p| p + 1))
            .collect();
        let after: Vec<&String> = after.iter().collect();
        assert_eq!(trimmed, after);
    }
}

#[test]
fn bom_is_stripped_once() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("bom.csv");
    let mut file = File::create(&input).unwrap();
    file.write_all(b"\xEF\xBB\xBFx,y\n").unwrap();
    drop(file);
    let output = dir.path().join("out.xlsx");

    csv_to_xlsx(&input, &output).unwrap();

    let sheet = read_entry(&output, "xl/worksheets/sheet1.xml");
    assert!(sheet.contains(">x</t>"));
    assert!(!sheet.contains('\u{feff}'));
}

#[test]
fn malformed_sheet_fails_without_leaving_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = build_xlsx(
        dir.path(),
        "broken.xlsx",
        r#"<row r="1"><c r="A1"><v>1</v></c></oops>"#,
        None,
    );
    let output = dir.path().join("out.csv");

    assert!(xlsx_to_csv(&input, &output).is_err());
    assert!(!output.exists());
}

#[test]
fn non_archive_input_fails_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("not-a-zip.xlsx");
    fs::write(&input, "just text").unwrap();
    let output = dir.path().join("out.csv");

    assert!(matches!(
        xlsx_to_csv(&input, &output),
        Err(Error::ZipArchive(_))
    ));
    assert!(!output.exists());
}

#[test]
fn workbook_without_worksheets_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.xlsx");
    let mut zip = ZipWriter::new(File::create(&path).unwrap());
    let options = SimpleFileOptions::default();
    zip.start_file("xl/workbook.xml", options).unwrap();
    zip.write_all(b"<workbook/>").unwrap();
    zip.finish().unwrap();

    assert!(matches!(
        xlsx_to_csv(&path, dir.path().join("out.csv")),
        Err(Error::SheetNotFound)
    ));
}

#[test]
fn forced_delimiter_overrides_detection() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.csv");
    // Commas would win detection; the forced delimiter splits on pipes.
    fs::write(&input, "a,b|c,d\n").unwrap();
    let workbook = dir.path().join("mid.xlsx");
    let output = dir.path().join("out.csv");

    let options = ConvertOptions::new().with_delimiter(b'|');
    csv_to_xlsx_with_options(&input, &workbook, &options).unwrap();
    xlsx_to_csv(&workbook, &output).unwrap();

    assert_eq!(fs::read_to_string(&output).unwrap(), "\"a,b\",\"c,d\"\n");
}

#[test]
fn empty_worksheet_yields_empty_csv() {
    let dir = tempfile::tempdir().unwrap();
    let input = build_xlsx(dir.path(), "empty.xlsx", "", None);
    let output = dir.path().join("out.csv");

    let stats = xlsx_to_csv(&input, &output).unwrap();
    assert_eq!(stats.rows, 0);
    assert_eq!(fs::read_to_string(&output).unwrap(), "");
}

#[test]
fn generated_workbook_reads_back() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.csv");
    let mut body = String::new();
    for i in 0..500 {
        body.push_str(&format!("row{i},value with spaces,{i}\n"));
    }
    fs::write(&input, &body).unwrap();
    let workbook = dir.path().join("mid.xlsx");
    let output = dir.path().join("out.csv");

    let written = csv_to_xlsx(&input, &workbook).unwrap();
    assert_eq!(written.rows, 500);

    let read_back = xlsx_to_csv(&workbook, &output).unwrap();
    assert_eq!(read_back.rows, 500);
    assert_eq!(fs::read_to_string(&output).unwrap(), body);
}
