// Writing the summary workbooks.
//
// The workbook is a minimal Office Open XML package: one worksheet per question, text through
// the shared string table and counts as numbers.

use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use log::{debug, warn};
use snafu::ResultExt;
use survey_tally::{SummaryCell, SummaryTable};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::survey::*;

/// Excel refuses these characters in sheet names.
pub const FORBIDDEN_SHEET_CHARS: [char; 6] = ['\\', '/', '*', '[', ']', ':'];
/// Longer names are written, but some applications cannot read them.
pub const SHEET_NAME_MAX_CHARS: usize = 31;

#[derive(PartialEq, Debug, Clone)]
enum CellValue {
    Text(String),
    Number(u64),
}

#[derive(PartialEq, Debug, Clone)]
struct Sheet {
    name: String,
    rows: Vec<Vec<CellValue>>,
}

/// Collects the sheets of one workbook. Nothing touches the disk before `finish`.
#[derive(Default)]
pub struct WorkbookWriter {
    sheets: Vec<Sheet>,
}

impl WorkbookWriter {
    pub fn new() -> WorkbookWriter {
        WorkbookWriter { sheets: Vec::new() }
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    /// Appends a sheet: the headers on the first row, then the rows of the table.
    ///
    /// A sheet with the same name, ignoring case, gets replaced.
    pub fn add_sheet(&mut self, name: &str, table: &SummaryTable) -> SurveyResult<()> {
        if let Some(c) = name
            .chars()
            .find(|c| FORBIDDEN_SHEET_CHARS.contains(c) || !is_xml_char(*c))
        {
            return InvalidSheetNameSnafu { name, character: c }.fail();
        }
        let name = if name.is_empty() {
            format!("Sheet{}", self.sheets.len() + 1)
        } else {
            name.to_string()
        };
        if name.chars().count() > SHEET_NAME_MAX_CHARS {
            warn!(
                "Sheet name {:?} is longer than {} characters",
                name, SHEET_NAME_MAX_CHARS
            );
        }

        let mut rows: Vec<Vec<CellValue>> =
            vec![table.headers.iter().map(|h| CellValue::Text(h.clone())).collect()];
        for row in table.rows.iter() {
            rows.push(
                row.iter()
                    .map(|c| match c {
                        SummaryCell::Label(s) => CellValue::Text(s.clone()),
                        SummaryCell::Count(v) => CellValue::Number(*v),
                    })
                    .collect(),
            );
        }

        let sheet = Sheet { name, rows };
        // Sheet names are case-insensitive.
        let key = sheet.name.to_lowercase();
        if let Some(existing) = self
            .sheets
            .iter_mut()
            .find(|s| s.name.to_lowercase() == key)
        {
            warn!("Sheet {:?} appears twice, keeping the last one", sheet.name);
            *existing = sheet;
        } else {
            debug!("add_sheet: {:?}", sheet.name);
            self.sheets.push(sheet);
        }
        Ok(())
    }

    /// Writes the workbook file.
    pub fn finish(self, path: &Path) -> SurveyResult<()> {
        let path_s = path.display().to_string();
        let file = File::create(path).context(WritingWorkbookSnafu {
            path: path_s.clone(),
        })?;

        let mut strings = SharedStrings::default();
        let sheet_xmls: Vec<String> = self
            .sheets
            .iter()
            .map(|s| generate_sheet_xml(&s.rows, &mut strings))
            .collect();
        let names: Vec<&str> = self.sheets.iter().map(|s| s.name.as_str()).collect();

        let mut parts: Vec<(String, String)> = vec![
            (
                "[Content_Types].xml".to_string(),
                generate_content_types(names.len()),
            ),
            ("_rels/.rels".to_string(), generate_rels().to_string()),
            ("xl/workbook.xml".to_string(), generate_workbook(&names)),
            (
                "xl/_rels/workbook.xml.rels".to_string(),
                generate_workbook_rels(names.len()),
            ),
            ("xl/styles.xml".to_string(), generate_styles().to_string()),
            (
                "xl/sharedStrings.xml".to_string(),
                generate_shared_strings(&strings),
            ),
        ];
        for (i, xml) in sheet_xmls.into_iter().enumerate() {
            parts.push((format!("xl/worksheets/sheet{}.xml", i + 1), xml));
        }

        let mut zip = ZipWriter::new(file);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, content) in parts.iter() {
            zip.start_file(name.as_str(), options)
                .context(PackagingWorkbookSnafu {
                    path: path_s.clone(),
                })?;
            zip.write_all(content.as_bytes())
                .context(WritingWorkbookSnafu {
                    path: path_s.clone(),
                })?;
        }
        zip.finish().context(PackagingWorkbookSnafu { path: path_s })?;
        Ok(())
    }
}

/// The shared string table, in order of first use.
#[derive(Default, Debug)]
struct SharedStrings {
    strings: Vec<String>,
    index: HashMap<String, usize>,
    count: usize,
}

impl SharedStrings {
    fn intern(&mut self, s: &str) -> usize {
        self.count += 1;
        if let Some(idx) = self.index.get(s) {
            return *idx;
        }
        let idx = self.strings.len();
        self.strings.push(s.to_string());
        self.index.insert(s.to_string(), idx);
        idx
    }
}

pub fn xml_escape(s: &str) -> String {
    let mut res = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => res.push_str("&amp;"),
            '<' => res.push_str("&lt;"),
            '>' => res.push_str("&gt;"),
            '"' => res.push_str("&quot;"),
            '\'' => res.push_str("&apos;"),
            _ => res.push(c),
        }
    }
    res
}

/// Characters allowed in an XML 1.0 document.
pub fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\t' | '\n' | '\r'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

fn is_ooxml_escape_at(chars: &[char], i: usize) -> bool {
    chars.len() >= i + 7
        && chars[i] == '_'
        && chars[i + 1] == 'x'
        && chars[i + 2..i + 6].iter().all(|c| c.is_ascii_hexdigit())
        && chars[i + 6] == '_'
}

/// The text of a shared string.
///
/// Characters that XML cannot carry are written as `_xHHHH_`. An underscore that would start
/// such a sequence in the original text is itself escaped as `_x005F_`.
pub fn shared_string_escape(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut encoded = String::with_capacity(s.len());
    for (i, c) in chars.iter().enumerate() {
        if !is_xml_char(*c) {
            encoded.push_str(&format!("_x{:04X}_", *c as u32));
        } else if is_ooxml_escape_at(&chars, i) {
            encoded.push_str("_x005F_");
        } else {
            encoded.push(*c);
        }
    }
    xml_escape(&encoded)
}

/// The column letters of a zero-based index: 0 is `A`, 26 is `AA`.
pub fn column_letter(col: usize) -> String {
    let mut letters: Vec<char> = Vec::new();
    let mut col = col;
    loop {
        letters.push((b'A' + (col % 26) as u8) as char);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    letters.iter().rev().collect()
}

fn generate_sheet_xml(rows: &[Vec<CellValue>], strings: &mut SharedStrings) -> String {
    let mut xml = String::with_capacity(300 + rows.len() * 200);
    xml.push_str(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" \
xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">\
<sheetData>",
    );
    for (r, row) in rows.iter().enumerate() {
        let rownum = r + 1;
        xml.push_str(&format!("<row r=\"{}\">", rownum));
        for (c, cell) in row.iter().enumerate() {
            let cell_ref = format!("{}{}", column_letter(c), rownum);
            match cell {
                CellValue::Text(s) => {
                    let idx = strings.intern(s);
                    xml.push_str(&format!("<c r=\"{}\" t=\"s\"><v>{}</v></c>", cell_ref, idx));
                }
                CellValue::Number(v) => {
                    xml.push_str(&format!("<c r=\"{}\"><v>{}</v></c>", cell_ref, v));
                }
            }
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

fn generate_shared_strings(strings: &SharedStrings) -> String {
    let mut xml = String::with_capacity(200 + strings.strings.len() * 40);
    xml.push_str(&format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<sst xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" count=\"{}\" uniqueCount=\"{}\">",
        strings.count,
        strings.strings.len()
    ));
    for s in strings.strings.iter() {
        xml.push_str("<si><t xml:space=\"preserve\">");
        xml.push_str(&shared_string_escape(s));
        xml.push_str("</t></si>");
    }
    xml.push_str("</sst>");
    xml
}

fn generate_content_types(num_sheets: usize) -> String {
    let mut xml = String::with_capacity(800 + num_sheets * 150);
    xml.push_str(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
<Default Extension=\"xml\" ContentType=\"application/xml\"/>\
<Override PartName=\"/xl/workbook.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml\"/>\
<Override PartName=\"/xl/styles.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml\"/>\
<Override PartName=\"/xl/sharedStrings.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml\"/>",
    );
    for i in 1..=num_sheets {
        xml.push_str(&format!(
            "<Override PartName=\"/xl/worksheets/sheet{}.xml\" \
ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml\"/>",
            i
        ));
    }
    xml.push_str("</Types>");
    xml
}

fn generate_rels() -> &'static str {
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" Target=\"xl/workbook.xml\"/>\
</Relationships>"
}

fn generate_workbook(sheet_names: &[&str]) -> String {
    let mut xml = String::with_capacity(400 + sheet_names.len() * 80);
    xml.push_str(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<workbook xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" \
xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">\
<sheets>",
    );
    for (i, name) in sheet_names.iter().enumerate() {
        let id = i + 1;
        xml.push_str(&format!(
            "<sheet name=\"{}\" sheetId=\"{}\" r:id=\"rId{}\"/>",
            xml_escape(name),
            id,
            id
        ));
    }
    xml.push_str("</sheets></workbook>");
    xml
}

fn generate_workbook_rels(num_sheets: usize) -> String {
    let mut xml = String::with_capacity(400 + num_sheets * 150);
    xml.push_str(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">",
    );
    for i in 1..=num_sheets {
        xml.push_str(&format!(
            "<Relationship Id=\"rId{}\" \
Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet\" \
Target=\"worksheets/sheet{}.xml\"/>",
            i, i
        ));
    }
    let styles_id = num_sheets + 1;
    let strings_id = num_sheets + 2;
    xml.push_str(&format!(
        "<Relationship Id=\"rId{}\" \
Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles\" \
Target=\"styles.xml\"/>\
<Relationship Id=\"rId{}\" \
Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings\" \
Target=\"sharedStrings.xml\"/>",
        styles_id, strings_id
    ));
    xml.push_str("</Relationships>");
    xml
}

fn generate_styles() -> &'static str {
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<styleSheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\">\
<fonts count=\"1\"><font><sz val=\"11\"/><name val=\"Calibri\"/></font></fonts>\
<fills count=\"2\"><fill><patternFill patternType=\"none\"/></fill><fill><patternFill patternType=\"gray125\"/></fill></fills>\
<borders count=\"1\"><border><left/><right/><top/><bottom/><diagonal/></border></borders>\
<cellStyleXfs count=\"1\"><xf numFmtId=\"0\" fontId=\"0\" fillId=\"0\" borderId=\"0\"/></cellStyleXfs>\
<cellXfs count=\"1\"><xf numFmtId=\"0\" fontId=\"0\" fillId=\"0\" borderId=\"0\" xfId=\"0\"/></cellXfs>\
<cellStyles count=\"1\"><cellStyle name=\"Normal\" xfId=\"0\" builtinId=\"0\"/></cellStyles>\
</styleSheet>"
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook, DataType, Reader, Xlsx};

    fn table(headers: &[&str], rows: Vec<Vec<SummaryCell>>) -> SummaryTable {
        SummaryTable {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows,
        }
    }

    fn label(s: &str) -> SummaryCell {
        SummaryCell::Label(s.to_string())
    }

    #[test]
    fn column_letters() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
        assert_eq!(column_letter(701), "ZZ");
        assert_eq!(column_letter(702), "AAA");
    }

    #[test]
    fn escapes_xml() {
        assert_eq!(xml_escape("a < b & \"c\""), "a &lt; b &amp; &quot;c&quot;");
    }

    #[test]
    fn rejects_forbidden_sheet_names() {
        let mut w = WorkbookWriter::new();
        let res = w.add_sheet("In/Out", &table(&["구분", "합계"], vec![]));
        assert!(matches!(
            res,
            Err(SurveyError::InvalidSheetName { character: '/', .. })
        ));
    }

    #[test]
    fn repeated_sheet_replaces_the_first() {
        let mut w = WorkbookWriter::new();
        let t = table(&["구분", "합계"], vec![vec![label("응답수"), SummaryCell::Count(0)]]);
        w.add_sheet("Q", &t).unwrap();
        w.add_sheet("R", &t).unwrap();
        w.add_sheet("Q", &t).unwrap();
        assert_eq!(w.sheet_names(), vec!["Q", "R"]);
    }

    #[test]
    fn sheet_names_compare_without_case() {
        let mut w = WorkbookWriter::new();
        let t = table(&["구분", "합계"], vec![]);
        w.add_sheet("Yes", &t).unwrap();
        w.add_sheet("No", &t).unwrap();
        w.add_sheet("yes", &t).unwrap();
        assert_eq!(w.sheet_names(), vec!["yes", "No"]);
    }

    #[test]
    fn rejects_control_characters_in_sheet_names() {
        let mut w = WorkbookWriter::new();
        let res = w.add_sheet("Q\u{1}", &table(&["구분", "합계"], vec![]));
        assert!(matches!(
            res,
            Err(SurveyError::InvalidSheetName {
                character: '\u{1}',
                ..
            })
        ));
        assert!(w.sheet_names().is_empty());
    }

    #[test]
    fn control_characters_in_cells_are_encoded() {
        assert_eq!(shared_string_escape("a\u{1}b"), "a_x0001_b");
        assert_eq!(shared_string_escape("tab\tok"), "tab\tok");
        assert_eq!(shared_string_escape("_x0041_"), "_x005F_x0041_");
        assert_eq!(shared_string_escape("snake_x_case"), "snake_x_case");
        assert_eq!(shared_string_escape("<\u{FFFF}>"), "&lt;_xFFFF_&gt;");

        let mut strings = SharedStrings::default();
        strings.intern("Yes\u{1}");
        let xml = generate_shared_strings(&strings);
        assert!(xml.contains("<t xml:space=\"preserve\">Yes_x0001_</t>"));
        assert!(xml.chars().all(is_xml_char));
    }

    #[test]
    fn empty_sheet_name_gets_a_default() {
        let mut w = WorkbookWriter::new();
        w.add_sheet("", &table(&["구분", "합계"], vec![])).unwrap();
        assert_eq!(w.sheet_names(), vec!["Sheet1"]);
    }

    #[test]
    fn shared_strings_are_deduplicated() {
        let mut strings = SharedStrings::default();
        let rows = vec![
            vec![CellValue::Text("a".to_string()), CellValue::Text("b".to_string())],
            vec![CellValue::Text("a".to_string()), CellValue::Number(3)],
        ];
        let xml = generate_sheet_xml(&rows, &mut strings);
        assert_eq!(strings.strings, vec!["a", "b"]);
        assert_eq!(strings.count, 3);
        assert!(xml.contains("<c r=\"A2\" t=\"s\"><v>0</v></c>"));
        assert!(xml.contains("<c r=\"B2\"><v>3</v></c>"));
    }

    #[test]
    fn workbook_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("survey.xlsx");
        let mut w = WorkbookWriter::new();
        w.add_sheet(
            "Do you like X",
            &table(
                &["구분", "Yes", "No", "합계"],
                vec![
                    vec![
                        label("응답수"),
                        SummaryCell::Count(8),
                        SummaryCell::Count(2),
                        SummaryCell::Count(10),
                    ],
                    vec![label("응답률"), label("80%"), label("20%"), label("100%")],
                ],
            ),
        )
        .unwrap();
        w.add_sheet(
            "Tom & Jerry <3",
            &table(
                &["구분", "A", "합계"],
                vec![vec![label("응답수"), SummaryCell::Count(5), SummaryCell::Count(5)]],
            ),
        )
        .unwrap();
        w.finish(&path).unwrap();

        let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
        assert_eq!(
            workbook.sheet_names().to_vec(),
            vec!["Do you like X".to_string(), "Tom & Jerry <3".to_string()]
        );
        let range = workbook.worksheet_range("Do you like X").unwrap().unwrap();
        let rows: Vec<Vec<DataType>> = range.rows().map(|r| r.to_vec()).collect();
        assert_eq!(rows[0][0], DataType::String("구분".to_string()));
        assert_eq!(rows[1][0], DataType::String("응답수".to_string()));
        assert_eq!(rows[1][3], DataType::Float(10.0));
        assert_eq!(rows[2][3], DataType::String("100%".to_string()));
        let range = workbook.worksheet_range("Tom & Jerry <3").unwrap().unwrap();
        assert_eq!(range.get_size(), (2, 3));
    }
}
