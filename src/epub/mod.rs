//! EPUB writer. Packs chapter records into an EPUB 3 archive (mimetype, container, OPF,
//! nav, NCX, shared stylesheet, one XHTML document per chapter).

use crate::formats::write_atomically;
use crate::model::ChapterRecord;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fs::File;
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub const DEFAULT_BOOK_TITLE: &str = "Supreme Magus";
pub const BOOK_IDENTIFIER: &str = "supreme-magus";
pub const BOOK_LANGUAGE: &str = "pt-br";
pub const BOOK_AUTHOR: &str = "Central Novel";
pub const BOOK_DESCRIPTION: &str = "Webnovel Supreme Magus – coletado automaticamente.";

const CONTAINER_XML: &[u8] = b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<container version=\"1.0\" xmlns=\"urn:oasis:names:tc:opendocument:xmlns:container\">\n  <rootfiles>\n    <rootfile full-path=\"OEBPS/content.opf\" media-type=\"application/oebps-package+xml\"/>\n  </rootfiles>\n</container>";

const MIMETYPE: &[u8] = b"application/epub+zip";
const OEBPS_PREFIX: &str = "OEBPS/";
const STYLESHEET_HREF: &str = "styles/nav.css";

const STYLESHEET: &str = r#"@namespace epub "http://www.idpf.org/2007/ops";
body { font-family: Cambria, Liberation Serif, serif; margin: 1em; }
h1 { text-align: center; margin-top: 2em; }
h2 { text-align: center; margin-bottom: 1em; }
p { text-indent: 1.2em; margin-bottom: 0.8em; line-height: 1.4; }
"#;

/// Package-level metadata. Everything but the title is fixed for this source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookMetadata {
    pub identifier: String,
    pub title: String,
    pub language: String,
    pub author: String,
    pub description: String,
    /// Written as `dcterms:modified`, at second precision.
    pub modified: DateTime<Utc>,
}

impl BookMetadata {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            identifier: BOOK_IDENTIFIER.to_string(),
            title: title.into(),
            language: BOOK_LANGUAGE.to_string(),
            author: BOOK_AUTHOR.to_string(),
            description: BOOK_DESCRIPTION.to_string(),
            modified: Utc::now(),
        }
    }
}

impl Default for BookMetadata {
    fn default() -> Self {
        Self::new(DEFAULT_BOOK_TITLE)
    }
}

/// Errors from the EPUB writer.
#[derive(Debug, Error)]
pub enum EpubError {
    #[error("Cannot write EPUB: book title is empty.")]
    EmptyTitle,

    #[error("Cannot write EPUB: book has no chapters.")]
    NoChapters,

    #[error("Cannot write EPUB: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write EPUB archive: {path}: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: ZipError,
    },
}

/// Write the records as an EPUB 3 file at `path`, replacing any existing file.
///
/// Chapters keep input order in the manifest, the spine, the nav document and the NCX.
/// Missing parent directories are created.
pub fn write_epub(
    records: &[ChapterRecord],
    path: &Path,
    metadata: &BookMetadata,
) -> Result<(), EpubError> {
    if metadata.title.trim().is_empty() {
        return Err(EpubError::EmptyTitle);
    }
    if records.is_empty() {
        return Err(EpubError::NoChapters);
    }

    write_atomically(path, |file: &mut File| -> Result<(), ZipError> {
        let mut zip = ZipWriter::new(file);
        write_package(records, metadata, &mut zip)?;
        zip.finish()?;
        Ok(())
    })
    .map_err(|e| match e {
        ZipError::Io(source) => EpubError::Io {
            path: path.to_path_buf(),
            source,
        },
        source => EpubError::Zip {
            path: path.to_path_buf(),
            source,
        },
    })
}

fn write_package(
    records: &[ChapterRecord],
    metadata: &BookMetadata,
    zip: &mut ZipWriter<impl Write + Seek>,
) -> Result<(), ZipError> {
    let options_stored = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored)
        .unix_permissions(0o644);
    let options_deflate = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);

    // Mimetype first and stored, per the OCF container rules
    zip.start_file("mimetype", options_stored)?;
    zip.write_all(MIMETYPE)?;

    zip.start_file("META-INF/container.xml", options_deflate)?;
    zip.write_all(CONTAINER_XML)?;

    put(zip, "content.opf", &opf(records, metadata), options_deflate)?;
    put(zip, "nav.xhtml", &nav_xhtml(records, metadata), options_deflate)?;
    put(zip, "toc.ncx", &ncx(records, metadata), options_deflate)?;
    put(zip, STYLESHEET_HREF, STYLESHEET, options_deflate)?;

    for (i, record) in records.iter().enumerate() {
        put(
            zip,
            &chapter_file_name(i),
            &chapter_xhtml(record, metadata),
            options_deflate,
        )?;
    }
    Ok(())
}

fn put(
    zip: &mut ZipWriter<impl Write + Seek>,
    name: &str,
    content: &str,
    options: SimpleFileOptions,
) -> Result<(), ZipError> {
    zip.start_file(format!("{}{}", OEBPS_PREFIX, name), options)?;
    zip.write_all(content.as_bytes())?;
    Ok(())
}

/// 1-based file name for the chapter at `index` in input order.
fn chapter_file_name(index: usize) -> String {
    format!("chapter-{}.xhtml", index + 1)
}

fn opf(records: &[ChapterRecord], metadata: &BookMetadata) -> String {
    let mut manifest = format!(
        r#"    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
    <item id="style_nav" href="{}" media-type="text/css"/>
"#,
        STYLESHEET_HREF
    );
    // Nav leads the reading order, then chapters.
    let mut spine = String::from("    <itemref idref=\"nav\"/>\n");
    for i in 0..records.len() {
        manifest.push_str(&format!(
            "    <item id=\"chapter-{}\" href=\"{}\" media-type=\"application/xhtml+xml\"/>\n",
            i + 1,
            chapter_file_name(i)
        ));
        spine.push_str(&format!("    <itemref idref=\"chapter-{}\"/>\n", i + 1));
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" unique-identifier="book-id" version="3.0" xml:lang="{lang}">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="book-id">{id}</dc:identifier>
    <dc:title>{title}</dc:title>
    <dc:language>{lang}</dc:language>
    <dc:creator id="creator">{creator}</dc:creator>
    <dc:description>{description}</dc:description>
    <meta property="dcterms:modified">{modified}</meta>
  </metadata>
  <manifest>
{manifest}  </manifest>
  <spine toc="ncx">
{spine}  </spine>
</package>
"#,
        id = xml_escape(&metadata.identifier),
        title = xml_escape(&metadata.title),
        lang = xml_escape(&metadata.language),
        creator = xml_escape(&metadata.author),
        description = xml_escape(&metadata.description),
        modified = metadata
            .modified
            .to_rfc3339_opts(SecondsFormat::Secs, true),
        manifest = manifest,
        spine = spine,
    )
}

fn nav_xhtml(records: &[ChapterRecord], metadata: &BookMetadata) -> String {
    let mut nav_links = String::new();
    for (i, record) in records.iter().enumerate() {
        nav_links.push_str(&format!(
            "      <li><a href=\"{}\">{}</a></li>\n",
            chapter_file_name(i),
            xml_escape(record.title())
        ));
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" lang="{lang}" xml:lang="{lang}">
<head>
  <meta charset="UTF-8"/>
  <title>{title}</title>
</head>
<body>
  <nav epub:type="toc" id="toc">
    <h1>{title}</h1>
    <ol>
{links}    </ol>
  </nav>
</body>
</html>
"#,
        lang = xml_escape(&metadata.language),
        title = xml_escape(&metadata.title),
        links = nav_links
    )
}

fn ncx(records: &[ChapterRecord], metadata: &BookMetadata) -> String {
    let mut nav_points = String::new();
    for (i, record) in records.iter().enumerate() {
        nav_points.push_str(&format!(
            r#"    <navPoint id="navpoint-{n}" playOrder="{n}">
      <navLabel><text>{label}</text></navLabel>
      <content src="{src}"/>
    </navPoint>
"#,
            n = i + 1,
            label = xml_escape(record.title()),
            src = chapter_file_name(i)
        ));
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content="{uid}"/>
  </head>
  <docTitle>
    <text>{title}</text>
  </docTitle>
  <navMap>
{points}  </navMap>
</ncx>
"#,
        uid = xml_escape(&metadata.identifier),
        title = xml_escape(&metadata.title),
        points = nav_points
    )
}

/// Body markup for one chapter: number heading, title heading, one `<p>` per paragraph.
pub fn chapter_fragment(record: &ChapterRecord) -> String {
    let mut html = format!(
        "<h1>{}</h1>\n<h2>{}</h2>\n",
        xml_escape(record.number()),
        xml_escape(record.title())
    );
    for paragraph in record.paragraphs() {
        html.push_str(&format!("<p>{}</p>\n", xml_escape(paragraph)));
    }
    html
}

fn chapter_xhtml(record: &ChapterRecord, metadata: &BookMetadata) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" lang="{lang}" xml:lang="{lang}">
<head>
  <meta charset="UTF-8"/>
  <title>{title}</title>
  <link rel="stylesheet" type="text/css" href="{css}"/>
</head>
<body>
{body}</body>
</html>
"#,
        lang = xml_escape(&metadata.language),
        title = xml_escape(record.title()),
        css = STYLESHEET_HREF,
        body = chapter_fragment(record)
    )
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
