//! EPUB 3 writer. Consumes a finished `Book` (title, id, chapters in reading order) and packages it:
//! mimetype, container, OPF, nav/NCX, one XHTML document per chapter.

use crate::model::Book;
use std::io::{Cursor, Seek, Write};
use std::path::Path;
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const CONTAINER_XML: &[u8] = b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<container version=\"1.0\" xmlns=\"urn:oasis:names:tc:opendocument:xmlns:container\">\n  <rootfiles>\n    <rootfile full-path=\"OEBPS/content.opf\" media-type=\"application/oebps-package+xml\"/>\n  </rootfiles>\n</container>";

/// Errors from the EPUB writer. Maps to CLI exit code 3.
#[derive(Debug, Error)]
pub enum EpubError {
    #[error("Cannot write EPUB: book title is empty.")]
    EmptyTitle,

    #[error("Cannot write EPUB: book has no chapters.")]
    NoChapters,

    #[error("Failed to create EPUB file: {path}: {source}")]
    CreateFile {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write EPUB archive: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl From<std::io::Error> for EpubError {
    fn from(e: std::io::Error) -> Self {
        EpubError::Zip(zip::result::ZipError::Io(e))
    }
}

const MIMETYPE: &[u8] = b"application/epub+zip";
const OEBPS_PREFIX: &str = "OEBPS/";

/// Package `book` in memory.
pub fn assemble(book: &Book) -> Result<Vec<u8>, EpubError> {
    validate_book(book)?;
    let mut cursor = Cursor::new(Vec::new());
    write_archive(book, &mut cursor)?;
    Ok(cursor.into_inner())
}

/// Package `book` and write it to `path`.
pub fn write_epub(book: &Book, path: &Path) -> Result<(), EpubError> {
    validate_book(book)?;
    let file = std::fs::File::create(path).map_err(|e| EpubError::CreateFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    write_archive(book, file)
}

/// Callers validate `book` first.
fn write_archive<W: Write + Seek>(book: &Book, writer: W) -> Result<(), EpubError> {
    let mut zip = ZipWriter::new(writer);

    let options_stored = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored)
        .unix_permissions(0o644);
    let options_deflate = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);

    // Mimetype first, uncompressed
    zip.start_file("mimetype", options_stored)?;
    zip.write_all(MIMETYPE)?;

    zip.start_file("META-INF/container.xml", options_deflate)?;
    zip.write_all(CONTAINER_XML)?;

    write_opf(book, &mut zip, options_deflate)?;
    write_nav_xhtml(book, &mut zip, options_deflate)?;
    write_ncx(book, &mut zip, options_deflate)?;
    write_chapters(book, &mut zip, options_deflate)?;

    zip.finish()?;
    Ok(())
}

fn validate_book(book: &Book) -> Result<(), EpubError> {
    if book.title.trim().is_empty() {
        return Err(EpubError::EmptyTitle);
    }
    if book.chapters.is_empty() {
        return Err(EpubError::NoChapters);
    }
    Ok(())
}

fn identifier(book: &Book) -> String {
    format!("urn:uuid:{}", xml_escape(&book.book_id))
}

/// Manifest/spine id for a chapter file: its name without the extension.
fn item_id(file_name: &str) -> &str {
    file_name.strip_suffix(".xhtml").unwrap_or(file_name)
}

fn write_opf(
    book: &Book,
    zip: &mut ZipWriter<impl Write + Seek>,
    options: SimpleFileOptions,
) -> Result<(), EpubError> {
    let mut manifest = String::from(
        r#"    <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
"#,
    );
    let mut spine = String::from("    <itemref idref=\"nav\"/>\n");
    for ch in &book.chapters {
        let file = html_escape_attr(&ch.file_name);
        let id = html_escape_attr(item_id(&ch.file_name));
        manifest.push_str(&format!(
            "    <item id=\"{}\" href=\"{}\" media-type=\"application/xhtml+xml\"/>\n",
            id, file
        ));
        spine.push_str(&format!("    <itemref idref=\"{}\"/>\n", id));
    }

    let opf = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" unique-identifier="BookId" version="3.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>{title}</dc:title>
    <dc:language>ja</dc:language>
    <dc:identifier id="BookId">{id}</dc:identifier>
    <meta property="dcterms:modified">{modified}</meta>
  </metadata>
  <manifest>
{manifest}  </manifest>
  <spine toc="ncx">
{spine}  </spine>
</package>
"#,
        title = xml_escape(&book.title),
        id = identifier(book),
        modified = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
        manifest = manifest,
        spine = spine,
    );
    zip.start_file(format!("{}content.opf", OEBPS_PREFIX), options)?;
    zip.write_all(opf.as_bytes())?;
    Ok(())
}

fn write_nav_xhtml(
    book: &Book,
    zip: &mut ZipWriter<impl Write + Seek>,
    options: SimpleFileOptions,
) -> Result<(), EpubError> {
    let mut nav_links = String::new();
    for ch in &book.chapters {
        nav_links.push_str(&format!(
            "      <li><a href=\"{}\">{}</a></li>\n",
            html_escape_attr(&ch.file_name),
            xml_escape(&ch.title)
        ));
    }
    let nav = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" lang="ja">
<head><title>Table of Contents</title></head>
<body>
  <nav epub:type="toc" id="toc">
    <h1>Table of Contents</h1>
    <ol>
{}    </ol>
  </nav>
</body>
</html>
"#,
        nav_links
    );
    zip.start_file(format!("{}nav.xhtml", OEBPS_PREFIX), options)?;
    zip.write_all(nav.as_bytes())?;
    Ok(())
}

fn write_ncx(
    book: &Book,
    zip: &mut ZipWriter<impl Write + Seek>,
    options: SimpleFileOptions,
) -> Result<(), EpubError> {
    let mut points = String::new();
    for (i, ch) in book.chapters.iter().enumerate() {
        points.push_str(&format!(
            r#"    <navPoint id="navPoint-{n}" playOrder="{n}">
      <navLabel><text>{title}</text></navLabel>
      <content src="{src}"/>
    </navPoint>
"#,
            n = i + 1,
            title = xml_escape(&ch.title),
            src = html_escape_attr(&ch.file_name)
        ));
    }
    let ncx = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content="{id}"/>
    <meta name="dtb:depth" content="1"/>
    <meta name="dtb:totalPageCount" content="0"/>
    <meta name="dtb:maxPageNumber" content="0"/>
  </head>
  <docTitle><text>{title}</text></docTitle>
  <navMap>
{points}  </navMap>
</ncx>
"#,
        id = identifier(book),
        title = xml_escape(&book.title),
        points = points
    );
    zip.start_file(format!("{}toc.ncx", OEBPS_PREFIX), options)?;
    zip.write_all(ncx.as_bytes())?;
    Ok(())
}

/// Chapter bodies are already restricted to `<p>`/`<br/>` fragments and go in verbatim.
fn write_chapters(
    book: &Book,
    zip: &mut ZipWriter<impl Write + Seek>,
    options: SimpleFileOptions,
) -> Result<(), EpubError> {
    for ch in &book.chapters {
        let title = xml_escape(&ch.title);
        let html = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" lang="ja">
<head>
<title>{title}</title>
</head>
<body>
<h3>{title}</h3>
{body}
</body>
</html>
"#,
            title = title,
            body = ch.body
        );
        zip.start_file(format!("{}{}", OEBPS_PREFIX, ch.file_name), options)?;
        zip.write_all(html.as_bytes())?;
    }
    Ok(())
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn html_escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
