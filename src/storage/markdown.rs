//! Markdown storage for books
//!
//! Books live in the site's content directory (`_epubs/` by default), one
//! markdown file per book. Each file has YAML frontmatter with a fixed key
//! order followed by a templated body sentence. The whole file is
//! regenerated on every write.
//!
//! The store keeps an in-memory cache keyed by filename. The cache is only
//! ever rebuilt in full from the directory listing.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::{unique_filename, Book, BookError, DownloadLink, OneOrMany, Platform, MARKDOWN_EXT};
use crate::shortener::{Shorten, ShortenOutcome};

/// Jekyll layout used by every book page
pub const LAYOUT: &str = "epub";

/// Body written below the frontmatter; Liquid fills in the page fields
pub const BODY_TEMPLATE: &str =
    "Đây là trang chi tiết của cuốn sách \"{{ page.title }}\" của tác giả {{ page.author }}.";

const DELIMITER: &str = "---";

/// Frontmatter in its on-disk key order
#[derive(Serialize)]
struct Frontmatter<'a> {
    layout: &'static str,
    title: &'a str,
    author: &'a str,
    cover_image: &'a str,
    description: &'a str,

    #[serde(skip_serializing_if = "Option::is_none")]
    preview_image: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    isbn: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    published_date: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    genre: Option<&'a OneOrMany>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pages: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    publisher: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<&'a OneOrMany>,

    #[serde(skip_serializing_if = "Option::is_none")]
    preview_content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    download_links: Option<&'a [DownloadLink]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    download_config_url: Option<&'a str>,
}

fn text(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

fn labels(value: &Option<OneOrMany>) -> Option<&OneOrMany> {
    value.as_ref().filter(|v| !v.is_empty())
}

impl<'a> From<&'a Book> for Frontmatter<'a> {
    fn from(book: &'a Book) -> Self {
        Self {
            layout: LAYOUT,
            title: &book.title,
            author: &book.author,
            cover_image: &book.cover_image,
            description: &book.description,
            preview_image: text(&book.preview_image),
            isbn: text(&book.isbn),
            published_date: text(&book.published_date),
            genre: labels(&book.genre),
            rating: book.rating.filter(|r| *r != 0.0),
            pages: book.pages.filter(|p| *p != 0),
            language: text(&book.language),
            publisher: text(&book.publisher),
            tags: labels(&book.tags),
            preview_content: text(&book.preview_content),
            download_links: Some(book.download_links.as_slice()).filter(|l| !l.is_empty()),
            download_config_url: text(&book.download_config_url),
        }
    }
}

/// Renders a book to a complete markdown document
pub fn render_markdown(book: &Book) -> Result<String> {
    let yaml = serde_yaml::to_string(&Frontmatter::from(book))
        .context("Failed to serialize frontmatter")?;

    let mut content = String::new();
    content.push_str(DELIMITER);
    content.push('\n');
    content.push_str(&yaml);
    content.push_str(DELIMITER);
    content.push_str("\n\n");
    content.push_str(BODY_TEMPLATE);
    content.push('\n');

    Ok(content)
}

/// Parses a markdown document into a book
///
/// The frontmatter is everything between the opening `---` line and the
/// next line consisting only of `---`; the rest is kept verbatim (trimmed)
/// as the book's `content`.
pub fn parse_markdown(content: &str) -> Result<Book> {
    let mut lines = content.split_inclusive('\n');
    let opening = lines.next().unwrap_or_default();
    if !is_delimiter(opening) {
        anyhow::bail!("Missing frontmatter (must start with ---)");
    }

    let start = opening.len();
    let mut offset = start;
    for line in lines {
        if is_delimiter(line) {
            let yaml = &content[start..offset];
            let body = &content[offset + line.len()..];

            let mut book: Book =
                serde_yaml::from_str(yaml).context("Failed to parse frontmatter")?;
            book.content = body.trim().to_string();
            return Ok(book);
        }
        offset += line.len();
    }

    anyhow::bail!("Missing frontmatter end delimiter (---)")
}

fn is_delimiter(line: &str) -> bool {
    line.trim_end_matches(['\n', '\r']) == DELIMITER
}

/// Summary of a batch link conversion
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConversionReport {
    pub converted: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

/// Aggregate figures over the cached books
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BookStatistics {
    pub total_books: usize,
    pub authors: Vec<String>,
    pub genres: Vec<String>,
    pub languages: Vec<String>,
    pub publishers: Vec<String>,
    /// Mean over books that have a rating, two decimals
    pub avg_rating: f64,
    /// Mean over books that have a page count, rounded
    pub avg_pages: u64,
}

/// Store for book pages as markdown files
pub struct BookStore {
    /// Directory containing book files
    dir: PathBuf,

    /// Parsed books keyed by filename
    cache: BTreeMap<String, Book>,
}

impl BookStore {
    /// Creates a store with an empty cache
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: BTreeMap::new(),
        }
    }

    /// Creates a store and loads its cache from disk
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let mut store = Self::new(dir);
        store.load_cache();
        store
    }

    /// Returns the directory containing book files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn book_path(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    /// Rebuilds the cache from every markdown file in the directory
    ///
    /// Files that cannot be read or parsed are logged and left out.
    /// Returns the number of books loaded.
    pub fn load_cache(&mut self) -> usize {
        self.cache.clear();

        if !self.dir.exists() {
            return 0;
        }

        let entries = match fs::read_dir(&self.dir) {
            Ok(e) => e,
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "failed to read content directory");
                return 0;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.extension().is_some_and(|e| e == MARKDOWN_EXT) {
                continue;
            }

            let filename = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };

            match Self::read_from_file(&path) {
                Ok(mut book) => {
                    book.filename = Some(filename.clone());
                    self.cache.insert(filename, book);
                }
                Err(e) => {
                    warn!(file = %path.display(), error = %format!("{:#}", e), "skipping unparsable book");
                }
            }
        }

        debug!(count = self.cache.len(), dir = %self.dir.display(), "loaded book cache");
        self.cache.len()
    }

    /// Re-reads every book from disk
    pub fn refresh(&mut self) -> usize {
        self.load_cache()
    }

    fn read_from_file(path: &Path) -> Result<Book> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read book file: {}", path.display()))?;

        parse_markdown(&content)
    }

    /// Writes a book file atomically (temp file + rename)
    fn write_to_file(&self, filename: &str, book: &Book) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create directory: {}", self.dir.display()))?;

        let path = self.book_path(filename);
        let temp_path = path.with_extension("md.tmp");
        let content = render_markdown(book)?;

        fs::write(&temp_path, &content)
            .with_context(|| format!("Failed to write temp file: {}", temp_path.display()))?;

        fs::rename(&temp_path, &path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }

    fn cache_insert(&mut self, filename: &str, mut book: Book) {
        book.filename = Some(filename.to_string());
        book.content = BODY_TEMPLATE.to_string();
        self.cache.insert(filename.to_string(), book);
    }

    /// Returns a cached book by filename
    pub fn get(&self, filename: &str) -> Option<&Book> {
        self.cache.get(filename)
    }

    /// Lists cached books ordered by filename
    pub fn list(&self) -> Vec<&Book> {
        self.cache.values().collect()
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Returns the filename a book with this title would be created under
    pub fn next_filename(&self, title: &str) -> String {
        unique_filename(title, &self.dir)
    }

    /// Writes a new book and returns its filename
    pub fn create(&mut self, book: Book) -> Result<String> {
        book.validate()?;

        let filename = self.next_filename(&book.title);
        self.write_to_file(&filename, &book)?;
        self.cache_insert(&filename, book);

        debug!(%filename, "created book");
        Ok(filename)
    }

    /// Rewrites an existing book file wholesale
    ///
    /// Returns `Ok(false)` when the file does not exist or cannot be
    /// written; only invalid input is an error.
    pub fn update(&mut self, filename: &str, book: Book) -> Result<bool, BookError> {
        check_filename(filename)?;
        book.validate()?;

        if !self.book_path(filename).exists() {
            return Ok(false);
        }

        if let Err(e) = self.write_to_file(filename, &book) {
            warn!(%filename, error = %format!("{:#}", e), "failed to update book");
            return Ok(false);
        }

        self.cache_insert(filename, book);
        debug!(%filename, "updated book");
        Ok(true)
    }

    /// Removes a book file and evicts it from the cache
    ///
    /// A file that is already gone still counts as deleted.
    pub fn delete(&mut self, filename: &str) -> Result<bool, BookError> {
        check_filename(filename)?;

        let path = self.book_path(filename);
        if path.exists() {
            if let Err(e) = fs::remove_file(&path) {
                warn!(%filename, error = %e, "failed to delete book");
                return Ok(false);
            }
        }

        self.cache.remove(filename);
        debug!(%filename, "deleted book");
        Ok(true)
    }

    /// Re-shortens download links of every cached book through `target`
    ///
    /// With `only_google_drive`, links that are not hosted on Google
    /// Drive/Docs are left untouched. Links whose shortening fails are kept
    /// as they were and reported in `errors`.
    pub fn batch_convert(
        &mut self,
        shortener: &dyn Shorten,
        target: &Platform,
        only_google_drive: bool,
    ) -> ConversionReport {
        let mut report = ConversionReport::default();
        let filenames: Vec<String> = self.cache.keys().cloned().collect();

        for filename in filenames {
            let Some(mut book) = self.cache.get(&filename).cloned() else {
                continue;
            };

            let mut changed = false;
            let mut links = Vec::with_capacity(book.download_links.len());

            for link in &book.download_links {
                if only_google_drive && !link.is_google_drive() {
                    links.push(link.clone());
                    continue;
                }

                match shortener.shorten(&link.url, target) {
                    ShortenOutcome::Shortened { url } => {
                        let converted = DownloadLink::for_platform(target, url);
                        changed |= converted != *link;
                        links.push(converted);
                    }
                    ShortenOutcome::Fallback { error, .. } => {
                        report.errors.push(format!("{}: {}", filename, error));
                        links.push(link.clone());
                    }
                }
            }

            if !changed {
                report.skipped += 1;
                continue;
            }

            book.download_links = links;
            match self.update(&filename, book) {
                Ok(true) => report.converted += 1,
                Ok(false) => report
                    .errors
                    .push(format!("{}: Failed to update file", filename)),
                Err(e) => report.errors.push(format!("{}: {}", filename, e)),
            }
        }

        report
    }

    /// Aggregates authors, genres, languages, publishers and averages
    pub fn statistics(&self) -> BookStatistics {
        let mut authors = BTreeSet::new();
        let mut genres = BTreeSet::new();
        let mut languages = BTreeSet::new();
        let mut publishers = BTreeSet::new();

        let mut rating_sum = 0.0;
        let mut rated = 0usize;
        let mut pages_sum = 0u64;
        let mut paged = 0u64;

        for book in self.cache.values() {
            if !book.author.is_empty() {
                authors.insert(book.author.clone());
            }
            genres.extend(book.genres().map(String::from));
            if let Some(language) = text(&book.language) {
                languages.insert(language.to_string());
            }
            if let Some(publisher) = text(&book.publisher) {
                publishers.insert(publisher.to_string());
            }
            if let Some(rating) = book.rating.filter(|r| *r != 0.0) {
                rating_sum += rating;
                rated += 1;
            }
            if let Some(pages) = book.pages.filter(|p| *p != 0) {
                pages_sum += u64::from(pages);
                paged += 1;
            }
        }

        let avg_rating = if rated > 0 {
            (rating_sum / rated as f64 * 100.0).round() / 100.0
        } else {
            0.0
        };
        let avg_pages = if paged > 0 {
            (pages_sum as f64 / paged as f64).round() as u64
        } else {
            0
        };

        BookStatistics {
            total_books: self.cache.len(),
            authors: authors.into_iter().collect(),
            genres: genres.into_iter().collect(),
            languages: languages.into_iter().collect(),
            publishers: publishers.into_iter().collect(),
            avg_rating,
            avg_pages,
        }
    }
}

/// Rejects names that would escape the content directory
fn check_filename(filename: &str) -> Result<(), BookError> {
    let path = Path::new(filename);
    let is_plain = path.file_name().and_then(|n| n.to_str()) == Some(filename);

    if !is_plain || !path.extension().is_some_and(|e| e == MARKDOWN_EXT) {
        return Err(BookError::InvalidFilename(filename.to_string()));
    }

    Ok(())
}
