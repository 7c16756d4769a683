//! Book CLI commands

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

use super::git_cmd::{self, PublishArgs};
use super::output::Output;
use crate::domain::{Book, DownloadLink, OneOrMany};
use crate::shortener::Shorten;
use crate::storage::Site;

#[derive(Subcommand)]
pub enum BookCommands {
    /// Create a book page
    Add {
        #[command(flatten)]
        fields: BookFields,

        /// Download link as NAME=URL (repeatable)
        #[arg(long = "link", value_name = "NAME=URL", value_parser = parse_link)]
        links: Vec<(String, String)>,

        /// Google Drive link to shorten through --platform
        #[arg(long, requires = "platform", conflicts_with = "links")]
        drive_link: Option<String>,

        /// Platform id used to shorten --drive-link
        #[arg(long, requires = "drive_link")]
        platform: Option<u32>,

        #[command(flatten)]
        publish: PublishArgs,
    },

    /// List all books
    List,

    /// Show a book
    Show {
        /// Book filename (e.g. test-book.md)
        filename: String,
    },

    /// Change fields of an existing book
    Edit {
        /// Book filename (e.g. test-book.md)
        filename: String,

        #[command(flatten)]
        fields: BookFields,

        /// Replace the download links (NAME=URL, repeatable)
        #[arg(long = "link", value_name = "NAME=URL", value_parser = parse_link)]
        links: Vec<(String, String)>,

        #[command(flatten)]
        publish: PublishArgs,
    },

    /// Delete a book page
    Delete {
        /// Book filename (e.g. test-book.md)
        filename: String,

        #[command(flatten)]
        publish: PublishArgs,
    },

    /// Show catalog statistics
    Stats,

    /// Re-shorten download links through another platform
    Convert {
        /// Target platform id
        #[arg(long, short)]
        platform: u32,

        /// Convert every link, not only Google Drive ones
        #[arg(long)]
        all_links: bool,

        #[command(flatten)]
        publish: PublishArgs,
    },
}

/// Book fields accepted by `add` and `edit`
#[derive(Args, Debug, Default)]
pub struct BookFields {
    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub author: Option<String>,

    /// Cover image URL
    #[arg(long)]
    pub cover_image: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// Preview image URL
    #[arg(long)]
    pub preview_image: Option<String>,

    #[arg(long)]
    pub isbn: Option<String>,

    /// Publication date (YYYY-MM-DD)
    #[arg(long)]
    pub published_date: Option<String>,

    /// Genres, comma separated
    #[arg(long)]
    pub genre: Option<String>,

    /// Rating from 0.0 to 5.0
    #[arg(long)]
    pub rating: Option<f64>,

    #[arg(long)]
    pub pages: Option<u32>,

    #[arg(long)]
    pub language: Option<String>,

    #[arg(long)]
    pub publisher: Option<String>,

    /// Tags, comma separated
    #[arg(long)]
    pub tags: Option<String>,

    /// Excerpt shown before the download section
    #[arg(long)]
    pub preview_content: Option<String>,

    #[arg(long)]
    pub download_config_url: Option<String>,
}

impl BookFields {
    /// Overwrites the fields that were given on the command line
    pub fn apply(self, book: &mut Book) {
        let set = |target: &mut Option<String>, value: Option<String>| {
            if let Some(value) = value {
                *target = Some(value).filter(|v| !v.trim().is_empty());
            }
        };

        if let Some(title) = self.title {
            book.title = title;
        }
        if let Some(author) = self.author {
            book.author = author;
        }
        if let Some(cover_image) = self.cover_image {
            book.cover_image = cover_image;
        }
        if let Some(description) = self.description {
            book.description = description;
        }

        set(&mut book.preview_image, self.preview_image);
        set(&mut book.isbn, self.isbn);
        set(&mut book.published_date, self.published_date);
        set(&mut book.language, self.language);
        set(&mut book.publisher, self.publisher);
        set(&mut book.preview_content, self.preview_content);
        set(&mut book.download_config_url, self.download_config_url);

        if let Some(genre) = self.genre {
            book.genre = Some(OneOrMany::from_csv(&genre)).filter(|g| !g.is_empty());
        }
        if let Some(tags) = self.tags {
            book.tags = Some(OneOrMany::from_csv(&tags)).filter(|t| !t.is_empty());
        }
        if self.rating.is_some() {
            book.rating = self.rating;
        }
        if self.pages.is_some() {
            book.pages = self.pages;
        }
    }
}

fn parse_link(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, url)) if !name.trim().is_empty() && !url.trim().is_empty() => {
            Ok((name.trim().to_string(), url.trim().to_string()))
        }
        _ => Err(format!("expected NAME=URL, got '{}'", s)),
    }
}

/// Manual links are numbered in the order they were given
fn manual_links(links: Vec<(String, String)>) -> Vec<DownloadLink> {
    links
        .into_iter()
        .enumerate()
        .map(|(i, (name, url))| DownloadLink::new(name, url, i as u32))
        .collect()
}

pub fn run(cmd: BookCommands, output: &Output, token: Option<&str>) -> Result<()> {
    match cmd {
        BookCommands::Add {
            fields,
            links,
            drive_link,
            platform,
            publish,
        } => add_book(output, token, fields, links, drive_link.zip(platform), &publish),
        BookCommands::List => list_books(output),
        BookCommands::Show { filename } => show_book(output, &filename),
        BookCommands::Edit {
            filename,
            fields,
            links,
            publish,
        } => edit_book(output, token, &filename, fields, links, &publish),
        BookCommands::Delete { filename, publish } => {
            delete_book(output, token, &filename, &publish)
        }
        BookCommands::Stats => stats(output),
        BookCommands::Convert {
            platform,
            all_links,
            publish,
        } => convert(output, token, platform, !all_links, &publish),
    }
}

fn add_book(
    output: &Output,
    token: Option<&str>,
    fields: BookFields,
    links: Vec<(String, String)>,
    drive: Option<(String, u32)>,
    publish: &PublishArgs,
) -> Result<()> {
    let site = Site::open_current()?;
    let mut store = site.book_store();

    let mut book = Book::default();
    fields.apply(&mut book);
    book.validate()?;

    match drive {
        Some((drive_link, platform_id)) => {
            let registry = site.platform_registry();
            let platform = registry.require_active(platform_id)?;

            let outcome = site.shortener().shorten(&drive_link, platform);
            if let Some(error) = outcome.error() {
                output.warn(&format!(
                    "Could not shorten with {} ({}); keeping the original link",
                    platform.name, error
                ));
            }
            book.push_link(DownloadLink::for_platform(platform, outcome.into_url()));
        }
        None if links.is_empty() => {
            bail!("At least one download link is required (--link or --drive-link)")
        }
        None => book.download_links = manual_links(links),
    }

    let title = book.title.clone();
    let filename = store.create(book)?;
    let path = store.dir().join(&filename);

    if output.is_json() {
        output.data(&serde_json::json!({
            "filename": filename,
            "title": title,
            "path": path,
        }));
    } else {
        output.success(&format!("Created book: {} ({})", filename, title));
    }

    git_cmd::publish_file(
        &site,
        output,
        token,
        publish,
        &path,
        &format!("Add new book: {}", title),
    )
}

fn list_books(output: &Output) -> Result<()> {
    let site = Site::open_current()?;
    let store = site.book_store();
    let books = store.list();

    if output.is_json() {
        let items: Vec<_> = books
            .iter()
            .map(|book| {
                serde_json::json!({
                    "filename": book.filename,
                    "title": book.title,
                    "author": book.author,
                    "links": book.download_links.len(),
                })
            })
            .collect();
        output.data(&items);
    } else if books.is_empty() {
        println!("No books found.");
    } else {
        println!("{:<32} {:<30} AUTHOR", "FILENAME", "TITLE");
        println!("{}", "-".repeat(80));
        for book in books {
            println!(
                "{:<32} {:<30} {}",
                book.filename.as_deref().unwrap_or_default(),
                book.title,
                book.author
            );
        }
    }

    Ok(())
}

fn show_book(output: &Output, filename: &str) -> Result<()> {
    let site = Site::open_current()?;
    let store = site.book_store();
    let book = store
        .get(filename)
        .ok_or_else(|| anyhow::anyhow!("Book not found: {}", filename))?;

    if output.is_json() {
        let mut value = serde_json::to_value(book).context("Failed to serialize book")?;
        if let Some(obj) = value.as_object_mut() {
            obj.insert("filename".to_string(), filename.into());
        }
        output.data(&value);
        return Ok(());
    }

    println!("Book: {}", filename);
    println!("Title: {}", book.title);
    println!("Author: {}", book.author);
    println!("Cover: {}", book.cover_image);

    let optional = [
        ("ISBN", book.isbn.as_deref()),
        ("Published", book.published_date.as_deref()),
        ("Language", book.language.as_deref()),
        ("Publisher", book.publisher.as_deref()),
    ];
    for (label, value) in optional {
        if let Some(value) = value {
            println!("{}: {}", label, value);
        }
    }

    let genres: Vec<&str> = book.genres().collect();
    if !genres.is_empty() {
        println!("Genre: {}", genres.join(", "));
    }
    if let Some(rating) = book.rating {
        println!("Rating: {:.1}", rating);
    }
    if let Some(pages) = book.pages {
        println!("Pages: {}", pages);
    }

    println!("\nDescription:");
    println!("{}", book.description);

    if !book.download_links.is_empty() {
        println!("\nDownload links ({}):", book.download_links.len());
        for link in &book.download_links {
            println!("  [{}] {}: {}", link.index, link.platform, link.url);
        }
    }

    Ok(())
}

fn edit_book(
    output: &Output,
    token: Option<&str>,
    filename: &str,
    fields: BookFields,
    links: Vec<(String, String)>,
    publish: &PublishArgs,
) -> Result<()> {
    let site = Site::open_current()?;
    let mut store = site.book_store();

    let mut book = store
        .get(filename)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("Book not found: {}", filename))?;
    fields.apply(&mut book);
    if !links.is_empty() {
        book.download_links = manual_links(links);
    }

    let title = book.title.clone();
    if !store.update(filename, book)? {
        bail!("Failed to update book: {}", filename);
    }
    output.success(&format!("Updated book: {}", filename));

    git_cmd::publish_file(
        &site,
        output,
        token,
        publish,
        &store.dir().join(filename),
        &format!("Update book: {}", title),
    )
}

fn delete_book(
    output: &Output,
    token: Option<&str>,
    filename: &str,
    publish: &PublishArgs,
) -> Result<()> {
    let site = Site::open_current()?;
    let mut store = site.book_store();

    if !store.delete(filename)? {
        bail!("Failed to delete book: {}", filename);
    }
    output.success(&format!("Deleted book: {}", filename));

    git_cmd::publish_file(
        &site,
        output,
        token,
        publish,
        &store.dir().join(filename),
        &format!("Delete book: {}", filename),
    )
}

fn stats(output: &Output) -> Result<()> {
    let site = Site::open_current()?;
    let stats = site.book_store().statistics();

    if output.is_json() {
        output.data(&stats);
        return Ok(());
    }

    println!("Books: {}", stats.total_books);
    println!("Authors: {}", stats.authors.len());
    println!("Genres: {}", stats.genres.len());
    println!("Languages: {}", stats.languages.join(", "));
    println!("Publishers: {}", stats.publishers.len());
    println!("Average rating: {:.2}", stats.avg_rating);
    println!("Average pages: {}", stats.avg_pages);

    Ok(())
}

fn convert(
    output: &Output,
    token: Option<&str>,
    platform_id: u32,
    only_google_drive: bool,
    publish: &PublishArgs,
) -> Result<()> {
    let site = Site::open_current()?;
    let registry = site.platform_registry();
    let platform = registry.require_active(platform_id)?;
    let mut store = site.book_store();

    let shortener = site.shortener();
    let report = store.batch_convert(&shortener, platform, only_google_drive);

    if output.is_json() {
        output.data(&report);
    } else {
        output.success(&format!(
            "Converted {} book(s) to {}, skipped {}",
            report.converted, platform.name, report.skipped
        ));
        for error in &report.errors {
            output.warn(error);
        }
    }

    if report.converted == 0 {
        return Ok(());
    }

    git_cmd::publish_all(
        &site,
        output,
        token,
        publish,
        &format!("Convert {} books to {}", report.converted, platform.name),
    )
}
