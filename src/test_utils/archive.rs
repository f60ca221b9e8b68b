//! In-memory zip archives shaped like GitHub zipballs.

use std::io::{Cursor, Write};
use std::path::Path;
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

/// Builds a zip archive entry by entry.
#[derive(Debug, Default, Clone)]
pub struct ZipBuilder {
    entries: Vec<(String, Option<Vec<u8>>)>,
}

impl ZipBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file entry.
    #[must_use]
    pub fn file(mut self, name: &str, contents: impl AsRef<[u8]>) -> Self {
        self.entries.push((name.to_string(), Some(contents.as_ref().to_vec())));
        self
    }

    /// Add a directory entry; `name` should end with `/`.
    #[must_use]
    pub fn dir(mut self, name: &str) -> Self {
        self.entries.push((name.to_string(), None));
        self
    }

    /// Serialize to zip bytes.
    ///
    /// # Panics
    ///
    /// Panics if the zip writer fails.
    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for (name, contents) in &self.entries {
            match contents {
                Some(bytes) => {
                    zip.start_file(name.as_str(), options).expect("start zip entry");
                    zip.write_all(bytes).expect("write zip entry");
                }
                None => {
                    zip.add_directory(name.as_str(), options).expect("add zip directory");
                }
            }
        }

        zip.finish().expect("finish zip").into_inner()
    }

    /// Write the archive to `path`.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    pub fn write_to(&self, path: &Path) {
        std::fs::write(path, self.build()).expect("write zip file");
    }
}

/// A plugin zipball: `{wrapper}/{slug}.php` with name and version headers.
#[must_use]
pub fn plugin_archive(wrapper: &str, slug: &str, version: &str) -> Vec<u8> {
    ZipBuilder::new()
        .dir(&format!("{wrapper}/"))
        .file(
            &format!("{wrapper}/{slug}.php"),
            format!("<?php\n/**\n * Plugin Name: Widget\n * Version: {version}\n */\n"),
        )
        .file(&format!("{wrapper}/includes/core.php"), "<?php\n// core\n")
        .file(&format!("{wrapper}/readme.txt"), format!("=== Widget ===\nStable tag: {version}\n"))
        .build()
}

/// A theme zipball: `{wrapper}/style.css` with name and version headers.
#[must_use]
pub fn theme_archive(wrapper: &str, version: &str) -> Vec<u8> {
    ZipBuilder::new()
        .dir(&format!("{wrapper}/"))
        .file(
            &format!("{wrapper}/style.css"),
            format!("/*\nTheme Name: Flat\nVersion: {version}\n*/\nbody {{ margin: 0 }}\n"),
        )
        .file(&format!("{wrapper}/index.php"), "<?php get_header();")
        .build()
}
