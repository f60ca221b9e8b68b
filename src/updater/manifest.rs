//! Manifest header sniffing.
//!
//! A directory is a plugin root when it directly contains a PHP file with a
//! `Plugin Name:` header, and a theme root when it contains `style.css` with a
//! `Theme Name:` header. Headers are matched the way WordPress scans them:
//! case-insensitive, at the start of a line, after any comment decoration
//! (`/*`, `*`, `#`, `@`, whitespace), within the first 8 KiB of the file.
//!
//! The check sits behind [`ArtifactValidator`] so a stronger validator can
//! replace [`HeaderValidator`] without touching the installer.

use crate::core::{ItemKind, TrackedItem};
use regex::Regex;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Only this many leading bytes of a file are scanned for headers.
const HEADER_SCAN_BYTES: u64 = 8 * 1024;

static PLUGIN_NAME: LazyLock<Regex> = LazyLock::new(|| header_regex("Plugin Name"));
static THEME_NAME: LazyLock<Regex> = LazyLock::new(|| header_regex("Theme Name"));
static VERSION: LazyLock<Regex> = LazyLock::new(|| header_regex("Version"));

fn header_regex(field: &str) -> Regex {
    let field = field.replace(' ', "[ \\t]+");
    Regex::new(&format!(r"(?im)^[ \t/*#@]*{field}:(.*)$")).expect("header regex is valid")
}

fn name_regex(kind: ItemKind) -> &'static Regex {
    match kind {
        ItemKind::Plugin => &PLUGIN_NAME,
        ItemKind::Theme => &THEME_NAME,
    }
}

/// Value of a header field in `contents`, with comment terminators removed.
///
/// Returns `None` when the field is missing or has an empty value.
#[must_use]
pub fn header_value(contents: &str, regex: &Regex) -> Option<String> {
    let raw = regex.captures(contents)?.get(1)?.as_str();
    let mut value = raw.trim();
    for terminator in ["*/", "?>"] {
        if let Some(stripped) = value.strip_suffix(terminator) {
            value = stripped.trim_end();
        }
    }
    (!value.is_empty()).then(|| value.to_string())
}

/// Leading bytes of `path` as lossy UTF-8. Unreadable files yield `None`.
fn read_head(path: &Path) -> Option<String> {
    let file = fs::File::open(path).ok()?;
    let mut buf = Vec::new();
    file.take(HEADER_SCAN_BYTES).read_to_end(&mut buf).ok()?;
    Some(String::from_utf8_lossy(&buf).into_owned())
}

/// Name header of `kind` in the file at `path`.
#[must_use]
pub fn read_name(path: &Path, kind: ItemKind) -> Option<String> {
    header_value(&read_head(path)?, name_regex(kind))
}

/// `Version:` header of the file at `path`.
#[must_use]
pub fn read_version(path: &Path) -> Option<String> {
    header_value(&read_head(path)?, &VERSION)
}

/// Decides whether a directory holds a valid artifact root.
pub trait ArtifactValidator: Send + Sync {
    /// Manifest file directly inside `dir`, if `dir` is a valid root of `kind`.
    fn locate_manifest(&self, dir: &Path, kind: ItemKind, slug: &str) -> Option<PathBuf>;
}

/// Header-based validation compatible with WordPress' own detection.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderValidator;

impl HeaderValidator {
    fn plugin_main_file(dir: &Path, slug: &str) -> Option<PathBuf> {
        let mut preferred = Vec::with_capacity(2);
        if !slug.is_empty() {
            preferred.push(dir.join(format!("{slug}.php")));
        }
        preferred.push(dir.join("index.php"));

        for candidate in &preferred {
            if candidate.is_file() && read_name(candidate, ItemKind::Plugin).is_some() {
                return Some(candidate.clone());
            }
        }

        let mut php_files: Vec<PathBuf> = fs::read_dir(dir)
            .ok()?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("php"))
                    && !preferred.contains(path)
            })
            .collect();
        php_files.sort();

        php_files
            .into_iter()
            .find(|path| read_name(path, ItemKind::Plugin).is_some())
    }

    fn theme_stylesheet(dir: &Path) -> Option<PathBuf> {
        let stylesheet = dir.join("style.css");
        (stylesheet.is_file() && read_name(&stylesheet, ItemKind::Theme).is_some())
            .then_some(stylesheet)
    }
}

impl ArtifactValidator for HeaderValidator {
    fn locate_manifest(&self, dir: &Path, kind: ItemKind, slug: &str) -> Option<PathBuf> {
        if !dir.is_dir() {
            return None;
        }
        match kind {
            ItemKind::Plugin => Self::plugin_main_file(dir, slug),
            ItemKind::Theme => Self::theme_stylesheet(dir),
        }
    }
}

/// Filesystem-observed state of an item's install path.
///
/// Never cached: every call to [`InstalledArtifact::inspect`] reads the disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledArtifact {
    /// Plugin main file or theme `style.css`.
    pub manifest: PathBuf,
    /// Value of the `Plugin Name:` / `Theme Name:` header.
    pub name: String,
    /// Value of the `Version:` header, when present.
    pub version: Option<String>,
}

impl InstalledArtifact {
    /// Inspect the item's install path. `None` when nothing valid is installed.
    pub fn inspect(item: &TrackedItem, validator: &dyn ArtifactValidator) -> Option<Self> {
        let manifest = validator.locate_manifest(&item.install_path, item.kind, &item.slug)?;
        let contents = read_head(&manifest)?;
        Some(Self {
            name: header_value(&contents, name_regex(item.kind)).unwrap_or_default(),
            version: header_value(&contents, &VERSION),
            manifest,
        })
    }
}
