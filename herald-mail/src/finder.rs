//! Convention-based template lookup.
//!
//! Templates follow the `<template_name>.<format>.<engine>` naming
//! convention and may live anywhere below the root:
//!
//! ```text
//! templates/
//!   welcome_mailer.html.hbs      -> welcome_mailer, html
//!   welcome_mailer.txt.hbs       -> welcome_mailer, txt
//!   users/signup.html.tera       -> users/signup, html
//!   layouts/mailer.html.hbs      -> layout "mailer", html
//!   welcome_mailer.hbs           (ignored: no format)
//!   welcome_mailer.html          (ignored: no engine)
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::{EngineRegistry, Format, Result, Template};

/// Directory (below the root) holding layouts.
pub const LAYOUTS_DIR: &str = "layouts";

const FORMAT_SEPARATOR: char = '.';

/// Locates templates under a root directory.
#[derive(Debug, Clone)]
pub struct TemplatesFinder {
    root: PathBuf,
    engines: EngineRegistry,
}

impl TemplatesFinder {
    /// Create a finder.
    ///
    /// The root is canonicalized, so a missing or unreadable root fails here.
    pub fn new(root: impl AsRef<Path>, engines: EngineRegistry) -> Result<Self> {
        let root = root.as_ref().canonicalize()?;
        Ok(Self { root, engines })
    }

    /// The canonical root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The engines used to recognize template extensions.
    pub fn engines(&self) -> &EngineRegistry {
        &self.engines
    }

    /// Find the templates for a template name, one per format.
    ///
    /// When several engines provide the same format, the first path in
    /// lexicographic order wins. Nothing found is an empty map, not an error.
    /// Layouts under `<root>/layouts` never take part.
    pub fn find(&self, template_name: &str) -> Result<BTreeMap<Format, Template>> {
        self.scan(&self.root, template_name, true)
    }

    /// Find the layouts for a layout name under `<root>/layouts`.
    pub fn find_layout(&self, layout_name: &str) -> Result<BTreeMap<Format, Template>> {
        let dir = self.root.join(LAYOUTS_DIR);
        if !dir.is_dir() {
            return Ok(BTreeMap::new());
        }
        self.scan(&dir, layout_name, false)
    }

    fn scan(
        &self,
        dir: &Path,
        name: &str,
        skip_layouts: bool,
    ) -> Result<BTreeMap<Format, Template>> {
        let mut candidates = Vec::new();

        let walker = WalkDir::new(dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !(skip_layouts && is_layouts_dir(entry)));

        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let Some((format, extension)) = match_convention(dir, entry.path(), name) else {
                continue;
            };

            if !self.engines.supports(&extension) {
                debug!(
                    path = %entry.path().display(),
                    extension = %extension,
                    "Skipping template without a registered engine"
                );
                continue;
            }

            candidates.push((entry.into_path(), format, extension));
        }

        candidates.sort_by(|a, b| a.0.cmp(&b.0));

        let mut found: BTreeMap<Format, Template> = BTreeMap::new();
        for (path, format, extension) in candidates {
            if let Some(existing) = found.get(&format) {
                debug!(
                    template = name,
                    format = %format,
                    used = %existing.path().display(),
                    shadowed = %path.display(),
                    "Several engines provide the same format"
                );
                continue;
            }

            let Some(engine) = self.engines.get(&extension) else {
                continue;
            };
            let template = Template::load(path, format.clone(), extension, engine)?;
            found.insert(format, template);
        }

        Ok(found)
    }
}

fn is_layouts_dir(entry: &DirEntry) -> bool {
    entry.depth() == 1 && entry.file_type().is_dir() && entry.file_name() == LAYOUTS_DIR
}

/// Match `<any dirs>/<name>.<format>.<engine>` relative to `dir`.
///
/// The format is the second-to-last dot separated segment of the file name.
fn match_convention(dir: &Path, path: &Path, name: &str) -> Option<(Format, String)> {
    let relative = path.strip_prefix(dir).ok()?;
    let components = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;

    let depth = name.split('/').count();
    if components.len() < depth {
        return None;
    }

    let tail = components[components.len() - depth..].join("/");
    let rest = tail.strip_prefix(name)?.strip_prefix(FORMAT_SEPARATOR)?;

    let (remainder, extension) = rest.rsplit_once(FORMAT_SEPARATOR)?;
    let format = remainder.rsplit(FORMAT_SEPARATOR).next()?;

    if format.is_empty() || extension.is_empty() {
        return None;
    }

    Some((Format::from(format), extension.to_string()))
}
