use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use memmap2::Mmap;
use ttf_parser::Face;

/// Families tried in order when looking for a face to rasterize text with.
/// The layout is measured with Helvetica metrics, so metric-compatible
/// families come first.
const PREFERRED_FAMILIES: &[&str] = &[
    "arial",
    "helvetica",
    "liberation sans",
    "arimo",
    "nimbus sans",
    "dejavu sans",
    "noto sans",
    "freesans",
];

const FONTS_ENV: &str = "BIODATA_FONTS";

#[cfg(target_os = "macos")]
const SYSTEM_FONT_DIRS: &[&str] = &["/Library/Fonts", "/System/Library/Fonts", "/System/Library/Fonts/Supplemental"];
#[cfg(target_os = "macos")]
const HOME_FONT_DIR: Option<&str> = Some("Library/Fonts");

#[cfg(target_os = "linux")]
const SYSTEM_FONT_DIRS: &[&str] = &["/usr/share/fonts", "/usr/local/share/fonts"];
#[cfg(target_os = "linux")]
const HOME_FONT_DIR: Option<&str> = Some(".local/share/fonts");

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
const SYSTEM_FONT_DIRS: &[&str] = &[];
#[cfg(not(any(target_os = "macos", target_os = "linux")))]
const HOME_FONT_DIR: Option<&str> = None;

/// Where the first upright face of a (family, bold) pair lives.
#[derive(Clone, Debug)]
struct FaceLocation {
    path: PathBuf,
    index: u32,
}

pub(crate) struct LoadedFace {
    pub(crate) data: Mmap,
    pub(crate) index: u32,
    pub(crate) family: String,
    /// True when this face was picked as the bold cut; a regular face
    /// standing in for bold has to be emboldened synthetically.
    pub(crate) bold: bool,
}

pub(crate) struct FontSet {
    pub(crate) regular: Option<LoadedFace>,
    pub(crate) bold: Option<LoadedFace>,
}

impl FontSet {
    /// Face for a run, falling back to the regular face for bold text.
    pub(crate) fn face(&self, bold: bool) -> Option<&LoadedFace> {
        match (bold, &self.bold) {
            (true, Some(face)) => Some(face),
            _ => self.regular.as_ref(),
        }
    }
}

static FONTS: OnceLock<FontSet> = OnceLock::new();

/// `BIODATA_FONTS` entries first, then the platform directories.
fn search_path() -> Vec<PathBuf> {
    let sep = if cfg!(windows) { ';' } else { ':' };
    let mut dirs: Vec<PathBuf> = std::env::var(FONTS_ENV)
        .map(|val| {
            val.split(sep)
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(PathBuf::from)
                .collect()
        })
        .unwrap_or_default();

    dirs.extend(SYSTEM_FONT_DIRS.iter().map(PathBuf::from));
    if let (Some(rel), Ok(home)) = (HOME_FONT_DIR, std::env::var("HOME")) {
        dirs.push(Path::new(&home).join(rel));
    }
    if cfg!(windows) {
        let windir = std::env::var("WINDIR").unwrap_or_else(|_| "C:\\Windows".to_string());
        dirs.push(Path::new(&windir).join("Fonts"));
    }
    dirs
}

/// `Some(true)` for collections, `Some(false)` for single-face files.
fn font_kind(path: &Path) -> Option<bool> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "ttc" => Some(true),
        "ttf" | "otf" => Some(false),
        _ => None,
    }
}

fn family_of(face: &Face) -> Option<String> {
    face.names()
        .into_iter()
        .filter(|n| n.name_id == ttf_parser::name_id::FAMILY && n.is_unicode())
        .find_map(|n| n.to_string())
}

fn map_file(path: &Path) -> Option<Mmap> {
    let file = std::fs::File::open(path).ok()?;
    // SAFETY: font files are opened read-only and not modified while mapped.
    unsafe { Mmap::map(&file) }.ok()
}

#[derive(Default)]
struct Scan {
    found: HashMap<(String, bool), FaceLocation>,
    visited: HashSet<PathBuf>,
    files: u32,
}

impl Scan {
    fn walk(&mut self, dir: &Path) {
        if !self.visited.insert(dir.to_path_buf()) {
            return;
        }
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for path in entries.flatten().map(|e| e.path()) {
            if path.is_dir() {
                self.walk(&path);
            } else if let Some(collection) = font_kind(&path) {
                self.index_file(&path, collection);
            }
        }
    }

    /// Record upright faces of preferred families; the first one seen wins.
    fn index_file(&mut self, path: &Path, collection: bool) {
        let Some(data) = map_file(path) else {
            return;
        };
        self.files += 1;
        let faces = if collection {
            ttf_parser::fonts_in_collection(&data).unwrap_or(1)
        } else {
            1
        };
        for index in 0..faces {
            let Ok(face) = Face::parse(&data, index) else {
                continue;
            };
            if face.is_italic() || face.is_oblique() {
                continue;
            }
            let Some(family) = family_of(&face).map(|f| f.to_lowercase()) else {
                continue;
            };
            if PREFERRED_FAMILIES.contains(&family.as_str()) {
                self.found.entry((family, face.is_bold())).or_insert_with(|| FaceLocation {
                    path: path.to_path_buf(),
                    index,
                });
            }
        }
    }

    fn load(&self, bold: bool) -> Option<LoadedFace> {
        PREFERRED_FAMILIES.iter().find_map(|family| {
            let loc = self.found.get(&(family.to_string(), bold))?;
            let data = map_file(&loc.path)?;
            log::debug!("text face bold={bold}: {family} ({})", loc.path.display());
            Some(LoadedFace {
                data,
                index: loc.index,
                family: family.to_string(),
                bold,
            })
        })
    }
}

fn load_font_set() -> FontSet {
    let t0 = std::time::Instant::now();
    let mut scan = Scan::default();
    for dir in search_path() {
        scan.walk(&dir);
    }
    log::info!(
        "Font scan: {:.1}ms, {} files parsed, {} candidate faces",
        t0.elapsed().as_secs_f64() * 1000.0,
        scan.files,
        scan.found.len(),
    );

    let set = FontSet {
        regular: scan.load(false),
        bold: scan.load(true),
    };
    if set.regular.is_none() {
        log::warn!("No usable sans-serif font found (set {FONTS_ENV} to a font directory); documents with text cannot be rasterized");
    }
    set
}

/// Process-wide font set, scanned on first use.
pub(crate) fn font_set() -> &'static FontSet {
    FONTS.get_or_init(load_font_set)
}
