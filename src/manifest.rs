//! Archive manifest (§4.C).
//!
//! Walks the central directory of the ZIP appended to the launcher binary,
//! classifies each entry, discovers the bundle name, and produces the
//! ordered [`Manifest`] that the extractor (F) and namespace overlayer (G)
//! consume read-only.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::ArchiveError;

/// Reserved top-level prefixes, checked in order; first match wins.
const RESERVED_PREFIXES: &[&str] = &["puisne/", ".args", ".cosmo", "usr/share/zoneinfo/"];

/// One file or directory inside the bundle, relative to `<name>.app/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// The original member name inside the archive (`<name>.app/` prefix
    /// included), used to re-read the entry's bytes during extraction.
    pub archive_name: String,
    /// Path relative to the `<name>.app/` root (prefix stripped).
    pub relative_path: String,
    /// Unix permission bits recorded in the archive.
    pub mode: u32,
    /// Modification time, in seconds since the epoch, interpreted as local
    /// time using the current local UTC offset (§4.C, §9 open question:
    /// compared against destination *status-change* time, not mtime).
    pub mtime_seconds: i64,
    /// Whether this entry is a file or a directory.
    pub kind: EntryKind,
}

/// Discriminates [`ManifestEntry::kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A regular file with streamable contents.
    File,
    /// A directory to be created (possibly empty).
    Directory,
}

/// The enumerated contents of a bundle, plus its discovered name.
#[derive(Debug, Clone)]
pub struct Manifest {
    /// The bundle name: the `<name>.app/` directory with `.app` stripped.
    pub name: String,
    /// Entries in central-directory order, with reserved paths discarded.
    pub entries: Vec<ManifestEntry>,
}

/// The result of classifying an archive: either a real bundle, or an
/// archive that contains no `<name>.app/` directory at all (§4.C: "the
/// launcher is an *empty bundle*").
pub enum ArchiveOutcome {
    /// A valid, non-empty bundle.
    Bundle(Manifest),
    /// No `<name>.app/` directory was found; not an error.
    Empty,
}

/// A handle onto the ZIP archive appended to the running launcher binary.
pub struct Archive {
    zip: zip::ZipArchive<File>,
}

impl Archive {
    /// Opens the archive embedded in the file at `path` (the launcher's own
    /// binary). `zip::ZipArchive` locates the end-of-central-directory
    /// record from the tail of the file, so the leading stub bytes are
    /// transparently skipped.
    pub fn open(path: &Path) -> Result<Self, ArchiveError> {
        let file = File::open(path).map_err(|e| {
            ArchiveError::Read(zip::result::ZipError::Io(e))
        })?;
        let zip = zip::ZipArchive::new(file)?;
        Ok(Archive { zip })
    }

    /// Reads the full contents of a single top-level member by exact name,
    /// if present.
    pub fn read_member(&mut self, name: &str) -> Result<Option<Vec<u8>>, ArchiveError> {
        match self.zip.by_name(name) {
            Ok(mut entry) => {
                let mut buf = Vec::with_capacity(entry.size() as usize);
                entry.read_to_end(&mut buf).map_err(|e| {
                    ArchiveError::Read(zip::result::ZipError::Io(e))
                })?;
                Ok(Some(buf))
            }
            Err(zip::result::ZipError::FileNotFound) => Ok(None),
            Err(e) => Err(ArchiveError::Read(e)),
        }
    }

    /// Opens a single member for streamed reading, by its full archive
    /// name. Used by the extractor (F) so whole files are never
    /// materialized in memory — callers copy through their own fixed-size
    /// buffer rather than relying on this handle's internal buffering.
    pub fn open_member(&mut self, name: &str) -> Result<impl Read + '_, ArchiveError> {
        Ok(self.zip.by_name(name)?)
    }

    /// Walks every central-directory record, classifies it, and builds the
    /// manifest (§4.C). Classification rules are applied in order; first
    /// match wins; unmatched entries fall through to bundle processing.
    pub fn build_manifest(&mut self) -> Result<ArchiveOutcome, ArchiveError> {
        let local_offset = time::UtcOffset::current_local_offset()
            .unwrap_or(time::UtcOffset::UTC);

        let mut bundle_name: Option<String> = None;
        let mut entries = Vec::new();

        for i in 0..self.zip.len() {
            let entry = self.zip.by_index(i)?;
            let name = entry.name().to_string();

            if RESERVED_PREFIXES.iter().any(|p| name.starts_with(p)) {
                continue;
            }

            let Some(slash) = name.find('/') else {
                return Err(ArchiveError::TopLevelFile(name));
            };
            let (head, tail) = name.split_at(slash);
            let tail = &tail[1..]; // drop the '/'

            if head.is_empty() {
                return Err(ArchiveError::TopLevelFile(name));
            }
            let Some(candidate) = head.strip_suffix(".app") else {
                return Err(ArchiveError::NotAnAppDirectory(head.to_string()));
            };
            if candidate.is_empty() {
                return Err(ArchiveError::EmptyAppName);
            }
            match &bundle_name {
                None => bundle_name = Some(candidate.to_string()),
                Some(existing) if existing == candidate => {}
                Some(existing) => {
                    return Err(ArchiveError::MultipleAppNames(
                        existing.clone(),
                        candidate.to_string(),
                    ));
                }
            }

            // `tail` is empty for the bundle root's own directory marker
            // (e.g. a literal `foo.app/` entry with nothing after it). That
            // yields an entry with an empty `relative_path`, which the
            // extractor (F) explicitly skips rather than treating as an
            // error — only the no-slash-at-all case above is a genuine
            // top-level bare file.
            let kind = if name.ends_with('/') {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            let mtime_seconds = entry
                .last_modified()
                .map(|dt| dos_datetime_to_unix(&dt, local_offset))
                .unwrap_or(0);

            entries.push(ManifestEntry {
                archive_name: name.clone(),
                relative_path: tail.trim_end_matches('/').to_string(),
                mode: entry.unix_mode().unwrap_or(match kind {
                    EntryKind::Directory => 0o755,
                    EntryKind::File => 0o644,
                }),
                mtime_seconds,
                kind,
            });
        }

        match bundle_name {
            Some(name) => Ok(ArchiveOutcome::Bundle(Manifest { name, entries })),
            None => Ok(ArchiveOutcome::Empty),
        }
    }
}

/// Converts a ZIP (MS-DOS) timestamp, which carries no timezone of its own,
/// into Unix seconds under `offset` — the interpretation §4.C and §6
/// require ("local time using the current local offset from GMT").
fn dos_datetime_to_unix(dt: &zip::DateTime, offset: time::UtcOffset) -> i64 {
    let build = || -> Option<i64> {
        let date = time::Date::from_calendar_date(
            dt.year() as i32,
            time::Month::try_from(dt.month()).ok()?,
            dt.day(),
        )
        .ok()?;
        let time = time::Time::from_hms(dt.hour(), dt.minute(), dt.second()).ok()?;
        let naive = time::PrimitiveDateTime::new(date, time);
        Some(naive.assume_offset(offset).unix_timestamp())
    };
    build().unwrap_or(0)
}
