//! Tar archive construction for build contexts.

use std::collections::BTreeSet;
use std::io;

use camino::Utf8Path;
use cap_std::fs::Metadata;
use cap_std::fs_utf8::Dir;
use tar::{Builder, EntryType, Header};
use tracing::debug;

use super::ignore::PatternMatcher;
use crate::error::BuildContextError;

const DEFAULT_DIRECTORY_MODE: u32 = 0o755;
const DEFAULT_FILE_MODE: u32 = 0o644;
const DEFAULT_LINK_MODE: u32 = 0o777;

/// Archive bytes plus the number of entries written.
#[derive(Debug)]
pub(super) struct ContextArchive {
    pub(super) bytes: Vec<u8>,
    pub(super) entry_count: usize,
}

struct ContextWalker<'a> {
    builder: Builder<Vec<u8>>,
    matcher: &'a PatternMatcher,
    forced_includes: &'a [String],
    written: BTreeSet<String>,
}

/// Write every non-ignored entry below `root` into a tar stream.
///
/// Symbolic links are stored as link entries and never followed. Paths
/// listed in `forced_includes` are archived even when the patterns exclude
/// them.
pub(super) fn build_context_archive(
    root: &Dir,
    matcher: &PatternMatcher,
    forced_includes: &[String],
) -> Result<ContextArchive, BuildContextError> {
    let mut walker = ContextWalker {
        builder: Builder::new(vec![]),
        matcher,
        forced_includes,
        written: BTreeSet::new(),
    };

    walker.append_directory_contents(root, Utf8Path::new(""))?;
    walker.append_unreached_includes(root)?;

    let entry_count = walker.written.len();
    walker
        .builder
        .finish()
        .map_err(|error| inaccessible(".", &error))?;
    let bytes = walker
        .builder
        .into_inner()
        .map_err(|error| inaccessible(".", &error))?;

    Ok(ContextArchive { bytes, entry_count })
}

fn inaccessible(path: &str, error: &io::Error) -> BuildContextError {
    BuildContextError::ContextInaccessible {
        path: String::from(path),
        message: error.to_string(),
    }
}

impl ContextWalker<'_> {
    fn is_forced(&self, relative_path: &str) -> bool {
        self.forced_includes.iter().any(|forced| forced == relative_path)
    }

    fn append_directory_contents(
        &mut self,
        current_dir: &Dir,
        current_relative_path: &Utf8Path,
    ) -> Result<(), BuildContextError> {
        let entries = sorted_entries(current_dir)
            .map_err(|error| inaccessible(display_path(current_relative_path), &error))?;

        for entry in entries {
            let entry_relative_path = current_relative_path.join(&entry.file_name);
            let archive_path = normalize_archive_path(&entry_relative_path);
            let excluded = !self.is_forced(&archive_path) && self.matcher.matches(&archive_path);

            if !entry.utf8_name {
                if excluded {
                    debug!(path = %archive_path, "skipping ignored entry with non-UTF-8 name");
                    continue;
                }
                return Err(BuildContextError::ContextInaccessible {
                    path: archive_path,
                    message: String::from("file name is not valid UTF-8"),
                });
            }

            match entry.entry_kind {
                EntryKind::Directory if excluded => {
                    if !self.matcher.exclusion_reaches_into(&archive_path) {
                        debug!(path = %archive_path, "skipping ignored directory");
                        continue;
                    }
                    let child_dir = current_dir
                        .open_dir(&entry.file_name)
                        .map_err(|error| inaccessible(&archive_path, &error))?;
                    self.append_directory_contents(&child_dir, &entry_relative_path)?;
                }
                EntryKind::Directory => {
                    let metadata = current_dir
                        .metadata(&entry.file_name)
                        .map_err(|error| inaccessible(&archive_path, &error))?;
                    self.append_directory_header(&archive_path, &metadata)?;
                    let child_dir = current_dir
                        .open_dir(&entry.file_name)
                        .map_err(|error| inaccessible(&archive_path, &error))?;
                    self.append_directory_contents(&child_dir, &entry_relative_path)?;
                }
                EntryKind::File | EntryKind::Symlink if excluded => {
                    debug!(path = %archive_path, "skipping ignored entry");
                }
                EntryKind::File => {
                    self.append_file(current_dir, &entry.file_name, &archive_path)?;
                }
                EntryKind::Symlink => {
                    self.append_symlink(current_dir, &entry.file_name, &archive_path)?;
                }
                EntryKind::Other => {
                    debug!(path = %archive_path, "skipping special context entry");
                }
            }
        }

        Ok(())
    }

    fn append_unreached_includes(&mut self, root: &Dir) -> Result<(), BuildContextError> {
        for forced in self.forced_includes {
            if self.written.contains(forced) {
                continue;
            }

            let metadata = match root.symlink_metadata(forced) {
                Ok(metadata) => metadata,
                Err(error) if error.kind() == io::ErrorKind::NotFound => continue,
                Err(error) => return Err(inaccessible(forced, &error)),
            };
            if metadata.is_file() {
                self.append_file(root, forced, forced)?;
            } else if metadata.file_type().is_symlink() {
                self.append_symlink(root, forced, forced)?;
            }
        }

        Ok(())
    }

    fn append_directory_header(
        &mut self,
        archive_path: &str,
        metadata: &Metadata,
    ) -> Result<(), BuildContextError> {
        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Directory);
        header.set_size(0);
        header.set_mode(metadata_mode(metadata, DEFAULT_DIRECTORY_MODE));
        header.set_cksum();

        self.builder
            .append_data(&mut header, format!("{archive_path}/"), io::empty())
            .map_err(|error| inaccessible(archive_path, &error))?;
        self.written.insert(String::from(archive_path));
        Ok(())
    }

    fn append_file(
        &mut self,
        parent_dir: &Dir,
        file_name: &str,
        archive_path: &str,
    ) -> Result<(), BuildContextError> {
        let metadata = parent_dir
            .metadata(file_name)
            .map_err(|error| inaccessible(archive_path, &error))?;
        let mut file = parent_dir
            .open(file_name)
            .map_err(|error| inaccessible(archive_path, &error))?;

        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Regular);
        header.set_size(metadata.len());
        header.set_mode(metadata_mode(&metadata, DEFAULT_FILE_MODE));
        header.set_cksum();

        self.builder
            .append_data(&mut header, archive_path, &mut file)
            .map_err(|error| inaccessible(archive_path, &error))?;
        self.written.insert(String::from(archive_path));
        Ok(())
    }

    fn append_symlink(
        &mut self,
        parent_dir: &Dir,
        link_name: &str,
        archive_path: &str,
    ) -> Result<(), BuildContextError> {
        let metadata = parent_dir
            .symlink_metadata(link_name)
            .map_err(|error| inaccessible(archive_path, &error))?;
        let target = parent_dir
            .read_link_contents(link_name)
            .map_err(|error| inaccessible(archive_path, &error))?;

        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Symlink);
        header.set_size(0);
        header.set_mode(metadata_mode(&metadata, DEFAULT_LINK_MODE));

        self.builder
            .append_link(&mut header, archive_path, target.as_std_path())
            .map_err(|error| inaccessible(archive_path, &error))?;
        self.written.insert(String::from(archive_path));
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Directory,
    File,
    Symlink,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SortedEntry {
    /// Entry name, lossily converted when `utf8_name` is false.
    file_name: String,
    utf8_name: bool,
    entry_kind: EntryKind,
}

/// List `directory` sorted by name.
///
/// Names are read through the underlying `cap_std::fs::Dir` so a non-UTF-8
/// name can still be checked against the ignore rules before it is
/// rejected.
fn sorted_entries(directory: &Dir) -> io::Result<Vec<SortedEntry>> {
    let mut entries = vec![];

    for entry_result in directory.as_cap_std().entries()? {
        let entry = entry_result?;
        let file_type = entry.file_type()?;
        let (file_name, utf8_name) = match entry.file_name().into_string() {
            Ok(name) => (name, true),
            Err(raw) => (raw.to_string_lossy().into_owned(), false),
        };

        let entry_kind = if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else if file_type.is_symlink() {
            EntryKind::Symlink
        } else {
            EntryKind::Other
        };

        entries.push(SortedEntry {
            file_name,
            utf8_name,
            entry_kind,
        });
    }

    entries.sort_unstable_by(|left, right| left.file_name.cmp(&right.file_name));
    Ok(entries)
}

fn display_path(path: &Utf8Path) -> &str {
    if path.as_str().is_empty() {
        "."
    } else {
        path.as_str()
    }
}

fn normalize_archive_path(path: &Utf8Path) -> String {
    path.as_str().replace('\\', "/")
}

#[cfg(unix)]
fn metadata_mode(metadata: &Metadata, _fallback: u32) -> u32 {
    use cap_std::fs::PermissionsExt;

    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn metadata_mode(_metadata: &Metadata, fallback: u32) -> u32 {
    fallback
}
