//! Build context archiving.
//!
//! The daemon's build endpoint takes the entire build context as a tar
//! stream in the request body. This module walks a source directory,
//! applies glob exclusions from the context's ignore file, and writes the
//! archive to a seekable sink, optionally injecting a literal `Dockerfile`
//! entry from a string override.
//!
//! Archiving is fully synchronous: the whole tree is traversed and written
//! before any network I/O starts.

use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;

use glob::Pattern;
use walkdir::WalkDir;

/// Name of the exclusion file read from the build context root.
pub const EXCLUDE_FILE: &str = ".dockerignore";

/// Read exclusion patterns from the ignore file at the context root.
///
/// One glob pattern per non-blank line. Returns an empty set when the
/// file does not exist.
pub fn read_exclude_patterns(dir: &Path) -> io::Result<Vec<Pattern>> {
    let path = dir.join(EXCLUDE_FILE);
    if !path.exists() {
        return Ok(Vec::new());
    }

    let contents = std::fs::read_to_string(&path)?;
    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            Pattern::new(line).map_err(|err| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("invalid exclude pattern {line:?}: {err}"),
                )
            })
        })
        .collect()
}

/// Archive a build context into `sink` as a tar stream.
///
/// Every regular file under `source_dir` is added under its path relative
/// to the root (the root itself maps to the empty prefix). A file is
/// skipped when its relative path matches any pattern in `exclude` under
/// shell-glob semantics; patterns match the full relative path, not just
/// the basename. With no `source_dir`, the archive holds only the
/// optional override entry.
///
/// When `dockerfile` is supplied, the archive gets exactly one entry
/// literally named `Dockerfile` holding the override's UTF-8 bytes; a
/// root-level on-disk `Dockerfile` is suppressed so the entry is unique.
///
/// On return the sink is rewound to the start, ready to be read back as
/// the outgoing request body.
pub fn archive_build_context<W: Write + Seek>(
    sink: &mut W,
    source_dir: Option<&Path>,
    exclude: &[Pattern],
    dockerfile: Option<&str>,
) -> io::Result<()> {
    let mut builder = tar::Builder::new(sink);

    if let Some(root) = source_dir {
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(root)
                .map_err(io::Error::other)?
                .to_path_buf();
            let relative_str = relative.to_string_lossy();

            if dockerfile.is_some() && relative_str == "Dockerfile" {
                continue;
            }
            if exclude.iter().any(|pattern| pattern.matches(&relative_str)) {
                continue;
            }

            builder.append_path_with_name(entry.path(), &relative)?;
        }
    }

    if let Some(contents) = dockerfile {
        let bytes = contents.as_bytes();
        let mut header = tar::Header::new_gnu();
        header.set_path("Dockerfile")?;
        header.set_size(bytes.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append(&header, bytes)?;
    }

    let sink = builder.into_inner()?;
    sink.seek(SeekFrom::Start(0))?;
    Ok(())
}
