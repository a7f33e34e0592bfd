use std::io::{self, Write};

use crate::core::merge::children_of;
use crate::models::{Entry, EntryKind};

/// Renders the merged entry list as an ASCII tree under `root_name`.
///
/// A pure view over the list: child order is derived on read and nothing is
/// fetched. Only materialized paths appear, so an unexpanded directory
/// renders as a childless node.
pub fn write_tree<W: Write>(writer: &mut W, root_name: &str, entries: &[Entry]) -> io::Result<()> {
    writeln!(writer, "{root_name}")?;
    write_level(writer, entries, "", &[])
}

fn write_level<W: Write>(
    writer: &mut W,
    entries: &[Entry],
    parent: &str,
    ancestor_has_more: &[bool],
) -> io::Result<()> {
    let children = children_of(entries, parent);
    for (index, entry) in children.iter().enumerate() {
        let is_last = index + 1 == children.len();

        for &has_more in ancestor_has_more {
            if has_more {
                writer.write_all(b"|   ")?;
            } else {
                writer.write_all(b"    ")?;
            }
        }

        if is_last {
            writer.write_all(b"`-- ")?;
        } else {
            writer.write_all(b"|-- ")?;
        }

        writer.write_all(rendered_name(entry).as_bytes())?;
        writer.write_all(b"\n")?;

        if entry.is_dir() {
            let mut next_ancestor_has_more = ancestor_has_more.to_vec();
            next_ancestor_has_more.push(!is_last);
            write_level(writer, entries, &entry.path, &next_ancestor_has_more)?;
        }
    }

    Ok(())
}

fn rendered_name(entry: &Entry) -> String {
    match entry.kind {
        EntryKind::Directory => format!("{}/", entry.name),
        EntryKind::File => entry.name.clone(),
    }
}

/// Human-readable size: 1024 base, up to two decimals, trailing zeros
/// trimmed (1536 bytes renders as "1.5 KB").
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_owned();
    }
    let exponent = (bytes.ilog2() / 10).min(UNITS.len() as u32 - 1);
    let value = bytes as f64 / (1u64 << (10 * exponent)) as f64;
    let formatted = format!("{value:.2}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", UNITS[exponent as usize])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentRef;

    fn entry(path: &str, kind: EntryKind) -> Entry {
        Entry {
            path: path.to_owned(),
            name: crate::models::leaf_name(path).to_owned(),
            kind,
            size: 0,
            content_ref: ContentRef::Remote(format!("https://raw.test/{path}")),
        }
    }

    #[test]
    fn renders_scaffold_with_derived_order() {
        let entries = vec![
            entry("a", EntryKind::File),
            entry("c", EntryKind::Directory),
            entry("c/d", EntryKind::File),
            entry("b", EntryKind::Directory),
        ];

        let mut out = Vec::new();
        write_tree(&mut out, "demo", &entries).unwrap();
        let out = String::from_utf8(out).unwrap();

        assert_eq!(
            out,
            concat!(
                "demo\n",
                "|-- b/\n",
                "|-- c/\n",
                "|   `-- d\n",
                "`-- a\n",
            )
        );
    }

    #[test]
    fn unexpanded_directory_renders_as_leaf() {
        let entries = vec![entry("lazy", EntryKind::Directory)];

        let mut out = Vec::new();
        write_tree(&mut out, "root", &entries).unwrap();
        let out = String::from_utf8(out).unwrap();

        assert_eq!(out, "root\n`-- lazy/\n");
    }

    #[test]
    fn format_size_uses_binary_units() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(999), "999 B");
        assert_eq!(format_size(1024), "1 KB");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(1_048_576), "1 MB");
        assert_eq!(format_size(5_368_709_120), "5 GB");
    }
}
