//! Result rendering.
//!
//! Three group formats (grouped, tsv, pipe) plus the plain path-per-line
//! list used by the list and compare-to-file modes. Everything writes
//! against `io::Write` so tests can render into a buffer.
//!
//! Group and member order is whatever the run produced; stable ordering is
//! deliberately not promised.

use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;

use crate::config::OutputFormat;
use crate::groups::GroupId;

/// Write one path per line.
pub fn write_file_list<W: Write>(writer: &mut W, paths: &[PathBuf]) -> io::Result<()> {
    for path in paths {
        writeln!(writer, "{}", path.display())?;
    }
    Ok(())
}

/// Write the groups in the requested format.
///
/// Callers pass groups of size >= 2 only; this function renders whatever it
/// is given.
pub fn write_groups<W: Write>(
    writer: &mut W,
    format: OutputFormat,
    groups: &HashMap<GroupId, Vec<PathBuf>>,
) -> io::Result<()> {
    for (&group_id, members) in groups {
        if format == OutputFormat::Grouped {
            writeln!(writer, "Group ID: {group_id}")?;
        }
        for path in members {
            match format {
                OutputFormat::Grouped => writeln!(writer, "  {}", path.display())?,
                OutputFormat::Tsv => writeln!(writer, "{group_id}\t{}", path.display())?,
                OutputFormat::Pipe => writeln!(writer, "{group_id}|{}", path.display())?,
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_groups() -> HashMap<GroupId, Vec<PathBuf>> {
        let mut groups = HashMap::new();
        groups.insert(
            3,
            vec![PathBuf::from("/data/a.txt"), PathBuf::from("/data/b.txt")],
        );
        groups
    }

    fn render(format: OutputFormat) -> String {
        let mut out = Vec::new();
        write_groups(&mut out, format, &sample_groups()).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_grouped_format() {
        let text = render(OutputFormat::Grouped);
        assert!(text.starts_with("Group ID: 3\n"));
        assert!(text.contains("  /data/a.txt\n"));
        assert!(text.contains("  /data/b.txt\n"));
    }

    #[test]
    fn test_tsv_format() {
        let text = render(OutputFormat::Tsv);
        assert!(text.contains("3\t/data/a.txt\n"));
        assert!(text.contains("3\t/data/b.txt\n"));
        assert!(!text.contains("Group ID"));
    }

    #[test]
    fn test_pipe_format() {
        let text = render(OutputFormat::Pipe);
        assert!(text.contains("3|/data/a.txt\n"));
        assert!(text.contains("3|/data/b.txt\n"));
    }

    #[test]
    fn test_file_list() {
        let mut out = Vec::new();
        write_file_list(
            &mut out,
            &[PathBuf::from("/x/one"), PathBuf::from("/x/two")],
        )
        .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "/x/one\n/x/two\n");
    }

    #[test]
    fn test_empty_results_render_nothing() {
        let mut out = Vec::new();
        write_file_list(&mut out, &[]).unwrap();
        write_groups(&mut out, OutputFormat::Grouped, &HashMap::new()).unwrap();
        assert!(out.is_empty());
    }
}
