//! Parser for `ls -la` output as printed by Android's toybox/toolbox.
//!
//! This text format is the only contract with the device; keep every
//! assumption about it in this module.

/// One entry parsed from a long listing line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LsEntry {
    pub name: String,
    pub size: u64,
    pub is_directory: bool,
}

/// Minimum number of whitespace-separated fields in an entry line:
/// mode, links, owner, group, size, date, time, name.
const MIN_FIELDS: usize = 8;

/// Parse `ls -la` output. Lines that do not look like entries (`total 24`,
/// blank lines, error text) are skipped, as are `.` and `..`.
pub fn parse_ls_output(output: &str) -> Vec<LsEntry> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(parse_line)
        .collect()
}

fn parse_line(line: &str) -> Option<LsEntry> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < MIN_FIELDS {
        return None;
    }

    let name = fields[MIN_FIELDS - 1..].join(" ");
    if name == "." || name == ".." {
        return None;
    }

    Some(LsEntry {
        is_directory: fields[0].starts_with('d'),
        size: fields[4].parse().unwrap_or(0),
        name,
    })
}
