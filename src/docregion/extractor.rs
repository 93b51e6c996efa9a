//! Extracts named `#docregion` spans from example-file text.
//!
//! An example file marks extractable regions with directive comments. A
//! region can be opened and closed repeatedly, interleave with other
//! regions, and is implicitly closed at end-of-file. Reopening a region
//! inserts a "plaster" placeholder line (an ellipsis comment by default)
//! where content was skipped; a `#docplaster` directive changes or
//! disables the placeholder from that point on.
//!
//! Parsing is lazy: the directive scan runs once on first use and its
//! result is shared by every subsequent extraction.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::docregion::matchers::{matcher_for, DocregionMatcher};

/// Placeholder text inserted where a region's content was elided.
const DEFAULT_PLASTER: &str = ". . .";

/// A span of 0-indexed line numbers in the source file, start inclusive,
/// end exclusive. `[0, 0]` is the sentinel used by a default region that
/// was never explicitly opened and therefore covers the whole file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

/// One extracted docregion: its de-indented text and the source spans it
/// was collected from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocregionInfo {
    pub file_type: String,
    pub lines: Vec<String>,
    pub ranges: Vec<LineRange>,
}

impl DocregionInfo {
    /// The region's text as a single newline-joined block.
    pub fn contents(&self) -> String {
        self.lines.join("\n")
    }
}

/// Collected lines and line ranges for one region name during the scan.
/// A range's end stays `None` while the region is open.
struct RegionEntry {
    lines: Vec<String>,
    ranges: Vec<(usize, Option<usize>)>,
}

impl RegionEntry {
    fn open_at(start: usize) -> Self {
        Self {
            lines: Vec::new(),
            ranges: vec![(start, None)],
        }
    }

    fn close_last_open(&mut self, end: usize) {
        if let Some(range) = self.ranges.iter_mut().rev().find(|(_, close)| close.is_none()) {
            range.1 = Some(end);
        }
    }
}

/// Region entries keyed by name, preserving first-appearance order.
struct RegionMap {
    entries: Vec<(String, RegionEntry)>,
}

impl RegionMap {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn get(&self, name: &str) -> Option<&RegionEntry> {
        self.entries
            .iter()
            .find(|(entry_name, _)| entry_name.as_str() == name)
            .map(|(_, entry)| entry)
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut RegionEntry> {
        self.entries
            .iter_mut()
            .find(|(entry_name, _)| entry_name.as_str() == name)
            .map(|(_, entry)| entry)
    }

    fn insert(&mut self, name: String, entry: RegionEntry) {
        self.entries.push((name, entry));
    }
}

/// Parses one example file's text into its docregions.
///
/// Construction only splits the text into lines; the directive scan runs
/// on the first call to [`extract`](Self::extract) or
/// [`region_names`](Self::region_names). Per-name extraction results are
/// memoized, so repeated calls return the same shared value.
pub struct DocregionExtractor {
    file_type: String,
    matcher: &'static DocregionMatcher,
    lines: Vec<String>,
    regions: OnceCell<RegionMap>,
    extracted: RwLock<FxHashMap<String, Option<Arc<DocregionInfo>>>>,
}

impl DocregionExtractor {
    pub fn new(file_type: impl Into<String>, contents: &str) -> Self {
        let file_type = file_type.into();
        let matcher = matcher_for(&file_type);
        let lines = contents
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
            .collect();
        Self {
            file_type,
            matcher,
            lines,
            regions: OnceCell::new(),
            extracted: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn file_type(&self) -> &str {
        &self.file_type
    }

    /// Region names in the order they first appear in the file. The
    /// default region `""` is listed only in the position it was opened,
    /// or last if it was never opened explicitly.
    pub fn region_names(&self) -> Vec<&str> {
        self.regions()
            .entries
            .iter()
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Returns the named region, or `None` if the file has no region by
    /// that name. The empty name addresses the default region, which
    /// always exists.
    pub fn extract(&self, name: &str) -> Option<Arc<DocregionInfo>> {
        if let Some(info) = self.extracted.read().get(name) {
            return info.clone();
        }
        let info = self.regions().get(name).map(|entry| {
            Arc::new(DocregionInfo {
                file_type: self.file_type.clone(),
                lines: left_align(&entry.lines),
                ranges: entry
                    .ranges
                    .iter()
                    .map(|&(start, end)| LineRange {
                        start,
                        end: end.unwrap_or(self.lines.len()),
                    })
                    .collect(),
            })
        });
        self.extracted
            .write()
            .entry(name.to_string())
            .or_insert(info)
            .clone()
    }

    fn regions(&self) -> &RegionMap {
        self.regions.get_or_init(|| self.scan_regions())
    }

    /// Single left-to-right scan over the lines. Each line is classified
    /// as at most one of region-start, region-end, or plaster directive;
    /// anything else is content and is collected into every open region.
    fn scan_regions(&self) -> RegionMap {
        let mut regions = RegionMap::new();
        let mut open: Vec<String> = Vec::new();
        let mut plaster = self.matcher.format_plaster(DEFAULT_PLASTER);

        for (line_idx, line) in self.lines.iter().enumerate() {
            if let Some(names) = self.matcher.region_start(line) {
                let mut names = parse_name_list(names);
                if names.is_empty() {
                    names.push(String::new());
                }
                for name in names {
                    if let Some(entry) = regions.get_mut(&name) {
                        // Reopened: start a fresh range, preceded by a
                        // plaster line matching the directive's indent.
                        entry.ranges.push((line_idx + 1, None));
                        if !plaster.is_empty() {
                            let indent = &line[..line.len() - line.trim_start().len()];
                            entry.lines.push(format!("{indent}{plaster}"));
                        }
                    } else {
                        regions.insert(name.clone(), RegionEntry::open_at(line_idx + 1));
                    }
                    open.push(name);
                }
            } else if let Some(names) = self.matcher.region_end(line) {
                let mut names = parse_name_list(names);
                if names.is_empty() {
                    if let Some(last) = open.last() {
                        names.push(last.clone());
                    }
                }
                for name in names {
                    // Ending a region that is not open is ignored; the
                    // directive line still never counts as content.
                    if let Some(pos) = open.iter().rposition(|open_name| *open_name == name) {
                        open.remove(pos);
                        if let Some(entry) = regions.get_mut(&name) {
                            entry.close_last_open(line_idx);
                        }
                    }
                }
            } else if let Some(text) = self.matcher.plaster(line) {
                let text = text.trim();
                plaster = if text.is_empty() {
                    String::new()
                } else {
                    self.matcher.format_plaster(text)
                };
            } else {
                for idx in 0..open.len() {
                    if open[..idx].contains(&open[idx]) {
                        continue;
                    }
                    if let Some(entry) = regions.get_mut(&open[idx]) {
                        entry.lines.push(line.clone());
                    }
                }
            }
        }

        for name in &open {
            if let Some(entry) = regions.get_mut(name) {
                entry.close_last_open(self.lines.len());
            }
        }

        if regions.get("").is_none() {
            let lines = self
                .lines
                .iter()
                .filter(|line| !self.is_directive(line))
                .cloned()
                .collect();
            regions.insert(
                String::new(),
                RegionEntry {
                    lines,
                    ranges: vec![(0, Some(0))],
                },
            );
        }

        regions
    }

    fn is_directive(&self, line: &str) -> bool {
        self.matcher.region_start(line).is_some()
            || self.matcher.region_end(line).is_some()
            || self.matcher.plaster(line).is_some()
    }
}

/// Splits directive text into trimmed comma-separated region names.
/// Empty text yields no names; a trailing comma yields a final empty name
/// (the default region).
fn parse_name_list(text: &str) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    text.split(',').map(|name| name.trim().to_string()).collect()
}

/// Strips the minimum shared leading whitespace from every line, counted
/// in chars so multibyte whitespace cannot split. Blank lines do not take
/// part in the minimum; a region of only blank lines is returned
/// unchanged.
fn left_align(lines: &[String]) -> Vec<String> {
    let min_indent = lines
        .iter()
        .filter(|line| !line.trim_start().is_empty())
        .map(|line| line.chars().take_while(|ch| ch.is_whitespace()).count())
        .min();
    let Some(min_indent) = min_indent.filter(|&indent| indent > 0) else {
        return lines.to_vec();
    };
    lines
        .iter()
        .map(|line| {
            line.char_indices()
                .nth(min_indent)
                .map(|(idx, _)| line[idx..].to_string())
                .unwrap_or_default()
        })
        .collect()
}
