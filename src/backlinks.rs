//! Backlink reconciliation
//!
//! Every note carries one `← [[index|Back to name]]` line per tag directly
//! below its header. The reconciler recomputes those lines from the current
//! tags and rewrites the zone only when the two sets differ. The header and
//! everything after the zone are left byte-identical.

use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use std::collections::BTreeSet;

use crate::error::{Result, VaultError};
use crate::frontmatter::{split_header, HeaderSplit, MetadataExtractor};
use crate::naming::{is_valid_tag, IndexNaming};
use crate::report::{DocumentIssue, SyncReport};
use crate::store::DocumentStore;

static BACKLINK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^←\s*\[\[.+\]\]$").unwrap());

/// Whether a trimmed line has the backlink shape: glyph followed by one wiki link
pub fn is_backlink_line(trimmed: &str) -> bool {
    BACKLINK_RE.is_match(trimmed)
}

fn is_heading(trimmed: &str) -> bool {
    trimmed.starts_with('#')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneState {
    InBacklinks,
    Done,
}

/// The run of blank and backlink lines right after the header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    /// First line of the zone
    pub start: usize,
    /// One past the last line of the zone
    pub end: usize,
    /// Trimmed backlink texts found inside, in file order
    pub backlinks: Vec<String>,
}

/// Line-at-a-time automaton that finds the backlink zone.
///
/// Blank lines and backlink-shaped lines extend the zone. A heading or any
/// other non-blank line moves to `Done`, and the zone ends before it.
pub struct ZoneScanner {
    state: ZoneState,
    zone: Zone,
}

impl ZoneScanner {
    pub fn new(start: usize) -> Self {
        Self {
            state: ZoneState::InBacklinks,
            zone: Zone {
                start,
                end: start,
                backlinks: Vec::new(),
            },
        }
    }

    pub fn state(&self) -> ZoneState {
        self.state
    }

    pub fn feed(&mut self, line: &str) -> ZoneState {
        if self.state == ZoneState::Done {
            return self.state;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            self.zone.end += 1;
        } else if is_heading(trimmed) || !is_backlink_line(trimmed) {
            self.state = ZoneState::Done;
        } else {
            self.zone.backlinks.push(trimmed.to_string());
            self.zone.end += 1;
        }
        self.state
    }

    pub fn finish(self) -> Zone {
        self.zone
    }
}

/// Scan `lines` from `start` and return the backlink zone
pub fn scan_zone(lines: &[&str], start: usize) -> Zone {
    let mut scanner = ZoneScanner::new(start);
    for line in lines.iter().skip(start) {
        if scanner.feed(line) == ZoneState::Done {
            break;
        }
    }
    scanner.finish()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoHeader,
    MalformedHeader,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::NoHeader => "no header",
            SkipReason::MalformedHeader => "header has no closing delimiter",
        }
    }
}

/// What reconciliation would do to one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    Unchanged,
    /// Backlinks added where none existed
    Insert(String),
    /// Existing backlinks replaced or removed
    Update(String),
    Skip(SkipReason),
}

impl Plan {
    pub fn new_content(&self) -> Option<&str> {
        match self {
            Plan::Insert(content) | Plan::Update(content) => Some(content),
            Plan::Unchanged | Plan::Skip(_) => None,
        }
    }
}

pub struct Reconciler {
    naming: IndexNaming,
}

impl Reconciler {
    pub fn new(naming: IndexNaming) -> Self {
        Self { naming }
    }

    /// One rendered backlink line per tag, in tag order
    pub fn expected_backlinks(&self, tags: &[String]) -> Vec<String> {
        let mut seen = BTreeSet::new();
        tags.iter()
            .filter(|tag| is_valid_tag(tag) && seen.insert(tag.as_str()))
            .map(|tag| self.naming.backlink_line(tag))
            .collect()
    }

    /// Decide whether `content` needs its backlink zone rewritten
    pub fn plan(&self, content: &str) -> Plan {
        let header = match split_header(content) {
            HeaderSplit::Found(header) => header,
            HeaderSplit::Missing => return Plan::Skip(SkipReason::NoHeader),
            HeaderSplit::Unterminated => return Plan::Skip(SkipReason::MalformedHeader),
        };

        let metadata = MetadataExtractor::parse_header(&header.raw);
        let expected = self.expected_backlinks(&metadata.tags);

        let lines: Vec<&str> = content.split('\n').collect();
        let zone = scan_zone(&lines, header.body_line());

        let expected_set: BTreeSet<&str> = expected.iter().map(String::as_str).collect();
        let existing_set: BTreeSet<&str> = zone.backlinks.iter().map(String::as_str).collect();
        if expected_set == existing_set {
            return Plan::Unchanged;
        }

        // inserted lines follow the header's line ending
        let cr = if lines[header.closing_line].ends_with('\r') { "\r" } else { "" };

        let rest = &lines[zone.end.min(lines.len())..];
        let mut out: Vec<String> = Vec::with_capacity(lines.len() + expected.len() + 1);
        out.extend(lines[..zone.start.min(lines.len())].iter().map(|l| l.to_string()));
        out.extend(expected.iter().map(|l| format!("{}{}", l, cr)));
        if rest.is_empty() {
            out.push(String::new());
        } else if !expected.is_empty() {
            out.push(cr.to_string());
        }
        out.extend(rest.iter().map(|l| l.to_string()));
        let rewritten = out.join("\n");

        if zone.backlinks.is_empty() {
            Plan::Insert(rewritten)
        } else {
            Plan::Update(rewritten)
        }
    }

    /// Dry run: report what `sync` would change without writing
    pub fn check(&self, store: &dyn DocumentStore) -> Result<SyncReport> {
        self.run(store, false)
    }

    /// Rewrite every note whose backlinks are out of sync
    pub fn sync(&self, store: &dyn DocumentStore) -> Result<SyncReport> {
        self.run(store, true)
    }

    fn run(&self, store: &dyn DocumentStore, apply: bool) -> Result<SyncReport> {
        let names: Vec<String> = store
            .list()?
            .into_iter()
            .filter(|name| !self.naming.is_index_document(name))
            .collect();

        let outcomes: Vec<(String, Outcome)> = names
            .into_par_iter()
            .map(|name| {
                let outcome = self.reconcile_one(store, &name, apply);
                (name, outcome)
            })
            .collect();

        let mut report = SyncReport {
            dry_run: !apply,
            ..SyncReport::default()
        };
        for (name, outcome) in outcomes {
            match outcome {
                Outcome::Unchanged => report.unchanged += 1,
                Outcome::Inserted => {
                    report.inserted += 1;
                    report.pending.push(name);
                }
                Outcome::Updated => {
                    report.updated += 1;
                    report.pending.push(name);
                }
                Outcome::Skipped(reason) => {
                    report.skipped.push(DocumentIssue::new(name, reason.as_str()));
                }
                Outcome::Failed(err) => {
                    report.errors.push(DocumentIssue::from_error(&name, &err));
                }
            }
        }

        log::info!(
            "[backlinks] {} inserted, {} updated, {} unchanged, {} skipped, {} errors{}",
            report.inserted,
            report.updated,
            report.unchanged,
            report.skipped.len(),
            report.errors.len(),
            if apply { "" } else { " (dry run)" }
        );
        Ok(report)
    }

    fn reconcile_one(&self, store: &dyn DocumentStore, name: &str, apply: bool) -> Outcome {
        let content = match store.read(name) {
            Ok(content) => content,
            Err(e) => {
                log::error!("[backlinks] {}", e);
                return Outcome::Failed(e);
            }
        };

        let plan = self.plan(&content);
        if let Plan::Skip(reason) = plan {
            if reason == SkipReason::MalformedHeader {
                log::warn!(
                    "[backlinks] {}",
                    VaultError::MalformedHeader { name: name.to_string() }
                );
            }
            return Outcome::Skipped(reason);
        }

        let Some(new_content) = plan.new_content() else {
            return Outcome::Unchanged;
        };

        if apply {
            if let Err(e) = store.write(name, new_content) {
                log::error!("[backlinks] {}", e);
                return Outcome::Failed(e);
            }
            log::debug!("[backlinks] Updated: {}", name);
        }

        match plan {
            Plan::Insert(_) => Outcome::Inserted,
            _ => Outcome::Updated,
        }
    }
}

enum Outcome {
    Unchanged,
    Inserted,
    Updated,
    Skipped(SkipReason),
    Failed(VaultError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VaultConfig;

    fn flat_reconciler() -> Reconciler {
        let mut config = VaultConfig::default();
        config.index_dir = String::new();
        config.link_extension = false;
        Reconciler::new(config.naming())
    }

    fn rewritten(plan: Plan) -> String {
        plan.new_content().expect("expected a rewrite").to_string()
    }

    #[test]
    fn test_scanner_states() {
        let mut scanner = ZoneScanner::new(0);
        assert_eq!(scanner.state(), ZoneState::InBacklinks);
        assert_eq!(scanner.feed(""), ZoneState::InBacklinks);
        assert_eq!(scanner.feed("← [[index-a|Back to a]]"), ZoneState::InBacklinks);
        assert_eq!(scanner.feed("   "), ZoneState::InBacklinks);
        assert_eq!(scanner.feed("# Heading"), ZoneState::Done);
        assert_eq!(scanner.feed("← [[index-b|Back to b]]"), ZoneState::Done);

        let zone = scanner.finish();
        assert_eq!(zone.end, 3);
        assert_eq!(zone.backlinks, vec!["← [[index-a|Back to a]]"]);
    }

    #[test]
    fn test_zone_stops_at_plain_text() {
        let lines = ["---", "tags: [a]", "---", "← [[x|Back to x]]", "Some text", "← [[y|Back to y]]"];
        let zone = scan_zone(&lines, 3);
        assert_eq!(zone.start, 3);
        assert_eq!(zone.end, 4);
        assert_eq!(zone.backlinks.len(), 1);
    }

    #[test]
    fn test_backlink_shape() {
        assert!(is_backlink_line("← [[index-a|Back to a]]"));
        assert!(is_backlink_line("←[[indexes/index-a.md|Back to a]]"));
        assert!(!is_backlink_line("← [[index-a|Back to a"));
        assert!(is_backlink_line("← [[index-a]b|Back to a]b]]"));
        assert!(!is_backlink_line("← back home"));
        assert!(!is_backlink_line("-> [[index-a|Back to a]]"));
        assert!(!is_backlink_line("← [[index-a|Back to a]] and more"));
    }

    #[test]
    fn test_expected_backlinks_for_nested_tags() {
        let reconciler = flat_reconciler();
        let expected = reconciler.expected_backlinks(&["proj".to_string(), "proj/web".to_string()]);
        let as_set: BTreeSet<_> = expected.into_iter().collect();
        let wanted: BTreeSet<String> = [
            "← [[index-proj|Back to proj]]".to_string(),
            "← [[index-proj-web|Back to web]]".to_string(),
        ]
        .into_iter()
        .collect();
        assert_eq!(as_set, wanted);
    }

    #[test]
    fn test_expected_independent_of_tag_order() {
        let reconciler = flat_reconciler();
        let a: BTreeSet<_> = reconciler
            .expected_backlinks(&["a".into(), "a/b".into()])
            .into_iter()
            .collect();
        let b: BTreeSet<_> = reconciler
            .expected_backlinks(&["a/b".into(), "a".into()])
            .into_iter()
            .collect();
        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn test_insert_after_header() {
        let reconciler = flat_reconciler();
        let content = "---\ntags: [proj, proj/web]\n---\n# Title\nbody\n";

        let plan = reconciler.plan(content);
        assert!(matches!(plan, Plan::Insert(_)));
        assert_eq!(
            rewritten(plan),
            "---\ntags: [proj, proj/web]\n---\n← [[index-proj|Back to proj]]\n← [[index-proj-web|Back to web]]\n\n# Title\nbody\n"
        );
    }

    #[test]
    fn test_second_pass_is_noop() {
        let reconciler = flat_reconciler();
        let content = "---\ntags: [a, a/b]\n---\n\n\nIntro line\n";

        let once = rewritten(reconciler.plan(content));
        assert_eq!(reconciler.plan(&once), Plan::Unchanged);
    }

    #[test]
    fn test_order_of_existing_lines_is_irrelevant() {
        let reconciler = flat_reconciler();
        let content = "---\ntags: [a, b]\n---\n← [[index-b|Back to b]]\n← [[index-a|Back to a]]\n\n# Body\n";
        assert_eq!(reconciler.plan(content), Plan::Unchanged);
    }

    #[test]
    fn test_update_replaces_stale_lines_and_blank_runs() {
        let reconciler = flat_reconciler();
        let content = "---\ntags: [new]\n---\n\n← [[index-old|Back to old]]\n\n\n← [[index-new|Back to new]]\n\n## Section\n\n← [[index-old|Back to old]]\n";

        let plan = reconciler.plan(content);
        assert!(matches!(plan, Plan::Update(_)));
        // the line below the heading is content, not zone
        assert_eq!(
            rewritten(plan),
            "---\ntags: [new]\n---\n← [[index-new|Back to new]]\n\n## Section\n\n← [[index-old|Back to old]]\n"
        );
    }

    #[test]
    fn test_removal_when_tags_cleared() {
        let reconciler = flat_reconciler();
        let content = "---\ntitle: x\n---\n← [[index-gone|Back to gone]]\n\n# Body\n";

        let plan = reconciler.plan(content);
        assert!(matches!(plan, Plan::Update(_)));
        assert_eq!(rewritten(plan), "---\ntitle: x\n---\n# Body\n");
    }

    #[test]
    fn test_zone_reaching_end_of_file() {
        let reconciler = flat_reconciler();

        let content = "---\ntags: [a]\n---\n";
        let once = rewritten(reconciler.plan(content));
        assert_eq!(once, "---\ntags: [a]\n---\n← [[index-a|Back to a]]\n");
        assert_eq!(reconciler.plan(&once), Plan::Unchanged);

        let cleared = "---\ntags: []\n---\n← [[index-a|Back to a]]\n";
        assert_eq!(rewritten(reconciler.plan(cleared)), "---\ntags: []\n---\n");
    }

    #[test]
    fn test_malformed_link_is_content_not_zone() {
        let reconciler = flat_reconciler();
        let content = "---\ntags: [a]\n---\n← [[broken link\ntext\n";

        // nothing recognised, so the rewrite only adds lines
        assert_eq!(
            rewritten(reconciler.plan(content)),
            "---\ntags: [a]\n---\n← [[index-a|Back to a]]\n\n← [[broken link\ntext\n"
        );
    }

    #[test]
    fn test_skips() {
        let reconciler = flat_reconciler();
        assert_eq!(reconciler.plan("---\nfoo"), Plan::Skip(SkipReason::MalformedHeader));
        assert_eq!(reconciler.plan("# just text\n"), Plan::Skip(SkipReason::NoHeader));
    }

    #[test]
    fn test_untagged_document_without_zone_is_unchanged() {
        let reconciler = flat_reconciler();
        assert_eq!(reconciler.plan("---\nfavourite: true\n---\n\n# Note\n"), Plan::Unchanged);
    }

    #[test]
    fn test_header_bytes_preserved_with_crlf() {
        let reconciler = flat_reconciler();
        let content = "---\r\ntags: [a]\r\n---\r\n# Body\r\n";

        let out = rewritten(reconciler.plan(content));
        assert_eq!(out, "---\r\ntags: [a]\r\n---\r\n← [[index-a|Back to a]]\r\n\r\n# Body\r\n");
        assert_eq!(reconciler.plan(&out), Plan::Unchanged);

        let at_eof = rewritten(reconciler.plan("---\r\ntags: [a]\r\n---\r\n"));
        assert_eq!(at_eof, "---\r\ntags: [a]\r\n---\r\n← [[index-a|Back to a]]\r\n");
        assert_eq!(reconciler.plan(&at_eof), Plan::Unchanged);
    }

    #[test]
    fn test_bracket_in_tag_stays_idempotent() {
        let reconciler = flat_reconciler();
        let content = "---\ntags:\n  - todo]x\n---\n# Body\n";

        let once = rewritten(reconciler.plan(content));
        assert_eq!(once, "---\ntags:\n  - todo]x\n---\n← [[index-todo]x|Back to todo]x]]\n\n# Body\n");
        assert_eq!(reconciler.plan(&once), Plan::Unchanged);
    }

    #[test]
    fn test_tags_with_empty_segments_get_no_backlink() {
        let reconciler = flat_reconciler();
        let expected = reconciler.expected_backlinks(&["/".into(), "a//b".into(), "a/".into(), "ok".into()]);
        assert_eq!(expected, vec!["← [[index-ok|Back to ok]]"]);
    }
}
