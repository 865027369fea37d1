//! Chronological history reconstruction.
//!
//! The walker opens the full logical tree, collects every item's actions
//! (following file revisions across branch parents), merges them
//! chronologically and groups them into changesets keyed by
//! (timestamp, author).

use std::io::Write;

use tracing::warn;

use crate::db::{Database, VssResult};
use crate::history::action::Action;
use crate::item::{VssFile, VssItem, VssProject};
use crate::record::timestamp_to_datetime;

/// A group of actions by one author at one instant.
pub struct Changeset {
    pub timestamp: u32,
    pub author: String,
    /// normalized, deduplicated comments from the grouped actions
    pub comments: Vec<String>,
    pub actions: Vec<Action>,
}

impl Changeset {
    fn new(timestamp: u32, author: String) -> Self {
        Self {
            timestamp,
            author,
            comments: Vec::new(),
            actions: Vec::new(),
        }
    }

    /// The commit message for this changeset.
    pub fn message(&self) -> String {
        self.comments.join("\n\n")
    }

    fn append(&mut self, action: Action) {
        for comment in [&action.comment, &action.label_comment] {
            let Some(comment) = comment else { continue };
            let comment = normalize_comment(comment);
            if !comment.is_empty() && !self.comments.contains(&comment) {
                self.comments.push(comment);
            }
        }
        self.actions.push(action);
    }

    pub fn dump(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(
            w,
            "\nREVISION:\n  TIMESTAMP: {} ({})",
            timestamp_to_datetime(self.timestamp),
            self.timestamp
        )?;
        writeln!(w, "  AUTHOR: {}", self.author)?;
        for comment in &self.comments {
            writeln!(w, "  {}", comment.replace('\n', "\n  "))?;
        }
        for action in &self.actions {
            writeln!(w, "  {action}")?;
            for error in &action.errors {
                writeln!(w, "    {error}")?;
            }
        }
        Ok(())
    }
}

/// Normalize line separators in a comment: lone or repeated CRs become LFs
/// and runs of blank lines collapse.
fn normalize_comment(comment: &str) -> String {
    let mut out = String::with_capacity(comment.len());
    let mut chars = comment.trim().chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\r' {
            while chars.peek() == Some(&'\r') {
                chars.next();
            }
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            out.push('\n');
        } else {
            out.push(c);
        }
    }
    // collapse three or more newlines to a blank line
    let mut collapsed = String::with_capacity(out.len());
    let mut run = 0usize;
    for c in out.chars() {
        if c == '\n' {
            run += 1;
            if run > 2 {
                continue;
            }
        } else {
            run = 0;
        }
        collapsed.push(c);
    }
    collapsed
}

/// The reconstructed chronological history of a whole database.
pub struct ChangesetHistory {
    changesets: Vec<Changeset>,
}

impl ChangesetHistory {
    /// Walk the tree under `root` and build the changeset list.
    pub fn build(db: &Database, root: &VssProject) -> VssResult<Self> {
        let mut actions = Vec::new();
        collect_project(db, root, "", &mut actions)?;

        // chronological merge; author breaks ties so grouping is stable
        actions.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.user.cmp(&b.user))
        });

        let mut changesets: Vec<Changeset> = Vec::new();
        for action in actions {
            let matches_current = changesets
                .last()
                .map(|c| c.timestamp == action.timestamp && c.author == action.user)
                .unwrap_or(false);
            if !matches_current {
                changesets.push(Changeset::new(action.timestamp, action.user.clone()));
            }
            changesets
                .last_mut()
                .expect("changeset pushed above")
                .append(action);
        }
        Ok(Self { changesets })
    }

    pub fn changesets(&self) -> &[Changeset] {
        &self.changesets
    }

    pub fn len(&self) -> usize {
        self.changesets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changesets.is_empty()
    }

    pub fn dump(&self, w: &mut dyn Write) -> std::io::Result<()> {
        for changeset in &self.changesets {
            changeset.dump(w)?;
        }
        Ok(())
    }
}

fn collect_project(
    db: &Database,
    project: &VssProject,
    base_path: &str,
    out: &mut Vec<Action>,
) -> VssResult<()> {
    let path = format!("{}{}/", base_path, project.logical_name);

    if let Some(item_file) = &project.item_file {
        let history = item_file.history(db)?;
        for revision in &history.revisions {
            match Action::from_project_revision(revision, &path) {
                Ok(action) => out.push(action),
                Err(e) => warn!(
                    project = %project.physical_name,
                    version = revision.record.revision_num,
                    "skipping project revision: {e}"
                ),
            }
        }
    }

    for child in project.all_items() {
        match child {
            VssItem::Project(child) => collect_project(db, child, &path, out)?,
            VssItem::File(file) => collect_file(db, file, &path, out),
        }
    }
    Ok(())
}

/// Collect one file instance's actions, following revisions through branch
/// parents. Failures never abort the walk: they land on the nearest action
/// as error strings.
fn collect_file(db: &Database, file: &VssFile, base_path: &str, out: &mut Vec<Action>) {
    let Some(item_file) = &file.item_file else {
        return;
    };
    let pathname = format!("{}{}", base_path, file.logical_name);

    let first = out.len();
    let mut errors = Vec::new();
    for version in 1..=item_file.last_revision() {
        match item_file.revision(db, version) {
            Ok(revision) => match Action::from_file_revision(&revision, &pathname) {
                Ok(action) => out.push(action),
                Err(e) => errors.push(format!("version {version}: {e}")),
            },
            Err(e) => errors.push(format!("version {version}: {e}")),
        }
    }
    if !errors.is_empty() {
        if let Some(action) = out.get_mut(first) {
            for error in errors {
                action.add_error(error);
            }
        } else {
            warn!(file = %file.physical_name, "no readable revisions: {}", errors.join("; "));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_comment() {
        assert_eq!(normalize_comment("a\r\nb"), "a\nb");
        assert_eq!(normalize_comment("a\r\r\nb"), "a\nb");
        assert_eq!(normalize_comment("a\rb"), "a\nb");
        assert_eq!(normalize_comment("a\n\n\n\nb"), "a\n\nb");
        assert_eq!(normalize_comment("  padded  "), "padded");
    }
}
