use std::sync::Arc;

use colored::Colorize;
use futures::{Stream, StreamExt};
use supports_color::Stream as OutputStream;
use tracing::debug;

use crate::mirror::{MirrorSnapshot, TreeMirror, VIRTUAL_ROOT};
use crate::presentation::{MirrorUpdate, Visibility};

/// Prints engine updates to stdout, optionally followed by the mirrored tree.
pub struct ConsolePresenter {
    mirror: Arc<TreeMirror>,
    render_tree: bool,
    colorize: bool,
}

impl ConsolePresenter {
    pub fn new(mirror: Arc<TreeMirror>, render_tree: bool) -> Self {
        let colorize = supports_color::on(OutputStream::Stdout).is_some();
        ConsolePresenter {
            mirror,
            render_tree,
            colorize,
        }
    }

    pub async fn run(self, mut updates: impl Stream<Item = MirrorUpdate> + Unpin) {
        let mut visible = false;
        while let Some(update) = updates.next().await {
            if let MirrorUpdate::Visibility(visibility) = update {
                visible = visibility == Visibility::Shown;
            }
            println!("{}", self.present(&update, visible));
        }
        debug!("Update stream ended");
    }

    fn present(&self, update: &MirrorUpdate, visible: bool) -> String {
        match update {
            MirrorUpdate::Visibility(visibility) => self.paint_status(&visibility.to_string()),
            MirrorUpdate::Counts(counts) if self.render_tree && visible => {
                format!("{}\n{}", counts, self.render(&self.mirror.snapshot()))
            }
            MirrorUpdate::Counts(counts) => counts.to_string(),
        }
    }

    /// Draws the mirror as an indented tree of full paths, starting at the root.
    pub fn render(&self, snapshot: &MirrorSnapshot) -> String {
        let mut lines = Vec::new();
        for top in snapshot.children_of(VIRTUAL_ROOT) {
            lines.push(self.paint_node(top, snapshot.is_branch(top)));
            self.render_children(snapshot, top, "", &mut lines);
        }
        lines.join("\n")
    }

    fn render_children(
        &self,
        snapshot: &MirrorSnapshot,
        path: &str,
        prefix: &str,
        lines: &mut Vec<String>,
    ) {
        let children = snapshot.children_of(path);
        for (idx, child) in children.iter().enumerate() {
            let last = idx + 1 == children.len();
            let (branch, indent) = if last {
                ("└── ", "    ")
            } else {
                ("├── ", "│   ")
            };
            lines.push(format!(
                "{prefix}{branch}{}",
                self.paint_node(child, snapshot.is_branch(child))
            ));
            self.render_children(snapshot, child, &format!("{prefix}{indent}"), lines);
        }
    }

    fn paint_node(&self, path: &str, branch: bool) -> String {
        match (self.colorize, branch) {
            (true, true) => path.blue().bold().to_string(),
            (true, false) => path.normal().to_string(),
            (false, _) => path.to_string(),
        }
    }

    fn paint_status(&self, status: &str) -> String {
        if self.colorize {
            status.yellow().to_string()
        } else {
            status.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::AggregateCounts;

    fn presenter(render_tree: bool) -> ConsolePresenter {
        let mirror = Arc::new(TreeMirror::new("/a"));
        mirror.replace_entries(vec![
            ("/a".into(), vec!["/a/b".into(), "/a/c".into()]),
            ("/a/b".into(), vec!["/a/b/d".into()]),
            ("/a/c".into(), vec![]),
        ]);
        ConsolePresenter {
            mirror,
            render_tree,
            colorize: false,
        }
    }

    #[test]
    fn renders_tree_with_full_paths() {
        let presenter = presenter(true);

        let rendered = presenter.render(&presenter.mirror.snapshot());

        assert_eq!(
            rendered,
            "/a\n├── /a/b\n│   └── /a/b/d\n└── /a/c"
        );
    }

    #[test]
    fn counts_line_uses_label_text() {
        let presenter = presenter(false);
        let update = MirrorUpdate::Counts(AggregateCounts { direct: 2, all: 3 });

        assert_eq!(presenter.present(&update, true), "Child nodes: 2 direct, 3 all");
    }

    #[test]
    fn tree_is_only_rendered_while_visible() {
        let presenter = presenter(true);
        let update = MirrorUpdate::Counts(presenter.mirror.counts());

        assert!(presenter.present(&update, true).contains("/a/b/d"));
        assert!(!presenter.present(&update, false).contains("/a/b/d"));
    }

    #[test]
    fn visibility_changes_are_reported() {
        let presenter = presenter(false);

        assert_eq!(
            presenter.present(&MirrorUpdate::Visibility(Visibility::Hidden), false),
            "subtree hidden"
        );
    }
}
