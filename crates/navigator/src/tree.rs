use ratebook_protocol::SectionNode;
use std::collections::HashMap;
use std::sync::Arc;

/// Root forest of one database plus a `code -> position` index.
///
/// The forest sits behind an `Arc` and is cloned on write, so snapshots
/// handed out earlier never observe later merges. Index entries are hints:
/// a lookup whose node no longer carries the expected code falls back to a
/// depth-first walk and repairs the entry.
#[derive(Debug, Clone, Default)]
pub struct SectionTree {
    roots: Arc<Vec<SectionNode>>,
    index: HashMap<String, Vec<usize>>,
}

impl SectionTree {
    pub fn new(roots: Arc<Vec<SectionNode>>) -> Self {
        let mut tree = Self {
            roots,
            index: HashMap::new(),
        };
        tree.reindex();
        tree
    }

    pub fn roots(&self) -> &Arc<Vec<SectionNode>> {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn clear(&mut self) {
        self.roots = Arc::default();
        self.index.clear();
    }

    pub fn find(&self, code: &str) -> Option<&SectionNode> {
        self.locate(code).and_then(|path| node_at(&self.roots, &path))
    }

    /// Splice an expanded fragment into the forest. Returns `false` when the
    /// fragment matched nothing and was not a root.
    pub fn merge(&mut self, fragment: &SectionNode) -> bool {
        if fragment.code.is_empty() {
            return false;
        }

        let Some(path) = self.locate(&fragment.code) else {
            if fragment.depth == 0 {
                let mut root = fragment.clone();
                root.has_children = expandable(fragment);
                let roots = Arc::make_mut(&mut self.roots);
                roots.push(root);
                let position = vec![roots.len() - 1];
                self.index_subtree(position);
                return true;
            }
            log::debug!("No section {} to merge into", fragment.code);
            return false;
        };

        let Some(node) = node_at_mut(Arc::<Vec<SectionNode>>::make_mut(&mut self.roots), &path) else {
            return false;
        };
        node.children = fragment.children.clone();
        node.works = fragment.works.clone();
        node.has_children = expandable(fragment);
        self.forget_descendants(&path);
        self.index_subtree(path);
        true
    }

    fn locate(&self, code: &str) -> Option<Vec<usize>> {
        if let Some(path) = self.index.get(code) {
            if node_at(&self.roots, path).is_some_and(|node| node.code == code) {
                return Some(path.clone());
            }
        }
        let mut path = Vec::new();
        if walk(&self.roots, code, &mut path) {
            return Some(path);
        }
        None
    }

    fn reindex(&mut self) {
        self.index.clear();
        for position in 0..self.roots.len() {
            self.index_subtree(vec![position]);
        }
    }

    /// Drop index entries below `path`; the node itself keeps its entry.
    fn forget_descendants(&mut self, path: &[usize]) {
        self.index
            .retain(|_, position| position.len() <= path.len() || !position.starts_with(path));
    }

    fn index_subtree(&mut self, path: Vec<usize>) {
        let mut pending = vec![path];
        while let Some(path) = pending.pop() {
            let Some(node) = node_at(&self.roots, &path) else {
                continue;
            };
            for position in 0..node.children.len() {
                let mut child = path.clone();
                child.push(position);
                pending.push(child);
            }
            // First occurrence wins, matching the walk order.
            let entry = self.index.entry(node.code.clone()).or_insert_with(|| path.clone());
            if node_at(&self.roots, entry).map(|n| n.code.as_str()) != Some(node.code.as_str())
                || path < *entry
            {
                *entry = path;
            }
        }
    }
}

fn expandable(fragment: &SectionNode) -> bool {
    fragment.has_children || !fragment.children.is_empty() || !fragment.works.is_empty()
}

fn node_at<'a>(roots: &'a [SectionNode], path: &[usize]) -> Option<&'a SectionNode> {
    let (first, rest) = path.split_first()?;
    let mut node = roots.get(*first)?;
    for position in rest {
        node = node.children.get(*position)?;
    }
    Some(node)
}

fn node_at_mut<'a>(roots: &'a mut [SectionNode], path: &[usize]) -> Option<&'a mut SectionNode> {
    let (first, rest) = path.split_first()?;
    let mut node = roots.get_mut(*first)?;
    for position in rest {
        node = node.children.get_mut(*position)?;
    }
    Some(node)
}

/// Depth-first, first match wins.
fn walk(nodes: &[SectionNode], code: &str, path: &mut Vec<usize>) -> bool {
    for (position, node) in nodes.iter().enumerate() {
        path.push(position);
        if node.code == code || walk(&node.children, code, path) {
            return true;
        }
        path.pop();
    }
    false
}
