// Traversal context: a persistent stack of key/value entries threaded down
// the recursive walk, never process-global state. Each branch of the tree
// sees exactly the entries its ancestors pushed.

use std::rc::Rc;

/// Key under which the engine accumulates the dotted ancestor path.
pub const PATH_KEY: &str = "path";

/// One entry pushed while descending into a node and dropped on exit.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextEntry {
    pub key: String,
    pub value: String,
}

#[derive(Debug)]
struct Frame {
    entry: ContextEntry,
    parent: Option<Rc<Frame>>,
}

/// Immutable context stack. `push` returns a child stack sharing the parent
/// frames; dropping the child never disturbs the parent, which is what makes
/// per-file traversal state trivially safe to thread through recursion.
#[derive(Debug, Clone, Default)]
pub struct ContextStack {
    head: Option<Rc<Frame>>,
}

impl ContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Child stack with one more entry on top.
    pub fn push(&self, key: impl Into<String>, value: impl Into<String>) -> ContextStack {
        ContextStack {
            head: Some(Rc::new(Frame {
                entry: ContextEntry {
                    key: key.into(),
                    value: value.into(),
                },
                parent: self.head.clone(),
            })),
        }
    }

    /// Most recently pushed value for `key`, searching outward through the
    /// enclosing frames.
    pub fn nearest(&self, key: &str) -> Option<&str> {
        let mut frame = self.head.as_deref();
        while let Some(current) = frame {
            if current.entry.key == key {
                return Some(current.entry.value.as_str());
            }
            frame = current.parent.as_deref();
        }
        None
    }

    /// The dotted ancestor path accumulated so far, if any ancestor pushed
    /// one.
    pub fn nearest_path(&self) -> Option<&str> {
        self.nearest(PATH_KEY)
    }

    /// Child stack whose path is the enclosing path extended by `segment`.
    /// A multi-segment value (an already-flattened `a.b.c`) concatenates as
    /// its component segments, not as one opaque token.
    pub fn push_path(&self, segment: &str) -> ContextStack {
        let value = match self.nearest_path() {
            Some(prefix) => format!("{prefix}.{segment}"),
            None => segment.to_string(),
        };
        self.push(PATH_KEY, value)
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }
}

/// Dotted-path pattern with case-insensitive whole-segment comparison.
/// A `*` segment matches any single segment. Source DSLs vary identifier
/// case, so `JacocoTestReport.REPORTS.xml` and `jacocoTestReport.reports.xml`
/// compare equal; partial-segment matches do not.
#[derive(Debug, Clone, PartialEq)]
pub struct PathMatcher {
    segments: Vec<String>,
}

impl PathMatcher {
    pub fn new(pattern: &str) -> Self {
        PathMatcher {
            segments: pattern.split('.').map(str::to_string).collect(),
        }
    }

    /// Whole-path match: same segment count, every segment equal.
    pub fn matches(&self, path: &str) -> bool {
        let parts: Vec<&str> = path.split('.').collect();
        parts.len() == self.segments.len() && self.segments_match(&parts)
    }

    /// Prefix match: the path starts with this pattern's segments.
    pub fn matches_prefix(&self, path: &str) -> bool {
        let parts: Vec<&str> = path.split('.').collect();
        parts.len() >= self.segments.len() && self.segments_match(&parts)
    }

    fn segments_match(&self, parts: &[&str]) -> bool {
        self.segments
            .iter()
            .zip(parts)
            .all(|(pattern, part)| pattern == "*" || pattern.eq_ignore_ascii_case(part))
    }
}
