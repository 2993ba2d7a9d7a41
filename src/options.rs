//! Serialization options threaded through `get`.

/// Controls what [`Resource::get`](crate::Resource::get) and
/// [`ResourceList::get`](crate::ResourceList::get) emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Emit `_id_`, `_label_`, `_path_` and `_view_`.
    pub include_meta_data: bool,
    /// Emit `_ifcs_`, the navigable interfaces of each object resource.
    pub include_nav_ifcs: bool,
    /// Expand plain references to other interfaces.
    pub include_ref_ifcs: bool,
    /// Expand link-to references to other interfaces.
    pub include_linkto_data: bool,
    /// Always return a list, also for univalent steps.
    pub force_list: bool,
    /// Maximum expansion depth; `None` expands everything.
    pub depth: Option<u32>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            include_meta_data: true,
            include_nav_ifcs: true,
            include_ref_ifcs: true,
            include_linkto_data: false,
            force_list: false,
            depth: None,
        }
    }
}

impl Options {
    /// Options for a bare, metadata-free read, as used by field access.
    pub fn bare() -> Self {
        Self {
            include_meta_data: false,
            include_nav_ifcs: false,
            include_ref_ifcs: true,
            include_linkto_data: true,
            force_list: false,
            depth: Some(1),
        }
    }

    /// Every flag off and unlimited depth, the starting point for request query flags.
    pub fn minimal() -> Self {
        Self {
            include_meta_data: false,
            include_nav_ifcs: false,
            include_ref_ifcs: false,
            include_linkto_data: false,
            force_list: false,
            depth: None,
        }
    }

    /// The options for content nested below the requested object.
    ///
    /// `force_list` shapes only the top-level result.
    pub fn nested(&self) -> Self {
        Self {
            force_list: false,
            ..*self
        }
    }

    /// The depth for one level further down, `None` if unlimited.
    pub fn child_depth(depth: Option<u32>) -> Option<u32> {
        depth.map(|d| d.saturating_sub(1))
    }
}

/// The (interface, atom) pairs already expanded on the current branch.
///
/// Expanding a reference that is already on the branch would recurse forever; such
/// references degrade to plain identifiers instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecursionGuard {
    visited: Vec<(String, String)>,
}

impl RecursionGuard {
    /// An empty guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the guard extended with `(ifc, atom)`, or `None` if the pair is on the branch.
    pub fn enter(&self, ifc: &str, atom: &str) -> Option<RecursionGuard> {
        if self.contains(ifc, atom) {
            return None;
        }
        let mut visited = self.visited.clone();
        visited.push((ifc.to_string(), atom.to_string()));
        Some(RecursionGuard { visited })
    }

    /// True if `(ifc, atom)` is on the branch.
    pub fn contains(&self, ifc: &str, atom: &str) -> bool {
        self.visited.iter().any(|(i, a)| i == ifc && a == atom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_is_per_branch() {
        let root = RecursionGuard::new();
        let a = root.enter("People", "p1").unwrap();
        assert!(a.enter("People", "p1").is_none());
        let b = a.enter("People", "p2").unwrap();
        assert!(b.contains("People", "p1"));
        assert!(!root.contains("People", "p1"));
        assert!(root.enter("People", "p1").is_some());
    }

    #[test]
    fn child_depth_saturates() {
        assert_eq!(Options::child_depth(None), None);
        assert_eq!(Options::child_depth(Some(2)), Some(1));
        assert_eq!(Options::child_depth(Some(0)), Some(0));
    }

    #[test]
    fn defaults() {
        let o = Options::default();
        assert!(o.include_meta_data && o.include_nav_ifcs && o.include_ref_ifcs);
        assert!(!o.include_linkto_data && !o.force_list);
        let m = Options::minimal();
        assert!(!m.include_meta_data && !m.include_nav_ifcs && !m.include_ref_ifcs);
        assert_eq!(m.depth, None);
    }

    #[test]
    fn nested_options_drop_force_list() {
        let top = Options {
            force_list: true,
            depth: Some(3),
            ..Options::default()
        };
        let nested = top.nested();
        assert!(!nested.force_list);
        assert_eq!(nested.depth, Some(3));
        assert!(nested.include_meta_data);
    }
}
