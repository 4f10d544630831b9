use std::{collections::HashMap, path::PathBuf, sync::Arc, time::SystemTime};

use revstr::Rev;

use crate::ids::{FileId, PatchSetId, RevisionId, SymbolId, TagId};

// A tiny bespoke bitflags-like macro: the corpus doesn't carry the
// `bitflags` crate, and TagFlags is small enough that rolling the few
// methods we need (empty/insert/contains/bits) by hand is simpler than
// adding a dependency for four constants.
macro_rules! bitflags_like {
    (
        $(#[$meta:meta])*
        pub struct $name:ident: $repr:ty {
            $(const $variant:ident = $value:expr;)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub struct $name($repr);

        impl $name {
            $(pub const $variant: $name = $name($value);)*

            pub const fn empty() -> Self {
                $name(0)
            }

            pub fn insert(&mut self, other: Self) {
                self.0 |= other.0;
            }

            pub fn contains(&self, other: Self) -> bool {
                (self.0 & other.0) == other.0 && other.0 != 0
            }

            pub fn is_empty(&self) -> bool {
                self.0 == 0
            }

            pub fn bits(&self) -> $repr {
                self.0
            }
        }

        impl std::ops::BitOr for $name {
            type Output = Self;

            fn bitor(self, rhs: Self) -> Self {
                $name(self.0 | rhs.0)
            }
        }
    };
}

bitflags_like! {
    /// Tag/patch-set anomaly flags, matching the historical `TAG_*` bit
    /// values so that their numeric meaning stays stable across logs.
    pub struct TagFlags: u8 {
        const SPLIT = 0x1;
        const INVALID = 0x2;
        const FUNKY = 0x4;
        const LATE = 0x8;
    }
}

/// A file known to the graph, identified by its repository-relative path.
#[derive(Debug, Clone)]
pub struct File {
    pub path: PathBuf,
    pub revisions: HashMap<Arc<str>, RevisionId>,
    pub symbols: HashMap<Arc<str>, TagId>,
    pub head_tag: Option<TagId>,
    /// Set once the symbolic-names block has been fully parsed and branch
    /// tags are resolvable; false while still in the symbol-table build
    /// phase for this file.
    pub have_branches: bool,
}

impl File {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            revisions: HashMap::new(),
            symbols: HashMap::new(),
            head_tag: None,
            have_branches: false,
        }
    }
}

/// One revision of one file.
#[derive(Debug, Clone)]
pub struct Revision {
    pub file: FileId,
    pub rev: Rev,
    pub rev_str: Arc<str>,
    pub date: SystemTime,
    /// The commit author and log message as reported by this one
    /// file's log entry, prior to patch-set grouping (SPEC_FULL.md §4.3
    /// groups revisions that share these two fields within a branch).
    pub author: Arc<str>,
    pub message: Arc<str>,
    pub dead: bool,
    pub branch_add: bool,
    pub import_add: bool,
    /// Confirmed by an actual log entry, as opposed to only referenced by
    /// a symbolic tag that may point at a revision we never saw.
    pub present: bool,
    pub bad_funk: bool,
    pub shadow: bool,

    pub branch: Option<TagId>,
    pub ps: Option<PatchSetId>,
    pub prev_rev: Option<RevisionId>,
    pub next_rev: Option<RevisionId>,
    pub branch_children: Vec<RevisionId>,
    pub tags: Vec<TagId>,
    pub vendor_shadow: Option<RevisionId>,
}

impl Revision {
    pub fn new(file: FileId, rev: Rev, rev_str: Arc<str>, date: SystemTime) -> Self {
        Self {
            file,
            rev,
            rev_str,
            date,
            author: Arc::from(""),
            message: Arc::from(""),
            dead: false,
            branch_add: false,
            import_add: false,
            present: false,
            bad_funk: false,
            shadow: false,
            branch: None,
            ps: None,
            prev_rev: None,
            next_rev: None,
            branch_children: Vec::new(),
            tags: Vec::new(),
            vendor_shadow: None,
        }
    }
}

/// The kind of branch identity a [`Tag`] carries: a plain static tag has
/// no branch id at all; a named branch has a positive leaf id; a vendor
/// branch's id is conceptually negative (tracked here as an explicit
/// variant rather than a signed magnitude, since that reads better in
/// Rust than the historical sign trick).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchKind {
    Static,
    Branch(u32),
    Vendor(u32),
}

impl BranchKind {
    pub fn is_branch(&self) -> bool {
        !matches!(self, BranchKind::Static)
    }

    pub fn is_vendor(&self) -> bool {
        matches!(self, BranchKind::Vendor(_))
    }

    pub fn leaf(&self) -> Option<u32> {
        match self {
            BranchKind::Static => None,
            BranchKind::Branch(n) | BranchKind::Vendor(n) => Some(*n),
        }
    }
}

/// An occurrence of a symbolic name on one revision of one file.
#[derive(Debug, Clone)]
pub struct Tag {
    pub sym: SymbolId,
    pub rev: RevisionId,
    pub branch: BranchKind,
    pub flags: TagFlags,
    /// The tag references a revision that logically predates the file's
    /// existence on this branch (it is itself a `branch_add` revision or
    /// lies on a vendor branch).
    pub dead_init: bool,
}

impl Tag {
    pub fn new(sym: SymbolId, rev: RevisionId, branch: BranchKind) -> Self {
        Self {
            sym,
            rev,
            branch,
            flags: TagFlags::empty(),
            dead_init: false,
        }
    }
}

/// A project-wide symbolic name shared across files.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: Option<Arc<str>>,
    pub ps: Option<PatchSetId>,
    /// 2 = trunk, 3 = a branch off trunk, ... the low bit distinguishes
    /// whether the symbol is itself of branch kind.
    pub depth: u16,
    pub flags: TagFlags,
    pub tags: Vec<TagId>,
    /// Populated only for branches that have commits: the ordered list
    /// of patch sets on this branch.
    pub patch_sets: Vec<PatchSetId>,
    /// Diagnostic-only best-effort ancestry hint (SPEC_FULL.md §4.5.1);
    /// never consulted by the resolver, comparator, or sorter.
    pub ancestor_branch: Option<Arc<str>>,
}

impl Symbol {
    pub fn new(name: Option<Arc<str>>, depth: u16) -> Self {
        Self {
            name,
            ps: None,
            depth,
            flags: TagFlags::empty(),
            tags: Vec::new(),
            patch_sets: Vec::new(),
            ancestor_branch: None,
        }
    }
}
