use std::{collections::HashMap, path::Path, path::PathBuf, sync::Arc, time::SystemTime};

use revstr::Rev;

use crate::{
    error::Error,
    ids::{FileId, PatchSetId, RevisionId, SymbolId, TagId},
    interner::Interner,
    types::{BranchKind, File, Revision, Symbol, Tag},
};

/// The in-memory File/Revision/Tag/Symbol graph (SPEC_FULL.md §3). Owns
/// every entity by value in a flat arena indexed by its id newtype; all
/// cross-references are by id, never by borrow, so the graph can be
/// mutated freely during the build phase without fighting the borrow
/// checker.
#[derive(Debug, Default)]
pub struct Model {
    files: Vec<File>,
    by_path: HashMap<PathBuf, FileId>,

    revisions: Vec<Revision>,

    tags: Vec<Tag>,

    symbols: Vec<Symbol>,
    by_name: HashMap<Arc<str>, SymbolId>,

    strings: Interner,
    messages: Interner,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    // -- files ------------------------------------------------------

    pub fn get_or_create_file(&mut self, path: &Path) -> FileId {
        if let Some(id) = self.by_path.get(path) {
            return *id;
        }
        let id = FileId::from(self.files.len());
        self.files.push(File::new(path.to_path_buf()));
        self.by_path.insert(path.to_path_buf(), id);
        id
    }

    pub fn find_file(&self, path: &Path) -> Option<FileId> {
        self.by_path.get(path).copied()
    }

    pub fn file(&self, id: FileId) -> &File {
        &self.files[id.index()]
    }

    pub fn file_mut(&mut self, id: FileId) -> &mut File {
        &mut self.files[id.index()]
    }

    pub fn file_ids(&self) -> impl Iterator<Item = FileId> {
        (0..self.files.len()).map(FileId::from)
    }

    // -- revisions ----------------------------------------------------

    /// Gets the existing revision for `rev_str` on `file_id`, or creates
    /// it. Mirrors the historical hash-table-backed get-or-create used
    /// while walking the log (`cvs_file_add_revision`).
    pub fn get_or_create_revision(
        &mut self,
        file_id: FileId,
        rev_str: &str,
        date: SystemTime,
    ) -> Result<RevisionId, Error> {
        if let Some(id) = self.file(file_id).revisions.get(rev_str) {
            return Ok(*id);
        }

        let rev = Rev::parse(rev_str).map_err(|e| Error::InvalidRevision(rev_str.into(), e))?;
        let interned = self.strings.intern(rev_str);
        let id = RevisionId::from(self.revisions.len());
        self.revisions
            .push(Revision::new(file_id, rev, interned.clone(), date));
        self.file_mut(file_id)
            .revisions
            .insert(interned, id);
        Ok(id)
    }

    /// Allocates a synthetic shadow revision (SPEC_FULL.md §4.3 vendor
    /// shadows): a Revision entity with its own id, but not registered
    /// under `rev_str` in the owning File's lookup table, since its
    /// identity is borrowed from the vendor revision it mirrors and would
    /// otherwise collide with it.
    pub fn push_shadow_revision(&mut self, file_id: FileId, rev: Rev, rev_str: Arc<str>, date: SystemTime) -> RevisionId {
        let id = RevisionId::from(self.revisions.len());
        self.revisions.push(Revision::new(file_id, rev, rev_str, date));
        id
    }

    pub fn find_revision(&self, file_id: FileId, rev_str: &str) -> Option<RevisionId> {
        self.file(file_id).revisions.get(rev_str).copied()
    }

    pub fn revision(&self, id: RevisionId) -> &Revision {
        &self.revisions[id.index()]
    }

    pub fn revision_mut(&mut self, id: RevisionId) -> &mut Revision {
        &mut self.revisions[id.index()]
    }

    pub fn revision_ids(&self) -> impl Iterator<Item = RevisionId> {
        (0..self.revisions.len()).map(RevisionId::from)
    }

    /// Records the author/log message a revision's own file entry
    /// reported, interning both through the shared tables so patch-set
    /// aggregation can compare by pointer rather than by string content.
    pub fn set_revision_log(&mut self, id: RevisionId, author: &str, message: &str) {
        let author = self.strings.intern(author);
        let message = self.messages.intern(message);
        let rev = self.revision_mut(id);
        rev.author = author;
        rev.message = message;
    }

    // -- tags -----------------------------------------------------------

    /// Registers a tag of `name` on `rev_id`, creating (or reusing) its
    /// project-wide [`Symbol`]. Branch tags are prepended to the
    /// revision's tag list; static tags are appended — the historical
    /// implementation relies on this ordering to find the active branch
    /// tag quickly (branches-first, then statics).
    pub fn add_tag(
        &mut self,
        file_id: FileId,
        name: Option<&str>,
        rev_id: RevisionId,
        branch: BranchKind,
        depth: u16,
    ) -> TagId {
        let sym_id = match name {
            Some(name) => self.get_or_create_named_symbol(name, depth),
            None => self.create_unnamed_symbol(depth),
        };

        let tag_id = TagId::from(self.tags.len());
        self.tags.push(Tag::new(sym_id, rev_id, branch));

        self.symbol_mut(sym_id).tags.push(tag_id);
        if branch.is_branch() {
            self.revision_mut(rev_id).tags.insert(0, tag_id);
        } else {
            self.revision_mut(rev_id).tags.push(tag_id);
        }

        if let Some(name) = name {
            let interned = self.strings.intern(name);
            self.file_mut(file_id).symbols.insert(interned, tag_id);
        }

        tag_id
    }

    pub fn tag(&self, id: TagId) -> &Tag {
        &self.tags[id.index()]
    }

    pub fn tag_mut(&mut self, id: TagId) -> &mut Tag {
        &mut self.tags[id.index()]
    }

    // -- symbols ----------------------------------------------------------

    pub fn get_or_create_named_symbol(&mut self, name: &str, depth: u16) -> SymbolId {
        let interned = self.strings.intern(name);
        if let Some(id) = self.by_name.get(&interned) {
            return *id;
        }
        let id = SymbolId::from(self.symbols.len());
        self.symbols.push(Symbol::new(Some(interned.clone()), depth));
        self.by_name.insert(interned, id);
        id
    }

    pub fn create_unnamed_symbol(&mut self, depth: u16) -> SymbolId {
        let id = SymbolId::from(self.symbols.len());
        self.symbols.push(Symbol::new(None, depth));
        id
    }

    /// The symbol standing in for the trunk itself: revisions with no
    /// explicit branch Tag (their `branch` field is `None`) are on head,
    /// and are grouped under this symbol for aggregation/reporting
    /// purposes exactly as a real branch symbol would be.
    pub fn trunk_symbol(&mut self) -> SymbolId {
        self.get_or_create_named_symbol("HEAD", 2)
    }

    /// Folds `drop` into `keep`: retargets every one of `drop`'s Tags to
    /// point at `keep` and splices their tag/patch-set lists. Used when
    /// two anonymous branch symbols turn out to be the same branch
    /// (SPEC_FULL.md §4.3's unnamed-branch merge). `drop` is left as an
    /// empty husk; the arena never frees entries.
    pub fn merge_symbol(&mut self, keep: SymbolId, drop: SymbolId) {
        if keep == drop {
            return;
        }
        let (drop_tags, drop_patch_sets) = {
            let sym = &mut self.symbols[drop.index()];
            (std::mem::take(&mut sym.tags), std::mem::take(&mut sym.patch_sets))
        };
        for &tag_id in &drop_tags {
            self.tags[tag_id.index()].sym = keep;
        }
        let keep_sym = &mut self.symbols[keep.index()];
        keep_sym.tags.extend(drop_tags);
        keep_sym.patch_sets.extend(drop_patch_sets);
    }

    pub fn find_symbol(&self, name: &str) -> Option<SymbolId> {
        self.by_name.get(name).copied()
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.index()]
    }

    pub fn symbol_ids(&self) -> impl Iterator<Item = SymbolId> {
        (0..self.symbols.len()).map(SymbolId::from)
    }

    /// Names every still-anonymous branch symbol `$CVSPS_UNNAMED_BRANCH_<n>`,
    /// in creation order, as the final step of the unnamed-branch merge
    /// pass (SPEC_FULL.md §4.3). Returns how many were named.
    pub fn name_unnamed_branches(&mut self) -> usize {
        let mut n = 0;
        for i in 0..self.symbols.len() {
            if self.symbols[i].name.is_none() {
                n += 1;
                self.symbols[i].name = Some(Arc::from(format!("$CVSPS_UNNAMED_BRANCH_{}", n)));
            }
        }
        n
    }

    // -- interning --------------------------------------------------------

    pub fn intern_author(&mut self, author: &str) -> Arc<str> {
        self.strings.intern(author)
    }

    pub fn intern_message(&mut self, message: &str) -> Arc<str> {
        self.messages.intern(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_get_or_create_file_dedups() {
        let mut model = Model::new();
        let a = model.get_or_create_file(&PathBuf::from("foo.c"));
        let b = model.get_or_create_file(&PathBuf::from("foo.c"));
        assert_eq!(a, b);
        assert_eq!(model.file_ids().count(), 1);
    }

    #[test]
    fn test_get_or_create_revision() {
        let mut model = Model::new();
        let file = model.get_or_create_file(&PathBuf::from("foo.c"));
        let r1 = model
            .get_or_create_revision(file, "1.1", SystemTime::UNIX_EPOCH)
            .unwrap();
        let r2 = model
            .get_or_create_revision(file, "1.1", SystemTime::UNIX_EPOCH)
            .unwrap();
        assert_eq!(r1, r2);
        assert_eq!(model.revision(r1).rev_str.as_ref(), "1.1");
    }

    #[test]
    fn test_add_tag_orders_branch_before_static() {
        let mut model = Model::new();
        let file = model.get_or_create_file(&PathBuf::from("foo.c"));
        let rev = model
            .get_or_create_revision(file, "1.2", SystemTime::UNIX_EPOCH)
            .unwrap();

        model.add_tag(file, Some("V1_0"), rev, BranchKind::Static, 2);
        model.add_tag(file, Some("REL_A"), rev, BranchKind::Branch(2), 3);

        let tags = &model.revision(rev).tags;
        assert_eq!(tags.len(), 2);
        // the branch tag, added second, should have been prepended
        let first_sym = model.tag(tags[0]).sym;
        assert_eq!(model.symbol(first_sym).name.as_deref(), Some("REL_A"));
    }

    #[test]
    fn test_name_unnamed_branches() {
        let mut model = Model::new();
        model.create_unnamed_symbol(3);
        model.create_unnamed_symbol(3);
        let named = model.name_unnamed_branches();
        assert_eq!(named, 2);
        assert_eq!(
            model.symbol(SymbolId::from(0usize)).name.as_deref(),
            Some("$CVSPS_UNNAMED_BRANCH_1")
        );
        assert_eq!(
            model.symbol(SymbolId::from(1usize)).name.as_deref(),
            Some("$CVSPS_UNNAMED_BRANCH_2")
        );
    }
}
