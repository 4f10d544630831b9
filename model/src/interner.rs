//! Deduplicates short, frequently-repeated strings (author names, tag
//! names, revision strings) behind a single `Arc<str>` per unique value,
//! so that the graph can hold cheap clones instead of repeated
//! allocations.

use std::{collections::HashMap, sync::Arc};

#[derive(Debug, Default)]
pub struct Interner {
    values: HashMap<Arc<str>, Arc<str>>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, s: &str) -> Arc<str> {
        if let Some(existing) = self.values.get(s) {
            return existing.clone();
        }
        let arc: Arc<str> = Arc::from(s);
        self.values.insert(arc.clone(), arc.clone());
        arc
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_dedups() {
        let mut interner = Interner::new();
        let a = interner.intern("alice");
        let b = interner.intern("alice");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(interner.len(), 1);

        interner.intern("bob");
        assert_eq!(interner.len(), 2);
    }
}
