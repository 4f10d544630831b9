use derive_more::{Display, From, Into};

macro_rules! id_type {
    ($name:ident) => {
        #[derive(
            Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into,
        )]
        pub struct $name(usize);

        impl $name {
            pub fn index(self) -> usize {
                self.0
            }
        }
    };
}

id_type!(FileId);
id_type!(RevisionId);
id_type!(TagId);
id_type!(SymbolId);
id_type!(PatchSetId);
