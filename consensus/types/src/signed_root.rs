use tree_hash::{Hash256, TreeHash};

/// Produces the root that gets signed: `hash_tree_root(SigningData { object_root, domain })`.
///
/// Default-implemented in terms of `TreeHash`; only objects that are ever signed over (blocks,
/// attestation data, voluntary exits, ...) implement this marker.
pub trait SignedRoot: TreeHash {
    fn signing_root(&self, domain: Hash256) -> Hash256 {
        #[derive(tree_hash_derive::TreeHash)]
        struct SigningData {
            object_root: Hash256,
            domain: Hash256,
        }

        SigningData {
            object_root: self.tree_hash_root(),
            domain,
        }
        .tree_hash_root()
    }
}
