//! Fuzz target for commit content parsing.
//!
//! Tests that arbitrary commit content produces a parse result or a
//! structured error without panicking.

#![no_main]

use gitmap_graph::GitObject;
use gitmap_odb::{MemoryStore, ObjectType, Resolver};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let store = MemoryStore::new();
    let id = store.put(ObjectType::Commit, data.to_vec());
    let resolver = Resolver::new(store);

    if let Ok(object) = GitObject::create(id, &resolver) {
        let _ = object.links(&resolver);
    }
});
