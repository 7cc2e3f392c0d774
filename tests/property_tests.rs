use dedupe_flatten::flatten::{FlattenConfig, Flattener, NameResolver};
use dedupe_flatten::scanner::Hasher;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const DIRS: &[&str] = &["", "a", "b", "a/c", "b/c/d"];
const NAMES: &[&str] = &["x.txt", "y.txt", "z", ".rc", "x_1.txt"];

fn tree_strategy() -> impl Strategy<Value = BTreeMap<PathBuf, Vec<u8>>> {
    prop::collection::vec((0..DIRS.len(), 0..NAMES.len(), 0u8..4, 0usize..3), 0..20).prop_map(
        |specs| {
            specs
                .into_iter()
                .map(|(d, n, byte, len)| {
                    (
                        Path::new(DIRS[d]).join(NAMES[n]),
                        vec![byte; len],
                    )
                })
                .collect()
        },
    )
}

fn build(root: &Path, tree: &BTreeMap<PathBuf, Vec<u8>>) {
    for (rel, content) in tree {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
}

fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    fn visit(root: &Path, dir: &Path, out: &mut BTreeMap<PathBuf, Vec<u8>>) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                visit(root, &path, out);
            } else {
                out.insert(
                    path.strip_prefix(root).unwrap().to_path_buf(),
                    fs::read(&path).unwrap(),
                );
            }
        }
    }
    let mut out = BTreeMap::new();
    visit(root, root, &mut out);
    out
}

fn sorted_contents(files: &BTreeMap<PathBuf, Vec<u8>>) -> Vec<Vec<u8>> {
    let mut all: Vec<Vec<u8>> = files.values().cloned().collect();
    all.sort();
    all
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn test_flatten_preserves_every_file(tree in tree_strategy()) {
        let dir = TempDir::new().unwrap();
        build(dir.path(), &tree);

        let report = Flattener::new(FlattenConfig::default()).run(dir.path()).unwrap();
        let after = snapshot(dir.path());

        // Invariant: the multiset of contents is unchanged
        prop_assert_eq!(sorted_contents(&after), sorted_contents(&tree));
        prop_assert_eq!(report.files.len(), tree.len());
        prop_assert!(!report.has_failures());

        // Invariant: only the root and the quarantine folder hold files
        for rel in after.keys() {
            let parent = rel.parent().unwrap();
            prop_assert!(parent == Path::new("") || parent == Path::new("_duplicates"));
        }

        // Invariant: the root holds exactly one file per distinct content
        let kept: Vec<&Vec<u8>> = after
            .iter()
            .filter(|(rel, _)| rel.parent() == Some(Path::new("")))
            .map(|(_, content)| content)
            .collect();
        let distinct: BTreeSet<&Vec<u8>> = tree.values().collect();
        prop_assert_eq!(kept.len(), distinct.len());
        prop_assert_eq!(kept.into_iter().collect::<BTreeSet<_>>(), distinct);

        // Invariant: no subdirectory other than the quarantine folder survives
        for entry in fs::read_dir(dir.path()).unwrap() {
            let entry = entry.unwrap();
            if entry.file_type().unwrap().is_dir() {
                prop_assert_eq!(entry.file_name(), "_duplicates");
            }
        }
    }

    #[test]
    fn test_flatten_is_idempotent(tree in tree_strategy()) {
        let dir = TempDir::new().unwrap();
        build(dir.path(), &tree);

        let flattener = Flattener::new(FlattenConfig::default());
        flattener.run(dir.path()).unwrap();
        let first = snapshot(dir.path());

        let report = flattener.run(dir.path()).unwrap();
        let summary = report.summary();

        prop_assert_eq!(snapshot(dir.path()), first);
        prop_assert_eq!(summary.moved, 0);
        prop_assert_eq!(summary.duplicates, 0);
        prop_assert_eq!(summary.failed, 0);
    }

    #[test]
    fn test_fingerprint_determinism(content in prop::collection::vec(any::<u8>(), 0..4096)) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.bin");
        fs::write(&path, &content).unwrap();

        let small = Hasher::new().with_buffer_size(1024);
        let large = Hasher::new();

        prop_assert_eq!(small.fingerprint(&path).unwrap(), large.fingerprint(&path).unwrap());
        prop_assert_eq!(large.fingerprint(&path).unwrap(), *blake3::hash(&content).as_bytes());
    }

    #[test]
    fn test_resolved_name_is_free(taken in prop::collection::btree_set(0u32..6, 0..6)) {
        let dir = TempDir::new().unwrap();
        for n in &taken {
            let name = if *n == 0 { "f.txt".to_string() } else { format!("f_{n}.txt") };
            fs::write(dir.path().join(name), b"").unwrap();
        }

        let resolved = NameResolver::new(10)
            .resolve(dir.path(), "f.txt".as_ref())
            .unwrap();

        prop_assert!(!resolved.exists());
        prop_assert_eq!(resolved.parent().unwrap(), dir.path());
        let first_free = (0u32..).find(|n| !taken.contains(n)).unwrap();
        let expected = if first_free == 0 { "f.txt".to_string() } else { format!("f_{first_free}.txt") };
        prop_assert_eq!(resolved.file_name().unwrap().to_str().unwrap(), expected.as_str());
    }
}
