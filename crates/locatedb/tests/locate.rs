use std::fs::{self, File};
use std::path::{Path, PathBuf};

use locatedb::{
    CancellationToken, IndexManager, QueryOptions, QueryOutcome, UpdateOptions,
};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Create a directory tree for indexing.
///
/// Structure:
/// ```text
/// root/
///   invoice_jan.txt
///   invoice_feb.txt
///   Report.pdf
///   notes.md
///   subdir/
///     invoice_mar.txt
///     deep/
///       archive.tar
/// ```
fn setup_tree(root: &Path) {
    fs::write(root.join("invoice_jan.txt"), "january").unwrap();
    fs::write(root.join("invoice_feb.txt"), "february").unwrap();
    fs::write(root.join("Report.pdf"), "quarterly").unwrap();
    fs::write(root.join("notes.md"), "notes").unwrap();

    let sub = root.join("subdir");
    fs::create_dir(&sub).unwrap();
    fs::write(sub.join("invoice_mar.txt"), "march").unwrap();

    let deep = sub.join("deep");
    fs::create_dir(&deep).unwrap();
    fs::write(deep.join("archive.tar"), "bytes").unwrap();
}

struct Fixture {
    _temp: TempDir,
    manager: IndexManager,
    root: PathBuf,
}

fn setup() -> Fixture {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("root");
    fs::create_dir(&root).unwrap();
    setup_tree(&root);

    let manager = IndexManager::open(temp.path().join("index.db")).unwrap();
    manager
        .update(vec![root.clone()], &UpdateOptions::default())
        .unwrap()
        .expect("update not cancelled");

    // The walk canonicalizes roots; resolve the fixture root the same way.
    let root = fs::canonicalize(&root).unwrap();
    Fixture {
        _temp: temp,
        manager,
        root,
    }
}

fn paths(outcome: Option<QueryOutcome>) -> Vec<String> {
    outcome
        .expect("query not cancelled")
        .into_records()
        .into_iter()
        .map(|record| record.full_path)
        .collect()
}

fn basenames(outcome: Option<QueryOutcome>) -> Vec<String> {
    outcome
        .expect("query not cancelled")
        .into_records()
        .into_iter()
        .map(|record| record.basename)
        .collect()
}

// ---------------------------------------------------------------------------
// Query semantics
// ---------------------------------------------------------------------------

#[test]
fn star_returns_every_indexed_path() {
    let fixture = setup();
    let all = paths(
        fixture
            .manager
            .query("*", &QueryOptions::default())
            .unwrap(),
    );

    // 6 files + root + subdir + deep = 9 records.
    assert_eq!(all.len(), 9);
    let mut sorted = all.clone();
    sorted.sort();
    assert_eq!(all, sorted, "results are in lexicographic path order");

    // Deterministic on repeat.
    let again = paths(
        fixture
            .manager
            .query("*", &QueryOptions::default())
            .unwrap(),
    );
    assert_eq!(all, again);
}

#[test]
fn substring_search_without_wildcards() {
    let fixture = setup();
    let found = basenames(
        fixture
            .manager
            .query("invoice", &QueryOptions::default())
            .unwrap(),
    );
    assert_eq!(
        found,
        vec!["invoice_feb.txt", "invoice_jan.txt", "invoice_mar.txt"]
    );
}

#[test]
fn question_mark_matches_exactly_one_character() {
    let fixture = setup();
    let write = |name: &str| fs::write(fixture.root.join(name), "x").unwrap();
    write("abc");
    write("axc");
    write("ac");
    write("abbc");
    fixture
        .manager
        .update(vec![fixture.root.clone()], &UpdateOptions::default())
        .unwrap()
        .unwrap();

    let options = QueryOptions {
        basename_only: true,
        ..QueryOptions::default()
    };
    let found = basenames(fixture.manager.query("a?c", &options).unwrap());
    assert_eq!(found, vec!["abc", "axc"]);
}

#[test]
fn case_insensitive_query_folds_both_sides() {
    let fixture = setup();
    fs::write(fixture.root.join("file.txt"), "x").unwrap();
    fixture
        .manager
        .update(vec![fixture.root.clone()], &UpdateOptions::default())
        .unwrap()
        .unwrap();

    let options = QueryOptions {
        case_sensitive: false,
        basename_only: true,
        ..QueryOptions::default()
    };
    let found = basenames(fixture.manager.query("File", &options).unwrap());
    assert_eq!(found, vec!["file.txt"]);

    // Case-sensitive default does not match.
    let strict = QueryOptions {
        basename_only: true,
        ..QueryOptions::default()
    };
    assert!(basenames(fixture.manager.query("File", &strict).unwrap()).is_empty());
}

#[test]
fn limit_is_deterministic_and_applied_after_ordering() {
    let fixture = setup();
    let options = QueryOptions {
        limit: Some(2),
        ..QueryOptions::default()
    };
    let first = paths(fixture.manager.query("invoice", &options).unwrap());
    assert_eq!(first.len(), 2);

    let unlimited = paths(
        fixture
            .manager
            .query("invoice", &QueryOptions::default())
            .unwrap(),
    );
    assert_eq!(unlimited.len(), 3);
    // The limited result is the ordered prefix of the unlimited one.
    assert_eq!(first, unlimited[..2].to_vec());

    let again = paths(fixture.manager.query("invoice", &options).unwrap());
    assert_eq!(first, again);
}

#[test]
fn count_only_agrees_with_materialized_results() {
    let fixture = setup();
    let count_options = QueryOptions {
        count_only: true,
        ..QueryOptions::default()
    };
    let counted = fixture
        .manager
        .query("invoice", &count_options)
        .unwrap()
        .unwrap();
    let materialized = fixture
        .manager
        .query("invoice", &QueryOptions::default())
        .unwrap()
        .unwrap();
    assert_eq!(counted, QueryOutcome::Count(materialized.len()));
}

#[test]
fn no_match_is_an_empty_result_not_an_error() {
    let fixture = setup();
    let outcome = fixture
        .manager
        .query("definitely-not-present", &QueryOptions::default())
        .unwrap()
        .unwrap();
    assert!(outcome.is_empty());
}

#[test]
fn basename_roundtrip_finds_exactly_the_files_on_disk() {
    let fixture = setup();

    // Collect every basename actually present under the root.
    let mut on_disk = Vec::new();
    let mut stack = vec![fixture.root.clone()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let entry = entry.unwrap();
            on_disk.push(entry.file_name().to_string_lossy().into_owned());
            if entry.file_type().unwrap().is_dir() {
                stack.push(entry.path());
            }
        }
    }

    let options = QueryOptions {
        basename_only: true,
        ..QueryOptions::default()
    };
    for name in on_disk {
        let found = basenames(fixture.manager.query(&name, &options).unwrap());
        assert!(
            found.contains(&name),
            "basename query for {name:?} should find the file"
        );
        for hit in found {
            assert!(
                hit.contains(&name),
                "basename query for {name:?} matched unrelated {hit:?}"
            );
        }
    }
}

#[test]
fn query_results_stay_inside_the_indexed_root() {
    let temp = TempDir::new().unwrap();
    let indexed = temp.path().join("indexed");
    let outside = temp.path().join("outside");
    fs::create_dir(&indexed).unwrap();
    fs::create_dir(&outside).unwrap();
    fs::write(indexed.join("shared-name.txt"), "in").unwrap();
    fs::write(outside.join("shared-name.txt"), "out").unwrap();

    let manager = IndexManager::open(temp.path().join("index.db")).unwrap();
    manager
        .update(vec![indexed.clone()], &UpdateOptions::default())
        .unwrap()
        .unwrap();

    let found = paths(
        manager
            .query("shared-name", &QueryOptions::default())
            .unwrap(),
    );
    assert_eq!(found.len(), 1);
    assert!(found[0].contains("indexed"));
}

// ---------------------------------------------------------------------------
// Update semantics
// ---------------------------------------------------------------------------

#[test]
fn reindexing_replaces_deleted_records() {
    let fixture = setup();
    fs::remove_file(fixture.root.join("notes.md")).unwrap();

    fixture
        .manager
        .update(vec![fixture.root.clone()], &UpdateOptions::default())
        .unwrap()
        .unwrap();

    let found = paths(
        fixture
            .manager
            .query("notes.md", &QueryOptions::default())
            .unwrap(),
    );
    assert!(found.is_empty(), "deleted file must not survive a reindex");
}

#[test]
fn updating_one_root_keeps_the_other() {
    let temp = TempDir::new().unwrap();
    let a = temp.path().join("a");
    let b = temp.path().join("b");
    fs::create_dir(&a).unwrap();
    fs::create_dir(&b).unwrap();
    fs::write(a.join("alpha.txt"), "x").unwrap();
    fs::write(b.join("beta.txt"), "x").unwrap();

    let manager = IndexManager::open(temp.path().join("index.db")).unwrap();
    manager
        .update(vec![a.clone()], &UpdateOptions::default())
        .unwrap()
        .unwrap();
    manager
        .update(vec![b.clone()], &UpdateOptions::default())
        .unwrap()
        .unwrap();

    assert_eq!(
        basenames(manager.query("alpha", &QueryOptions::default()).unwrap()),
        vec!["alpha.txt"]
    );
    assert_eq!(
        basenames(manager.query("beta", &QueryOptions::default()).unwrap()),
        vec!["beta.txt"]
    );

    // Re-updating `a` after a change leaves `b` records untouched.
    fs::remove_file(a.join("alpha.txt")).unwrap();
    manager
        .update(vec![a], &UpdateOptions::default())
        .unwrap()
        .unwrap();
    assert!(basenames(manager.query("alpha", &QueryOptions::default()).unwrap()).is_empty());
    assert_eq!(
        basenames(manager.query("beta", &QueryOptions::default()).unwrap()),
        vec!["beta.txt"]
    );
}

#[test]
fn index_survives_reopen() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("root");
    fs::create_dir(&root).unwrap();
    setup_tree(&root);
    let db = temp.path().join("index.db");

    {
        let manager = IndexManager::open(&db).unwrap();
        manager
            .update(vec![root.clone()], &UpdateOptions::default())
            .unwrap()
            .unwrap();
    }

    let reopened = IndexManager::open(&db).unwrap();
    let found = basenames(
        reopened
            .query("invoice", &QueryOptions::default())
            .unwrap(),
    );
    assert_eq!(found.len(), 3);

    let stats = reopened.stats();
    assert_eq!(stats.record_count, 9);
    assert_eq!(stats.root_count, 1);
    assert!(stats.generation_timestamp.is_some());
    assert!(stats.size_bytes_on_disk > 0);
}

#[test]
fn duplicate_and_nested_roots_collapse() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("root");
    fs::create_dir(&root).unwrap();
    setup_tree(&root);

    let manager = IndexManager::open(temp.path().join("index.db")).unwrap();
    let summary = manager
        .update(
            vec![root.clone(), root.join("subdir"), root.clone()],
            &UpdateOptions::default(),
        )
        .unwrap()
        .unwrap();

    // Nested and duplicate roots traverse once: same record count as a
    // single-root update.
    assert_eq!(summary.records_indexed, 9);
    assert_eq!(manager.stats().root_count, 1);
}

#[test]
fn cancelled_update_leaves_prior_generation_intact() {
    let fixture = setup();
    let before = paths(
        fixture
            .manager
            .query("*", &QueryOptions::default())
            .unwrap(),
    );

    let cancel = CancellationToken::new();
    cancel.cancel();
    let outcome = fixture
        .manager
        .update(
            vec![fixture.root.clone()],
            &UpdateOptions {
                cancel,
                ..UpdateOptions::default()
            },
        )
        .unwrap();
    assert!(outcome.is_none(), "cancelled update reports no summary");

    let after = paths(
        fixture
            .manager
            .query("*", &QueryOptions::default())
            .unwrap(),
    );
    assert_eq!(before, after);
}

#[test]
fn cancelled_query_returns_no_result() {
    let fixture = setup();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let outcome = fixture
        .manager
        .query(
            "*",
            &QueryOptions {
                cancel,
                ..QueryOptions::default()
            },
        )
        .unwrap();
    assert!(outcome.is_none());
}

#[cfg(unix)]
#[test]
fn unreadable_directory_does_not_abort_siblings() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    let root = temp.path().join("root");
    fs::create_dir(&root).unwrap();
    let locked = root.join("locked");
    fs::create_dir(&locked).unwrap();
    File::create(locked.join("hidden.txt")).unwrap();
    fs::write(root.join("visible.txt"), "x").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users ignore file modes; nothing to observe then.
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let manager = IndexManager::open(temp.path().join("index.db")).unwrap();
    let summary = manager
        .update(vec![root], &UpdateOptions::default())
        .unwrap()
        .unwrap();

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    assert!(summary.errors_skipped >= 1);
    let found = basenames(manager.query("visible", &QueryOptions::default()).unwrap());
    assert_eq!(found, vec!["visible.txt"]);
}
