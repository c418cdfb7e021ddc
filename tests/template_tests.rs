//! End-to-end template rendering over dump directories.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use genotext::template::{build_global_store, render_directory, GlobalStore};

fn write(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}

#[test]
fn test_main_and_linked_rendering() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "genome.json",
        r#"[{"genome_id": "g1", "genome_name": "alpha", "contigs": 3}]"#,
    );
    write(
        dir.path(),
        "genome_feature.json",
        r#"[{"genome_id": "g1", "product": "thing one"},
            {"genome_id": "g1", "product": "thing two"}]"#,
    );

    let template = "\
## genome description
#main genome.json genome_id
The genome {{genome_name}} has {{contigs}} contigs.
#linked genome_id genome_feature.json
It makes {{product}}.
";

    let out = dir.path().join("out.text");
    let globals = GlobalStore::default();
    let tokens = AtomicU64::new(0);
    let stats = render_directory(dir.path(), template, &globals, &out, &tokens).unwrap();

    let text = std::fs::read_to_string(&out).unwrap();
    assert_eq!(
        text,
        "The genome alpha has 3 contigs. It makes thing one. It makes thing two.\n"
    );
    assert_eq!(stats.records, 1);
    assert_eq!(stats.written, 1);
    assert_eq!(stats.linked, 2);
    assert!(tokens.load(Ordering::Relaxed) > 0);
}

#[test]
fn test_blank_records_are_suppressed() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "genome.json",
        r#"[{"genome_id": "g1", "note": "present"},
            {"genome_id": "g2"}]"#,
    );

    let template = "#main genome.json genome_id\n{{$if:note}}Note: {{note}}{{$fi}}\n";
    let out = dir.path().join("out.text");
    let globals = GlobalStore::default();
    let tokens = AtomicU64::new(0);
    let stats = render_directory(dir.path(), template, &globals, &out, &tokens).unwrap();

    assert_eq!(stats.records, 2);
    assert_eq!(stats.written, 1);
    assert_eq!(
        std::fs::read_to_string(&out).unwrap(),
        "Note: present\n"
    );
}

#[test]
fn test_global_store_feeds_includes() {
    let global_dir = tempfile::tempdir().unwrap();
    write(
        global_dir.path(),
        "genome.json",
        r#"[{"genome_id": "g1", "genome_name": "alpha"}]"#,
    );
    let global_template = "\
#main genome.json genome_id
{{genome_name}} is a well studied genome.
";
    let globals = build_global_store(global_dir.path(), global_template).unwrap();
    assert_eq!(
        globals.text("genome.json", "g1"),
        Some("alpha is a well studied genome.")
    );

    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "subsystem.json",
        r#"[{"subsystem_id": "s1", "genome_id": "g1"},
            {"subsystem_id": "s2", "genome_id": "g9"}]"#,
    );
    let template = "\
#main subsystem.json subsystem_id
{{$include:genome.json:genome_id}}
";
    let out = dir.path().join("out.text");
    let tokens = AtomicU64::new(0);
    let stats = render_directory(dir.path(), template, &globals, &out, &tokens).unwrap();

    // The record whose genome has no stored text renders blank and is dropped.
    assert_eq!(stats.written, 1);
    assert_eq!(
        std::fs::read_to_string(&out).unwrap(),
        "alpha is a well studied genome.\n"
    );
}

#[test]
fn test_choices_rotate_through_renderings() {
    let global_dir = tempfile::tempdir().unwrap();
    write(global_dir.path(), "names.tbl", "first\nAnn\nBob\n");
    write(
        global_dir.path(),
        "genome.json",
        r#"[{"genome_id": "g1", "genome_name": "alpha"}]"#,
    );
    let global_template = "\
#choices names.tbl first
#main genome.json genome_id
{{genome_name}} was sequenced.
";
    let globals = build_global_store(global_dir.path(), global_template).unwrap();

    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "genome.json",
        r#"[{"genome_id": "g1", "genome_name": "alpha"},
            {"genome_id": "g2", "genome_name": "beta"}]"#,
    );
    let template = "\
#main genome.json genome_id
{{$choice:first}} described {{genome_name}}.
";
    let out = dir.path().join("out.text");
    let tokens = AtomicU64::new(0);
    render_directory(dir.path(), template, &globals, &out, &tokens).unwrap();

    assert_eq!(
        std::fs::read_to_string(&out).unwrap(),
        "Ann described alpha.\nBob described beta.\n"
    );
}

#[test]
fn test_choices_rejected_outside_global_run() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "names.tbl", "first\nAnn\n");
    write(dir.path(), "genome.json", r#"[{"genome_id": "g1"}]"#);

    let template = "\
#choices names.tbl first
#main genome.json genome_id
{{genome_id}} here.
";
    let out = dir.path().join("out.text");
    let globals = GlobalStore::default();
    let tokens = AtomicU64::new(0);
    assert!(render_directory(dir.path(), template, &globals, &out, &tokens).is_err());
}
