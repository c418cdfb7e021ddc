//! Genome-total merging for combine runs.
//!
//! When several source genomes collapse onto one target, the target's
//! `genome.json` record accumulates the sources' numeric totals and its
//! derived ratios are recomputed.

use serde_json::{json, Value};

use crate::convert::DumpRecord;

/// Count fields summed when genomes merge.
pub const GENOME_TOTALS: &[&str] = &[
    "partial_cds",
    "trna",
    "contigs",
    "chromosomes",
    "cds",
    "rrna",
    "plasmids",
    "hypothetical_cds",
    "patric_cds",
    "plfam_cds",
];

/// Count categories with a `<name>_cds_ratio` derived field.
pub const RATIO_TYPES: &[&str] = &["partial", "hypothetical", "plfam"];

/// Prepare a genome record for first-time output under its new identifier.
///
/// The contig L50/N50 summary statistics are dropped because any later merge
/// into this record would invalidate them.
pub fn rewrite_fresh(genome: &mut DumpRecord, new_id: &str) {
    genome.insert("genome_id".to_string(), json!(new_id));
    genome.shift_remove("contig_l50");
    genome.shift_remove("contig_n50");
}

/// Merge an incoming genome record into an existing target record.
///
/// GC content becomes the length-weighted average, the count totals are
/// summed, and the ratio fields are recomputed from the combined counts.
/// Every ratio defaults to 0.0 when its denominator is zero.
pub fn merge_into(prev: &mut DumpRecord, incoming: &DumpRecord) {
    let old_len = int_field(prev, "genome_length");
    let new_len = int_field(incoming, "genome_length");
    let total_len = old_len + new_len;

    let old_gc = float_field(prev, "gc_content");
    let new_gc = float_field(incoming, "gc_content");
    let gc = if total_len > 0 {
        (old_gc * old_len as f64 + new_gc * new_len as f64) / total_len as f64
    } else {
        0.0
    };
    prev.insert("gc_content".to_string(), json!(gc));
    prev.insert("genome_length".to_string(), json!(total_len));

    for key in GENOME_TOTALS {
        let total = int_field(prev, key) + int_field(incoming, key);
        prev.insert((*key).to_string(), json!(total));
    }

    let cds = int_field(prev, "cds") as f64;
    for name in RATIO_TYPES {
        let ratio = if cds > 0.0 {
            int_field(prev, &format!("{name}_cds")) as f64 / cds
        } else {
            0.0
        };
        prev.insert(format!("{name}_cds_ratio"), json!(ratio));
    }

    let cds_ratio = if total_len > 0 {
        cds * 1000.0 / total_len as f64
    } else {
        0.0
    };
    prev.insert("cds_ratio".to_string(), json!(cds_ratio));
}

fn int_field(record: &DumpRecord, key: &str) -> i64 {
    match record.get(key) {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
        _ => 0,
    }
}

fn float_field(record: &DumpRecord, key: &str) -> f64 {
    match record.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        _ => 0.0,
    }
}
