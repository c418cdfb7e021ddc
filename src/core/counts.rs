/// Counters accumulated during a field-conversion pass.
///
/// Each task owns its own counts and they are merged at join points, so the
/// parallel directory workers stay composable and testable in isolation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvertCounts {
    /// Records scanned
    pub records: u64,
    /// New fields added (word-id fields, including resolved arrays)
    pub fields_added: u64,
    /// Existing fields changed (phrase rewrites and overwrites)
    pub fields_changed: u64,
    /// Genome identifiers that could not be resolved
    pub genomes_missing: u64,
    /// Feature identifiers that could not be resolved
    pub features_missing: u64,
}

impl ConvertCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold another task's counts into this one.
    pub fn merge(&mut self, other: &Self) {
        self.records += other.records;
        self.fields_added += other.fields_added;
        self.fields_changed += other.fields_changed;
        self.genomes_missing += other.genomes_missing;
        self.features_missing += other.features_missing;
    }
}

impl std::fmt::Display for ConvertCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} records scanned, {} fields added, {} changed; {} genomes and {} features not found",
            self.records,
            self.fields_added,
            self.fields_changed,
            self.genomes_missing,
            self.features_missing
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge() {
        let mut a = ConvertCounts {
            records: 10,
            fields_added: 3,
            fields_changed: 1,
            genomes_missing: 0,
            features_missing: 2,
        };
        let b = ConvertCounts {
            records: 5,
            fields_added: 2,
            fields_changed: 4,
            genomes_missing: 1,
            features_missing: 0,
        };
        a.merge(&b);
        assert_eq!(a.records, 15);
        assert_eq!(a.fields_added, 5);
        assert_eq!(a.fields_changed, 5);
        assert_eq!(a.genomes_missing, 1);
        assert_eq!(a.features_missing, 2);
    }
}
