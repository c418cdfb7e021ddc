use std::collections::HashMap;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::core::Fid;
use crate::mapper::{GenomeContext, IdMapper, MapError};

/// Mapper for combining multiple genomes into one.
///
/// Built from a source-to-target genome table: a genome absent from the table
/// is its own target. The "word" of a genome is its target identifier, so
/// several source genomes can fan in to the same replacement. Features are
/// renumbered into the target namespace with a per-(target, type) counter.
#[derive(Debug, Default)]
pub struct CombineMapper {
    targets: HashMap<String, String>,
    features: DashMap<String, String>,
    counters: DashMap<(String, String), u64>,
}

impl CombineMapper {
    pub fn new(targets: HashMap<String, String>) -> Self {
        Self {
            targets,
            features: DashMap::new(),
            counters: DashMap::new(),
        }
    }

    /// Target genome identifier for a source genome (identity when unmapped).
    pub fn target(&self, genome_id: &str) -> String {
        self.targets
            .get(genome_id)
            .cloned()
            .unwrap_or_else(|| genome_id.to_string())
    }
}

impl IdMapper for CombineMapper {
    fn register_genome(&self, genome_id: &str, name: &str) -> Result<GenomeContext, MapError> {
        if name.trim().is_empty() {
            return Err(MapError::BlankName(genome_id.to_string()));
        }
        Ok(GenomeContext {
            genome_id: genome_id.to_string(),
            word: self.target(genome_id),
        })
    }

    fn register_feature(
        &self,
        ctx: &GenomeContext,
        fid: &str,
        _product: &str,
    ) -> Result<String, MapError> {
        let parsed = Fid::parse(fid).ok_or_else(|| MapError::BadFid(fid.to_string()))?;
        if parsed.genome != ctx.genome_id {
            return Err(MapError::WrongGenome {
                fid: fid.to_string(),
                genome: ctx.genome_id.clone(),
            });
        }
        let new_fid = match self.features.entry(fid.to_string()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let key = (ctx.word.clone(), parsed.ftype.clone());
                let mut counter = self.counters.entry(key).or_insert(0);
                *counter += 1;
                let renumbered = Fid {
                    genome: ctx.word.clone(),
                    ftype: parsed.ftype,
                    num: *counter,
                };
                let new_fid = renumbered.to_string();
                entry.insert(new_fid.clone());
                new_fid
            }
        };
        Ok(new_fid)
    }

    fn register_alias(&self, alt_id: &str, word: &str) {
        self.features.insert(alt_id.to_string(), word.to_string());
    }

    fn genome_word(&self, genome_id: &str) -> Option<String> {
        Some(self.target(genome_id))
    }

    fn feature_word(&self, fid: &str) -> Option<String> {
        self.features.get(fid).map(|w| w.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> CombineMapper {
        let mut targets = HashMap::new();
        targets.insert("100.1".to_string(), "300.1".to_string());
        targets.insert("200.1".to_string(), "300.1".to_string());
        CombineMapper::new(targets)
    }

    #[test]
    fn test_sources_fan_in_to_target() {
        let mapper = mapper();
        let a = mapper.register_genome("100.1", "genome A").unwrap();
        let b = mapper.register_genome("200.1", "genome B").unwrap();
        assert_eq!(a.word, "300.1");
        assert_eq!(b.word, "300.1");
        // Unmapped genomes are their own target.
        assert_eq!(mapper.genome_word("999.9"), Some("999.9".to_string()));
    }

    #[test]
    fn test_features_renumbered_across_sources() {
        let mapper = mapper();
        let a = mapper.register_genome("100.1", "genome A").unwrap();
        let b = mapper.register_genome("200.1", "genome B").unwrap();

        let f1 = mapper.register_feature(&a, "fig|100.1.peg.7", "").unwrap();
        let f2 = mapper.register_feature(&b, "fig|200.1.peg.7", "").unwrap();
        assert_eq!(f1, "fig|300.1.peg.1");
        assert_eq!(f2, "fig|300.1.peg.2");

        // Registration is memoized per original fid.
        let again = mapper.register_feature(&a, "fig|100.1.peg.7", "").unwrap();
        assert_eq!(again, f1);
        assert_eq!(mapper.feature_word("fig|100.1.peg.7"), Some(f1));
    }

    #[test]
    fn test_cross_genome_feature_rejected() {
        let mapper = mapper();
        let a = mapper.register_genome("100.1", "genome A").unwrap();
        assert!(matches!(
            mapper.register_feature(&a, "fig|200.1.peg.7", ""),
            Err(MapError::WrongGenome { .. })
        ));
    }
}
