use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::core::Fid;
use crate::mapper::words::{capitalize, condense};
use crate::mapper::{GenomeContext, IdMapper, MapError};

/// Mapper that generates word identifiers from identifier content.
///
/// Genome words condense the genome name; feature words embed the genome word,
/// the condensed product text (for coding features) or capitalized feature
/// type, and the feature's ordinal number. A per-stem counter allocated on
/// first use keeps words collision-free within a run, and every registration
/// is memoized by original identifier.
#[derive(Debug, Default)]
pub struct MagicMapper {
    genomes: DashMap<String, String>,
    features: DashMap<String, String>,
    stems: DashMap<String, u32>,
}

/// Feature types whose word derives from the product text rather than the
/// type name.
const CODING_TYPES: &[&str] = &["peg", "cds"];

impl MagicMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a stem, appending a numeric disambiguator after its first use.
    fn allocate(&self, stem: String) -> String {
        let stem = if stem.is_empty() {
            "Genome".to_string()
        } else {
            stem
        };
        let next = {
            let mut counter = self.stems.entry(stem.clone()).or_insert(0);
            *counter += 1;
            *counter
        };
        if next == 1 {
            stem
        } else {
            // Claim the disambiguated form as well, so a later natural
            // occurrence of that exact stem is pushed further along.
            self.allocate(format!("{stem}{next}"))
        }
    }
}

impl IdMapper for MagicMapper {
    fn register_genome(&self, genome_id: &str, name: &str) -> Result<GenomeContext, MapError> {
        if name.trim().is_empty() {
            return Err(MapError::BlankName(genome_id.to_string()));
        }
        let word = match self.genomes.entry(genome_id.to_string()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let word = self.allocate(condense(name));
                entry.insert(word.clone());
                word
            }
        };
        Ok(GenomeContext {
            genome_id: genome_id.to_string(),
            word,
        })
    }

    fn register_feature(
        &self,
        ctx: &GenomeContext,
        fid: &str,
        product: &str,
    ) -> Result<String, MapError> {
        let parsed = Fid::parse(fid).ok_or_else(|| MapError::BadFid(fid.to_string()))?;
        if parsed.genome != ctx.genome_id {
            return Err(MapError::WrongGenome {
                fid: fid.to_string(),
                genome: ctx.genome_id.clone(),
            });
        }
        let word = match self.features.entry(fid.to_string()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let stem = if CODING_TYPES.contains(&parsed.ftype.to_lowercase().as_str()) {
                    condense(product)
                } else {
                    capitalize(&parsed.ftype)
                };
                // Two coding types can share an ordinal and product, so the
                // full word goes through the stem allocator like genome words.
                let word = self.allocate(format!("{}{}{}", ctx.word, stem, parsed.num));
                entry.insert(word.clone());
                word
            }
        };
        Ok(word)
    }

    fn register_alias(&self, alt_id: &str, word: &str) {
        self.features.insert(alt_id.to_string(), word.to_string());
    }

    fn genome_word(&self, genome_id: &str) -> Option<String> {
        self.genomes.get(genome_id).map(|w| w.clone())
    }

    fn feature_word(&self, fid: &str) -> Option<String> {
        self.features.get(fid).map(|w| w.clone())
    }
}
