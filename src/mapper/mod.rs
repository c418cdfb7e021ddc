//! Identifier namespaces mapping original genome and feature identifiers to
//! replacement identifiers.
//!
//! Two implementations share the [`IdMapper`] seam: [`MagicMapper`] generates
//! content-derived word identifiers, and [`CombineMapper`] translates
//! identifiers when multiple genomes collapse into one. Both are safe to share
//! across parallel directory workers; registration of the same key is
//! serialized by the underlying sharded maps.

pub mod combine;
pub mod magic;
pub mod words;

use thiserror::Error;

pub use combine::CombineMapper;
pub use magic::MagicMapper;

#[derive(Error, Debug)]
pub enum MapError {
    #[error("Genome {0} has a blank name")]
    BlankName(String),

    #[error("Feature {fid} does not belong to the current genome {genome}")]
    WrongGenome { fid: String, genome: String },

    #[error("Feature identifier '{0}' is malformed")]
    BadFid(String),
}

/// The genome a directory's records belong to, established by registering its
/// `genome.json` record. Threaded through feature registration so the mappers
/// themselves carry no per-directory mutable state.
#[derive(Debug, Clone)]
pub struct GenomeContext {
    /// Original genome identifier
    pub genome_id: String,
    /// Replacement identifier for the genome
    pub word: String,
}

/// Translator from original identifiers to replacement identifiers.
///
/// Registration is memoized: the same original identifier always yields the
/// same replacement within a run. Lookups may run concurrently with
/// registrations of unrelated identifiers.
pub trait IdMapper: Send + Sync {
    /// Register a genome and return its context. Blank names are a
    /// validation error.
    fn register_genome(&self, genome_id: &str, name: &str) -> Result<GenomeContext, MapError>;

    /// Register a feature identifier under the active genome context,
    /// returning its replacement. Fails with [`MapError::WrongGenome`] when
    /// the identifier's genome component does not match the context.
    fn register_feature(
        &self,
        ctx: &GenomeContext,
        fid: &str,
        product: &str,
    ) -> Result<String, MapError>;

    /// Register a secondary identifier resolving to an existing replacement.
    fn register_alias(&self, alt_id: &str, word: &str);

    /// Replacement identifier for a genome, if known.
    fn genome_word(&self, genome_id: &str) -> Option<String>;

    /// Replacement identifier for a feature, if known.
    fn feature_word(&self, fid: &str) -> Option<String>;
}
