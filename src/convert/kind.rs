use tracing::{error, warn};

use crate::convert::DumpRecord;
use crate::mapper::{GenomeContext, IdMapper};

/// Product text assumed for coding features without one.
const DEFAULT_PRODUCT: &str = "hypothetical protein";

/// Pre-processing strategy for a dump file, selected by what the file holds.
///
/// Pre-processing runs before field conversion and performs the registration
/// side effects that make later lookups possible: a genome file establishes
/// the directory's genome context, a feature file registers every feature's
/// replacement identifier (and aliases), and ordinary files need nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionKind {
    Genome,
    Feature,
    Normal,
}

impl ConversionKind {
    /// Apply this kind's registration side effects for one record.
    ///
    /// Registration failures are recoverable per record: they are logged and
    /// the record's registration is skipped, never aborting the file.
    pub fn pre_process(
        self,
        record: &DumpRecord,
        mapper: &dyn IdMapper,
        ctx: &mut Option<GenomeContext>,
    ) {
        match self {
            Self::Genome => {
                let genome_id = text_field(record, "genome_id");
                let name = text_field(record, "genome_name");
                if genome_id.is_empty() || name.is_empty() {
                    error!("Malformed genome record: missing genome_id or genome_name.");
                    return;
                }
                match mapper.register_genome(genome_id, name) {
                    Ok(context) => *ctx = Some(context),
                    Err(e) => error!("{e}"),
                }
            }
            Self::Feature => {
                let fid = text_field(record, "patric_id");
                if fid.is_empty() {
                    return;
                }
                let Some(context) = ctx else {
                    warn!("Feature record seen before any genome was registered.");
                    return;
                };
                // A missing, null, or blank product gets the default text.
                let product = match record.get("product").and_then(|v| v.as_str()).map(str::trim) {
                    Some(p) if !p.is_empty() => p,
                    _ => DEFAULT_PRODUCT,
                };
                match mapper.register_feature(context, fid, product) {
                    Ok(word) => {
                        // A secondary feature_id resolves to the same word.
                        let alt = text_field(record, "feature_id");
                        if !alt.is_empty() {
                            mapper.register_alias(alt, &word);
                        }
                    }
                    // Wrong-genome and malformed ids are per-record problems.
                    Err(e) => error!("{e}"),
                }
            }
            Self::Normal => {}
        }
    }
}

fn text_field<'a>(record: &'a DumpRecord, key: &str) -> &'a str {
    record
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::{IdMapper, MagicMapper};
    use serde_json::json;

    fn record(value: serde_json::Value) -> DumpRecord {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("test record must be an object"),
        }
    }

    #[test]
    fn test_genome_pre_process_sets_context() {
        let mapper = MagicMapper::new();
        let mut ctx = None;
        let rec = record(json!({"genome_id": "511145.12", "genome_name": "Escherichia coli"}));
        ConversionKind::Genome.pre_process(&rec, &mapper, &mut ctx);
        let ctx = ctx.expect("context should be set");
        assert_eq!(ctx.genome_id, "511145.12");
        assert_eq!(mapper.genome_word("511145.12"), Some(ctx.word));
    }

    #[test]
    fn test_malformed_genome_record_is_skipped() {
        let mapper = MagicMapper::new();
        let mut ctx = None;
        let rec = record(json!({"genome_id": "511145.12"}));
        ConversionKind::Genome.pre_process(&rec, &mapper, &mut ctx);
        assert!(ctx.is_none());
    }

    #[test]
    fn test_feature_pre_process_registers_word_and_alias() {
        let mapper = MagicMapper::new();
        let mut ctx = None;
        let genome = record(json!({"genome_id": "511145.12", "genome_name": "Escherichia coli"}));
        ConversionKind::Genome.pre_process(&genome, &mapper, &mut ctx);

        let feature = record(json!({
            "patric_id": "fig|511145.12.peg.4",
            "feature_id": "PATRIC.511145.12.peg.4",
            "product": "Curli production protein"
        }));
        ConversionKind::Feature.pre_process(&feature, &mapper, &mut ctx);

        let word = mapper.feature_word("fig|511145.12.peg.4").unwrap();
        assert_eq!(
            mapper.feature_word("PATRIC.511145.12.peg.4"),
            Some(word.clone())
        );
        assert!(word.starts_with(&ctx.unwrap().word));
    }

    #[test]
    fn test_blank_product_gets_default_text() {
        let mapper = MagicMapper::new();
        let mut ctx = None;
        let genome = record(json!({"genome_id": "511145.12", "genome_name": "Escherichia coli"}));
        ConversionKind::Genome.pre_process(&genome, &mapper, &mut ctx);

        let feature = record(json!({"patric_id": "fig|511145.12.peg.9", "product": ""}));
        ConversionKind::Feature.pre_process(&feature, &mapper, &mut ctx);
        let word = mapper.feature_word("fig|511145.12.peg.9").unwrap();
        assert!(word.contains("HyptPrtn"), "word was {word}");
    }

    #[test]
    fn test_cross_genome_feature_skipped_not_fatal() {
        let mapper = MagicMapper::new();
        let mut ctx = None;
        let genome = record(json!({"genome_id": "511145.12", "genome_name": "Escherichia coli"}));
        ConversionKind::Genome.pre_process(&genome, &mapper, &mut ctx);

        let feature = record(json!({"patric_id": "fig|99.9.peg.1"}));
        ConversionKind::Feature.pre_process(&feature, &mapper, &mut ctx);
        assert!(mapper.feature_word("fig|99.9.peg.1").is_none());
    }
}
