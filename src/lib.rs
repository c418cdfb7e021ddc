//! Identifier rewriting and template-driven text rendering for genome dumps.
//!
//! A genome dump is a directory of JSON record files (`genome.json`,
//! `genome_feature.json`, subsystem and pathway files, ...) full of opaque
//! identifiers like `511145.12` and `fig|511145.12.peg.4`. This crate does two
//! things with such dumps:
//!
//! - **Identifier rewriting** ([`mapper`] + [`convert`]): replace the opaque
//!   identifiers with generated readable words, or renumber them when several
//!   source genomes are merged onto one target.
//! - **Text rendering** ([`template`]): drive a small template language over
//!   the record files to produce prose text, with cross-file joins and a
//!   shared global store for cross-directory inclusions.
//!
//! The [`cli`] module wires these into the `text`, `magic`, and `combine`
//! subcommands, along with a `pubmed` report over the dump files.

pub mod cli;
pub mod convert;
pub mod core;
pub mod mapper;
pub mod parsing;
pub mod template;

pub use crate::convert::{ConversionKind, DumpFile, FieldConverter, KeyMode, KeyPatterns};
pub use crate::core::{ConvertCounts, Fid};
pub use crate::mapper::{CombineMapper, GenomeContext, IdMapper, MagicMapper};
pub use crate::parsing::{FieldStream, Record};
pub use crate::template::{GlobalStore, LineTemplate, TemplateError};
