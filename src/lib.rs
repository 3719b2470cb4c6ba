//! Gene-list wrangling for regulated cell death (RCD) studies.
//!
//! Two independent tools share this crate:
//! - [`genes`]: per RCD category, the genes absent from every other category.
//! - [`mirna`]: miRNAs predicted to target a list of transcripts, from a miRDB-style table.

pub mod config;
pub mod error;
pub mod genes;
pub mod mirna;
