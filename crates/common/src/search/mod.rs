//! Natural-language property search
//!
//! A query flows through five stages:
//! 1. `FilterExtractor` - completion call that yields structured filters
//! 2. `CandidateRetriever` - capped store lookup on price and bedrooms
//! 3. `refine_by_location` - substring match on city / district
//! 4. `AnswerSynthesizer` - grounded, cited answer in the caller's language
//! 5. `assemble` - sources and map pins next to the answer
//!
//! `SearchPipeline` wires them together behind a single `search` call.

mod assembler;
mod citations;
mod extractor;
mod model;
mod pipeline;
mod refiner;
mod retriever;
mod synthesizer;

#[cfg(test)]
pub(crate) mod test_support;

pub use assembler::{assemble, map_pin, source_summary};
pub use citations::{check_citations, CitationCheck};
pub use extractor::{parse_filters, strip_code_fences, FilterExtractor, FilterParseError};
pub use model::{
    decimal_to_f64, localize, Candidate, ExtractedFilters, Language, MapPin, SearchResult,
    SourceSummary,
};
pub use pipeline::{validate_query, SearchPipeline};
pub use refiner::refine_by_location;
pub use retriever::CandidateRetriever;
pub use synthesizer::{build_context, system_prompt, AnswerSynthesizer};

/// Hard cap on rows taken from the store per search
pub const MAX_CANDIDATES: usize = 10;

/// Number of candidates surfaced as citable sources
pub const MAX_SOURCES: usize = 3;

/// Longest accepted query, in characters
pub const MAX_QUERY_CHARS: usize = 1000;
