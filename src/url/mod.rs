//! URL handling: normalization, domain extraction, and the approximate
//! membership set used by the frontier to avoid re-enqueuing seen URLs.

mod bloom;
mod domain;
mod normalize;

pub use bloom::BloomFilter;
pub use domain::extract_domain;
pub use normalize::normalize_url;
