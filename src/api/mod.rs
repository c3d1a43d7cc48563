// Reference data lookup module
pub mod reference;

pub use reference::{ClosingPrice, CompanyProfile, ReferenceDataClient};
