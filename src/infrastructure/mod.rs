//! Infrastructure layer - network access, source adapters, and storage seams

pub mod http;
pub mod marketplaces;
pub mod currency;
pub mod storage;
