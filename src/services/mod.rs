pub mod metadata;

pub use metadata::MetadataProvider;
