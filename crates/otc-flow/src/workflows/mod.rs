pub mod consultation;
mod field_map;
pub mod packs;
pub mod pathway;
pub mod transcript;

pub use field_map::FieldMap;

#[cfg(test)]
pub(crate) mod fixtures;
