//! Shipped rule packs parsed for unit tests.

use std::sync::Arc;

use crate::workflows::packs::{checksum, ManifestEntry, PackCatalog, RulePack};

pub(crate) const UTI_PACK: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../rules/uti_women_16_64.json"
));
pub(crate) const SORE_THROAT_PACK: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../rules/sore_throat_feverpain.json"
));

pub(crate) const UTI: &str = "uti_women_16_64";
pub(crate) const SORE_THROAT: &str = "sore_throat_feverpain";

pub(crate) fn parse_pack(id: &str, text: &str) -> RulePack {
    let entry = ManifestEntry {
        id: id.to_string(),
        name: String::new(),
        version: String::new(),
        path: format!("{id}.json"),
        checksum: Some(checksum(text.as_bytes())),
    };
    let pack = RulePack::parse(text, &entry).expect("pack parses");
    pack.validate_logic().expect("pack logic is valid");
    pack
}

pub(crate) fn catalog() -> Arc<PackCatalog> {
    Arc::new(PackCatalog::from_packs(vec![
        parse_pack(UTI, UTI_PACK),
        parse_pack(SORE_THROAT, SORE_THROAT_PACK),
    ]))
}
