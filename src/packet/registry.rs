//! Schema registry: search tag → packet schema lookup table.
//!
//! Built once at startup from the schema document and read-mostly
//! afterwards. Received packets are resolved back to a schema here.

use core::fmt;
use std::collections::BTreeMap;

use log::warn;

use super::schema::PacketSchema;
use super::tag::SearchTag;

/// (message code, sender) pairs whose wire shape depends on length alone.
/// Their tags always carry the packet length as a fourth component.
const LENGTH_KEYED: [(u8, u8); 3] = [(0x1E, 0xF0), (0x1E, 0xBC), (0x92, 0x10)];

#[derive(Debug, Default)]
pub struct SchemaRegistry {
    table: BTreeMap<SearchTag, PacketSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `schema` under `tag`, returning any schema it replaced.
    pub fn insert(&mut self, tag: SearchTag, schema: PacketSchema) -> Option<PacketSchema> {
        let previous = self.table.insert(tag, schema);
        if previous.is_some() {
            warn!("schema {} already exists, overwriting", tag);
        }
        previous
    }

    pub fn remove(&mut self, tag: &SearchTag) -> Option<PacketSchema> {
        self.table.remove(tag)
    }

    /// Replace the schema under `tag` without the overwrite warning.
    pub fn update(&mut self, tag: SearchTag, schema: PacketSchema) -> Option<PacketSchema> {
        let previous = self.remove(&tag);
        self.table.insert(tag, schema);
        previous
    }

    pub fn lookup_by_tag(&self, tag: &SearchTag) -> Option<&PacketSchema> {
        self.table.get(tag)
    }

    pub fn lookup_by_tag_mut(&mut self, tag: &SearchTag) -> Option<&mut PacketSchema> {
        self.table.get_mut(tag)
    }

    /// Case-insensitive scan over schema names.
    pub fn lookup_by_name(&self, name: &str) -> Option<&PacketSchema> {
        self.table
            .values()
            .find(|schema| schema.name().eq_ignore_ascii_case(name))
    }

    pub fn lookup_by_name_mut(&mut self, name: &str) -> Option<&mut PacketSchema> {
        self.table
            .values_mut()
            .find(|schema| schema.name().eq_ignore_ascii_case(name))
    }

    /// Tag under which a packet with these ids is registered.
    pub fn generate_search_tag(sender: u8, target: u8, msg_value: u8, pack_len: u8) -> SearchTag {
        let tag = SearchTag::new(target, sender, msg_value);
        if LENGTH_KEYED.contains(&(msg_value, sender)) {
            tag.with_length(pack_len)
        } else {
            tag
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.table.values().map(PacketSchema::name).collect()
    }

    pub fn tags(&self) -> Vec<SearchTag> {
        self.table.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SearchTag, &PacketSchema)> {
        self.table.iter()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl fmt::Display for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (tag, schema) in &self.table {
            writeln!(f, "*** {} ({})", tag, schema.name())?;
            write!(f, "{schema}")?;
        }
        Ok(())
    }
}
