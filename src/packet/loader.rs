//! Schema document loader.
//!
//! The document is a JSON export of the command table:
//!
//! ```json
//! { "Commands": [ {
//!     "SearchTag": "11:F0:89", "TargetID": "11", "SenderID": "F0",
//!     "MsgValue": "89", "PackLen": "07", "MsgName": "Set Command",
//!     "IsBootModeCmd": "false", "CmdNotes": "",
//!     "DataNames": "cmd", "DataTypes": "byte", "DataSizes": "1",
//!     "DataDetails": "0 = stop\n5 = run", "DefaultData": "05"
//! } ] }
//! ```
//!
//! List columns are comma separated and parallel. Default bytes are hex
//! and consumed in width-sized chunks, field by field.

use std::path::Path;

use anyhow::Context;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::field::{FieldDefinition, FieldType};
use super::registry::SchemaRegistry;
use super::schema::PacketSchema;
use super::tag::{SearchTag, parse_id};
use crate::error::SchemaError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SchemaDocument {
    pub commands: Vec<SchemaRecord>,
}

/// One command/report row of the schema document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SchemaRecord {
    pub search_tag: String,
    #[serde(rename = "TargetID")]
    pub target_id: String,
    #[serde(rename = "SenderID")]
    pub sender_id: String,
    pub msg_value: String,
    pub msg_name: String,
    /// Hex.
    pub pack_len: String,
    pub is_boot_mode_cmd: String,
    pub duplicate_cmd: String,
    pub cmd_notes: String,
    pub data_names: String,
    pub data_types: String,
    /// Decimal byte widths.
    pub data_sizes: String,
    pub data_details: String,
    pub default_data: String,
}

fn split_list(s: &str) -> Vec<&str> {
    if s.trim().is_empty() {
        Vec::new()
    } else {
        s.split(',').map(str::trim).collect()
    }
}

fn split_details(s: &str) -> Vec<String> {
    s.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

fn parse_hex_byte(s: &str) -> Result<u8, SchemaError> {
    let s = s.trim();
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u8::from_str_radix(digits, 16).map_err(|_| SchemaError::BadTag)
}

impl SchemaRecord {
    /// The registry key: the record's tag, or its ids when the tag is blank.
    pub fn tag(&self) -> Result<SearchTag, SchemaError> {
        if self.search_tag.trim().is_empty() {
            return Ok(SearchTag::new(
                parse_id(self.target_id.trim())?,
                parse_id(self.sender_id.trim())?,
                parse_id(self.msg_value.trim())?,
            ));
        }
        self.search_tag.to_ascii_uppercase().parse()
    }

    fn fields(&self) -> Result<Vec<FieldDefinition>, SchemaError> {
        let names = split_list(&self.data_names);
        let types = split_list(&self.data_types);
        let sizes = split_list(&self.data_sizes);
        let details = split_list(&self.data_details);
        let defaults = split_list(&self.default_data)
            .into_iter()
            .map(parse_hex_byte)
            .collect::<Result<Vec<u8>, _>>()?;

        let mut remaining = defaults.as_slice();
        let mut fields = Vec::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            let ty: FieldType = types.get(i).copied().unwrap_or_default().parse()?;
            let width = match sizes.get(i) {
                Some(size) => size.parse().map_err(|_| SchemaError::LengthMismatch)?,
                None => ty.natural_width().ok_or(SchemaError::LengthMismatch)?,
            };

            let default = if remaining.is_empty() {
                None
            } else {
                let (chunk, rest) = remaining.split_at(width.min(remaining.len()));
                remaining = rest;
                Some(chunk.to_vec())
            };

            fields.push(FieldDefinition::new(
                *name,
                ty,
                width,
                details.get(i).map(|d| split_details(d)).unwrap_or_default(),
                default,
            ));
        }
        Ok(fields)
    }

    /// Turn the record into its registry key and schema.
    pub fn build(&self) -> Result<(SearchTag, PacketSchema), SchemaError> {
        let tag = self.tag()?;
        for (label, id, expected) in [
            ("TargetID", &self.target_id, tag.target),
            ("SenderID", &self.sender_id, tag.sender),
            ("MsgValue", &self.msg_value, tag.msg_value),
        ] {
            if parse_id(id.trim()).is_ok_and(|v| v != expected) {
                warn!("{}: {} {} disagrees with search tag", tag, label, id);
            }
        }

        let pack_len = parse_hex_byte(&self.pack_len)?;
        let schema = PacketSchema::new(tag, pack_len, self.msg_name.trim(), self.fields()?)?
            .with_boot_mode(self.is_boot_mode_cmd.trim().eq_ignore_ascii_case("true"))
            .with_notes(self.cmd_notes.trim());
        Ok((tag, schema))
    }
}

/// Build a registry, skipping records that fail to build.
pub fn registry_from_document(doc: &SchemaDocument) -> SchemaRegistry {
    let mut registry = SchemaRegistry::new();
    for record in &doc.commands {
        match record.build() {
            Ok((tag, schema)) => {
                registry.insert(tag, schema);
            }
            Err(e) => warn!(
                "skipping schema '{}' ({}): {}",
                record.msg_name, record.search_tag, e
            ),
        }
    }
    registry
}

pub fn parse_document(text: &str) -> serde_json::Result<SchemaDocument> {
    serde_json::from_str(text)
}

/// Read and build the registry from a schema document on disk.
pub fn load_registry(path: &Path) -> anyhow::Result<SchemaRegistry> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading schema document {}", path.display()))?;
    let doc = parse_document(&text)
        .with_context(|| format!("parsing schema document {}", path.display()))?;
    let registry = registry_from_document(&doc);
    info!(
        "loaded {} of {} schemas from {}",
        registry.len(),
        doc.commands.len(),
        path.display()
    );
    Ok(registry)
}
