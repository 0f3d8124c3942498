//! Packet schema: one packet layout plus its live field data.
//!
//! Wire layout produced by [`PacketSchema::full_buffer`]:
//! ```text
//! ┌────────┬─────────┬─────┬────────┬─────┬──────────────┬──────────┐
//! │ TARGET │ PACKLEN │ SEQ │ SENDER │ MSG │ DATA (N B)   │ CHECKSUM │
//! │ 1B     │ 1B      │ 0   │ 1B     │ 1B  │ fields, ordered │ 1B    │
//! └────────┴─────────┴─────┴────────┴─────┴──────────────┴──────────┘
//! ```
//!
//! The schema owns one byte buffer per field. Sending reads them,
//! receiving overwrites them in place; their shape never changes.

use core::fmt;
use std::collections::HashMap;

use log::{debug, warn};

use super::field::{FieldAccess, FieldDefinition, FieldValue};
use super::tag::{SearchTag, parse_id};
use super::{CONSOLE_ID, HEADER_LEN, MIN_PACK_LEN, SEQUENCE, checksum};
use crate::error::SchemaError;

/// Human name for a device id, used in diagnostics.
pub fn device_name(id: u8) -> &'static str {
    match id {
        0x10 => "PTC_HS",
        0x11 => "PTC_LS",
        0x18 => "pm_MDB",
        0x19 => "pm_SIB",
        0x20 => "INCLINE",
        0x40 => "EEPROM",
        0x80 => "PNC",
        0x99 => "99",
        0xF0 => "M4",
        0xBC => "TE",
        _ => "n/a",
    }
}

#[derive(Debug, Clone)]
struct FieldSlot {
    def: FieldDefinition,
    data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct PacketSchema {
    tag: SearchTag,
    pack_len: u8,
    name: String,
    boot_mode: bool,
    notes: String,
    fields: Vec<FieldSlot>,
    /// Upper-cased field name → position in `fields`.
    index: HashMap<String, usize>,
}

impl PacketSchema {
    /// Build a schema, checking `pack_len == 5 + Σ widths + 1`.
    ///
    /// A four-part `tag` must carry the same length as `pack_len`.
    pub fn new(
        tag: SearchTag,
        pack_len: u8,
        name: impl Into<String>,
        fields: Vec<FieldDefinition>,
    ) -> Result<Self, SchemaError> {
        let layout_len = MIN_PACK_LEN + fields.iter().map(FieldDefinition::width).sum::<usize>();
        if layout_len != usize::from(pack_len) || tag.pack_len.is_some_and(|l| l != pack_len) {
            return Err(SchemaError::LengthMismatch);
        }

        let mut index = HashMap::with_capacity(fields.len());
        for (i, def) in fields.iter().enumerate() {
            if index.insert(def.name().to_ascii_uppercase(), i).is_some() {
                warn!("schema {}: duplicate field name '{}'", tag, def.name());
            }
        }

        let fields = fields
            .into_iter()
            .map(|def| FieldSlot {
                data: def.default_bytes().to_vec(),
                def,
            })
            .collect();

        Ok(Self {
            tag,
            pack_len,
            name: name.into(),
            boot_mode: false,
            notes: String::new(),
            fields,
            index,
        })
    }

    #[must_use]
    pub fn with_boot_mode(mut self, boot_mode: bool) -> Self {
        self.boot_mode = boot_mode;
        self
    }

    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    // ── Metadata ──────────────────────────────────────────────

    pub fn search_tag(&self) -> SearchTag {
        self.tag
    }

    pub fn target_id(&self) -> u8 {
        self.tag.target
    }

    pub fn sender_id(&self) -> u8 {
        self.tag.sender
    }

    pub fn msg_value(&self) -> u8 {
        self.tag.msg_value
    }

    pub fn pack_len(&self) -> u8 {
        self.pack_len
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_boot_mode(&self) -> bool {
        self.boot_mode
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter().map(|slot| &slot.def)
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Sent by the console.
    pub fn is_outgoing(&self) -> bool {
        self.tag.sender == CONSOLE_ID
    }

    pub fn is_editable(&self) -> bool {
        self.is_outgoing() && !self.fields.is_empty()
    }

    /// `SENDER --> TARGET` with device names.
    pub fn direction_label(&self) -> String {
        format!(
            "{} --> {}",
            device_name(self.tag.sender),
            device_name(self.tag.target)
        )
    }

    // ── Wire form ─────────────────────────────────────────────

    pub fn header(&self) -> [u8; HEADER_LEN] {
        [
            self.tag.target,
            self.pack_len,
            SEQUENCE,
            self.tag.sender,
            self.tag.msg_value,
        ]
    }

    /// Current field bytes, in declaration order.
    pub fn data_buffer(&self) -> Vec<u8> {
        self.fields
            .iter()
            .flat_map(|slot| slot.data.iter().copied())
            .collect()
    }

    /// Two's complement of the header and data byte sum.
    pub fn checksum(&self) -> u8 {
        let mut bytes = self.header().to_vec();
        bytes.extend(self.data_buffer());
        checksum(&bytes)
    }

    /// Header, data, and checksum: the bytes put on the wire.
    pub fn full_buffer(&self) -> Vec<u8> {
        let mut bytes = self.header().to_vec();
        bytes.extend(self.data_buffer());
        bytes.push(checksum(&bytes));
        bytes
    }

    /// Spread a received payload over the fields.
    ///
    /// Returns `false` without touching any field when the payload is not
    /// exactly `pack_len - 6` bytes long.
    pub fn assign_incoming(&mut self, payload: &[u8]) -> bool {
        let expected = usize::from(self.pack_len).saturating_sub(MIN_PACK_LEN);
        if payload.len() != expected {
            debug!(
                "{}: payload of {} bytes ignored, expected {}",
                self.tag,
                payload.len(),
                expected
            );
            return false;
        }

        let mut offset = 0;
        for slot in &mut self.fields {
            let width = slot.def.width();
            slot.data.copy_from_slice(&payload[offset..offset + width]);
            offset += width;
        }
        true
    }

    // ── Field access ──────────────────────────────────────────

    fn slot_index(&self, name: &str) -> Option<usize> {
        self.index.get(&name.to_ascii_uppercase()).copied()
    }

    /// Case-insensitive lookup.
    pub fn find_field(&self, name: &str) -> Option<&FieldDefinition> {
        self.slot_index(name).map(|i| &self.fields[i].def)
    }

    pub fn field_bytes(&self, name: &str) -> Option<&[u8]> {
        self.slot_index(name).map(|i| self.fields[i].data.as_slice())
    }

    pub fn get_field<T: FieldAccess>(&self, name: &str) -> Result<T, SchemaError> {
        self.field_bytes(name)
            .map(T::from_field)
            .ok_or(SchemaError::FieldNotFound)
    }

    /// Encode `value` into the named field.
    pub fn set_field<T: FieldAccess>(&mut self, name: &str, value: T) -> Result<(), SchemaError> {
        if !self.is_editable() {
            warn!("{}: field '{}' not editable", self.name, name);
            return Err(SchemaError::NotEditable);
        }
        let Some(i) = self.slot_index(name) else {
            warn!("{}: field '{}' not found", self.name, name);
            return Err(SchemaError::FieldNotFound);
        };
        let slot = &mut self.fields[i];
        slot.data = value.to_field(slot.def.width());
        Ok(())
    }

    /// Decode the named field according to its declared type.
    pub fn value(&self, name: &str) -> Result<FieldValue, SchemaError> {
        let i = self.slot_index(name).ok_or(SchemaError::FieldNotFound)?;
        let slot = &self.fields[i];
        Ok(FieldValue::decode(slot.def.field_type(), &slot.data))
    }

    // ── Search-tag synchronisation ────────────────────────────

    /// Replace the ids (and, for a four-part tag, confirm the length).
    pub fn set_search_tag(&mut self, tag: &str) -> Result<(), SchemaError> {
        let parsed: SearchTag = tag.parse().inspect_err(|_| {
            warn!("bad search tag: {tag}");
        })?;
        if parsed.pack_len.is_some_and(|l| l != self.pack_len) {
            warn!(
                "search tag {} contradicts packet length {:02X}",
                parsed, self.pack_len
            );
            return Err(SchemaError::LengthMismatch);
        }
        self.tag = parsed;
        Ok(())
    }

    pub fn set_target_id(&mut self, id: &str) -> Result<(), SchemaError> {
        self.tag.target = checked_id(id)?;
        Ok(())
    }

    pub fn set_sender_id(&mut self, id: &str) -> Result<(), SchemaError> {
        self.tag.sender = checked_id(id)?;
        Ok(())
    }

    pub fn set_msg_value(&mut self, id: &str) -> Result<(), SchemaError> {
        self.tag.msg_value = checked_id(id)?;
        Ok(())
    }
}

fn checked_id(id: &str) -> Result<u8, SchemaError> {
    parse_id(id.trim()).inspect_err(|_| warn!("bad id input: {id}"))
}

impl fmt::Display for PacketSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} | {:02X}{:02X}{:02X}",
            self.tag, self.tag.target, self.tag.sender, self.tag.msg_value
        )?;
        writeln!(
            f,
            "{} PackLen: {} ({})",
            self.name,
            self.pack_len,
            self.direction_label()
        )?;
        for slot in &self.fields {
            writeln!(
                f,
                "  {} {} {} = {}",
                slot.def.name(),
                slot.def.field_type(),
                slot.def.width(),
                FieldValue::decode(slot.def.field_type(), &slot.data)
            )?;
            for detail in slot.def.details() {
                writeln!(f, "    {detail}")?;
            }
        }
        Ok(())
    }
}
