//! Schema document → registry → edited packet on the wire.

use marklink::error::SchemaError;
use marklink::link::{Session, validate_checksum};
use marklink::packet::loader::load_registry;
use marklink::packet::{FieldValue, SchemaRegistry, SearchTag};

use crate::mock_link::{ScriptedTransport, fast_config, packet};

const DOC: &str = r#"{
  "Commands": [
    {
      "SearchTag": "11:F0:89", "TargetID": "11", "SenderID": "F0", "MsgValue": "89",
      "PackLen": "09", "MsgName": "Set Speed", "IsBootModeCmd": "false",
      "CmdNotes": "Sets belt speed",
      "DataNames": "mode,speed", "DataTypes": "byte,word", "DataSizes": "1,2",
      "DataDetails": "0 = idle\n1 = run,tenths of mph", "DefaultData": "01,00,0A"
    },
    {
      "SearchTag": "F0:11:89", "TargetID": "F0", "SenderID": "11", "MsgValue": "89",
      "PackLen": "0A", "MsgName": "Speed Report",
      "DataNames": "speed,flags", "DataTypes": "signed word,word", "DataSizes": "2,2"
    },
    {
      "SearchTag": "11:F0:0D", "TargetID": "11", "SenderID": "F0", "MsgValue": "0D",
      "PackLen": "06", "MsgName": "Version_Command (LS)", "IsBootModeCmd": "true"
    }
  ]
}"#;

fn load() -> SchemaRegistry {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dtCommandsTMEV.json");
    std::fs::write(&path, DOC).unwrap();
    load_registry(&path).unwrap()
}

#[test]
fn document_loads_every_record() {
    let reg = load();
    assert_eq!(reg.len(), 3);
    assert_eq!(
        reg.names(),
        vec!["Version_Command (LS)", "Set Speed", "Speed Report"]
    );
    let version = reg.lookup_by_name("version_command (ls)").unwrap();
    assert!(version.is_boot_mode());
    assert!(!version.is_editable());
}

#[test]
fn edited_field_reaches_the_wire() {
    let mut reg = load();
    let speed = reg.lookup_by_name_mut("Set Speed").unwrap();
    assert_eq!(speed.notes(), "Sets belt speed");
    assert_eq!(speed.get_field::<u16>("speed"), Ok(10));
    speed.set_field("SPEED", 35u16).unwrap();
    assert_eq!(
        speed.set_field("incline", 1u8),
        Err(SchemaError::FieldNotFound)
    );

    let mut line = ScriptedTransport::new();
    line.push_read(&packet(&[0xF0, 0x0A, 0x00, 0x11, 0x89, 0xFF, 0xFE, 0x00, 0x03]));
    let mut session = Session::new(line, fast_config());

    let tag = SearchTag::new(0x11, 0xF0, 0x89);
    let reply = session.exchange(&mut reg, &tag).unwrap();

    let written = session.transport_mut().written();
    assert_eq!(&written[..8], &[0x11, 0x09, 0x00, 0xF0, 0x89, 0x01, 0x00, 0x23]);
    assert!(validate_checksum(&written));

    let report = reg.lookup_by_tag(&reply).unwrap();
    assert_eq!(report.name(), "Speed Report");
    assert_eq!(report.value("speed"), Ok(FieldValue::SignedWord(-2)));
    assert_eq!(report.get_field::<u16>("flags"), Ok(3));
}

#[test]
fn incoming_schema_cannot_be_edited() {
    let mut reg = load();
    let report = reg.lookup_by_name_mut("Speed Report").unwrap();
    assert_eq!(report.set_field("speed", 1i16), Err(SchemaError::NotEditable));
}
