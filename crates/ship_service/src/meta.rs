//! Static AIS enumerations served on `/shipMeta`.
//!
//! Ship-type codes and navigational statuses follow ITU-R M.1371; the type
//! groups are the buckets the map front end colors markers by.

use std::collections::BTreeMap;

use serde::Serialize;

/// Everything `/shipMeta` returns.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipMetadata {
    pub ship_type: BTreeMap<u8, String>,
    pub ship_group: BTreeMap<&'static str, Vec<u8>>,
    pub nav_status: BTreeMap<u8, &'static str>,
}

/// Build the full metadata set.
pub fn ship_metadata() -> ShipMetadata {
    ShipMetadata {
        ship_type: ship_types(),
        ship_group: ship_type_groups(),
        nav_status: nav_statuses(),
    }
}

/// Ship-type code table, 0-99.
fn ship_types() -> BTreeMap<u8, String> {
    let mut types = BTreeMap::new();

    types.insert(0, "Not available".to_string());
    for code in 1..=19 {
        types.insert(code, "Reserved for future use".to_string());
    }
    for code in 20..=29 {
        types.insert(code, "Wing in ground".to_string());
    }
    types.insert(30, "Fishing".to_string());
    types.insert(31, "Towing".to_string());
    types.insert(32, "Towing, length exceeds 200m or breadth exceeds 25m".to_string());
    types.insert(33, "Dredging or underwater operations".to_string());
    types.insert(34, "Diving operations".to_string());
    types.insert(35, "Military operations".to_string());
    types.insert(36, "Sailing".to_string());
    types.insert(37, "Pleasure craft".to_string());
    types.insert(38, "Reserved".to_string());
    types.insert(39, "Reserved".to_string());
    for code in 40..=49 {
        types.insert(code, "High speed craft".to_string());
    }
    types.insert(50, "Pilot vessel".to_string());
    types.insert(51, "Search and rescue vessel".to_string());
    types.insert(52, "Tug".to_string());
    types.insert(53, "Port tender".to_string());
    types.insert(54, "Anti-pollution equipment".to_string());
    types.insert(55, "Law enforcement".to_string());
    types.insert(56, "Spare, local vessel".to_string());
    types.insert(57, "Spare, local vessel".to_string());
    types.insert(58, "Medical transport".to_string());
    types.insert(59, "Noncombatant ship".to_string());
    for code in 60..=69 {
        types.insert(code, "Passenger".to_string());
    }
    for code in 70..=79 {
        types.insert(code, "Cargo".to_string());
    }
    for code in 80..=89 {
        types.insert(code, "Tanker".to_string());
    }
    for code in 90..=99 {
        types.insert(code, "Other".to_string());
    }

    types
}

/// Marker-color buckets for the front end.
fn ship_type_groups() -> BTreeMap<&'static str, Vec<u8>> {
    let mut groups = BTreeMap::new();

    groups.insert("wig", (20..=29).collect());
    groups.insert("fishing", vec![30]);
    groups.insert("towing", vec![31, 32, 52]);
    groups.insert("dredging", vec![33]);
    groups.insert("diving", vec![34]);
    groups.insert("military", vec![35]);
    groups.insert("sailing", vec![36, 37]);
    groups.insert("hsc", (40..=49).collect());
    groups.insert("special", vec![50, 51, 53, 54, 55, 56, 57, 58, 59]);
    groups.insert("passenger", (60..=69).collect());
    groups.insert("cargo", (70..=79).collect());
    groups.insert("tanker", (80..=89).collect());
    groups.insert("other", {
        let mut codes: Vec<u8> = vec![0];
        codes.extend(1..=19);
        codes.extend(38..=39);
        codes.extend(90..=99);
        codes
    });

    groups
}

/// Navigational status strings, 0-15.
fn nav_statuses() -> BTreeMap<u8, &'static str> {
    BTreeMap::from([
        (0, "Under way using engine"),
        (1, "At anchor"),
        (2, "Not under command"),
        (3, "Restricted manoeuverability"),
        (4, "Constrained by her draught"),
        (5, "Moored"),
        (6, "Aground"),
        (7, "Engaged in fishing"),
        (8, "Under way sailing"),
        (9, "Reserved for high speed craft"),
        (10, "Reserved for wing in ground"),
        (11, "Power-driven vessel towing astern"),
        (12, "Power-driven vessel pushing ahead or towing alongside"),
        (13, "Reserved for future use"),
        (14, "AIS-SART active"),
        (15, "Undefined"),
    ])
}
