//! Institutional reference taxonomy
//!
//! Verticals (thrust areas) and special areas are static reference data. The
//! workflow only looks them up; they are inserted once by the store at
//! startup when `PORTAL_SEED_TAXONOMY` is enabled.

use crate::models::{SpecialArea, Vertical};

/// Vertical code used when a proposal's vertical is missing from the taxonomy.
pub const FALLBACK_VERTICAL_CODE: &str = "GEN";

const VERTICALS: &[(&str, &str, &str)] = &[
    (
        "SHMLE",
        "Structural Health Monitoring & Life Extension",
        "Monitoring structural health and extending service life of structures",
    ),
    (
        "DM",
        "Disaster Mitigation",
        "Natural and man-made disaster mitigation strategies and structural resilience",
    ),
    (
        "AMSS",
        "Advanced Materials for Sustainable Structure",
        "Research on sustainable construction materials and green building technologies",
    ),
    (
        "SMFS",
        "Special and Multi functional Structures",
        "Design and analysis of specialized and multi-functional structural systems",
    ),
    (
        "EI",
        "Energy Infrastructure",
        "Structures for energy sector including renewable energy and power transmission",
    ),
    (
        "OS",
        "Offshore Structures",
        "Offshore platforms, coastal structures, and marine infrastructure",
    ),
];

const SPECIAL_AREAS: &[(&str, &str, &str)] = &[
    (
        "SA-SHMLE",
        "Structural Health Monitoring & Life Extension",
        "Monitoring structural health and extending service life",
    ),
    (
        "SA-DM",
        "Disaster Mitigation",
        "Natural and man-made disaster mitigation strategies",
    ),
    (
        "SA-AMSS",
        "Advanced Materials for Sustainable Structures",
        "Research on sustainable construction materials",
    ),
    (
        "SA-SMFS",
        "Special and Multi-functional Structures",
        "Design of specialized structural systems",
    ),
    (
        "SA-EI",
        "Energy Infrastructure",
        "Structures for energy sector including renewable energy",
    ),
    (
        "SA-OS",
        "Offshore Structures",
        "Offshore platforms and coastal structures",
    ),
];

/// Seed verticals. The vertical id is its code.
pub fn default_verticals() -> Vec<Vertical> {
    VERTICALS
        .iter()
        .map(|(code, name, description)| Vertical {
            id: code.to_string(),
            code: code.to_string(),
            name: name.to_string(),
            description: Some(description.to_string()),
        })
        .collect()
}

pub fn default_special_areas() -> Vec<SpecialArea> {
    SPECIAL_AREAS
        .iter()
        .map(|(id, name, description)| SpecialArea {
            id: id.to_string(),
            name: name.to_string(),
            description: Some(description.to_string()),
        })
        .collect()
}
