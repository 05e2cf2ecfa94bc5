//! Design settings, page description, and title block.

use boardkit_core::geometry::Point;
use boardkit_core::layer::{LayerMask, LayerNum};
use boardkit_core::units::mm_to_iu;
use serde::{Deserialize, Serialize};

/// Type tag of a board layer, as written in the `layers` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerType {
    #[default]
    Signal,
    Power,
    Mixed,
    Jumper,
    /// Non-copper layer.
    User,
}

impl LayerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayerType::Signal => "signal",
            LayerType::Power => "power",
            LayerType::Mixed => "mixed",
            LayerType::Jumper => "jumper",
            LayerType::User => "user",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "signal" => Some(LayerType::Signal),
            "power" => Some(LayerType::Power),
            "mixed" => Some(LayerType::Mixed),
            "jumper" => Some(LayerType::Jumper),
            "user" => Some(LayerType::User),
            _ => None,
        }
    }

    pub fn is_copper(&self) -> bool {
        !matches!(self, LayerType::User)
    }
}

/// One row of the board's layer table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerInfo {
    pub number: LayerNum,
    pub name: String,
    pub layer_type: LayerType,
    pub visible: bool,
}

/// Board-wide design rules and defaults, persisted in the `setup` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignSettings {
    pub copper_layer_count: i32,
    pub enabled_layers: LayerMask,
    pub visible_layers: LayerMask,
    pub board_thickness: i32,
    pub track_min_width: i32,
    pub via_min_size: i32,
    pub via_min_drill: i32,
    pub uvia_min_size: i32,
    pub uvia_min_drill: i32,
    pub uvias_allowed: bool,
    pub blind_buried_vias_allowed: bool,
    /// Additional selectable track widths beyond the net-class ones.
    pub track_width_list: Vec<i32>,
    /// Additional selectable (diameter, drill) via dimensions.
    pub via_dimensions_list: Vec<(i32, i32)>,
    pub draw_segment_width: i32,
    pub edge_segment_width: i32,
    pub pcb_text_width: i32,
    pub pcb_text_size: Point,
    pub mod_edge_width: i32,
    pub mod_text_size: Point,
    pub mod_text_width: i32,
    pub pad_size: Point,
    pub pad_drill: i32,
}

impl Default for DesignSettings {
    fn default() -> Self {
        Self {
            copper_layer_count: 2,
            enabled_layers: LayerMask(0x1FFF_FFFF),
            visible_layers: LayerMask(0x1FFF_FFFF),
            board_thickness: mm_to_iu(1.6),
            track_min_width: mm_to_iu(0.2),
            via_min_size: mm_to_iu(0.4),
            via_min_drill: mm_to_iu(0.3),
            uvia_min_size: mm_to_iu(0.2),
            uvia_min_drill: mm_to_iu(0.1),
            uvias_allowed: false,
            blind_buried_vias_allowed: false,
            track_width_list: Vec::new(),
            via_dimensions_list: Vec::new(),
            draw_segment_width: mm_to_iu(0.2),
            edge_segment_width: mm_to_iu(0.1),
            pcb_text_width: mm_to_iu(0.3),
            pcb_text_size: Point::new(mm_to_iu(1.5), mm_to_iu(1.5)),
            mod_edge_width: mm_to_iu(0.15),
            mod_text_size: Point::new(mm_to_iu(1.0), mm_to_iu(1.0)),
            mod_text_width: mm_to_iu(0.15),
            pad_size: Point::new(mm_to_iu(1.5), mm_to_iu(1.5)),
            pad_drill: mm_to_iu(0.6),
        }
    }
}

/// Zone defaults persisted alongside the design settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneSettings {
    pub clearance: i32,
    pub zone_45_only: bool,
}

impl Default for ZoneSettings {
    fn default() -> Self {
        Self {
            clearance: mm_to_iu(0.508),
            zone_45_only: false,
        }
    }
}

/// Sheet size and orientation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSettings {
    /// Standard size name ("A4", "USLetter", ...) or "User".
    pub size_name: String,
    /// Custom size, used when `size_name` is "User".
    pub width: i32,
    pub height: i32,
    pub portrait: bool,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            size_name: "A4".to_string(),
            width: mm_to_iu(297.0),
            height: mm_to_iu(210.0),
            portrait: false,
        }
    }
}

/// Title block of the sheet.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TitleBlock {
    pub title: String,
    pub date: String,
    pub revision: String,
    pub company: String,
    pub comments: [String; 4],
}
