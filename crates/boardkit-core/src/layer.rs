//! Layer numbering, masks, and the default layer-name tables.
//!
//! Layer numbers follow the board file convention: copper layers occupy
//! 0..=15 with back copper at 0 and front copper at 15, technical layers
//! follow up to the board outline layer at 28. A [`LayerMask`] packs a
//! layer set into a `u32`, one bit per layer number.

use std::collections::HashMap;

/// Layer number within a board (0..=31).
pub type LayerNum = i32;

pub const LAYER_BACK: LayerNum = 0;
pub const LAYER_FRONT: LayerNum = 15;
pub const ADHESIVE_BACK: LayerNum = 16;
pub const ADHESIVE_FRONT: LayerNum = 17;
pub const SOLDERPASTE_BACK: LayerNum = 18;
pub const SOLDERPASTE_FRONT: LayerNum = 19;
pub const SILKSCREEN_BACK: LayerNum = 20;
pub const SILKSCREEN_FRONT: LayerNum = 21;
pub const SOLDERMASK_BACK: LayerNum = 22;
pub const SOLDERMASK_FRONT: LayerNum = 23;
pub const DRAWINGS: LayerNum = 24;
pub const COMMENTS: LayerNum = 25;
pub const ECO1: LayerNum = 26;
pub const ECO2: LayerNum = 27;
pub const EDGE_CUTS: LayerNum = 28;

/// Number of layers a board can reference.
pub const LAYER_COUNT: usize = 32;

/// Highest copper layer count a board may declare.
pub const MAX_COPPER_LAYERS: i32 = 16;

/// A set of layers encoded one bit per layer number.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize,
)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const NONE: LayerMask = LayerMask(0);
    pub const ALL_COPPER: LayerMask = LayerMask(0x0000_FFFF);

    pub fn of(layer: LayerNum) -> Self {
        debug_assert!((0..LAYER_COUNT as i32).contains(&layer));
        LayerMask(1 << layer)
    }

    pub fn contains(&self, layer: LayerNum) -> bool {
        self.0 & (1 << layer) != 0
    }

    pub fn intersects(&self, other: LayerMask) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn insert(&mut self, layer: LayerNum) {
        self.0 |= 1 << layer;
    }

    /// Iterates the layer numbers present in the mask, lowest first.
    pub fn iter(&self) -> impl Iterator<Item = LayerNum> + '_ {
        let bits = self.0;
        (0..LAYER_COUNT as i32).filter(move |l| bits & (1 << l) != 0)
    }
}

impl std::ops::BitOr for LayerMask {
    type Output = LayerMask;
    fn bitor(self, rhs: LayerMask) -> LayerMask {
        LayerMask(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for LayerMask {
    fn bitor_assign(&mut self, rhs: LayerMask) {
        self.0 |= rhs.0;
    }
}

impl std::ops::BitAnd for LayerMask {
    type Output = LayerMask;
    fn bitand(self, rhs: LayerMask) -> LayerMask {
        LayerMask(self.0 & rhs.0)
    }
}

/// Returns the canonical English name of a layer number.
pub fn standard_layer_name(layer: LayerNum) -> String {
    match layer {
        LAYER_BACK => "B.Cu".to_string(),
        LAYER_FRONT => "F.Cu".to_string(),
        1..=14 => format!("In{}.Cu", layer),
        ADHESIVE_BACK => "B.Adhes".to_string(),
        ADHESIVE_FRONT => "F.Adhes".to_string(),
        SOLDERPASTE_BACK => "B.Paste".to_string(),
        SOLDERPASTE_FRONT => "F.Paste".to_string(),
        SILKSCREEN_BACK => "B.SilkS".to_string(),
        SILKSCREEN_FRONT => "F.SilkS".to_string(),
        SOLDERMASK_BACK => "B.Mask".to_string(),
        SOLDERMASK_FRONT => "F.Mask".to_string(),
        DRAWINGS => "Dwgs.User".to_string(),
        COMMENTS => "Cmts.User".to_string(),
        ECO1 => "Eco1.User".to_string(),
        ECO2 => "Eco2.User".to_string(),
        EDGE_CUTS => "Edge.Cuts".to_string(),
        _ => format!("Unknown{}", layer),
    }
}

pub fn is_copper_layer(layer: LayerNum) -> bool {
    (LAYER_BACK..=LAYER_FRONT).contains(&layer)
}

/// Name lookup tables used while parsing a board or footprint.
///
/// Both maps are seeded with the canonical layer names before any
/// board-specific `layers` section is read, so a standalone footprint (which
/// carries no layer table of its own) still resolves its layer names. The
/// mask table additionally knows the wildcard set names a pad may use.
///
/// The tables are built once per parse and read-only afterwards; nothing
/// here is process-global.
#[derive(Debug, Clone)]
pub struct LayerTables {
    indices: HashMap<String, LayerNum>,
    masks: HashMap<String, LayerMask>,
}

impl LayerTables {
    /// Builds the tables seeded with canonical names and wildcard sets.
    pub fn new() -> Self {
        let mut indices = HashMap::new();
        let mut masks = HashMap::new();

        for layer in 0..=EDGE_CUTS {
            let name = standard_layer_name(layer);
            indices.insert(name.clone(), layer);
            masks.insert(name, LayerMask::of(layer));
        }

        masks.insert("*.Cu".to_string(), LayerMask::ALL_COPPER);
        masks.insert(
            "F&B.Cu".to_string(),
            LayerMask::of(LAYER_BACK) | LayerMask::of(LAYER_FRONT),
        );
        masks.insert(
            "*.Adhes".to_string(),
            LayerMask::of(ADHESIVE_BACK) | LayerMask::of(ADHESIVE_FRONT),
        );
        masks.insert(
            "*.Paste".to_string(),
            LayerMask::of(SOLDERPASTE_BACK) | LayerMask::of(SOLDERPASTE_FRONT),
        );
        masks.insert(
            "*.Mask".to_string(),
            LayerMask::of(SOLDERMASK_BACK) | LayerMask::of(SOLDERMASK_FRONT),
        );
        masks.insert(
            "*.SilkS".to_string(),
            LayerMask::of(SILKSCREEN_BACK) | LayerMask::of(SILKSCREEN_FRONT),
        );

        Self { indices, masks }
    }

    /// Registers a board-declared layer, overriding any default of the same
    /// name.
    pub fn define(&mut self, name: &str, layer: LayerNum) {
        self.indices.insert(name.to_string(), layer);
        self.masks.insert(name.to_string(), LayerMask::of(layer));
    }

    pub fn index(&self, name: &str) -> Option<LayerNum> {
        self.indices.get(name).copied()
    }

    pub fn mask(&self, name: &str) -> Option<LayerMask> {
        self.masks.get(name).copied()
    }
}

impl Default for LayerTables {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_bit_operations() {
        let mut m = LayerMask::of(LAYER_FRONT);
        m.insert(LAYER_BACK);
        assert!(m.contains(LAYER_FRONT));
        assert!(m.contains(LAYER_BACK));
        assert!(!m.contains(5));
        assert!(m.intersects(LayerMask::ALL_COPPER));
        assert_eq!(m.iter().collect::<Vec<_>>(), vec![LAYER_BACK, LAYER_FRONT]);
    }

    #[test]
    fn default_tables_resolve_canonical_names() {
        let tables = LayerTables::new();
        assert_eq!(tables.index("F.Cu"), Some(LAYER_FRONT));
        assert_eq!(tables.index("B.Cu"), Some(LAYER_BACK));
        assert_eq!(tables.index("Edge.Cuts"), Some(EDGE_CUTS));
        assert_eq!(tables.mask("*.Cu"), Some(LayerMask::ALL_COPPER));
        assert_eq!(tables.index("Bogus.Layer"), None);
    }

    #[test]
    fn board_definitions_override_defaults() {
        let mut tables = LayerTables::new();
        tables.define("Ground", 2);
        assert_eq!(tables.index("Ground"), Some(2));
        assert_eq!(tables.mask("Ground"), Some(LayerMask::of(2)));
    }
}
