//! Net table and net classes.

use boardkit_core::units::mm_to_iu;
use tracing::debug;

use crate::error::BoardError;
use crate::NET_UNCONNECTED;

/// One entry of the net table: a unique code paired with a unique name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetInfo {
    pub code: i32,
    pub name: String,
}

/// The board's net table. Code 0 is reserved for "no net" and always
/// present with an empty name.
#[derive(Debug, Clone)]
pub struct NetInfoList {
    nets: Vec<NetInfo>,
}

impl NetInfoList {
    pub fn new() -> Self {
        Self {
            nets: vec![NetInfo {
                code: NET_UNCONNECTED,
                name: String::new(),
            }],
        }
    }

    pub fn len(&self) -> usize {
        self.nets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NetInfo> {
        self.nets.iter()
    }

    /// Adds a net, refusing code or name collisions.
    pub fn add(&mut self, code: i32, name: &str) -> Result<(), BoardError> {
        let collides = self
            .nets
            .iter()
            .any(|n| n.code == code || (!name.is_empty() && n.name == name));
        if collides {
            return Err(BoardError::DuplicateNet {
                code,
                name: name.to_string(),
            });
        }
        self.nets.push(NetInfo {
            code,
            name: name.to_string(),
        });
        Ok(())
    }

    pub fn by_code(&self, code: i32) -> Option<&NetInfo> {
        self.nets.iter().find(|n| n.code == code)
    }

    pub fn by_name(&self, name: &str) -> Option<&NetInfo> {
        self.nets.iter().find(|n| n.name == name)
    }

    /// The net name for a code, empty for unknown or unconnected codes.
    pub fn name_of(&self, code: i32) -> &str {
        self.by_code(code).map(|n| n.name.as_str()).unwrap_or("")
    }
}

impl Default for NetInfoList {
    fn default() -> Self {
        Self::new()
    }
}

/// A named group of nets sharing routing defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetClass {
    pub name: String,
    pub description: String,
    pub clearance: i32,
    pub track_width: i32,
    pub via_diameter: i32,
    pub via_drill: i32,
    pub uvia_diameter: i32,
    pub uvia_drill: i32,
    /// Names of member nets. A net belongs to at most one class; callers go
    /// through [`NetClasses::assign_net`] to keep that invariant.
    pub nets: Vec<String>,
}

impl NetClass {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            clearance: mm_to_iu(0.2),
            track_width: mm_to_iu(0.25),
            via_diameter: mm_to_iu(0.6),
            via_drill: mm_to_iu(0.4),
            uvia_diameter: mm_to_iu(0.3),
            uvia_drill: mm_to_iu(0.1),
            nets: Vec::new(),
        }
    }
}

/// Name of the mandatory catch-all class.
pub const DEFAULT_CLASS: &str = "Default";

/// The board's net classes: a mandatory `Default` class plus user classes.
#[derive(Debug, Clone)]
pub struct NetClasses {
    default: NetClass,
    others: Vec<NetClass>,
}

impl NetClasses {
    pub fn new() -> Self {
        Self {
            default: NetClass::new(DEFAULT_CLASS),
            others: Vec::new(),
        }
    }

    pub fn default_class(&self) -> &NetClass {
        &self.default
    }

    pub fn default_class_mut(&mut self) -> &mut NetClass {
        &mut self.default
    }

    pub fn len(&self) -> usize {
        self.others.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterates all classes, `Default` first.
    pub fn iter(&self) -> impl Iterator<Item = &NetClass> {
        std::iter::once(&self.default).chain(self.others.iter())
    }

    pub fn get(&self, name: &str) -> Option<&NetClass> {
        self.iter().find(|c| c.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut NetClass> {
        if name == self.default.name {
            return Some(&mut self.default);
        }
        self.others.iter_mut().find(|c| c.name == name)
    }

    /// Adds a class, refusing a name collision without mutating any
    /// existing class. The new class's member nets are taken away from any
    /// class that previously held them.
    pub fn add(&mut self, class: NetClass) -> Result<(), BoardError> {
        if self.get(&class.name).is_some() {
            return Err(BoardError::DuplicateNetClass { name: class.name });
        }
        for net in &class.nets {
            self.remove_net(net);
        }
        debug!(class = %class.name, members = class.nets.len(), "net class added");
        self.others.push(class);
        Ok(())
    }

    /// Moves `net_name` into the class `class_name`, detaching it from any
    /// other class first. Unknown class names fall back to `Default`.
    pub fn assign_net(&mut self, net_name: &str, class_name: &str) {
        self.remove_net(net_name);
        let target = match self.get_mut(class_name) {
            Some(class) => class,
            None => &mut self.default,
        };
        target.nets.push(net_name.to_string());
    }

    fn remove_net(&mut self, net_name: &str) {
        self.default.nets.retain(|n| n != net_name);
        for class in &mut self.others {
            class.nets.retain(|n| n != net_name);
        }
    }

    /// The class holding `net_name`, or `Default` when unassigned.
    pub fn class_for_net(&self, net_name: &str) -> &NetClass {
        self.others
            .iter()
            .find(|c| c.nets.iter().any(|n| n == net_name))
            .unwrap_or(&self.default)
    }

    /// The class for a net code, resolved through the net table.
    pub fn class_for_net_code(&self, code: i32, nets: &NetInfoList) -> &NetClass {
        self.class_for_net(nets.name_of(code))
    }
}

impl Default for NetClasses {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn net_zero_is_reserved() {
        let nets = NetInfoList::new();
        assert_eq!(nets.len(), 1);
        assert_eq!(nets.name_of(0), "");
    }

    #[test]
    fn duplicate_net_code_refused() {
        let mut nets = NetInfoList::new();
        nets.add(1, "GND").unwrap();
        assert!(nets.add(1, "VCC").is_err());
        assert!(nets.add(2, "GND").is_err());
        assert_eq!(nets.len(), 2);
    }

    #[test]
    fn duplicate_class_add_fails_without_mutation() {
        let mut classes = NetClasses::new();
        let mut power = NetClass::new("Power");
        power.nets.push("VCC".to_string());
        classes.add(power).unwrap();

        let mut second = NetClass::new("Power");
        second.nets.push("GND".to_string());
        assert!(matches!(
            classes.add(second),
            Err(BoardError::DuplicateNetClass { .. })
        ));
        // The surviving class keeps its original membership.
        assert_eq!(classes.get("Power").unwrap().nets, vec!["VCC"]);
    }

    #[test]
    fn net_belongs_to_one_class_at_a_time() {
        let mut classes = NetClasses::new();
        classes.add(NetClass::new("Power")).unwrap();
        classes.add(NetClass::new("HighSpeed")).unwrap();

        classes.assign_net("CLK", "Power");
        classes.assign_net("CLK", "HighSpeed");
        assert!(classes.get("Power").unwrap().nets.is_empty());
        assert_eq!(classes.get("HighSpeed").unwrap().nets, vec!["CLK"]);
        assert_eq!(classes.class_for_net("CLK").name, "HighSpeed");
        assert_eq!(classes.class_for_net("UNASSIGNED").name, DEFAULT_CLASS);
    }

    #[test]
    fn adding_class_steals_members() {
        let mut classes = NetClasses::new();
        classes.assign_net("GND", DEFAULT_CLASS);
        let mut power = NetClass::new("Power");
        power.nets.push("GND".to_string());
        classes.add(power).unwrap();
        assert!(classes.default_class().nets.is_empty());
        assert_eq!(classes.class_for_net("GND").name, "Power");
    }
}
