//! Dependency rule tables
//!
//! Three tables cover the scenarios a statistics algorithm can be in:
//! independent roles, a role that just switched, and a single algorithm
//! instance serving every pipeline. Lookups return the first row matching
//! `(sync_type, role)`; a miss is a configuration error.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::SyncError;

/// Maximum property pairs honoured per rule
pub const MAX_PROPERTY_PAIRS: usize = 5;

/// Statistics algorithm being synchronized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncType {
    Aec,
    Awb,
    Af,
}

impl SyncType {
    pub const ALL: [SyncType; 3] = [SyncType::Aec, SyncType::Awb, SyncType::Af];
}

/// Role of a pipeline's algorithm for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgoRole {
    #[default]
    Master,
    Follower,
}

impl AlgoRole {
    pub fn from_master_flag(is_master: bool) -> Self {
        if is_master {
            AlgoRole::Master
        } else {
            AlgoRole::Follower
        }
    }
}

/// What the algorithm does with the request once dependencies resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgoAction {
    /// Run the algorithm normally
    #[default]
    ProcessRequest,
    /// Derive follower state from the master's published output
    ProcessMapping,
    /// Set up as the new master after a role change
    SwitchToMaster,
    /// Set up as the new follower after a role change
    SwitchToFollower,
}

/// Which scenario a table serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Independent,
    RoleSwitch,
    Singleton,
}

/// Key of a published data item another request can wait on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyId(pub u32);

impl PropertyId {
    /// Terminates a property list
    pub const NONE: PropertyId = PropertyId(0);
    pub const AEC_PEER_INFO: PropertyId = PropertyId(0x0300_0001);
    pub const AWB_PEER_INFO: PropertyId = PropertyId(0x0300_0002);
    pub const AF_PEER_INFO: PropertyId = PropertyId(0x0300_0003);
    pub const CROSS_AEC_STATS: PropertyId = PropertyId(0x0300_0011);
    pub const CROSS_AWB_STATS: PropertyId = PropertyId(0x0300_0012);
    pub const CROSS_AF_STATS: PropertyId = PropertyId(0x0300_0013);

    pub fn is_none(&self) -> bool {
        self.0 == 0
    }

    /// Peer info published by the master's algorithm
    pub fn peer_info(sync_type: SyncType) -> Self {
        match sync_type {
            SyncType::Aec => Self::AEC_PEER_INFO,
            SyncType::Awb => Self::AWB_PEER_INFO,
            SyncType::Af => Self::AF_PEER_INFO,
        }
    }

    /// Statistics shared by a singleton algorithm
    pub fn cross_stats(sync_type: SyncType) -> Self {
        match sync_type {
            SyncType::Aec => Self::CROSS_AEC_STATS,
            SyncType::Awb => Self::CROSS_AWB_STATS,
            SyncType::Af => Self::CROSS_AF_STATS,
        }
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

/// One dependency declared by a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyPair {
    pub property: PropertyId,

    /// Owned by the peer pipeline rather than this one
    #[serde(default)]
    pub cross_pipeline: bool,
}

impl PropertyPair {
    pub fn new(property: PropertyId, cross_pipeline: bool) -> Self {
        Self {
            property,
            cross_pipeline,
        }
    }
}

/// Table row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRule {
    pub sync_type: SyncType,
    pub role: AlgoRole,
    #[serde(default)]
    pub properties: Vec<PropertyPair>,
    pub action: AlgoAction,
}

impl DependencyRule {
    pub fn new(
        sync_type: SyncType,
        role: AlgoRole,
        properties: Vec<PropertyPair>,
        action: AlgoAction,
    ) -> Self {
        Self {
            sync_type,
            role,
            properties,
            action,
        }
    }

    /// Pairs up to the first `NONE` key, at most [`MAX_PROPERTY_PAIRS`]
    pub fn active_properties(&self) -> impl Iterator<Item = &PropertyPair> {
        self.properties
            .iter()
            .take(MAX_PROPERTY_PAIRS)
            .take_while(|p| !p.property.is_none())
    }
}

/// Rule table for one scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyTable {
    pub kind: TableKind,
    pub rules: Vec<DependencyRule>,
}

impl DependencyTable {
    /// Master waits on its previous peer's info; follower maps from the master
    pub fn independent() -> Self {
        let rules = SyncType::ALL
            .iter()
            .flat_map(|&st| {
                let pair = vec![PropertyPair::new(PropertyId::peer_info(st), true)];
                [
                    DependencyRule::new(st, AlgoRole::Master, pair.clone(), AlgoAction::ProcessRequest),
                    DependencyRule::new(st, AlgoRole::Follower, pair, AlgoAction::ProcessMapping),
                ]
            })
            .collect();

        Self {
            kind: TableKind::Independent,
            rules,
        }
    }

    /// No waits; the algorithm re-initialises in its new role
    pub fn role_switch() -> Self {
        let rules = SyncType::ALL
            .iter()
            .flat_map(|&st| {
                [
                    DependencyRule::new(st, AlgoRole::Master, Vec::new(), AlgoAction::SwitchToMaster),
                    DependencyRule::new(st, AlgoRole::Follower, Vec::new(), AlgoAction::SwitchToFollower),
                ]
            })
            .collect();

        Self {
            kind: TableKind::RoleSwitch,
            rules,
        }
    }

    /// Both roles wait on the shared cross-pipeline statistics
    pub fn singleton() -> Self {
        let rules = SyncType::ALL
            .iter()
            .flat_map(|&st| {
                let pair = vec![PropertyPair::new(PropertyId::cross_stats(st), true)];
                [
                    DependencyRule::new(st, AlgoRole::Master, pair.clone(), AlgoAction::ProcessRequest),
                    DependencyRule::new(st, AlgoRole::Follower, pair, AlgoAction::ProcessRequest),
                ]
            })
            .collect();

        Self {
            kind: TableKind::Singleton,
            rules,
        }
    }

    /// First rule matching `(sync_type, role)`
    pub fn lookup(&self, sync_type: SyncType, role: AlgoRole) -> Result<&DependencyRule, SyncError> {
        self.rules
            .iter()
            .find(|r| r.sync_type == sync_type && r.role == role)
            .ok_or(SyncError::NoMatchingRule {
                sync_type,
                role,
                table: self.kind,
            })
    }

    /// Each `(sync_type, role)` at most once, at most five pairs per rule
    pub fn validate(&self) -> Result<(), SyncError> {
        for (i, rule) in self.rules.iter().enumerate() {
            let duplicate = self.rules[..i]
                .iter()
                .any(|r| r.sync_type == rule.sync_type && r.role == rule.role);
            if duplicate {
                return Err(SyncError::InvalidTable(format!(
                    "{:?} table has more than one {:?}/{:?} rule",
                    self.kind, rule.sync_type, rule.role
                )));
            }

            if rule.properties.len() > MAX_PROPERTY_PAIRS {
                return Err(SyncError::InvalidTable(format!(
                    "{:?} table rule {:?}/{:?} has {} properties, max {}",
                    self.kind,
                    rule.sync_type,
                    rule.role,
                    rule.properties.len(),
                    MAX_PROPERTY_PAIRS
                )));
            }
        }
        Ok(())
    }
}

/// The three scenario tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyTables {
    pub independent: DependencyTable,
    pub role_switch: DependencyTable,
    pub singleton: DependencyTable,
}

impl Default for DependencyTables {
    fn default() -> Self {
        Self {
            independent: DependencyTable::independent(),
            role_switch: DependencyTable::role_switch(),
            singleton: DependencyTable::singleton(),
        }
    }
}

impl DependencyTables {
    pub fn get(&self, kind: TableKind) -> &DependencyTable {
        match kind {
            TableKind::Independent => &self.independent,
            TableKind::RoleSwitch => &self.role_switch,
            TableKind::Singleton => &self.singleton,
        }
    }

    pub fn validate(&self) -> Result<(), SyncError> {
        for (expected, table) in [
            (TableKind::Independent, &self.independent),
            (TableKind::RoleSwitch, &self.role_switch),
            (TableKind::Singleton, &self.singleton),
        ] {
            if table.kind != expected {
                return Err(SyncError::InvalidTable(format!(
                    "{:?} table declared as {:?}",
                    expected, table.kind
                )));
            }
            table.validate()?;
        }
        Ok(())
    }

    /// Load and validate tables from a TOML/JSON/YAML file
    pub fn from_file(path: &Path) -> Result<Self, SyncError> {
        let tables: Self = config::Config::builder()
            .add_source(config::File::from(path))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| SyncError::Load(e.to_string()))?;

        tables.validate()?;
        info!("Loaded dependency tables from {}", path.display());
        Ok(tables)
    }

    /// Parse and validate tables from text in the given format
    pub fn parse(text: &str, format: config::FileFormat) -> Result<Self, SyncError> {
        let tables: Self = config::Config::builder()
            .add_source(config::File::from_str(text, format))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| SyncError::Load(e.to_string()))?;

        tables.validate()?;
        Ok(tables)
    }
}
