// Channel registry domain model
/// Stable store identifier of a channel
pub type ChannelId = i32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Power,
    Energy,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Power => "power",
            ChannelKind::Energy => "energy",
        }
    }
}

/// Definition of a channel as registered in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelDef {
    pub name: &'static str,
    pub kind: ChannelKind,
    pub unit: &'static str,
}

pub const SOLAR_POWER: ChannelDef = ChannelDef {
    name: "solar_power",
    kind: ChannelKind::Power,
    unit: "W",
};

pub const SOLAR_POWER_BY_MINUTE: ChannelDef = ChannelDef {
    name: "solar_power_by_minute",
    kind: ChannelKind::Power,
    unit: "W",
};

pub const METER_POWER: ChannelDef = ChannelDef {
    name: "meter_power",
    kind: ChannelKind::Power,
    unit: "W",
};

pub const METER_ENERGY: ChannelDef = ChannelDef {
    name: "meter_energy",
    kind: ChannelKind::Energy,
    unit: "Wh",
};

/// Channel ids resolved once at startup and handed to every component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channels {
    pub solar_power: ChannelId,
    pub solar_power_by_minute: ChannelId,
    pub meter_power: ChannelId,
    pub meter_energy: ChannelId,
}

impl Channels {
    /// Look up a resolved id by channel name
    pub fn id_for(&self, name: &str) -> Option<ChannelId> {
        match name {
            n if n == SOLAR_POWER.name => Some(self.solar_power),
            n if n == SOLAR_POWER_BY_MINUTE.name => Some(self.solar_power_by_minute),
            n if n == METER_POWER.name => Some(self.meter_power),
            n if n == METER_ENERGY.name => Some(self.meter_energy),
            _ => None,
        }
    }
}
