//! Static table of per-OS installation defaults.
//!
//! The table is embedded from `os_types.yaml` and parsed once on first
//! use. Lookups resolve through three levels, most specific first:
//! the selected variant, its OS type, and the global defaults.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use serde::Deserialize;
use strum::Display;

use crate::error::DistroError;

const OS_TYPES_YAML: &str = include_str!("os_types.yaml");

/// Wildcard hypervisor type in device rules.
pub const ANY_HV: &str = "all";

static OS_DICT: LazyLock<Result<OsDict, String>> =
    LazyLock::new(|| serde_yaml::from_str::<OsDict>(OS_TYPES_YAML).map_err(|e| e.to_string()));

/// Returns the parsed table.
pub fn os_dict() -> Result<&'static OsDict, DistroError> {
    OS_DICT
        .as_ref()
        .map_err(|e| DistroError::Config(format!("embedded OS table is invalid: {}", e)))
}

/// Guest clock offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ClockMode {
    Utc,
    Localtime,
}

/// A recommended value for a device attribute on some hypervisor types.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceRule {
    pub hv: Vec<String>,
    /// `None` means "leave it to the hypervisor".
    pub value: Option<String>,
}

/// device class -> attribute -> rules
pub type DeviceTable = BTreeMap<String, BTreeMap<String, Vec<DeviceRule>>>;

/// One level of the table: the defaults, an OS type or a variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OsEntry {
    pub label: Option<String>,
    /// Distribution family key used as the acquisition hint.
    pub distro: Option<String>,
    pub clock: Option<ClockMode>,
    #[serde(rename = "continue")]
    pub continue_install: Option<bool>,
    pub acpi: Option<bool>,
    pub apic: Option<bool>,
    #[serde(default)]
    pub devices: DeviceTable,
    #[serde(default)]
    pub variants: BTreeMap<String, OsEntry>,
}

impl OsEntry {
    fn device_rule(&self, device: &str, attribute: &str, hv: &str) -> Option<&DeviceRule> {
        let rules = self.devices.get(device)?.get(attribute)?;
        rules
            .iter()
            .find(|rule| rule.hv.iter().any(|h| h == hv))
            .or_else(|| rules.iter().find(|rule| rule.hv.iter().any(|h| h == ANY_HV)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OsDict {
    pub defaults: OsEntry,
    pub os_types: BTreeMap<String, OsEntry>,
}

impl OsDict {
    /// OS type keys in sorted order.
    pub fn os_types(&self) -> impl Iterator<Item = (&str, &OsEntry)> {
        self.os_types.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Variants of `os_type`, or `None` for an unknown type.
    pub fn variants(&self, os_type: &str) -> Option<impl Iterator<Item = (&str, &OsEntry)>> {
        self.os_types
            .get(&os_type.to_ascii_lowercase())
            .map(|entry| entry.variants.iter().map(|(k, v)| (k.as_str(), v)))
    }

    /// Finds a variant in any OS type, returning the owning type key.
    pub fn find_variant(&self, variant: &str) -> Option<(&str, &OsEntry)> {
        let variant = variant.to_ascii_lowercase();
        self.os_types
            .iter()
            .find_map(|(os_type, entry)| entry.variants.get(&variant).map(|v| (os_type.as_str(), v)))
    }
}

/// A validated OS type and variant choice.
#[derive(Debug, Clone)]
pub struct OsSelection {
    dict: &'static OsDict,
    os_type: Option<String>,
    variant: Option<String>,
}

impl OsSelection {
    /// Validates the keys case-insensitively. A variant alone selects
    /// its owning type; a variant given with a type must belong to it.
    pub fn new(os_type: Option<&str>, variant: Option<&str>) -> Result<Self, DistroError> {
        let dict = os_dict()?;
        let mut os_type = os_type.map(str::to_ascii_lowercase);
        if let Some(key) = &os_type
            && !dict.os_types.contains_key(key)
        {
            return Err(DistroError::Validation(format!("unknown OS type '{}'", key)));
        }

        let variant = match variant.map(str::to_ascii_lowercase) {
            None => None,
            Some(key) => match (&os_type, dict.find_variant(&key)) {
                (_, None) => return Err(DistroError::Validation(format!("unknown OS variant '{}'", key))),
                (Some(selected), Some((owner, _))) if selected != owner => {
                    return Err(DistroError::Validation(format!(
                        "OS variant '{}' is not a variant of '{}'",
                        key, selected
                    )));
                }
                (_, Some((owner, _))) => {
                    os_type = Some(owner.to_string());
                    Some(key)
                }
            },
        };

        Ok(Self { dict, os_type, variant })
    }

    pub fn os_type(&self) -> Option<&str> {
        self.os_type.as_deref()
    }

    pub fn variant(&self) -> Option<&str> {
        self.variant.as_deref()
    }

    fn type_entry(&self) -> Option<&'static OsEntry> {
        self.os_type.as_ref().and_then(|key| self.dict.os_types.get(key))
    }

    fn variant_entry(&self) -> Option<&'static OsEntry> {
        let variant = self.variant.as_ref()?;
        self.type_entry()?.variants.get(variant)
    }

    /// Levels in lookup order.
    fn levels(&self) -> impl Iterator<Item = &'static OsEntry> {
        [self.variant_entry(), self.type_entry(), Some(&self.dict.defaults)]
            .into_iter()
            .flatten()
    }

    fn lookup<T>(&self, field: impl Fn(&'static OsEntry) -> Option<T>) -> Option<T> {
        self.levels().find_map(field)
    }

    pub fn label(&self) -> Option<&'static str> {
        self.lookup(|e| e.label.as_deref())
    }

    /// Distribution family key, if the variant names one.
    pub fn distro(&self) -> Option<&'static str> {
        self.lookup(|e| e.distro.as_deref())
    }

    pub fn clock(&self) -> ClockMode {
        self.lookup(|e| e.clock).unwrap_or(ClockMode::Utc)
    }

    /// Whether the installer reboots into a second install stage.
    pub fn continue_install(&self) -> bool {
        self.lookup(|e| e.continue_install).unwrap_or(false)
    }

    pub fn acpi(&self) -> bool {
        self.lookup(|e| e.acpi).unwrap_or(true)
    }

    pub fn apic(&self) -> bool {
        self.lookup(|e| e.apic).unwrap_or(true)
    }

    /// Recommended value of `attribute` for a `device` on hypervisor `hv`.
    ///
    /// At each level a rule naming `hv` beats an `all` rule; a more
    /// specific level beats any rule of a less specific one. `None` means
    /// no level has an opinion other than the hypervisor's own default.
    pub fn device_param(&self, device: &str, attribute: &str, hv: &str) -> Option<&'static str> {
        let hv = hv.to_ascii_lowercase();
        self.levels()
            .find_map(|entry| entry.device_rule(device, attribute, &hv))
            .and_then(|rule| rule.value.as_deref())
    }
}
