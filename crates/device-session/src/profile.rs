//! Per-platform interaction profiles
//!
//! A profile tells a session how to recognise the device prompt, how to enter
//! privileged mode, how to turn off output paging and how to leave. Profiles are
//! looked up by the inventory's `device_type`; unknown types fall back to a
//! Cisco-like generic profile.

use crate::error::{Error, Result};
use regex::Regex;

/// How to drive one family of device CLIs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceProfile {
    /// Canonical device type name
    pub name: &'static str,
    /// Pattern matched against the last (cleaned) line of output
    pub prompt_pattern: &'static str,
    /// Last prompt character that signals privileged mode, if the platform has one
    pub privileged_marker: Option<char>,
    /// Command that enters privileged mode
    pub enable_command: Option<&'static str>,
    /// Command that disables `--More--` paging for the session
    pub paging_command: Option<&'static str>,
    /// Command that ends the session
    pub exit_command: &'static str,
}

const CISCO_PROMPT: &str = r"^[\w.\-@/:]+(\([\w.\-]+\))?[>#]\s*$";

const GENERIC: DeviceProfile = DeviceProfile {
    name: "generic",
    prompt_pattern: CISCO_PROMPT,
    privileged_marker: Some('#'),
    enable_command: Some("enable"),
    paging_command: Some("terminal length 0"),
    exit_command: "exit",
};

const PROFILES: &[DeviceProfile] = &[
    DeviceProfile { name: "cisco_ios", ..GENERIC },
    DeviceProfile { name: "cisco_xe", ..GENERIC },
    DeviceProfile { name: "cisco_nxos", ..GENERIC },
    DeviceProfile { name: "arista_eos", ..GENERIC },
    DeviceProfile { name: "dell_os10", ..GENERIC },
    DeviceProfile {
        name: "hp_procurve",
        paging_command: Some("no page"),
        exit_command: "logout",
        ..GENERIC
    },
    DeviceProfile {
        name: "aruba_os",
        paging_command: Some("no paging"),
        ..GENERIC
    },
    DeviceProfile {
        name: "huawei",
        prompt_pattern: r"^[<\[][\w.\-@/:~]+[>\]]\s*$",
        privileged_marker: None,
        enable_command: None,
        paging_command: Some("screen-length 0 temporary"),
        exit_command: "quit",
    },
    DeviceProfile {
        name: "juniper_junos",
        prompt_pattern: r"^[\w.\-@/:]+[>#%]\s*$",
        privileged_marker: None,
        enable_command: None,
        paging_command: Some("set cli screen-length 0"),
        exit_command: "exit",
    },
    DeviceProfile {
        name: "linux",
        prompt_pattern: r"[$#]\s*$",
        privileged_marker: None,
        enable_command: None,
        paging_command: None,
        exit_command: "exit",
    },
];

impl DeviceProfile {
    /// Look up the profile for a device type (case-insensitive)
    pub fn for_device_type(device_type: &str) -> &'static DeviceProfile {
        let wanted = device_type.trim().to_ascii_lowercase();
        PROFILES
            .iter()
            .find(|p| p.name == wanted)
            .unwrap_or(&GENERIC)
    }

    /// Compile the prompt pattern
    pub fn prompt_regex(&self) -> Result<Regex> {
        Regex::new(self.prompt_pattern).map_err(|source| Error::InvalidPattern {
            pattern: self.prompt_pattern.to_string(),
            source,
        })
    }

    /// Whether `prompt` shows the session is already privileged
    ///
    /// Platforms without a privileged marker are always considered privileged.
    pub fn is_privileged(&self, prompt: &str) -> bool {
        match self.privileged_marker {
            Some(marker) => prompt.trim_end().ends_with(marker),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_and_fallback_profiles() {
        assert_eq!(DeviceProfile::for_device_type("hp_procurve").paging_command, Some("no page"));
        assert_eq!(DeviceProfile::for_device_type(" Juniper_JunOS ").name, "juniper_junos");
        assert_eq!(DeviceProfile::for_device_type("mystery_box").name, "generic");
    }

    #[test]
    fn test_all_patterns_compile() {
        for profile in PROFILES.iter().chain(std::iter::once(&GENERIC)) {
            assert!(profile.prompt_regex().is_ok(), "{} pattern", profile.name);
        }
    }

    #[test]
    fn test_cisco_prompt_matching() {
        let re = DeviceProfile::for_device_type("cisco_ios").prompt_regex().unwrap();
        assert!(re.is_match("core-sw1>"));
        assert!(re.is_match("core-sw1#"));
        assert!(re.is_match("core-sw1(config)#"));
        assert!(!re.is_match("Gi1/0/1  connected  full"));
        assert!(!re.is_match("Password: "));
    }

    #[test]
    fn test_huawei_prompt_matching() {
        let re = DeviceProfile::for_device_type("huawei").prompt_regex().unwrap();
        assert!(re.is_match("<HUAWEI>"));
        assert!(re.is_match("[HUAWEI-GigabitEthernet0/0/1]"));
    }

    #[test]
    fn test_privileged_detection() {
        let ios = DeviceProfile::for_device_type("cisco_ios");
        assert!(ios.is_privileged("sw1#"));
        assert!(!ios.is_privileged("sw1>"));

        let junos = DeviceProfile::for_device_type("juniper_junos");
        assert!(junos.is_privileged("admin@mx1>"));
    }
}
