//! Snapshot naming contract.
//!
//! Description = `BACKUP_MONKEY <volume-id> [<instance-id>] [<device>]`,
//! space-joined. The prefix is the only marker retention relies on: a
//! snapshot whose description does not start with it is never touched.

use crate::consts::{RESERVED_TAG_PREFIX, SNAPSHOT_PREFIX};
use crate::model::{Tags, Volume};

/// Description for a new snapshot of `volume`.
pub fn describe(volume: &Volume) -> String {
    let mut parts: Vec<&str> = vec![SNAPSHOT_PREFIX, volume.id.as_str()];
    if let Some(instance) = volume.instance_id.as_deref().filter(|s| !s.is_empty()) {
        parts.push(instance);
    }
    if let Some(device) = volume.device.as_deref().filter(|s| !s.is_empty()) {
        parts.push(device);
    }
    parts.join(" ")
}

pub fn is_managed(description: &str) -> bool {
    description.starts_with(SNAPSHOT_PREFIX)
}

/// Volume tags minus the provider-reserved namespace.
pub fn snapshot_tags(tags: &Tags) -> Tags {
    tags.iter()
        .filter(|(k, _)| !k.starts_with(RESERVED_TAG_PREFIX))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detached_volume_has_short_description() {
        let v = Volume::new("vol-9");
        assert_eq!(describe(&v), "BACKUP_MONKEY vol-9");
    }

    #[test]
    fn foreign_descriptions_are_not_managed() {
        assert!(!is_managed("Created by CreateImage"));
        assert!(!is_managed("backup_monkey vol-1"));
        assert!(is_managed("BACKUP_MONKEY vol-1 i-1 /dev/sda"));
    }
}
