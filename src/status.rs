//! Каталог статусных сообщений для audit-событий и ошибок.
//!
//! Each variant renders one fixed message; the same text is used as the audit
//! `subject` and as the prefix of the matching error message.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Status<'a> {
    CrossAccountConnect {
        account: &'a str,
        role: &'a str,
        region: &'a str,
    },
    CrossAccountError,
    RegionConnect {
        region: &'a str,
    },
    RegionConnectError {
        region: &'a str,
    },
    RegionConnectInvalid {
        region: &'a str,
    },
    TagsInvalid,
    VolumesFetch {
        region: &'a str,
    },
    VolumesFetchError {
        region: &'a str,
    },
    SnapshotsFetch {
        region: &'a str,
    },
    SnapshotsFetchError {
        region: &'a str,
    },
    SnapshotCreate {
        volume: &'a str,
        description: &'a str,
    },
    SnapshotCreateSuccess {
        snapshot: &'a str,
        volume: &'a str,
    },
    SnapshotCreateError {
        volume: &'a str,
    },
    SnapshotDelete {
        snapshot: &'a str,
        description: &'a str,
    },
    SnapshotDeleteSuccess {
        snapshot: &'a str,
        description: &'a str,
    },
    SnapshotDeleteError {
        snapshot: &'a str,
        description: &'a str,
    },
    RetryAfterSleep {
        attempts: u32,
        seconds: f64,
    },
    RetryAllFail {
        retries: u32,
    },
}

impl Status<'_> {
    /// Stable machine key of the message.
    pub fn key(&self) -> &'static str {
        match self {
            Status::CrossAccountConnect { .. } => "cross_account_connect",
            Status::CrossAccountError => "cross_account_error",
            Status::RegionConnect { .. } => "region_connect",
            Status::RegionConnectError { .. } => "region_connect_error",
            Status::RegionConnectInvalid { .. } => "region_connect_invalid",
            Status::TagsInvalid => "tags_invalid",
            Status::VolumesFetch { .. } => "volumes_fetch",
            Status::VolumesFetchError { .. } => "volumes_fetch_error",
            Status::SnapshotsFetch { .. } => "snapshots_fetch",
            Status::SnapshotsFetchError { .. } => "snapshots_fetch_error",
            Status::SnapshotCreate { .. } => "snapshot_create",
            Status::SnapshotCreateSuccess { .. } => "snapshot_create_success",
            Status::SnapshotCreateError { .. } => "snapshot_create_error",
            Status::SnapshotDelete { .. } => "snapshot_delete",
            Status::SnapshotDeleteSuccess { .. } => "snapshot_delete_success",
            Status::SnapshotDeleteError { .. } => "snapshot_delete_error",
            Status::RetryAfterSleep { .. } => "retry_after_sleep",
            Status::RetryAllFail { .. } => "retry_all_fail",
        }
    }
}

impl fmt::Display for Status<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::CrossAccountConnect { account, role, region } => write!(
                f,
                "Creating cross account connection to `{account}` account using `{role}` role on `{region}` region"
            ),
            Status::CrossAccountError => f.write_str("Cannot complete cross account connection"),
            Status::RegionConnect { region } => write!(f, "Connecting to `{region}` region"),
            Status::RegionConnectError { region } => {
                write!(f, "Cannot complete connection to `{region}` region")
            }
            Status::RegionConnectInvalid { region } => write!(
                f,
                "Cannot complete connection to `{region}` region. Check to make sure you are connecting to a valid region"
            ),
            Status::TagsInvalid => f.write_str(
                "You have passed an invalid --tags parameter. Please make sure you follow the form: --tags name:value",
            ),
            Status::VolumesFetch { region } => write!(f, "Fetching volumes on `{region}` region"),
            Status::VolumesFetchError { region } => {
                write!(f, "Cannot fetch volumes on `{region}` region")
            }
            Status::SnapshotsFetch { region } => write!(f, "Fetching snapshots on `{region}` region"),
            Status::SnapshotsFetchError { region } => {
                write!(f, "Cannot fetch snapshots on `{region}` region")
            }
            Status::SnapshotCreate { volume, description } => write!(
                f,
                "Creating snapshot of volume `{volume}` and setting a description of `{description}`"
            ),
            Status::SnapshotCreateSuccess { snapshot, volume } => write!(
                f,
                "Successfully created snapshot `{snapshot}` from volume `{volume}`"
            ),
            Status::SnapshotCreateError { volume } => {
                write!(f, "Cannot create snapshot of volume `{volume}`")
            }
            Status::SnapshotDelete { snapshot, description } => write!(
                f,
                "Deleting snapshot `{snapshot}` with a description of `{description}`"
            ),
            Status::SnapshotDeleteSuccess { snapshot, description } => write!(
                f,
                "Successfully deleted snapshot `{snapshot}` with a description of `{description}`"
            ),
            Status::SnapshotDeleteError { snapshot, description } => write!(
                f,
                "Cannot delete snapshot `{snapshot}` with a description of `{description}`"
            ),
            Status::RetryAfterSleep { attempts, seconds } => write!(
                f,
                "`{attempts}` attempts failed, waiting `{seconds}` seconds before retrying"
            ),
            Status::RetryAllFail { retries } => {
                write!(f, "Total `{retries}` retries failed, giving up")
            }
        }
    }
}
