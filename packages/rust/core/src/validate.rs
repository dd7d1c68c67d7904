//! Manifest validation: no two files may share a destination path.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{error, info, instrument};

use docassembler_shared::{AssembleConfig, FileRecord, ReturnCode};

/// Files that would all be written to the same destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Collision {
    pub destination_path: String,
    pub members: Vec<CollisionMember>,
}

/// One file taking part in a collision, with the group that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollisionMember {
    pub source_path: String,
    pub group: usize,
}

/// Result of the validation stage.
#[derive(Debug, Clone, Default)]
pub struct Validation {
    pub code: ReturnCode,
    pub collisions: Vec<Collision>,
}

/// Group the manifest by destination path and report every shared destination.
///
/// Collisions are returned ordered by destination path; members keep manifest order.
pub fn find_collisions(files: &[FileRecord]) -> Vec<Collision> {
    let mut by_destination: BTreeMap<&str, Vec<&FileRecord>> = BTreeMap::new();
    for file in files {
        by_destination
            .entry(file.destination_path.as_str())
            .or_default()
            .push(file);
    }

    by_destination
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|(destination, members)| Collision {
            destination_path: destination.to_string(),
            members: members
                .into_iter()
                .map(|f| CollisionMember {
                    source_path: f.source_path.clone(),
                    group: f.group,
                })
                .collect(),
        })
        .collect()
}

/// Validate the manifest. Any collision makes the stage `Error`.
#[instrument(skip_all, fields(files = files.len()))]
pub fn validate_manifest(files: &[FileRecord], config: &AssembleConfig) -> Validation {
    let collisions = find_collisions(files);

    for collision in &collisions {
        for member in &collision.members {
            let group = config
                .content
                .get(member.group)
                .map(|g| g.label(member.group))
                .unwrap_or_else(|| format!("#{}", member.group));
            error!(
                destination = %collision.destination_path,
                source = %member.source_path,
                group = %group,
                "destination path collision"
            );
        }
    }

    let code = if collisions.is_empty() {
        ReturnCode::Normal
    } else {
        ReturnCode::Error
    };
    info!(collisions = collisions.len(), %code, "validation complete");

    Validation { code, collisions }
}
