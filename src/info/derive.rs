//! Derived fields computed after all sections are merged

use tracing::{debug, warn};

use super::parser::{StatusMap, StatusValue};

/// `(canonical, legacy)` key pairs. The legacy value is copied under the
/// canonical name when only the legacy key is present.
pub const LEGACY_ALIASES: &[(&str, &str)] =
    &[("changes_since_last_save", "rdb_changes_since_last_save")];

/// Keys holding the primary's replication offset, first present wins
pub const PRIMARY_OFFSET_KEYS: &[&str] = &["master_repl_offset", "primary_repl_offset"];

/// Record key prefixes of per-replica rows (`slave0`, `replica1`, ...)
pub const REPLICA_PREFIXES: &[&str] = &["slave", "replica"];

/// Counts of fields added by [`derive_fields`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DerivedFields {
    pub aliases: usize,
    pub replica_delays: usize,
}

/// Run every derivation over a merged namespace
pub fn derive_fields(map: &mut StatusMap) -> DerivedFields {
    DerivedFields {
        aliases: apply_aliases(map, LEGACY_ALIASES),
        replica_delays: compute_replica_delays(map),
    }
}

/// Copy legacy-named values under their canonical names
pub fn apply_aliases(map: &mut StatusMap, aliases: &[(&str, &str)]) -> usize {
    let mut applied = 0;
    for &(canonical, legacy) in aliases {
        if map.contains_key(canonical) {
            continue;
        }
        if let Some(value) = map.get(legacy).cloned() {
            map.insert(canonical, value);
            applied += 1;
        }
    }
    applied
}

/// `slave0` -> true, `slave_repl_offset` -> false
pub fn is_replica_key(key: &str) -> bool {
    REPLICA_PREFIXES.iter().any(|prefix| {
        key.strip_prefix(prefix)
            .is_some_and(|index| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()))
    })
}

/// Store `delay = primary_offset - offset` in every replica record
pub fn compute_replica_delays(map: &mut StatusMap) -> usize {
    let Some(primary_offset) = primary_offset(map) else {
        return 0;
    };

    let replicas: Vec<(String, Option<String>)> = map
        .iter()
        .filter(|(key, _)| is_replica_key(key))
        .filter_map(|(key, value)| match value {
            StatusValue::Record(record) => Some((key.clone(), record.get("offset").cloned())),
            StatusValue::Scalar(_) => None,
        })
        .collect();

    let mut computed = 0;
    for (key, offset) in replicas {
        let Some(offset) = offset else {
            debug!("Replica {} reports no offset", key);
            continue;
        };
        let Ok(offset) = offset.parse::<i64>() else {
            warn!("Replica {} has non-integer offset: {}", key, offset);
            continue;
        };
        let Some(delay) = primary_offset.checked_sub(offset) else {
            warn!("Replica {} offset {} out of range", key, offset);
            continue;
        };

        if let Some(record) = map.record_mut(&key) {
            record.insert("delay".to_string(), delay.to_string());
            computed += 1;
        }
    }
    computed
}

fn primary_offset(map: &StatusMap) -> Option<i64> {
    let (key, raw) = PRIMARY_OFFSET_KEYS
        .iter()
        .find_map(|key| map.scalar(key).map(|v| (*key, v)))
        .or_else(|| {
            debug!("No primary replication offset, skipping replica delay");
            None
        })?;

    match raw.parse::<i64>() {
        Ok(offset) => Some(offset),
        Err(_) => {
            warn!("{} is not an integer: {}", key, raw);
            None
        }
    }
}
