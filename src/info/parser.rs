//! INFO text parsing
//!
//! Turns the payload of one bulk reply into a [`StatusMap`]:
//!
//! ```text
//! # Server
//! uptime_in_seconds:1234
//! db0:keys=10,expires=0,avg_ttl=0
//! ```
//!
//! Plain lines become scalars. Lines whose value contains `,` become
//! records of `sub_key=sub_value` fields, split on the last `=` so that
//! values may themselves contain `=`. Records are kept nested, and every
//! record field is also reachable under the composite key `parent_sub`
//! (see [`StatusMap::lookup`] and [`StatusMap::flatten`]).

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::ops::Bound;

use tracing::warn;

/// Fields of one multi-value line, e.g. a `db0` or `slave0` row
pub type Record = BTreeMap<String, String>;

/// Value of one INFO line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusValue {
    Scalar(String),
    Record(Record),
}

impl StatusValue {
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            StatusValue::Scalar(s) => Some(s),
            StatusValue::Record(_) => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            StatusValue::Record(r) => Some(r),
            StatusValue::Scalar(_) => None,
        }
    }
}

/// Parsed INFO section, keyed by line key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusMap {
    entries: BTreeMap<String, StatusValue>,
}

impl StatusMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a bulk-reply payload
    pub fn parse(text: &str) -> Self {
        let mut map = StatusMap::new();

        for line in text.split(line_separator(text)) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                warn!("Bad format for info line: {}", line);
                continue;
            };

            let value = if value.contains(',') {
                StatusValue::Record(parse_record(key, value))
            } else {
                StatusValue::Scalar(value.to_string())
            };

            map.entries.insert(key.to_string(), value);
        }

        map
    }

    pub fn get(&self, key: &str) -> Option<&StatusValue> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Scalar value of `key`, `None` if absent or a record
    pub fn scalar(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(StatusValue::as_scalar)
    }

    /// Record stored under `key`, `None` if absent or a scalar
    pub fn record(&self, key: &str) -> Option<&Record> {
        self.entries.get(key).and_then(StatusValue::as_record)
    }

    pub fn record_mut(&mut self, key: &str) -> Option<&mut Record> {
        match self.entries.get_mut(key) {
            Some(StatusValue::Record(r)) => Some(r),
            _ => None,
        }
    }

    /// Insert a value, returning the one it replaced
    pub fn insert(&mut self, key: impl Into<String>, value: StatusValue) -> Option<StatusValue> {
        self.entries.insert(key.into(), value)
    }

    /// Move every entry of `other` into this map; `other` wins on collision
    pub fn extend(&mut self, other: StatusMap) {
        self.entries.extend(other.entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, StatusValue> {
        self.entries.iter()
    }

    /// Scalar entries whose key starts with `prefix`, in key order
    pub fn scalars_with_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.entries
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(move |(k, _)| k.starts_with(prefix))
            .filter_map(|(k, v)| v.as_scalar().map(|s| (k.as_str(), s)))
    }

    /// Record entries whose key starts with `prefix`, in key order
    pub fn records<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a Record)> + 'a {
        self.entries
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(move |(k, _)| k.starts_with(prefix))
            .filter_map(|(k, v)| v.as_record().map(|r| (k.as_str(), r)))
    }

    /// Resolve a key to a value: a scalar under that exact key, or else a
    /// record field addressed as `parent_sub`.
    pub fn lookup(&self, key: &str) -> Option<&str> {
        if let Some(value) = self.scalar(key) {
            return Some(value);
        }

        key.match_indices('_').find_map(|(i, _)| {
            self.record(&key[..i])
                .and_then(|record| record.get(&key[i + 1..]))
                .map(String::as_str)
        })
    }

    /// Flattened view: scalars as-is plus `parent_sub` for every record
    /// field. A scalar shadows a composite key of the same name.
    pub fn flatten(&self) -> BTreeMap<String, String> {
        let mut flat: BTreeMap<String, String> = self
            .entries
            .iter()
            .filter_map(|(k, v)| v.as_scalar().map(|s| (k.clone(), s.to_string())))
            .collect();

        for (parent, value) in &self.entries {
            if let StatusValue::Record(record) = value {
                for (sub, v) in record {
                    flat.entry(format!("{}_{}", parent, sub))
                        .or_insert_with(|| v.clone());
                }
            }
        }

        flat
    }

    /// Serialize back to INFO text, one `key:value` line per entry
    pub fn to_info_text(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.entries {
            out.push_str(key);
            out.push(':');
            match value {
                StatusValue::Scalar(s) => out.push_str(s),
                StatusValue::Record(record) => {
                    let fields: Vec<String> =
                        record.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                    out.push_str(&fields.join(","));
                    // A record needs at least one comma to read back as a record
                    if record.len() < 2 {
                        out.push(',');
                    }
                }
            }
            out.push_str("\r\n");
        }
        out
    }
}

impl<'a> IntoIterator for &'a StatusMap {
    type Item = (&'a String, &'a StatusValue);
    type IntoIter = btree_map::Iter<'a, String, StatusValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Line terminator used by a payload. Older servers emit bare LF.
pub fn line_separator(text: &str) -> &'static str {
    if text.contains("\r\n") {
        "\r\n"
    } else {
        "\n"
    }
}

fn parse_record(key: &str, value: &str) -> Record {
    let mut record = Record::new();
    for field in value.split(',') {
        if field.is_empty() {
            continue;
        }
        match field.rsplit_once('=') {
            Some((k, v)) => {
                record.insert(k.to_string(), v.to_string());
            }
            None => warn!("Bad format for field '{}' of info line {}", field, key),
        }
    }
    record
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub const SAMPLE_INFO: &str = "# Server\r\n\
redis_version:7.2.4\r\n\
uptime_in_seconds:86400\r\n\
\r\n\
# Clients\r\n\
connected_clients:12\r\n\
blocked_clients:0\r\n\
\r\n\
# Memory\r\n\
used_memory:1048576\r\n\
mem_fragmentation_ratio:1.25\r\n\
\r\n\
# Persistence\r\n\
rdb_changes_since_last_save:42\r\n\
\r\n\
# Stats\r\n\
total_connections_received:1500\r\n\
total_commands_processed:987654\r\n\
evicted_keys:0\r\n\
\r\n\
# Replication\r\n\
role:master\r\n\
connected_slaves:2\r\n\
slave0:ip=10.0.0.2,port=6379,state=online,offset=1000,lag=0\r\n\
slave1:ip=10.0.0.3,port=6379,state=online,offset=900,lag=1\r\n\
master_repl_offset:1050\r\n\
repl_backlog_active:1\r\n\
repl_backlog_size:1048576\r\n\
\r\n\
# Keyspace\r\n\
db0:keys=10,expires=0,avg_ttl=0\r\n\
db3:keys=7,expires=1,avg_ttl=300\r\n";

    #[test]
    fn test_parse_scalars_and_comments() {
        let map = StatusMap::parse(SAMPLE_INFO);
        assert_eq!(map.scalar("redis_version"), Some("7.2.4"));
        assert_eq!(map.scalar("used_memory"), Some("1048576"));
        assert!(!map.contains_key("# Server"));
        assert!(!map.contains_key(""));
    }

    #[test]
    fn test_parse_db_record() {
        let map = StatusMap::parse("db0:keys=10,expire=0");
        let record = map.record("db0").unwrap();
        assert_eq!(record.get("keys").map(String::as_str), Some("10"));
        assert_eq!(record.get("expire").map(String::as_str), Some("0"));

        let flat = map.flatten();
        assert_eq!(flat.get("db0_keys").map(String::as_str), Some("10"));
        assert!(!flat.contains_key("db0_delay"));
        assert_eq!(map.lookup("db0_keys"), Some("10"));
        assert_eq!(map.lookup("db0_delay"), None);
    }

    #[test]
    fn test_split_on_last_equals() {
        let map = StatusMap::parse("weird:a=b=c,d=e");
        let record = map.record("weird").unwrap();
        assert_eq!(record.get("a=b").map(String::as_str), Some("c"));
        assert_eq!(record.get("d").map(String::as_str), Some("e"));
    }

    #[test]
    fn test_line_without_colon_is_skipped() {
        let map = StatusMap::parse("a:1\nfoo=bar\nb:2\n");
        assert_eq!(map.len(), 2);
        assert_eq!(map.scalar("a"), Some("1"));
        assert_eq!(map.scalar("b"), Some("2"));
        assert!(map.iter().all(|(k, _)| !k.contains("foo")));
    }

    #[test]
    fn test_split_on_first_colon() {
        let map = StatusMap::parse("executable:/usr/bin/redis:server\r\n");
        assert_eq!(map.scalar("executable"), Some("/usr/bin/redis:server"));
    }

    #[test]
    fn test_duplicate_key_last_wins() {
        let map = StatusMap::parse("a:1\r\na:2\r\n");
        assert_eq!(map.scalar("a"), Some("2"));
    }

    #[test]
    fn test_line_separator_detection() {
        assert_eq!(line_separator("a:1\r\nb:2"), "\r\n");
        assert_eq!(line_separator("a:1\nb:2"), "\n");

        let lf = StatusMap::parse("a:1\nb:2\n");
        assert_eq!(lf.scalar("b"), Some("2"));
    }

    #[test]
    fn test_record_field_without_equals() {
        let map = StatusMap::parse("x:a=1,oops,b=2,\r\n");
        let record = map.record("x").unwrap();
        assert_eq!(record.len(), 2);
        assert!(!record.contains_key("oops"));
    }

    #[test]
    fn test_cmdstat_composite_lookup() {
        let map = StatusMap::parse(
            "cmdstat_client|list:calls=3,usec=90,usec_per_call=30.00\r\n\
             cmdstat_get:calls=10,usec=15,usec_per_call=1.50\r\n",
        );
        assert_eq!(map.lookup("cmdstat_get_calls"), Some("10"));
        assert_eq!(map.lookup("cmdstat_client|list_usec_per_call"), Some("30.00"));
        assert_eq!(map.records("cmdstat_").count(), 2);
    }

    #[test]
    fn test_scalar_shadows_composite() {
        let mut map = StatusMap::parse("db0:keys=1,expires=0\r\n");
        map.insert("db0_keys", StatusValue::Scalar("99".to_string()));
        assert_eq!(map.lookup("db0_keys"), Some("99"));
        assert_eq!(map.flatten().get("db0_keys").map(String::as_str), Some("99"));
    }

    #[test]
    fn test_prefix_iterators() {
        let map = StatusMap::parse(SAMPLE_INFO);
        let repl: Vec<&str> = map.scalars_with_prefix("repl_").map(|(k, _)| k).collect();
        assert_eq!(repl, vec!["repl_backlog_active", "repl_backlog_size"]);

        let dbs: Vec<&str> = map.records("db").map(|(k, _)| k).collect();
        assert_eq!(dbs, vec!["db0", "db3"]);

        // slave_* scalars are not records
        let slaves: Vec<&str> = map.records("slave").map(|(k, _)| k).collect();
        assert_eq!(slaves, vec!["slave0", "slave1"]);
    }

    #[test]
    fn test_reparse_is_idempotent() {
        let inputs = [
            SAMPLE_INFO,
            "a:1\nfoo=bar\nb:\n",
            "one:k=v,\r\nempty:,\r\nweird:a=b=c,=x,y=\r\n",
            "k:with spaces and: colons\r\n:no key\r\n",
        ];
        for input in inputs {
            let parsed = StatusMap::parse(input);
            let reparsed = StatusMap::parse(&parsed.to_info_text());
            assert_eq!(parsed, reparsed, "input: {:?}", input);
        }
    }

    #[test]
    fn test_single_field_record_survives_serialization() {
        let map = StatusMap::parse("one:k=v,\r\n");
        assert_eq!(map.to_info_text(), "one:k=v,\r\n");
        assert!(StatusMap::parse(&map.to_info_text()).record("one").is_some());
    }
}
