//! Renders one hosted zone's record sets as a standard zone file.
//!
//! Layout:
//!
//! ```text
//! ; ALIAS record skipped (not standard): <name> -> <target>   (one per alias)
//! $TTL <default ttl>
//! @	<ttl>	IN	SOA	<soa value>
//!
//! @	<ttl>	IN	NS	<value>                                 (apex NS values)
//!
//! <name|@>	<ttl>	IN	<type>	<value>                     (sorted by name, type)
//! ```

use crate::domain::model::{fully_qualified, ResourceRecordSet};
use crate::utils::error::{BackupError, Result};
use std::fmt::Write;

const SOA_FIELDS: usize = 7;

/// Empty input renders to empty text; nothing to validate.
pub fn generate_zone_file(records: &[ResourceRecordSet], zone_name: &str) -> Result<String> {
    if records.is_empty() {
        return Ok(String::new());
    }

    let zone_name = fully_qualified(zone_name);

    let mut aliases = Vec::new();
    let mut soa = None;
    let mut apex_ns = Vec::new();
    let mut others = Vec::new();

    for record in records {
        if record.is_alias() {
            let target = record
                .alias_target
                .as_ref()
                .map_or("", |target| target.dns_name.as_str());
            aliases.push((record.name.as_str(), target));
            continue;
        }

        let at_apex = record.name == zone_name;
        match record.record_type.as_str() {
            "SOA" if at_apex => soa = Some(record),
            "NS" if at_apex => apex_ns.push(record),
            _ => others.push(record),
        }
    }

    let soa = soa.ok_or_else(|| invalid(&zone_name, "SOA record not found at zone apex"))?;
    let soa_value = soa
        .values
        .first()
        .ok_or_else(|| invalid(&zone_name, "SOA record has no value"))?;
    let soa_fields: Vec<&str> = soa_value.split_whitespace().collect();
    if soa_fields.len() < SOA_FIELDS {
        return Err(invalid(
            &zone_name,
            format!("invalid SOA record value: {}", soa_value),
        ));
    }
    let default_ttl = soa_fields[SOA_FIELDS - 1];

    aliases.sort_unstable();
    others.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then_with(|| a.record_type.cmp(&b.record_type))
            .then_with(|| a.set_identifier.cmp(&b.set_identifier))
    });

    let ttl_of = |record: &ResourceRecordSet| {
        record
            .ttl
            .map(|ttl| ttl.to_string())
            .unwrap_or_else(|| default_ttl.to_string())
    };

    // Writing into a String cannot fail.
    let mut out = String::new();
    for (name, target) in aliases {
        let _ = writeln!(out, "; ALIAS record skipped (not standard): {} -> {}", name, target);
    }
    let _ = writeln!(out, "$TTL {}", default_ttl);
    let _ = writeln!(out, "@\t{}\tIN\tSOA\t{}", ttl_of(soa), soa_value);
    out.push('\n');

    for ns in apex_ns {
        for value in &ns.values {
            let _ = writeln!(out, "@\t{}\tIN\tNS\t{}", ttl_of(ns), value);
        }
    }
    out.push('\n');

    for record in others {
        let owner = if record.name == zone_name {
            "@"
        } else {
            record.name.as_str()
        };
        for value in &record.values {
            let _ = writeln!(
                out,
                "{}\t{}\tIN\t{}\t{}",
                owner,
                ttl_of(record),
                record.record_type,
                value
            );
        }
    }

    Ok(out)
}

fn invalid(zone: &str, message: impl Into<String>) -> BackupError {
    BackupError::ZoneFileError {
        zone: zone.to_string(),
        message: message.into(),
    }
}
