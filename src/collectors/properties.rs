//! Account property edges for users and computers.

use crate::models::{
    ComputerPropertiesEdge, DirectoryRecord, ObjectKind, OutputEdge, ResolvedEntity,
    UserPropertiesEdge,
};

use super::traits::PropertyCollector;

const UAC_ACCOUNT_DISABLED: u32 = 0x2;

/// Seconds between the Windows file time epoch (1601) and the Unix epoch.
const FILETIME_UNIX_OFFSET_SECS: i64 = 11_644_473_600;

/// Builds the property edge for a user or computer from its attribute bag.
/// Other object kinds carry no property edge.
pub struct AttributePropertyCollector;

impl PropertyCollector for AttributePropertyCollector {
    fn properties(&self, record: &DirectoryRecord, entity: &ResolvedEntity) -> Option<OutputEdge> {
        match entity.kind {
            ObjectKind::User => Some(OutputEdge::UserProperties(user_properties(record, entity))),
            ObjectKind::Computer => Some(OutputEdge::ComputerProperties(computer_properties(
                record, entity,
            ))),
            _ => None,
        }
    }
}

fn user_properties(record: &DirectoryRecord, entity: &ResolvedEntity) -> UserPropertiesEdge {
    let spns: Vec<String> = record.attr_values("serviceprincipalname").to_vec();
    UserPropertiesEdge {
        account_name: entity.network_name.clone(),
        enabled: account_enabled(record),
        pwd_last_set: filetime_attr(record, "pwdlastset"),
        last_logon: last_logon(record),
        sid: entity.sid.clone(),
        sid_history: record.attr_values("sidhistory").join("|"),
        has_spn: !spns.is_empty(),
        service_principal_names: spns,
    }
}

fn computer_properties(record: &DirectoryRecord, entity: &ResolvedEntity) -> ComputerPropertiesEdge {
    ComputerPropertiesEdge {
        account_name: entity.network_name.clone(),
        enabled: account_enabled(record),
        pwd_last_set: filetime_attr(record, "pwdlastset"),
        last_logon: last_logon(record),
        operating_system: operating_system(record),
        sid: entity.sid.clone(),
    }
}

/// An account is enabled unless the disable bit is set. Records without a
/// control attribute count as enabled.
fn account_enabled(record: &DirectoryRecord) -> bool {
    record
        .attr("useraccountcontrol")
        .and_then(|value| value.parse::<u32>().ok())
        .map(|flags| flags & UAC_ACCOUNT_DISABLED == 0)
        .unwrap_or(true)
}

/// The replicated logon timestamp is preferred; plain lastLogon is only a
/// per-controller value.
fn last_logon(record: &DirectoryRecord) -> i64 {
    match record.attr("lastlogontimestamp") {
        Some(_) => filetime_attr(record, "lastlogontimestamp"),
        None => filetime_attr(record, "lastlogon"),
    }
}

fn operating_system(record: &DirectoryRecord) -> String {
    let os = record.attr("operatingsystem").unwrap_or_default();
    match record.attr("operatingsystemservicepack") {
        Some(sp) if !os.is_empty() => format!("{} {}", os, sp),
        _ => os.to_string(),
    }
}

/// Converts a Windows file time attribute (100ns ticks since 1601) to Unix
/// epoch seconds. Absent, zero, and sentinel values collapse to 0.
fn filetime_attr(record: &DirectoryRecord, name: &str) -> i64 {
    let ticks = record
        .attr(name)
        .and_then(|value| value.parse::<i64>().ok())
        .unwrap_or(0);
    if ticks <= 0 {
        return 0;
    }
    let seconds = ticks / 10_000_000 - FILETIME_UNIX_OFFSET_SECS;
    seconds.max(0)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::constants::test::TEST_DOMAIN;

    fn record(attributes: Vec<(&str, Vec<&str>)>) -> DirectoryRecord {
        DirectoryRecord {
            domain: TEST_DOMAIN.to_string(),
            distinguished_name: "CN=obj,DC=testlab,DC=local".to_string(),
            attributes: attributes
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.into_iter().map(String::from).collect()))
                .collect::<HashMap<_, _>>(),
        }
    }

    fn entity(kind: ObjectKind, name: &str) -> ResolvedEntity {
        ResolvedEntity {
            kind,
            network_name: name.to_string(),
            sid: "S-1-5-21-1-2-3-1104".to_string(),
        }
    }

    #[test]
    fn test_user_property_edge() {
        // 132444736000000000 ticks == 2020-09-13T12:26:40Z
        let rec = record(vec![
            ("useraccountcontrol", vec!["512"]),
            ("pwdlastset", vec!["132444736000000000"]),
            ("lastlogontimestamp", vec!["132444737000000000"]),
            ("serviceprincipalname", vec!["MSSQLSvc/db:1433"]),
            ("sidhistory", vec!["S-1-5-21-9-9-9-1104"]),
        ]);

        let edge = AttributePropertyCollector
            .properties(&rec, &entity(ObjectKind::User, "JDOE@TESTLAB.LOCAL"));
        match edge {
            Some(OutputEdge::UserProperties(props)) => {
                assert!(props.enabled);
                assert_eq!(props.pwd_last_set, 1_600_000_000);
                assert_eq!(props.last_logon, 1_600_000_100);
                assert!(props.has_spn);
                assert_eq!(props.service_principal_names.len(), 1);
                assert_eq!(props.sid_history, "S-1-5-21-9-9-9-1104");
            }
            other => panic!("expected user properties, got {:?}", other),
        }
    }

    #[test]
    fn test_disabled_bit_and_missing_control_attribute() {
        let disabled = record(vec![("useraccountcontrol", vec!["514"])]);
        assert!(!account_enabled(&disabled));

        let absent = record(vec![]);
        assert!(account_enabled(&absent));
    }

    #[test]
    fn test_computer_os_includes_service_pack() {
        let rec = record(vec![
            ("operatingsystem", vec!["Windows Server 2012 R2"]),
            ("operatingsystemservicepack", vec!["SP1"]),
        ]);

        let edge = AttributePropertyCollector
            .properties(&rec, &entity(ObjectKind::Computer, "fs01.testlab.local"));
        match edge {
            Some(OutputEdge::ComputerProperties(props)) => {
                assert_eq!(props.operating_system, "Windows Server 2012 R2 SP1");
                assert_eq!(props.account_name, "fs01.testlab.local");
            }
            other => panic!("expected computer properties, got {:?}", other),
        }
    }

    #[test]
    fn test_last_logon_falls_back_when_timestamp_absent() {
        let rec = record(vec![("lastlogon", vec!["132444736000000000"])]);
        assert_eq!(last_logon(&rec), 1_600_000_000);
    }

    #[test]
    fn test_zero_and_garbage_filetimes_collapse_to_zero() {
        let rec = record(vec![("pwdlastset", vec!["0"])]);
        assert_eq!(filetime_attr(&rec, "pwdlastset"), 0);

        let rec = record(vec![("pwdlastset", vec!["never"])]);
        assert_eq!(filetime_attr(&rec, "pwdlastset"), 0);

        let rec = record(vec![]);
        assert_eq!(filetime_attr(&rec, "pwdlastset"), 0);
    }

    #[test]
    fn test_group_records_have_no_property_edge() {
        let rec = record(vec![]);
        let edge = AttributePropertyCollector
            .properties(&rec, &entity(ObjectKind::Group, "ADMINS@TESTLAB.LOCAL"));
        assert!(edge.is_none());
    }
}
