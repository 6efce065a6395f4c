//! Integration tests for individual collection methods.
//!
//! Each test pins down the files and rows one method is expected to
//! produce, including the scoping flags that narrow a sweep.

use std::fs;

use anyhow::Result;
use chrono::Local;
use tempfile::TempDir;

use adgraph_collector::collectors::{
    CollectError, CollectResult, CollectorSet, GpoAdminCollector, LocalAdminCollector,
    SessionCollector,
};
use adgraph_collector::directory::snapshot::{DirectorySnapshot, DomainEntry};
use adgraph_collector::directory::{DirectoryContext, SnapshotDirectory};
use adgraph_collector::enumeration::CollectionDispatcher;
use adgraph_collector::models::{
    CollectionMethod, DirectoryRecord, EdgeKind, LocalAdminEdge, ObjectKind, SessionEdge,
};
use adgraph_collector::options::EnumerationOptions;
use adgraph_collector::probe::LivenessProbe;
use adgraph_collector::trusts::TrustGraphBuilder;

const DOMAIN: &str = "TESTLAB.LOCAL";
const DOMAIN_SID: &str = "S-1-5-21-3130019616-2776909439-2417379446";

struct AlwaysAlive;

impl LivenessProbe for AlwaysAlive {
    fn is_alive(&self, _host: &str) -> bool {
        true
    }
}

/// One fixed edge per source so rows can be asserted host by host.
struct FixedSessions;

impl SessionCollector for FixedSessions {
    fn net_sessions(&self, computer: &str, _domain: &str) -> CollectResult<Vec<SessionEdge>> {
        Ok(vec![SessionEdge {
            user_name: format!("NETUSER@{}", DOMAIN),
            computer_name: computer.to_string(),
            weight: 2,
        }])
    }

    fn logged_on(&self, computer: &str, _domain: &str) -> CollectResult<Vec<SessionEdge>> {
        Ok(vec![SessionEdge {
            user_name: format!("LOGONUSER@{}", DOMAIN),
            computer_name: computer.to_string(),
            weight: 1,
        }])
    }

    fn registry_logged_on(&self, computer: &str) -> CollectResult<Vec<SessionEdge>> {
        Ok(vec![SessionEdge {
            user_name: format!("{}-1104", DOMAIN_SID),
            computer_name: computer.to_string(),
            weight: 1,
        }])
    }
}

/// Times out against one host, answers everywhere else.
struct TimeoutAdmins {
    slow: &'static str,
}

impl LocalAdminCollector for TimeoutAdmins {
    fn local_admins(&self, computer: &str, _domain: &str) -> CollectResult<Vec<LocalAdminEdge>> {
        if computer == self.slow {
            return Err(CollectError::Timeout);
        }
        Ok(vec![LocalAdminEdge {
            computer_name: computer.to_string(),
            account_name: format!("DOMAIN ADMINS@{}", DOMAIN),
            account_kind: ObjectKind::Group,
        }])
    }
}

/// Resolves admin rights only on records carrying a policy link.
struct GplinkAdmins;

impl GpoAdminCollector for GplinkAdmins {
    fn gpo_admins(
        &self,
        record: &DirectoryRecord,
        _domain: &str,
    ) -> CollectResult<Vec<LocalAdminEdge>> {
        if record.attr("gplink").is_none() {
            return Ok(Vec::new());
        }
        Ok(vec![LocalAdminEdge {
            computer_name: "ws07.testlab.local".to_string(),
            account_name: format!("SERVER ADMINS@{}", DOMAIN),
            account_kind: ObjectKind::Group,
        }])
    }
}

fn record(dn: &str, attributes: Vec<(&str, Vec<&str>)>) -> DirectoryRecord {
    DirectoryRecord {
        domain: DOMAIN.to_string(),
        distinguished_name: dn.to_string(),
        attributes: attributes
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.into_iter().map(String::from).collect()))
            .collect(),
    }
}

fn computer_at(dn: &str, sam: &str, host: &str) -> DirectoryRecord {
    record(
        dn,
        vec![
            ("samaccountname", vec![sam]),
            ("samaccounttype", vec!["805306369"]),
            ("dnshostname", vec![host]),
        ],
    )
}

fn directory(records: Vec<DirectoryRecord>) -> DirectoryContext {
    let snapshot = SnapshotDirectory::from_snapshot(DirectorySnapshot {
        domains: vec![DomainEntry {
            name: DOMAIN.to_string(),
            sid: DOMAIN_SID.to_string(),
            controllers: vec!["dc01.testlab.local".to_string()],
        }],
        records,
    });
    DirectoryContext::new(
        Box::new(snapshot.clone()),
        Box::new(snapshot.clone()),
        Box::new(snapshot),
    )
}

fn dispatcher_with(
    records: Vec<DirectoryRecord>,
    collectors: CollectorSet,
    options: EnumerationOptions,
) -> CollectionDispatcher {
    CollectionDispatcher::new(
        directory(records),
        collectors,
        Box::new(AlwaysAlive),
        TrustGraphBuilder::new(),
        options,
    )
}

fn run_options(method: CollectionMethod, output: &TempDir) -> EnumerationOptions {
    EnumerationOptions::to_directory(method, output.path().to_path_buf())
}

fn read_rows(output: &TempDir, kind: EdgeKind) -> Vec<String> {
    let content = fs::read_to_string(output.path().join(kind.file_name()))
        .expect("output file should exist");
    let mut rows: Vec<String> = content.lines().skip(1).map(String::from).collect();
    rows.sort();
    rows
}

/// Test the property method splits users and computers into their files
#[test]
fn test_object_props_split_by_account_kind() -> Result<()> {
    let output = TempDir::new()?;
    let records = vec![
        record(
            "CN=jdoe,CN=Users,DC=testlab,DC=local",
            vec![
                ("samaccountname", vec!["jdoe"]),
                ("samaccounttype", vec!["805306368"]),
                ("objectsid", vec!["S-1-5-21-3130019616-2776909439-2417379446-1104"]),
                ("useraccountcontrol", vec!["512"]),
                ("pwdlastset", vec!["132444736000000000"]),
                ("lastlogontimestamp", vec!["132444737000000000"]),
                ("serviceprincipalname", vec!["MSSQLSvc/db.testlab.local:1433"]),
            ],
        ),
        record(
            "CN=WS01,CN=Computers,DC=testlab,DC=local",
            vec![
                ("samaccountname", vec!["WS01$"]),
                ("samaccounttype", vec!["805306369"]),
                ("objectsid", vec!["S-1-5-21-3130019616-2776909439-2417379446-1105"]),
                ("dnshostname", vec!["ws01.testlab.local"]),
                ("useraccountcontrol", vec!["4096"]),
                ("operatingsystem", vec!["Windows Server 2016"]),
            ],
        ),
    ];

    let dispatcher = dispatcher_with(
        records,
        CollectorSet::live(),
        run_options(CollectionMethod::ObjectProps, &output),
    );
    dispatcher.run()?;

    assert_eq!(
        read_rows(&output, EdgeKind::UserProperties),
        vec![concat!(
            "JDOE@TESTLAB.LOCAL,true,1600000000,1600000100,",
            "S-1-5-21-3130019616-2776909439-2417379446-1104,,true,MSSQLSvc/db.testlab.local:1433"
        )]
    );
    assert_eq!(
        read_rows(&output, EdgeKind::ComputerProperties),
        vec![concat!(
            "ws01.testlab.local,true,0,0,Windows Server 2016,",
            "S-1-5-21-3130019616-2776909439-2417379446-1105"
        )]
    );
    assert_eq!(dispatcher.statistics().processed(), 2);
    Ok(())
}

/// Test session sweeps skip domain controllers when excluded
#[test]
fn test_session_sweep_respects_dc_exclusion() -> Result<()> {
    let output = TempDir::new()?;
    let records = vec![
        computer_at(
            "CN=WS01,CN=Computers,DC=testlab,DC=local",
            "WS01$",
            "ws01.testlab.local",
        ),
        computer_at(
            "CN=DC01,OU=Domain Controllers,DC=testlab,DC=local",
            "DC01$",
            "dc01.testlab.local",
        ),
    ];

    let mut options = run_options(CollectionMethod::Session, &output);
    options.exclude_dc = true;
    let collectors = CollectorSet {
        sessions: Box::new(FixedSessions),
        ..CollectorSet::live()
    };
    let dispatcher = dispatcher_with(records, collectors, options);
    dispatcher.run()?;

    assert_eq!(
        read_rows(&output, EdgeKind::Session),
        vec!["NETUSER@TESTLAB.LOCAL,ws01.testlab.local,2"]
    );
    assert_eq!(dispatcher.statistics().processed(), 2);
    assert_eq!(dispatcher.statistics().unreachable(), 0);
    Ok(())
}

/// Test the OU flag narrows computer-centric sweeps to the subtree
#[test]
fn test_ou_scoping_narrows_the_sweep() -> Result<()> {
    let output = TempDir::new()?;
    let records = vec![
        computer_at(
            "CN=WS01,OU=Workstations,DC=testlab,DC=local",
            "WS01$",
            "ws01.testlab.local",
        ),
        computer_at(
            "CN=FS01,CN=Computers,DC=testlab,DC=local",
            "FS01$",
            "fs01.testlab.local",
        ),
    ];

    let mut options = run_options(CollectionMethod::Session, &output);
    options.ou = Some("OU=Workstations,DC=testlab,DC=local".to_string());
    let collectors = CollectorSet {
        sessions: Box::new(FixedSessions),
        ..CollectorSet::live()
    };
    let dispatcher = dispatcher_with(records, collectors, options);
    dispatcher.run()?;

    assert_eq!(
        read_rows(&output, EdgeKind::Session),
        vec!["NETUSER@TESTLAB.LOCAL,ws01.testlab.local,2"]
    );
    assert_eq!(dispatcher.statistics().processed(), 1);
    Ok(())
}

/// Test logon collection merges the workstation and registry sources
#[test]
fn test_logged_on_collects_both_logon_sources() -> Result<()> {
    let output = TempDir::new()?;
    let records = vec![computer_at(
        "CN=WS01,CN=Computers,DC=testlab,DC=local",
        "WS01$",
        "ws01.testlab.local",
    )];

    let collectors = CollectorSet {
        sessions: Box::new(FixedSessions),
        ..CollectorSet::live()
    };
    let dispatcher = dispatcher_with(
        records,
        collectors,
        run_options(CollectionMethod::LoggedOn, &output),
    );
    dispatcher.run()?;

    assert_eq!(
        read_rows(&output, EdgeKind::Session),
        vec![
            "LOGONUSER@TESTLAB.LOCAL,ws01.testlab.local,1",
            "S-1-5-21-3130019616-2776909439-2417379446-1104,ws01.testlab.local,1",
        ]
    );
    assert_eq!(dispatcher.statistics().processed(), 1);
    Ok(())
}

/// Test a host timeout skips that host and the sweep continues
#[test]
fn test_local_group_timeout_skips_only_that_host() -> Result<()> {
    let output = TempDir::new()?;
    let records = vec![
        computer_at(
            "CN=WS01,CN=Computers,DC=testlab,DC=local",
            "WS01$",
            "ws01.testlab.local",
        ),
        computer_at(
            "CN=WS02,CN=Computers,DC=testlab,DC=local",
            "WS02$",
            "ws02.testlab.local",
        ),
        computer_at(
            "CN=WS03,CN=Computers,DC=testlab,DC=local",
            "WS03$",
            "ws03.testlab.local",
        ),
    ];

    let collectors = CollectorSet {
        local_admins: Box::new(TimeoutAdmins {
            slow: "ws02.testlab.local",
        }),
        ..CollectorSet::live()
    };
    let dispatcher = dispatcher_with(
        records,
        collectors,
        run_options(CollectionMethod::LocalGroup, &output),
    );
    dispatcher.run()?;

    assert_eq!(
        read_rows(&output, EdgeKind::LocalAdmin),
        vec![
            "ws01.testlab.local,DOMAIN ADMINS@TESTLAB.LOCAL,group",
            "ws03.testlab.local,DOMAIN ADMINS@TESTLAB.LOCAL,group",
        ]
    );
    let statistics = dispatcher.statistics();
    assert_eq!(statistics.processed(), 3);
    assert_eq!(statistics.timed_out(), 1);
    Ok(())
}

/// Test policy-link admin resolution touches no hosts
#[test]
fn test_gpo_local_group_walks_policy_links() -> Result<()> {
    let output = TempDir::new()?;
    let records = vec![
        record(
            "OU=Servers,DC=testlab,DC=local",
            vec![
                ("objectclass", vec!["organizationalUnit"]),
                ("name", vec!["Servers"]),
                (
                    "gplink",
                    vec!["[LDAP://CN={31B2F340-016D-11D2-945F-00C04FB984F9},CN=Policies,CN=System,DC=testlab,DC=local;0]"],
                ),
            ],
        ),
        record(
            "CN=jdoe,CN=Users,DC=testlab,DC=local",
            vec![
                ("samaccountname", vec!["jdoe"]),
                ("samaccounttype", vec!["805306368"]),
            ],
        ),
    ];

    let collectors = CollectorSet {
        gpo_admins: Box::new(GplinkAdmins),
        ..CollectorSet::live()
    };
    let dispatcher = dispatcher_with(
        records,
        collectors,
        run_options(CollectionMethod::GpoLocalGroup, &output),
    );
    dispatcher.run()?;

    assert_eq!(
        read_rows(&output, EdgeKind::LocalAdmin),
        vec!["ws07.testlab.local,SERVER ADMINS@TESTLAB.LOCAL,group"]
    );
    assert_eq!(dispatcher.statistics().processed(), 2);
    Ok(())
}

/// Test the session loop stops once the deadline has passed
#[test]
fn test_session_loop_stops_at_the_deadline() -> Result<()> {
    let output = TempDir::new()?;
    let records = vec![computer_at(
        "CN=WS01,CN=Computers,DC=testlab,DC=local",
        "WS01$",
        "ws01.testlab.local",
    )];

    let mut options = run_options(CollectionMethod::SessionLoop, &output);
    options.loop_end = Some(Local::now() - chrono::Duration::minutes(1));
    let collectors = CollectorSet {
        sessions: Box::new(FixedSessions),
        ..CollectorSet::live()
    };
    let dispatcher = dispatcher_with(records, collectors, options);
    dispatcher.run()?;

    // One pass ran; the deadline stopped the loop before a second.
    assert_eq!(
        read_rows(&output, EdgeKind::Session),
        vec!["NETUSER@TESTLAB.LOCAL,ws01.testlab.local,2"]
    );
    assert_eq!(dispatcher.statistics().processed(), 1);
    Ok(())
}
