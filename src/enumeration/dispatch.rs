//! Per-entry dispatch: the method-keyed step table every worker runs.

use anyhow::Result;
use log::debug;

use crate::collectors::{CollectError, CollectorSet};
use crate::constants::DOMAIN_CONTROLLERS_OU_MARKER;
use crate::enumeration::statistics::RunStatistics;
use crate::models::{CollectionMethod, DirectoryRecord, ObjectKind, OutputEdge, ResolvedEntity};
use crate::probe::LivenessProbe;

/// Everything entry processing needs, borrowed for the span of a domain
/// pass. Workers share one of these per domain.
pub struct EntryContext<'a> {
    pub method: CollectionMethod,
    pub domain: &'a str,
    pub domain_sid: Option<&'a str>,
    pub collectors: &'a CollectorSet,
    pub probe: &'a dyn LivenessProbe,
    pub statistics: &'a RunStatistics,
    pub ou_filter: Option<&'a str>,
    pub exclude_dc: bool,
}

/// Runs the method's steps against one resolved entry.
///
/// A failed liveness probe or a collector timeout stops or skips steps and
/// bumps the matching counter; any other collector failure is fatal and
/// propagates. Callers count the entry as processed regardless of which
/// branch was taken.
pub fn process_entry(
    ctx: &EntryContext<'_>,
    record: &DirectoryRecord,
    entity: &ResolvedEntity,
    emit: &mut dyn FnMut(OutputEdge),
) -> Result<()> {
    match ctx.method {
        CollectionMethod::ObjectProps => {
            if let Some(edge) = ctx.collectors.properties.properties(record, entity) {
                emit(edge);
            }
        }
        CollectionMethod::Group => emit_memberships(ctx, record, entity, emit),
        CollectionMethod::ComputerOnly => {
            if !probe_alive(ctx, entity) {
                return Ok(());
            }
            run_local_admins(ctx, entity, emit)?;
            if dc_excluded(ctx, record) {
                return Ok(());
            }
            run_net_sessions(ctx, entity, emit)?;
        }
        CollectionMethod::LocalGroup => {
            if !probe_alive(ctx, entity) {
                return Ok(());
            }
            run_local_admins(ctx, entity, emit)?;
        }
        CollectionMethod::GpoLocalGroup => run_gpo_admins(ctx, record, emit)?,
        CollectionMethod::Session | CollectionMethod::SessionLoop => {
            if !probe_alive(ctx, entity) {
                return Ok(());
            }
            if dc_excluded(ctx, record) {
                return Ok(());
            }
            run_net_sessions(ctx, entity, emit)?;
        }
        CollectionMethod::LoggedOn => {
            if !probe_alive(ctx, entity) {
                return Ok(());
            }
            run_logons(ctx, entity, emit)?;
        }
        CollectionMethod::Default => {
            emit_memberships(ctx, record, entity, emit);
            if entity.kind != ObjectKind::Computer {
                return Ok(());
            }
            if let Some(ou) = ctx.ou_filter {
                if !record.distinguished_name.contains(ou) {
                    return Ok(());
                }
            }
            if !probe_alive(ctx, entity) {
                return Ok(());
            }
            run_local_admins(ctx, entity, emit)?;
            if dc_excluded(ctx, record) {
                return Ok(());
            }
            run_net_sessions(ctx, entity, emit)?;
        }
        CollectionMethod::Acl => {
            for edge in ctx.collectors.acls.entries(record, entity) {
                emit(OutputEdge::AclEntry(edge));
            }
        }
        // Trust edges are seeded before the pool starts; entries carry no
        // per-object work under this method.
        CollectionMethod::Trusts => {}
    }
    Ok(())
}

fn probe_alive(ctx: &EntryContext<'_>, entity: &ResolvedEntity) -> bool {
    if ctx.probe.is_alive(&entity.network_name) {
        true
    } else {
        debug!("Host {} did not respond to the probe", entity.network_name);
        ctx.statistics.host_unreachable();
        false
    }
}

fn dc_excluded(ctx: &EntryContext<'_>, record: &DirectoryRecord) -> bool {
    ctx.exclude_dc
        && record
            .distinguished_name
            .contains(DOMAIN_CONTROLLERS_OU_MARKER)
}

fn emit_memberships(
    ctx: &EntryContext<'_>,
    record: &DirectoryRecord,
    entity: &ResolvedEntity,
    emit: &mut dyn FnMut(OutputEdge),
) {
    for edge in ctx
        .collectors
        .groups
        .memberships(record, entity, ctx.domain_sid)
    {
        emit(OutputEdge::GroupMembership(edge));
    }
}

fn run_local_admins(
    ctx: &EntryContext<'_>,
    entity: &ResolvedEntity,
    emit: &mut dyn FnMut(OutputEdge),
) -> Result<()> {
    match ctx
        .collectors
        .local_admins
        .local_admins(&entity.network_name, ctx.domain)
    {
        Ok(admins) => {
            for edge in admins {
                emit(OutputEdge::LocalAdmin(edge));
            }
            Ok(())
        }
        Err(CollectError::Timeout) => {
            ctx.statistics.host_timed_out();
            Ok(())
        }
        Err(CollectError::Failed(err)) => Err(err),
    }
}

fn run_net_sessions(
    ctx: &EntryContext<'_>,
    entity: &ResolvedEntity,
    emit: &mut dyn FnMut(OutputEdge),
) -> Result<()> {
    match ctx
        .collectors
        .sessions
        .net_sessions(&entity.network_name, ctx.domain)
    {
        Ok(sessions) => {
            for edge in sessions {
                emit(OutputEdge::Session(edge));
            }
            Ok(())
        }
        Err(CollectError::Timeout) => {
            ctx.statistics.host_timed_out();
            Ok(())
        }
        Err(CollectError::Failed(err)) => Err(err),
    }
}

/// Both logon sources run even when the first times out.
fn run_logons(
    ctx: &EntryContext<'_>,
    entity: &ResolvedEntity,
    emit: &mut dyn FnMut(OutputEdge),
) -> Result<()> {
    match ctx
        .collectors
        .sessions
        .logged_on(&entity.network_name, ctx.domain)
    {
        Ok(sessions) => {
            for edge in sessions {
                emit(OutputEdge::Session(edge));
            }
        }
        Err(CollectError::Timeout) => ctx.statistics.host_timed_out(),
        Err(CollectError::Failed(err)) => return Err(err),
    }
    match ctx
        .collectors
        .sessions
        .registry_logged_on(&entity.network_name)
    {
        Ok(sessions) => {
            for edge in sessions {
                emit(OutputEdge::Session(edge));
            }
        }
        Err(CollectError::Timeout) => ctx.statistics.host_timed_out(),
        Err(CollectError::Failed(err)) => return Err(err),
    }
    Ok(())
}

fn run_gpo_admins(
    ctx: &EntryContext<'_>,
    record: &DirectoryRecord,
    emit: &mut dyn FnMut(OutputEdge),
) -> Result<()> {
    match ctx.collectors.gpo_admins.gpo_admins(record, ctx.domain) {
        Ok(admins) => {
            for edge in admins {
                emit(OutputEdge::LocalAdmin(edge));
            }
            Ok(())
        }
        Err(CollectError::Timeout) => {
            ctx.statistics.host_timed_out();
            Ok(())
        }
        Err(CollectError::Failed(err)) => Err(err),
    }
}
