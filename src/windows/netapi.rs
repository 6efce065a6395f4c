//! NetApi32 enumeration calls.
//!
//! Each call follows the same shape: invoke the API, copy every record out
//! of the returned buffer into owned Rust values, free the buffer once,
//! return the copies. A nonzero status becomes an error carrying the raw
//! status code.

use std::ptr;
use std::slice;

use anyhow::{anyhow, Result};
use widestring::{U16CStr, U16CString};
use winapi::shared::basetsd::DWORD_PTR;
use winapi::shared::minwindef::{DWORD, LPBYTE};
use winapi::um::dsgetdc::{DsEnumerateDomainTrustsW, DS_DOMAIN_TRUSTSW};
use winapi::um::lmaccess::{NetLocalGroupGetMembers, LOCALGROUP_MEMBERS_INFO_2};
use winapi::um::lmapibuf::NetApiBufferFree;
use winapi::um::lmshare::{NetSessionEnum, SESSION_INFO_10};
use winapi::um::lmwksta::{NetWkstaUserEnum, WKSTA_USER_INFO_1};
use winapi::um::winnt::LPWSTR;

use super::{LocalGroupMember, NetSession, TrustRecord, WkstaUser};
use crate::constants::TRUST_ENUMERATION_FLAGS;

const MAX_PREFERRED_LENGTH: DWORD = 0xFFFF_FFFF;

fn wide(value: &str) -> Result<U16CString> {
    U16CString::from_str(value)
        .map_err(|e| anyhow!("Value {:?} cannot be a wide string: {}", value, e))
}

fn wide_to_string(value: LPWSTR) -> String {
    if value.is_null() {
        return String::new();
    }
    // SAFETY: the pointer comes out of a live NetApi buffer and the API
    // contract guarantees NUL termination.
    unsafe { U16CStr::from_ptr_str(value).to_string_lossy() }
}

fn free_buffer(buffer: LPBYTE) {
    if !buffer.is_null() {
        // SAFETY: the buffer was allocated by the NetApi call that produced
        // it and is freed exactly once, after all copies were taken.
        unsafe { NetApiBufferFree(buffer as *mut _) };
    }
}

/// Domain trusts known to `server`, queried with the full capability mask.
pub fn enumerate_domain_trusts(server: &str) -> Result<Vec<TrustRecord>> {
    let server_wide = wide(server)?;
    let mut buffer: *mut DS_DOMAIN_TRUSTSW = ptr::null_mut();
    let mut count: DWORD = 0;

    // SAFETY: server_wide outlives the call; buffer and count are valid out
    // pointers that only hold results when the status is zero.
    let status = unsafe {
        DsEnumerateDomainTrustsW(
            server_wide.as_ptr() as LPWSTR,
            TRUST_ENUMERATION_FLAGS,
            &mut buffer,
            &mut count,
        )
    };
    if status != 0 {
        return Err(anyhow!(
            "DsEnumerateDomainTrustsW against {} returned status {}",
            server,
            status
        ));
    }
    if buffer.is_null() || count == 0 {
        free_buffer(buffer as LPBYTE);
        return Ok(Vec::new());
    }

    // SAFETY: a zero status guarantees `count` contiguous DS_DOMAIN_TRUSTSW
    // records behind `buffer`.
    let raw = unsafe { slice::from_raw_parts(buffer, count as usize) };
    let records = raw
        .iter()
        .map(|entry| TrustRecord {
            domain_name: wide_to_string(entry.DnsDomainName),
            flags: entry.Flags,
            attributes: entry.TrustAttributes,
        })
        .collect();

    free_buffer(buffer as LPBYTE);
    Ok(records)
}

/// SMB sessions currently open on `server`.
pub fn enumerate_net_sessions(server: &str) -> Result<Vec<NetSession>> {
    let server_wide = wide(server)?;
    let mut buffer: LPBYTE = ptr::null_mut();
    let mut entries_read: DWORD = 0;
    let mut total_entries: DWORD = 0;
    let mut resume: DWORD = 0;

    // SAFETY: null client and user arguments request every session; the out
    // pointers are valid for the duration of the call.
    let status = unsafe {
        NetSessionEnum(
            server_wide.as_ptr() as LPWSTR,
            ptr::null_mut(),
            ptr::null_mut(),
            10,
            &mut buffer,
            MAX_PREFERRED_LENGTH,
            &mut entries_read,
            &mut total_entries,
            &mut resume,
        )
    };
    if status != 0 {
        return Err(anyhow!(
            "NetSessionEnum against {} returned status {}",
            server,
            status
        ));
    }
    if buffer.is_null() || entries_read == 0 {
        free_buffer(buffer);
        return Ok(Vec::new());
    }

    // SAFETY: level 10 lays out `entries_read` SESSION_INFO_10 records.
    let raw = unsafe { slice::from_raw_parts(buffer as *const SESSION_INFO_10, entries_read as usize) };
    let sessions = raw
        .iter()
        .map(|entry| NetSession {
            computer: wide_to_string(entry.sesi10_cname),
            user: wide_to_string(entry.sesi10_username),
        })
        .collect();

    free_buffer(buffer);
    Ok(sessions)
}

/// Accounts with workstation logons on `server`.
pub fn enumerate_logged_on_users(server: &str) -> Result<Vec<WkstaUser>> {
    let server_wide = wide(server)?;
    let mut buffer: LPBYTE = ptr::null_mut();
    let mut entries_read: DWORD = 0;
    let mut total_entries: DWORD = 0;
    let mut resume: DWORD = 0;

    // SAFETY: out pointers are valid for the duration of the call.
    let status = unsafe {
        NetWkstaUserEnum(
            server_wide.as_ptr() as LPWSTR,
            1,
            &mut buffer,
            MAX_PREFERRED_LENGTH,
            &mut entries_read,
            &mut total_entries,
            &mut resume,
        )
    };
    if status != 0 {
        return Err(anyhow!(
            "NetWkstaUserEnum against {} returned status {}",
            server,
            status
        ));
    }
    if buffer.is_null() || entries_read == 0 {
        free_buffer(buffer);
        return Ok(Vec::new());
    }

    // SAFETY: level 1 lays out `entries_read` WKSTA_USER_INFO_1 records.
    let raw = unsafe { slice::from_raw_parts(buffer as *const WKSTA_USER_INFO_1, entries_read as usize) };
    let users = raw
        .iter()
        .map(|entry| WkstaUser {
            user: wide_to_string(entry.wkui1_username),
            logon_domain: wide_to_string(entry.wkui1_logon_domain),
        })
        .collect();

    free_buffer(buffer);
    Ok(users)
}

/// Members of a local group on `server`.
pub fn enumerate_local_group_members(server: &str, group: &str) -> Result<Vec<LocalGroupMember>> {
    let server_wide = wide(server)?;
    let group_wide = wide(group)?;
    let mut buffer: LPBYTE = ptr::null_mut();
    let mut entries_read: DWORD = 0;
    let mut total_entries: DWORD = 0;
    let mut resume: DWORD_PTR = 0;

    // SAFETY: out pointers are valid for the duration of the call.
    let status = unsafe {
        NetLocalGroupGetMembers(
            server_wide.as_ptr() as LPWSTR,
            group_wide.as_ptr() as LPWSTR,
            2,
            &mut buffer,
            MAX_PREFERRED_LENGTH,
            &mut entries_read,
            &mut total_entries,
            &mut resume,
        )
    };
    if status != 0 {
        return Err(anyhow!(
            "NetLocalGroupGetMembers against {} returned status {}",
            server,
            status
        ));
    }
    if buffer.is_null() || entries_read == 0 {
        free_buffer(buffer);
        return Ok(Vec::new());
    }

    // SAFETY: level 2 lays out `entries_read` LOCALGROUP_MEMBERS_INFO_2
    // records.
    let raw = unsafe {
        slice::from_raw_parts(buffer as *const LOCALGROUP_MEMBERS_INFO_2, entries_read as usize)
    };
    let members = raw
        .iter()
        .map(|entry| LocalGroupMember {
            name: wide_to_string(entry.lgrmi2_domainandname),
            sid_use: entry.lgrmi2_sidusage as u32,
        })
        .collect();

    free_buffer(buffer);
    Ok(members)
}
