//! Remote registry logon source.
//!
//! Profiles loaded under a host's HKEY_USERS hive reveal interactively
//! logged-on accounts; the subkey names are their SIDs.

use std::io;
use std::ptr;

use anyhow::{anyhow, Result};
use widestring::{U16CString, U16String};
use winapi::shared::minwindef::DWORD;
use winapi::shared::winerror::ERROR_NO_MORE_ITEMS;
use winapi::um::winnt::WCHAR;
use winapi::um::winreg::{RegCloseKey, RegConnectRegistryW, RegEnumKeyExW, HKEY, HKEY_USERS};

const KEY_NAME_CAPACITY: usize = 256;

/// Subkey names of `\\server`'s HKEY_USERS hive.
pub fn enumerate_user_hive_keys(server: &str) -> Result<Vec<String>> {
    let server_unc = U16CString::from_str(format!(r"\\{}", server))
        .map_err(|e| anyhow!("Server name {:?} cannot be a wide string: {}", server, e))?;

    let mut remote_users: HKEY = ptr::null_mut();
    // SAFETY: server_unc outlives the call and remote_users is a valid out
    // pointer; on success it holds a key handle closed below.
    let status = unsafe {
        RegConnectRegistryW(server_unc.as_ptr(), HKEY_USERS, &mut remote_users)
    };
    if status != 0 {
        return Err(anyhow!(
            "RegConnectRegistryW to {} failed: {}",
            server,
            io::Error::from_raw_os_error(status)
        ));
    }

    let mut subkeys = Vec::new();
    let mut index: DWORD = 0;
    loop {
        let mut name_buffer = [0 as WCHAR; KEY_NAME_CAPACITY];
        let mut name_len: DWORD = KEY_NAME_CAPACITY as DWORD;

        // SAFETY: name_buffer holds name_len wide characters; the handle is
        // open until RegCloseKey below.
        let status = unsafe {
            RegEnumKeyExW(
                remote_users,
                index,
                name_buffer.as_mut_ptr(),
                &mut name_len,
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null_mut(),
            )
        };
        if status == ERROR_NO_MORE_ITEMS as i32 {
            break;
        }
        if status != 0 {
            // SAFETY: the handle is live and closed exactly once.
            unsafe { RegCloseKey(remote_users) };
            return Err(anyhow!(
                "RegEnumKeyExW on {} failed: {}",
                server,
                io::Error::from_raw_os_error(status)
            ));
        }

        let name = U16String::from_vec(name_buffer[..name_len as usize].to_vec());
        subkeys.push(name.to_string_lossy());
        index += 1;
    }

    // SAFETY: the handle is live and closed exactly once.
    unsafe { RegCloseKey(remote_users) };
    Ok(subkeys)
}
