//! Windows backend.
//!
//! CPU ticks come from `GetSystemTimes`; memory, disk, network and uptime
//! from [`super::host`]. Power-off uses `ExitWindowsEx` after enabling
//! `SeShutdownPrivilege`, with `shutdown.exe` as the other mechanism.

use std::ffi::c_void;
use std::io;
use std::path::Path;
use std::ptr;
use tracing::{debug, info};

use super::{host, CommandRunner, PlatformError, SystemBackend};
use crate::metrics::{CpuTimes, NetworkTotals, Usage};
use crate::shutdown::{with_fallback, ShutdownError};

type Handle = *mut c_void;
type Bool = i32;

const TOKEN_ADJUST_PRIVILEGES: u32 = 0x0020;
const TOKEN_QUERY: u32 = 0x0008;
const SE_PRIVILEGE_ENABLED: u32 = 0x0000_0002;
const ERROR_NOT_ALL_ASSIGNED: i32 = 1300;
const EWX_FORCE: u32 = 0x0000_0004;
const EWX_POWEROFF: u32 = 0x0000_0008;
const SHTDN_REASON_FLAG_PLANNED: u32 = 0x8000_0000;

#[repr(C)]
#[derive(Default, Clone, Copy)]
struct FileTime {
    low: u32,
    high: u32,
}

impl FileTime {
    fn ticks(&self) -> u64 {
        ((self.high as u64) << 32) | self.low as u64
    }
}

#[repr(C)]
#[derive(Default, Clone, Copy)]
struct Luid {
    low_part: u32,
    high_part: i32,
}

#[repr(C)]
struct LuidAndAttributes {
    luid: Luid,
    attributes: u32,
}

#[repr(C)]
struct TokenPrivileges {
    privilege_count: u32,
    privileges: [LuidAndAttributes; 1],
}

#[link(name = "kernel32")]
extern "system" {
    fn GetSystemTimes(idle: *mut FileTime, kernel: *mut FileTime, user: *mut FileTime) -> Bool;
    fn GetCurrentProcess() -> Handle;
    fn CloseHandle(handle: Handle) -> Bool;
}

#[link(name = "advapi32")]
extern "system" {
    fn OpenProcessToken(process: Handle, access: u32, token: *mut Handle) -> Bool;
    fn LookupPrivilegeValueW(system: *const u16, name: *const u16, luid: *mut Luid) -> Bool;
    fn AdjustTokenPrivileges(
        token: Handle,
        disable_all: Bool,
        new_state: *const TokenPrivileges,
        buffer_length: u32,
        previous_state: *mut TokenPrivileges,
        return_length: *mut u32,
    ) -> Bool;
}

#[link(name = "user32")]
extern "system" {
    fn ExitWindowsEx(flags: u32, reason: u32) -> Bool;
}

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

fn system_drive() -> String {
    let drive = std::env::var("SystemDrive").unwrap_or_else(|_| "C:".to_string());
    format!("{}\\", drive.trim_end_matches('\\'))
}

/// Closes the wrapped handle on drop.
struct OwnedHandle(Handle);

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        unsafe {
            CloseHandle(self.0);
        }
    }
}

fn enable_shutdown_privilege() -> Result<(), PlatformError> {
    let mut raw: Handle = ptr::null_mut();
    if unsafe {
        OpenProcessToken(
            GetCurrentProcess(),
            TOKEN_ADJUST_PRIVILEGES | TOKEN_QUERY,
            &mut raw,
        )
    } == 0
    {
        return Err(PlatformError::last_os_error("OpenProcessToken"));
    }
    let token = OwnedHandle(raw);

    let name = wide("SeShutdownPrivilege");
    let mut luid = Luid::default();
    if unsafe { LookupPrivilegeValueW(ptr::null(), name.as_ptr(), &mut luid) } == 0 {
        return Err(PlatformError::last_os_error("LookupPrivilegeValueW"));
    }

    let privileges = TokenPrivileges {
        privilege_count: 1,
        privileges: [LuidAndAttributes {
            luid,
            attributes: SE_PRIVILEGE_ENABLED,
        }],
    };
    let ok = unsafe {
        AdjustTokenPrivileges(
            token.0,
            0,
            &privileges,
            0,
            ptr::null_mut(),
            ptr::null_mut(),
        )
    };
    // AdjustTokenPrivileges reports success even when nothing was granted.
    let last = io::Error::last_os_error();
    if ok == 0 || last.raw_os_error() == Some(ERROR_NOT_ALL_ASSIGNED) {
        return Err(PlatformError::Syscall {
            call: "AdjustTokenPrivileges",
            source: last,
        });
    }
    Ok(())
}

fn exit_windows(force: bool) -> Result<(), PlatformError> {
    enable_shutdown_privilege()?;

    let mut flags = EWX_POWEROFF;
    if force {
        flags |= EWX_FORCE;
    }
    if unsafe { ExitWindowsEx(flags, SHTDN_REASON_FLAG_PLANNED) } == 0 {
        return Err(PlatformError::last_os_error("ExitWindowsEx"));
    }
    Ok(())
}

pub struct WindowsBackend {
    commands: CommandRunner,
}

impl WindowsBackend {
    pub fn new(commands: CommandRunner) -> Self {
        Self { commands }
    }
}

impl SystemBackend for WindowsBackend {
    fn name(&self) -> &'static str {
        "windows"
    }

    fn cpu_times(&self) -> Result<CpuTimes, PlatformError> {
        let mut idle = FileTime::default();
        let mut kernel = FileTime::default();
        let mut user = FileTime::default();
        if unsafe { GetSystemTimes(&mut idle, &mut kernel, &mut user) } == 0 {
            return Err(PlatformError::last_os_error("GetSystemTimes"));
        }

        // Kernel time includes idle time.
        let idle = idle.ticks();
        Ok(CpuTimes {
            user: user.ticks(),
            system: kernel.ticks().saturating_sub(idle),
            idle,
            ..CpuTimes::default()
        })
    }

    fn memory(&self) -> Result<Usage, PlatformError> {
        host::memory_usage()
    }

    fn root_disk(&self) -> Result<Usage, PlatformError> {
        let drive = system_drive();
        debug!(drive = %drive, "Querying system drive");
        host::disk_usage(Path::new(&drive))
    }

    fn network(&self) -> Result<NetworkTotals, PlatformError> {
        Ok(host::network_totals())
    }

    fn uptime(&self) -> Result<u64, PlatformError> {
        Ok(host::uptime())
    }

    fn power_off(&self, force: bool) -> Result<(), ShutdownError> {
        if force {
            info!("Forcing immediate power-off");
            with_fallback(
                "forced power-off",
                || exit_windows(true),
                || self.commands.launch("shutdown", &["/s", "/f", "/t", "0"]),
            )
        } else {
            info!("Scheduling power-off in one minute");
            with_fallback(
                "graceful power-off",
                || self.commands.launch("shutdown", &["/s", "/t", "60"]),
                || exit_windows(false),
            )
        }
    }
}
