//! Kernel32.dll bindings for memory access on the current process

use crate::core::types::{Address, MemoryError, MemoryResult};
use std::mem;
use winapi::shared::minwindef::{FALSE, LPCVOID, LPVOID};
use winapi::shared::winerror::ERROR_PARTIAL_COPY;
use winapi::um::errhandlingapi::GetLastError;
use winapi::um::memoryapi::{ReadProcessMemory, VirtualQueryEx, WriteProcessMemory};
use winapi::um::processthreadsapi::GetCurrentProcess;
use winapi::um::winnt::{HANDLE, MEMORY_BASIC_INFORMATION};

/// Pseudo-handle of the current process; never needs closing
pub fn current_process() -> HANDLE {
    unsafe { GetCurrentProcess() }
}

fn last_error_reason(call: &str) -> String {
    let code = unsafe { GetLastError() };
    if code == ERROR_PARTIAL_COPY {
        format!("{} failed: partial copy", call)
    } else {
        format!("{} failed: error {}", call, code)
    }
}

/// Safe wrapper for ReadProcessMemory; a short read is a failure
///
/// # Safety
/// The handle must be a valid process handle with read access
pub unsafe fn read_process_memory(
    handle: HANDLE,
    address: usize,
    buffer: &mut [u8],
) -> MemoryResult<()> {
    let mut bytes_read = 0;

    let result = ReadProcessMemory(
        handle,
        address as LPCVOID,
        buffer.as_mut_ptr() as LPVOID,
        buffer.len(),
        &mut bytes_read,
    );

    if result == FALSE {
        Err(MemoryError::read_failed(
            Address::new(address),
            last_error_reason("ReadProcessMemory"),
        ))
    } else if bytes_read != buffer.len() {
        Err(MemoryError::read_failed(
            Address::new(address),
            format!("partial read ({} of {} bytes)", bytes_read, buffer.len()),
        ))
    } else {
        Ok(())
    }
}

/// Safe wrapper for WriteProcessMemory; a short write is a failure
///
/// # Safety
/// The handle must be a valid process handle with write access
pub unsafe fn write_process_memory(
    handle: HANDLE,
    address: usize,
    data: &[u8],
) -> MemoryResult<()> {
    let mut bytes_written = 0;

    let result = WriteProcessMemory(
        handle,
        address as LPVOID,
        data.as_ptr() as LPCVOID,
        data.len(),
        &mut bytes_written,
    );

    if result == FALSE {
        Err(MemoryError::write_failed(
            Address::new(address),
            last_error_reason("WriteProcessMemory"),
        ))
    } else if bytes_written != data.len() {
        Err(MemoryError::write_failed(
            Address::new(address),
            format!("partial write ({} of {} bytes)", bytes_written, data.len()),
        ))
    } else {
        Ok(())
    }
}

/// Safe wrapper for VirtualQueryEx
///
/// # Safety
/// The handle must be a valid process handle with query access
pub unsafe fn virtual_query_ex(
    handle: HANDLE,
    address: usize,
) -> MemoryResult<MEMORY_BASIC_INFORMATION> {
    let mut mbi: MEMORY_BASIC_INFORMATION = mem::zeroed();

    let result = VirtualQueryEx(
        handle,
        address as LPCVOID,
        &mut mbi,
        mem::size_of::<MEMORY_BASIC_INFORMATION>(),
    );

    if result == 0 {
        Err(MemoryError::QueryFailed(format!(
            "VirtualQueryEx failed for address: 0x{:X}",
            address
        )))
    } else {
        Ok(mbi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_round_trip_on_own_memory() {
        let mut target = [0u8; 4];
        let address = target.as_mut_ptr() as usize;
        unsafe {
            write_process_memory(current_process(), address, &[1, 2, 3, 4]).unwrap();
            let mut buffer = [0u8; 4];
            read_process_memory(current_process(), address, &mut buffer).unwrap();
            assert_eq!(buffer, [1, 2, 3, 4]);
        }
    }

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_unmapped_access_fails() {
        unsafe {
            let mut buffer = [0u8; 4];
            assert!(read_process_memory(current_process(), 0x10, &mut buffer).is_err());
            assert!(write_process_memory(current_process(), 0x10, &[0u8; 4]).is_err());
        }
    }
}
