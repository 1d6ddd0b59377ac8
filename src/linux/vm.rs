//! Fault-isolated access via `process_vm_readv` / `process_vm_writev`

use crate::core::types::{Address, MemoryError, MemoryResult};
use nix::sys::uio::{process_vm_readv, process_vm_writev, RemoteIoVec};
use nix::unistd::Pid;
use std::io::{IoSlice, IoSliceMut};

/// Copy `buffer.len()` bytes from `address` in this process
pub fn read_memory(address: Address, buffer: &mut [u8]) -> MemoryResult<()> {
    if buffer.is_empty() {
        return Ok(());
    }
    let remote = [RemoteIoVec {
        base: address.as_usize(),
        len: buffer.len(),
    }];
    let expected = buffer.len();
    let mut local = [IoSliceMut::new(buffer)];

    match process_vm_readv(Pid::this(), &mut local, &remote) {
        Ok(read) if read == expected => Ok(()),
        Ok(read) => Err(MemoryError::read_failed(
            address,
            format!("partial read ({} of {} bytes)", read, expected),
        )),
        Err(errno) => Err(MemoryError::read_failed(address, errno.desc())),
    }
}

/// Copy `data` to `address` in this process
pub fn write_memory(address: Address, data: &[u8]) -> MemoryResult<()> {
    if data.is_empty() {
        return Ok(());
    }
    let remote = [RemoteIoVec {
        base: address.as_usize(),
        len: data.len(),
    }];
    let local = [IoSlice::new(data)];

    match process_vm_writev(Pid::this(), &local, &remote) {
        Ok(written) if written == data.len() => Ok(()),
        Ok(written) => Err(MemoryError::write_failed(
            address,
            format!("partial write ({} of {} bytes)", written, data.len()),
        )),
        Err(errno) => Err(MemoryError::write_failed(address, errno.desc())),
    }
}
