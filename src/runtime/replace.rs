//! In-memory process replacement.
//!
//! The decoded image goes into an anonymous, close-on-exec memfd which is then
//! executed in place with `execveat(fd, "", argv, envp, AT_EMPTY_PATH)`. Nothing
//! touches the filesystem and the pid is kept. On success the call does not
//! return.

use super::LaunchError;
use std::convert::Infallible;

/// Longest memfd name the kernel keeps (excluding the `memfd:` prefix).
pub(crate) const MEMFD_NAME_MAX: usize = 249;

/// Replaces the current process with `image`.
///
/// The running process's argv (including argv\[0\]) and environment are passed
/// through unchanged. `name` labels the memfd and shows up in `/proc/<pid>/exe`.
#[cfg(target_os = "linux")]
pub fn replace_process(image: &[u8], name: &str) -> Result<Infallible, LaunchError> {
    use std::os::unix::ffi::OsStringExt;

    let fd = linux::create_image_fd(image, name)?;
    let argv = linux::c_strings(std::env::args_os().map(|arg| arg.into_vec()), "argument")?;
    let envp = linux::c_strings(
        std::env::vars_os().map(|(key, value)| {
            let mut entry = key.into_vec();
            entry.push(b'=');
            entry.extend(value.into_vec());
            entry
        }),
        "environment entry",
    )?;

    log::debug!(
        "exec {} bytes from memfd with {} args and {} env entries",
        image.len(),
        argv.len(),
        envp.len()
    );
    Err(linux::exec_fd(&fd, &argv, &envp))
}

#[cfg(not(target_os = "linux"))]
pub fn replace_process(_image: &[u8], _name: &str) -> Result<Infallible, LaunchError> {
    Err(LaunchError::Unsupported)
}

/// Truncates `name` to [`MEMFD_NAME_MAX`] bytes on a character boundary.
pub(crate) fn memfd_label(name: &str) -> &str {
    let mut end = name.len().min(MEMFD_NAME_MAX);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

#[cfg(target_os = "linux")]
mod linux {
    use super::{LaunchError, memfd_label};
    use nix::errno::Errno;
    use nix::fcntl::AtFlags;
    use nix::libc;
    use nix::sys::memfd::{MFdFlags, memfd_create};
    use nix::unistd::execveat;
    use std::ffi::{CStr, CString};
    use std::os::fd::OwnedFd;

    /// Creates a close-on-exec memfd holding exactly `image`.
    ///
    /// The image is written with a single `write`; a short write is an error.
    pub(crate) fn create_image_fd(image: &[u8], name: &str) -> Result<OwnedFd, LaunchError> {
        let name = CString::new(memfd_label(name))
            .map_err(|_| LaunchError::InteriorNul { what: "memfd name" })?;
        let fd = create_executable_memfd(&name)
            .map_err(|errno| LaunchError::MemfdCreate(errno.into()))?;

        let written =
            nix::unistd::write(&fd, image).map_err(|errno| LaunchError::MemfdWrite(errno.into()))?;
        if written != image.len() {
            return Err(LaunchError::ShortWrite {
                written,
                expected: image.len(),
            });
        }

        Ok(fd)
    }

    /// Asks for an executable memfd explicitly, so `vm.memfd_noexec=1` hosts
    /// still allow the exec. Kernels older than 6.3 reject `MFD_EXEC` with
    /// `EINVAL`; those get a plain close-on-exec memfd.
    pub(crate) fn create_executable_memfd(name: &CStr) -> nix::Result<OwnedFd> {
        let exec = MFdFlags::MFD_CLOEXEC | MFdFlags::from_bits_retain(libc::MFD_EXEC);
        match memfd_create(name, exec) {
            Err(Errno::EINVAL) => {
                log::debug!("memfd_create rejected MFD_EXEC, retrying without it");
                memfd_create(name, MFdFlags::MFD_CLOEXEC)
            }
            result => result,
        }
    }

    pub(crate) fn c_strings<I>(items: I, what: &'static str) -> Result<Vec<CString>, LaunchError>
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        items
            .into_iter()
            .map(|bytes| CString::new(bytes).map_err(|_| LaunchError::InteriorNul { what }))
            .collect()
    }

    /// Executes the memfd. Only returns on failure.
    pub(crate) fn exec_fd(fd: &OwnedFd, argv: &[CString], envp: &[CString]) -> LaunchError {
        match execveat(fd, c"", argv, envp, AtFlags::AT_EMPTY_PATH) {
            Ok(never) => match never {},
            Err(errno) => LaunchError::Exec(errno.into()),
        }
    }
}
