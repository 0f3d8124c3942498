//! Serial device adapter.
//!
//! - **`target_os = "linux"`**: opens the tty through `serialport` (8 data
//!   bits, 1 stop bit, no flow control, per-read timeout) and drives
//!   mark/space parity with `termios2` ioctls: `PARENB | CMSPAR` stay set
//!   and `PARODD` selects mark (set) or space (clear). Input runs with
//!   `INPCK | PARMRK`, so the kernel delivers a literal `0xFF` as `FF FF`
//!   and a parity-flagged byte as `FF 00 X`, the sequences the framer
//!   destuffs.
//! - **other targets**: mark/space parity has no portable driver; opening
//!   reports [`LinkError::OpenFailed`].

use crate::config::LinkConfig;
use crate::error::LinkError;
use crate::link::transport::{Parity, Transport};

#[cfg(target_os = "linux")]
pub use linux::SerialLink;

#[cfg(not(target_os = "linux"))]
pub use unsupported::SerialLink;

#[cfg(target_os = "linux")]
mod linux {
    use std::io::{self, Read, Write};
    use std::os::fd::AsRawFd;

    use log::{error, info};
    use serialport::{DataBits, FlowControl, StopBits, TTYPort};

    use super::{LinkConfig, LinkError, Parity, Transport};

    pub struct SerialLink {
        port: TTYPort,
    }

    /// Line settings applied on every parity switch.
    pub(super) fn apply_line_flags(tio: &mut libc::termios2, parity: Parity) {
        tio.c_cflag |= libc::PARENB | libc::CMSPAR;
        tio.c_iflag |= libc::INPCK | libc::PARMRK;
        tio.c_iflag &= !(libc::ISTRIP | libc::IGNPAR);
        match parity {
            Parity::Mark => tio.c_cflag |= libc::PARODD,
            Parity::Space => tio.c_cflag &= !libc::PARODD,
        }
    }

    impl SerialLink {
        /// Open `path` and leave the line in mark parity.
        pub fn open(path: &str, config: &LinkConfig) -> Result<Self, LinkError> {
            let port = serialport::new(path, config.baud_rate)
                .data_bits(DataBits::Eight)
                .stop_bits(StopBits::One)
                .flow_control(FlowControl::None)
                .parity(serialport::Parity::None)
                .timeout(config.read_timeout())
                .open_native()
                .map_err(|e| {
                    error!("open {} failed: {}", path, e);
                    LinkError::OpenFailed
                })?;

            let mut link = Self { port };
            link.set_parity(Parity::Mark).map_err(|e| {
                error!("configure {} failed: {}", path, e);
                LinkError::ConfigureFailed
            })?;
            info!("opened {} at {} baud", path, config.baud_rate);
            Ok(link)
        }

        fn termios(&self) -> io::Result<libc::termios2> {
            // SAFETY: termios2 is plain old data and TCGETS2 fills it completely.
            let mut tio: libc::termios2 = unsafe { core::mem::zeroed() };
            // SAFETY: the fd is owned by `port` and open for our lifetime.
            if unsafe { libc::ioctl(self.port.as_raw_fd(), libc::TCGETS2, &mut tio) } < 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(tio)
        }
    }

    impl Transport for SerialLink {
        type Error = io::Error;

        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.port.read(buf) {
                Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
                other => other,
            }
        }

        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            self.port.write(data)
        }

        fn set_parity(&mut self, parity: Parity) -> io::Result<()> {
            self.port.flush()?;
            let mut tio = self.termios()?;
            apply_line_flags(&mut tio, parity);
            // SAFETY: `tio` is a valid termios2 read back from the same fd.
            if unsafe { libc::ioctl(self.port.as_raw_fd(), libc::TCSETS2, &tio) } < 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        }
    }
}

#[cfg(not(target_os = "linux"))]
mod unsupported {
    use std::io;

    use log::error;

    use super::{LinkConfig, LinkError, Parity, Transport};

    pub struct SerialLink {
        _private: (),
    }

    impl SerialLink {
        pub fn open(path: &str, _config: &LinkConfig) -> Result<Self, LinkError> {
            error!("open {}: mark/space parity is only supported on Linux", path);
            Err(LinkError::OpenFailed)
        }
    }

    fn unsupported() -> io::Error {
        io::Error::from(io::ErrorKind::Unsupported)
    }

    impl Transport for SerialLink {
        type Error = io::Error;

        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(unsupported())
        }

        fn write(&mut self, _data: &[u8]) -> io::Result<usize> {
            Err(unsupported())
        }

        fn set_parity(&mut self, _parity: Parity) -> io::Result<()> {
            Err(unsupported())
        }
    }
}

/// Whether `path` names a serial device this platform can open:
/// `/dev/tty*` on Linux, `COM1`..`COM999` on Windows.
pub fn is_valid_device_path(path: &str) -> bool {
    if let Some(rest) = path.strip_prefix("/dev/tty") {
        return cfg!(not(windows)) && rest.bytes().all(|b| b.is_ascii_alphanumeric());
    }
    if let Some(num) = path.strip_prefix("COM") {
        return cfg!(windows) && (1..=3).contains(&num.len()) && num.bytes().all(|b| b.is_ascii_digit());
    }
    false
}
