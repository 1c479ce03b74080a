use std::fs::{File, OpenOptions};
use std::io::Read;
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Result, TransportError};

/// Baud rates accepted by [`SerialPort::open`].
pub const SUPPORTED_BAUD_RATES: &[u32] = &[
    1200, 2400, 4800, 9600, 19200, 38400, 57600, 115200, 230400,
];

/// A serial TTY device in raw mode.
///
/// Reads block until at least one byte is available and return whatever the
/// driver has buffered, so chunk boundaries are arbitrary.
#[derive(Debug)]
pub struct SerialPort {
    file: File,
    path: PathBuf,
    baud_rate: u32,
}

impl SerialPort {
    /// Open `path` and configure it for 8N1 raw input at `baud_rate`.
    pub fn open(path: impl AsRef<Path>, baud_rate: u32) -> Result<Self> {
        let speed = speed_for(baud_rate)?;
        let path = path.as_ref().to_path_buf();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(&path)
            .map_err(|source| TransportError::Open {
                path: path.clone(),
                source,
            })?;

        configure_raw(&file, speed).map_err(|source| TransportError::Configure {
            path: path.clone(),
            source,
        })?;

        info!(?path, baud_rate, "serial port opened");

        Ok(Self {
            file,
            path,
            baud_rate,
        })
    }

    /// Device path this port was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Configured line speed.
    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    /// Try to clone this port (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            file: self.file.try_clone()?,
            path: self.path.clone(),
            baud_rate: self.baud_rate,
        })
    }
}

impl Read for SerialPort {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file.read(buf)
    }
}

fn speed_for(baud_rate: u32) -> Result<libc::speed_t> {
    let speed = match baud_rate {
        1200 => libc::B1200,
        2400 => libc::B2400,
        4800 => libc::B4800,
        9600 => libc::B9600,
        19200 => libc::B19200,
        38400 => libc::B38400,
        57600 => libc::B57600,
        115200 => libc::B115200,
        230400 => libc::B230400,
        other => return Err(TransportError::UnsupportedBaudRate(other)),
    };
    Ok(speed)
}

fn configure_raw(file: &File, speed: libc::speed_t) -> std::io::Result<()> {
    let fd = file.as_raw_fd();

    // SAFETY: an all-zero `termios` is a valid value to hand to `tcgetattr`,
    // which overwrites it entirely on success.
    let mut tio: libc::termios = unsafe { std::mem::zeroed() };

    // SAFETY: `fd` stays open for the lifetime of `file`, and `tio` is a valid
    // writable `termios`.
    if unsafe { libc::tcgetattr(fd, &mut tio) } != 0 {
        return Err(std::io::Error::last_os_error());
    }

    // SAFETY: `tio` is a valid, initialized `termios`.
    unsafe { libc::cfmakeraw(&mut tio) };
    tio.c_cflag |= libc::CLOCAL | libc::CREAD;
    tio.c_cflag &= !(libc::CSTOPB | libc::PARENB);
    tio.c_cc[libc::VMIN] = 1;
    tio.c_cc[libc::VTIME] = 0;

    // SAFETY: `tio` is a valid, initialized `termios` and `speed` is one of the
    // platform's `B*` constants.
    let rc = unsafe {
        libc::cfsetispeed(&mut tio, speed) | libc::cfsetospeed(&mut tio, speed)
    };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }

    // SAFETY: `fd` is an open descriptor and `tio` is fully initialized.
    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &tio) } != 0 {
        return Err(std::io::Error::last_os_error());
    }

    // Drop whatever the device buffered before we took over the line.
    // SAFETY: `fd` is an open descriptor.
    if unsafe { libc::tcflush(fd, libc::TCIFLUSH) } != 0 {
        return Err(std::io::Error::last_os_error());
    }

    debug!(fd, "terminal switched to raw mode");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unsupported_baud_rate() {
        let err = SerialPort::open("/dev/null", 12345).unwrap_err();
        assert!(matches!(err, TransportError::UnsupportedBaudRate(12345)));
    }

    #[test]
    fn every_supported_rate_has_a_speed() {
        for rate in SUPPORTED_BAUD_RATES {
            assert!(speed_for(*rate).is_ok(), "no speed for {rate}");
        }
    }

    #[test]
    fn missing_device_reports_open_error() {
        let path = std::env::temp_dir().join(format!(
            "beerpong-missing-tty-{}",
            std::process::id()
        ));
        let err = SerialPort::open(&path, 115200).unwrap_err();
        match err {
            TransportError::Open { path: reported, .. } => assert_eq!(reported, path),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn regular_file_is_not_a_terminal() {
        let dir = std::env::temp_dir().join(format!(
            "beerpong-transport-notty-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("plain.txt");
        std::fs::write(&path, b"sensor(1);\r\n").unwrap();

        let err = SerialPort::open(&path, 9600).unwrap_err();
        assert!(matches!(err, TransportError::Configure { .. }));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
