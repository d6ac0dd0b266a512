//! Terminal-device implementation on top of the POSIX termios API.
//!
//! `translate` is the pure configuration translator: it rewrites a `termios`
//! structure for the requested `LineSettings`. `TermiosDevice` wraps an owned
//! file descriptor and performs the actual system calls.

use super::traits::{Connector, LineSettings, Parity, SerialDevice, Snapshot, StopBits};
use std::ffi::CString;
use std::io;
use std::os::unix::io::{AsRawFd, FromRawFd, OwnedFd, RawFd};

/// Default inter-byte timeout (VTIME) in deciseconds.
pub const DEFAULT_INTER_BYTE_TIMEOUT_DS: u8 = 1;

/// Map a numeric baud rate to the platform speed constant.
pub fn baud_constant(rate: u32) -> Option<libc::speed_t> {
    let speed = match rate {
        50 => libc::B50,
        75 => libc::B75,
        110 => libc::B110,
        134 => libc::B134,
        150 => libc::B150,
        200 => libc::B200,
        300 => libc::B300,
        600 => libc::B600,
        1200 => libc::B1200,
        1800 => libc::B1800,
        2400 => libc::B2400,
        4800 => libc::B4800,
        9600 => libc::B9600,
        19200 => libc::B19200,
        38400 => libc::B38400,
        57600 => libc::B57600,
        115200 => libc::B115200,
        230400 => libc::B230400,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        460800 => libc::B460800,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        500000 => libc::B500000,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        576000 => libc::B576000,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        921600 => libc::B921600,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        1000000 => libc::B1000000,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        1500000 => libc::B1500000,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        2000000 => libc::B2000000,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        3000000 => libc::B3000000,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        4000000 => libc::B4000000,
        _ => return None,
    };
    Some(speed)
}

/// Rewrite `attrs` for raw 8-bit transfer with the given settings.
///
/// Nothing is modified when the baud rate has no speed constant.
pub fn translate(
    attrs: &mut libc::termios,
    settings: &LineSettings,
    inter_byte_timeout_ds: u8,
) -> io::Result<()> {
    let speed = baud_constant(settings.baud_rate).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("unsupported baud rate {}", settings.baud_rate),
        )
    })?;

    // Raw mode: no line editing, no signals, no echo, no output processing.
    attrs.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::PARMRK
        | libc::ISTRIP
        | libc::INLCR
        | libc::IGNCR
        | libc::ICRNL
        | libc::IXON
        | libc::IXOFF
        | libc::IXANY);
    attrs.c_oflag &= !libc::OPOST;
    attrs.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);

    // Eight data bits, modem lines ignored, receiver on, no RTS/CTS.
    attrs.c_cflag &= !(libc::CSIZE | libc::PARENB | libc::PARODD | libc::CSTOPB | libc::CRTSCTS);
    attrs.c_cflag |= libc::CS8 | libc::CLOCAL | libc::CREAD;

    match settings.parity {
        Parity::None => {
            attrs.c_iflag &= !libc::INPCK;
        }
        Parity::Even => {
            attrs.c_cflag |= libc::PARENB;
            attrs.c_iflag |= libc::INPCK;
        }
        Parity::Odd => {
            attrs.c_cflag |= libc::PARENB | libc::PARODD;
            attrs.c_iflag |= libc::INPCK;
        }
    }

    if settings.stop_bits == StopBits::Two {
        attrs.c_cflag |= libc::CSTOPB;
    }

    attrs.c_cc[libc::VMIN] = 1;
    attrs.c_cc[libc::VTIME] = inter_byte_timeout_ds;

    // SAFETY: `attrs` is a valid, exclusively borrowed termios structure.
    if unsafe { libc::cfsetispeed(attrs, speed) } != 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: as above.
    if unsafe { libc::cfsetospeed(attrs, speed) } != 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

fn cvt(ret: libc::c_int) -> io::Result<libc::c_int> {
    if ret == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret)
    }
}

/// Serial device backed by a terminal file descriptor.
pub struct TermiosDevice {
    fd: OwnedFd,
    path: String,
    inter_byte_timeout_ds: u8,
}

impl TermiosDevice {
    /// Open `path` with `O_RDWR | O_NOCTTY | O_NONBLOCK`.
    pub fn open(path: &str, inter_byte_timeout_ds: u8) -> io::Result<Self> {
        let c_path = CString::new(path)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "path contains a NUL byte"))?;

        // SAFETY: `c_path` is a valid NUL-terminated string for the call.
        let raw = cvt(unsafe {
            libc::open(
                c_path.as_ptr(),
                libc::O_RDWR | libc::O_NOCTTY | libc::O_NONBLOCK | libc::O_CLOEXEC,
            )
        })?;

        Ok(Self {
            // SAFETY: `raw` was just returned by open(2) and is owned by nobody else.
            fd: unsafe { OwnedFd::from_raw_fd(raw) },
            path: path.to_string(),
            inter_byte_timeout_ds,
        })
    }

    fn raw(&self) -> RawFd {
        self.fd.as_raw_fd()
    }

    fn get_attrs(&self) -> io::Result<libc::termios> {
        // SAFETY: termios is plain old data; tcgetattr fills every field.
        let mut attrs: libc::termios = unsafe { std::mem::zeroed() };
        // SAFETY: the descriptor is open for the lifetime of `self`.
        cvt(unsafe { libc::tcgetattr(self.raw(), &mut attrs) })?;
        Ok(attrs)
    }

    fn set_attrs(&self, attrs: &libc::termios) -> io::Result<()> {
        // SAFETY: the descriptor is open and `attrs` is a valid termios.
        cvt(unsafe { libc::tcsetattr(self.raw(), libc::TCSANOW, attrs) })?;
        Ok(())
    }
}

impl SerialDevice for TermiosDevice {
    fn clear_nonblocking(&mut self) -> io::Result<()> {
        // SAFETY: fcntl on an owned, open descriptor.
        let flags = cvt(unsafe { libc::fcntl(self.raw(), libc::F_GETFL) })?;
        // SAFETY: as above.
        cvt(unsafe { libc::fcntl(self.raw(), libc::F_SETFL, flags & !libc::O_NONBLOCK) })?;
        Ok(())
    }

    fn snapshot(&mut self) -> io::Result<Snapshot> {
        self.get_attrs().map(Snapshot::Termios)
    }

    fn apply(&mut self, settings: &LineSettings) -> io::Result<()> {
        let mut attrs = self.get_attrs()?;
        translate(&mut attrs, settings, self.inter_byte_timeout_ds)?;
        self.set_attrs(&attrs)
    }

    fn restore(&mut self, snapshot: &Snapshot) -> io::Result<()> {
        match snapshot {
            Snapshot::Termios(attrs) => self.set_attrs(attrs),
            Snapshot::Settings(settings) => self.apply(settings),
        }
    }

    fn drain(&mut self) -> io::Result<()> {
        // SAFETY: tcdrain on an owned, open descriptor.
        cvt(unsafe { libc::tcdrain(self.raw()) })?;
        Ok(())
    }

    fn read_available(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        // The descriptor is blocking after open, so check readiness first.
        let mut pfd = libc::pollfd {
            fd: self.raw(),
            events: libc::POLLIN,
            revents: 0,
        };
        // SAFETY: `pfd` is a single valid pollfd.
        let ready = cvt(unsafe { libc::poll(&mut pfd, 1, 0) })?;
        if ready == 0 || pfd.revents & libc::POLLIN == 0 {
            return Ok(0);
        }

        // SAFETY: `buffer` is valid for `buffer.len()` writable bytes.
        let n = unsafe { libc::read(self.raw(), buffer.as_mut_ptr().cast(), buffer.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(n as usize)
    }

    fn write_bytes(&mut self, data: &[u8]) -> io::Result<usize> {
        // SAFETY: `data` is valid for `data.len()` readable bytes.
        let n = unsafe { libc::write(self.raw(), data.as_ptr().cast(), data.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(n as usize)
    }
}

impl std::fmt::Debug for TermiosDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TermiosDevice")
            .field("path", &self.path)
            .field("fd", &self.raw())
            .finish()
    }
}

/// Connector that opens real terminal devices.
#[derive(Debug, Clone, Copy)]
pub struct TermiosConnector {
    inter_byte_timeout_ds: u8,
}

impl TermiosConnector {
    pub fn new(inter_byte_timeout_ds: u8) -> Self {
        Self {
            inter_byte_timeout_ds,
        }
    }
}

impl Default for TermiosConnector {
    fn default() -> Self {
        Self::new(DEFAULT_INTER_BYTE_TIMEOUT_DS)
    }
}

impl Connector for TermiosConnector {
    fn connect(&self, path: &str) -> io::Result<Box<dyn SerialDevice>> {
        let device = TermiosDevice::open(path, self.inter_byte_timeout_ds)?;
        Ok(Box::new(device))
    }
}
