//! Available-memory probes for the parallelism gate.

/// Reports memory currently available to new work.
pub trait MemoryProbe: Send + Sync {
    /// Available bytes, or `None` when the platform cannot tell.
    fn available_bytes(&self) -> Option<u64>;
}

/// Reads the operating system's view of available memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemMemoryProbe;

impl MemoryProbe for SystemMemoryProbe {
    fn available_bytes(&self) -> Option<u64> {
        #[cfg(target_os = "linux")]
        {
            if let Some(bytes) = std::fs::read_to_string("/proc/meminfo")
                .ok()
                .and_then(|s| parse_meminfo_available(&s))
            {
                return Some(bytes);
            }
            sysconf_available()
        }
        #[cfg(not(target_os = "linux"))]
        {
            None
        }
    }
}

/// Fixed answer, for callers that already know the memory budget.
#[derive(Debug, Clone, Copy)]
pub struct FixedMemoryProbe(pub Option<u64>);

impl MemoryProbe for FixedMemoryProbe {
    fn available_bytes(&self) -> Option<u64> {
        self.0
    }
}

/// Extract `MemAvailable` (reported in kB) from `/proc/meminfo`.
pub fn parse_meminfo_available(meminfo: &str) -> Option<u64> {
    meminfo.lines().find_map(|line| {
        let rest = line.strip_prefix("MemAvailable:")?;
        let mut parts = rest.split_whitespace();
        let value: u64 = parts.next()?.parse().ok()?;
        match parts.next() {
            Some("kB") | None => Some(value * 1024),
            Some(_) => None,
        }
    })
}

#[cfg(target_os = "linux")]
fn sysconf_available() -> Option<u64> {
    // SAFETY: sysconf has no preconditions and only reads system values.
    let (pages, page_size) = unsafe {
        (
            libc::sysconf(libc::_SC_AVPHYS_PAGES),
            libc::sysconf(libc::_SC_PAGESIZE),
        )
    };
    if pages <= 0 || page_size <= 0 {
        return None;
    }
    Some(pages as u64 * page_size as u64)
}
