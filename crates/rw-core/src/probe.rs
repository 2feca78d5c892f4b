//! Activity probes.
//!
//! A probe answers one question per tick: did the user do anything since the
//! previous sample? Which probe to use is decided once at startup by
//! [`select_probe`]; the scheduler loop only ever sees a
//! `Box<dyn ActivityProbe>`.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// The Linux interrupt table.
pub const DEFAULT_INTERRUPTS_PATH: &str = "/proc/interrupts";

/// IRQ line of the i8042 keyboard controller in `/proc/interrupts`.
const KEYBOARD_IRQ: &str = "1:";

#[derive(Debug, Error)]
enum ProbeError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no keyboard interrupt line in {path}")]
    MissingKeyboardLine { path: PathBuf },
}

/// Reports whether user activity happened since the previous sample.
pub trait ActivityProbe: Send {
    fn sample(&mut self) -> bool;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Something that can report the pointer position.
pub trait PointerSource: Send {
    /// Current position, or `None` if it can't be determined right now.
    fn position(&mut self) -> Option<(i32, i32)>;
}

/// A pointer source for hosts without a pointer we can query.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPointer;

impl PointerSource for NoPointer {
    fn position(&mut self) -> Option<(i32, i32)> {
        None
    }
}

/// The default probe: activity means the pointer moved.
#[derive(Debug)]
pub struct PointerProbe<S> {
    source: S,
    last: Option<(i32, i32)>,
}

impl<S: PointerSource> PointerProbe<S> {
    pub const fn new(source: S) -> Self {
        Self { source, last: None }
    }
}

impl<S: PointerSource> ActivityProbe for PointerProbe<S> {
    fn sample(&mut self) -> bool {
        let Some(current) = self.source.position() else {
            return false;
        };
        let moved = self.last.is_some_and(|last| last != current);
        self.last = Some(current);
        moved
    }

    fn name(&self) -> &'static str {
        "pointer"
    }
}

/// Watches the keyboard interrupt counter, plus the pointer.
///
/// If the counter becomes unreadable the probe keeps working on the pointer
/// alone.
#[derive(Debug)]
pub struct InterruptProbe<S> {
    path: PathBuf,
    last_count: Option<u64>,
    pointer: PointerProbe<S>,
    counter_ok: bool,
}

impl<S: PointerSource> InterruptProbe<S> {
    pub fn new(path: impl Into<PathBuf>, pointer: S) -> Self {
        Self {
            path: path.into(),
            last_count: None,
            pointer: PointerProbe::new(pointer),
            counter_ok: true,
        }
    }
}

impl<S: PointerSource> ActivityProbe for InterruptProbe<S> {
    fn sample(&mut self) -> bool {
        let moved = self.pointer.sample();
        match keyboard_interrupts(&self.path) {
            Ok(count) => {
                let typed = self.last_count.is_some_and(|last| count > last);
                self.last_count = Some(count);
                self.counter_ok = true;
                moved || typed
            }
            Err(e) => {
                if self.counter_ok {
                    tracing::debug!(error = %e, "keyboard counter unavailable, using pointer only");
                    self.counter_ok = false;
                }
                moved
            }
        }
    }

    fn name(&self) -> &'static str {
        "interrupts"
    }
}

/// Sums the per-CPU counts on the keyboard IRQ line.
fn keyboard_interrupts(path: &Path) -> Result<u64, ProbeError> {
    let content = std::fs::read_to_string(path).map_err(|source| ProbeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    for line in content.lines() {
        let mut fields = line.split_whitespace();
        if fields.next() != Some(KEYBOARD_IRQ) {
            continue;
        }
        return Ok(fields.map_while(|f| f.parse::<u64>().ok()).sum());
    }
    Err(ProbeError::MissingKeyboardLine {
        path: path.to_path_buf(),
    })
}

/// Picks the best probe available on this host.
///
/// Uses the interrupt counter at `interrupts` when it can be read, and falls
/// back to the plain pointer probe otherwise. Never fails.
pub fn select_probe<S>(interrupts: &Path, pointer: S) -> Box<dyn ActivityProbe>
where
    S: PointerSource + 'static,
{
    let probe: Box<dyn ActivityProbe> = match keyboard_interrupts(interrupts) {
        Ok(_) => Box::new(InterruptProbe::new(interrupts, pointer)),
        Err(e) => {
            tracing::debug!(error = %e, "interrupt counter unavailable, falling back to pointer probe");
            Box::new(PointerProbe::new(pointer))
        }
    };
    tracing::debug!(probe = probe.name(), "selected activity probe");
    probe
}
