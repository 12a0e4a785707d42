// Copyright @yucwang 2026

use crate::core::device::Stream;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Device-side diagnostic message buffer written by kernels and drained to
/// the host log on the stream.
#[derive(Debug)]
pub struct Printer {
    capacity: usize,
    messages: Mutex<Vec<String>>,
    dropped: AtomicUsize,
}

impl Printer {
    pub const DEFAULT_CAPACITY: usize = 1 << 16;

    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            messages: Mutex::new(Vec::new()),
            dropped: AtomicUsize::new(0),
        }
    }

    pub fn disabled() -> Self {
        Self::new(0)
    }

    /// True when the printer has no buffer, so there is never anything to
    /// retrieve.
    pub fn is_empty(&self) -> bool {
        self.capacity == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    pub fn log<S: Into<String>>(&self, message: S) {
        let mut messages = self.lock();
        if messages.len() < self.capacity {
            messages.push(message.into());
        } else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn reset<'env>(&'env self, stream: &mut Stream<'env>) {
        stream.enqueue(move || {
            self.lock().clear();
            self.dropped.store(0, Ordering::Relaxed);
            Ok(())
        });
    }

    pub fn retrieve<'env>(&'env self, stream: &mut Stream<'env>) {
        stream.enqueue(move || {
            for message in self.take() {
                log::info!("[device] {}", message);
            }
            let dropped = self.dropped.swap(0, Ordering::Relaxed);
            if dropped > 0 {
                log::warn!("Printer buffer overflow, {} messages dropped.", dropped);
            }
            Ok(())
        });
    }

    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Printer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::device::Device;

    #[test]
    fn test_printer_drops_overflow() {
        let printer = Printer::new(2);
        printer.log("a");
        printer.log("b");
        printer.log("c");
        assert_eq!(printer.take(), vec![String::from("a"), String::from("b")]);
        assert_eq!(printer.dropped.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_printer_retrieve_drains_buffer() {
        let device = Device::new(1);
        let printer = Printer::default();
        printer.log("stale");
        device
            .with_stream(|stream| {
                printer.reset(stream);
                stream.synchronize()?;
                printer.log("fresh");
                printer.retrieve(stream);
                stream.synchronize()
            })
            .unwrap();
        assert_eq!(printer.pending(), 0);
        assert!(!printer.is_empty());
        assert!(Printer::disabled().is_empty());
    }
}
