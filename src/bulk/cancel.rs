use std::{
    io::{self, BufRead},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
};

use log::info;

/// Запрос на остановку, общий для прогона и того, кто его останавливает.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Отменяет токен, когда в stdin приходит строка. Конец ввода игнорируется.
    pub fn cancel_on_enter(&self) {
        let token = self.clone();
        thread::spawn(move || {
            let mut line = String::new();
            if let Ok(n) = io::stdin().lock().read_line(&mut line) {
                if n > 0 {
                    info!("Stopping after the current row");
                    token.cancel();
                }
            }
        });
    }
}
