use std::io::{self, BufRead};
use std::sync::mpsc;
use std::thread;

use crate::backend::Response;

pub enum AppEvent {
    Input(String),
    Response(Response),
    InputClosed,
}

/// Single queue for everything the loop reacts to: typed commands from a
/// stdin reader thread and collaborator responses from worker threads.
pub struct EventHandler {
    rx: mpsc::Receiver<AppEvent>,
    tx: mpsc::Sender<AppEvent>,
}

impl EventHandler {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        let input_tx = tx.clone();

        thread::spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                if input_tx.send(AppEvent::Input(line)).is_err() {
                    return;
                }
            }
            let _ = input_tx.send(AppEvent::InputClosed);
        });

        Self { rx, tx }
    }

    pub fn sender(&self) -> mpsc::Sender<AppEvent> {
        self.tx.clone()
    }

    pub fn next(&self) -> anyhow::Result<AppEvent> {
        Ok(self.rx.recv()?)
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}
