use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct LinkStatus {
    pub connected: bool,
    pub url: Option<String>,
    pub last_heartbeat: Option<Instant>,
    pub last_msg: Option<String>,
    pub messages: u64,
}

impl LinkStatus {
    pub fn hb_age(&self) -> Option<Duration> {
        self.last_heartbeat.map(|t| t.elapsed())
    }

    pub fn on_message(&mut self, name: &str, is_heartbeat: bool) {
        self.connected = true;
        self.messages += 1;
        self.last_msg = Some(name.to_string());
        if is_heartbeat {
            self.last_heartbeat = Some(Instant::now());
        }
    }
}
