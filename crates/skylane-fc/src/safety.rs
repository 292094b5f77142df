use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Land,
    Reposition,
}

#[derive(Debug)]
pub struct CommandRateLimit {
    last: HashMap<CommandKind, Instant>,
    min_interval: Duration,
}

impl CommandRateLimit {
    pub fn new(min_interval: Duration) -> Self {
        Self { last: HashMap::new(), min_interval }
    }

    /// Records the command as sent, or returns how long until it would be allowed.
    pub fn allow(&mut self, kind: CommandKind) -> Result<(), Duration> {
        let now = Instant::now();
        if let Some(t) = self.last.get(&kind) {
            let since = now.duration_since(*t);
            if since < self.min_interval { return Err(self.min_interval - since); }
        }
        self.last.insert(kind, now);
        Ok(())
    }
}
