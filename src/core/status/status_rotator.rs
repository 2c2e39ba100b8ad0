// Presence rotation - which status line to show next.
//
// The rotator only produces text; the Discord layer turns each entry into an
// activity and sets it.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Watching,
    Playing,
}

/// Which number a status line reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusSlot {
    Servers,
    Users,
    Uptime,
    BlockedDomains,
}

const ROTATION: [StatusSlot; 4] = [
    StatusSlot::Servers,
    StatusSlot::Users,
    StatusSlot::Uptime,
    StatusSlot::BlockedDomains,
];

/// Numbers sampled right before a status change.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusSnapshot {
    pub servers: usize,
    pub users: usize,
    pub uptime: Duration,
    pub blocked_domains: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub kind: StatusKind,
    pub text: String,
}

/// "3h 2m 1s" style uptime.
pub fn format_uptime(uptime: Duration) -> String {
    let total = uptime.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{hours}h {minutes}m {seconds}s")
}

#[derive(Debug, Default)]
pub struct StatusRotator {
    position: usize,
}

impl StatusRotator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render the next status and advance.
    pub fn next_status(&mut self, snapshot: &StatusSnapshot) -> StatusLine {
        let slot = ROTATION[self.position % ROTATION.len()];
        self.position = (self.position + 1) % ROTATION.len();

        match slot {
            StatusSlot::Servers => StatusLine {
                kind: StatusKind::Watching,
                text: format!("Serving {} servers", snapshot.servers),
            },
            StatusSlot::Users => StatusLine {
                kind: StatusKind::Watching,
                text: format!("Serving {} users", snapshot.users),
            },
            StatusSlot::Uptime => StatusLine {
                kind: StatusKind::Playing,
                text: format!("Uptime: {}", format_uptime(snapshot.uptime)),
            },
            StatusSlot::BlockedDomains => StatusLine {
                kind: StatusKind::Watching,
                text: format!("for {} bad domains", snapshot.blocked_domains),
            },
        }
    }
}
