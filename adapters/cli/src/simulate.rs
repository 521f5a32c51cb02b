use serde::Serialize;
use siege_core::{SessionOutcome, SessionStats};
use siege_session::Session;
use siege_sync::{Delta, DeltaTracker};

use crate::script::Script;

/// Final state of a headless run.
#[derive(Debug, Serialize)]
pub(crate) struct Summary {
    pub(crate) outcome: Option<SessionOutcome>,
    pub(crate) ticks: u64,
    pub(crate) currency: u32,
    pub(crate) lives: u32,
    pub(crate) rejections: usize,
    pub(crate) stats: SessionStats,
}

/// Runs `session` until it concludes or `max_ticks` elapse, feeding the
/// scripted intents and handing every tick's delta to `on_delta`.
pub(crate) fn run(
    session: &mut Session,
    script: &mut Script,
    max_ticks: u64,
    mut on_delta: impl FnMut(&Delta),
) -> Summary {
    let mut tracker = DeltaTracker::from_snapshot(&session.snapshot());
    let mut rejections = 0;

    for tick in 0..max_ticks {
        for scripted in script.due(tick) {
            session.submit(scripted.player, scripted.sequence, scripted.intent);
        }

        let report = session.tick();
        rejections += report.rejections.len();
        on_delta(&tracker.diff(&session.snapshot(), report.events));

        if report.concluded.is_some() {
            break;
        }
    }

    let snapshot = session.snapshot();
    Summary {
        outcome: session.outcome(),
        ticks: snapshot.tick,
        currency: snapshot.currency,
        lives: snapshot.lives,
        rejections,
        stats: snapshot.stats,
    }
}
