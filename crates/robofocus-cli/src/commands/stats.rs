use std::sync::Arc;

use robofocus_core::storage::ledger::level_for_xp;
use robofocus_core::timer::SystemClock;
use robofocus_core::{Database, LocalLedger};
use serde_json::json;

pub fn run(today: bool, recent: Option<usize>) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let stats = if today { db.stats_today()? } else { db.stats_all()? };

    let ledger = LocalLedger::new(db, Arc::new(SystemClock));
    let total_xp = ledger.total_xp()?;
    let streak = ledger.streak()?;
    let recent = match recent {
        Some(limit) => ledger.with_db(|db| db.recent_sessions(limit))?,
        None => Vec::new(),
    };

    super::print_json(&json!({
        "stats": stats,
        "xp": {
            "total": total_xp,
            "level": level_for_xp(total_xp),
        },
        "streak": {
            "current": ledger.current_streak()?,
            "longest": streak.longest,
        },
        "recent": recent,
    }))
}
