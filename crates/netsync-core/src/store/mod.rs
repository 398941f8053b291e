// ── Inventory store ──
//
// Per-kind concurrent indexes behind the `Inventory` context object.

mod collection;
mod inventory;

pub use inventory::{ChangeSummary, Inventory};
