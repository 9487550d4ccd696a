//! Test helpers for writing site inventories to disk.

use camino::{Utf8Path, Utf8PathBuf};
use siteplan_engine::{CandidateSite, ExistingSite, SiteInventory};
use std::fs;
use tempfile::TempDir;

pub(super) fn write_utf8(path: &Utf8Path, contents: &[u8]) {
    fs::write(path.as_std_path(), contents).expect("write test file");
}

pub(super) fn utf8_root(tmp: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).expect("utf-8 workspace")
}

/// One existing site and a row of candidates heading east from it.
#[expect(
    clippy::float_arithmetic,
    reason = "test uses float maths for synthetic features"
)]
pub(super) fn sample_inventory(candidates: u32) -> SiteInventory {
    SiteInventory {
        existing: vec![ExistingSite::new("EX_1", 0.05, 0.0)],
        candidates: (0..candidates)
            .map(|i| {
                let step = f64::from(i);
                CandidateSite::new(format!("CA_{i:03}"), 0.0, step * 0.01)
                    .with_raw_features(step, 10.0 - step * 0.1, 5.0 + step * 0.5)
            })
            .collect(),
    }
}

pub(super) fn write_inventory(path: &Utf8Path, inventory: &SiteInventory) {
    let payload = serde_json::to_string_pretty(inventory).expect("serialise inventory");
    write_utf8(path, payload.as_bytes());
}
