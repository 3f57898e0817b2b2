use log::{info, warn};

pub fn log_redeem_skipped(condition_id: &str) {
    warn!("⚠️ Position {} is not redeemable — skipping", condition_id);
}

pub fn log_submission(kind: &str, id: &str) {
    info!("📤 {} submitted as {}", kind, id);
}

pub fn log_confirmation(id: &str) {
    info!("✅ Transaction {} confirmed", id);
}
