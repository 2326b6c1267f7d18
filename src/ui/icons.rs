//! Emoji with plain-text fallbacks for terminals that can't show them.

use console::Emoji;

// Status indicators
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK] ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR] ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[!] ");

// Connection indicators
pub static LIVE: Emoji<'_, '_> = Emoji("🟢 ", "[LIVE] ");
pub static CONNECTING: Emoji<'_, '_> = Emoji("🟡 ", "[..] ");
pub static OFFLINE: Emoji<'_, '_> = Emoji("🔴 ", "[OFF] ");

// Section headers
pub static LEADS: Emoji<'_, '_> = Emoji("📇 ", "");
pub static VISITS: Emoji<'_, '_> = Emoji("👣 ", "");
pub static SUSPICIOUS: Emoji<'_, '_> = Emoji("🚨 ", "");
pub static DEPLOYMENTS: Emoji<'_, '_> = Emoji("🚀 ", "");
