//! Outbound delivery channels for BriefBot.
//!
//! Only Telegram is supported: one bot, one chat. The send path is split in
//! two so the retry protocol can be driven by a scripted transport in tests:
//!
//! ```text
//! TelegramSender (Notifier)
//!   ├── retry policy: 429 → wait hint + 1s, 6 attempts, 45s total
//!   └── BotTransport
//!         └── HttpTransport (reqwest)
//! ```

pub mod retry;
pub mod telegram;

pub use telegram::{BotResponse, BotTransport, HttpTransport, TelegramSender, escape_html};
