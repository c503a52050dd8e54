//! Subcommand implementations.

pub mod cart;
pub mod wishlist;

use thiserror::Error;
use tokio::sync::broadcast;
use vitrine_storefront::{Notice, NoticeLevel, StoreError};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Cart commands need to know whose cart to load.
    #[error("Missing environment variable: VITRINE_USER_ID")]
    MissingUserId,

    /// A store operation failed.
    #[error("{}", .0.user_message())]
    Store(#[from] StoreError),
}

/// Print every notice published while the command ran.
pub fn print_notices(notices: &mut broadcast::Receiver<Notice>) {
    while let Ok(notice) = notices.try_recv() {
        match notice.level {
            NoticeLevel::Success => println!("{}", notice.message),
            NoticeLevel::Error => tracing::warn!("{}", notice.message),
        }
    }
}
