//! Order notification recipient management.
//!
//! # Usage
//!
//! ```bash
//! partsyard recipients add -n "Front desk" -c 123456789
//! partsyard recipients list
//! partsyard recipients deactivate -c 123456789
//! ```

use partsyard_storefront::db::{PgRecipientDirectory, RecipientDirectory, RepositoryError};

use super::{CommandError, connect};

/// Register a Telegram chat to receive new-order messages.
pub async fn add(name: &str, chat_id: i64) -> Result<(), CommandError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CommandError::InvalidArgument(
            "recipient name must not be empty".to_owned(),
        ));
    }

    let directory = PgRecipientDirectory::new(connect().await?);
    let recipient = directory.add(name, chat_id).await.map_err(|e| match e {
        RepositoryError::Conflict(_) => {
            CommandError::InvalidArgument(format!("chat {chat_id} is already registered"))
        }
        other => other.into(),
    })?;

    tracing::info!(
        "Recipient added! ID: {}, Name: {}, Chat: {}",
        recipient.id,
        recipient.name,
        recipient.chat_id
    );
    Ok(())
}

/// Print every recipient, active or not.
pub async fn list() -> Result<(), CommandError> {
    let directory = PgRecipientDirectory::new(connect().await?);
    let recipients = directory.list().await?;

    #[allow(clippy::print_stdout)]
    {
        if recipients.is_empty() {
            println!("No recipients registered");
        }
        for r in &recipients {
            let state = if r.is_active { "active" } else { "inactive" };
            println!("{:>5}  {:<24} {:>14}  {state}", r.id, r.name, r.chat_id);
        }
    }
    Ok(())
}

/// Stop sending notifications to a chat.
pub async fn deactivate(chat_id: i64) -> Result<(), CommandError> {
    let directory = PgRecipientDirectory::new(connect().await?);
    directory.deactivate(chat_id).await.map_err(|e| match e {
        RepositoryError::NotFound => {
            CommandError::InvalidArgument(format!("no recipient with chat {chat_id}"))
        }
        other => other.into(),
    })?;

    tracing::info!("Recipient with chat {} deactivated", chat_id);
    Ok(())
}
