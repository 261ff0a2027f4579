//! One-shot notices carried in the session to the next rendered page.

use tower_sessions::{session, Session};

pub const FLASH_KEY: &str = "_flashes";

pub async fn flash(session: &Session, message: impl Into<String>) -> Result<(), session::Error> {
    let mut messages: Vec<String> = session.get(FLASH_KEY).await?.unwrap_or_default();
    messages.push(message.into());
    session.insert(FLASH_KEY, messages).await
}

/// Removes and returns all pending messages, oldest first.
pub async fn take_flashes(session: &Session) -> Result<Vec<String>, session::Error> {
    Ok(session
        .remove::<Vec<String>>(FLASH_KEY)
        .await?
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tower_sessions::MemoryStore;

    #[tokio::test]
    async fn test_flashes_are_drained_in_order() {
        let store = Arc::new(MemoryStore::default());
        let session = Session::new(None, store, None);

        flash(&session, "first").await.unwrap();
        flash(&session, "second").await.unwrap();

        assert_eq!(take_flashes(&session).await.unwrap(), vec!["first", "second"]);
        assert!(take_flashes(&session).await.unwrap().is_empty());
    }
}
