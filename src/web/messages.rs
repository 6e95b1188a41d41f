use serde::Serialize;
use tokio::sync::Mutex;

const MAX_MESSAGES: usize = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageKind {
    Ok,
    Error,
}

/// One entry of the operator event feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub title: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageFeed {
    pub msg: Vec<Message>,
}

/// Append-only operator feed shared by the UI, the crane endpoints and the
/// poller. Guarded by its own lock, independent of the job and yard locks.
#[derive(Debug, Default)]
pub struct Messages {
    feed: Mutex<Vec<Message>>,
}

impl Messages {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, title: impl Into<String>, text: impl Into<String>) {
        self.push(title.into(), text.into(), MessageKind::Ok).await;
    }

    pub async fn add_error(&self, title: impl Into<String>, text: impl Into<String>) {
        self.push(title.into(), text.into(), MessageKind::Error).await;
    }

    async fn push(&self, title: String, text: String, kind: MessageKind) {
        let mut feed = self.feed.lock().await;
        if feed.len() >= MAX_MESSAGES {
            feed.remove(0);
        }
        feed.push(Message { title, text, kind });
    }

    /// Current feed; `clear` empties it in the same critical section.
    pub async fn read(&self, clear: bool) -> MessageFeed {
        let mut feed = self.feed.lock().await;
        let msg = if clear {
            std::mem::take(&mut *feed)
        } else {
            feed.clone()
        };
        MessageFeed { msg }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn read_with_clear_drains_feed() {
        let messages = Messages::new();
        messages.add("WEB job_post", "ok").await;
        messages.add_error("CCS alarm", "door open").await;

        let feed = messages.read(false).await;
        assert_eq!(feed.msg.len(), 2);
        assert_eq!(feed.msg[1].kind, MessageKind::Error);

        let feed = messages.read(true).await;
        assert_eq!(feed.msg.len(), 2);
        assert!(messages.read(false).await.msg.is_empty());
    }

    #[tokio::test]
    async fn feed_serializes_kind_in_uppercase() {
        let messages = Messages::new();
        messages.add("CCS send_job", "crane acked job").await;
        let value = serde_json::to_value(messages.read(false).await).unwrap();
        assert_eq!(value["msg"][0]["type"], "OK");
        assert_eq!(value["msg"][0]["title"], "CCS send_job");
    }

    #[tokio::test]
    async fn feed_is_bounded() {
        let messages = Messages::new();
        for i in 0..(MAX_MESSAGES + 5) {
            messages.add("t", i.to_string()).await;
        }
        let feed = messages.read(false).await;
        assert_eq!(feed.msg.len(), MAX_MESSAGES);
        assert_eq!(feed.msg[0].text, "5");
    }
}
