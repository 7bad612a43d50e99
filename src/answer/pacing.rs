//! Character-paced emission of answer text.

use futures::channel::mpsc::UnboundedSender;
use std::time::Duration;

/// Sends text one character at a time with a fixed delay.
pub struct Pacer {
    tx: UnboundedSender<String>,
    delay: Duration,
}

impl Pacer {
    pub fn new(tx: UnboundedSender<String>, delay: Duration) -> Self {
        Self { tx, delay }
    }

    /// Emit `text` word by word, one character per message, with single
    /// spaces between words. Returns false once the receiver is gone.
    pub async fn emit_words(&self, text: &str) -> bool {
        let words: Vec<&str> = text.split_whitespace().collect();
        for (i, word) in words.iter().enumerate() {
            for c in word.chars() {
                if !self.send(c.to_string()).await {
                    return false;
                }
            }
            if i + 1 < words.len() && !self.send(" ".to_string()).await {
                return false;
            }
        }
        true
    }

    /// Whether the receiving end has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Emit `text` as a single message.
    pub async fn emit_raw(&self, text: &str) -> bool {
        self.send(text.to_string()).await
    }

    async fn send(&self, piece: String) -> bool {
        if self.tx.unbounded_send(piece).is_err() {
            return false;
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        true
    }
}
