use super::{ChannelService, MessageContext, Reply, ReplyType};
use crate::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct MockChannel {
    sent: Arc<Mutex<Vec<(String, Reply)>>>,
    should_fail: Arc<Mutex<bool>>,
}

impl MockChannel {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            should_fail: Arc::new(Mutex::new(false)),
        }
    }

    pub fn with_failure(self, should_fail: bool) -> Self {
        *self.should_fail.lock().unwrap() = should_fail;
        self
    }

    /// Replies in send order, paired with the receiver they were routed to.
    pub fn get_sent(&self) -> Vec<(String, Reply)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn get_send_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn count_of(&self, reply_type: ReplyType) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, reply)| reply.reply_type == reply_type)
            .count()
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChannelService for MockChannel {
    async fn send(&self, reply: Reply, ctx: &MessageContext) -> Result<()> {
        if *self.should_fail.lock().unwrap() {
            return Err(crate::Error::Generic("Mock channel failure".to_string()));
        }

        self.sent
            .lock()
            .unwrap()
            .push((ctx.receiver.clone(), reply));
        Ok(())
    }
}
