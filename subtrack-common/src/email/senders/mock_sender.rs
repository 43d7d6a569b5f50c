use async_trait::async_trait;

use crate::email::{EmailError, EmailMessage, SendEmail};

pub struct MockSender {}

impl MockSender {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for MockSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SendEmail for MockSender {
    async fn send<'a>(&self, message: EmailMessage<'a>) -> Result<(), EmailError> {
        println!("\n\n{:#?}\n\n", message);
        Ok(())
    }
}
