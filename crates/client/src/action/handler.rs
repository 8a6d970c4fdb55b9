use async_trait::async_trait;
use objsync_wire_protocol::PersistentObjectDto;

use super::{Action, ExecuteOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerFlow {
    Continue,
    /// Stop the action; it completes without a result
    Veto,
}

/// Application wide interception of action execution
#[async_trait]
pub trait ActionExecutionHandler: Send + Sync {
    /// Runs after the user confirmed, before anything is sent
    async fn before_execute(&self, action: &Action, options: &ExecuteOptions) -> HandlerFlow;

    /// May inspect or replace the server's result before it is interpreted
    async fn after_execute(
        &self,
        _action: &Action,
        result: Option<PersistentObjectDto>,
    ) -> Option<PersistentObjectDto> {
        result
    }
}
