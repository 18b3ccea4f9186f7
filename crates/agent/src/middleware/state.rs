use callmend::chat::ChatMessage;
use std::sync::Arc;

/// Statistics about agent execution
#[derive(Debug, Clone, Default)]
pub struct AgentStats {
    /// Model calls made in this session
    pub steps: usize,
    /// Turns started in this session
    pub turns: usize,
    /// Tool responses synthesized for dangling tool calls
    pub synthesized_tool_responses: usize,
}

/// How a middleware changes the conversation history.
#[derive(Debug, Clone)]
pub enum HistoryUpdate {
    /// The given sequence supersedes the prior history in full.
    Overwrite(Arc<[ChatMessage]>),
    /// The given messages are added after the existing history.
    Append(Vec<ChatMessage>),
}

/// Context passed to middleware during state transitions
#[derive(Debug, Clone)]
pub struct ConversationContext {
    pub session_id: Arc<str>,
    pub messages: Arc<[ChatMessage]>,
    pub stats: Arc<AgentStats>,
    /// Current provider for the session
    pub provider: Arc<str>,
    /// Current model for the session
    pub model: Arc<str>,
}

impl ConversationContext {
    pub fn new(
        session_id: Arc<str>,
        messages: Arc<[ChatMessage]>,
        stats: Arc<AgentStats>,
        provider: Arc<str>,
        model: Arc<str>,
    ) -> Self {
        Self {
            session_id,
            messages,
            stats,
            provider,
            model,
        }
    }

    /// Creates a new context with the history changed by `update`
    pub fn apply(&self, update: HistoryUpdate) -> Self {
        let messages = match update {
            HistoryUpdate::Overwrite(messages) => messages,
            HistoryUpdate::Append(added) => {
                let mut messages = Vec::with_capacity(self.messages.len() + added.len());
                messages.extend_from_slice(&self.messages);
                messages.extend(added);
                Arc::from(messages.into_boxed_slice())
            }
        };

        Self {
            messages,
            ..self.clone()
        }
    }

    /// Creates a new context with a user message appended
    pub fn inject_message(&self, content: String) -> Self {
        self.apply(HistoryUpdate::Append(vec![
            ChatMessage::user().content(content).build(),
        ]))
    }

    /// Creates a new context with different stats
    pub fn with_stats(&self, stats: AgentStats) -> Self {
        Self {
            stats: Arc::new(stats),
            ..self.clone()
        }
    }
}

/// Represents the complete state of agent execution
#[derive(Debug)]
pub enum ExecutionState {
    /// At the start of a run, before anything reaches the model
    BeforeTurn { context: Arc<ConversationContext> },

    /// Ready to call the model with this context
    CallLlm { context: Arc<ConversationContext> },

    /// After receiving the model reply
    AfterLlm {
        reply: Arc<ChatMessage>,
        context: Arc<ConversationContext>,
    },

    /// Execution completed successfully
    Complete,

    /// Execution stopped by middleware
    Stopped { message: Arc<str> },

    /// Execution cancelled by user
    Cancelled,
}

impl ExecutionState {
    /// Returns a human-readable name for the state
    pub fn name(&self) -> &'static str {
        match self {
            ExecutionState::BeforeTurn { .. } => "BeforeTurn",
            ExecutionState::CallLlm { .. } => "CallLlm",
            ExecutionState::AfterLlm { .. } => "AfterLlm",
            ExecutionState::Complete => "Complete",
            ExecutionState::Stopped { .. } => "Stopped",
            ExecutionState::Cancelled => "Cancelled",
        }
    }

    /// Returns the context if this state has one
    pub fn context(&self) -> Option<&Arc<ConversationContext>> {
        match self {
            ExecutionState::BeforeTurn { context } => Some(context),
            ExecutionState::CallLlm { context } => Some(context),
            ExecutionState::AfterLlm { context, .. } => Some(context),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionState::Complete | ExecutionState::Stopped { .. } | ExecutionState::Cancelled
        )
    }
}
