//! `GovernedAgent`: an agent id bound to a governance stack.

use std::sync::Arc;

use serde_json::Value;

use warden_contracts::{
    error::GovernanceResult,
    execution::{ExecutionResult, HealthReport},
    identity::{Credentials, IdentityMetadata, PublicIdentity},
};
use warden_core::{traits::Task, Governor};
use warden_identity::IdentityRegistry;

use crate::stack::GovernanceStack;

/// Every action this agent takes goes through the shared governor.
///
/// Construction registers the agent on first use; constructing a second
/// `GovernedAgent` for the same id reuses the existing identity.
pub struct GovernedAgent {
    agent_id: String,
    governor: Arc<Governor>,
    registry: Arc<IdentityRegistry>,
}

impl GovernedAgent {
    pub fn new(agent_id: &str, metadata: IdentityMetadata, stack: &GovernanceStack) -> Self {
        stack.identity.ensure_identity(agent_id, metadata);
        Self {
            agent_id: agent_id.to_string(),
            governor: Arc::clone(&stack.governor),
            registry: Arc::clone(&stack.identity),
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn identity(&self) -> Option<PublicIdentity> {
        self.registry.public_identity(&self.agent_id)
    }

    pub fn trust_score(&self) -> Option<u8> {
        self.registry.trust_score(&self.agent_id)
    }

    pub fn execute(&self, action: &str, context: &Value, task: Option<&dyn Task>) -> GovernanceResult<ExecutionResult> {
        self.governor.execute(&self.agent_id, action, context, task)
    }

    /// Like [`GovernedAgent::execute`], but proves key possession by signing
    /// `"{agent_id}:{action}"` and presenting the signature.
    pub fn execute_signed(
        &self,
        action: &str,
        context: &Value,
        task: Option<&dyn Task>,
    ) -> GovernanceResult<ExecutionResult> {
        let message = format!("{}:{}", self.agent_id, action);
        let credentials = Credentials {
            signature: self.registry.sign_message(&self.agent_id, &message)?,
            message,
        };
        self.governor
            .execute_with_credentials(&self.agent_id, action, context, task, Some(&credentials))
    }

    pub fn health_check(&self) -> HealthReport {
        self.governor.health_check(&self.agent_id)
    }
}
