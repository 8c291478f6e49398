use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManagerError {
    #[error("Subscription {0} already defined")]
    DuplicateSubscription(String),

    #[error("Unknown subscription type: {0}")]
    UnknownSubscriptionType(String),

    #[error("Invalid subscription: {0}")]
    InvalidSubscription(String),

    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(String),

    #[error("Param {0} can not be changed")]
    CredentialImmutable(&'static str),

    #[error("Param {0} is not set")]
    CredentialUnset(&'static str),

    #[error("Service {0} already registered")]
    DuplicateService(String),

    #[error("Unknown service: {0}")]
    UnknownService(String),

    #[error("Service environment unavailable")]
    EnvUnavailable,
}

pub type ManagerResult<T> = std::result::Result<T, ManagerError>;
