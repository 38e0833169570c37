//! PvP attempt errors.
//!
//! Every variant maps to a short in-session message via [`PvpError::user_message`];
//! nothing here is meant to propagate past the attack attempt.

use skirmish_domain::{DomainError, PlayerId};

use crate::infrastructure::ports::{OracleError, RepoError, SettlementRefusal};

/// Why a target or attacker is not allowed to fight right now.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EligibilityError {
    #[error("No eligible opponents")]
    NoTargets,
    #[error("Level {level} is below the minimum of {min_level}")]
    AttackerBelowMinimum { level: u32, min_level: u32 },
    #[error("Target level {level} is below the minimum of {min_level}")]
    TargetBelowMinimum { level: u32, min_level: u32 },
    #[error("Level difference {delta} exceeds {max_delta}")]
    OutOfRange { delta: u32, max_delta: u32 },
    #[error("Daily limit of {limit} attacks reached")]
    DailyCapReached { limit: u32 },
    #[error("Already fought {defender} today")]
    AlreadyFought { defender: PlayerId },
    #[error("Cannot attack yourself")]
    SelfTarget,
    #[error("Cannot attack a teammate or spouse")]
    Allied,
    #[error("Target is not asleep")]
    NotSleeping,
    #[error("Target is already dead")]
    AlreadyDead,
}

#[derive(Debug, thiserror::Error)]
pub enum PvpError {
    #[error(transparent)]
    Eligibility(#[from] EligibilityError),

    /// Save deleted or unreadable at the top level.
    #[error("Target {0} no longer exists")]
    UnavailableTarget(String),

    /// Resting at a safe house or otherwise hidden.
    #[error("Target {0} is protected")]
    ProtectedTarget(String),

    #[error("Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: i64, available: i64 },

    #[error("Corrupt save: {0}")]
    CorruptSave(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Save changed during the attack: {0}")]
    StaleWrite(String),

    #[error("Save store unavailable: {0}")]
    StoreUnavailable(String),

    #[error(transparent)]
    Oracle(#[from] OracleError),
}

impl PvpError {
    /// Short message shown in the attacker's session.
    pub fn user_message(&self) -> String {
        match self {
            PvpError::Eligibility(e) => match e {
                EligibilityError::NoTargets => "There is no one here you can fight.".to_string(),
                EligibilityError::AttackerBelowMinimum { min_level, .. } => {
                    format!("You must be at least level {min_level} to fight here.")
                }
                EligibilityError::TargetBelowMinimum { .. } => {
                    "That opponent is too inexperienced to challenge.".to_string()
                }
                EligibilityError::OutOfRange { max_delta, .. } => {
                    format!("You can only fight opponents within {max_delta} levels of you.")
                }
                EligibilityError::DailyCapReached { limit } => {
                    format!("You have already fought {limit} times today. Come back tomorrow.")
                }
                EligibilityError::AlreadyFought { .. } => {
                    "You have already fought them today.".to_string()
                }
                EligibilityError::SelfTarget => "You cannot attack yourself.".to_string(),
                EligibilityError::Allied => "You will not raise a hand against your own.".to_string(),
                EligibilityError::NotSleeping => "They are no longer asleep here.".to_string(),
                EligibilityError::AlreadyDead => "Someone got to them first.".to_string(),
            },
            PvpError::UnavailableTarget(_) => "They are no longer here.".to_string(),
            PvpError::ProtectedTarget(_) => {
                "They are resting somewhere safe, out of reach.".to_string()
            }
            PvpError::InsufficientFunds { needed, .. } => {
                format!("You need {needed} gold for that.")
            }
            PvpError::CorruptSave(_) => "Could not load their data.".to_string(),
            PvpError::InvalidRequest(msg) => msg.clone(),
            PvpError::StaleWrite(_) | PvpError::StoreUnavailable(_) | PvpError::Oracle(_) => {
                "Something went wrong. Nothing was changed; try again later.".to_string()
            }
        }
    }

    /// True for faults that abort an attempt rather than refuse it.
    pub fn is_fault(&self) -> bool {
        matches!(
            self,
            PvpError::StaleWrite(_) | PvpError::StoreUnavailable(_) | PvpError::Oracle(_)
        )
    }
}

impl From<RepoError> for PvpError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound { id, .. } => PvpError::UnavailableTarget(id),
            RepoError::Serialization(msg) => PvpError::CorruptSave(msg),
            RepoError::Refused { id, reason } => match reason {
                SettlementRefusal::Hidden => PvpError::ProtectedTarget(id),
                SettlementRefusal::NotSleeping => EligibilityError::NotSleeping.into(),
                SettlementRefusal::AlreadyDead => EligibilityError::AlreadyDead.into(),
            },
            e @ RepoError::StaleWrite { .. } => PvpError::StaleWrite(e.to_string()),
            e @ (RepoError::Database { .. } | RepoError::ConstraintViolation(_)) => {
                PvpError::StoreUnavailable(e.to_string())
            }
        }
    }
}

impl From<DomainError> for PvpError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::CorruptRecord(msg) | DomainError::Parse(msg) => PvpError::CorruptSave(msg),
            other => PvpError::InvalidRequest(other.to_string()),
        }
    }
}
