use std::fmt;

/// Transport state of a sender or receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActivationState {
    /// master_enable false
    #[default]
    Inactive,
    /// master_enable true, transport parameters populated
    Active,
}

impl ActivationState {
    pub fn from_master_enable(master_enable: bool) -> Self {
        if master_enable {
            Self::Active
        } else {
            Self::Inactive
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    pub fn master_enable(&self) -> bool {
        self.is_active()
    }
}

impl fmt::Display for ActivationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inactive => write!(f, "INACTIVE"),
            Self::Active => write!(f, "ACTIVE"),
        }
    }
}
