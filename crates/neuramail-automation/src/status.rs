/// Where the loop is within a cycle. Lives only as long as the loop itself;
/// nothing here is persisted or shared across processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    Running,
    Success,
    Error,
}

/// Which backend call the current phase refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Fetch,
    Reply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutomationStatus {
    pub phase: CyclePhase,
    pub operation: Operation,
}

impl Default for AutomationStatus {
    fn default() -> Self {
        Self {
            phase: CyclePhase::Idle,
            operation: Operation::Fetch,
        }
    }
}

impl std::fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Success => "success",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Fetch => "fetch",
            Self::Reply => "reply",
        };
        f.write_str(label)
    }
}
